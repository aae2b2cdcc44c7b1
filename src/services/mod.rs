pub mod capture;
pub mod compressor;

pub use capture::{Capture, CaptureHandle};
