use crate::error::AppError;
use crate::settings::Quality;
use std::path::PathBuf;
use tokio::sync::oneshot;

/// Screen state machine. Every step falls back to Idle when the capture
/// facility returns no data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScreenState {
    Idle,
    AwaitingCapture,
    ShowingResult,
    Compressing,
    ShowingCompressedResult,
}

/// Storage-write permission, orthogonal to the screen state. Only the
/// permission-result path updates it; NotGranted covers both "never asked"
/// and "denied".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    NotGranted,
}

/// Bounds handed to the capture facility for a single recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub output: PathBuf,
    pub duration_limit_secs: u32,
    pub size_limit_bytes: u64,
    pub quality: Quality,
}

/// Commands for the capture service
pub enum CaptureCommand {
    Start {
        request: CaptureRequest,
        reply: oneshot::Sender<Result<(), AppError>>,
    },
    Stop,
}

/// Completion events delivered into the controller's event loop. Each
/// in-flight capture or compression produces exactly one of these; `None`
/// means cancelled (capture) or failed (compression).
#[derive(Debug)]
pub enum AppEvent {
    CaptureFinished(Option<PathBuf>),
    CompressionFinished {
        output: Option<PathBuf>,
        elapsed_ms: u64,
    },
}
