use thiserror::Error;

/// User-visible failure taxonomy. All of these are non-fatal: they surface
/// as a notice on screen and leave the controller in its prior safe state.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("no capture application available")]
    NoCaptureApp,

    #[error("storage permission denied")]
    PermissionDenied,

    #[error("capture cancelled")]
    CaptureCancelled,

    #[error("compression failed: {0}")]
    CompressionFailed(String),
}
