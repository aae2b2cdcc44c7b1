use crate::error::AppError;
use crate::messages::{AppEvent, CaptureCommand, CaptureRequest};
use crate::settings::Quality;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};

struct RunningCapture {
    process: Child,
    output: PathBuf,
}

/// Delegates recording to the external capture facility
///
/// This service:
/// - Spawns the capture binary with the requested duration/size/quality bounds
/// - Tracks at most one in-flight recording
/// - Delivers exactly one CaptureFinished event per recording; `None` when
///   the facility produced no data
pub struct Capture {
    binary: String,
    source_args: Vec<String>,
    cmd_rx: mpsc::Receiver<CaptureCommand>,
    events: mpsc::Sender<AppEvent>,
    child: Option<RunningCapture>,
}

impl Capture {
    pub fn new(
        binary: String,
        source_args: Vec<String>,
        cmd_rx: mpsc::Receiver<CaptureCommand>,
        events: mpsc::Sender<AppEvent>,
    ) -> Self {
        Self {
            binary,
            source_args,
            cmd_rx,
            events,
            child: None,
        }
    }

    pub async fn run(mut self) {
        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(CaptureCommand::Start { request, reply }) => {
                            let result = self.handle_start(request);
                            let _ = reply.send(result);
                        }
                        Some(CaptureCommand::Stop) => self.handle_stop().await,
                        None => break,
                    }
                }

                // Pends forever while no capture is in flight
                status = wait_child(&mut self.child) => {
                    self.finish(status).await;
                }
            }
        }
    }

    fn handle_start(&mut self, request: CaptureRequest) -> Result<(), AppError> {
        if self.child.is_some() {
            tracing::warn!("Capture already in flight, ignoring start");
            return Ok(());
        }

        let output = request.output.clone();
        let spawned = Command::new(&self.binary)
            .args(&self.source_args)
            .args(capture_args(&request))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(process) => {
                tracing::info!(
                    "Capture started: {:?} (max {}s, max {} bytes)",
                    output,
                    request.duration_limit_secs,
                    request.size_limit_bytes
                );
                self.child = Some(RunningCapture { process, output });
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Capture binary '{}' not found", self.binary);
                Err(AppError::NoCaptureApp)
            }
            Err(e) => {
                tracing::error!("Failed to spawn capture binary '{}': {}", self.binary, e);
                Err(AppError::NoCaptureApp)
            }
        }
    }

    /// End an in-flight recording early. ffmpeg finalizes the container when
    /// it reads 'q' on stdin; killing it would leave the file unreadable.
    async fn handle_stop(&mut self) {
        let Some(running) = &mut self.child else {
            tracing::debug!("Stop with no capture in flight");
            return;
        };

        if let Some(stdin) = running.process.stdin.as_mut() {
            if stdin.write_all(b"q").await.is_ok() && stdin.flush().await.is_ok() {
                return;
            }
        }

        tracing::warn!("Graceful stop failed, killing capture process");
        if let Err(e) = running.process.start_kill() {
            tracing::error!("Failed to kill capture process: {}", e);
        }
    }

    async fn finish(&mut self, status: std::io::Result<std::process::ExitStatus>) {
        let Some(running) = self.child.take() else {
            return;
        };

        match status {
            Ok(status) if !status.success() => {
                tracing::warn!("Capture process exited with {}", status)
            }
            Ok(_) => {}
            Err(e) => tracing::error!("Failed to wait on capture process: {}", e),
        }

        // The facility "returned data" iff the output file exists and is
        // non-empty; an early stop still counts as a recording.
        let has_data = std::fs::metadata(&running.output)
            .map(|m| m.len() > 0)
            .unwrap_or(false);

        let result = if has_data {
            Some(running.output)
        } else {
            let _ = std::fs::remove_file(&running.output);
            None
        };

        if self.events.send(AppEvent::CaptureFinished(result)).await.is_err() {
            tracing::debug!("Controller gone, dropping capture result");
        }
    }
}

async fn wait_child(child: &mut Option<RunningCapture>) -> std::io::Result<std::process::ExitStatus> {
    match child {
        Some(running) => running.process.wait().await,
        None => std::future::pending().await,
    }
}

/// Capture bounds as ffmpeg arguments: duration limit, size limit in bytes,
/// and the quality hint mapped to encoder settings.
fn capture_args(request: &CaptureRequest) -> Vec<String> {
    let mut args = vec![
        "-t".to_string(),
        request.duration_limit_secs.to_string(),
        "-fs".to_string(),
        request.size_limit_bytes.to_string(),
    ];

    let (preset, crf) = match request.quality {
        Quality::Low => ("ultrafast", "35"),
        Quality::High => ("veryfast", "23"),
    };
    args.extend(
        ["-c:v", "libx264", "-preset", preset, "-crf", crf, "-y"]
            .iter()
            .map(|s| s.to_string()),
    );

    args.push(request.output.display().to_string());
    args
}

/// Handle for communicating with the Capture service
#[derive(Clone)]
pub struct CaptureHandle {
    tx: mpsc::Sender<CaptureCommand>,
}

impl CaptureHandle {
    pub fn new(tx: mpsc::Sender<CaptureCommand>) -> Self {
        Self { tx }
    }

    /// Ask the facility to start recording. A dead service counts as no
    /// facility being available.
    pub async fn start(&self, request: CaptureRequest) -> Result<(), AppError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(CaptureCommand::Start { request, reply })
            .await
            .map_err(|_| AppError::NoCaptureApp)?;

        rx.await.map_err(|_| AppError::NoCaptureApp)?
    }

    pub async fn stop(&self) {
        if self.tx.send(CaptureCommand::Stop).await.is_err() {
            tracing::warn!("Capture service is gone, cannot stop");
        }
    }
}
