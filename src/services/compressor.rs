use crate::error::AppError;
use crate::messages::AppEvent;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tokio::sync::mpsc;

/// Transcode a recording on a background task.
///
/// Reports back through the event channel exactly once: the new file path on
/// success, `None` on failure, always with the elapsed wall time. There is no
/// progress reporting and no cancellation.
pub fn spawn(binary: String, input: PathBuf, events: mpsc::Sender<AppEvent>) {
    tokio::spawn(async move {
        let started = Instant::now();

        let output = match transcode(&binary, &input).await {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!("{}", AppError::CompressionFailed(format!("{:#}", e)));
                None
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let event = AppEvent::CompressionFinished { output, elapsed_ms };

        if events.send(event).await.is_err() {
            tracing::debug!("Controller gone, dropping compression result");
        }
    });
}

async fn transcode(binary: &str, input: &Path) -> Result<PathBuf> {
    let output = compressed_path(input);
    tracing::info!("Compressing {:?} -> {:?}", input, output);

    let status = Command::new(binary)
        .args(transcode_args(input, &output))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .with_context(|| format!("Failed to execute '{}'", binary))?;

    if !status.success() {
        let _ = std::fs::remove_file(&output);
        anyhow::bail!("transcode exited with {}", status);
    }

    let len = std::fs::metadata(&output)
        .with_context(|| format!("Transcode produced no file at {:?}", output))?
        .len();
    if len == 0 {
        let _ = std::fs::remove_file(&output);
        anyhow::bail!("transcode produced an empty file");
    }

    tracing::info!("Compression finished: {:?} ({} bytes)", output, len);
    Ok(output)
}

/// Fixed transcode recipe: H.264 at a size-oriented quality level with
/// downmixed AAC audio.
fn transcode_args(input: &Path, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        input.display().to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "veryfast".to_string(),
        "-crf".to_string(),
        "28".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "96k".to_string(),
        output.display().to_string(),
    ]
}

fn compressed_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "recording".to_string());
    let ext = input
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mp4".to_string());

    input.with_file_name(format!("{}.compressed.{}", stem, ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compressed_path_keeps_extension() {
        assert_eq!(
            compressed_path(Path::new("/videos/clip.mp4")),
            PathBuf::from("/videos/clip.compressed.mp4")
        );
        assert_eq!(
            compressed_path(Path::new("/videos/clip.mkv")),
            PathBuf::from("/videos/clip.compressed.mkv")
        );
    }

    #[test]
    fn test_compressed_path_without_extension() {
        assert_eq!(
            compressed_path(Path::new("/videos/clip")),
            PathBuf::from("/videos/clip.compressed.mp4")
        );
    }

    #[test]
    fn test_transcode_args_shape() {
        let args = transcode_args(Path::new("/a/in.mp4"), Path::new("/a/out.mp4"));

        let i = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[i + 1], "/a/in.mp4");
        assert_eq!(args.last().unwrap(), "/a/out.mp4");

        let crf = args.iter().position(|a| a == "-crf").unwrap();
        assert_eq!(args[crf + 1], "28");
    }
}
