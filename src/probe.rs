use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;

const K: u64 = 1024;

/// Derived metadata for a recorded file, recomputed on every redraw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaInfo {
    pub display_name: String,
    pub size_kb: u64,
    pub duration_ms: String,
    pub resolution: String,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    tags: ProbeTags,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
}

#[derive(Debug, Deserialize, Default)]
struct ProbeTags {
    rotate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeSideData {
    rotation: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Query display name, size, duration and resolution for a media file.
///
/// Name and size come from the filesystem; duration and dimensions come from
/// the probe binary (ffprobe) in JSON form.
pub async fn media_info(probe_binary: &str, path: &Path) -> Result<MediaInfo> {
    let display_name = display_name(path);

    let meta = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat media file: {:?}", path))?;
    let size_kb = meta.len() / K;

    let output = Command::new(probe_binary)
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .await
        .with_context(|| format!("Failed to execute probe binary '{}'", probe_binary))?;

    if !output.status.success() {
        anyhow::bail!(
            "Probe failed for {:?}: {}",
            path,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let parsed: ProbeOutput =
        serde_json::from_slice(&output.stdout).context("Failed to parse probe output")?;

    Ok(MediaInfo {
        display_name,
        size_kb,
        duration_ms: duration_ms_string(&parsed),
        resolution: resolution_string(&parsed),
    })
}

/// Fallback used when probing fails: name and size still render, duration
/// and resolution show as unknown.
pub fn basic_info(path: &Path) -> MediaInfo {
    let size_kb = std::fs::metadata(path).map(|m| m.len() / K).unwrap_or(0);

    MediaInfo {
        display_name: display_name(path),
        size_kb,
        duration_ms: "?".to_string(),
        resolution: "?".to_string(),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Duration in milliseconds, rendered as a string. The probe reports
/// fractional seconds.
fn duration_ms_string(parsed: &ProbeOutput) -> String {
    let secs = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    format!("{}", (secs * 1000.0).round() as u64)
}

fn resolution_string(parsed: &ProbeOutput) -> String {
    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type == "video" && s.width.is_some() && s.height.is_some());

    match video {
        Some(stream) => {
            let width = stream.width.unwrap_or(0);
            let height = stream.height.unwrap_or(0);
            corrected_resolution(width, height, stream_rotation(stream))
        }
        None => "?".to_string(),
    }
}

/// Rotation in degrees for a stream, normalized to [0, 360). Containers
/// report it either as a `rotate` tag or as display-matrix side data (which
/// may be negative).
fn stream_rotation(stream: &ProbeStream) -> i64 {
    let raw = stream
        .tags
        .rotate
        .as_deref()
        .and_then(|r| r.parse::<i64>().ok())
        .or_else(|| stream.side_data_list.iter().find_map(|s| s.rotation))
        .unwrap_or(0);

    raw.rem_euclid(360)
}

/// Rotations of 90 or 180 degrees swap the reported dimensions; everything
/// else reports them as stored.
fn corrected_resolution(width: u32, height: u32, rotation: i64) -> String {
    if rotation == 90 || rotation == 180 {
        format!("{}x{}", height, width)
    } else {
        format!("{}x{}", width, height)
    }
}
