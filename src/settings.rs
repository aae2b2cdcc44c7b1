use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const K: u64 = 1024;

/// Video quality hint passed to the capture facility.
/// Wire value 0 = low, 1 = high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    High,
}

impl Quality {
    pub fn wire_value(self) -> u8 {
        match self {
            Quality::Low => 0,
            Quality::High => 1,
        }
    }

    pub fn from_wire(value: u8) -> Self {
        if value == 1 { Quality::High } else { Quality::Low }
    }
}

/// Recording parameters edited on the settings form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingSettings {
    #[serde(default = "default_max_length")]
    pub max_length_seconds: u32,

    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u64,

    #[serde(default = "default_quality")]
    pub quality: Quality,

    #[serde(default)]
    pub compress_after_recording: bool,
}

fn default_max_length() -> u32 {
    60
}

fn default_max_size_mb() -> u64 {
    5
}

fn default_quality() -> Quality {
    Quality::Low
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            max_length_seconds: default_max_length(),
            max_size_mb: default_max_size_mb(),
            quality: default_quality(),
            compress_after_recording: false,
        }
    }
}

impl RecordingSettings {
    /// Largest max_size_mb whose byte limit still fits in a u64. The form
    /// rejects anything above this.
    pub const MAX_SIZE_MB: u64 = u64::MAX / (K * K);

    /// Capture size limit in bytes: max_size_mb * 1024 * 1024, exactly for
    /// any accepted setting. Saturates rather than wrapping if an
    /// out-of-range value sneaks in.
    pub fn size_limit_bytes(&self) -> u64 {
        self.max_size_mb.saturating_mul(K * K)
    }
}

/// Flat four-field snapshot of the settings form, persisted across restarts
/// (the desktop analogue of saved instance state).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    pub max_length: u32,
    pub max_size: u64,
    pub quality: u8,
    pub compress: bool,
}

impl From<&RecordingSettings> for SettingsSnapshot {
    fn from(settings: &RecordingSettings) -> Self {
        Self {
            max_length: settings.max_length_seconds,
            max_size: settings.max_size_mb,
            quality: settings.quality.wire_value(),
            compress: settings.compress_after_recording,
        }
    }
}

impl SettingsSnapshot {
    pub fn restore(&self) -> RecordingSettings {
        RecordingSettings {
            max_length_seconds: self.max_length,
            max_size_mb: self.max_size,
            quality: Quality::from_wire(self.quality),
            compress_after_recording: self.compress,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create snapshot directory: {:?}", parent))?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize snapshot")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write snapshot file: {:?}", path))?;

        tracing::info!("Saved settings snapshot to {:?}", path);
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot file: {:?}", path))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse snapshot file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_limit_exact() {
        let settings = RecordingSettings {
            max_length_seconds: 60,
            max_size_mb: 5,
            quality: Quality::Low,
            compress_after_recording: false,
        };

        assert_eq!(settings.size_limit_bytes(), 5_242_880);
    }

    #[test]
    fn test_size_limit_scales_with_mb() {
        for mb in [1, 2, 10, 100] {
            let settings = RecordingSettings {
                max_size_mb: mb,
                ..Default::default()
            };
            assert_eq!(settings.size_limit_bytes(), mb * 1024 * 1024);
        }
    }

    #[test]
    fn test_size_limit_never_overflows() {
        let settings = RecordingSettings {
            max_size_mb: 18_000_000_000_000_000_000,
            ..Default::default()
        };
        assert_eq!(settings.size_limit_bytes(), u64::MAX);
    }

    #[test]
    fn test_size_limit_exact_at_upper_bound() {
        let settings = RecordingSettings {
            max_size_mb: RecordingSettings::MAX_SIZE_MB,
            ..Default::default()
        };
        assert_eq!(
            settings.size_limit_bytes(),
            RecordingSettings::MAX_SIZE_MB * 1024 * 1024
        );
    }

    #[test]
    fn test_snapshot_round_trip() {
        let settings = RecordingSettings {
            max_length_seconds: 42,
            max_size_mb: 17,
            quality: Quality::High,
            compress_after_recording: true,
        };

        let snapshot = SettingsSnapshot::from(&settings);
        assert_eq!(snapshot.restore(), settings);
    }

    #[test]
    fn test_snapshot_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let settings = RecordingSettings {
            max_length_seconds: 30,
            max_size_mb: 8,
            quality: Quality::High,
            compress_after_recording: false,
        };

        SettingsSnapshot::from(&settings).save(&path).unwrap();
        let restored = SettingsSnapshot::load(&path).unwrap().restore();

        assert_eq!(restored, settings);
    }

    #[test]
    fn test_quality_wire_values() {
        assert_eq!(Quality::Low.wire_value(), 0);
        assert_eq!(Quality::High.wire_value(), 1);
        assert_eq!(Quality::from_wire(1), Quality::High);
        // Anything that isn't 1 is treated as low
        assert_eq!(Quality::from_wire(0), Quality::Low);
        assert_eq!(Quality::from_wire(7), Quality::Low);
    }
}
