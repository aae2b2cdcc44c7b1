use crate::settings::RecordingSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Binary the recording is delegated to.
    #[serde(default = "default_capture_binary")]
    pub capture_binary: String,

    /// Source arguments placed before the capture bounds (input selection).
    #[serde(default = "default_capture_source_args")]
    pub capture_source_args: Vec<String>,

    #[serde(default = "default_probe_binary")]
    pub probe_binary: String,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Where the settings-form snapshot is saved and restored from.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    /// Initial settings shown on the form.
    #[serde(default)]
    pub defaults: RecordingSettings,
}

fn default_capture_binary() -> String {
    "ffmpeg".to_string()
}

fn default_capture_source_args() -> Vec<String> {
    // X11 full-screen grab; override for wayland/v4l2 sources
    ["-f", "x11grab", "-framerate", "30", "-i", ":0.0"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_probe_binary() -> String {
    "ffprobe".to_string()
}

fn default_output_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join("Videos").join("vidrec")
    } else {
        PathBuf::from("recordings")
    }
}

fn default_snapshot_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn config_dir() -> PathBuf {
    let base = if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(dir)
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".config")
    } else {
        PathBuf::from(".")
    };

    base.join("vidrec")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture_binary: default_capture_binary(),
            capture_source_args: default_capture_source_args(),
            probe_binary: default_probe_binary(),
            output_dir: default_output_dir(),
            snapshot_path: default_snapshot_path(),
            defaults: RecordingSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.config/vidrec/config.json)
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!(
                "Config file not found at {:?}, creating default config",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        tracing::info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        tracing::info!("Saved config to {:?}", config_path);
        Ok(())
    }

    fn config_path() -> PathBuf {
        config_dir().join("config.json")
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.capture_binary.is_empty() {
            return Err(anyhow::anyhow!("capture_binary cannot be empty"));
        }

        if self.probe_binary.is_empty() {
            return Err(anyhow::anyhow!("probe_binary cannot be empty"));
        }

        if self.defaults.max_length_seconds == 0 {
            return Err(anyhow::anyhow!("defaults.max_length_seconds must be > 0"));
        }

        if self.defaults.max_size_mb == 0 {
            return Err(anyhow::anyhow!("defaults.max_size_mb must be > 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Quality;

    #[test]
    fn test_default_config_validates() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capture_binary, "ffmpeg");
        assert_eq!(config.probe_binary, "ffprobe");
    }

    #[test]
    fn test_default_recording_settings() {
        let config = Config::default();
        assert_eq!(config.defaults.max_length_seconds, 60);
        assert_eq!(config.defaults.max_size_mb, 5);
        assert_eq!(config.defaults.quality, Quality::Low);
        assert!(!config.defaults.compress_after_recording);
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = Config::default();
        config.defaults.max_length_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.defaults.max_size_mb = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_json_gets_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.capture_binary, "ffmpeg");
        assert_eq!(config.defaults.max_length_seconds, 60);
    }
}
