//! Configuration file management for mictest.
//!
//! The config file is optional: a missing file means defaults. The recording
//! cap and drawing surface are fixed and not configurable.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::recording::encoder::BUILTIN_CODEC;

/// Audio capture and output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Audio device to use. Options:
    /// - "default" for system default device
    /// - numeric index (0, 1, 2, etc.) from `mictest list-devices`
    /// - device name from `mictest list-devices`
    #[serde(default = "default_device")]
    pub device: String,
    /// Clip format: "pcm_s16le" for the built-in WAV writer, or
    /// "codec [ffmpeg_options]" (e.g. "libopus -b:a 32k") to transcode with ffmpeg
    #[serde(default = "default_output_format")]
    pub output_format: String,
}

fn default_device() -> String {
    "default".to_string()
}

fn default_output_format() -> String {
    BUILTIN_CODEC.to_string()
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            output_format: default_output_format(),
        }
    }
}

/// Where downloaded clips are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadConfig {
    #[serde(default = "default_download_directory")]
    pub directory: PathBuf,
}

fn default_download_directory() -> PathBuf {
    PathBuf::from(".")
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            directory: default_download_directory(),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicTestConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub download: DownloadConfig,
}

impl MicTestConfig {
    /// Loads configuration from the user's config directory, or defaults if
    /// no config file exists.
    ///
    /// # Errors
    /// - If the home directory cannot be determined
    /// - If the file exists but cannot be read or parsed
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Loads configuration from `path`, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Writes configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// Path of the config file: `~/.config/mictest/mictest.toml`.
///
/// # Errors
/// - If the home directory cannot be determined
pub fn config_path() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("mictest").join("mictest.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = MicTestConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, MicTestConfig::default());
        assert_eq!(config.audio.device, "default");
        assert_eq!(config.audio.output_format, "pcm_s16le");
        assert_eq!(config.download.directory, PathBuf::from("."));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mictest.toml");
        fs::write(&path, "[audio]\ndevice = \"2\"\n").unwrap();

        let config = MicTestConfig::load_from(&path).unwrap();
        assert_eq!(config.audio.device, "2");
        assert_eq!(config.audio.output_format, "pcm_s16le");
        assert_eq!(config.download, DownloadConfig::default());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mictest.toml");
        fs::write(&path, "[audio\ndevice = ").unwrap();
        assert!(MicTestConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("mictest.toml");
        let mut config = MicTestConfig::default();
        config.audio.output_format = "libopus -b:a 32k".to_string();
        config.download.directory = PathBuf::from("/tmp/clips");

        config.save_to(&path).unwrap();
        assert_eq!(MicTestConfig::load_from(&path).unwrap(), config);
    }
}
