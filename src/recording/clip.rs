//! The finished output of one recording session.

use anyhow::Context;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File stem offered when the clip is downloaded.
pub const CLIP_STEM: &str = "mic-test";

/// Immutable encoded recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingClip {
    bytes: Vec<u8>,
    media_type: &'static str,
    extension: String,
    duration: Duration,
}

impl RecordingClip {
    pub fn new(
        bytes: Vec<u8>,
        media_type: &'static str,
        extension: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            bytes,
            media_type,
            extension: extension.into(),
            duration,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn media_type(&self) -> &'static str {
        self.media_type
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Duration measured from the captured sample count.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Fixed download file name, e.g. `mic-test.wav`.
    pub fn file_name(&self) -> String {
        format!("{CLIP_STEM}.{}", self.extension)
    }

    /// Writes the clip into `dir` under [`Self::file_name`], replacing any previous copy.
    pub fn save_to(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(self.file_name());
        std::fs::write(&path, &self.bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!(
            "Clip saved: {} ({} bytes, {})",
            path.display(),
            self.bytes.len(),
            self.media_type
        );
        Ok(path)
    }
}

/// Duration of `sample_count` mono samples at `sample_rate`.
pub fn samples_to_duration(sample_count: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(sample_count as f64 / sample_rate as f64)
}

/// Largest number of samples at `sample_rate` that fits within `cap`.
pub fn cap_sample_count(sample_rate: u32, cap: Duration) -> usize {
    (cap.as_millis() * u128::from(sample_rate) / 1000) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_uses_extension() {
        let clip = RecordingClip::new(vec![1, 2, 3], "audio/wav", "wav", Duration::from_secs(1));
        assert_eq!(clip.file_name(), "mic-test.wav");
    }

    #[test]
    fn test_save_to_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let first = RecordingClip::new(vec![1, 2, 3], "audio/wav", "wav", Duration::ZERO);
        let second = RecordingClip::new(vec![9], "audio/wav", "wav", Duration::ZERO);

        let path = first.save_to(dir.path()).unwrap();
        second.save_to(dir.path()).unwrap();

        assert_eq!(path, dir.path().join("mic-test.wav"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![9]);
    }

    #[test]
    fn test_samples_to_duration() {
        assert_eq!(samples_to_duration(48_000, 48_000), Duration::from_secs(1));
        assert_eq!(samples_to_duration(24_000, 16_000), Duration::from_millis(1_500));
        assert_eq!(samples_to_duration(100, 0), Duration::ZERO);
    }

    #[test]
    fn test_cap_sample_count() {
        let cap = Duration::from_secs(10);
        assert_eq!(cap_sample_count(48_000, cap), 480_000);
        assert_eq!(cap_sample_count(44_100, cap), 441_000);
        assert_eq!(cap_sample_count(0, cap), 0);
        let odd = Duration::from_millis(333);
        assert!(samples_to_duration(cap_sample_count(22_050, odd), 22_050) <= odd);
    }
}
