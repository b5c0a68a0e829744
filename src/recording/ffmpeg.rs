//! FFmpeg locator and transcoding.
//!
//! Clips in formats other than WAV are produced by handing a WAV intermediate
//! to ffmpeg. Standard installation locations are checked before falling back
//! to a PATH search.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Locates the ffmpeg binary on the system.
///
/// Checks platform install locations (Homebrew, /usr/bin, snap, C:\ffmpeg)
/// before falling back to `which`/`where`.
pub fn find_ffmpeg() -> Result<PathBuf> {
    let candidates = if cfg!(target_os = "macos") {
        vec![
            PathBuf::from("/opt/homebrew/bin/ffmpeg"),
            PathBuf::from("/usr/local/bin/ffmpeg"),
            PathBuf::from("/usr/bin/ffmpeg"),
        ]
    } else if cfg!(target_os = "linux") {
        vec![
            PathBuf::from("/usr/bin/ffmpeg"),
            PathBuf::from("/usr/local/bin/ffmpeg"),
            PathBuf::from("/snap/bin/ffmpeg"),
        ]
    } else if cfg!(target_os = "windows") {
        vec![
            PathBuf::from("C:\\ffmpeg\\bin\\ffmpeg.exe"),
            PathBuf::from("C:\\Program Files\\ffmpeg\\bin\\ffmpeg.exe"),
        ]
    } else {
        vec![]
    };

    if let Some(path) = candidates.into_iter().find(|p| p.exists()) {
        tracing::debug!("Found ffmpeg at: {}", path.display());
        return Ok(path);
    }

    let ffmpeg_path = find_in_path("ffmpeg")?;
    tracing::debug!("Found ffmpeg in PATH at: {}", ffmpeg_path.display());
    Ok(ffmpeg_path)
}

fn find_in_path(binary_name: &str) -> Result<PathBuf> {
    let search_cmd = if cfg!(target_os = "windows") {
        "where"
    } else {
        "which"
    };

    let output = Command::new(search_cmd)
        .arg(binary_name)
        .output()
        .map_err(|e| anyhow!("Failed to search PATH for {binary_name}: {e}"))?;

    if output.status.success() {
        let path_str = String::from_utf8_lossy(&output.stdout);
        let path = PathBuf::from(path_str.lines().next().unwrap_or("").trim());
        if !path.as_os_str().is_empty() {
            return Ok(path);
        }
    }

    Err(anyhow!(
        "ffmpeg not found. Install ffmpeg or set output_format = \"pcm_s16le\" in mictest.toml"
    ))
}

/// Transcodes `input_wav` to `output_path` with the given codec and options.
///
/// Mono output is always enforced.
pub fn transcode(
    ffmpeg: &Path,
    input_wav: &Path,
    output_path: &Path,
    codec: &str,
    options: &[String],
) -> Result<()> {
    let mut cmd = Command::new(ffmpeg);
    cmd.arg("-loglevel")
        .arg("error")
        .arg("-i")
        .arg(input_wav)
        .arg("-acodec")
        .arg(codec)
        .arg("-ac")
        .arg("1")
        .arg("-y")
        .args(options)
        .arg(output_path);

    let output = cmd.output()?;
    if output.status.success() {
        tracing::debug!("Clip transcoded with {}", codec);
        Ok(())
    } else {
        let error_msg = String::from_utf8_lossy(&output.stderr);
        tracing::error!("ffmpeg conversion failed: {}", error_msg);
        Err(anyhow!("ffmpeg failed: {}", error_msg.trim()))
    }
}
