//! Clip playback through the system audio player.
//!
//! The clip is copied to a temp file and handed to the first player that
//! starts. Player output is discarded so it cannot disturb the TUI.

use super::clip::RecordingClip;
use anyhow::anyhow;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

/// Players tried in order, with arguments placed before the file path.
#[cfg(target_os = "macos")]
const PLAYERS: &[(&str, &[&str])] = &[("afplay", &[])];

#[cfg(target_os = "linux")]
const PLAYERS: &[(&str, &[&str])] = &[
    ("paplay", &[]),
    ("pw-play", &[]),
    ("aplay", &["-q"]),
    ("ffplay", &["-nodisp", "-autoexit", "-loglevel", "quiet"]),
    ("mpv", &["--no-video", "--really-quiet"]),
];

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
const PLAYERS: &[(&str, &[&str])] = &[("ffplay", &["-nodisp", "-autoexit", "-loglevel", "quiet"])];

/// Plays one clip at a time.
#[derive(Default)]
pub struct ClipPlayer {
    child: Option<Child>,
    temp_path: Option<PathBuf>,
}

impl ClipPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts playing `clip`, stopping any playback already running.
    ///
    /// Returns the name of the player used.
    ///
    /// # Errors
    /// - If the temp file cannot be written
    /// - If none of the known players can be started
    pub fn play(&mut self, clip: &RecordingClip) -> anyhow::Result<&'static str> {
        self.stop();

        let path = std::env::temp_dir().join(format!(
            "mictest_playback_{}.{}",
            std::process::id(),
            clip.extension()
        ));
        std::fs::write(&path, clip.bytes())?;
        self.temp_path = Some(path.clone());

        for (player, args) in PLAYERS {
            let spawned = Command::new(player)
                .args(*args)
                .arg(&path)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn();

            match spawned {
                Ok(child) => {
                    tracing::info!("Playing {} with {}", clip.file_name(), player);
                    self.child = Some(child);
                    return Ok(*player);
                }
                Err(e) => tracing::debug!("Player {} unavailable: {}", player, e),
            }
        }

        Err(anyhow!(
            "No audio player found. Install one of: {}",
            PLAYERS.iter().map(|(p, _)| *p).collect::<Vec<_>>().join(", ")
        ))
    }

    /// Returns whether the player process is still running.
    pub fn is_playing(&mut self) -> bool {
        match self.child.as_mut().map(|c| c.try_wait()) {
            Some(Ok(None)) => true,
            Some(_) => {
                self.child = None;
                false
            }
            None => false,
        }
    }

    /// Stops playback and removes the temp file.
    pub fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
            tracing::debug!("Playback stopped");
        }
        if let Some(path) = self.temp_path.take() {
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::debug!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}

impl Drop for ClipPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}
