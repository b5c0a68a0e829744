//! Interactive microphone test.
//!
//! Runs the frame loop that drives the recorder and the TUI. SIGUSR1 toggles
//! start/stop so the tester can be driven from a hotkey daemon.

use crate::config::MicTestConfig;
use crate::recording::{
    ClipPlayer, CpalSource, FrameOutcome, MicTesterTui, RecorderSession, TesterCommand,
    TesterView, MAX_RECORDING,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;

/// Target frame interval (about 60 frames per second).
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Runs the microphone tester until the user quits.
///
/// # Arguments
/// * `device` - Input device override; falls back to the configured device
/// * `download_dir` - Download directory override
///
/// # Errors
/// - If the configuration cannot be loaded
/// - If the terminal cannot be initialized or drawn
pub async fn handle_record(
    device: Option<String>,
    download_dir: Option<PathBuf>,
) -> Result<(), anyhow::Error> {
    tracing::info!("=== mictest started ===");

    let config = MicTestConfig::load().map_err(|e| {
        tracing::error!("Failed to load configuration: {e:#}");
        e
    })?;
    let device = device.unwrap_or(config.audio.device);
    let download_dir = download_dir.unwrap_or(config.download.directory);
    tracing::info!(
        "Configuration loaded: device={}, output_format={}, download_dir={}",
        device,
        config.audio.output_format,
        download_dir.display()
    );

    let toggle_signal = register_toggle_signal()?;

    let mut recorder = RecorderSession::new(CpalSource::new(device), config.audio.output_format);
    let mut player = ClipPlayer::new();
    let mut status: Option<String> = None;
    let mut tui = MicTesterTui::new()?;

    let mut frames = tokio::time::interval(FRAME_INTERVAL);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        frames.tick().await;

        let mut command = tui.handle_input()?;
        if command == TesterCommand::Continue && toggle_signal.swap(false, Ordering::Relaxed) {
            tracing::info!("Received SIGUSR1: toggling recording");
            command = TesterCommand::Toggle;
        }

        match command {
            TesterCommand::Continue => {}
            TesterCommand::Quit => break,
            TesterCommand::Toggle => {
                status = Some(if recorder.is_recording() {
                    stop_message(&mut recorder)
                } else {
                    player.stop();
                    match recorder.start(Instant::now()) {
                        Ok(_) => format!(
                            "Recording from {}...",
                            recorder.device_name().unwrap_or("microphone")
                        ),
                        Err(e) => {
                            tracing::error!("Failed to start recording: {}", e);
                            e.to_string()
                        }
                    }
                });
            }
            TesterCommand::Play => {
                if let Some(clip) = recorder.clip().filter(|_| !recorder.is_recording()) {
                    status = Some(match player.play(clip) {
                        Ok(name) => format!("Playing {} with {}", clip.file_name(), name),
                        Err(e) => {
                            tracing::warn!("Playback failed: {}", e);
                            e.to_string()
                        }
                    });
                }
            }
            TesterCommand::Download => {
                if let Some(clip) = recorder.clip() {
                    status = Some(match clip.save_to(&download_dir) {
                        Ok(path) => format!("Saved {}", path.display()),
                        Err(e) => {
                            tracing::warn!("Download failed: {:#}", e);
                            format!("Download failed: {e:#}")
                        }
                    });
                }
            }
        }

        match recorder.on_frame(Instant::now()) {
            Ok(FrameOutcome::AutoStopped) => {
                status = Some(format!(
                    "Stopped at the {}s limit. {}",
                    MAX_RECORDING.as_secs(),
                    clip_summary(&recorder)
                ));
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!("Automatic stop failed: {}", e);
                status = Some(e.to_string());
            }
        }

        let elapsed = recorder.elapsed_label();
        let playing = player.is_playing();
        tui.render(&TesterView {
            recording: recorder.is_recording(),
            elapsed: &elapsed,
            points: recorder.waveform().points(),
            clip: recorder.clip(),
            playing,
            status: status.as_deref(),
        })?;
    }

    if recorder.is_recording() {
        tracing::info!("Quit while recording; discarding session");
    }
    drop(recorder);
    player.stop();
    tui.cleanup()?;

    tracing::info!("=== mictest exited ===");
    Ok(())
}

fn stop_message(recorder: &mut RecorderSession<CpalSource>) -> String {
    let stopped = recorder.stop(Instant::now()).map(|_| ());
    match stopped {
        Ok(()) => clip_summary(recorder),
        Err(e) => {
            tracing::error!("Failed to stop recording: {}", e);
            e.to_string()
        }
    }
}

fn clip_summary(recorder: &RecorderSession<CpalSource>) -> String {
    match recorder.clip() {
        Some(clip) => format!(
            "Clip ready: {:.1} s ({} bytes)",
            clip.duration().as_secs_f64(),
            clip.bytes().len()
        ),
        None => "No clip recorded".to_string(),
    }
}

#[cfg(unix)]
fn register_toggle_signal() -> anyhow::Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGUSR1, Arc::clone(&flag))
        .map_err(|e| anyhow::anyhow!("Failed to register signal handler: {e}"))?;
    Ok(flag)
}

#[cfg(not(unix))]
fn register_toggle_signal() -> anyhow::Result<Arc<AtomicBool>> {
    Ok(Arc::new(AtomicBool::new(false)))
}
