//! Microphone test recording.
//!
//! Capture, live waveform, capped timer, clip encoding, and the terminal UI
//! that drives them.

pub mod analyser;
pub mod audio;
pub mod clip;
pub mod encoder;
pub mod error;
pub mod ffmpeg;
pub mod frames;
pub mod player;
pub mod recorder;
pub mod timer;
pub mod ui;
pub mod visualizations;

pub use audio::CpalSource;
pub use player::ClipPlayer;
pub use recorder::{FrameOutcome, RecorderSession};
pub use timer::MAX_RECORDING;
pub use ui::{MicTesterTui, TesterCommand, TesterView};
