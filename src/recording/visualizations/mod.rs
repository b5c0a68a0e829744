//! Visualization modules for recording display.

pub mod waveform;

pub use waveform::{WaveformTrace, SURFACE_HEIGHT, SURFACE_WIDTH};
