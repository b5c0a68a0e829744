//! Time-domain waveform visualization.
//!
//! Each frame replaces the whole trace with the analyser's newest window,
//! spread across a fixed 700x200 drawing surface.

use crate::recording::analyser::Analyser;

/// Logical width of the drawing surface.
pub const SURFACE_WIDTH: f64 = 700.0;
/// Logical height of the drawing surface.
pub const SURFACE_HEIGHT: f64 = 200.0;

/// The most recently drawn waveform.
#[derive(Debug, Clone)]
pub struct WaveformTrace {
    buffer: Vec<u8>,
    points: Vec<(f64, f64)>,
}

impl WaveformTrace {
    /// Creates an empty trace sized for `window` samples.
    pub fn new(window: usize) -> Self {
        Self {
            buffer: vec![0; window],
            points: Vec::with_capacity(window),
        }
    }

    /// Replaces the trace with the analyser's latest window.
    pub fn redraw(&mut self, analyser: &Analyser) {
        if self.buffer.len() != analyser.fft_size() {
            self.buffer.resize(analyser.fft_size(), 0);
        }
        analyser.byte_time_domain_data(&mut self.buffer);
        trace_points(&self.buffer, SURFACE_WIDTH, SURFACE_HEIGHT, &mut self.points);
    }

    /// Points in surface coordinates, left to right.
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

/// Maps byte samples onto a `width` x `height` surface.
///
/// Sample `i` lands at `x = i / (n - 1) * width`, `y = byte / 255 * height`.
/// `out` is cleared first.
pub fn trace_points(buffer: &[u8], width: f64, height: f64, out: &mut Vec<(f64, f64)>) {
    out.clear();
    let last = buffer.len().saturating_sub(1).max(1) as f64;
    out.extend(buffer.iter().enumerate().map(|(i, &b)| {
        let x = i as f64 / last * width;
        let y = b as f64 / 255.0 * height;
        (x, y)
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_spans_full_width() {
        let mut out = Vec::new();
        trace_points(&[0, 128, 255], 700.0, 200.0, &mut out);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], (0.0, 0.0));
        assert_eq!(out[1].0, 350.0);
        assert_eq!(out[2], (700.0, 200.0));
    }

    #[test]
    fn test_trace_replaces_previous_frame() {
        let mut out = vec![(1.0, 1.0); 10];
        trace_points(&[255, 255], 10.0, 10.0, &mut out);
        assert_eq!(out, vec![(0.0, 10.0), (10.0, 10.0)]);
    }

    #[test]
    fn test_redraw_reads_latest_window() {
        let analyser = Analyser::new(4);
        analyser.push(&[i16::MAX; 4]);

        let mut trace = WaveformTrace::new(4);
        trace.redraw(&analyser);
        assert_eq!(trace.points().len(), 4);
        assert!(trace.points().iter().all(|&(_, y)| y == SURFACE_HEIGHT));
        assert_eq!(trace.points()[3].0, SURFACE_WIDTH);

        trace.clear();
        assert!(trace.points().is_empty());
    }
}
