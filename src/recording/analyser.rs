//! Live time-domain analysis of the capture stream.
//!
//! The capture callback pushes mono samples in; the frame loop pulls the most
//! recent window out. Only the latest `size` samples are ever kept.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Number of samples in one analysis window.
pub const FFT_SIZE: usize = 2048;

/// Byte value representing a zero crossing in byte time-domain data.
pub const SILENCE_BYTE: u8 = 128;

#[derive(Debug)]
struct Window {
    samples: VecDeque<i16>,
    closed: bool,
}

/// Shared sliding window over the newest input samples.
///
/// Cloning yields another handle to the same window, so the audio thread and
/// the UI thread can each hold one.
#[derive(Debug, Clone)]
pub struct Analyser {
    window: Arc<Mutex<Window>>,
    size: usize,
}

impl Analyser {
    /// Creates an analyser holding `size` samples of silence.
    pub fn new(size: usize) -> Self {
        let size = size.max(2);
        Self {
            window: Arc::new(Mutex::new(Window {
                samples: std::iter::repeat(0).take(size).collect(),
                closed: false,
            })),
            size,
        }
    }

    /// Window length in samples.
    pub fn fft_size(&self) -> usize {
        self.size
    }

    /// Appends samples, discarding the oldest ones beyond the window length.
    ///
    /// Ignored once the analyser is closed.
    pub fn push(&self, data: &[i16]) {
        let Ok(mut window) = self.window.lock() else {
            return;
        };
        if window.closed {
            return;
        }

        let data = if data.len() > self.size {
            &data[data.len() - self.size..]
        } else {
            data
        };
        let overflow = (window.samples.len() + data.len()).saturating_sub(self.size);
        window.samples.drain(..overflow);
        window.samples.extend(data.iter().copied());
    }

    /// Copies the newest window into `out` as unsigned bytes.
    ///
    /// Each sample maps linearly onto 0..=255 with silence at 128. When `out`
    /// is shorter than the window, the most recent samples are used; when it is
    /// longer, the tail is padded with silence.
    pub fn byte_time_domain_data(&self, out: &mut [u8]) {
        out.fill(SILENCE_BYTE);
        let Ok(window) = self.window.lock() else {
            return;
        };
        if window.closed {
            return;
        }

        let take = out.len().min(window.samples.len());
        let skip = window.samples.len() - take;
        for (slot, &sample) in out.iter_mut().zip(window.samples.iter().skip(skip)) {
            *slot = sample_to_byte(sample);
        }
    }

    /// Closes the analyser and drops its buffered samples.
    pub fn close(&self) {
        if let Ok(mut window) = self.window.lock() {
            window.closed = true;
            window.samples.clear();
        }
    }
}

/// Converts a signed PCM sample to the 0..=255 byte scale.
pub fn sample_to_byte(sample: i16) -> u8 {
    ((sample as i32 + 32_768) >> 8) as u8
}
