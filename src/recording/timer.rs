//! Recording clock and duration cap.

use std::time::{Duration, Instant};

/// Hard limit on the length of one recording.
pub const MAX_RECORDING: Duration = Duration::from_millis(10_000);

/// One timer reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTick {
    /// Elapsed time for display, clamped to the cap and never decreasing.
    pub elapsed: Duration,
    /// Whether the raw measurement has reached the cap.
    pub expired: bool,
}

/// Measures wall-clock time since a session started.
#[derive(Debug, Clone)]
pub struct ElapsedTimer {
    started_at: Instant,
    cap: Duration,
    reported: Duration,
}

impl ElapsedTimer {
    /// Starts a timer bounded by [`MAX_RECORDING`].
    pub fn start(now: Instant) -> Self {
        Self::with_cap(now, MAX_RECORDING)
    }

    pub fn with_cap(now: Instant, cap: Duration) -> Self {
        Self {
            started_at: now,
            cap,
            reported: Duration::ZERO,
        }
    }

    /// Takes a reading at `now`.
    ///
    /// A `now` earlier than a previous reading does not move the reported
    /// value backwards.
    pub fn tick(&mut self, now: Instant) -> TimerTick {
        let measured = now.saturating_duration_since(self.started_at);
        self.reported = self.reported.max(measured.min(self.cap));
        TimerTick {
            elapsed: self.reported,
            expired: measured >= self.cap,
        }
    }
}

/// Formats elapsed time as seconds with one decimal, e.g. `"3.5 s"`.
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.1} s", elapsed.min(MAX_RECORDING).as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_before_cap() {
        let t0 = Instant::now();
        let mut timer = ElapsedTimer::start(t0);
        let tick = timer.tick(t0 + Duration::from_millis(3_500));
        assert_eq!(tick.elapsed, Duration::from_millis(3_500));
        assert!(!tick.expired);
    }

    #[test]
    fn test_tick_clamps_at_cap() {
        let t0 = Instant::now();
        let mut timer = ElapsedTimer::start(t0);
        let tick = timer.tick(t0 + Duration::from_millis(10_016));
        assert_eq!(tick.elapsed, MAX_RECORDING);
        assert!(tick.expired);
    }

    #[test]
    fn test_cap_reached_exactly_expires() {
        let t0 = Instant::now();
        let mut timer = ElapsedTimer::start(t0);
        assert!(timer.tick(t0 + MAX_RECORDING).expired);
    }

    #[test]
    fn test_reported_value_never_decreases() {
        let t0 = Instant::now();
        let mut timer = ElapsedTimer::start(t0);
        timer.tick(t0 + Duration::from_millis(2_000));
        let tick = timer.tick(t0 + Duration::from_millis(1_000));
        assert_eq!(tick.elapsed, Duration::from_millis(2_000));
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::ZERO), "0.0 s");
        assert_eq!(format_elapsed(Duration::from_millis(3_500)), "3.5 s");
        assert_eq!(format_elapsed(MAX_RECORDING), "10.0 s");
        assert_eq!(format_elapsed(Duration::from_millis(12_345)), "10.0 s");
    }
}
