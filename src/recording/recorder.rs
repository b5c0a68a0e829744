//! Recording session controller.
//!
//! Owns the Idle/Recording state, the per-session resource bundle, and the
//! two frame loops (timer and waveform) that run while recording. `stop` is
//! the only teardown path, used both for user stops and the 10 second cap.

use super::analyser::{Analyser, FFT_SIZE};
use super::audio::{AudioSource, CaptureConstraints, CaptureStream, SampleSink};
use super::clip::{cap_sample_count, samples_to_duration, RecordingClip};
use super::encoder::ClipEncoder;
use super::error::RecorderError;
use super::frames::{FrameScheduler, LoopHandle};
use super::timer::{format_elapsed, ElapsedTimer, MAX_RECORDING};
use super::visualizations::WaveformTrace;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// What happened during one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// No session is active.
    Idle,
    /// The session is still recording.
    Recording,
    /// The cap was reached and the session was stopped this frame.
    AutoStopped,
}

/// Resources held for exactly one recording.
struct Session {
    capture: Box<dyn CaptureStream>,
    encoder: ClipEncoder,
    analyser: Analyser,
    chunks: Arc<Mutex<Vec<i16>>>,
    timer: ElapsedTimer,
    tick_loop: LoopHandle,
    wave_loop: LoopHandle,
}

impl Session {
    /// Cancels the frame loops, then releases the device and analyser.
    ///
    /// Loops are cancelled first so no frame can observe a released resource.
    fn release(&mut self, frames: &mut FrameScheduler) {
        frames.cancel(self.tick_loop);
        frames.cancel(self.wave_loop);
        self.capture.halt();
        self.analyser.close();
    }

    /// Releases everything and encodes the captured samples.
    fn finish(mut self, frames: &mut FrameScheduler) -> Result<RecordingClip, RecorderError> {
        self.release(frames);

        let mut samples = match self.chunks.lock() {
            Ok(mut chunks) => std::mem::take(&mut *chunks),
            Err(_) => {
                return Err(RecorderError::Encoding(
                    "sample buffer lock poisoned".to_string(),
                ))
            }
        };

        let sample_rate = self.capture.sample_rate();
        let limit = cap_sample_count(sample_rate, MAX_RECORDING);
        if samples.len() > limit {
            tracing::debug!(
                "Trimming {} samples delivered past the cap",
                samples.len() - limit
            );
            samples.truncate(limit);
        }
        let duration = samples_to_duration(samples.len(), sample_rate);
        tracing::info!(
            "Recording stopped: {:.2}s ({} samples at {}Hz)",
            duration.as_secs_f32(),
            samples.len(),
            sample_rate
        );

        let bytes = self.encoder.encode(&samples, sample_rate)?;
        Ok(RecordingClip::new(
            bytes,
            self.encoder.media_type(),
            self.encoder.extension(),
            duration,
        ))
    }
}

enum RecorderState {
    Idle,
    Recording(Session),
}

/// Microphone test session: capture, live waveform, and capped timer.
pub struct RecorderSession<S: AudioSource> {
    source: S,
    output_format: String,
    state: RecorderState,
    frames: FrameScheduler,
    elapsed: Duration,
    waveform: WaveformTrace,
    clip: Option<RecordingClip>,
}

impl<S: AudioSource> RecorderSession<S> {
    /// Creates an idle recorder.
    ///
    /// # Arguments
    /// * `source` - Where microphone audio comes from
    /// * `output_format` - `"pcm_s16le"` or `"codec [ffmpeg options]"`
    pub fn new(source: S, output_format: impl Into<String>) -> Self {
        Self {
            source,
            output_format: output_format.into(),
            state: RecorderState::Idle,
            frames: FrameScheduler::new(),
            elapsed: Duration::ZERO,
            waveform: WaveformTrace::new(FFT_SIZE),
            clip: None,
        }
    }

    /// Starts a session at `now`.
    ///
    /// Returns `Ok(false)` without touching anything if already recording.
    ///
    /// # Errors
    /// - `EncoderUnavailable` if the output format cannot be produced
    /// - `PermissionDenied` or `DeviceUnavailable` if the microphone cannot be opened
    pub fn start(&mut self, now: Instant) -> Result<bool, RecorderError> {
        if self.is_recording() {
            tracing::debug!("Start ignored: already recording");
            return Ok(false);
        }

        let encoder = ClipEncoder::prepare(&self.output_format)?;
        let analyser = Analyser::new(FFT_SIZE);
        let chunks = Arc::new(Mutex::new(Vec::new()));

        let sink: SampleSink = {
            let analyser = analyser.clone();
            let chunks = Arc::clone(&chunks);
            Box::new(move |data: &[i16]| {
                if let Ok(mut chunks) = chunks.lock() {
                    chunks.extend_from_slice(data);
                }
                analyser.push(data);
            })
        };

        let capture = self.source.open(CaptureConstraints::raw(), sink)?;
        tracing::info!(
            "Recording started on {} at {}Hz ({} output)",
            capture.device_name(),
            capture.sample_rate(),
            encoder.extension()
        );

        self.elapsed = Duration::ZERO;
        self.waveform.clear();
        let tick_loop = self.frames.register();
        let wave_loop = self.frames.register();

        self.state = RecorderState::Recording(Session {
            capture,
            encoder,
            analyser,
            chunks,
            timer: ElapsedTimer::start(now),
            tick_loop,
            wave_loop,
        });
        Ok(true)
    }

    /// Stops the active session at `now` and produces its clip.
    ///
    /// The timer takes a final reading first, so the readout shows the
    /// moment of the stop. Returns `Ok(None)` if nothing was recording.
    /// Resources are released even when encoding fails.
    ///
    /// # Errors
    /// - `Encoding` if the clip could not be finalized
    pub fn stop(&mut self, now: Instant) -> Result<Option<&RecordingClip>, RecorderError> {
        let mut session = match std::mem::replace(&mut self.state, RecorderState::Idle) {
            RecorderState::Idle => return Ok(None),
            RecorderState::Recording(session) => session,
        };

        if self.frames.is_active(session.tick_loop) {
            self.elapsed = session.timer.tick(now).elapsed;
        }

        let clip = session.finish(&mut self.frames);
        tracing::debug!(
            "Session released; {} frame loops active",
            self.frames.active_count()
        );
        self.clip = Some(clip?);
        Ok(self.clip.as_ref())
    }

    /// Runs every live frame loop once.
    ///
    /// The timer runs first so that reaching the cap stops the session before
    /// the waveform would read from it.
    ///
    /// # Errors
    /// - `Encoding` if an automatic stop could not finalize the clip
    pub fn on_frame(&mut self, now: Instant) -> Result<FrameOutcome, RecorderError> {
        let RecorderState::Recording(session) = &mut self.state else {
            return Ok(FrameOutcome::Idle);
        };

        if self.frames.is_active(session.tick_loop) {
            let tick = session.timer.tick(now);
            self.elapsed = tick.elapsed;
            if tick.expired {
                tracing::info!("Recording reached the {}s cap", MAX_RECORDING.as_secs());
                self.stop(now)?;
                return Ok(FrameOutcome::AutoStopped);
            }
        }

        if self.frames.is_active(session.wave_loop) {
            self.waveform.redraw(&session.analyser);
        }

        Ok(FrameOutcome::Recording)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, RecorderState::Recording(_))
    }

    /// Elapsed time of the current (or last) session, clamped to the cap.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Elapsed time formatted for display, e.g. `"3.5 s"`.
    pub fn elapsed_label(&self) -> String {
        format_elapsed(self.elapsed)
    }

    /// The most recent clip, kept until the next session finishes.
    pub fn clip(&self) -> Option<&RecordingClip> {
        self.clip.as_ref()
    }

    pub fn waveform(&self) -> &WaveformTrace {
        &self.waveform
    }

    /// Name of the device being recorded from, if any.
    pub fn device_name(&self) -> Option<&str> {
        match &self.state {
            RecorderState::Recording(session) => Some(session.capture.device_name()),
            RecorderState::Idle => None,
        }
    }

    /// Number of frame loops currently scheduled.
    #[cfg(test)]
    pub fn active_loops(&self) -> usize {
        self.frames.active_count()
    }
}

impl<S: AudioSource> Drop for RecorderSession<S> {
    fn drop(&mut self) {
        if let RecorderState::Recording(mut session) =
            std::mem::replace(&mut self.state, RecorderState::Idle)
        {
            tracing::debug!("Discarding active session");
            session.release(&mut self.frames);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const RATE: u32 = 8_000;

    /// Shared view of what the fake source did.
    #[derive(Default)]
    struct Probe {
        opened: AtomicUsize,
        halted: AtomicUsize,
        sink: Mutex<Option<SampleSink>>,
    }

    impl Probe {
        /// Delivers `millis` of a constant sample through the latest sink.
        fn feed(&self, millis: u64, value: i16) {
            let count = (RATE as u64 * millis / 1000) as usize;
            if let Some(sink) = self.sink.lock().unwrap().as_mut() {
                sink(vec![value; count].as_slice());
            }
        }
    }

    struct FakeSource {
        probe: Arc<Probe>,
        fail_with: Option<fn() -> RecorderError>,
    }

    struct FakeCapture {
        probe: Arc<Probe>,
        halted: bool,
    }

    impl AudioSource for FakeSource {
        fn open(
            &mut self,
            constraints: CaptureConstraints,
            sink: SampleSink,
        ) -> Result<Box<dyn CaptureStream>, RecorderError> {
            assert!(!constraints.wants_processing());
            if let Some(fail) = self.fail_with {
                return Err(fail());
            }
            self.probe.opened.fetch_add(1, Ordering::SeqCst);
            *self.probe.sink.lock().unwrap() = Some(sink);
            Ok(Box::new(FakeCapture {
                probe: Arc::clone(&self.probe),
                halted: false,
            }))
        }
    }

    impl CaptureStream for FakeCapture {
        fn sample_rate(&self) -> u32 {
            RATE
        }

        fn device_name(&self) -> &str {
            "fake mic"
        }

        fn halt(&mut self) {
            if !self.halted {
                self.halted = true;
                self.probe.halted.fetch_add(1, Ordering::SeqCst);
                *self.probe.sink.lock().unwrap() = None;
            }
        }
    }

    fn permission_denied() -> RecorderError {
        RecorderError::PermissionDenied("denied".to_string())
    }

    fn recorder() -> (RecorderSession<FakeSource>, Arc<Probe>) {
        let probe = Arc::new(Probe::default());
        let source = FakeSource {
            probe: Arc::clone(&probe),
            fail_with: None,
        };
        (RecorderSession::new(source, "pcm_s16le"), probe)
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn test_start_enters_recording() {
        let (mut rec, probe) = recorder();
        assert!(rec.start(Instant::now()).unwrap());
        assert!(rec.is_recording());
        assert_eq!(rec.elapsed(), Duration::ZERO);
        assert_eq!(rec.active_loops(), 2);
        assert_eq!(rec.device_name(), Some("fake mic"));
        assert_eq!(probe.opened.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_start_while_recording_is_noop() {
        let (mut rec, probe) = recorder();
        let t0 = Instant::now();
        rec.start(t0).unwrap();
        rec.on_frame(t0 + ms(1_000)).unwrap();

        assert!(!rec.start(t0 + ms(2_000)).unwrap());
        assert_eq!(probe.opened.load(Ordering::SeqCst), 1);
        assert_eq!(rec.active_loops(), 2);

        // The original session's clock is untouched.
        rec.on_frame(t0 + ms(3_000)).unwrap();
        assert_eq!(rec.elapsed(), ms(3_000));
    }

    #[test]
    fn test_manual_stop_at_three_and_a_half_seconds() {
        let (mut rec, probe) = recorder();
        let t0 = Instant::now();
        rec.start(t0).unwrap();
        probe.feed(3_500, 1_000);
        assert_eq!(rec.on_frame(t0 + ms(3_500)).unwrap(), FrameOutcome::Recording);
        assert_eq!(rec.elapsed_label(), "3.5 s");

        let clip = rec.stop(t0 + ms(3_500)).unwrap().expect("clip");
        assert_eq!(clip.duration(), ms(3_500));
        assert_eq!(clip.media_type(), "audio/wav");
        assert_eq!(clip.file_name(), "mic-test.wav");

        assert!(!rec.is_recording());
        assert_eq!(rec.elapsed_label(), "3.5 s");
        assert_eq!(rec.active_loops(), 0);
        assert_eq!(probe.halted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_auto_stop_at_cap() {
        let (mut rec, probe) = recorder();
        let t0 = Instant::now();
        rec.start(t0).unwrap();
        probe.feed(9_984, 0);

        assert_eq!(rec.on_frame(t0 + ms(9_984)).unwrap(), FrameOutcome::Recording);
        assert_eq!(rec.on_frame(t0 + ms(10_000)).unwrap(), FrameOutcome::AutoStopped);
        assert!(!rec.is_recording());
        assert_eq!(rec.elapsed_label(), "10.0 s");

        let clip = rec.clip().expect("clip after cap");
        assert!(clip.duration() <= MAX_RECORDING);

        // Later frames change nothing.
        assert_eq!(rec.on_frame(t0 + ms(12_000)).unwrap(), FrameOutcome::Idle);
        assert_eq!(rec.elapsed_label(), "10.0 s");
        assert_eq!(probe.halted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_auto_stop_trims_audio_delivered_past_cap() {
        let (mut rec, probe) = recorder();
        let t0 = Instant::now();
        rec.start(t0).unwrap();
        probe.feed(10_050, 1);

        assert_eq!(rec.on_frame(t0 + ms(10_016)).unwrap(), FrameOutcome::AutoStopped);
        let clip = rec.clip().expect("clip after cap");
        assert_eq!(clip.duration(), MAX_RECORDING);
    }

    #[test]
    fn test_manual_stop_past_cap_is_trimmed() {
        let (mut rec, probe) = recorder();
        let t0 = Instant::now();
        rec.start(t0).unwrap();
        probe.feed(10_200, 1);

        let clip = rec.stop(t0 + ms(10_200)).unwrap().expect("clip");
        assert_eq!(clip.duration(), MAX_RECORDING);
        assert_eq!(rec.elapsed(), MAX_RECORDING);
    }

    #[test]
    fn test_stop_between_frames_reads_timer() {
        let (mut rec, _probe) = recorder();
        let t0 = Instant::now();
        rec.start(t0).unwrap();
        rec.on_frame(t0 + ms(3_440)).unwrap();
        assert_eq!(rec.elapsed_label(), "3.4 s");

        rec.stop(t0 + ms(3_500)).unwrap();
        assert_eq!(rec.elapsed(), ms(3_500));
        assert_eq!(rec.elapsed_label(), "3.5 s");
    }

    #[test]
    fn test_late_frame_clamps_display() {
        let (mut rec, _probe) = recorder();
        let t0 = Instant::now();
        rec.start(t0).unwrap();
        assert_eq!(rec.on_frame(t0 + ms(10_250)).unwrap(), FrameOutcome::AutoStopped);
        assert_eq!(rec.elapsed(), MAX_RECORDING);
    }

    #[test]
    fn test_elapsed_is_monotonic_and_bounded() {
        let (mut rec, _probe) = recorder();
        let t0 = Instant::now();
        rec.start(t0).unwrap();

        let mut last = Duration::ZERO;
        for step in [16, 500, 400, 3_000, 2_999, 9_999, 10_000, 10_500] {
            rec.on_frame(t0 + ms(step)).unwrap();
            assert!(rec.elapsed() >= last);
            assert!(rec.elapsed() <= MAX_RECORDING);
            last = rec.elapsed();
        }
    }

    #[test]
    fn test_stop_twice_produces_one_clip() {
        let (mut rec, probe) = recorder();
        rec.start(Instant::now()).unwrap();
        probe.feed(100, 5);

        let first = rec.stop(Instant::now()).unwrap().cloned();
        assert!(first.is_some());
        assert!(rec.stop(Instant::now()).unwrap().is_none());
        assert_eq!(rec.clip().cloned(), first);
        assert_eq!(probe.halted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let (mut rec, _probe) = recorder();
        assert!(rec.stop(Instant::now()).unwrap().is_none());
        assert!(rec.clip().is_none());
    }

    #[test]
    fn test_new_session_resets_elapsed_and_replaces_clip() {
        let (mut rec, probe) = recorder();
        let t0 = Instant::now();
        rec.start(t0).unwrap();
        probe.feed(2_000, 1);
        rec.on_frame(t0 + ms(2_000)).unwrap();
        rec.stop(t0 + ms(2_000)).unwrap();

        let t1 = t0 + ms(5_000);
        rec.start(t1).unwrap();
        assert_eq!(rec.elapsed(), Duration::ZERO);
        assert_eq!(rec.clip().map(|c| c.duration()), Some(ms(2_000)));

        probe.feed(1_000, 1);
        rec.on_frame(t1 + ms(1_000)).unwrap();
        rec.stop(t1 + ms(1_000)).unwrap();
        assert_eq!(rec.clip().map(|c| c.duration()), Some(ms(1_000)));
        assert_eq!(probe.opened.load(Ordering::SeqCst), 2);
        assert_eq!(probe.halted.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_waveform_follows_input() {
        let (mut rec, probe) = recorder();
        let t0 = Instant::now();
        rec.start(t0).unwrap();
        probe.feed(500, i16::MAX);
        rec.on_frame(t0 + ms(16)).unwrap();

        let points = rec.waveform().points();
        assert_eq!(points.len(), FFT_SIZE);
        assert!(points.iter().all(|&(_, y)| y == 200.0));
    }

    #[test]
    fn test_samples_after_stop_are_ignored() {
        let (mut rec, probe) = recorder();
        rec.start(Instant::now()).unwrap();
        probe.feed(1_000, 1);
        rec.stop(Instant::now()).unwrap();
        probe.feed(1_000, 1);
        assert_eq!(rec.clip().map(|c| c.duration()), Some(ms(1_000)));
    }

    #[test]
    fn test_device_error_leaves_recorder_idle() {
        let probe = Arc::new(Probe::default());
        let source = FakeSource {
            probe: Arc::clone(&probe),
            fail_with: Some(permission_denied),
        };
        let mut rec = RecorderSession::new(source, "pcm_s16le");

        let err = rec.start(Instant::now()).unwrap_err();
        assert!(matches!(err, RecorderError::PermissionDenied(_)));
        assert!(!rec.is_recording());
        assert_eq!(rec.active_loops(), 0);
        assert!(rec.stop(Instant::now()).unwrap().is_none());
    }

    #[test]
    fn test_encoder_error_opens_nothing() {
        let probe = Arc::new(Probe::default());
        let source = FakeSource {
            probe: Arc::clone(&probe),
            fail_with: None,
        };
        let mut rec = RecorderSession::new(source, "");

        assert!(matches!(
            rec.start(Instant::now()),
            Err(RecorderError::EncoderUnavailable(_))
        ));
        assert_eq!(probe.opened.load(Ordering::SeqCst), 0);
        assert!(!rec.is_recording());
    }

    #[test]
    fn test_drop_releases_active_session() {
        let (mut rec, probe) = recorder();
        rec.start(Instant::now()).unwrap();
        drop(rec);
        assert_eq!(probe.halted.load(Ordering::SeqCst), 1);
    }
}
