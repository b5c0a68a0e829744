//! Microphone capture.
//!
//! `AudioSource` is the seam between the recorder and the audio host. The cpal
//! implementation opens an input device at its native rate, downmixes every
//! callback buffer to mono `i16`, and hands it to the session's sample sink.

use super::error::RecorderError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BuildStreamError, SampleFormat, StreamConfig};

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// Receives mono samples from the capture thread.
pub type SampleSink = Box<dyn FnMut(&[i16]) + Send + 'static>;

/// Signal processing requested from the input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl CaptureConstraints {
    /// Unprocessed microphone signal.
    pub const fn raw() -> Self {
        Self {
            echo_cancellation: false,
            noise_suppression: false,
            auto_gain_control: false,
        }
    }

    pub fn wants_processing(&self) -> bool {
        self.echo_cancellation || self.noise_suppression || self.auto_gain_control
    }
}

/// Opens capture streams.
pub trait AudioSource {
    /// Acquires the input device and starts delivering samples to `sink`.
    ///
    /// # Errors
    /// - `PermissionDenied` if the OS refuses microphone access
    /// - `DeviceUnavailable` if no device can be opened
    fn open(
        &mut self,
        constraints: CaptureConstraints,
        sink: SampleSink,
    ) -> Result<Box<dyn CaptureStream>, RecorderError>;
}

/// A running capture stream. Dropping it releases the device.
pub trait CaptureStream {
    /// Rate of the samples delivered to the sink, in Hz.
    fn sample_rate(&self) -> u32;

    fn device_name(&self) -> &str;

    /// Stops delivery and releases the device. Later calls do nothing.
    fn halt(&mut self);
}

/// Captures from a cpal input device.
pub struct CpalSource {
    /// "default", a device name, or a numeric index from `mictest list-devices`
    device_spec: String,
}

impl CpalSource {
    pub fn new(device_spec: impl Into<String>) -> Self {
        Self {
            device_spec: device_spec.into(),
        }
    }
}

impl AudioSource for CpalSource {
    fn open(
        &mut self,
        constraints: CaptureConstraints,
        mut sink: SampleSink,
    ) -> Result<Box<dyn CaptureStream>, RecorderError> {
        if constraints.wants_processing() {
            tracing::warn!(
                "Input processing requested ({:?}) but cpal delivers the raw signal",
                constraints
            );
        }

        let device = suppress_alsa_warnings(|| {
            let host = cpal::default_host();
            if self.device_spec == "default" {
                host.default_input_device().ok_or_else(|| {
                    RecorderError::DeviceUnavailable("No audio input device available".to_string())
                })
            } else {
                find_device_by_name(&host, &self.device_spec)
            }
        })?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        tracing::info!("Recording device: {}", device_name);

        let default_config = device
            .default_input_config()
            .map_err(|e| RecorderError::from_backend(e.to_string()))?;
        let format = default_config.sample_format();
        let config: StreamConfig = default_config.into();
        let sample_rate = config.sample_rate.0;
        let channels = usize::from(config.channels.max(1));

        tracing::debug!(
            "Device configuration: {:?}, {}Hz, {} channels",
            format,
            sample_rate,
            channels
        );

        let err_fn = |err| tracing::error!("Audio stream error: {}", err);
        let mut mono = Vec::new();

        let stream = match format {
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    downmix(data, channels, f32_to_i16, &mut mono);
                    sink(mono.as_slice());
                },
                err_fn,
                None,
            ),
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    downmix(data, channels, |s| s, &mut mono);
                    sink(mono.as_slice());
                },
                err_fn,
                None,
            ),
            SampleFormat::U16 => device.build_input_stream(
                &config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    downmix(data, channels, u16_to_i16, &mut mono);
                    sink(mono.as_slice());
                },
                err_fn,
                None,
            ),
            other => {
                return Err(RecorderError::DeviceUnavailable(format!(
                    "Unsupported sample format: {other:?}"
                )))
            }
        }
        .map_err(|e| match e {
            BuildStreamError::DeviceNotAvailable => {
                RecorderError::DeviceUnavailable(format!("{device_name} is not available"))
            }
            other => RecorderError::from_backend(other.to_string()),
        })?;

        stream
            .play()
            .map_err(|e| RecorderError::from_backend(e.to_string()))?;
        tracing::debug!("Audio stream started");

        Ok(Box::new(CpalCapture {
            stream: Some(stream),
            sample_rate,
            device_name,
        }))
    }
}

struct CpalCapture {
    stream: Option<cpal::Stream>,
    sample_rate: u32,
    device_name: String,
}

impl CaptureStream for CpalCapture {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn device_name(&self) -> &str {
        &self.device_name
    }

    fn halt(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                tracing::debug!("Failed to pause audio stream: {}", e);
            }
            drop(stream);
            tracing::debug!("Audio stream released");
        }
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        self.halt();
    }
}

/// Averages interleaved frames into mono samples, replacing the contents of `out`.
pub fn downmix<T: Copy>(data: &[T], channels: usize, convert: impl Fn(T) -> i16, out: &mut Vec<i16>) {
    out.clear();
    match channels {
        0 | 1 => out.extend(data.iter().map(|&s| convert(s))),
        _ => {
            for frame in data.chunks_exact(channels) {
                let sum: i32 = frame.iter().map(|&s| convert(s) as i32).sum();
                out.push((sum / channels as i32) as i16);
            }
        }
    }
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

fn u16_to_i16(sample: u16) -> i16 {
    (sample as i32 - 32_768) as i16
}

/// Finds an audio input device by name or numeric index.
///
/// Indices count only devices that report a name, matching the IDs printed
/// by `mictest list-devices`.
///
/// # Errors
/// - `DeviceUnavailable` if no device with the given name or index exists
fn find_device_by_name(host: &cpal::Host, device_spec: &str) -> Result<cpal::Device, RecorderError> {
    let devices = host
        .input_devices()
        .map_err(|e| RecorderError::DeviceUnavailable(format!("Failed to enumerate devices: {e}")))?;
    select_device(devices, device_spec, |d| d.name().ok())
}

/// Picks a device by index among the named devices, or by exact name.
fn select_device<D>(
    devices: impl IntoIterator<Item = D>,
    device_spec: &str,
    name_of: impl Fn(&D) -> Option<String>,
) -> Result<D, RecorderError> {
    let named: Vec<(D, String)> = devices
        .into_iter()
        .filter_map(|d| name_of(&d).map(|name| (d, name)))
        .collect();

    if let Ok(index) = device_spec.parse::<usize>() {
        let count = named.len();
        return named
            .into_iter()
            .nth(index)
            .map(|(d, _)| d)
            .ok_or_else(|| {
                RecorderError::DeviceUnavailable(format!(
                    "Device index {} is out of range (0-{})",
                    index,
                    count.saturating_sub(1)
                ))
            });
    }

    named
        .into_iter()
        .find(|(_, name)| name == device_spec)
        .map(|(d, _)| d)
        .ok_or_else(|| {
            RecorderError::DeviceUnavailable(format!(
                "Audio input device '{device_spec}' not found. Use 'mictest list-devices' to see available devices."
            ))
        })
}

/// Runs `f` with stderr redirected to /dev/null to hide ALSA library noise.
///
/// If the redirect cannot be set up, `f` runs with stderr untouched.
#[cfg(target_os = "linux")]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> T
where
    F: FnOnce() -> T,
{
    let Ok(dev_null) = OpenOptions::new().write(true).open("/dev/null") else {
        return f();
    };

    let old_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if old_stderr == -1 {
        return f();
    }

    if unsafe { libc::dup2(dev_null.as_raw_fd(), libc::STDERR_FILENO) } == -1 {
        unsafe { libc::close(old_stderr) };
        return f();
    }

    let result = f();

    unsafe {
        libc::dup2(old_stderr, libc::STDERR_FILENO);
        libc::close(old_stderr);
    }

    result
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> T
where
    F: FnOnce() -> T,
{
    f()
}
