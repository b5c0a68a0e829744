//! Clip encoding.
//!
//! PCM WAV is produced in memory with hound. Any other codec goes through
//! ffmpeg, whose availability is checked when the session starts rather than
//! when it ends.

use super::error::RecorderError;
use super::ffmpeg;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;
use std::path::PathBuf;

/// Codec name selecting the built-in WAV writer.
pub const BUILTIN_CODEC: &str = "pcm_s16le";

/// Encoder selected for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipEncoder {
    /// 16-bit PCM mono WAV written in memory.
    Wav,
    /// Transcode a WAV intermediate with ffmpeg.
    Ffmpeg {
        binary: PathBuf,
        codec: String,
        options: Vec<String>,
    },
}

impl ClipEncoder {
    /// Selects an encoder for a format string of the form `"codec [ffmpeg options]"`.
    ///
    /// # Errors
    /// - `EncoderUnavailable` if the string is empty or ffmpeg is required but missing
    pub fn prepare(output_format: &str) -> Result<Self, RecorderError> {
        let mut parts = output_format.split_whitespace();
        let codec = parts
            .next()
            .ok_or_else(|| RecorderError::EncoderUnavailable("output format is empty".to_string()))?;
        let options: Vec<String> = parts.map(str::to_string).collect();

        if (codec == BUILTIN_CODEC || codec == "wav") && options.is_empty() {
            return Ok(Self::Wav);
        }

        let binary = ffmpeg::find_ffmpeg()
            .map_err(|e| RecorderError::EncoderUnavailable(format!("{codec}: {e}")))?;
        Ok(Self::Ffmpeg {
            binary,
            codec: codec.to_string(),
            options,
        })
    }

    /// File extension of the produced container.
    pub fn extension(&self) -> &str {
        match self {
            Self::Wav => "wav",
            Self::Ffmpeg { codec, .. } => extension_for_codec(codec),
        }
    }

    /// Media type of the produced container.
    pub fn media_type(&self) -> &'static str {
        media_type_for_extension(self.extension())
    }

    /// Encodes mono samples into a complete container.
    ///
    /// # Errors
    /// - `Encoding` if writing the WAV or running ffmpeg fails
    pub fn encode(&self, samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, RecorderError> {
        let wav = encode_wav(samples, sample_rate)
            .map_err(|e| RecorderError::Encoding(e.to_string()))?;

        match self {
            Self::Wav => Ok(wav),
            Self::Ffmpeg {
                binary,
                codec,
                options,
            } => {
                let stem = format!("mictest_{}", std::process::id());
                let input = std::env::temp_dir().join(format!("{stem}.wav"));
                let output = std::env::temp_dir()
                    .join(format!("{stem}.{}", extension_for_codec(codec)));

                let result = std::fs::write(&input, &wav)
                    .map_err(anyhow::Error::from)
                    .and_then(|_| ffmpeg::transcode(binary, &input, &output, codec, options))
                    .and_then(|_| std::fs::read(&output).map_err(anyhow::Error::from));

                for path in [&input, &output] {
                    if let Err(e) = std::fs::remove_file(path) {
                        tracing::debug!("Failed to remove temp file {}: {}", path.display(), e);
                    }
                }

                result.map_err(|e| RecorderError::Encoding(e.to_string()))
            }
        }
    }
}

/// Writes 16-bit mono PCM samples into an in-memory WAV file.
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

fn extension_for_codec(codec: &str) -> &str {
    match codec {
        "libopus" | "libvorbis" => "ogg",
        "flac" => "flac",
        "aac" => "m4a",
        "pcm_s16le" | "wav" => "wav",
        "libmp3lame" | "mp3" => "mp3",
        other => other,
    }
}

fn media_type_for_extension(extension: &str) -> &'static str {
    match extension {
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",
        "mp3" => "audio/mpeg",
        "webm" => "audio/webm",
        _ => "application/octet-stream",
    }
}
