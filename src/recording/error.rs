//! Errors raised by the capture controller.

use thiserror::Error;

/// Failure to start or finish a recording session.
///
/// Start failures leave the recorder idle with nothing acquired.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// The OS refused microphone access.
    #[error("Microphone access was denied: {0}")]
    PermissionDenied(String),

    /// No usable input device, or the device failed while opening.
    #[error("Audio input device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The configured output format cannot be produced on this host.
    #[error("Encoder unavailable: {0}")]
    EncoderUnavailable(String),

    /// Finalizing the clip failed after the session was torn down.
    #[error("Failed to encode recording: {0}")]
    Encoding(String),
}

impl RecorderError {
    /// Classifies a backend error message as a permission or device failure.
    ///
    /// cpal has no dedicated permission variant; CoreAudio and WASAPI report
    /// refusals through backend-specific text.
    pub fn from_backend(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("permission") || lower.contains("access denied") || lower.contains("not authorized") {
            Self::PermissionDenied(message)
        } else {
            Self::DeviceUnavailable(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_permission_messages() {
        assert!(matches!(
            RecorderError::from_backend("Permission denied by user"),
            RecorderError::PermissionDenied(_)
        ));
        assert!(matches!(
            RecorderError::from_backend("E_ACCESSDENIED: Access denied"),
            RecorderError::PermissionDenied(_)
        ));
    }

    #[test]
    fn test_backend_other_messages_are_device_errors() {
        assert!(matches!(
            RecorderError::from_backend("The requested device is no longer available"),
            RecorderError::DeviceUnavailable(_)
        ));
    }
}
