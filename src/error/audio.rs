// Capture and detection error types

use crate::error::ErrorCode;
use std::fmt;
use tracing::error;

/// Audio error code constants
///
/// Error code range: 1001-1007
pub struct AudioErrorCodes;

impl AudioErrorCodes {
    /// User declined microphone access
    pub const PERMISSION_DENIED: i32 = 1001;

    /// No capture device present
    pub const DEVICE_NOT_FOUND: i32 = 1002;

    /// Any other capture-layer failure (stream dropped, backend error)
    pub const TRANSIENT_CAPTURE: i32 = 1003;

    /// Detection configuration rejected before opening the device
    pub const INVALID_CONFIG: i32 = 1004;

    /// Detection is already running
    pub const ALREADY_RUNNING: i32 = 1005;

    /// Detection is not running
    pub const NOT_RUNNING: i32 = 1006;

    /// Device offered a sample format the capture layer cannot convert
    pub const UNSUPPORTED_FORMAT: i32 = 1007;
}

/// Log an audio error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        code = err.code(),
        component = "AudioCaptureSession",
        "Audio error in {}: {}",
        context,
        err.message()
    );
}

/// Audio-related errors
///
/// These cover microphone acquisition, the live capture stream and
/// detection configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// Microphone permission denied
    PermissionDenied,

    /// No input device available
    DeviceNotFound,

    /// Capture failed for any other reason
    TransientCapture { reason: String },

    /// A detection config field is out of range
    InvalidConfig { field: &'static str, reason: String },

    /// Detection already running
    AlreadyRunning,

    /// Detection not running
    NotRunning,

    /// Device sample format not handled
    UnsupportedFormat { format: String },
}

impl AudioError {
    /// Whether retrying the same operation without user action can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AudioError::TransientCapture { .. })
    }
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::PermissionDenied => AudioErrorCodes::PERMISSION_DENIED,
            AudioError::DeviceNotFound => AudioErrorCodes::DEVICE_NOT_FOUND,
            AudioError::TransientCapture { .. } => AudioErrorCodes::TRANSIENT_CAPTURE,
            AudioError::InvalidConfig { .. } => AudioErrorCodes::INVALID_CONFIG,
            AudioError::AlreadyRunning => AudioErrorCodes::ALREADY_RUNNING,
            AudioError::NotRunning => AudioErrorCodes::NOT_RUNNING,
            AudioError::UnsupportedFormat { .. } => AudioErrorCodes::UNSUPPORTED_FORMAT,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::PermissionDenied => {
                "Microphone permission denied. Please grant microphone access.".to_string()
            }
            AudioError::DeviceNotFound => "No audio input device found".to_string(),
            AudioError::TransientCapture { reason } => {
                format!("Audio capture failed: {}", reason)
            }
            AudioError::InvalidConfig { field, reason } => {
                format!("Invalid detection config `{}`: {}", field, reason)
            }
            AudioError::AlreadyRunning => {
                "Detection already running. Call stop_detection() first.".to_string()
            }
            AudioError::NotRunning => {
                "Detection not running. Call start_detection() first.".to_string()
            }
            AudioError::UnsupportedFormat { format } => {
                format!("Unsupported input sample format: {}", format)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}

impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => AudioError::PermissionDenied,
            std::io::ErrorKind::NotFound => AudioError::DeviceNotFound,
            _ => AudioError::TransientCapture {
                reason: err.to_string(),
            },
        }
    }
}
