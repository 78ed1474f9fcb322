// Error types for the clap detection and rhythm engine
//
// One enum per concern (capture, rhythm scheduling, configuration loading),
// each carrying a stable numeric code so callers on the other side of an FFI
// or JSON boundary can branch without string matching.

mod audio;
mod config;
mod rhythm;

pub use audio::{log_audio_error, AudioError, AudioErrorCodes};
pub use config::{ConfigError, ConfigErrorCodes};
pub use rhythm::{log_rhythm_error, RhythmError, RhythmErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the crate boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
