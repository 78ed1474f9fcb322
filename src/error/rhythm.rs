// Rhythm scheduler error types

use crate::error::ErrorCode;
use crate::rhythm::Phase;
use std::fmt;
use tracing::error;

/// Rhythm error code constants
///
/// Error code range: 2001-2002
pub struct RhythmErrorCodes;

impl RhythmErrorCodes {
    /// A phase duration was zero
    pub const INVALID_PHASE_DURATION: i32 = 2001;

    /// The three phases together exceed the representable cycle length
    pub const CYCLE_TOO_LONG: i32 = 2002;
}

/// Log a rhythm error with structured context
pub fn log_rhythm_error(err: &RhythmError, context: &str) {
    error!(
        code = err.code(),
        component = "RhythmPhaseScheduler",
        "Rhythm error in {}: {}",
        context,
        err.message()
    );
}

/// Errors raised when starting the phase scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RhythmError {
    /// Every phase must last at least one millisecond
    InvalidPhaseDuration { phase: Phase, value_ms: u64 },

    /// red + yellow + green overflows a millisecond counter
    CycleTooLong {
        red_ms: u64,
        yellow_ms: u64,
        green_ms: u64,
    },
}

impl ErrorCode for RhythmError {
    fn code(&self) -> i32 {
        match self {
            RhythmError::InvalidPhaseDuration { .. } => RhythmErrorCodes::INVALID_PHASE_DURATION,
            RhythmError::CycleTooLong { .. } => RhythmErrorCodes::CYCLE_TOO_LONG,
        }
    }

    fn message(&self) -> String {
        match self {
            RhythmError::InvalidPhaseDuration { phase, value_ms } => {
                format!(
                    "{:?} phase duration must be greater than 0 ms (got {})",
                    phase, value_ms
                )
            }
            RhythmError::CycleTooLong {
                red_ms,
                yellow_ms,
                green_ms,
            } => format!(
                "Cycle length overflows (red {} + yellow {} + green {} ms)",
                red_ms, yellow_ms, green_ms
            ),
        }
    }
}

impl fmt::Display for RhythmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RhythmError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for RhythmError {}
