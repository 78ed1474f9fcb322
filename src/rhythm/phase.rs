//! Phase arithmetic for the Red → Yellow → Green cue cycle.
//!
//! Pure functions of elapsed time: phase boundaries never depend on how many
//! frames were rendered, so jittery tick rates see the same sequence.

use serde::{Deserialize, Serialize};

use crate::config::PhaseConfig;

/// One of the three named intervals of the cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Wait
    Red,
    /// Get ready
    Yellow,
    /// Clap now
    Green,
}

/// Display-only view of the cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseSnapshot {
    pub phase: Phase,
    /// Fraction of the current phase elapsed, in [0, 1]
    pub progress: f32,
}

impl PhaseSnapshot {
    pub fn idle() -> Self {
        Self {
            phase: Phase::Red,
            progress: 0.0,
        }
    }
}

impl Default for PhaseSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}

/// Phase and progress `elapsed_ms` after a cycle start.
///
/// Elapsed time wraps modulo the total cycle length. A config with a zero
/// total yields the idle snapshot.
pub fn phase_at(config: &PhaseConfig, elapsed_ms: u64) -> PhaseSnapshot {
    let total = config.total_cycle_ms();
    if total == 0 {
        return PhaseSnapshot::idle();
    }

    let e = elapsed_ms % total;
    let red_end = config.red_ms;
    let yellow_end = config.red_ms.saturating_add(config.yellow_ms);

    let (phase, into_phase, length) = if e < red_end {
        (Phase::Red, e, config.red_ms)
    } else if e < yellow_end {
        (Phase::Yellow, e - red_end, config.yellow_ms)
    } else {
        (Phase::Green, e - yellow_end, config.green_ms)
    };

    let progress = if length == 0 {
        0.0
    } else {
        (into_phase as f64 / length as f64).clamp(0.0, 1.0) as f32
    };

    PhaseSnapshot { phase, progress }
}

/// Index of the cycle containing `elapsed_ms` (0-based)
pub fn cycle_index(config: &PhaseConfig, elapsed_ms: u64) -> u64 {
    match config.total_cycle_ms() {
        0 => 0,
        total => elapsed_ms / total,
    }
}
