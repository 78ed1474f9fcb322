// Rhythm module - Red/Yellow/Green cue cycle and beat events

pub mod phase;
pub mod scheduler;

pub use phase::{cycle_index, phase_at, Phase, PhaseSnapshot};
pub use scheduler::{BeatEvent, PhaseState, RhythmPhaseScheduler};
