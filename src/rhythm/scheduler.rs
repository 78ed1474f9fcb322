//! RhythmPhaseScheduler - free-running three-phase cue timer.
//!
//! Independent of the audio pipeline. Each `tick` derives the phase from
//! wall-clock time since the cycle started and fires a beat on the first
//! tick that observes Green within a cycle (edge-triggered).

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::phase::{cycle_index, phase_at, Phase, PhaseSnapshot};
use crate::config::PhaseConfig;
use crate::error::{log_rhythm_error, RhythmError};

/// Beat cue, sent to collaborators as `Beat`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatEvent {
    /// Milliseconds on the engine clock of the tick that fired the beat
    pub timestamp_ms: u64,
    /// Cycle number since `start` (0-based)
    pub cycle: u64,
}

/// Scheduler-owned mutable state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseState {
    pub phase: Phase,
    pub progress: f32,
    pub cycle_start_ms: u64,
    pub cycle_index: u64,
    pub beat_fired_this_cycle: bool,
}

impl PhaseState {
    fn reset(cycle_start_ms: u64) -> Self {
        Self {
            phase: Phase::Red,
            progress: 0.0,
            cycle_start_ms,
            cycle_index: 0,
            beat_fired_this_cycle: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RhythmPhaseScheduler {
    config: Option<PhaseConfig>,
    state: PhaseState,
    beats_fired: u64,
}

impl RhythmPhaseScheduler {
    pub fn new() -> Self {
        Self {
            config: None,
            state: PhaseState::reset(0),
            beats_fired: 0,
        }
    }

    /// Start a fresh cycle at `now_ms`, beginning in Red.
    ///
    /// # Errors
    /// `InvalidPhaseDuration` if any phase lasts 0 ms, `CycleTooLong` if the
    /// phases do not fit in a `u64` together; the scheduler keeps its
    /// previous running/stopped state in either case.
    pub fn start(&mut self, config: PhaseConfig, now_ms: u64) -> Result<(), RhythmError> {
        validate(&config).map_err(|err| {
            log_rhythm_error(&err, "RhythmPhaseScheduler::start");
            err
        })?;

        self.config = Some(config);
        self.state = PhaseState::reset(now_ms);
        self.beats_fired = 0;
        info!(
            red_ms = config.red_ms,
            yellow_ms = config.yellow_ms,
            green_ms = config.green_ms,
            "Rhythm scheduler started"
        );
        Ok(())
    }

    /// Reset to `{Red, 0}` and suppress beats until the next `start`.
    pub fn stop(&mut self) {
        if self.config.take().is_some() {
            debug!(beats = self.beats_fired, "Rhythm scheduler stopped");
        }
        self.state = PhaseState::reset(0);
    }

    pub fn is_running(&self) -> bool {
        self.config.is_some()
    }

    pub fn config(&self) -> Option<PhaseConfig> {
        self.config
    }

    pub fn state(&self) -> PhaseState {
        self.state
    }

    pub fn beats_fired(&self) -> u64 {
        self.beats_fired
    }

    /// Current phase and progress; read-only.
    pub fn current_phase(&self) -> PhaseSnapshot {
        PhaseSnapshot {
            phase: self.state.phase,
            progress: self.state.progress,
        }
    }

    /// Advance to `now_ms`.
    ///
    /// # Returns
    /// The beat fired by this tick, if any. Always `None` while stopped.
    pub fn tick(&mut self, now_ms: u64) -> Option<BeatEvent> {
        let config = self.config?;

        let elapsed = now_ms.saturating_sub(self.state.cycle_start_ms);
        let snapshot = phase_at(&config, elapsed);
        let cycle = cycle_index(&config, elapsed);

        if snapshot.phase != Phase::Green || cycle != self.state.cycle_index {
            self.state.beat_fired_this_cycle = false;
        }
        self.state.phase = snapshot.phase;
        self.state.progress = snapshot.progress;
        self.state.cycle_index = cycle;

        if snapshot.phase == Phase::Green && !self.state.beat_fired_this_cycle {
            self.state.beat_fired_this_cycle = true;
            self.beats_fired += 1;
            return Some(BeatEvent {
                timestamp_ms: now_ms,
                cycle,
            });
        }
        None
    }
}

impl Default for RhythmPhaseScheduler {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(config: &PhaseConfig) -> Result<(), RhythmError> {
    for (phase, value_ms) in [
        (Phase::Red, config.red_ms),
        (Phase::Yellow, config.yellow_ms),
        (Phase::Green, config.green_ms),
    ] {
        if value_ms == 0 {
            return Err(RhythmError::InvalidPhaseDuration { phase, value_ms });
        }
    }
    if config.checked_total_cycle_ms().is_none() {
        return Err(RhythmError::CycleTooLong {
            red_ms: config.red_ms,
            yellow_ms: config.yellow_ms,
            green_ms: config.green_ms,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_sequence() {
        let mut scheduler = RhythmPhaseScheduler::new();
        scheduler.start(PhaseConfig::new(1000, 500, 2000), 0).unwrap();

        let samples = [0, 999, 1000, 1499, 1500, 3499, 3500];
        let expected = [
            Phase::Red,
            Phase::Red,
            Phase::Yellow,
            Phase::Yellow,
            Phase::Green,
            Phase::Green,
            Phase::Red,
        ];

        let mut beats = Vec::new();
        for (&t, &phase) in samples.iter().zip(expected.iter()) {
            if let Some(beat) = scheduler.tick(t) {
                beats.push(beat.timestamp_ms);
            }
            assert_eq!(scheduler.current_phase().phase, phase, "at t={}", t);
        }
        assert_eq!(beats, vec![1500]);
    }

    #[test]
    fn test_start_offset_is_respected() {
        let mut scheduler = RhythmPhaseScheduler::new();
        scheduler.start(PhaseConfig::new(100, 100, 100), 10_000).unwrap();
        assert!(scheduler.tick(10_150).is_none());
        assert_eq!(scheduler.current_phase().phase, Phase::Yellow);
        assert_eq!(
            scheduler.tick(10_200),
            Some(BeatEvent {
                timestamp_ms: 10_200,
                cycle: 0
            })
        );
    }

    #[test]
    fn test_beat_is_edge_triggered() {
        let mut scheduler = RhythmPhaseScheduler::new();
        scheduler.start(PhaseConfig::new(10, 10, 100), 0).unwrap();
        let beats: Vec<_> = (0..120).filter_map(|t| scheduler.tick(t)).collect();
        assert_eq!(beats.len(), 1);
        assert_eq!(beats[0].timestamp_ms, 20);
    }

    #[test]
    fn test_green_to_green_across_cycles_fires_again() {
        let mut scheduler = RhythmPhaseScheduler::new();
        scheduler.start(PhaseConfig::new(100, 100, 100), 0).unwrap();
        assert!(scheduler.tick(250).is_some());
        // Exactly one cycle later, still Green: new cycle, new beat
        let beat = scheduler.tick(550).expect("next cycle should fire");
        assert_eq!(beat.cycle, 1);
    }

    #[test]
    fn test_stop_resets_and_suppresses_beats() {
        let mut scheduler = RhythmPhaseScheduler::new();
        scheduler.start(PhaseConfig::new(100, 100, 100), 0).unwrap();
        scheduler.tick(150);
        scheduler.stop();

        assert_eq!(scheduler.current_phase(), PhaseSnapshot::idle());
        assert!(!scheduler.is_running());
        for t in (0..1000).step_by(10) {
            assert!(scheduler.tick(t).is_none());
        }
        assert_eq!(scheduler.current_phase(), PhaseSnapshot::idle());
    }

    #[test]
    fn test_zero_durations_rejected() {
        let mut scheduler = RhythmPhaseScheduler::new();
        for (config, phase) in [
            (PhaseConfig::new(0, 1, 1), Phase::Red),
            (PhaseConfig::new(1, 0, 1), Phase::Yellow),
            (PhaseConfig::new(1, 1, 0), Phase::Green),
        ] {
            assert_eq!(
                scheduler.start(config, 0),
                Err(RhythmError::InvalidPhaseDuration { phase, value_ms: 0 })
            );
            assert!(!scheduler.is_running());
        }
    }

    #[test]
    fn test_overflowing_cycle_rejected_and_tick_is_safe() {
        let mut scheduler = RhythmPhaseScheduler::new();
        let config = PhaseConfig::new(u64::MAX / 2, u64::MAX / 2, 10);
        assert_eq!(
            scheduler.start(config, 0),
            Err(RhythmError::CycleTooLong {
                red_ms: u64::MAX / 2,
                yellow_ms: u64::MAX / 2,
                green_ms: 10,
            })
        );
        assert!(!scheduler.is_running());
        assert!(scheduler.tick(5).is_none());
        assert_eq!(scheduler.current_phase(), PhaseSnapshot::idle());
    }

    #[test]
    fn test_largest_valid_cycle_ticks() {
        let mut scheduler = RhythmPhaseScheduler::new();
        let config = PhaseConfig::new(u64::MAX / 2, u64::MAX / 2, 1);
        scheduler.start(config, 0).unwrap();
        assert!(scheduler.tick(5).is_none());
        assert_eq!(scheduler.current_phase().phase, Phase::Red);
    }

    #[test]
    fn test_restart_resets_phase_state() {
        let mut scheduler = RhythmPhaseScheduler::new();
        scheduler.start(PhaseConfig::new(100, 100, 100), 0).unwrap();
        scheduler.tick(250);
        assert_eq!(scheduler.current_phase().phase, Phase::Green);

        scheduler.start(PhaseConfig::new(100, 100, 100), 260).unwrap();
        assert_eq!(scheduler.current_phase(), PhaseSnapshot::idle());
        assert!(!scheduler.state().beat_fired_this_cycle);
        assert!(scheduler.tick(460).is_some());
    }
}
