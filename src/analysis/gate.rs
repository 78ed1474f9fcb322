// ClapEventGate - threshold + debounce policy over analysed frames
//
// A clap is loud for several consecutive frames; the gate turns that run of
// qualifying frames into exactly one event and then holds off for
// `debounce_ms`.

use crate::config::DetectionConfig;

/// Outcome of gating one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    ClapDetected,
    NoEvent,
}

/// Single-owner debounce memory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateState {
    /// `None` until the first accepted clap
    pub last_clap_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ClapEventGate {
    volume_threshold: f32,
    debounce_ms: u64,
    state: GateState,
}

impl ClapEventGate {
    pub fn new(volume_threshold: f32, debounce_ms: u64) -> Self {
        Self {
            volume_threshold,
            debounce_ms,
            state: GateState::default(),
        }
    }

    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(config.volume_threshold, config.debounce_ms)
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// Forget the last accepted clap
    pub fn reset(&mut self) {
        self.state = GateState::default();
    }

    /// Emit `ClapDetected` iff the frame is loud, clap-shaped and outside the
    /// debounce window of the previous accepted clap.
    ///
    /// Timestamps earlier than the last clap count as zero elapsed time.
    pub fn evaluate(&mut self, loudness: f32, is_spectrally_valid: bool, now_ms: u64) -> GateDecision {
        if !(loudness > self.volume_threshold && is_spectrally_valid) {
            return GateDecision::NoEvent;
        }

        let debounced = self
            .state
            .last_clap_ms
            .map(|last| now_ms.saturating_sub(last) > self.debounce_ms)
            .unwrap_or(true);

        if !debounced {
            return GateDecision::NoEvent;
        }

        self.state.last_clap_ms = Some(now_ms);
        GateDecision::ClapDetected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_qualifying_frame_fires() {
        let mut gate = ClapEventGate::new(0.35, 250);
        assert_eq!(gate.evaluate(0.5, true, 0), GateDecision::ClapDetected);
        assert_eq!(gate.state().last_clap_ms, Some(0));
    }

    #[test]
    fn test_requires_loudness_and_spectral_shape() {
        let mut gate = ClapEventGate::new(0.35, 250);
        assert_eq!(gate.evaluate(0.35, true, 0), GateDecision::NoEvent);
        assert_eq!(gate.evaluate(0.9, false, 0), GateDecision::NoEvent);
        assert_eq!(gate.state().last_clap_ms, None);
    }

    #[test]
    fn test_debounce_boundaries() {
        let debounce = 250;

        let mut gate = ClapEventGate::new(0.35, debounce);
        assert_eq!(gate.evaluate(0.8, true, 0), GateDecision::ClapDetected);
        assert_eq!(gate.evaluate(0.8, true, debounce - 1), GateDecision::NoEvent);
        assert_eq!(gate.evaluate(0.8, true, debounce), GateDecision::NoEvent);

        let mut gate = ClapEventGate::new(0.35, debounce);
        assert_eq!(gate.evaluate(0.8, true, 0), GateDecision::ClapDetected);
        assert_eq!(gate.evaluate(0.8, true, debounce + 1), GateDecision::ClapDetected);
    }

    #[test]
    fn test_suppressed_frames_do_not_extend_window() {
        let mut gate = ClapEventGate::new(0.35, 100);
        assert_eq!(gate.evaluate(0.8, true, 1000), GateDecision::ClapDetected);
        for t in (1016..1100).step_by(16) {
            assert_eq!(gate.evaluate(0.8, true, t), GateDecision::NoEvent);
        }
        assert_eq!(gate.evaluate(0.8, true, 1101), GateDecision::ClapDetected);
    }

    #[test]
    fn test_reset_clears_debounce_memory() {
        let mut gate = ClapEventGate::new(0.35, 250);
        gate.evaluate(0.8, true, 500);
        gate.reset();
        assert_eq!(gate.evaluate(0.8, true, 510), GateDecision::ClapDetected);
    }

    #[test]
    fn test_zero_debounce_still_needs_time_to_pass() {
        let mut gate = ClapEventGate::new(0.0, 0);
        assert_eq!(gate.evaluate(0.1, true, 10), GateDecision::ClapDetected);
        assert_eq!(gate.evaluate(0.1, true, 10), GateDecision::NoEvent);
        assert_eq!(gate.evaluate(0.1, true, 11), GateDecision::ClapDetected);
    }
}
