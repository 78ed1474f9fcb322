// Analysis module - per-frame clap detection pipeline
//
// Pipeline (one pass per tick, synchronous):
// AudioFrame → loudness (volume) → clap-band ratio (spectral) → debounce (gate)
//
// Analysis and gating are split so a frame from a session that has since
// been closed can finish analysing without touching the gate.

pub mod gate;
pub mod spectral;
pub mod volume;

use serde::{Deserialize, Serialize};

use crate::audio::AudioFrame;
use crate::config::DetectionConfig;

pub use gate::{ClapEventGate, GateDecision, GateState};
pub use spectral::{bin_index, SpectralClapValidator};
pub use volume::{loudness, loudness_of};

/// Accepted clap, sent to collaborators as `ClapDetected`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClapEvent {
    /// Milliseconds on the engine clock
    pub timestamp_ms: u64,
    /// Loudness of the triggering frame in [0, 1]
    pub loudness: f32,
    /// Clap band ratio of the triggering frame (may be +inf, written as "inf")
    #[serde(with = "band_ratio_serde")]
    pub band_ratio: f32,
}

/// JSON has no infinity, so +inf travels as the string "inf".
mod band_ratio_serde {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    const INFINITY: &str = "inf";

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f32),
        Text(String),
    }

    pub fn serialize<S: Serializer>(ratio: &f32, serializer: S) -> Result<S::Ok, S::Error> {
        if *ratio == f32::INFINITY {
            serializer.serialize_str(INFINITY)
        } else {
            ratio.serialize(serializer)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(ratio) => Ok(ratio),
            Repr::Text(text) if text == INFINITY => Ok(f32::INFINITY),
            Repr::Text(text) => Err(D::Error::custom(format!(
                "expected a number or \"{}\" for band_ratio, got \"{}\"",
                INFINITY, text
            ))),
        }
    }
}

/// Measurements for one frame, before gating
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameAnalysis {
    pub loudness: f32,
    /// `None` for malformed frames
    pub band_ratio: Option<f32>,
    pub spectrally_valid: bool,
}

impl FrameAnalysis {
    /// Analysis of a frame that could not be read (fails closed)
    pub fn rejected() -> Self {
        Self {
            loudness: 0.0,
            band_ratio: None,
            spectrally_valid: false,
        }
    }
}

/// Volume analyzer, spectral validator and gate wired together for one session
#[derive(Debug, Clone)]
pub struct ClapDetector {
    validator: SpectralClapValidator,
    gate: ClapEventGate,
    bin_count: usize,
}

impl ClapDetector {
    pub fn new(sample_rate: u32, config: &DetectionConfig) -> Self {
        Self {
            validator: SpectralClapValidator::new(sample_rate, config),
            gate: ClapEventGate::from_config(config),
            bin_count: config.bin_count(),
        }
    }

    pub fn validator(&self) -> &SpectralClapValidator {
        &self.validator
    }

    pub fn gate_state(&self) -> GateState {
        self.gate.state()
    }

    /// Forget debounce memory
    pub fn reset(&mut self) {
        self.gate.reset();
    }

    /// Measure a frame. Pure; malformed frames yield [`FrameAnalysis::rejected`].
    pub fn analyse(&self, frame: &AudioFrame) -> FrameAnalysis {
        if frame.is_empty() || frame.len() != self.bin_count {
            return FrameAnalysis::rejected();
        }

        let band_ratio = self.validator.band_ratio(frame);
        FrameAnalysis {
            loudness: loudness(frame),
            band_ratio,
            spectrally_valid: self.validator.is_clap_like(frame),
        }
    }

    /// Run the debounce gate over a finished analysis.
    pub fn gate(&mut self, analysis: &FrameAnalysis, now_ms: u64) -> Option<ClapEvent> {
        match self
            .gate
            .evaluate(analysis.loudness, analysis.spectrally_valid, now_ms)
        {
            GateDecision::ClapDetected => Some(ClapEvent {
                timestamp_ms: now_ms,
                loudness: analysis.loudness,
                band_ratio: analysis.band_ratio.unwrap_or(0.0),
            }),
            GateDecision::NoEvent => None,
        }
    }

    /// Analyse and gate in one step.
    pub fn process(&mut self, frame: &AudioFrame, now_ms: u64) -> (FrameAnalysis, Option<ClapEvent>) {
        let analysis = self.analyse(frame);
        let clap = self.gate(&analysis, now_ms);
        (analysis, clap)
    }
}

#[cfg(test)]
mod tests;
