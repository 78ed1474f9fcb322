//! Events published by the engine to its collaborators.

use serde::{Deserialize, Serialize};

use crate::analysis::ClapEvent;
use crate::config::PhaseConfig;
use crate::rhythm::BeatEvent;

/// Everything the engine announces, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EngineEvent {
    ClapDetected(ClapEvent),
    Beat(BeatEvent),
    DetectionStarted { session_id: u64, sample_rate: u32 },
    DetectionStopped { session_id: u64 },
    /// Capture failed; detection has already been stopped
    DetectionFailed { code: i32, message: String },
    RhythmStarted { config: PhaseConfig },
    RhythmStopped,
}

impl EngineEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            EngineEvent::ClapDetected(_) => "clap_detected",
            EngineEvent::Beat(_) => "beat",
            EngineEvent::DetectionStarted { .. } => "detection_started",
            EngineEvent::DetectionStopped { .. } => "detection_stopped",
            EngineEvent::DetectionFailed { .. } => "detection_failed",
            EngineEvent::RhythmStarted { .. } => "rhythm_started",
            EngineEvent::RhythmStopped => "rhythm_stopped",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_tag_matches_kind() {
        let events = [
            EngineEvent::Beat(BeatEvent {
                timestamp_ms: 1500,
                cycle: 0,
            }),
            EngineEvent::DetectionStopped { session_id: 3 },
            EngineEvent::RhythmStopped,
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], event.kind());
        }
    }

    #[test]
    fn test_clap_event_json_shape() {
        let event = EngineEvent::ClapDetected(ClapEvent {
            timestamp_ms: 42,
            loudness: 0.5,
            band_ratio: 2.0,
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["data"]["timestamp_ms"], 42);
        assert_eq!(value["data"]["loudness"], 0.5);
        assert_eq!(value["data"]["band_ratio"], 2.0);
    }

    #[test]
    fn test_infinite_band_ratio_survives_json() {
        let event = EngineEvent::ClapDetected(ClapEvent {
            timestamp_ms: 1200,
            loudness: 0.8,
            band_ratio: f32::INFINITY,
        });
        let line = serde_json::to_string(&event).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["data"]["band_ratio"], "inf");

        let parsed: EngineEvent = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_unknown_band_ratio_text_is_rejected() {
        let line = r#"{"type":"clap_detected","data":{"timestamp_ms":1,"loudness":0.5,"band_ratio":"nan"}}"#;
        assert!(serde_json::from_str::<EngineEvent>(line).is_err());
    }
}
