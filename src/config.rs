//! Configuration management for detection and rhythm parameters
//!
//! The detection constants (threshold, debounce, band ratio) are empirically
//! tuned per microphone, so they live in a JSON file that can be edited
//! without recompiling. Missing or broken files fall back to defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{AudioError, ConfigError};

/// Largest magnitude an [`crate::audio::AudioFrame`] bin can hold.
pub const MAX_MAGNITUDE: u8 = u8::MAX;

const MIN_FFT_SIZE: usize = 32;
const MAX_FFT_SIZE: usize = 32768;

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub rhythm: PhaseConfig,
    #[serde(default)]
    pub driver: DriverConfig,
}

/// Clap detection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Normalized loudness a frame must exceed, in [0, 1]
    pub volume_threshold: f32,
    /// Minimum gap between two accepted claps
    pub debounce_ms: u64,
    /// Transform size in samples; frames carry `fft_size / 2` bins
    pub fft_size: usize,
    /// Temporal smoothing of bin magnitudes between frames, in [0, 1)
    pub smoothing: f32,
    /// Lower edge of the clap band
    pub clap_band_low_hz: f32,
    /// Upper edge of the clap band
    pub clap_band_high_hz: f32,
    /// Clap band average must exceed the rest of the spectrum by this factor
    pub band_energy_ratio: f32,
    /// Magnitude (dB) mapped to byte 0
    pub min_decibels: f32,
    /// Magnitude (dB) mapped to byte 255
    pub max_decibels: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            volume_threshold: 0.35,
            debounce_ms: 250,
            fft_size: 2048,
            // Low smoothing keeps clap transients from being averaged away
            smoothing: 0.2,
            clap_band_low_hz: 1000.0,
            clap_band_high_hz: 4000.0,
            band_energy_ratio: 1.2,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

impl DetectionConfig {
    /// Number of frequency bins in each frame.
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Reject values the analysis pipeline cannot work with.
    pub fn validate(&self) -> Result<(), AudioError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> AudioError {
            AudioError::InvalidConfig {
                field,
                reason: reason.into(),
            }
        }

        if !(0.0..=1.0).contains(&self.volume_threshold) {
            return Err(invalid(
                "volume_threshold",
                format!("must be within [0, 1] (got {})", self.volume_threshold),
            ));
        }
        if !self.fft_size.is_power_of_two()
            || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&self.fft_size)
        {
            return Err(invalid(
                "fft_size",
                format!(
                    "must be a power of two in [{}, {}] (got {})",
                    MIN_FFT_SIZE, MAX_FFT_SIZE, self.fft_size
                ),
            ));
        }
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(invalid(
                "smoothing",
                format!("must be within [0, 1) (got {})", self.smoothing),
            ));
        }
        if !(self.clap_band_low_hz >= 0.0 && self.clap_band_low_hz < self.clap_band_high_hz) {
            return Err(invalid(
                "clap_band_low_hz",
                format!(
                    "band must satisfy 0 <= low < high (got {}..{})",
                    self.clap_band_low_hz, self.clap_band_high_hz
                ),
            ));
        }
        if !(self.band_energy_ratio.is_finite() && self.band_energy_ratio >= 0.0) {
            return Err(invalid(
                "band_energy_ratio",
                format!("must be a finite non-negative number (got {})", self.band_energy_ratio),
            ));
        }
        if !(self.min_decibels < self.max_decibels) {
            return Err(invalid(
                "min_decibels",
                format!(
                    "must be below max_decibels ({} >= {})",
                    self.min_decibels, self.max_decibels
                ),
            ));
        }
        Ok(())
    }
}

/// Durations of the three rhythm phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseConfig {
    pub red_ms: u64,
    pub yellow_ms: u64,
    pub green_ms: u64,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            red_ms: 1000,
            yellow_ms: 500,
            green_ms: 2000,
        }
    }
}

impl PhaseConfig {
    pub fn new(red_ms: u64, yellow_ms: u64, green_ms: u64) -> Self {
        Self {
            red_ms,
            yellow_ms,
            green_ms,
        }
    }

    /// Full cycle length, or `None` if the sum overflows.
    pub fn checked_total_cycle_ms(&self) -> Option<u64> {
        self.red_ms
            .checked_add(self.yellow_ms)?
            .checked_add(self.green_ms)
    }

    /// Full cycle length, saturating at `u64::MAX`.
    pub fn total_cycle_ms(&self) -> u64 {
        self.red_ms
            .saturating_add(self.yellow_ms)
            .saturating_add(self.green_ms)
    }
}

/// Frame driver cadence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Ticks per second (display refresh rate)
    pub tick_rate_hz: u32,
    /// Capacity of the engine event broadcast channel
    pub event_channel_capacity: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60,
            event_channel_capacity: 128,
        }
    }
}

impl DriverConfig {
    /// Interval between ticks, never shorter than one millisecond.
    pub fn tick_interval(&self) -> std::time::Duration {
        let hz = self.tick_rate_hz.max(1) as u64;
        std::time::Duration::from_micros((1_000_000 / hz).max(1_000))
    }
}

impl AppConfig {
    /// Load configuration from a JSON file, reporting failures.
    pub fn try_load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let display = path.as_ref().display().to_string();
        let contents = fs::read_to_string(&path).map_err(|err| ConfigError::Io {
            path: display.clone(),
            reason: err.to_string(),
        })?;
        serde_json::from_str(&contents).map_err(|err| ConfigError::Parse {
            path: display,
            reason: err.to_string(),
        })
    }

    /// Load configuration from a JSON file
    ///
    /// # Returns
    /// The parsed configuration, or defaults if the file is missing or
    /// invalid (a warning is logged in that case).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match Self::try_load_from_file(&path) {
            Ok(config) => {
                log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                config
            }
            Err(err) => {
                log::warn!("[Config] {}. Using defaults.", err);
                Self::default()
            }
        }
    }

    /// Load configuration from the default asset location
    pub fn load() -> Self {
        Self::load_from_file("assets/clapbeat_config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.detection.volume_threshold, 0.35);
        assert_eq!(config.detection.debounce_ms, 250);
        assert_eq!(config.detection.band_energy_ratio, 1.2);
        assert_eq!(config.detection.bin_count(), 1024);
        assert_eq!(config.rhythm.total_cycle_ms(), 3500);
        assert_eq!(config.driver.tick_rate_hz, 60);
        assert!(config.detection.validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{ "detection": { "debounce_ms": 400 } }"#).unwrap();
        assert_eq!(parsed.detection.debounce_ms, 400);
        assert_eq!(parsed.detection.fft_size, 2048);
        assert_eq!(parsed.rhythm, PhaseConfig::default());
    }

    #[test]
    fn test_negative_phase_duration_is_rejected_by_parser() {
        let parsed = serde_json::from_str::<PhaseConfig>(r#"{ "red_ms": -5 }"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let cases: Vec<(&str, DetectionConfig)> = vec![
            (
                "volume_threshold",
                DetectionConfig {
                    volume_threshold: 1.5,
                    ..Default::default()
                },
            ),
            (
                "fft_size",
                DetectionConfig {
                    fft_size: 1000,
                    ..Default::default()
                },
            ),
            (
                "smoothing",
                DetectionConfig {
                    smoothing: 1.0,
                    ..Default::default()
                },
            ),
            (
                "clap_band_low_hz",
                DetectionConfig {
                    clap_band_low_hz: 5000.0,
                    ..Default::default()
                },
            ),
            (
                "min_decibels",
                DetectionConfig {
                    min_decibels: -20.0,
                    ..Default::default()
                },
            ),
        ];

        for (expected_field, config) in cases {
            match config.validate() {
                Err(AudioError::InvalidConfig { field, .. }) => {
                    assert_eq!(field, expected_field)
                }
                other => panic!("expected InvalidConfig for {}, got {:?}", expected_field, other),
            }
        }
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_file("does/not/exist.json");
        assert_eq!(config, AppConfig::default());
        assert!(matches!(
            AppConfig::try_load_from_file("does/not/exist.json"),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_shipped_asset_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/clapbeat_config.json");
        assert_eq!(AppConfig::try_load_from_file(path).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_total_cycle_never_overflows() {
        let huge = PhaseConfig::new(u64::MAX / 2, u64::MAX / 2, 10);
        assert_eq!(huge.checked_total_cycle_ms(), None);
        assert_eq!(huge.total_cycle_ms(), u64::MAX);
        assert_eq!(PhaseConfig::default().checked_total_cycle_ms(), Some(3500));
    }

    #[test]
    fn test_tick_interval() {
        let driver = DriverConfig::default();
        assert_eq!(driver.tick_interval().as_micros(), 16_666);
    }
}
