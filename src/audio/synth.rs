//! Deterministic synthetic signals for exercising the detection pipeline.
//!
//! All generators take a seed so identical calls yield identical output.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;

/// Spacing between the partials that make up band-limited noise
const PARTIAL_SPACING_HZ: f32 = 10.0;

/// `len` samples of silence.
pub fn silence(len: usize) -> Vec<f32> {
    vec![0.0; len]
}

/// Uniform white noise in `[-amplitude, amplitude]`.
///
/// Loud broadband noise: passes a volume threshold but carries no
/// clap-band emphasis.
pub fn broadband_noise(len: usize, amplitude: f32, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let amplitude = amplitude.abs();
    (0..len)
        .map(|_| rng.gen_range(-amplitude..=amplitude))
        .collect()
}

/// Noise confined to `[low_hz, high_hz]`, built from random-phase partials.
pub fn band_noise(
    len: usize,
    sample_rate: u32,
    low_hz: f32,
    high_hz: f32,
    partial_amplitude: f32,
    seed: u64,
) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = vec![0.0_f32; len];
    let mut freq = low_hz;
    while freq <= high_hz {
        let phase = rng.gen_range(0.0..2.0 * PI);
        let step = 2.0 * PI * freq / sample_rate as f32;
        for (n, sample) in out.iter_mut().enumerate() {
            *sample += partial_amplitude * (step * n as f32 + phase).sin();
        }
        freq += PARTIAL_SPACING_HZ;
    }
    out
}

/// Clap-like burst: a quiet broadband floor under strong 1.2-3.8 kHz energy.
pub fn clap_burst(len: usize, sample_rate: u32, seed: u64) -> Vec<f32> {
    let floor = broadband_noise(len, 0.08, seed);
    let band = band_noise(len, sample_rate, 1200.0, 3800.0, 0.02, seed.wrapping_add(1));
    floor
        .iter()
        .zip(band.iter())
        .map(|(a, b)| (a + b).clamp(-1.0, 1.0))
        .collect()
}

/// Low-frequency rumble (50-400 Hz) over broadband noise: loud, not a clap.
pub fn rumble(len: usize, sample_rate: u32, seed: u64) -> Vec<f32> {
    let floor = broadband_noise(len, 0.3, seed);
    let low = band_noise(len, sample_rate, 50.0, 400.0, 0.02, seed.wrapping_add(1));
    floor
        .iter()
        .zip(low.iter())
        .map(|(a, b)| (a + b).clamp(-1.0, 1.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generators_are_deterministic() {
        assert_eq!(broadband_noise(64, 0.5, 7), broadband_noise(64, 0.5, 7));
        assert_eq!(clap_burst(64, 48000, 3), clap_burst(64, 48000, 3));
        assert_ne!(broadband_noise(64, 0.5, 7), broadband_noise(64, 0.5, 8));
    }

    #[test]
    fn test_amplitude_bounds() {
        let noise = broadband_noise(1024, 0.25, 1);
        assert!(noise.iter().all(|s| s.abs() <= 0.25));

        let clap = clap_burst(2048, 48000, 1);
        assert!(clap.iter().all(|s| (-1.0..=1.0).contains(s)));
        assert!(clap.iter().any(|s| s.abs() > 0.05));
    }

    #[test]
    fn test_silence() {
        assert!(silence(16).iter().all(|&s| s == 0.0));
    }
}
