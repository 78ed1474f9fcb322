// FrequencyAnalyser - time-domain window to byte-scaled magnitude spectrum
//
// Mirrors the behaviour of a browser-style analyser node so the detection
// thresholds tuned against byte spectra carry over:
// 1. Blackman window over the most recent `fft_size` samples
// 2. Forward FFT, magnitude |X[k]| / N for the first N/2 bins
// 3. Temporal smoothing: S[k] = tau * S_prev[k] + (1 - tau) * |X[k]|
// 4. dB conversion, linear map of [min_db, max_db] onto [0, 255]

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use crate::config::{DetectionConfig, MAX_MAGNITUDE};

/// Computes byte magnitude spectra with smoothing memory across frames
pub struct FrequencyAnalyser {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    /// Blackman window (pre-computed)
    window: Vec<f32>,
    smoothed: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
}

impl FrequencyAnalyser {
    /// Create an analyser for the transform parameters in `config`
    pub fn new(config: &DetectionConfig) -> Self {
        let fft_size = config.fft_size;
        let fft = FftPlanner::new().plan_fft_forward(fft_size);

        let window = (0..fft_size)
            .map(|i| {
                let x = 2.0 * std::f32::consts::PI * i as f32 / fft_size as f32;
                0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
            })
            .collect();

        Self {
            fft,
            fft_size,
            window,
            smoothed: vec![0.0; fft_size / 2],
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            smoothing: config.smoothing,
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Forget smoothing history (e.g. when a session restarts)
    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|s| *s = 0.0);
    }

    /// Analyse the most recent `fft_size` samples.
    ///
    /// Shorter input is treated as preceded by silence; longer input uses
    /// its tail.
    ///
    /// # Returns
    /// `fft_size / 2` byte magnitudes
    pub fn analyse(&mut self, samples: &[f32]) -> Vec<u8> {
        let tail = &samples[samples.len().saturating_sub(self.fft_size)..];
        let pad = self.fft_size - tail.len();

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = if i < pad { 0.0 } else { tail[i - pad] };
            let sample = if sample.is_finite() { sample } else { 0.0 };
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.buffer);

        let scale = 1.0 / self.fft_size as f32;
        let smoothing = self.smoothing;
        let min_decibels = self.min_decibels;
        let db_range = self.max_decibels - self.min_decibels;

        self.smoothed
            .iter_mut()
            .zip(self.buffer.iter())
            .map(|(smoothed, bin)| {
                let magnitude = bin.norm() * scale;
                *smoothed = smoothing * *smoothed + (1.0 - smoothing) * magnitude;

                if *smoothed <= 0.0 {
                    return 0;
                }
                let db = 20.0 * smoothed.log10();
                let scaled = (db - min_decibels) / db_range * MAX_MAGNITUDE as f32;
                scaled.clamp(0.0, MAX_MAGNITUDE as f32) as u8
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(fft_size: usize, smoothing: f32) -> DetectionConfig {
        DetectionConfig {
            fft_size,
            smoothing,
            ..Default::default()
        }
    }

    fn sine(freq: f32, amplitude: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| {
                amplitude
                    * (2.0 * std::f32::consts::PI * freq * n as f32 / sample_rate as f32).sin()
            })
            .collect()
    }

    #[test]
    fn test_silence_maps_to_zero_bytes() {
        let mut analyser = FrequencyAnalyser::new(&config(1024, 0.0));
        let bins = analyser.analyse(&vec![0.0; 1024]);
        assert_eq!(bins.len(), 512);
        assert!(bins.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_tone_peaks_in_expected_bin() {
        let sample_rate = 48000;
        let fft_size = 2048;
        let mut analyser = FrequencyAnalyser::new(&config(fft_size, 0.0));
        let bins = analyser.analyse(&sine(2000.0, 0.001, sample_rate, fft_size));

        let peak = bins
            .iter()
            .enumerate()
            .max_by_key(|(_, &b)| b)
            .map(|(i, _)| i)
            .unwrap();
        let expected = (2000.0 / (sample_rate as f32 / fft_size as f32)).round() as usize;
        assert_eq!(peak, expected);
        assert!(bins[peak] > 0);
    }

    #[test]
    fn test_short_input_is_zero_padded() {
        let mut analyser = FrequencyAnalyser::new(&config(256, 0.0));
        let bins = analyser.analyse(&[0.0; 10]);
        assert_eq!(bins.len(), 128);
    }

    #[test]
    fn test_smoothing_decays_instead_of_dropping() {
        let sample_rate = 48000;
        let mut analyser = FrequencyAnalyser::new(&config(1024, 0.8));
        let loud = analyser.analyse(&sine(3000.0, 0.01, sample_rate, 1024));
        let after = analyser.analyse(&vec![0.0; 1024]);

        let bin = (3000.0_f32 / (sample_rate as f32 / 1024.0)).round() as usize;
        assert!(after[bin] > 0, "smoothing should retain energy");
        assert!(after[bin] <= loud[bin]);

        analyser.reset();
        let cleared = analyser.analyse(&vec![0.0; 1024]);
        assert_eq!(cleared[bin], 0);
    }
}
