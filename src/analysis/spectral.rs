// SpectralClapValidator - is a loud frame's energy distribution clap-like?
//
// A hand clap concentrates energy in roughly 1-4 kHz, while speech, bumps and
// hum sit lower and broadband noise is flat. The validator compares the
// average magnitude inside the clap band with the average outside it.
//
// Algorithm:
// 1. bin(f) = round(f / (sample_rate / fft_size)) for both band edges
// 2. clap_avg  = mean of bins in [low_bin, high_bin]
// 3. other_avg = mean of all remaining bins
// 4. ratio = clap_avg / other_avg (other_avg == 0 -> +inf)
// 5. valid iff ratio > band_energy_ratio

use crate::audio::AudioFrame;
use crate::config::DetectionConfig;

/// Pure clap-shape check bound to one sample rate and transform size
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralClapValidator {
    sample_rate: u32,
    fft_size: usize,
    low_bin: usize,
    high_bin: usize,
    band_energy_ratio: f32,
}

impl SpectralClapValidator {
    /// Create a validator for frames captured at `sample_rate`
    ///
    /// # Arguments
    /// * `sample_rate` - Device sample rate in Hz
    /// * `config` - Supplies `fft_size`, band edges and the ratio threshold
    pub fn new(sample_rate: u32, config: &DetectionConfig) -> Self {
        let fft_size = config.fft_size;
        let last_bin = (fft_size / 2).saturating_sub(1);
        let low_bin = bin_index(config.clap_band_low_hz, sample_rate, fft_size).min(last_bin);
        let high_bin = bin_index(config.clap_band_high_hz, sample_rate, fft_size)
            .min(last_bin)
            .max(low_bin);

        Self {
            sample_rate,
            fft_size,
            low_bin,
            high_bin,
            band_energy_ratio: config.band_energy_ratio,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Inclusive bin range treated as the clap band
    pub fn band_bins(&self) -> (usize, usize) {
        (self.low_bin, self.high_bin)
    }

    /// Clap band average over the rest-of-spectrum average.
    ///
    /// # Returns
    /// `None` for frames that do not match this validator's bin count,
    /// `Some(f32::INFINITY)` when everything outside the band is zero
    pub fn band_ratio(&self, frame: &AudioFrame) -> Option<f32> {
        let bins = frame.bins();
        if bins.is_empty() || bins.len() != self.fft_size / 2 {
            return None;
        }

        let band = &bins[self.low_bin..=self.high_bin];
        let band_sum: u64 = band.iter().map(|&b| b as u64).sum();
        let total_sum: u64 = bins.iter().map(|&b| b as u64).sum();

        let band_avg = band_sum as f32 / band.len() as f32;
        let other_count = bins.len() - band.len();
        let other_avg = if other_count == 0 {
            0.0
        } else {
            (total_sum - band_sum) as f32 / other_count as f32
        };

        if other_avg == 0.0 {
            Some(f32::INFINITY)
        } else {
            Some(band_avg / other_avg)
        }
    }

    /// Whether the frame's spectrum looks like a clap. Malformed frames fail.
    pub fn is_clap_like(&self, frame: &AudioFrame) -> bool {
        self.band_ratio(frame)
            .map(|ratio| ratio > self.band_energy_ratio)
            .unwrap_or(false)
    }
}

/// Bin holding `frequency_hz` for a transform of `fft_size` samples
pub fn bin_index(frequency_hz: f32, sample_rate: u32, fft_size: usize) -> usize {
    if sample_rate == 0 || fft_size == 0 {
        return 0;
    }
    let bin_width = sample_rate as f32 / fft_size as f32;
    (frequency_hz.max(0.0) / bin_width).round() as usize
}
