// VolumeEnvelopeAnalyzer - frame to normalized loudness
//
// Loudness is the arithmetic mean of all bin magnitudes divided by the
// maximum representable magnitude. Stateless: smoothing across frames is
// applied by the capture-side analyser, not here.

use crate::audio::AudioFrame;
use crate::config::MAX_MAGNITUDE;

/// Loudness of a frame in `[0, 1]`; an empty frame is silent.
pub fn loudness(frame: &AudioFrame) -> f32 {
    loudness_of(frame.bins())
}

/// Loudness of raw byte magnitudes in `[0, 1]`.
pub fn loudness_of(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    let sum: u64 = bins.iter().map(|&b| b as u64).sum();
    sum as f32 / bins.len() as f32 / MAX_MAGNITUDE as f32
}
