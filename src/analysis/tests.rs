use super::*;
use crate::audio::{synth, FrequencyAnalyser};

const SAMPLE_RATE: u32 = 48000;

fn clap_frame(detector: &ClapDetector, magnitude: u8) -> AudioFrame {
    let (low, high) = detector.validator().band_bins();
    let mut frame = AudioFrame::uniform(1024, 0, SAMPLE_RATE);
    for bin in &mut frame.bins_mut()[low..=high] {
        *bin = magnitude;
    }
    frame
}

#[test]
fn test_all_zero_frames_never_clap() {
    for threshold in [0.0_f32, 0.1, 0.35, 1.0] {
        let config = DetectionConfig {
            volume_threshold: threshold,
            ..Default::default()
        };
        let mut detector = ClapDetector::new(SAMPLE_RATE, &config);
        let frame = AudioFrame::uniform(config.bin_count(), 0, SAMPLE_RATE);
        for t in 0..50 {
            let (analysis, clap) = detector.process(&frame, t * 100);
            assert_eq!(analysis.loudness, 0.0);
            assert!(clap.is_none(), "threshold {} fired on silence", threshold);
        }
    }
}

#[test]
fn test_uniform_loud_frame_is_not_a_clap() {
    let mut detector = ClapDetector::new(SAMPLE_RATE, &DetectionConfig::default());
    let frame = AudioFrame::uniform(1024, 255, SAMPLE_RATE);
    let (analysis, clap) = detector.process(&frame, 0);
    assert!(analysis.loudness > 0.99);
    assert!(!analysis.spectrally_valid);
    assert!(clap.is_none());
}

#[test]
fn test_band_concentrated_loud_frame_claps_once_per_debounce() {
    let config = DetectionConfig {
        volume_threshold: 0.05,
        ..Default::default()
    };
    let mut detector = ClapDetector::new(SAMPLE_RATE, &config);
    let frame = clap_frame(&detector, 255);

    let (_, first) = detector.process(&frame, 0);
    let first = first.expect("loud clap-band frame should fire");
    assert_eq!(first.band_ratio, f32::INFINITY);

    let (_, second) = detector.process(&frame, config.debounce_ms - 1);
    assert!(second.is_none());

    let (_, third) = detector.process(&frame, config.debounce_ms + 1);
    assert!(third.is_some());
}

#[test]
fn test_malformed_frame_is_rejected() {
    let mut detector = ClapDetector::new(SAMPLE_RATE, &DetectionConfig::default());
    let (analysis, clap) = detector.process(&AudioFrame::new(vec![255; 10], SAMPLE_RATE), 0);
    assert_eq!(analysis, FrameAnalysis::rejected());
    assert!(clap.is_none());
}

#[test]
fn test_analyse_does_not_touch_gate() {
    let config = DetectionConfig {
        volume_threshold: 0.05,
        ..Default::default()
    };
    let detector = ClapDetector::new(SAMPLE_RATE, &config);
    let analysis = detector.analyse(&clap_frame(&detector, 255));
    assert!(analysis.spectrally_valid);
    assert_eq!(detector.gate_state().last_clap_ms, None);
}

#[test]
fn test_synthetic_clap_passes_full_pipeline() {
    let config = DetectionConfig::default();
    let mut analyser = FrequencyAnalyser::new(&config);
    let mut detector = ClapDetector::new(SAMPLE_RATE, &config);

    let bins = analyser.analyse(&synth::clap_burst(config.fft_size, SAMPLE_RATE, 11));
    let frame = AudioFrame::new(bins, SAMPLE_RATE);
    let (analysis, clap) = detector.process(&frame, 1000);

    assert!(
        analysis.loudness > config.volume_threshold,
        "loudness {}",
        analysis.loudness
    );
    assert!(analysis.spectrally_valid, "ratio {:?}", analysis.band_ratio);
    assert!(clap.is_some());
}

#[test]
fn test_broadband_noise_is_loud_but_rejected() {
    let config = DetectionConfig::default();
    let mut analyser = FrequencyAnalyser::new(&config);
    let detector = ClapDetector::new(SAMPLE_RATE, &config);

    let bins = analyser.analyse(&synth::broadband_noise(config.fft_size, 0.5, 5));
    let analysis = detector.analyse(&AudioFrame::new(bins, SAMPLE_RATE));

    assert!(analysis.loudness > config.volume_threshold);
    assert!(!analysis.spectrally_valid, "ratio {:?}", analysis.band_ratio);
}

#[test]
fn test_rumble_is_rejected() {
    let config = DetectionConfig::default();
    let mut analyser = FrequencyAnalyser::new(&config);
    let detector = ClapDetector::new(SAMPLE_RATE, &config);

    let bins = analyser.analyse(&synth::rumble(config.fft_size, SAMPLE_RATE, 9));
    let analysis = detector.analyse(&AudioFrame::new(bins, SAMPLE_RATE));
    assert!(!analysis.spectrally_valid, "ratio {:?}", analysis.band_ratio);
}
