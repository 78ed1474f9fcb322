// AudioCaptureSession - owns the microphone and yields one frame per tick

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

use super::analyser::FrequencyAnalyser;
use super::backend::{CaptureConstraints, InputSource, MicrophoneProvider};
use super::frame::AudioFrame;
use super::ring::SampleWindow;
use crate::config::DetectionConfig;
use crate::error::{log_audio_error, AudioError};

/// Session ids start at 1 so a default-tagged frame never matches a session.
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// A single open microphone plus the analyser state fed from it.
///
/// The only component that touches hardware. Frames are produced on demand
/// (`next_frame`), once per scheduler tick; nothing here blocks.
pub struct AudioCaptureSession {
    source: Option<Box<dyn InputSource>>,
    analyser: FrequencyAnalyser,
    window: SampleWindow,
    scratch: Vec<f32>,
    sample_rate: u32,
    session_id: u64,
    frames_produced: u64,
}

impl AudioCaptureSession {
    /// Request the microphone and prepare the analyser.
    ///
    /// Suspends until the platform grants or denies access.
    ///
    /// # Errors
    /// - `InvalidConfig` if `config` fails validation (device untouched)
    /// - `PermissionDenied`, `DeviceNotFound`, `TransientCapture` from the provider
    pub async fn open(
        provider: &dyn MicrophoneProvider,
        config: &DetectionConfig,
    ) -> Result<Self, AudioError> {
        config.validate()?;

        let source = provider
            .acquire(CaptureConstraints::raw())
            .await
            .map_err(|err| {
                log_audio_error(&err, "AudioCaptureSession::open");
                err
            })?;

        let sample_rate = source.sample_rate();
        let session_id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        info!(session_id, sample_rate, fft_size = config.fft_size, "Capture session opened");

        Ok(Self {
            source: Some(source),
            analyser: FrequencyAnalyser::new(config),
            window: SampleWindow::new(config.fft_size),
            scratch: Vec::with_capacity(config.fft_size),
            sample_rate,
            session_id,
            frames_produced: 0,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn is_open(&self) -> bool {
        self.source.is_some()
    }

    pub fn frames_produced(&self) -> u64 {
        self.frames_produced
    }

    /// Produce the frame for the current tick.
    ///
    /// A capture failure closes the session before the error is returned, so
    /// a dead stream is never analysed again.
    pub fn next_frame(&mut self) -> Result<AudioFrame, AudioError> {
        let source = self.source.as_mut().ok_or(AudioError::NotRunning)?;
        let drained = source.drain_into(&mut self.window);

        if let Err(err) = drained {
            log_audio_error(&err, "AudioCaptureSession::next_frame");
            self.close();
            return Err(err);
        }

        self.window.copy_ordered(&mut self.scratch);
        let bins = self.analyser.analyse(&self.scratch);
        self.frames_produced += 1;

        Ok(AudioFrame::new(bins, self.sample_rate).with_session(self.session_id))
    }

    /// Release the device. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.close();
            self.window.clear();
            self.analyser.reset();
            debug!(
                session_id = self.session_id,
                frames = self.frames_produced,
                "Capture session closed"
            );
        }
    }
}

impl Drop for AudioCaptureSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::scripted::ScriptedMicrophone;
    use crate::audio::synth;

    fn small_config() -> DetectionConfig {
        DetectionConfig {
            fft_size: 256,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_frame_length_is_half_fft_size() {
        let mic = ScriptedMicrophone::new(48000).with_samples(synth::broadband_noise(256, 0.5, 1));
        let mut session = AudioCaptureSession::open(&mic, &small_config()).await.unwrap();

        let frame = session.next_frame().unwrap();
        assert_eq!(frame.len(), 128);
        assert_eq!(frame.sample_rate(), 48000);
        assert_eq!(frame.session_id(), session.session_id());
    }

    #[tokio::test]
    async fn test_open_rejects_invalid_config_before_touching_device() {
        let mic = ScriptedMicrophone::denied(AudioError::PermissionDenied);
        let config = DetectionConfig {
            fft_size: 300,
            ..Default::default()
        };
        let result = AudioCaptureSession::open(&mic, &config).await;
        assert!(matches!(result, Err(AudioError::InvalidConfig { field: "fft_size", .. })));
    }

    #[tokio::test]
    async fn test_permission_denied_is_surfaced() {
        let mic = ScriptedMicrophone::denied(AudioError::PermissionDenied);
        let result = AudioCaptureSession::open(&mic, &small_config()).await;
        assert!(matches!(result, Err(AudioError::PermissionDenied)));
    }

    #[tokio::test]
    async fn test_stream_failure_closes_session() {
        let mic = ScriptedMicrophone::new(48000).with_failure("device unplugged");
        let mut session = AudioCaptureSession::open(&mic, &small_config()).await.unwrap();

        assert!(matches!(
            session.next_frame(),
            Err(AudioError::TransientCapture { .. })
        ));
        assert!(!session.is_open());
        assert_eq!(session.next_frame(), Err(AudioError::NotRunning));
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_ids_are_unique() {
        let mic = ScriptedMicrophone::new(48000);
        let mut first = AudioCaptureSession::open(&mic, &small_config()).await.unwrap();
        first.close();
        first.close();
        assert!(!first.is_open());

        let second = AudioCaptureSession::open(&mic, &small_config()).await.unwrap();
        assert_ne!(first.session_id(), second.session_id());
    }
}
