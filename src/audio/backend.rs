//! Microphone backends.
//!
//! A [`MicrophoneProvider`] performs the one-shot, possibly user-prompting
//! acquisition of an input device and resolves to a live [`InputSource`].
//! Everything runs on the engine's own cooperative thread, so neither trait
//! requires `Send`.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Sample;
use futures::future::{FutureExt, LocalBoxFuture};
use tracing::{debug, info, warn};

use super::ring::{SampleConsumer, SampleRing, SampleWindow};
use crate::error::AudioError;

/// Processing the platform may apply to the captured signal.
///
/// Clap transients are short and loud; echo cancellation, noise suppression
/// and automatic gain all flatten them, so detection asks for raw input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl CaptureConstraints {
    /// All platform processing disabled
    pub fn raw() -> Self {
        Self {
            echo_cancellation: false,
            noise_suppression: false,
            auto_gain_control: false,
        }
    }
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self::raw()
    }
}

/// A live input stream.
pub trait InputSource {
    fn sample_rate(&self) -> u32;

    /// Move samples captured since the last call into `window`.
    ///
    /// Fails with `TransientCapture` once the underlying stream has died.
    fn drain_into(&mut self, window: &mut SampleWindow) -> Result<usize, AudioError>;

    /// Release the device. Must be idempotent.
    fn close(&mut self);
}

/// Future resolving to a granted input or the reason access failed.
pub type AcquireFuture = LocalBoxFuture<'static, Result<Box<dyn InputSource>, AudioError>>;

/// Trait implemented by anything that can hand out microphone input.
pub trait MicrophoneProvider {
    fn acquire(&self, constraints: CaptureConstraints) -> AcquireFuture;
}

/// Ring capacity in seconds of audio; ticks drain far more often than this.
const RING_SECONDS: u32 = 2;

/// Default input device via cpal
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalMicrophone;

impl CpalMicrophone {
    pub fn new() -> Self {
        Self
    }

    /// Names of the input devices on the default host.
    pub fn list_input_devices() -> Result<Vec<String>, AudioError> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| AudioError::TransientCapture {
                reason: format!("Failed to enumerate input devices: {}", e),
            })?;
        Ok(devices
            .map(|d| d.name().unwrap_or_else(|_| "<unnamed>".to_string()))
            .collect())
    }

    fn open_default(constraints: CaptureConstraints) -> Result<CpalInput, AudioError> {
        // cpal hands out unprocessed device input, which is what raw() asks for
        if constraints != CaptureConstraints::raw() {
            warn!(?constraints, "cpal input ignores platform processing constraints");
        }

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(AudioError::DeviceNotFound)?;

        let supported = device
            .default_input_config()
            .map_err(map_default_config_error)?;

        let sample_rate = supported.sample_rate().0;
        let stream_config: cpal::StreamConfig = supported.clone().into();
        let channels = stream_config.channels as usize;

        let (mut producer, consumer) = SampleRing::new((sample_rate * RING_SECONDS) as usize);
        let failure: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
        let failure_slot = Arc::clone(&failure);
        let err_fn = move |err: cpal::StreamError| {
            if let Ok(mut slot) = failure_slot.lock() {
                slot.get_or_insert_with(|| err.to_string());
            }
        };

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    producer.push_interleaved(data, channels, |s| s)
                },
                err_fn,
                None,
            ),
            cpal::SampleFormat::I16 => device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    producer.push_interleaved(data, channels, |s| s.to_sample::<f32>())
                },
                err_fn,
                None,
            ),
            cpal::SampleFormat::U16 => device.build_input_stream(
                &stream_config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    producer.push_interleaved(data, channels, |s| s.to_sample::<f32>())
                },
                err_fn,
                None,
            ),
            other => {
                return Err(AudioError::UnsupportedFormat {
                    format: format!("{:?}", other),
                })
            }
        }
        .map_err(map_build_error)?;

        stream.play().map_err(|e| match e {
            cpal::PlayStreamError::DeviceNotAvailable => AudioError::DeviceNotFound,
            other => AudioError::TransientCapture {
                reason: format!("Input start failed: {}", other),
            },
        })?;

        info!(
            device = %device.name().unwrap_or_default(),
            sample_rate,
            channels,
            "Opened cpal input stream"
        );

        Ok(CpalInput {
            stream: Some(stream),
            consumer,
            sample_rate,
            failure,
        })
    }
}

impl MicrophoneProvider for CpalMicrophone {
    fn acquire(&self, constraints: CaptureConstraints) -> AcquireFuture {
        async move {
            let input = Self::open_default(constraints)?;
            Ok(Box::new(input) as Box<dyn InputSource>)
        }
        .boxed_local()
    }
}

/// Open cpal stream plus the consumer end of its sample ring
pub struct CpalInput {
    stream: Option<cpal::Stream>,
    consumer: SampleConsumer,
    sample_rate: u32,
    failure: Arc<Mutex<Option<String>>>,
}

impl InputSource for CpalInput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn drain_into(&mut self, window: &mut SampleWindow) -> Result<usize, AudioError> {
        if self.stream.is_none() {
            return Err(AudioError::NotRunning);
        }
        let failure = self
            .failure
            .lock()
            .map(|slot| slot.clone())
            .unwrap_or_else(|_| Some("stream error slot poisoned".to_string()));
        if let Some(reason) = failure {
            return Err(AudioError::TransientCapture { reason });
        }
        Ok(self.consumer.drain_into(window))
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            debug!(
                dropped_samples = self.consumer.dropped_samples(),
                "Closing cpal input stream"
            );
            drop(stream);
        }
    }
}

impl Drop for CpalInput {
    fn drop(&mut self) {
        self.close();
    }
}

fn looks_like_permission_problem(description: &str) -> bool {
    let lower = description.to_lowercase();
    lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized")
}

fn map_backend_error(description: String) -> AudioError {
    if looks_like_permission_problem(&description) {
        AudioError::PermissionDenied
    } else {
        AudioError::TransientCapture {
            reason: description,
        }
    }
}

fn map_default_config_error(err: cpal::DefaultStreamConfigError) -> AudioError {
    match err {
        cpal::DefaultStreamConfigError::DeviceNotAvailable => AudioError::DeviceNotFound,
        cpal::DefaultStreamConfigError::StreamTypeNotSupported => AudioError::UnsupportedFormat {
            format: "input stream type".to_string(),
        },
        cpal::DefaultStreamConfigError::BackendSpecific { err } => {
            map_backend_error(err.description)
        }
    }
}

fn map_build_error(err: cpal::BuildStreamError) -> AudioError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => AudioError::DeviceNotFound,
        cpal::BuildStreamError::BackendSpecific { err } => map_backend_error(err.description),
        other => AudioError::TransientCapture {
            reason: format!("Failed to open input stream: {}", other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constraints_are_raw() {
        let constraints = CaptureConstraints::default();
        assert!(!constraints.echo_cancellation);
        assert!(!constraints.noise_suppression);
        assert!(!constraints.auto_gain_control);
    }

    #[test]
    fn test_backend_error_mapping() {
        assert_eq!(
            map_backend_error("Permission denied by user".to_string()),
            AudioError::PermissionDenied
        );
        assert!(matches!(
            map_backend_error("buffer underrun".to_string()),
            AudioError::TransientCapture { .. }
        ));
        assert_eq!(
            map_build_error(cpal::BuildStreamError::DeviceNotAvailable),
            AudioError::DeviceNotFound
        );
    }
}
