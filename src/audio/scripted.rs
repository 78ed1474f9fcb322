//! Deterministic microphone used by tests, the CLI simulator and WAV replay.
//!
//! Each call to `drain_into` delivers the next scripted step, so one step
//! corresponds to one engine tick. Once the script is exhausted the input
//! keeps delivering nothing (the window goes stale) until closed.

use std::collections::VecDeque;
use std::path::Path;

use futures::future::{self, FutureExt};
use tracing::info;

use super::backend::{AcquireFuture, CaptureConstraints, InputSource, MicrophoneProvider};
use super::ring::SampleWindow;
use crate::error::AudioError;

/// One tick's worth of scripted input
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    /// Samples the device "captured" during this tick
    Samples(Vec<f32>),
    /// The stream dies with this reason
    Fail(String),
}

/// Outcome of the permission request
#[derive(Debug, Clone, PartialEq)]
pub enum AccessOutcome {
    Grant,
    Deny(AudioError),
}

/// Microphone that replays a fixed script
///
/// Every `acquire` starts the script from the beginning, so close + reopen
/// behaves like a fresh device.
#[derive(Debug, Clone)]
pub struct ScriptedMicrophone {
    sample_rate: u32,
    outcome: AccessOutcome,
    script: Vec<ScriptStep>,
}

impl ScriptedMicrophone {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            outcome: AccessOutcome::Grant,
            script: Vec::new(),
        }
    }

    /// Microphone whose permission request always fails with `err`
    pub fn denied(err: AudioError) -> Self {
        Self {
            sample_rate: 48_000,
            outcome: AccessOutcome::Deny(err),
            script: Vec::new(),
        }
    }

    pub fn with_step(mut self, step: ScriptStep) -> Self {
        self.script.push(step);
        self
    }

    pub fn with_samples(self, samples: Vec<f32>) -> Self {
        self.with_step(ScriptStep::Samples(samples))
    }

    pub fn with_blocks<I: IntoIterator<Item = Vec<f32>>>(mut self, blocks: I) -> Self {
        self.script
            .extend(blocks.into_iter().map(ScriptStep::Samples));
        self
    }

    pub fn with_failure(self, reason: impl Into<String>) -> Self {
        self.with_step(ScriptStep::Fail(reason.into()))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn steps(&self) -> usize {
        self.script.len()
    }

    /// Load a WAV file and split it into one block per tick.
    ///
    /// Multi-channel files are reduced to their first channel.
    pub fn from_wav<P: AsRef<Path>>(path: P, tick_rate_hz: u32) -> Result<Self, AudioError> {
        let mut reader = hound::WavReader::open(path.as_ref()).map_err(|e| match e {
            hound::Error::IoError(io) => AudioError::from(io),
            other => AudioError::TransientCapture {
                reason: format!("Failed to read {}: {}", path.as_ref().display(), other),
            },
        })?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(wav_decode_error)?,
            hound::SampleFormat::Int => {
                let scale = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<_, _>>()
                    .map_err(wav_decode_error)?
            }
        };

        let mono: Vec<f32> = interleaved.iter().step_by(channels).copied().collect();
        let block = (spec.sample_rate / tick_rate_hz.max(1)).max(1) as usize;

        info!(
            path = %path.as_ref().display(),
            sample_rate = spec.sample_rate,
            samples = mono.len(),
            "Loaded WAV input"
        );

        Ok(Self::new(spec.sample_rate).with_blocks(mono.chunks(block).map(|c| c.to_vec())))
    }
}

fn wav_decode_error(err: hound::Error) -> AudioError {
    AudioError::TransientCapture {
        reason: format!("Failed to decode WAV samples: {}", err),
    }
}

impl MicrophoneProvider for ScriptedMicrophone {
    fn acquire(&self, _constraints: CaptureConstraints) -> AcquireFuture {
        let result = match &self.outcome {
            AccessOutcome::Grant => Ok(Box::new(ScriptedInput {
                sample_rate: self.sample_rate,
                steps: self.script.iter().cloned().collect(),
                open: true,
            }) as Box<dyn InputSource>),
            AccessOutcome::Deny(err) => Err(err.clone()),
        };
        future::ready(result).boxed_local()
    }
}

/// Input handed out by [`ScriptedMicrophone`]
pub struct ScriptedInput {
    sample_rate: u32,
    steps: VecDeque<ScriptStep>,
    open: bool,
}

impl InputSource for ScriptedInput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn drain_into(&mut self, window: &mut SampleWindow) -> Result<usize, AudioError> {
        if !self.open {
            return Err(AudioError::NotRunning);
        }
        match self.steps.pop_front() {
            Some(ScriptStep::Samples(samples)) => {
                window.push_slice(&samples);
                Ok(samples.len())
            }
            Some(ScriptStep::Fail(reason)) => Err(AudioError::TransientCapture { reason }),
            None => Ok(0),
        }
    }

    fn close(&mut self) {
        self.open = false;
        self.steps.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_denied_microphone_reports_reason() {
        let mic = ScriptedMicrophone::denied(AudioError::PermissionDenied);
        let result = mic.acquire(CaptureConstraints::raw()).await;
        assert_eq!(result.err(), Some(AudioError::PermissionDenied));
    }

    #[tokio::test]
    async fn test_script_replays_one_step_per_drain() {
        let mic = ScriptedMicrophone::new(8000)
            .with_samples(vec![0.1; 4])
            .with_failure("unplugged");
        let mut input = mic.acquire(CaptureConstraints::raw()).await.unwrap();
        let mut window = SampleWindow::new(8);

        assert_eq!(input.drain_into(&mut window), Ok(4));
        assert!(matches!(
            input.drain_into(&mut window),
            Err(AudioError::TransientCapture { .. })
        ));
        assert_eq!(input.drain_into(&mut window), Ok(0));

        input.close();
        input.close();
        assert_eq!(input.drain_into(&mut window), Err(AudioError::NotRunning));
    }

    #[tokio::test]
    async fn test_reacquire_restarts_script() {
        let mic = ScriptedMicrophone::new(8000).with_samples(vec![0.5; 2]);
        let mut window = SampleWindow::new(4);

        let mut first = mic.acquire(CaptureConstraints::raw()).await.unwrap();
        assert_eq!(first.drain_into(&mut window), Ok(2));
        first.close();

        let mut second = mic.acquire(CaptureConstraints::raw()).await.unwrap();
        assert_eq!(second.drain_into(&mut window), Ok(2));
    }
}
