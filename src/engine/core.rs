//! ClapRhythmEngine: one capture session, one clap detector and one rhythm
//! scheduler, advanced together once per tick.
//!
//! Everything here runs on the caller's thread. `tick` is synchronous and
//! never blocks; the only suspension point is microphone acquisition inside
//! `start_detection`.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::analysis::{ClapDetector, ClapEvent};
use crate::audio::{AudioCaptureSession, AudioFrame, CpalMicrophone, MicrophoneProvider};
use crate::config::{DetectionConfig, DriverConfig, PhaseConfig};
use crate::debug::pipeline_tracer;
use crate::engine::clock::{SystemTimeSource, TimeSource};
use crate::engine::events::EngineEvent;
use crate::error::{log_audio_error, AudioError, ErrorCode, RhythmError};
use crate::rhythm::{BeatEvent, PhaseSnapshot, RhythmPhaseScheduler};

type ClapListener = Box<dyn FnMut(&ClapEvent)>;
type BeatListener = Box<dyn FnMut(&BeatEvent)>;

/// What a single tick produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub clap: Option<ClapEvent>,
    pub beat: Option<BeatEvent>,
    /// Capture failure that ended detection during this tick
    pub failure: Option<AudioError>,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.clap.is_none() && self.beat.is_none() && self.failure.is_none()
    }
}

pub struct ClapRhythmEngine {
    provider: Box<dyn MicrophoneProvider>,
    time_source: Arc<dyn TimeSource>,
    events: broadcast::Sender<EngineEvent>,

    session: Option<AudioCaptureSession>,
    /// Id frames must carry to reach the gate; `None` while stopped
    active_session_id: Option<u64>,
    /// Kept after stop so late frames can still be measured
    detector: Option<ClapDetector>,
    detection_config: Option<DetectionConfig>,

    scheduler: RhythmPhaseScheduler,

    clap_listeners: Vec<ClapListener>,
    beat_listeners: Vec<BeatListener>,
}

impl ClapRhythmEngine {
    pub fn new(
        provider: Box<dyn MicrophoneProvider>,
        time_source: Arc<dyn TimeSource>,
        driver: &DriverConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(driver.event_channel_capacity.max(1));
        Self {
            provider,
            time_source,
            events,
            session: None,
            active_session_id: None,
            detector: None,
            detection_config: None,
            scheduler: RhythmPhaseScheduler::new(),
            clap_listeners: Vec::new(),
            beat_listeners: Vec::new(),
        }
    }

    /// Engine on the default input device and the system clock.
    pub fn with_default_microphone(driver: &DriverConfig) -> Self {
        Self::new(
            Box::new(CpalMicrophone::new()),
            Arc::new(SystemTimeSource::new()),
            driver,
        )
    }

    // ========================================================================
    // DETECTION
    // ========================================================================

    /// Acquire the microphone and begin clap detection.
    ///
    /// Restarting always begins with a fresh gate (no debounce carried over)
    /// and a fresh analyser.
    ///
    /// # Errors
    /// - `AlreadyRunning` if a session is open
    /// - `InvalidConfig` if `config` fails validation
    /// - `PermissionDenied`, `DeviceNotFound`, `TransientCapture` on acquisition failure
    pub async fn start_detection(&mut self, config: DetectionConfig) -> Result<(), AudioError> {
        if self.session.is_some() {
            let err = AudioError::AlreadyRunning;
            log_audio_error(&err, "start_detection");
            return Err(err);
        }

        let session = AudioCaptureSession::open(self.provider.as_ref(), &config).await?;
        let session_id = session.session_id();
        let sample_rate = session.sample_rate();

        self.detector = Some(ClapDetector::new(sample_rate, &config));
        self.detection_config = Some(config);
        self.active_session_id = Some(session_id);
        self.session = Some(session);

        info!(session_id, sample_rate, "Clap detection started");
        self.emit(EngineEvent::DetectionStarted {
            session_id,
            sample_rate,
        });
        Ok(())
    }

    /// Close the microphone. Safe to call when nothing is running.
    pub fn stop_detection(&mut self) {
        self.active_session_id = None;
        if let Some(mut session) = self.session.take() {
            session.close();
            let session_id = session.session_id();
            info!(
                session_id,
                frames = session.frames_produced(),
                "Clap detection stopped"
            );
            self.emit(EngineEvent::DetectionStopped { session_id });
        }
    }

    pub fn is_detecting(&self) -> bool {
        self.session.is_some()
    }

    /// Id of the open session, if any
    pub fn session_id(&self) -> Option<u64> {
        self.active_session_id
    }

    pub fn detection_config(&self) -> Option<&DetectionConfig> {
        self.detection_config.as_ref()
    }

    /// Analyse one frame and, if it belongs to the open session, gate it.
    ///
    /// Frames tagged with any other session id (captured before a stop or
    /// restart) are measured for tracing but never produce a clap.
    pub fn process_frame(&mut self, frame: &AudioFrame, now_ms: u64) -> Option<ClapEvent> {
        let stale = self.active_session_id != Some(frame.session_id());
        pipeline_tracer::trace_frame(frame.session_id(), frame.len(), stale);

        let detector = self.detector.as_mut()?;
        let analysis = detector.analyse(frame);
        pipeline_tracer::trace_loudness(
            analysis.loudness,
            self.detection_config
                .as_ref()
                .map(|c| c.volume_threshold)
                .unwrap_or_default(),
        );
        pipeline_tracer::trace_spectral(analysis.band_ratio, analysis.spectrally_valid);

        if stale {
            debug!(
                frame_session = frame.session_id(),
                active_session = ?self.active_session_id,
                "Discarding frame from a closed session"
            );
            return None;
        }

        let last_clap_ms = detector.gate_state().last_clap_ms;
        let clap = detector.gate(&analysis, now_ms);
        pipeline_tracer::trace_gate(now_ms, last_clap_ms, clap.is_some());

        if let Some(event) = clap {
            debug!(
                timestamp_ms = event.timestamp_ms,
                loudness = event.loudness,
                band_ratio = event.band_ratio,
                "Clap detected"
            );
            for listener in self.clap_listeners.iter_mut() {
                listener(&event);
            }
            self.emit(EngineEvent::ClapDetected(event));
        }
        clap
    }

    // ========================================================================
    // RHYTHM
    // ========================================================================

    /// Start the phase cycle at the engine clock's current time.
    pub fn start_rhythm(&mut self, config: PhaseConfig) -> Result<(), RhythmError> {
        let now_ms = self.time_source.now_ms();
        self.scheduler.start(config, now_ms)?;
        self.emit(EngineEvent::RhythmStarted { config });
        Ok(())
    }

    pub fn stop_rhythm(&mut self) {
        let was_running = self.scheduler.is_running();
        self.scheduler.stop();
        if was_running {
            self.emit(EngineEvent::RhythmStopped);
        }
    }

    pub fn is_rhythm_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn current_phase(&self) -> PhaseSnapshot {
        self.scheduler.current_phase()
    }

    pub fn scheduler(&self) -> &RhythmPhaseScheduler {
        &self.scheduler
    }

    // ========================================================================
    // TICK
    // ========================================================================

    /// One animation frame of work: pull a frame, analyse, gate, then
    /// advance the rhythm scheduler.
    ///
    /// A capture failure stops detection and is reported in the returned
    /// [`TickReport`]; rhythm keeps running.
    pub fn tick(&mut self, now_ms: u64) -> TickReport {
        let mut report = TickReport::default();

        let pulled = self.session.as_mut().map(|session| session.next_frame());
        match pulled {
            Some(Ok(frame)) => report.clap = self.process_frame(&frame, now_ms),
            Some(Err(err)) => {
                self.fail_detection(&err);
                report.failure = Some(err);
            }
            None => {}
        }

        if let Some(beat) = self.scheduler.tick(now_ms) {
            pipeline_tracer::trace_beat(beat.timestamp_ms, beat.cycle);
            debug!(timestamp_ms = beat.timestamp_ms, cycle = beat.cycle, "Beat");
            for listener in self.beat_listeners.iter_mut() {
                listener(&beat);
            }
            self.emit(EngineEvent::Beat(beat));
            report.beat = Some(beat);
        }

        report
    }

    /// [`tick`](Self::tick) at the engine clock's current time.
    pub fn tick_now(&mut self) -> TickReport {
        let now_ms = self.time_source.now_ms();
        self.tick(now_ms)
    }

    fn fail_detection(&mut self, err: &AudioError) {
        warn!(code = err.code(), "Capture failed during tick, stopping detection");
        self.emit(EngineEvent::DetectionFailed {
            code: err.code(),
            message: err.message(),
        });
        self.stop_detection();
    }

    // ========================================================================
    // EVENTS
    // ========================================================================

    /// Receive every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Register a listener invoked synchronously for each accepted clap.
    pub fn on_clap_detected<F>(&mut self, listener: F)
    where
        F: FnMut(&ClapEvent) + 'static,
    {
        self.clap_listeners.push(Box::new(listener));
    }

    /// Register a listener invoked synchronously for each beat.
    pub fn on_beat<F>(&mut self, listener: F)
    where
        F: FnMut(&BeatEvent) + 'static,
    {
        self.beat_listeners.push(Box::new(listener));
    }

    pub fn now_ms(&self) -> u64 {
        self.time_source.now_ms()
    }

    fn emit(&self, event: EngineEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }
}

impl Drop for ClapRhythmEngine {
    fn drop(&mut self) {
        self.stop_detection();
    }
}
