// FrameDriver - periodic tick source for ClapRhythmEngine
//
// Replaces a self-rescheduling animation-frame loop with an explicit
// start/stop pair: `run` ticks the engine on a tokio interval until the
// CancellationHandle fires, the tick budget is spent, or the future is
// dropped. Runs on the caller's task; no worker threads.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::DriverConfig;
use crate::engine::core::{ClapRhythmEngine, TickReport};
use crate::error::AudioError;

/// Stops a running [`FrameDriver`]. Cheap to clone and `Send`.
///
/// A cancel ends the current `run`, or the next one if none is active. The
/// flag clears when that run returns, so the driver can be run again.
#[derive(Clone)]
pub struct CancellationHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancellationHandle {
    fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx: Arc::new(tx) }, rx)
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Totals for one `run`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriverSummary {
    pub ticks: u64,
    pub claps: u64,
    pub beats: u64,
    pub last_failure: Option<AudioError>,
}

impl DriverSummary {
    fn record(&mut self, report: &TickReport) {
        self.ticks += 1;
        if report.clap.is_some() {
            self.claps += 1;
        }
        if report.beat.is_some() {
            self.beats += 1;
        }
        if let Some(err) = &report.failure {
            self.last_failure = Some(err.clone());
        }
    }
}

pub struct FrameDriver {
    period: Duration,
    handle: CancellationHandle,
    cancelled: watch::Receiver<bool>,
}

impl FrameDriver {
    pub fn new(config: &DriverConfig) -> Self {
        let (handle, cancelled) = CancellationHandle::new();
        Self {
            period: config.tick_interval(),
            handle,
            cancelled,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn cancellation_handle(&self) -> CancellationHandle {
        self.handle.clone()
    }

    /// Tick `engine` until cancelled.
    pub async fn run(&mut self, engine: &mut ClapRhythmEngine) -> DriverSummary {
        self.drive(engine, None).await
    }

    /// Tick `engine` at most `max_ticks` times, stopping early if cancelled.
    pub async fn run_for(&mut self, engine: &mut ClapRhythmEngine, max_ticks: u64) -> DriverSummary {
        self.drive(engine, Some(max_ticks)).await
    }

    async fn drive(&mut self, engine: &mut ClapRhythmEngine, max_ticks: Option<u64>) -> DriverSummary {
        let mut interval = time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut summary = DriverSummary::default();

        info!(period_us = self.period.as_micros() as u64, ?max_ticks, "Frame driver started");

        loop {
            if *self.cancelled.borrow() {
                break;
            }
            if max_ticks.is_some_and(|max| summary.ticks >= max) {
                break;
            }

            tokio::select! {
                biased;
                changed = self.cancelled.changed() => {
                    // The driver holds a sender clone, so the channel never closes
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                _ = interval.tick() => {}
            }

            let report = engine.tick_now();
            summary.record(&report);
        }

        // Re-arm for the next run
        self.handle.tx.send_replace(false);
        self.cancelled.borrow_and_update();

        debug!(
            ticks = summary.ticks,
            claps = summary.claps,
            beats = summary.beats,
            "Frame driver stopped"
        );
        summary
    }
}
