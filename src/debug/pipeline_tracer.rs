// Pipeline Tracer - Diagnostic logging for the clap detection pipeline
//
// Each stage of per-tick processing logs its measurements when tracing is
// enabled, which makes it easy to see why a clap was (or was not) accepted.
//
// Usage:
//   - Enable with CLAPBEAT_TRACE=1 environment variable
//   - Traces appear in logs with [TRACE] prefix
//   - Each trace includes stage name, relative timestamp, and metrics

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use once_cell::sync::Lazy;

/// Environment variable that switches tracing on
pub const TRACE_ENV_VAR: &str = "CLAPBEAT_TRACE";

static TRACING_ENABLED: AtomicBool = AtomicBool::new(false);

/// Counter for trace events (helps correlate related traces)
static TRACE_COUNTER: AtomicU64 = AtomicU64::new(0);

static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

/// Initialize pipeline tracing from the environment
pub fn init() {
    let enabled = std::env::var(TRACE_ENV_VAR)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    TRACING_ENABLED.store(enabled, Ordering::SeqCst);
    if enabled {
        Lazy::force(&START_TIME);
        log::info!("[TRACE] Pipeline tracing ENABLED - set {}=0 to disable", TRACE_ENV_VAR);
    }
}

#[inline]
pub fn is_enabled() -> bool {
    TRACING_ENABLED.load(Ordering::Relaxed)
}

pub fn enable() {
    TRACING_ENABLED.store(true, Ordering::SeqCst);
    log::info!("[TRACE] Pipeline tracing enabled at runtime");
}

pub fn disable() {
    TRACING_ENABLED.store(false, Ordering::SeqCst);
    log::info!("[TRACE] Pipeline tracing disabled at runtime");
}

/// Pipeline stages for structured logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Frequency frame produced by the capture session
    Frame,
    /// Loudness computed
    Loudness,
    /// Clap band ratio computed
    Spectral,
    /// Debounce gate decision
    Gate,
    /// Rhythm beat fired
    Beat,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Frame => "FRAME",
            PipelineStage::Loudness => "LOUDNESS",
            PipelineStage::Spectral => "SPECTRAL",
            PipelineStage::Gate => "GATE",
            PipelineStage::Beat => "BEAT",
        }
    }
}

fn timestamp_us() -> u64 {
    START_TIME.elapsed().as_micros() as u64
}

/// Log a trace event at a pipeline stage. No-op unless tracing is enabled.
#[inline]
pub fn trace(stage: PipelineStage, message: &str) {
    if !is_enabled() {
        return;
    }

    let id = TRACE_COUNTER.fetch_add(1, Ordering::Relaxed);
    log::info!(
        "[TRACE] {:>8} #{:06} @{:>10}us | {}",
        stage.as_str(),
        id,
        timestamp_us(),
        message
    );
}

pub fn trace_frame(session_id: u64, bins: usize, stale: bool) {
    if !is_enabled() {
        return;
    }
    trace(
        PipelineStage::Frame,
        &format!("session={} bins={}{}", session_id, bins, if stale { " STALE" } else { "" }),
    );
}

pub fn trace_loudness(loudness: f32, threshold: f32) {
    if !is_enabled() {
        return;
    }
    trace(
        PipelineStage::Loudness,
        &format!("loudness={:.4} threshold={:.4}", loudness, threshold),
    );
}

pub fn trace_spectral(band_ratio: Option<f32>, valid: bool) {
    if !is_enabled() {
        return;
    }
    let ratio = band_ratio
        .map(|r| format!("{:.3}", r))
        .unwrap_or_else(|| "n/a".to_string());
    trace(
        PipelineStage::Spectral,
        &format!("ratio={} {}", ratio, if valid { "CLAP_LIKE" } else { "REJECTED" }),
    );
}

pub fn trace_gate(now_ms: u64, last_clap_ms: Option<u64>, fired: bool) {
    if !is_enabled() {
        return;
    }
    trace(
        PipelineStage::Gate,
        &format!(
            "now={}ms last={:?} {}",
            now_ms,
            last_clap_ms,
            if fired { "CLAP" } else { "NO_EVENT" }
        ),
    );
}

pub fn trace_beat(timestamp_ms: u64, cycle: u64) {
    if !is_enabled() {
        return;
    }
    trace(
        PipelineStage::Beat,
        &format!("cycle={} timestamp={}ms", cycle, timestamp_ms),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_disable() {
        enable();
        assert!(is_enabled());
        trace_gate(10, None, true);
        disable();
        assert!(!is_enabled());
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(PipelineStage::Frame.as_str(), "FRAME");
        assert_eq!(PipelineStage::Gate.as_str(), "GATE");
        assert_eq!(PipelineStage::Beat.as_str(), "BEAT");
    }
}
