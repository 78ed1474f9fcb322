// clapbeat - Hand clap detection and rhythm phase scheduling
// Microphone frames are analysed once per display tick; a free-running
// Red/Yellow/Green cycle fires a beat on every entry into Green.

// Module declarations
pub mod analysis;
pub mod audio;
pub mod config;
pub mod debug;
pub mod engine;
pub mod error;
pub mod rhythm;

// Re-exports for convenience
pub use analysis::{ClapDetector, ClapEvent};
pub use audio::{AudioCaptureSession, AudioFrame};
pub use config::{AppConfig, DetectionConfig, DriverConfig, PhaseConfig};
pub use engine::{ClapRhythmEngine, EngineEvent, FrameDriver, TickReport};
pub use error::{AudioError, ConfigError, ErrorCode, RhythmError};
pub use rhythm::{BeatEvent, Phase, PhaseSnapshot, RhythmPhaseScheduler};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static LOGGING: OnceCell<()> = OnceCell::new();

/// Install the global `tracing` subscriber (filter from `RUST_LOG`, default
/// `info`) and read the pipeline trace switch. Safe to call repeatedly.
pub fn init_logging() {
    LOGGING.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        // Another subscriber may already be installed (tests, host app)
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
        debug::pipeline_tracer::init();
    });
}
