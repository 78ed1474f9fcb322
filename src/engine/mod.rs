//! Engine module: the tick-driven orchestration layer.
//!
//! `core` owns the capture session, clap detector and rhythm scheduler;
//! `driver` ticks it on a fixed cadence; `clock` supplies timestamps and
//! `events` is what collaborators receive.

pub mod clock;
pub mod core;
pub mod driver;
pub mod events;

pub use clock::{ManualTimeSource, SystemTimeSource, TimeSource};
pub use self::core::{ClapRhythmEngine, TickReport};
pub use driver::{CancellationHandle, DriverSummary, FrameDriver};
pub use events::EngineEvent;
