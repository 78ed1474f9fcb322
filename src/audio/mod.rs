// Audio module - microphone capture and frequency-domain frame production

pub mod analyser;
pub mod backend;
pub mod frame;
pub mod ring;
pub mod scripted;
pub mod session;
pub mod synth;

// Re-export commonly used types for convenience
pub use analyser::FrequencyAnalyser;
pub use backend::{CaptureConstraints, CpalMicrophone, InputSource, MicrophoneProvider};
pub use frame::AudioFrame;
pub use ring::{SampleRing, SampleWindow};
pub use scripted::{ScriptStep, ScriptedMicrophone};
pub use session::AudioCaptureSession;
