//! Session management: state types and the orchestrating state machine.

pub mod orchestrator;
pub mod state;

pub use orchestrator::{Action, EngineStatus, SessionOrchestrator};
pub use state::{CaptureSession, SessionPhase, SessionState, SourceKind};
