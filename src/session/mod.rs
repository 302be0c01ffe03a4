mod arbiter;
mod orchestrator;
pub mod protocol;

pub use arbiter::SourceArbiter;
pub use orchestrator::SessionOrchestrator;
pub use protocol::{ClientMessage, ClientSettings, ControlMessage, PayloadSource, ServerMessage, StatusPayload};
