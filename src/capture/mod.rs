mod controller;
mod state;

pub use controller::{CaptureController, CaptureReport};
pub use state::{CapturePhase, CaptureState, CaptureStatus, CaptureTimings};
