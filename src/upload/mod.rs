mod accumulator;
mod timeout;

pub use accumulator::{
    FinalizeDecision, UploadAccumulator, UploadLimits, UploadPhase, UploadProgress, UploadStep,
};
pub use timeout::SafetyTimer;
