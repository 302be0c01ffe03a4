use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Per-connection "upload in progress" flag. While set, camera frames are
/// turned away before they reach the detector.
#[derive(Debug, Clone, Default)]
pub struct SourceArbiter {
    upload_active: Arc<AtomicBool>,
}

impl SourceArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag. Returns `true` if this call started a new upload session.
    pub fn try_begin_upload(&self) -> bool {
        self.upload_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Sets the flag unconditionally. Returns whether it was already set.
    pub fn force_upload(&self) -> bool {
        self.upload_active.swap(true, Ordering::AcqRel)
    }

    /// Clears the flag. Returns `true` if it was set.
    pub fn release(&self) -> bool {
        self.upload_active.swap(false, Ordering::AcqRel)
    }

    pub fn is_upload_active(&self) -> bool {
        self.upload_active.load(Ordering::Acquire)
    }
}
