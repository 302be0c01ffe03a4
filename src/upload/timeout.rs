use std::{future::Future, sync::Mutex};

use tokio::time::{self, Duration};
use tokio_util::sync::CancellationToken;

/// A single pending deadline per upload session. Arming it again cancels the
/// previous one.
pub struct SafetyTimer {
    timeout: Duration,
    pending: Mutex<Option<CancellationToken>>,
}

impl SafetyTimer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            pending: Mutex::new(None),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `on_expire` once the timeout elapses unless cancelled or re-armed first.
    pub fn arm<F>(&self, on_expire: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        if let Some(previous) = self.swap(Some(token.clone())) {
            previous.cancel();
        }

        let timeout = self.timeout;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = time::sleep(timeout) => on_expire.await,
            }
        });
    }

    pub fn cancel(&self) {
        if let Some(token) = self.swap(None) {
            token.cancel();
        }
    }

    pub fn is_armed(&self) -> bool {
        let guard = match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.as_ref().is_some_and(|token| !token.is_cancelled())
    }

    fn swap(&self, next: Option<CancellationToken>) -> Option<CancellationToken> {
        let mut guard = match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, next)
    }
}

impl Drop for SafetyTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
