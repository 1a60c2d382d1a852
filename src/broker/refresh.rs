//! Refresh scheduler
//!
//! Every registration arms a one-shot keepalive timer. When it expires, a
//! synthetic `Refresh` message is delivered to the client exactly like a
//! regular send: it wakes the parked poll or lands in the backlog. This
//! bounds how long a poll stays open and forces silently dead clients to
//! show themselves by not coming back.

use std::time::Duration;

use tokio::task::JoinHandle;

/// Keepalive period used when none is configured.
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(13);

/// A scheduled, cancellable one-shot callback.
///
/// Dropping the timer cancels it, so replacing or removing the registry entry
/// that owns it is enough to stop it from firing.
#[derive(Debug)]
pub struct RefreshTimer {
    handle: JoinHandle<()>,
}

impl RefreshTimer {
    /// Runs `on_expiry` once `period` has elapsed, unless cancelled first.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<F>(period: Duration, on_expiry: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(period).await;
            on_expiry();
        });
        Self { handle }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
