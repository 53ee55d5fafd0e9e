//! One-shot timeout scheduling.
//!
//! A scheduled callback races a `CancellationToken` against a tokio sleep.
//! Cancellation is best-effort: a callback that has already started cannot
//! be recalled, so callers re-validate their own state when fired.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Handle to a scheduled one-shot callback.
#[derive(Debug)]
pub struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    /// Cancel the pending callback.
    ///
    /// Idempotent, and safe to call after the callback has fired.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether `cancel` has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Run `callback` after `delay` unless the returned handle is cancelled first.
///
/// Must be called from within a tokio runtime.
pub fn schedule_once<F>(delay: Duration, callback: F) -> TimerHandle
where
    F: FnOnce() + Send + 'static,
{
    let token = CancellationToken::new();
    let guard = token.clone();

    tokio::spawn(async move {
        tokio::select! {
            () = guard.cancelled() => {}
            () = tokio::time::sleep(delay) => callback(),
        }
    });

    TimerHandle { token }
}
