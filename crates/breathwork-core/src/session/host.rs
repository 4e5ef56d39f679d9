//! Platform services consumed by the session engine.
//!
//! [`SessionHost`] is the seam a phone, watch or terminal host implements.
//! [`StopHandle`] lets a collaborator force teardown, and [`WakeLease`] is the
//! bounded keep-awake hold most hosts wrap their platform wake lock with.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::HostError;

/// Platform services the session engine leans on.
///
/// Every method defaults to a no-op so a host only implements what it has.
/// The engine treats all of these as best-effort: failures are logged and
/// never end a session.
pub trait SessionHost: Send + Sync {
    /// Show or update the persistent status indicator.
    fn show_status(&self, _text: &str) {}

    /// Remove the status indicator.
    fn dismiss_status(&self) {}

    /// Keep the device awake for at most `max_hold`.
    ///
    /// A host whose hold expires (or is revoked) must call
    /// [`StopHandle::stop`]; the engine treats that exactly like `stop()`.
    fn acquire_keep_awake(&self, _max_hold: Duration, _expiry: StopHandle) {}

    fn release_keep_awake(&self) {}

    /// Lock the screen once the exercise completes.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::NotAuthorized`] when the user never granted the
    /// capability, [`HostError::Unavailable`] when the mechanism is missing.
    fn lock_screen(&self) -> Result<(), HostError> {
        Err(HostError::NotAuthorized("screen lock"))
    }
}

/// Host with no platform services.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl SessionHost for NullHost {}

/// Cancels the session it was issued for.
///
/// Handed to collaborators that may need to force teardown.
#[derive(Debug, Clone)]
pub struct StopHandle {
    token: CancellationToken,
}

impl StopHandle {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// A keep-awake hold with a hard upper bound.
///
/// Hosts wrap their platform wake lock with this: `hold` arms a timer that
/// fires the session's [`StopHandle`] if `release` has not been called
/// before `max_hold` elapses. Must be used from within a Tokio runtime.
#[derive(Debug, Default)]
pub struct WakeLease {
    active: Arc<Mutex<Option<Hold>>>,
    generation: AtomicU64,
}

#[derive(Debug)]
struct Hold {
    generation: u64,
    released: CancellationToken,
}

impl WakeLease {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(active: &Mutex<Option<Hold>>) -> MutexGuard<'_, Option<Hold>> {
        active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn hold(&self, max_hold: Duration, expiry: StopHandle) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let released = CancellationToken::new();
        let previous = Self::lock(&self.active).replace(Hold {
            generation,
            released: released.clone(),
        });
        if let Some(previous) = previous {
            previous.released.cancel();
        }

        let active = Arc::clone(&self.active);
        tokio::spawn(async move {
            tokio::select! {
                _ = released.cancelled() => {
                    debug!("keep-awake released");
                }
                _ = tokio::time::sleep(max_hold) => {
                    {
                        let mut current = Self::lock(&active);
                        if current.as_ref().is_some_and(|h| h.generation == generation) {
                            *current = None;
                        }
                    }
                    warn!(max_hold_secs = max_hold.as_secs(), "keep-awake expired, stopping session");
                    expiry.stop();
                }
            }
        });
    }

    pub fn release(&self) {
        if let Some(hold) = Self::lock(&self.active).take() {
            hold.released.cancel();
        }
    }

    pub fn is_held(&self) -> bool {
        Self::lock(&self.active).is_some()
    }
}
