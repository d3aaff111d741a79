//! [`Session`] – the single operator session's liveness state (spec §4.4
//! "session touch").
//!
//! Generalizes the watchdog's heartbeat/deadline pattern
//! ([`robocore_safety::Watchdog`]) to exactly one session instead of N
//! components.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// `active` plus the instant of the last successful `/intent` or `/status`.
pub struct Session {
    inner: Mutex<SessionState>,
}

struct SessionState {
    active: bool,
    last_touch: Instant,
}

impl Session {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SessionState {
                active: false,
                last_touch: Instant::now(),
            }),
        }
    }

    /// Marks the session active and resets its deadline. Called on every
    /// successful `/intent` or `/status` request.
    pub async fn touch(&self) {
        let mut state = self.inner.lock().await;
        state.active = true;
        state.last_touch = Instant::now();
    }

    /// `true` if `timeout` has elapsed since the last touch and the
    /// session is still marked active (so the caller publishes
    /// `remote.session{active:false}` exactly once on expiry).
    pub async fn expire_if_idle(&self, timeout: Duration) -> bool {
        let mut state = self.inner.lock().await;
        if state.active && state.last_touch.elapsed() > timeout {
            state.active = false;
            true
        } else {
            false
        }
    }

    pub async fn is_active(&self) -> bool {
        self.inner.lock().await.active
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
