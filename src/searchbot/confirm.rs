//! Two-step confirmation for risky configuration toggles.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default window in which the second request must arrive.
const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Outcome of a confirmation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Confirmation {
    /// First request for this key: caller must warn and ask to re-invoke.
    FirstRequest,
    /// Second request within the window: caller may proceed.
    Confirmed,
}

/// In-memory pending set keyed by (chat, user).
///
/// Entries expire after the TTL. Expiry is checked on access, so there is
/// no timer to cancel and an already-consumed key expires as a no-op.
/// The map is mutex-protected; callers run on a multi-threaded runtime.
pub struct ConfirmationGuard {
    ttl: Duration,
    pending: Mutex<HashMap<(i64, i64), Instant>>,
}

impl ConfirmationGuard {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl, pending: Mutex::new(HashMap::new()) }
    }

    /// Record a risky-action request for (chat, user).
    ///
    /// State machine: absent -> pending on first request; pending ->
    /// confirmed (and removed) on a second request within the TTL; pending
    /// -> absent once the TTL elapses.
    pub fn request(&self, chat_id: i64, user_id: i64) -> Confirmation {
        let mut pending = self.pending.lock().unwrap();
        pending.retain(|_, created| created.elapsed() < self.ttl);

        let key = (chat_id, user_id);
        if pending.remove(&key).is_some() {
            Confirmation::Confirmed
        } else {
            pending.insert(key, Instant::now());
            Confirmation::FirstRequest
        }
    }
}

impl Default for ConfirmationGuard {
    fn default() -> Self {
        Self::new()
    }
}
