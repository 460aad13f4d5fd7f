//! A single registered media server unit.

use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::Mutex;
use pilot_protocol::SharedSession;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A media server unit and the session it registered on.
pub struct Msu {
    id: String,
    session: Mutex<SharedSession>,
    alive_ms: AtomicI64,
}

impl Msu {
    /// Create an MSU touched now.
    pub fn new(id: impl Into<String>, session: SharedSession) -> Self {
        Self {
            id: id.into(),
            session: Mutex::new(session),
            alive_ms: AtomicI64::new(now_ms()),
        }
    }

    /// MSU ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The session this MSU last registered on.
    pub fn session(&self) -> SharedSession {
        self.session.lock().clone()
    }

    /// Replace the session reference.
    pub fn set_session(&self, session: SharedSession) {
        *self.session.lock() = session;
    }

    /// Last liveness timestamp (ms since epoch).
    pub fn alive_ms(&self) -> i64 {
        self.alive_ms.load(Ordering::Relaxed)
    }

    /// Set the liveness timestamp explicitly.
    pub fn set_alive_ms(&self, alive_ms: i64) {
        self.alive_ms.store(alive_ms, Ordering::Relaxed);
    }

    /// Refresh the liveness timestamp to now.
    pub fn touch(&self) {
        self.set_alive_ms(now_ms());
    }

    /// Whether the MSU was touched less than `ttl_ms` before `now_ms`.
    pub fn is_alive(&self, ttl_ms: i64, now_ms: i64) -> bool {
        now_ms - self.alive_ms() < ttl_ms
    }
}

impl std::fmt::Debug for Msu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Msu")
            .field("id", &self.id)
            .field("peer", &self.session.lock().peer())
            .field("alive_ms", &self.alive_ms())
            .finish()
    }
}
