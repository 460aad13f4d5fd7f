//! In-memory [`Session`] double that records every frame it is asked to send.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::errors::SessionError;
use crate::session::Session;

/// A frame captured by [`RecordingSession`].
#[derive(Clone, Debug, PartialEq)]
pub enum Sent {
    /// `send_response_ok`.
    Ok {
        /// Correlation ID.
        id: Value,
        /// Payload.
        data: Value,
    },
    /// `send_response_error`.
    Error {
        /// Correlation ID.
        id: Value,
        /// Error code.
        code: i32,
        /// Error reason.
        reason: String,
    },
    /// `send_notification`.
    Notification {
        /// Method name.
        method: String,
        /// Payload.
        data: Value,
    },
}

/// Session that stores frames instead of writing them to a socket.
pub struct RecordingSession {
    peer: String,
    sent: Mutex<Vec<Sent>>,
    closed: AtomicBool,
    failing: AtomicBool,
}

impl RecordingSession {
    /// New open session for `peer`.
    pub fn new(peer: &str) -> Arc<Self> {
        Arc::new(Self {
            peer: peer.to_owned(),
            sent: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            failing: AtomicBool::new(false),
        })
    }

    /// New session whose sends all fail with [`SessionError::ConnectionLost`].
    pub fn failing(peer: &str) -> Arc<Self> {
        let session = Self::new(peer);
        session.set_failing(true);
        session
    }

    /// Toggle send failures.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every frame recorded so far, in send order.
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    /// Recorded notifications as `(method, data)` pairs.
    pub fn notifications(&self) -> Vec<(String, Value)> {
        self.sent
            .lock()
            .iter()
            .filter_map(|s| match s {
                Sent::Notification { method, data } => Some((method.clone(), data.clone())),
                _ => None,
            })
            .collect()
    }

    /// Payloads of recorded notifications named `method`.
    pub fn notifications_named(&self, method: &str) -> Vec<Value> {
        self.notifications()
            .into_iter()
            .filter(|(m, _)| m == method)
            .map(|(_, data)| data)
            .collect()
    }

    /// The most recent response, if any.
    pub fn last_response(&self) -> Option<Sent> {
        self.sent
            .lock()
            .iter()
            .rev()
            .find(|s| !matches!(s, Sent::Notification { .. }))
            .cloned()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.sent.lock().clear();
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn record(&self, frame: Sent) -> Result<(), SessionError> {
        if self.is_closed() {
            return Ok(());
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(SessionError::ConnectionLost(self.peer.clone()));
        }
        self.sent.lock().push(frame);
        Ok(())
    }
}

#[async_trait]
impl Session for RecordingSession {
    fn peer(&self) -> &str {
        &self.peer
    }

    async fn send_response_ok(&self, id: &Value, data: Value) -> Result<(), SessionError> {
        self.record(Sent::Ok {
            id: id.clone(),
            data,
        })
    }

    async fn send_response_error(
        &self,
        id: &Value,
        code: i32,
        reason: &str,
    ) -> Result<(), SessionError> {
        self.record(Sent::Error {
            id: id.clone(),
            code,
            reason: reason.to_owned(),
        })
    }

    async fn send_notification(&self, method: &str, data: Value) -> Result<(), SessionError> {
        self.record(Sent::Notification {
            method: method.to_owned(),
            data,
        })
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
