//! [`Session`] backed by a WebSocket connection's writer task.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use pilot_protocol::{Notification, Response, Session, SessionError};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One peer connection as seen by rooms, users and MSUs.
///
/// Frames are serialized here and queued to the connection's single writer
/// task, which writes them to the socket in order.
pub struct WsSession {
    peer: String,
    tx: mpsc::Sender<String>,
    cancel: CancellationToken,
    last_seen: Mutex<Instant>,
    connected_at: Instant,
}

impl WsSession {
    /// Create a session whose frames go to `tx`.
    pub fn new(peer: impl Into<String>, tx: mpsc::Sender<String>) -> Self {
        let now = Instant::now();
        Self {
            peer: peer.into(),
            tx,
            cancel: CancellationToken::new(),
            last_seen: Mutex::new(now),
            connected_at: now,
        }
    }

    /// Token cancelled by [`close`](Session::close).
    pub fn closed(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether the session has been closed.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Record inbound activity from the peer.
    pub fn mark_alive(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    /// Time since the peer last sent anything.
    pub fn idle_for(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }

    async fn enqueue<T: Serialize>(&self, frame: &T) -> Result<(), SessionError> {
        if self.is_closed() {
            return Ok(());
        }
        let text = serde_json::to_string(frame)?;
        match self.tx.send(text).await {
            Ok(()) => Ok(()),
            Err(_) if self.is_closed() => Ok(()),
            Err(_) => Err(SessionError::ConnectionLost(self.peer.clone())),
        }
    }
}

#[async_trait]
impl Session for WsSession {
    fn peer(&self) -> &str {
        &self.peer
    }

    async fn send_response_ok(&self, id: &Value, data: Value) -> Result<(), SessionError> {
        self.enqueue(&Response::ok(id.clone(), data)).await
    }

    async fn send_response_error(
        &self,
        id: &Value,
        code: i32,
        reason: &str,
    ) -> Result<(), SessionError> {
        self.enqueue(&Response::error(id.clone(), code, reason)).await
    }

    async fn send_notification(&self, method: &str, data: Value) -> Result<(), SessionError> {
        self.enqueue(&Notification::new(method, data)).await
    }

    async fn close(&self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for WsSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsSession")
            .field("peer", &self.peer)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
