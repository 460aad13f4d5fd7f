//! The session capability shared by every peer connection.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::SessionError;

/// One persistent connection to a peer.
///
/// Rooms, users and MSUs hold sessions only through this trait, so any
/// transport (or a recording test double) can stand behind them.
///
/// Implementations serialize their own writes: two callers sending on the
/// same session never interleave frames. Once [`close`](Session::close) has
/// been called every send returns `Ok(())` without delivering anything, and
/// `close` itself may be called repeatedly.
#[async_trait]
pub trait Session: Send + Sync {
    /// Remote peer address. Unique per live connection.
    fn peer(&self) -> &str;

    /// Send a successful response to request `id`.
    async fn send_response_ok(&self, id: &Value, data: Value) -> Result<(), SessionError>;

    /// Send a failed response to request `id`.
    async fn send_response_error(
        &self,
        id: &Value,
        code: i32,
        reason: &str,
    ) -> Result<(), SessionError>;

    /// Send a notification.
    async fn send_notification(&self, method: &str, data: Value) -> Result<(), SessionError>;

    /// Close the session. Idempotent.
    async fn close(&self);
}

/// Reference-counted handle to a session.
pub type SharedSession = Arc<dyn Session>;

/// Whether two handles point at the same session object.
///
/// Identity, not peer address, decides broadcast exclusion and detach.
pub fn same_session(a: &SharedSession, b: &SharedSession) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
