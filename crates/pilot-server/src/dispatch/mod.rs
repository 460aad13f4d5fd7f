//! Protocol dispatcher: the session table plus inbound frame routing.
//!
//! Requests go through the [`RequestRegistry`] and always get exactly one
//! response. Notifications are routed by method and never answered.
//! Responses from peers are dropped, as are frames that classify as none of
//! the three shapes.

pub mod context;
pub mod notifications;
pub mod payload;
pub mod registry;
pub mod requests;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use pilot_msu::MsuManager;
use pilot_protocol::{Inbound, Request, SharedSession, classify, same_session};
use pilot_room::RoomManager;
use tracing::{Span, debug, error, info, warn};

pub use context::DispatchContext;
pub use registry::{RequestHandler, RequestRegistry};

use crate::metrics;

/// Owns every live session and routes their frames.
pub struct Dispatcher {
    registry: RequestRegistry,
    ctx: DispatchContext,
    sessions: Mutex<HashMap<String, SharedSession>>,
}

impl Dispatcher {
    /// Dispatcher serving the standard request methods.
    pub fn new(rooms: Arc<RoomManager>, msus: Arc<MsuManager>, span: Span) -> Self {
        Self::with_registry(
            requests::default_registry(),
            DispatchContext::new(rooms, msus, span),
        )
    }

    /// Dispatcher with a custom request registry.
    pub fn with_registry(registry: RequestRegistry, ctx: DispatchContext) -> Self {
        Self {
            registry,
            ctx,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Handler context.
    pub fn context(&self) -> &DispatchContext {
        &self.ctx
    }

    /// Request registry.
    pub fn registry(&self) -> &RequestRegistry {
        &self.registry
    }

    // ── Session table ───────────────────────────────────────────────

    /// Track `session` under its peer address, replacing any previous entry.
    pub fn register_session(&self, session: SharedSession) {
        let peer = session.peer().to_owned();
        let replaced = self.sessions.lock().insert(peer.clone(), session);
        if replaced.is_some() {
            warn!(parent: &self.ctx.span, peer = %peer, "replaced session with same peer address");
        }
        info!(parent: &self.ctx.span, peer = %peer, "session registered");
    }

    /// Stop tracking `session`. An entry under the same peer that belongs to
    /// a different session is left alone.
    pub fn remove_session(&self, session: &SharedSession) -> bool {
        let mut sessions = self.sessions.lock();
        match sessions.get(session.peer()) {
            Some(current) if same_session(current, session) => {
                let _ = sessions.remove(session.peer());
                drop(sessions);
                info!(parent: &self.ctx.span, peer = session.peer(), "session removed");
                true
            }
            _ => false,
        }
    }

    /// Look up a session by peer address.
    pub fn session(&self, peer: &str) -> Option<SharedSession> {
        self.sessions.lock().get(peer).cloned()
    }

    /// Number of tracked sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Close every tracked session.
    pub async fn close_all(&self) {
        let sessions: Vec<SharedSession> = self.sessions.lock().values().cloned().collect();
        info!(parent: &self.ctx.span, count = sessions.len(), "closing all sessions");
        for session in sessions {
            session.close().await;
        }
    }

    // ── Frame routing ───────────────────────────────────────────────

    /// Classify and route one inbound text frame from `session`.
    pub async fn handle_frame(&self, session: &SharedSession, frame: &str) {
        let inbound = match classify(frame) {
            Ok(inbound) => inbound,
            Err(e) => {
                warn!(parent: &self.ctx.span, peer = session.peer(), error = %e, "dropping frame");
                return;
            }
        };
        debug!(
            parent: &self.ctx.span,
            peer = session.peer(),
            kind = inbound.kind(),
            "frame received"
        );

        match inbound {
            Inbound::Request(request) => self.handle_request(session, request).await,
            Inbound::Response(response) => {
                debug!(
                    parent: &self.ctx.span,
                    peer = session.peer(),
                    id = %response.id,
                    "ignoring response"
                );
            }
            Inbound::Notification(notification) => {
                notifications::handle_notification(
                    &self.ctx,
                    session,
                    &notification.method,
                    notification.data,
                )
                .await;
            }
        }
    }

    async fn handle_request(&self, session: &SharedSession, request: Request) {
        let Request { id, method, data, .. } = request;
        let sent = match self.registry.dispatch(&method, data, session, &self.ctx).await {
            Ok(payload) => session.send_response_ok(&id, payload).await,
            Err(e) => {
                let code = e.code();
                metrics::record_error(code);
                debug!(
                    parent: &self.ctx.span,
                    method = %method,
                    code,
                    reason = %e,
                    "request refused"
                );
                session.send_response_error(&id, code, &e.to_string()).await
            }
        };
        if let Err(e) = sent {
            error!(
                parent: &self.ctx.span,
                peer = session.peer(),
                method = %method,
                error = %e,
                "failed to send response"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pilot_protocol::testing::{RecordingSession, Sent};
    use serde_json::json;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(
            Arc::new(RoomManager::default()),
            Arc::new(MsuManager::default()),
            Span::none(),
        )
    }

    fn shared(session: &Arc<RecordingSession>) -> SharedSession {
        session.clone()
    }

    // ── Session table ───────────────────────────────────────────────

    #[test]
    fn register_and_remove_session() {
        let d = dispatcher();
        let s = shared(&RecordingSession::new("p1"));
        d.register_session(s.clone());
        assert_eq!(d.session_count(), 1);
        assert!(d.session("p1").is_some());
        assert!(d.remove_session(&s));
        assert!(!d.remove_session(&s));
        assert_eq!(d.session_count(), 0);
    }

    #[test]
    fn remove_ignores_replaced_session() {
        let d = dispatcher();
        let old = shared(&RecordingSession::new("p1"));
        let new = shared(&RecordingSession::new("p1"));
        d.register_session(old.clone());
        d.register_session(new.clone());
        assert!(!d.remove_session(&old));
        assert!(same_session(&d.session("p1").unwrap(), &new));
    }

    #[tokio::test]
    async fn close_all_closes_sessions() {
        let d = dispatcher();
        let a = RecordingSession::new("a");
        let b = RecordingSession::new("b");
        d.register_session(shared(&a));
        d.register_session(shared(&b));
        d.close_all().await;
        assert!(a.is_closed());
        assert!(b.is_closed());
    }

    // ── Frame routing ───────────────────────────────────────────────

    #[tokio::test]
    async fn request_gets_response_with_same_id() {
        let d = dispatcher();
        let s = RecordingSession::new("p1");
        d.handle_frame(&shared(&s), r#"{"request":true,"id":42,"method":"echo","data":{"a":1}}"#)
            .await;
        assert_eq!(
            s.last_response(),
            Some(Sent::Ok {
                id: json!(42),
                data: json!({"echo": {"a": 1}})
            })
        );
    }

    #[tokio::test]
    async fn string_ids_are_echoed() {
        let d = dispatcher();
        let s = RecordingSession::new("p1");
        d.handle_frame(&shared(&s), r#"{"request":true,"id":"abc","method":"echo","data":{}}"#)
            .await;
        assert!(matches!(s.last_response(), Some(Sent::Ok { id, .. }) if id == json!("abc")));
    }

    #[tokio::test]
    async fn unknown_method_is_404() {
        let d = dispatcher();
        let s = RecordingSession::new("p1");
        d.handle_frame(&shared(&s), r#"{"request":true,"id":7,"method":"foo","data":{}}"#).await;
        assert_eq!(
            s.last_response(),
            Some(Sent::Error {
                id: json!(7),
                code: 404,
                reason: "unknown method: foo".into()
            })
        );
    }

    #[tokio::test]
    async fn empty_join_is_400() {
        let d = dispatcher();
        let s = RecordingSession::new("p1");
        d.handle_frame(&shared(&s), r#"{"request":true,"id":1,"method":"join","data":{}}"#).await;
        assert!(matches!(s.last_response(), Some(Sent::Error { code: 400, .. })));
    }

    #[tokio::test]
    async fn notification_is_not_answered() {
        let d = dispatcher();
        let s = RecordingSession::new("p1");
        let _ = d.context().rooms.handle_join("r1", "u1", "A", false, &shared(&s)).await;
        d.handle_frame(
            &shared(&s),
            r#"{"notification":true,"method":"userLeave","data":{"roomId":"r1","userId":"u1"}}"#,
        )
        .await;
        assert!(s.last_response().is_none());
        assert!(d.context().rooms.get_user("r1", "u1").is_none());
    }

    #[tokio::test]
    async fn responses_and_garbage_are_dropped() {
        let d = dispatcher();
        let s = RecordingSession::new("p1");
        d.handle_frame(&shared(&s), r#"{"response":true,"id":1,"ok":true,"data":{}}"#).await;
        d.handle_frame(&shared(&s), "not json").await;
        d.handle_frame(&shared(&s), r#"{"hello":"world"}"#).await;
        d.handle_frame(&shared(&s), r#"{"request":false,"method":"echo"}"#).await;
        assert!(s.sent().is_empty());
    }

    #[tokio::test]
    async fn send_failure_does_not_panic() {
        let d = dispatcher();
        let s = RecordingSession::failing("p1");
        d.handle_frame(&shared(&s), r#"{"request":true,"id":1,"method":"echo","data":{}}"#).await;
        assert!(s.sent().is_empty());
    }
}
