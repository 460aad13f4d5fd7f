//! A single room: membership, publishing state and broadcast fan-out.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use pilot_protocol::{SharedSession, same_session};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{Span, debug, error, info};

use crate::push::PushInfo;
use crate::user::User;

/// Payload returned to a peer that joined a room.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResult {
    /// Always `0`.
    pub code: i32,
    /// Always `"join success"`.
    pub message: String,
    /// Room joined.
    pub room_id: String,
    /// Every other member of the room.
    pub users: Vec<MemberInfo>,
}

/// One existing member as listed in a [`JoinResult`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfo {
    /// Member's user ID.
    pub user_id: String,
    /// Member's display name.
    pub user_name: String,
    /// Streams the member publishes.
    pub pushers: Vec<PushInfo>,
}

/// A room keyed by ID.
///
/// The user map and the broadcast session map are guarded separately. The
/// session map is held for reading across a whole fan-out, so a slow peer
/// delays later recipients of the same broadcast.
pub struct Room {
    id: String,
    users: RwLock<BTreeMap<String, Arc<User>>>,
    sessions: tokio::sync::RwLock<HashMap<String, SharedSession>>,
    span: Span,
}

impl Room {
    /// Create an empty room. Events are logged under `span`.
    pub fn new(id: impl Into<String>, span: Span) -> Self {
        Self {
            id: id.into(),
            users: RwLock::new(BTreeMap::new()),
            sessions: tokio::sync::RwLock::new(HashMap::new()),
            span,
        }
    }

    /// Room ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    // ── Users ───────────────────────────────────────────────────────

    /// Insert `user`. Returns `false` if the ID is already taken.
    pub fn add_user(&self, user: Arc<User>) -> bool {
        let mut users = self.users.write();
        if users.contains_key(user.id()) {
            return false;
        }
        let _ = users.insert(user.id().to_owned(), user);
        true
    }

    /// Remove a user. Returns `false` if absent.
    pub fn remove_user(&self, user_id: &str) -> bool {
        self.users.write().remove(user_id).is_some()
    }

    /// Look up a user.
    pub fn get_user(&self, user_id: &str) -> Option<Arc<User>> {
        self.users.read().get(user_id).cloned()
    }

    /// All users, ordered by ID.
    pub fn list_users(&self) -> Vec<Arc<User>> {
        self.users.read().values().cloned().collect()
    }

    /// Number of users.
    pub fn user_count(&self) -> usize {
        self.users.read().len()
    }

    /// Fetch `user_id`, creating it with `user_name` if missing. A non-empty
    /// name replaces the stored one on an existing user.
    fn resolve_user(&self, user_id: &str, user_name: &str) -> Arc<User> {
        let mut users = self.users.write();
        if let Some(user) = users.get(user_id) {
            if !user_name.is_empty() {
                user.set_name(user_name);
            }
            return user.clone();
        }
        let user = Arc::new(User::new(user_id, user_name));
        let _ = users.insert(user_id.to_owned(), user.clone());
        user
    }

    // ── Broadcast sessions ──────────────────────────────────────────

    /// Register `session` for broadcasts, replacing any under the same peer.
    pub async fn add_session(&self, session: SharedSession) {
        let _ = self
            .sessions
            .write()
            .await
            .insert(session.peer().to_owned(), session);
    }

    /// Unregister `session` if it is the one registered under its peer.
    pub async fn remove_session(&self, session: &SharedSession) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get(session.peer()) {
            Some(current) if same_session(current, session) => {
                let _ = sessions.remove(session.peer());
                true
            }
            _ => false,
        }
    }

    /// Number of sessions receiving broadcasts.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Send a notification to every registered session.
    pub async fn broadcast(&self, method: &str, payload: &Value) {
        self.broadcast_except_session(method, payload, None).await;
    }

    /// Send a notification to every registered session except `except`.
    ///
    /// Exclusion compares session identity. A failed send is logged and the
    /// remaining recipients are still served.
    pub async fn broadcast_except_session(
        &self,
        method: &str,
        payload: &Value,
        except: Option<&SharedSession>,
    ) {
        let sessions = self.sessions.read().await;
        debug!(parent: &self.span, method, recipients = sessions.len(), "broadcast");
        for session in sessions.values() {
            if except.is_some_and(|e| same_session(e, session)) {
                continue;
            }
            if let Err(e) = session.send_notification(method, payload.clone()).await {
                error!(
                    parent: &self.span,
                    method,
                    peer = session.peer(),
                    error = %e,
                    "failed to send notification"
                );
            }
        }
    }

    /// Broadcast to everyone except `user_id`'s current session.
    async fn broadcast_except_user(&self, method: &str, payload: &Value, user_id: &str) {
        let except = self.get_user(user_id).and_then(|u| u.session());
        self.broadcast_except_session(method, payload, except.as_ref()).await;
    }

    /// Send a notification to one member's current session.
    ///
    /// Returns `false` when the user is unknown, has no session, or the send
    /// failed.
    pub async fn notify_user(&self, user_id: &str, method: &str, data: Value) -> bool {
        let Some(session) = self.get_user(user_id).and_then(|u| u.session()) else {
            debug!(parent: &self.span, user_id, method, "no session to notify");
            return false;
        };
        match session.send_notification(method, data).await {
            Ok(()) => true,
            Err(e) => {
                error!(parent: &self.span, user_id, method, error = %e, "failed to notify user");
                false
            }
        }
    }

    // ── Protocol handlers ───────────────────────────────────────────

    /// Add `user_id` to the room on `session`.
    ///
    /// Unless `audience` is set, every other session receives `newUser`. The
    /// result lists every member except the joiner.
    pub async fn handle_join(
        &self,
        user_id: &str,
        user_name: &str,
        audience: bool,
        session: &SharedSession,
    ) -> JoinResult {
        info!(parent: &self.span, user_id, user_name, audience, "user joining");

        let user = self.resolve_user(user_id, user_name);
        if let Some(previous) = user.attach_session(session.clone()) {
            if !same_session(&previous, session) {
                let _ = self.remove_session(&previous).await;
            }
        }
        self.add_session(session.clone()).await;

        if !audience {
            let payload = json!({
                "roomId": self.id,
                "userId": user_id,
                "userName": user.name(),
            });
            self.broadcast_except_session("newUser", &payload, Some(session)).await;
        }

        let users = self
            .list_users()
            .into_iter()
            .filter(|u| u.id() != user_id)
            .map(|u| MemberInfo {
                user_id: u.id().to_owned(),
                user_name: u.name(),
                pushers: u.pushers(),
            })
            .collect();

        JoinResult {
            code: 0,
            message: "join success".into(),
            room_id: self.id.clone(),
            users,
        }
    }

    /// Record streams announced by `user_id` and announce them as
    /// `newPusher` to the rest of the room.
    ///
    /// Unknown users are created. Entries with an empty pusher ID are skipped.
    pub async fn handle_push(
        &self,
        user_id: &str,
        user_name: &str,
        publishers: Vec<PushInfo>,
        _session: &SharedSession,
    ) {
        let user = self.resolve_user(user_id, user_name);

        let accepted: Vec<PushInfo> = publishers
            .into_iter()
            .filter(|p| !p.pusher_id().is_empty())
            .collect();
        for info in &accepted {
            user.set_pusher(info.clone());
        }
        info!(parent: &self.span, user_id, pushers = accepted.len(), "user published");

        let payload = json!({
            "roomId": self.id,
            "userId": user_id,
            "userName": user.name(),
            "pushers": accepted,
        });
        self.broadcast_except_user("newPusher", &payload, user_id).await;
    }

    /// Forward `data` verbatim as `pullRemoteStream` to the session of
    /// `pusher_user_id`. Missing users or sessions are logged and ignored.
    pub async fn handle_pull_remote_stream(
        &self,
        pusher_user_id: &str,
        data: Value,
        _session: &SharedSession,
    ) {
        let Some(user) = self.get_user(pusher_user_id) else {
            info!(parent: &self.span, pusher_user_id, "pull target not in room");
            return;
        };
        let Some(target) = user.session() else {
            info!(parent: &self.span, pusher_user_id, "pull target has no session");
            return;
        };
        info!(parent: &self.span, pusher_user_id, peer = target.peer(), "forwarding pull request");
        if let Err(e) = target.send_notification("pullRemoteStream", data).await {
            error!(
                parent: &self.span,
                pusher_user_id,
                error = %e,
                "failed to forward pull request"
            );
        }
    }

    /// Announce `userDisconnect` and detach `session` from the user. The user
    /// stays in the room.
    pub async fn handle_user_disconnect(&self, user_id: &str, session: &SharedSession) {
        let Some(user) = self.get_user(user_id) else {
            info!(parent: &self.span, user_id, "disconnecting user not in room");
            return;
        };
        let payload = json!({"roomId": self.id, "userId": user_id});
        self.broadcast_except_user("userDisconnect", &payload, user_id).await;

        if user.detach_session(session) {
            let _ = self.remove_session(session).await;
        }
        info!(parent: &self.span, user_id, "user disconnected");
    }

    /// Announce `userLeave` and remove the user along with the session it
    /// holds. `session` is the sender and may belong to another member, whose
    /// subscription is left alone.
    pub async fn handle_user_leave(&self, user_id: &str, _session: &SharedSession) {
        let Some(user) = self.get_user(user_id) else {
            info!(parent: &self.span, user_id, "leaving user not in room");
            return;
        };
        let payload = json!({"roomId": self.id, "userId": user_id});
        self.broadcast_except_user("userLeave", &payload, user_id).await;

        if let Some(own) = user.session() {
            let _ = user.detach_session(&own);
            let _ = self.remove_session(&own).await;
        }
        let _ = self.remove_user(user_id);
        info!(parent: &self.span, user_id, "user left");
    }

    /// Relay a chat message as `textMessage` to the rest of the room.
    pub async fn handle_text_message(
        &self,
        user_id: &str,
        user_name: &str,
        message: &str,
        _session: &SharedSession,
    ) {
        debug!(parent: &self.span, user_id, len = message.len(), "text message");
        let payload = json!({
            "roomId": self.id,
            "userId": user_id,
            "userName": user_name,
            "message": message,
        });
        self.broadcast_except_user("textMessage", &payload, user_id).await;
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("id", &self.id)
            .field("users", &self.user_count())
            .finish_non_exhaustive()
    }
}
