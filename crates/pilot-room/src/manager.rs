//! Room registry with create-on-demand lookup.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use pilot_protocol::SharedSession;
use serde_json::Value;
use tracing::{Span, debug, info, info_span};

use crate::push::PushInfo;
use crate::room::{JoinResult, Room};
use crate::user::User;

/// Owns every room and routes coordination calls to the right one.
///
/// Rooms are created the first time any handler names them and are only
/// removed by [`delete`](RoomManager::delete).
pub struct RoomManager {
    rooms: RwLock<HashMap<String, Arc<Room>>>,
    span: Span,
}

impl RoomManager {
    /// Create an empty registry. Rooms log under child spans of `span`.
    pub fn new(span: Span) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            span,
        }
    }

    /// Return the room, creating it if missing.
    pub fn get_or_create(&self, room_id: &str) -> Arc<Room> {
        let mut rooms = self.rooms.write();
        if let Some(room) = rooms.get(room_id) {
            return room.clone();
        }
        let span = info_span!(parent: &self.span, "room", room_id);
        let room = Arc::new(Room::new(room_id, span));
        let _ = rooms.insert(room_id.to_owned(), room.clone());
        info!(parent: &self.span, room_id, "room created");
        room
    }

    /// Return the room without creating it.
    pub fn get(&self, room_id: &str) -> Option<Arc<Room>> {
        self.rooms.read().get(room_id).cloned()
    }

    /// Drop a room. Returns `false` if it did not exist.
    pub fn delete(&self, room_id: &str) -> bool {
        let removed = self.rooms.write().remove(room_id).is_some();
        if removed {
            info!(parent: &self.span, room_id, "room deleted");
        }
        removed
    }

    /// Snapshot of all rooms.
    pub fn list(&self) -> Vec<Arc<Room>> {
        self.rooms.read().values().cloned().collect()
    }

    /// Number of rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.read().len()
    }

    /// Look up a user without creating the room.
    pub fn get_user(&self, room_id: &str, user_id: &str) -> Option<Arc<User>> {
        self.get(room_id)?.get_user(user_id)
    }

    /// Users of a room, empty if the room does not exist.
    pub fn list_users(&self, room_id: &str) -> Vec<Arc<User>> {
        self.get(room_id).map(|r| r.list_users()).unwrap_or_default()
    }

    /// User count of a room, `0` if the room does not exist.
    pub fn room_user_count(&self, room_id: &str) -> usize {
        self.get(room_id).map_or(0, |r| r.user_count())
    }

    /// Notify one member directly. `false` if the room, user or session is
    /// missing.
    pub async fn notify_user(
        &self,
        room_id: &str,
        user_id: &str,
        method: &str,
        data: Value,
    ) -> bool {
        match self.get(room_id) {
            Some(room) => room.notify_user(user_id, method, data).await,
            None => false,
        }
    }

    /// Resolve a room for a routed handler. Empty IDs are refused.
    fn route(&self, room_id: &str, method: &str) -> Option<Arc<Room>> {
        if room_id.is_empty() {
            debug!(parent: &self.span, method, "ignoring call without room id");
            return None;
        }
        Some(self.get_or_create(room_id))
    }

    // ── Routed handlers ─────────────────────────────────────────────

    /// See [`Room::handle_join`].
    pub async fn handle_join(
        &self,
        room_id: &str,
        user_id: &str,
        user_name: &str,
        audience: bool,
        session: &SharedSession,
    ) -> JoinResult {
        self.get_or_create(room_id).handle_join(user_id, user_name, audience, session).await
    }

    /// See [`Room::handle_push`].
    pub async fn handle_push(
        &self,
        room_id: &str,
        user_id: &str,
        user_name: &str,
        publishers: Vec<PushInfo>,
        session: &SharedSession,
    ) {
        if let Some(room) = self.route(room_id, "push") {
            room.handle_push(user_id, user_name, publishers, session).await;
        }
    }

    /// See [`Room::handle_pull_remote_stream`].
    pub async fn handle_pull_remote_stream(
        &self,
        room_id: &str,
        pusher_user_id: &str,
        data: Value,
        session: &SharedSession,
    ) {
        if let Some(room) = self.route(room_id, "pullRemoteStream") {
            room.handle_pull_remote_stream(pusher_user_id, data, session).await;
        }
    }

    /// See [`Room::handle_user_disconnect`].
    pub async fn handle_user_disconnect(
        &self,
        room_id: &str,
        user_id: &str,
        session: &SharedSession,
    ) {
        if let Some(room) = self.route(room_id, "userDisconnect") {
            room.handle_user_disconnect(user_id, session).await;
        }
    }

    /// See [`Room::handle_user_leave`].
    pub async fn handle_user_leave(&self, room_id: &str, user_id: &str, session: &SharedSession) {
        if let Some(room) = self.route(room_id, "userLeave") {
            room.handle_user_leave(user_id, session).await;
        }
    }

    /// See [`Room::handle_text_message`].
    pub async fn handle_text_message(
        &self,
        room_id: &str,
        user_id: &str,
        user_name: &str,
        message: &str,
        session: &SharedSession,
    ) {
        if let Some(room) = self.route(room_id, "textMessage") {
            room.handle_text_message(user_id, user_name, message, session).await;
        }
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new(Span::none())
    }
}
