//! MSU registry and room-to-MSU assignment.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use pilot_protocol::SharedSession;
use serde_json::json;
use tracing::{Span, info, warn};

use crate::errors::MsuError;
use crate::msu::{Msu, now_ms};

#[derive(Default)]
struct Registry {
    items: BTreeMap<String, Arc<Msu>>,
    rooms: HashMap<String, Arc<Msu>>,
}

/// Tracks registered MSUs and which MSU backs each room.
///
/// A room's MSU is chosen once and never re-evaluated. The binding survives
/// removal or pruning of the MSU it points at.
pub struct MsuManager {
    registry: Mutex<Registry>,
    span: Span,
}

impl MsuManager {
    /// Create an empty registry. Events are logged under `span`.
    pub fn new(span: Span) -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            span,
        }
    }

    /// Register or refresh `msu_id` on `session`.
    ///
    /// An empty ID is ignored and yields `None`. The liveness timestamp is
    /// set to `alive_ms` when it is positive, otherwise to now.
    pub fn add_or_update(
        &self,
        session: SharedSession,
        msu_id: &str,
        alive_ms: Option<i64>,
    ) -> Option<Arc<Msu>> {
        if msu_id.is_empty() {
            return None;
        }
        let mut registry = self.registry.lock();
        let msu = if let Some(existing) = registry.items.get(msu_id) {
            existing.set_session(session);
            existing.clone()
        } else {
            let msu = Arc::new(Msu::new(msu_id, session));
            let _ = registry.items.insert(msu_id.to_owned(), msu.clone());
            info!(parent: &self.span, msu_id, peer = msu.session().peer(), "msu registered");
            msu
        };
        match alive_ms {
            Some(ts) if ts > 0 => msu.set_alive_ms(ts),
            _ => msu.touch(),
        }
        Some(msu)
    }

    /// Look up an MSU.
    pub fn get(&self, msu_id: &str) -> Option<Arc<Msu>> {
        self.registry.lock().items.get(msu_id).cloned()
    }

    /// Remove an MSU. Room bindings pointing at it are left in place.
    pub fn remove(&self, msu_id: &str) -> bool {
        let removed = self.registry.lock().items.remove(msu_id).is_some();
        if removed {
            info!(parent: &self.span, msu_id, "msu removed");
        }
        removed
    }

    /// Refresh an MSU's liveness timestamp. Unknown IDs are ignored.
    pub fn touch(&self, msu_id: &str) {
        if let Some(msu) = self.get(msu_id) {
            msu.touch();
        }
    }

    /// Registered MSU IDs, sorted.
    pub fn list_ids(&self) -> Vec<String> {
        self.registry.lock().items.keys().cloned().collect()
    }

    /// Number of registered MSUs.
    pub fn msu_count(&self) -> usize {
        self.registry.lock().items.len()
    }

    /// Number of rooms bound to an MSU.
    pub fn room_count(&self) -> usize {
        self.registry.lock().rooms.len()
    }

    /// Remove every MSU with `now - alive >= ttl_ms` and return their IDs.
    ///
    /// `now_ms` defaults to the current time.
    pub fn prune_stale(&self, ttl_ms: i64, now: Option<i64>) -> Vec<String> {
        let now = now.unwrap_or_else(now_ms);
        let mut registry = self.registry.lock();
        let stale: Vec<String> = registry
            .items
            .values()
            .filter(|m| !m.is_alive(ttl_ms, now))
            .map(|m| m.id().to_owned())
            .collect();
        for id in &stale {
            let _ = registry.items.remove(id);
        }
        drop(registry);

        if !stale.is_empty() {
            info!(parent: &self.span, removed = ?stale, "pruned stale msus");
        }
        stale
    }

    /// The MSU backing `room_id`: its binding if any, otherwise the first
    /// registered MSU. Does not create a binding.
    pub fn msu_for_room(&self, room_id: &str) -> Option<Arc<Msu>> {
        let registry = self.registry.lock();
        registry
            .rooms
            .get(room_id)
            .or_else(|| registry.items.values().next())
            .cloned()
    }

    /// Bind `room_id` to an MSU on first use and tell it about the joiner.
    ///
    /// With no MSU registered this logs a warning and succeeds. A failed
    /// `joinRoom` send is returned to the caller.
    pub async fn handle_join_room(
        &self,
        room_id: &str,
        user_id: &str,
        user_name: &str,
    ) -> Result<(), MsuError> {
        let assigned = {
            let mut registry = self.registry.lock();
            if let Some(msu) = registry.rooms.get(room_id) {
                Some(msu.clone())
            } else if let Some(first) = registry.items.values().next().cloned() {
                let _ = registry.rooms.insert(room_id.to_owned(), first.clone());
                info!(parent: &self.span, room_id, msu_id = first.id(), "room bound to msu");
                Some(first)
            } else {
                None
            }
        };

        let Some(msu) = assigned else {
            warn!(parent: &self.span, room_id, user_id, "no msu available for room");
            return Ok(());
        };

        let payload = json!({
            "roomId": room_id,
            "userId": user_id,
            "userName": user_name,
        });
        msu.session()
            .send_notification("joinRoom", payload)
            .await
            .map_err(|source| MsuError::Notify {
                msu_id: msu.id().to_owned(),
                source,
            })
    }
}

impl Default for MsuManager {
    fn default() -> Self {
        Self::new(Span::none())
    }
}
