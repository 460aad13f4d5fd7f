//! A room member.

use std::collections::BTreeMap;

use parking_lot::{Mutex, RwLock};
use pilot_protocol::{SharedSession, same_session};

use crate::push::PushInfo;

/// One user inside a room.
///
/// Holds at most one session at a time: attaching a new one evicts the old
/// reference.
pub struct User {
    id: String,
    name: RwLock<String>,
    session: Mutex<Option<SharedSession>>,
    pushers: RwLock<BTreeMap<String, PushInfo>>,
}

impl User {
    /// Create a session-less user.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: RwLock::new(name.into()),
            session: Mutex::new(None),
            pushers: RwLock::new(BTreeMap::new()),
        }
    }

    /// User ID, unique within the room.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current display name.
    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    /// Replace the display name.
    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.write() = name.into();
    }

    /// Attach `session`, returning the one it replaced.
    pub fn attach_session(&self, session: SharedSession) -> Option<SharedSession> {
        self.session.lock().replace(session)
    }

    /// Detach `session` if it is the one currently attached.
    ///
    /// Returns `false` when a different session (or none) is attached.
    pub fn detach_session(&self, session: &SharedSession) -> bool {
        let mut current = self.session.lock();
        if current.as_ref().is_some_and(|s| same_session(s, session)) {
            *current = None;
            true
        } else {
            false
        }
    }

    /// The attached session, if any.
    pub fn session(&self) -> Option<SharedSession> {
        self.session.lock().clone()
    }

    /// Whether a session is attached.
    pub fn has_session(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Record a published stream, replacing any with the same pusher ID.
    pub fn set_pusher(&self, info: PushInfo) {
        let _ = self.pushers.write().insert(info.pusher_id().to_owned(), info);
    }

    /// Look up one published stream.
    pub fn pusher(&self, pusher_id: &str) -> Option<PushInfo> {
        self.pushers.read().get(pusher_id).cloned()
    }

    /// Snapshot of all published streams, ordered by pusher ID.
    pub fn pushers(&self) -> Vec<PushInfo> {
        self.pushers.read().values().cloned().collect()
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &*self.name.read())
            .field("session", &self.session.lock().as_ref().map(|s| s.peer().to_owned()))
            .field("pushers", &self.pushers.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::RtpParam;
    use pilot_protocol::testing::RecordingSession;

    #[test]
    fn new_user_has_no_session() {
        let user = User::new("u1", "Alice");
        assert_eq!(user.id(), "u1");
        assert_eq!(user.name(), "Alice");
        assert!(!user.has_session());
        assert!(user.pushers().is_empty());
    }

    #[test]
    fn attach_replaces_previous_session() {
        let user = User::new("u1", "Alice");
        let first: SharedSession = RecordingSession::new("p1");
        let second: SharedSession = RecordingSession::new("p2");

        assert!(user.attach_session(first.clone()).is_none());
        let evicted = user.attach_session(second.clone()).unwrap();
        assert!(same_session(&evicted, &first));
        assert!(same_session(&user.session().unwrap(), &second));
    }

    #[test]
    fn detach_requires_identical_session() {
        let user = User::new("u1", "Alice");
        let attached: SharedSession = RecordingSession::new("p1");
        let stranger: SharedSession = RecordingSession::new("p1");
        let _ = user.attach_session(attached.clone());

        assert!(!user.detach_session(&stranger));
        assert!(user.has_session());
        assert!(user.detach_session(&attached));
        assert!(!user.has_session());
        assert!(!user.detach_session(&attached));
    }

    #[test]
    fn set_pusher_is_last_write_wins() {
        let user = User::new("u1", "Alice");
        user.set_pusher(PushInfo::new("cam", None));
        let rtp = RtpParam {
            codec: "vp8".into(),
            ..RtpParam::default()
        };
        user.set_pusher(PushInfo::new("cam", Some(rtp)));
        user.set_pusher(PushInfo::new("mic", None));

        let pushers = user.pushers();
        assert_eq!(pushers.len(), 2);
        assert_eq!(pushers[0].pusher_id(), "cam");
        assert_eq!(user.pusher("cam").unwrap().rtp_param().unwrap().codec, "vp8");
    }

    #[test]
    fn rename() {
        let user = User::new("u1", "Alice");
        user.set_name("Alicia");
        assert_eq!(user.name(), "Alicia");
    }
}
