//! Request method handlers.

use async_trait::async_trait;
use pilot_protocol::{DispatchError, SharedSession};
use pilot_room::PushInfo;
use serde_json::{Value, json};
use tracing::{debug, error, info};

use crate::dispatch::context::DispatchContext;
use crate::dispatch::payload::{
    JoinData, LeaveData, PullRequestData, PushRequestData, RegisterData, decode,
};
use crate::dispatch::registry::{RequestHandler, RequestRegistry};

/// Registry with every request method the hub serves.
pub fn default_registry() -> RequestRegistry {
    let mut registry = RequestRegistry::new();
    registry.register("echo", EchoHandler);
    registry.register("register", RegisterHandler);
    registry.register("join", JoinHandler);
    registry.register("push", PushHandler);
    registry.register("pull", PullHandler);
    registry.register("leave", LeaveHandler);
    registry
}

fn room_ack(message: &str, room_id: &str) -> Value {
    json!({
        "code": 0,
        "message": message,
        "roomId": room_id,
    })
}

/// `echo`: returns `{echo: data}`.
pub struct EchoHandler;

#[async_trait]
impl RequestHandler for EchoHandler {
    async fn handle(
        &self,
        data: Value,
        _session: &SharedSession,
        _ctx: &DispatchContext,
    ) -> Result<Value, DispatchError> {
        Ok(json!({ "echo": data }))
    }
}

/// `register`: registers or refreshes the calling MSU.
pub struct RegisterHandler;

#[async_trait]
impl RequestHandler for RegisterHandler {
    async fn handle(
        &self,
        data: Value,
        session: &SharedSession,
        ctx: &DispatchContext,
    ) -> Result<Value, DispatchError> {
        let req: RegisterData = decode(data)?;
        if req.id.is_empty() {
            return Err(DispatchError::InvalidData("invalid msu id".into()));
        }
        let _ = ctx.msus.add_or_update(session.clone(), &req.id, None);
        info!(
            parent: &ctx.span,
            msu_id = %req.id,
            peer = session.peer(),
            "msu registration accepted"
        );
        Ok(json!({
            "registered": true,
            "msuId": req.id,
        }))
    }
}

/// `join`: adds the caller to a room and, unless in audience mode, tells
/// the room's MSU.
pub struct JoinHandler;

#[async_trait]
impl RequestHandler for JoinHandler {
    async fn handle(
        &self,
        data: Value,
        session: &SharedSession,
        ctx: &DispatchContext,
    ) -> Result<Value, DispatchError> {
        let req: JoinData = decode(data)?;
        if req.room_id.is_empty() || req.user_id.is_empty() {
            return Err(DispatchError::InvalidData(
                "invalid room id or user id".into(),
            ));
        }

        let result = ctx
            .rooms
            .handle_join(&req.room_id, &req.user_id, &req.user_name, req.audience, session)
            .await;

        if !req.audience {
            if let Err(e) = ctx
                .msus
                .handle_join_room(&req.room_id, &req.user_id, &req.user_name)
                .await
            {
                error!(
                    parent: &ctx.span,
                    room_id = %req.room_id,
                    user_id = %req.user_id,
                    error = %e,
                    "msu join failed"
                );
            }
        }

        Ok(json!(result))
    }
}

/// `push`: announces one stream, identified by `streamId`, without RTP
/// parameters.
pub struct PushHandler;

#[async_trait]
impl RequestHandler for PushHandler {
    async fn handle(
        &self,
        data: Value,
        session: &SharedSession,
        ctx: &DispatchContext,
    ) -> Result<Value, DispatchError> {
        let req: PushRequestData = decode(data)?;
        debug!(
            parent: &ctx.span,
            room_id = %req.room_id,
            user_id = %req.user_id,
            stream_id = %req.stream_id,
            stream_type = %req.stream_type,
            "push request"
        );
        let publishers = vec![PushInfo::new(req.stream_id, None)];
        ctx.rooms.handle_push(&req.room_id, &req.user_id, "", publishers, session).await;
        Ok(room_ack("push success", &req.room_id))
    }
}

/// `pull`: asks the `source` user to start sending its stream.
pub struct PullHandler;

#[async_trait]
impl RequestHandler for PullHandler {
    async fn handle(
        &self,
        data: Value,
        session: &SharedSession,
        ctx: &DispatchContext,
    ) -> Result<Value, DispatchError> {
        let req: PullRequestData = decode(data)?;
        let forwarded = json!({
            "roomId": req.room_id,
            "userId": req.user_id,
            "pusher_user_id": req.source,
        });
        ctx.rooms.handle_pull_remote_stream(&req.room_id, &req.source, forwarded, session).await;
        Ok(room_ack("pull success", &req.room_id))
    }
}

/// `leave`: removes the caller from a room.
pub struct LeaveHandler;

#[async_trait]
impl RequestHandler for LeaveHandler {
    async fn handle(
        &self,
        data: Value,
        session: &SharedSession,
        ctx: &DispatchContext,
    ) -> Result<Value, DispatchError> {
        let req: LeaveData = decode(data)?;
        ctx.rooms.handle_user_leave(&req.room_id, &req.user_id, session).await;
        Ok(room_ack("leave success", &req.room_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pilot_protocol::testing::RecordingSession;
    use std::sync::Arc;

    fn shared(session: &Arc<RecordingSession>) -> SharedSession {
        session.clone()
    }

    async fn call(
        ctx: &DispatchContext,
        method: &str,
        data: Value,
        session: &Arc<RecordingSession>,
    ) -> Result<Value, DispatchError> {
        default_registry().dispatch(method, data, &shared(session), ctx).await
    }

    // ── echo / register ─────────────────────────────────────────────

    #[tokio::test]
    async fn echo_wraps_data() {
        let ctx = DispatchContext::default();
        let s = RecordingSession::new("p1");
        let out = call(&ctx, "echo", json!({"hello": "world"}), &s).await.unwrap();
        assert_eq!(out, json!({"echo": {"hello": "world"}}));
    }

    #[tokio::test]
    async fn register_adds_msu() {
        let ctx = DispatchContext::default();
        let s = RecordingSession::new("msu-peer");
        let out = call(&ctx, "register", json!({"id": "msu-1"}), &s).await.unwrap();
        assert_eq!(out, json!({"registered": true, "msuId": "msu-1"}));
        assert_eq!(ctx.msus.get("msu-1").unwrap().session().peer(), "msu-peer");
    }

    #[tokio::test]
    async fn register_rejects_empty_id() {
        let ctx = DispatchContext::default();
        let s = RecordingSession::new("p1");
        let err = call(&ctx, "register", json!({"id": ""}), &s).await.unwrap_err();
        assert_eq!(err, DispatchError::InvalidData("invalid msu id".into()));
        let err = call(&ctx, "register", json!("msu-1"), &s).await.unwrap_err();
        assert_eq!(err, DispatchError::invalid_format());
        assert_eq!(ctx.msus.msu_count(), 0);
    }

    // ── join ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn join_requires_room_and_user() {
        let ctx = DispatchContext::default();
        let s = RecordingSession::new("p1");
        let err = call(&ctx, "join", json!({}), &s).await.unwrap_err();
        assert_eq!(err.code(), 400);
        assert_eq!(err.to_string(), "invalid room id or user id");
        let err = call(&ctx, "join", json!({"roomId": "r1"}), &s).await.unwrap_err();
        assert_eq!(err.code(), 400);
        assert_eq!(ctx.rooms.room_count(), 0);
    }

    #[tokio::test]
    async fn join_returns_other_members() {
        let ctx = DispatchContext::default();
        let s1 = RecordingSession::new("p1");
        let s2 = RecordingSession::new("p2");
        let _ = call(&ctx, "join", json!({"roomId": "r1", "userId": "u1", "userName": "A"}), &s1)
            .await
            .unwrap();
        let out = call(&ctx, "join", json!({"roomId": "r1", "userId": "u2", "userName": "B"}), &s2)
            .await
            .unwrap();

        assert_eq!(out["code"], 0);
        assert_eq!(out["message"], "join success");
        assert_eq!(out["roomId"], "r1");
        assert_eq!(out["users"], json!([{"userId": "u1", "userName": "A", "pushers": []}]));
        assert_eq!(
            s1.notifications_named("newUser"),
            vec![json!({"roomId": "r1", "userId": "u2", "userName": "B"})]
        );
    }

    #[tokio::test]
    async fn join_notifies_msu_unless_audience() {
        let ctx = DispatchContext::default();
        let msu = RecordingSession::new("msu-peer");
        let _ = ctx.msus.add_or_update(shared(&msu), "msu-1", None);

        let viewer = RecordingSession::new("p1");
        let audience = json!({"roomId": "r1", "userId": "v", "audience": true});
        let _ = call(&ctx, "join", audience, &viewer).await.unwrap();
        assert!(msu.notifications().is_empty());

        let member = RecordingSession::new("p2");
        let joiner = json!({"roomId": "r1", "userId": "u1", "userName": "A"});
        let _ = call(&ctx, "join", joiner, &member).await.unwrap();
        assert_eq!(
            msu.notifications_named("joinRoom"),
            vec![json!({"roomId": "r1", "userId": "u1", "userName": "A"})]
        );
    }

    #[tokio::test]
    async fn join_succeeds_when_msu_send_fails() {
        let ctx = DispatchContext::default();
        let _ = ctx.msus.add_or_update(RecordingSession::failing("msu"), "msu-1", None);
        let s = RecordingSession::new("p1");
        let out = call(&ctx, "join", json!({"roomId": "r1", "userId": "u1"}), &s).await;
        assert_matches!(out, Ok(v) if v["message"] == "join success");
    }

    // ── push / pull / leave ─────────────────────────────────────────

    #[tokio::test]
    async fn push_records_single_stream() {
        let ctx = DispatchContext::default();
        let s1 = RecordingSession::new("p1");
        let s2 = RecordingSession::new("p2");
        let _ = call(&ctx, "join", json!({"roomId": "r1", "userId": "u1", "userName": "A"}), &s1)
            .await;
        let _ = call(&ctx, "join", json!({"roomId": "r1", "userId": "u2", "userName": "B"}), &s2)
            .await;

        let out = call(
            &ctx,
            "push",
            json!({"roomId": "r1", "userId": "u1", "streamId": "cam", "type": "video"}),
            &s1,
        )
        .await
        .unwrap();
        assert_eq!(out, json!({"code": 0, "message": "push success", "roomId": "r1"}));

        let user = ctx.rooms.get_user("r1", "u1").unwrap();
        let pushed = user.pusher("cam").unwrap();
        assert!(pushed.rtp_param().is_none());
        assert_eq!(s2.notifications_named("newPusher").len(), 1);
        assert!(s1.notifications_named("newPusher").is_empty());
    }

    #[tokio::test]
    async fn push_rejects_non_object() {
        let ctx = DispatchContext::default();
        let s = RecordingSession::new("p1");
        let err = call(&ctx, "push", json!([1]), &s).await.unwrap_err();
        assert_eq!(err, DispatchError::invalid_format());
    }

    #[tokio::test]
    async fn pull_forwards_to_source() {
        let ctx = DispatchContext::default();
        let pusher = RecordingSession::new("p1");
        let puller = RecordingSession::new("p2");
        let _ = call(&ctx, "join", json!({"roomId": "r1", "userId": "u1"}), &pusher).await;
        let _ = call(&ctx, "join", json!({"roomId": "r1", "userId": "u2"}), &puller).await;

        let out = call(
            &ctx,
            "pull",
            json!({"roomId": "r1", "userId": "u2", "source": "u1"}),
            &puller,
        )
        .await
        .unwrap();
        assert_eq!(out["message"], "pull success");
        assert_eq!(
            pusher.notifications_named("pullRemoteStream"),
            vec![json!({"roomId": "r1", "userId": "u2", "pusher_user_id": "u1"})]
        );
    }

    #[tokio::test]
    async fn pull_from_unknown_source_still_succeeds() {
        let ctx = DispatchContext::default();
        let s = RecordingSession::new("p1");
        let out = call(&ctx, "pull", json!({"roomId": "r1", "userId": "u2", "source": "ghost"}), &s)
            .await
            .unwrap();
        assert_eq!(out["message"], "pull success");
    }

    #[tokio::test]
    async fn leave_removes_user() {
        let ctx = DispatchContext::default();
        let s1 = RecordingSession::new("p1");
        let s2 = RecordingSession::new("p2");
        let _ = call(&ctx, "join", json!({"roomId": "r1", "userId": "u1"}), &s1).await;
        let _ = call(&ctx, "join", json!({"roomId": "r1", "userId": "u2"}), &s2).await;

        let out = call(&ctx, "leave", json!({"roomId": "r1", "userId": "u1"}), &s1)
            .await
            .unwrap();
        assert_eq!(out, json!({"code": 0, "message": "leave success", "roomId": "r1"}));
        assert!(ctx.rooms.get_user("r1", "u1").is_none());
        assert_eq!(
            s2.notifications_named("userLeave"),
            vec![json!({"roomId": "r1", "userId": "u1"})]
        );
    }

    #[tokio::test]
    async fn room_routed_requests_skip_empty_room() {
        let ctx = DispatchContext::default();
        let s = RecordingSession::new("p1");
        let out = call(&ctx, "leave", json!({}), &s).await.unwrap();
        assert_eq!(out["roomId"], "");
        let _ = call(&ctx, "push", json!({"streamId": "cam"}), &s).await.unwrap();
        assert_eq!(ctx.rooms.room_count(), 0);
    }
}
