//! Notification routing. Notifications never produce a response.

use pilot_protocol::SharedSession;
use pilot_room::PushInfo;
use serde_json::Value;
use tracing::{debug, warn};

use crate::dispatch::context::DispatchContext;
use crate::dispatch::payload::{
    LeaveData, PullRemoteStreamData, PushNotificationData, TextMessageData, decode,
};
use crate::metrics;

/// Notification methods the hub acts on.
pub const NOTIFICATION_METHODS: &[&str] = &[
    "push",
    "pullRemoteStream",
    "userDisconnect",
    "userLeave",
    "textMessage",
];

/// Route one notification. Unknown methods and undecodable payloads are
/// logged and dropped.
pub async fn handle_notification(
    ctx: &DispatchContext,
    session: &SharedSession,
    method: &str,
    data: Value,
) {
    let known = NOTIFICATION_METHODS.contains(&method);
    metrics::record_notification(method, known);
    if !known {
        warn!(parent: &ctx.span, method, peer = session.peer(), "unknown notification method");
        return;
    }
    if !data.is_object() {
        debug!(
            parent: &ctx.span,
            method,
            peer = session.peer(),
            "notification data is not an object"
        );
        return;
    }

    match method {
        "push" => {
            let Some(req) = decode_or_warn::<PushNotificationData>(ctx, method, data) else {
                return;
            };
            let publishers = parse_publishers(ctx, req.publishers);
            ctx.rooms
                .handle_push(&req.room_id, &req.user_id, &req.user_name, publishers, session)
                .await;
        }
        "pullRemoteStream" => {
            let Some(req) = decode_or_warn::<PullRemoteStreamData>(ctx, method, data.clone())
            else {
                return;
            };
            ctx.rooms
                .handle_pull_remote_stream(&req.room_id, &req.pusher_user_id, data, session)
                .await;
        }
        "userDisconnect" => {
            let Some(req) = decode_or_warn::<LeaveData>(ctx, method, data) else {
                return;
            };
            ctx.rooms.handle_user_disconnect(&req.room_id, &req.user_id, session).await;
        }
        "userLeave" => {
            let Some(req) = decode_or_warn::<LeaveData>(ctx, method, data) else {
                return;
            };
            ctx.rooms.handle_user_leave(&req.room_id, &req.user_id, session).await;
        }
        "textMessage" => {
            let Some(req) = decode_or_warn::<TextMessageData>(ctx, method, data) else {
                return;
            };
            ctx.rooms
                .handle_text_message(
                    &req.room_id,
                    &req.user_id,
                    &req.user_name,
                    &req.message,
                    session,
                )
                .await;
        }
        _ => {}
    }
}

fn decode_or_warn<T: serde::de::DeserializeOwned>(
    ctx: &DispatchContext,
    method: &str,
    data: Value,
) -> Option<T> {
    match decode(data) {
        Ok(req) => Some(req),
        Err(e) => {
            warn!(parent: &ctx.span, method, error = %e, "dropping notification");
            None
        }
    }
}

/// Decode publisher entries one by one, skipping those that do not parse.
fn parse_publishers(ctx: &DispatchContext, raw: Vec<Value>) -> Vec<PushInfo> {
    raw.into_iter()
        .filter_map(|entry| match serde_json::from_value::<PushInfo>(entry) {
            Ok(info) => Some(info),
            Err(e) => {
                debug!(parent: &ctx.span, error = %e, "skipping malformed publisher");
                None
            }
        })
        .collect()
}
