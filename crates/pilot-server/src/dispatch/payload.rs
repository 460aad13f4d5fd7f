//! Typed `data` payloads, one per request or notification method.
//!
//! Every field defaults to its empty value when missing or `null`. Payloads
//! that are not JSON objects, or whose fields have the wrong type, are
//! refused with [`DispatchError::InvalidData`].

use pilot_protocol::{DispatchError, lenient};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decode a method payload.
pub fn decode<T: DeserializeOwned>(data: Value) -> Result<T, DispatchError> {
    if !data.is_object() {
        return Err(DispatchError::invalid_format());
    }
    serde_json::from_value(data)
        .map_err(|e| DispatchError::InvalidData(format!("invalid data format: {e}")))
}

/// `register` request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterData {
    /// MSU ID.
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub id: String,
}

/// `join` request.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JoinData {
    /// Target room.
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub room_id: String,
    /// Acting user.
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub user_id: String,
    /// Display name of the acting user.
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub user_name: String,
    /// Join silently, without announcing the user.
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub audience: bool,
}

/// `push` request: a single stream, no RTP parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PushRequestData {
    /// Target room.
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub room_id: String,
    /// Acting user.
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub user_id: String,
    /// Stream identifier, used as the pusher ID.
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub stream_id: String,
    /// Stream kind, e.g. `"video"`.
    #[serde(rename = "type", deserialize_with = "lenient::null_as_default")]
    pub stream_type: String,
}

/// `pull` request.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PullRequestData {
    /// Target room.
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub room_id: String,
    /// Acting user.
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub user_id: String,
    /// User whose stream is wanted.
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub source: String,
}

/// `leave` request, and the `userLeave` / `userDisconnect` notifications.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LeaveData {
    /// Target room.
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub room_id: String,
    /// Acting user.
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub user_id: String,
}

/// `push` notification.
///
/// Publishers stay raw so one malformed entry does not reject the rest.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PushNotificationData {
    /// Target room.
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub room_id: String,
    /// Acting user.
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub user_id: String,
    /// Display name of the acting user.
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub user_name: String,
    /// Announced streams, each a `{pusherId, rtpParam?}` object.
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub publishers: Vec<Value>,
}

/// `pullRemoteStream` notification.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PullRemoteStreamData {
    /// Target room.
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub room_id: String,
    /// Acting user.
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub user_id: String,
    /// User whose stream is wanted. Snake case on the wire.
    #[serde(rename = "pusher_user_id", deserialize_with = "lenient::null_as_default")]
    pub pusher_user_id: String,
}

/// `textMessage` notification.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextMessageData {
    /// Target room.
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub room_id: String,
    /// Acting user.
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub user_id: String,
    /// Display name of the acting user.
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub user_name: String,
    /// Message text.
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn non_object_is_invalid_format() {
        for data in [json!(null), json!([1, 2]), json!("join"), json!(7)] {
            let err = decode::<JoinData>(data).unwrap_err();
            assert_eq!(err, DispatchError::invalid_format());
        }
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let join: JoinData = decode(json!({})).unwrap();
        assert!(join.room_id.is_empty());
        assert!(join.user_id.is_empty());
        assert!(!join.audience);
    }

    #[test]
    fn wrong_field_type_is_invalid_data() {
        let err = decode::<JoinData>(json!({"roomId": 12})).unwrap_err();
        assert_matches!(
            err,
            DispatchError::InvalidData(msg) if msg.starts_with("invalid data format")
        );
    }

    #[test]
    fn null_fields_read_as_empty() {
        let text: TextMessageData = decode(json!({
            "roomId": "r1",
            "userId": "u1",
            "userName": null,
            "message": "hi",
        }))
        .unwrap();
        assert!(text.user_name.is_empty());
        assert_eq!(text.message, "hi");

        let join: JoinData =
            decode(json!({"roomId": "r1", "userId": "u1", "audience": null})).unwrap();
        assert!(!join.audience);

        let push: PushNotificationData =
            decode(json!({"userName": null, "publishers": null})).unwrap();
        assert!(push.publishers.is_empty());
    }

    #[test]
    fn extra_fields_are_ignored() {
        let reg: RegisterData = decode(json!({"id": "msu-1", "region": "eu"})).unwrap();
        assert_eq!(reg.id, "msu-1");
    }

    #[test]
    fn push_request_reads_type_key() {
        let push: PushRequestData =
            decode(json!({"roomId": "r1", "userId": "u1", "streamId": "cam", "type": "video"}))
                .unwrap();
        assert_eq!(push.stream_id, "cam");
        assert_eq!(push.stream_type, "video");
    }

    #[test]
    fn pull_remote_stream_uses_snake_case_pusher_key() {
        let pull: PullRemoteStreamData =
            decode(json!({"roomId": "r1", "userId": "u2", "pusher_user_id": "u1"})).unwrap();
        assert_eq!(pull.pusher_user_id, "u1");
        let camel: PullRemoteStreamData = decode(json!({"pusherUserId": "u1"})).unwrap();
        assert!(camel.pusher_user_id.is_empty());
    }

    #[test]
    fn push_notification_keeps_raw_publishers() {
        let push: PushNotificationData = decode(json!({
            "roomId": "r1",
            "userId": "u1",
            "publishers": [{"pusherId": "p1"}, 5],
        }))
        .unwrap();
        assert_eq!(push.publishers.len(), 2);
    }
}
