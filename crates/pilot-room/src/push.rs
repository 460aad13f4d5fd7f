//! Published stream descriptors.

use pilot_protocol::lenient;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// RTP codec and transport metadata for one published stream.
///
/// Carried opaquely between peers and never validated. Each field is read on
/// its own, so a bad value leaves only that field at zero.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RtpParam {
    /// Media kind, e.g. `"audio"` or `"video"`.
    #[serde(deserialize_with = "lenient::string")]
    pub av_type: String,
    /// Codec name.
    #[serde(deserialize_with = "lenient::string")]
    pub codec: String,
    /// Format parameters (`a=fmtp` line content).
    #[serde(deserialize_with = "lenient::string")]
    pub fmtp_param: String,
    /// RTCP feedback mechanisms, in announcement order.
    #[serde(deserialize_with = "lenient::strings")]
    pub rtcp_features: Vec<String>,
    /// Channel count.
    #[serde(deserialize_with = "lenient::int")]
    pub channel: i32,
    /// Synchronization source.
    #[serde(deserialize_with = "lenient::int")]
    pub ssrc: u32,
    /// RTP payload type.
    #[serde(deserialize_with = "lenient::int")]
    pub payload_type: i32,
    /// Clock rate in Hz.
    #[serde(deserialize_with = "lenient::int")]
    pub clock_rate: i32,
    /// Retransmission SSRC.
    #[serde(deserialize_with = "lenient::int")]
    pub rtx_ssrc: u32,
    /// Retransmission payload type.
    #[serde(deserialize_with = "lenient::int")]
    pub rtx_payload_type: i32,
    /// Negative acknowledgement support.
    #[serde(deserialize_with = "lenient::boolean")]
    pub use_nack: bool,
    /// Key-frame request support.
    #[serde(deserialize_with = "lenient::boolean")]
    pub key_request: bool,
    /// `mid` header extension ID.
    #[serde(deserialize_with = "lenient::int")]
    pub mid_ext_id: i32,
    /// Transport-wide congestion control header extension ID.
    #[serde(deserialize_with = "lenient::int")]
    pub tcc_ext_id: i32,
}

/// One stream announced by a user.
///
/// Replaced wholesale when the same `pusherId` is announced again.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PushInfo {
    #[serde(deserialize_with = "lenient::string")]
    pusher_id: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "rtp_param_if_object"
    )]
    rtp_param: Option<RtpParam>,
}

/// `rtpParam` is kept only when it is an object.
fn rtp_param_if_object<'de, D: Deserializer<'de>>(d: D) -> Result<Option<RtpParam>, D::Error> {
    Ok(match Value::deserialize(d)? {
        obj @ Value::Object(_) => serde_json::from_value(obj).ok(),
        _ => None,
    })
}

impl PushInfo {
    /// Describe a stream.
    pub fn new(pusher_id: impl Into<String>, rtp_param: Option<RtpParam>) -> Self {
        Self {
            pusher_id: pusher_id.into(),
            rtp_param,
        }
    }

    /// Stream identifier, unique per user.
    pub fn pusher_id(&self) -> &str {
        &self.pusher_id
    }

    /// RTP metadata, if announced.
    pub fn rtp_param(&self) -> Option<&RtpParam> {
        self.rtp_param.as_ref()
    }
}
