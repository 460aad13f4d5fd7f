//! The three wire message shapes and inbound frame classification.
//!
//! Every frame is one JSON object. Its kind is decided by a boolean
//! discriminator (`request`, `response` or `notification`), checked in that
//! order. Unknown extra fields are ignored and missing ones take empty
//! defaults.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ProtocolError;

/// A correlated call expecting exactly one [`Response`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Request {
    /// Discriminator, always `true` on the wire.
    pub request: bool,
    /// Correlation ID. Numeric or string, echoed back untouched.
    pub id: Value,
    /// Method name.
    pub method: String,
    /// Method-specific payload.
    pub data: Value,
}

impl Request {
    /// Build an outbound request.
    pub fn new(id: impl Into<Value>, method: impl Into<String>, data: Value) -> Self {
        Self {
            request: true,
            id: id.into(),
            method: method.into(),
            data,
        }
    }
}

impl Default for Request {
    fn default() -> Self {
        Self {
            request: false,
            id: Value::Null,
            method: String::new(),
            data: Value::Null,
        }
    }
}

/// The answer to a [`Request`], success or failure.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Response {
    /// Discriminator, always `true` on the wire.
    pub response: bool,
    /// Correlation ID of the originating request.
    pub id: Value,
    /// Whether the request succeeded.
    pub ok: bool,
    /// Success payload, present only when `ok`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Failure code, present only when not `ok`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i32>,
    /// Human-readable failure reason, present only when not `ok`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
}

impl Response {
    /// Successful response carrying `data`.
    pub fn ok(id: Value, data: Value) -> Self {
        Self {
            response: true,
            id,
            ok: true,
            data: Some(data),
            error_code: None,
            error_reason: None,
        }
    }

    /// Failed response carrying a code and reason.
    pub fn error(id: Value, code: i32, reason: impl Into<String>) -> Self {
        Self {
            response: true,
            id,
            ok: false,
            data: None,
            error_code: Some(code),
            error_reason: Some(reason.into()),
        }
    }
}

/// Fire-and-forget message. Never answered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Notification {
    /// Discriminator, always `true` on the wire.
    pub notification: bool,
    /// Method name.
    pub method: String,
    /// Method-specific payload.
    pub data: Value,
}

impl Notification {
    /// Build an outbound notification.
    pub fn new(method: impl Into<String>, data: Value) -> Self {
        Self {
            notification: true,
            method: method.into(),
            data,
        }
    }
}

impl Default for Notification {
    fn default() -> Self {
        Self {
            notification: false,
            method: String::new(),
            data: Value::Null,
        }
    }
}

/// A classified inbound frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Inbound {
    /// `request: true`.
    Request(Request),
    /// `response: true`.
    Response(Response),
    /// `notification: true`.
    Notification(Notification),
}

impl Inbound {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Request(_) => "request",
            Self::Response(_) => "response",
            Self::Notification(_) => "notification",
        }
    }
}

/// Classify one inbound text frame.
///
/// Each shape is tried in turn and accepted only if it decodes and its own
/// discriminator is `true`. A frame that decodes as none of them yields
/// [`ProtocolError::Unclassified`]; callers log and drop it.
pub fn classify(frame: &str) -> Result<Inbound, ProtocolError> {
    let value: Value = serde_json::from_str(frame)?;

    if let Some(request) = Request::deserialize(&value).ok().filter(|r| r.request) {
        return Ok(Inbound::Request(request));
    }
    if let Some(response) = Response::deserialize(&value).ok().filter(|r| r.response) {
        return Ok(Inbound::Response(response));
    }
    if let Some(notification) = Notification::deserialize(&value)
        .ok()
        .filter(|n| n.notification)
    {
        return Ok(Inbound::Notification(notification));
    }
    Err(ProtocolError::Unclassified)
}
