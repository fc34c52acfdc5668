// Push message envelope
//
// Every frame on a push channel is a JSON object whose "type" names the
// dashboard it refreshes; the remaining keys are the fields to replace.

use super::DashboardKind;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, PartialEq)]
pub enum MessageError {
    #[error("frame is not valid JSON: {0}")]
    Json(String),

    #[error("frame is not a JSON object")]
    NotAnObject,

    #[error("frame has no type tag")]
    MissingTag,

    #[error("unknown message type: {0}")]
    UnknownTag(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageTag {
    DashboardUpdate,
    ThreatsUpdate,
    AnalyticsUpdate,
    Ping,
}

impl MessageTag {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "dashboard_update" => Some(MessageTag::DashboardUpdate),
            "threats_update" => Some(MessageTag::ThreatsUpdate),
            "analytics_update" => Some(MessageTag::AnalyticsUpdate),
            "ping" => Some(MessageTag::Ping),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageTag::DashboardUpdate => "dashboard_update",
            MessageTag::ThreatsUpdate => "threats_update",
            MessageTag::AnalyticsUpdate => "analytics_update",
            MessageTag::Ping => "ping",
        }
    }

    /// Dashboard this tag refreshes; keepalives have none
    pub fn target(&self) -> Option<DashboardKind> {
        DashboardKind::ALL
            .into_iter()
            .find(|kind| kind.push_tag() == Some(*self))
    }
}

impl fmt::Display for MessageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded push frame
#[derive(Clone, Debug, PartialEq)]
pub struct PushMessage {
    pub tag: MessageTag,
    pub fields: Map<String, Value>,
}

impl PushMessage {
    pub fn parse(frame: &str) -> Result<Self, MessageError> {
        let value: Value =
            serde_json::from_str(frame).map_err(|e| MessageError::Json(e.to_string()))?;
        let Value::Object(mut fields) = value else {
            return Err(MessageError::NotAnObject);
        };
        let tag = match fields.remove("type") {
            Some(Value::String(tag)) => tag,
            _ => return Err(MessageError::MissingTag),
        };
        let tag = MessageTag::parse(&tag).ok_or(MessageError::UnknownTag(tag))?;
        Ok(Self { tag, fields })
    }
}

/// Decode one field of an update
///
/// Absent and null fields yield `None`. So does a field of the wrong shape,
/// which is logged and left for the caller to skip.
pub fn field<T: DeserializeOwned>(fields: &Map<String, Value>, name: &str) -> Option<T> {
    let raw = fields.get(name).filter(|v| !v.is_null())?;
    match T::deserialize(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(target: "dashboard", field = name, error = %e, "Skipping malformed field");
            None
        }
    }
}
