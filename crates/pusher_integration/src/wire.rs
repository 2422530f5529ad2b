//! Pusher wire frames (protocol version 7).

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CONNECTION_ESTABLISHED: &str = "pusher:connection_established";
pub const SUBSCRIBE: &str = "pusher:subscribe";
pub const SUBSCRIPTION_SUCCEEDED: &str = "pusher_internal:subscription_succeeded";
pub const ERROR: &str = "pusher:error";
pub const PING: &str = "pusher:ping";
pub const PONG: &str = "pusher:pong";

/// Envelope shared by every frame on the socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Payload of `pusher:connection_established`.
#[derive(Debug, Deserialize)]
pub struct ConnectionEstablished {
    pub socket_id: String,
    #[serde(default)]
    pub activity_timeout: Option<u64>,
}

#[derive(Debug, Serialize)]
struct SubscribeData {
    channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    auth: Option<String>,
}

impl Frame {
    pub fn subscribe(channel: &str, auth: Option<String>) -> Result<Self, serde_json::Error> {
        Ok(Self {
            event: SUBSCRIBE.to_string(),
            channel: None,
            data: Some(serde_json::to_value(SubscribeData {
                channel: channel.to_string(),
                auth,
            })?),
        })
    }

    pub fn client_event(channel: &str, name: &str, payload: Value) -> Self {
        Self {
            event: name.to_string(),
            channel: Some(channel.to_string()),
            data: Some(payload),
        }
    }

    pub fn pong() -> Self {
        Self {
            event: PONG.to_string(),
            channel: None,
            data: None,
        }
    }

    /// System frames double-encode their payload: `data` is JSON inside a
    /// string. Client event payloads usually arrive as plain JSON.
    pub fn parse_data<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match &self.data {
            Some(Value::String(inner)) => serde_json::from_str(inner),
            Some(other) => serde_json::from_value(other.clone()),
            None => serde_json::from_value(Value::Null),
        }
    }
}
