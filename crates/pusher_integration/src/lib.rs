//! Relay transport for the broadcast channel.
//!
//! The hosted relay is an opaque, ordered, at-least-once transport between
//! the control panel and the display. `RelayConnector`/`RelaySession` form
//! the seam; the production implementation speaks the Pusher wire protocol
//! over a WebSocket, and tests substitute in-memory fakes.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

mod channel_client;
mod pusher;
mod wire;

pub use channel_client::{ChannelClient, HandleState, PublishOutcome};
pub use pusher::PusherConnector;

/// Everything needed to reach the hosted relay and join the broadcast
/// channel.
#[derive(Debug, Clone)]
pub struct RelayCredentials {
    pub app_key: String,
    pub cluster: String,
    pub auth_endpoint: String,
    pub channel: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// The relay acknowledged the channel subscription; client events may
    /// now be published.
    SubscriptionSucceeded,
    /// An application event from the other end of the channel.
    Message { name: String, payload: Value },
    /// The underlying transport ended. Informational only; no recovery is
    /// attempted at this layer.
    Closed { reason: String },
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay authentication rejected: {0}")]
    AuthRejected(String),
    #[error("relay transport failure: {0}")]
    Transport(String),
    #[error("relay handshake did not complete: {0}")]
    Handshake(String),
}

#[async_trait]
pub trait RelaySession: Send + Sync {
    /// Attempt to deliver a client event. Failures are transport-level and
    /// carry no retry semantics.
    async fn publish(&self, name: &str, payload: Value) -> Result<(), RelayError>;
    fn subscribe_events(&self) -> broadcast::Receiver<RelayEvent>;
    async fn close(&self) -> Result<(), RelayError>;
}

#[async_trait]
pub trait RelayConnector: Send + Sync {
    async fn connect(
        &self,
        credentials: &RelayCredentials,
    ) -> Result<Arc<dyn RelaySession>, RelayError>;
}
