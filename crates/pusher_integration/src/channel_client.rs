use std::{collections::VecDeque, sync::Arc};

use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

use crate::{RelayConnector, RelayCredentials, RelayError, RelayEvent, RelaySession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Pending,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Handed to the transport. Delivery is fire-and-forget; transport
    /// failures are logged, not reported.
    Delivered,
    /// Held in the outbound queue until the subscription handshake lands.
    Queued,
}

struct QueuedEvent {
    name: String,
    payload: Value,
}

struct ClientInner {
    state: HandleState,
    queue: VecDeque<QueuedEvent>,
}

/// Wraps a relay session behind the subscription handshake. Publishes issued
/// before the relay confirms the subscription are queued and replayed in
/// order, exactly once, the moment the handshake succeeds. The handle moves
/// `Pending -> Ready` once and never back; a dropped connection is not
/// detected here.
pub struct ChannelClient {
    session: Arc<dyn RelaySession>,
    inner: Mutex<ClientInner>,
}

impl ChannelClient {
    pub async fn connect(
        connector: &dyn RelayConnector,
        credentials: &RelayCredentials,
    ) -> Result<Arc<Self>, RelayError> {
        let session = connector.connect(credentials).await?;
        Ok(Self::wrap(session))
    }

    /// Wrap an already-connected session. The handle starts `Pending` and
    /// flips when the session reports `SubscriptionSucceeded`.
    pub fn wrap(session: Arc<dyn RelaySession>) -> Arc<Self> {
        let client = Arc::new(Self {
            session,
            inner: Mutex::new(ClientInner {
                state: HandleState::Pending,
                queue: VecDeque::new(),
            }),
        });
        client.spawn_handshake_watch();
        client
    }

    fn spawn_handshake_watch(self: &Arc<Self>) {
        let mut events = self.session.subscribe_events();
        let client = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(RelayEvent::SubscriptionSucceeded) => {
                        client.mark_ready().await;
                        break;
                    }
                    Ok(RelayEvent::Closed { reason }) => {
                        warn!(%reason, "relay closed before subscription succeeded");
                        break;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "handshake watcher lagged behind relay events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// Flip to `Ready` and drain the outbound queue in FIFO order. The lock
    /// is held across the drain so publishes racing the handshake cannot
    /// overtake queued events.
    async fn mark_ready(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state == HandleState::Ready {
            return;
        }
        inner.state = HandleState::Ready;
        let drained = std::mem::take(&mut inner.queue);
        if !drained.is_empty() {
            info!(
                queued = drained.len(),
                "subscription established; flushing outbound queue"
            );
        }
        for event in drained {
            if let Err(error) = self.session.publish(&event.name, event.payload).await {
                warn!(event = %event.name, %error, "queued publish failed");
            }
        }
    }

    /// Publish a client event. Never fails from the caller's point of view:
    /// pre-handshake publishes are queued, transport errors are logged and
    /// swallowed.
    pub async fn publish(&self, name: &str, payload: Value) -> PublishOutcome {
        {
            let mut inner = self.inner.lock().await;
            if inner.state == HandleState::Pending {
                inner.queue.push_back(QueuedEvent {
                    name: name.to_string(),
                    payload,
                });
                return PublishOutcome::Queued;
            }
        }
        if let Err(error) = self.session.publish(name, payload).await {
            warn!(event = name, %error, "relay publish failed");
        }
        PublishOutcome::Delivered
    }

    pub async fn state(&self) -> HandleState {
        self.inner.lock().await.state
    }

    pub async fn queued_len(&self) -> usize {
        self.inner.lock().await.queue.len()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<RelayEvent> {
        self.session.subscribe_events()
    }

    pub async fn close(&self) -> Result<(), RelayError> {
        self.session.close().await
    }
}

#[cfg(test)]
#[path = "tests/channel_client_tests.rs"]
mod tests;
