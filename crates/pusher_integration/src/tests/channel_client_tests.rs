use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::{broadcast, Mutex};

use super::*;
use crate::{RelayError, RelayEvent, RelaySession};

struct FakeSession {
    events: broadcast::Sender<RelayEvent>,
    published: Arc<Mutex<Vec<(String, Value)>>>,
    fail_publishes: bool,
}

impl FakeSession {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            events: broadcast::channel(32).0,
            published: Arc::new(Mutex::new(Vec::new())),
            fail_publishes: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            events: broadcast::channel(32).0,
            published: Arc::new(Mutex::new(Vec::new())),
            fail_publishes: true,
        })
    }

    fn signal_subscribed(&self) {
        let _ = self.events.send(RelayEvent::SubscriptionSucceeded);
    }
}

#[async_trait::async_trait]
impl RelaySession for FakeSession {
    async fn publish(&self, name: &str, payload: Value) -> Result<(), RelayError> {
        if self.fail_publishes {
            return Err(RelayError::Transport("wire down".to_string()));
        }
        self.published
            .lock()
            .await
            .push((name.to_string(), payload));
        Ok(())
    }

    fn subscribe_events(&self) -> broadcast::Receiver<RelayEvent> {
        self.events.subscribe()
    }

    async fn close(&self) -> Result<(), RelayError> {
        Ok(())
    }
}

async fn wait_until_ready(client: &ChannelClient) {
    for _ in 0..100 {
        if client.state().await == HandleState::Ready {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    panic!("channel never became ready");
}

#[tokio::test]
async fn publishes_before_handshake_are_queued() {
    let session = FakeSession::new();
    let client = ChannelClient::wrap(session.clone());

    let outcome = client
        .publish("client-kommune-changed", json!({ "kommuneId": "860" }))
        .await;

    assert_eq!(outcome, PublishOutcome::Queued);
    assert_eq!(client.state().await, HandleState::Pending);
    assert_eq!(client.queued_len().await, 1);
    assert!(session.published.lock().await.is_empty());
}

#[tokio::test]
async fn queue_is_flushed_in_order_exactly_once_on_handshake() {
    let session = FakeSession::new();
    let client = ChannelClient::wrap(session.clone());

    for i in 0..5 {
        let outcome = client
            .publish("client-kommune-changed", json!({ "kommuneId": i.to_string() }))
            .await;
        assert_eq!(outcome, PublishOutcome::Queued);
    }

    session.signal_subscribed();
    wait_until_ready(&client).await;

    let published = session.published.lock().await.clone();
    assert_eq!(published.len(), 5);
    for (i, (name, payload)) in published.iter().enumerate() {
        assert_eq!(name, "client-kommune-changed");
        assert_eq!(payload["kommuneId"], i.to_string());
    }
    assert_eq!(client.queued_len().await, 0);
}

#[tokio::test]
async fn handshake_signal_is_idempotent() {
    let session = FakeSession::new();
    let client = ChannelClient::wrap(session.clone());

    client
        .publish("client-template-changed", json!({ "template": "results" }))
        .await;

    session.signal_subscribed();
    wait_until_ready(&client).await;
    client.mark_ready().await;

    assert_eq!(session.published.lock().await.len(), 1);
}

#[tokio::test]
async fn publishes_after_handshake_go_straight_to_the_wire() {
    let session = FakeSession::new();
    let client = ChannelClient::wrap(session.clone());

    session.signal_subscribed();
    wait_until_ready(&client).await;

    let outcome = client
        .publish("client-valgsted-changed", json!({ "kommuneId": "860", "valgstedId": "86001" }))
        .await;

    assert_eq!(outcome, PublishOutcome::Delivered);
    let published = session.published.lock().await.clone();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, "client-valgsted-changed");
}

#[tokio::test]
async fn transport_failures_are_swallowed() {
    let session = FakeSession::failing();
    let client = ChannelClient::wrap(session.clone());

    session.signal_subscribed();
    wait_until_ready(&client).await;

    // The caller is not told about delivery failures; the warning lands in
    // the log stream only.
    let outcome = client
        .publish("client-kommune-changed", json!({ "kommuneId": "860" }))
        .await;
    assert_eq!(outcome, PublishOutcome::Delivered);
}

#[tokio::test]
async fn ready_state_is_never_left() {
    let session = FakeSession::new();
    let client = ChannelClient::wrap(session.clone());

    session.signal_subscribed();
    wait_until_ready(&client).await;

    let _ = session.events.send(RelayEvent::Closed {
        reason: "relay went away".to_string(),
    });
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    assert_eq!(client.state().await, HandleState::Ready);
    let outcome = client
        .publish("client-kommune-changed", json!({ "kommuneId": "860" }))
        .await;
    assert_eq!(outcome, PublishOutcome::Delivered);
}
