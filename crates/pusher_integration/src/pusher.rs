use std::sync::Arc;

use async_trait::async_trait;
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tokio::{
    net::TcpStream,
    sync::{broadcast, Mutex},
};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{info, warn};
use url::Url;

use crate::{wire, RelayConnector, RelayCredentials, RelayError, RelayEvent, RelaySession};

type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsReader = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

const EVENT_BUFFER: usize = 256;

/// Connects to the hosted Pusher relay: WebSocket handshake, private-channel
/// auth against the configured endpoint, then a subscribe frame. The
/// subscription-succeeded acknowledgement is surfaced as a `RelayEvent`, not
/// awaited here, so callers can queue publishes in the meantime.
pub struct PusherConnector {
    http: Client,
}

impl PusherConnector {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }

    async fn authorize(
        &self,
        credentials: &RelayCredentials,
        socket_id: &str,
    ) -> Result<String, RelayError> {
        let endpoint = Url::parse(&credentials.auth_endpoint)
            .map_err(|error| RelayError::AuthRejected(format!("invalid auth endpoint: {error}")))?;
        let response = self
            .http
            .post(endpoint)
            .form(&[
                ("socket_id", socket_id),
                ("channel_name", credentials.channel.as_str()),
            ])
            .send()
            .await
            .map_err(|error| RelayError::AuthRejected(error.to_string()))?;
        if !response.status().is_success() {
            return Err(RelayError::AuthRejected(format!(
                "auth endpoint returned {}",
                response.status()
            )));
        }
        let body: AuthResponse = response
            .json()
            .await
            .map_err(|error| RelayError::AuthRejected(error.to_string()))?;
        Ok(body.auth)
    }
}

impl Default for PusherConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    auth: String,
}

#[async_trait]
impl RelayConnector for PusherConnector {
    async fn connect(
        &self,
        credentials: &RelayCredentials,
    ) -> Result<Arc<dyn RelaySession>, RelayError> {
        let ws_url = format!(
            "wss://ws-{}.pusher.com/app/{}?protocol=7&client=kv-broadcast&version=0.1.0",
            credentials.cluster, credentials.app_key
        );
        let (stream, _) = connect_async(&ws_url)
            .await
            .map_err(|error| RelayError::Transport(error.to_string()))?;
        let (mut writer, mut reader) = stream.split();

        // The relay sends connection_established before anything else; its
        // socket id is required for private-channel auth.
        let socket_id = await_connection_established(&mut reader).await?;
        info!(%socket_id, channel = %credentials.channel, "relay connection established");

        let auth = self.authorize(credentials, &socket_id).await?;

        let subscribe = wire::Frame::subscribe(&credentials.channel, Some(auth))
            .map_err(|error| RelayError::Handshake(error.to_string()))?;
        send_frame(&mut writer, &subscribe).await?;

        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let session = Arc::new(PusherSession {
            channel: credentials.channel.clone(),
            writer: Mutex::new(writer),
            events,
        });
        session.spawn_read_loop(reader);
        Ok(session)
    }
}

async fn await_connection_established(reader: &mut WsReader) -> Result<String, RelayError> {
    loop {
        let Some(message) = reader.next().await else {
            return Err(RelayError::Handshake(
                "connection closed before connection_established".to_string(),
            ));
        };
        let message = message.map_err(|error| RelayError::Transport(error.to_string()))?;
        let Message::Text(text) = message else {
            continue;
        };
        let frame: wire::Frame = serde_json::from_str(&text)
            .map_err(|error| RelayError::Handshake(error.to_string()))?;
        match frame.event.as_str() {
            wire::CONNECTION_ESTABLISHED => {
                let established: wire::ConnectionEstablished = frame
                    .parse_data()
                    .map_err(|error| RelayError::Handshake(error.to_string()))?;
                return Ok(established.socket_id);
            }
            wire::ERROR => {
                return Err(RelayError::Handshake(format!(
                    "relay error during connect: {:?}",
                    frame.data
                )));
            }
            _ => {}
        }
    }
}

async fn send_frame(writer: &mut WsWriter, frame: &wire::Frame) -> Result<(), RelayError> {
    let text =
        serde_json::to_string(frame).map_err(|error| RelayError::Transport(error.to_string()))?;
    writer
        .send(Message::Text(text))
        .await
        .map_err(|error| RelayError::Transport(error.to_string()))
}

struct PusherSession {
    channel: String,
    writer: Mutex<WsWriter>,
    events: broadcast::Sender<RelayEvent>,
}

impl PusherSession {
    fn spawn_read_loop(self: &Arc<Self>, mut reader: WsReader) {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(message) = reader.next().await {
                match message {
                    Ok(Message::Text(text)) => session.handle_frame(&text).await,
                    Ok(Message::Close(_)) => {
                        let _ = session.events.send(RelayEvent::Closed {
                            reason: "closed by relay".to_string(),
                        });
                        break;
                    }
                    Ok(_) => {}
                    Err(error) => {
                        let _ = session.events.send(RelayEvent::Closed {
                            reason: error.to_string(),
                        });
                        break;
                    }
                }
            }
        });
    }

    async fn handle_frame(&self, text: &str) {
        let frame: wire::Frame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(error) => {
                warn!(%error, "discarding malformed relay frame");
                return;
            }
        };
        let wire::Frame { event, data, .. } = frame;
        match event.as_str() {
            wire::SUBSCRIPTION_SUCCEEDED => {
                info!(channel = %self.channel, "relay subscription succeeded");
                let _ = self.events.send(RelayEvent::SubscriptionSucceeded);
            }
            wire::PING => {
                if let Err(error) = self.send(&wire::Frame::pong()).await {
                    warn!(%error, "failed to answer relay ping");
                }
            }
            wire::ERROR => {
                warn!(data = ?data, "relay error frame");
            }
            name if name.starts_with("client-") => {
                // Client event payloads may arrive double-encoded depending
                // on the publisher; unwrap a JSON string when they do.
                let payload = match data {
                    Some(Value::String(inner)) => serde_json::from_str(&inner)
                        .unwrap_or(Value::String(inner)),
                    Some(other) => other,
                    None => Value::Null,
                };
                let _ = self.events.send(RelayEvent::Message {
                    name: name.to_string(),
                    payload,
                });
            }
            _ => {}
        }
    }

    async fn send(&self, frame: &wire::Frame) -> Result<(), RelayError> {
        let mut writer = self.writer.lock().await;
        send_frame(&mut writer, frame).await
    }
}

#[async_trait]
impl RelaySession for PusherSession {
    async fn publish(&self, name: &str, payload: Value) -> Result<(), RelayError> {
        self.send(&wire::Frame::client_event(&self.channel, name, payload))
            .await
    }

    fn subscribe_events(&self) -> broadcast::Receiver<RelayEvent> {
        self.events.subscribe()
    }

    async fn close(&self) -> Result<(), RelayError> {
        let mut writer = self.writer.lock().await;
        writer
            .send(Message::Close(None))
            .await
            .map_err(|error| RelayError::Transport(error.to_string()))
    }
}
