use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown channel event '{0}'")]
    UnknownEvent(String),
    #[error("malformed payload for '{event}': {source}")]
    MalformedPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode payload for '{event}': {source}")]
    EncodePayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}
