use thiserror::Error;

/// Errors raised by the realtime channel
#[derive(Error, Debug)]
pub enum RealtimeError {
    #[error("WebSocket error: {0}")]
    WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Connection error: {0}")]
    ConnectionError(String),
}

impl From<tokio::sync::mpsc::error::SendError<tokio_tungstenite::tungstenite::Message>>
    for RealtimeError
{
    fn from(
        err: tokio::sync::mpsc::error::SendError<tokio_tungstenite::tungstenite::Message>,
    ) -> Self {
        RealtimeError::ConnectionError(format!("Failed to send message to socket task: {}", err))
    }
}
