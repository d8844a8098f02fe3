//! Error handling for the Smart Traffic client

use log::error;
use std::fmt;
use thiserror::Error;

use smart_traffic_realtime::RealtimeError;

/// Unified error type for the Smart Traffic client
#[derive(Error, Debug)]
pub enum Error {
    /// Network or transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a status outside 200-299
    #[error("{message}")]
    Request { status: u16, message: String },

    /// The server answered successfully but without the expected fields
    #[error("{0}")]
    InvalidResponse(String),

    /// Input rejected before anything was sent or stored
    #[error("{0}")]
    Validation(String),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Local store errors
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Realtime channel errors
    #[error("Realtime error: {0}")]
    Realtime(#[from] RealtimeError),

    /// General errors
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Create a new error for a non-successful response.
    ///
    /// `message` is the server-provided error text, if any.
    pub fn request(status: u16, message: Option<String>) -> Self {
        Error::Request {
            status,
            message: message.unwrap_or_else(|| format!("HTTP error! status: {}", status)),
        }
    }

    /// Create a new malformed-response error
    pub fn invalid_response<T: fmt::Display>(msg: T) -> Self {
        Error::InvalidResponse(msg.to_string())
    }

    /// Create a new validation error
    pub fn validation<T: fmt::Display>(msg: T) -> Self {
        Error::Validation(msg.to_string())
    }

    /// Create a new storage error
    pub fn storage<T: fmt::Display>(msg: T) -> Self {
        Error::Storage(msg.to_string())
    }

    /// Create a new general error
    pub fn general<T: fmt::Display>(msg: T) -> Self {
        Error::General(msg.to_string())
    }

    /// HTTP status of a failed request, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Request { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Turn any error into a user-facing message.
///
/// Logs the error, then returns its message, or `fallback` when the message
/// is blank.
pub fn handle_api_error<E: fmt::Display + ?Sized>(error: &E, fallback: &str) -> String {
    error!("API Error: {}", error);
    let message = error.to_string();
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_error_prefers_server_message() {
        let err = Error::request(401, Some("Invalid email or password".to_string()));
        assert_eq!(err.to_string(), "Invalid email or password");
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn request_error_falls_back_to_status() {
        let err = Error::request(503, None);
        assert_eq!(err.to_string(), "HTTP error! status: 503");
    }

    #[test]
    fn handle_api_error_uses_message() {
        let err = Error::invalid_response("Invalid response from server");
        assert_eq!(
            handle_api_error(&err, "Login failed"),
            "Invalid response from server"
        );
    }

    #[test]
    fn handle_api_error_passes_strings_through() {
        assert_eq!(handle_api_error("plain text", "fallback"), "plain text");
    }

    #[test]
    fn handle_api_error_falls_back_on_blank_message() {
        assert_eq!(handle_api_error(&Error::general(""), "Login failed"), "Login failed");
        assert_eq!(handle_api_error("   ", "Registration failed"), "Registration failed");
    }
}
