use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Categories of network failures that end a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamErrorKind {
    /// The request could not be sent (DNS, refused connection, TLS)
    Connect,
    /// Connection timeout or request timeout
    Timeout,
    /// HTTP status error (4xx, 5xx)
    HttpStatus,
    /// Reading the response body failed mid-stream
    Body,
}

impl fmt::Display for StreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamErrorKind::Connect => write!(f, "connect"),
            StreamErrorKind::Timeout => write!(f, "timeout"),
            StreamErrorKind::HttpStatus => write!(f, "http_status"),
            StreamErrorKind::Body => write!(f, "body"),
        }
    }
}

/// Terminal failure of an in-flight stream.
///
/// Decode and protocol-sequence problems never surface here; they are
/// recovered inside the decoder and reducer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamError {
    /// Error category
    pub kind: StreamErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g., raw error body)
    pub details: Option<String>,
}

impl StreamError {
    pub fn new(kind: StreamErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Creates an HTTP status error, preferring `error.message` from a JSON body.
    pub fn http_status(status: u16, body: &str) -> Self {
        if body.is_empty() {
            return Self::new(StreamErrorKind::HttpStatus, format!("HTTP {status}"));
        }

        if let Ok(json) = serde_json::from_str::<Value>(body)
            && let Some(error_obj) = json.get("error")
            && let Some(msg) = error_obj.get("message").and_then(Value::as_str)
        {
            return Self {
                kind: StreamErrorKind::HttpStatus,
                message: format!("HTTP {status}: {msg}"),
                details: Some(body.to_string()),
            };
        }

        Self {
            kind: StreamErrorKind::HttpStatus,
            message: format!("HTTP {status}"),
            details: Some(body.to_string()),
        }
    }

    /// Creates a body read error from any underlying stream error.
    pub fn body(err: &(dyn std::error::Error + 'static)) -> Self {
        Self::new(StreamErrorKind::Body, format!("Stream read failed: {err}"))
    }
}

impl From<&reqwest::Error> for StreamError {
    fn from(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            StreamErrorKind::Timeout
        } else if err.is_body() || err.is_decode() {
            StreamErrorKind::Body
        } else {
            StreamErrorKind::Connect
        };
        Self::new(kind, format!("Request failed: {err}"))
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StreamError {}

/// Result type for stream operations.
pub type StreamResult<T> = std::result::Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_extracts_json_message() {
        let err = StreamError::http_status(429, r#"{"error":{"message":"slow down"}}"#);
        assert_eq!(err.kind, StreamErrorKind::HttpStatus);
        assert_eq!(err.message, "HTTP 429: slow down");
        assert!(err.details.is_some());
    }

    #[test]
    fn test_http_status_plain_body() {
        let err = StreamError::http_status(502, "bad gateway");
        assert_eq!(err.to_string(), "HTTP 502");
        assert_eq!(err.details.as_deref(), Some("bad gateway"));

        let err = StreamError::http_status(500, "");
        assert_eq!(err.details, None);
    }
}
