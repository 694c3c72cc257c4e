//! HTTP client that opens the long-lived event-stream response.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Serialize;
use tracing::debug;
use url::Url;

use super::error::{StreamError, StreamResult};
use crate::transcript::Message;

/// Standard User-Agent header for glint requests.
pub const USER_AGENT: &str = concat!("glint/", env!("CARGO_PKG_VERSION"));

/// Raw response body as a stream of byte chunks.
pub type ByteStream = BoxStream<'static, Result<Bytes, reqwest::Error>>;

#[derive(Debug, Serialize)]
struct StreamRequest<'a> {
    messages: &'a [Arc<Message>],
}

/// Opens event streams against one endpoint.
#[derive(Debug, Clone)]
pub struct StreamClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl StreamClient {
    /// Creates a client for `endpoint`.
    ///
    /// # Errors
    /// Returns an error if the endpoint is not a valid URL or the HTTP client
    /// cannot be built.
    pub fn new(endpoint: &str, connect_timeout: Option<Duration>) -> Result<Self> {
        let endpoint =
            Url::parse(endpoint).with_context(|| format!("Invalid stream endpoint: {endpoint}"))?;

        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Posts the conversation and returns the response body once headers arrive.
    ///
    /// # Errors
    /// Returns a [`StreamError`] if the request cannot be sent or the server
    /// answers with a non-success status.
    pub async fn open(&self, messages: &[Arc<Message>]) -> StreamResult<ByteStream> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));

        debug!(endpoint = %self.endpoint, messages = messages.len(), "opening stream");
        let response = self
            .http
            .post(self.endpoint.clone())
            .headers(headers)
            .json(&StreamRequest { messages })
            .send()
            .await
            .map_err(|e| StreamError::from(&e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(StreamError::http_status(status.as_u16(), &error_body));
        }

        Ok(response.bytes_stream().boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_endpoint() {
        let err = StreamClient::new("not a url", None).unwrap_err();
        assert!(err.to_string().contains("Invalid stream endpoint"));
    }

    #[test]
    fn test_accepts_http_endpoint() {
        let client = StreamClient::new("http://localhost:8000/chat", None).unwrap();
        assert_eq!(client.endpoint().path(), "/chat");
    }
}
