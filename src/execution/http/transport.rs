//! HTTP transport abstraction.
//!
//! The orchestrator only sees this boundary: a fully translated JSON request
//! goes in, raw status + headers + bytes come out. Tests substitute their own
//! implementation to script failures without a network.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt};
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, HeaderMap, HeaderValue};
use std::pin::Pin;
use std::time::Duration;

use super::client::build_http_client_from_config;
use crate::error::LlmError;
use crate::types::{Backend, HttpConfig};

/// Transport-level request data for JSON POST requests.
#[derive(Debug, Clone)]
pub struct HttpTransportRequest {
    pub backend: Backend,
    pub url: String,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

/// Transport-level response data.
#[derive(Debug, Clone)]
pub struct HttpTransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpTransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Raw body chunks in the order they arrive.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, LlmError>> + Send>>;

/// A streaming answer. For non-2xx statuses `body` yields the error body.
pub struct HttpStreamResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: ByteStream,
}

impl std::fmt::Debug for HttpStreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStreamResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl HttpStreamResponse {
    /// Drain the body into a string (used for error bodies).
    pub async fn collect_text(self) -> Result<String, LlmError> {
        let chunks: Vec<Bytes> = self.body.try_collect().await?;
        Ok(String::from_utf8_lossy(&chunks.concat()).into_owned())
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute_json(
        &self,
        request: HttpTransportRequest,
    ) -> Result<HttpTransportResponse, LlmError>;

    async fn execute_stream(
        &self,
        request: HttpTransportRequest,
    ) -> Result<HttpStreamResponse, LlmError>;
}

/// Default transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Option<Duration>,
    stream_timeout: Option<Duration>,
    stream_identity: bool,
}

impl ReqwestTransport {
    pub fn new(config: &HttpConfig) -> Result<Self, LlmError> {
        Ok(Self {
            client: build_http_client_from_config(config)?,
            timeout: config.timeout,
            stream_timeout: config.stream_timeout,
            stream_identity: config.stream_disable_compression,
        })
    }

    /// Wrap a caller-built client. Its own settings apply unchanged.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: None,
            stream_timeout: None,
            stream_identity: false,
        }
    }

    async fn send(
        &self,
        request: HttpTransportRequest,
        stream: bool,
    ) -> Result<reqwest::Response, LlmError> {
        let mut headers = request.headers;
        let deadline = if stream {
            headers
                .entry(ACCEPT)
                .or_insert(HeaderValue::from_static("text/event-stream"));
            if self.stream_identity {
                headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
            }
            self.stream_timeout
        } else {
            self.timeout
        };

        let mut builder = self.client.post(&request.url).headers(headers).json(&request.body);
        if let Some(deadline) = deadline {
            builder = builder.timeout(deadline);
        }
        Ok(builder.send().await?)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute_json(
        &self,
        request: HttpTransportRequest,
    ) -> Result<HttpTransportResponse, LlmError> {
        let response = self.send(request, false).await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        Ok(HttpTransportResponse {
            status,
            headers,
            body,
        })
    }

    async fn execute_stream(
        &self,
        request: HttpTransportRequest,
    ) -> Result<HttpStreamResponse, LlmError> {
        let response = self.send(request, true).await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes_stream().map(|chunk| chunk.map_err(LlmError::from));
        Ok(HttpStreamResponse {
            status,
            headers,
            body: Box::pin(body),
        })
    }
}
