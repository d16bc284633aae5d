//! Shared scripted transport for integration tests.
#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use unillm::execution::{HttpStreamResponse, HttpTransport, HttpTransportRequest, HttpTransportResponse};
use unillm::prelude::*;

/// What the transport does for one call.
pub enum Reply {
    Json(u16, String),
    /// Status plus SSE chunks, delivered in order.
    Stream(u16, Vec<Result<String, LlmError>>),
    Fail(LlmError),
    /// Never completes.
    Hang,
}

type Script = Box<dyn Fn(u32, &HttpTransportRequest) -> Reply + Send + Sync>;

/// Transport driven by a closure of (1-based call number, request).
pub struct ScriptedTransport {
    script: Script,
    calls: AtomicU32,
    models: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(script: impl Fn(u32, &HttpTransportRequest) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            calls: AtomicU32::new(0),
            models: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// The `model` field of every request sent, in order.
    pub fn models(&self) -> Vec<String> {
        self.models.lock().unwrap().clone()
    }

    fn next(&self, request: &HttpTransportRequest) -> Reply {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let model = request.body["model"].as_str().unwrap_or_default().to_string();
        self.models.lock().unwrap().push(model);
        (self.script)(n, request)
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute_json(
        &self,
        request: HttpTransportRequest,
    ) -> Result<HttpTransportResponse, LlmError> {
        match self.next(&request) {
            Reply::Json(status, body) => Ok(HttpTransportResponse {
                status,
                headers: HeaderMap::new(),
                body: body.into_bytes(),
            }),
            Reply::Stream(..) => panic!("stream reply for a unary call"),
            Reply::Fail(e) => Err(e),
            Reply::Hang => futures::future::pending().await,
        }
    }

    async fn execute_stream(
        &self,
        request: HttpTransportRequest,
    ) -> Result<HttpStreamResponse, LlmError> {
        match self.next(&request) {
            Reply::Stream(status, chunks) => Ok(HttpStreamResponse {
                status,
                headers: HeaderMap::new(),
                body: Box::pin(futures::stream::iter(
                    chunks.into_iter().map(|c| c.map(Bytes::from)),
                )),
            }),
            Reply::Json(status, body) => Ok(HttpStreamResponse {
                status,
                headers: HeaderMap::new(),
                body: Box::pin(futures::stream::iter(vec![Ok(Bytes::from(body))])),
            }),
            Reply::Fail(e) => Err(e),
            Reply::Hang => futures::future::pending().await,
        }
    }
}

pub fn server_error() -> Reply {
    Reply::Json(503, r#"{"error":{"message":"overloaded","type":"server_error"}}"#.to_string())
}

pub fn chat_completion(text: &str) -> Reply {
    Reply::Json(
        200,
        serde_json::json!({
            "id": "chatcmpl-1",
            "model": "served",
            "choices": [{"message": {"role": "assistant", "content": text}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5}
        })
        .to_string(),
    )
}

/// An orchestrator over OpenAI-compatible backends with test credentials.
pub fn orchestrator(transport: std::sync::Arc<ScriptedTransport>) -> Orchestrator {
    Orchestrator::builder()
        .default_backend(Backend::OpenAi)
        .provider(ProviderConfig::new(Backend::OpenAi).with_api_key("sk-test"))
        .provider(ProviderConfig::new(Backend::OpenRouter).with_api_key("or-test"))
        .without_env()
        .transport(transport)
        .build()
        .unwrap()
}

pub fn request(text: &str) -> ChatRequest {
    ChatRequest::new("gpt-5", vec![ChatMessage::user(text)])
}
