//! Multi-model retry and fallback orchestration.
//!
//! One call walks the chain `[primary] + fallbacks` strictly in order. Each
//! model gets its own attempt budget from [`RetryOptions`]; every attempt
//! passes the shared [`RateLimitGate`] first. The first success ends the
//! chain. An exhausted chain fails with [`LlmError::FallbackExhausted`],
//! anchored on the primary model and carrying the last recorded error.
//!
//! Validation rejections and cancellation are terminal. For streamed calls,
//! neither retry nor fallback happens once a delta reached the caller.

use std::borrow::Cow;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use tracing::Instrument;
use uuid::Uuid;

use crate::core::{build_transport_request, spec_for};
use crate::error::LlmError;
use crate::execution::http::transport::{HttpTransport, HttpTransportRequest, ReqwestTransport};
use crate::execution::rate_limit::{NoopGate, RateLimitGate};
use crate::models::resolve;
use crate::observability::ProviderTracer;
use crate::retry::{RetryExecutor, RetryOptions, classify_http_error};
use crate::streaming::{StreamAccumulator, StreamDelta, sse_events};
use crate::traits::check_request;
use crate::types::{Backend, ChatRequest, ChatResponse, HttpConfig, Model, ProviderConfig};
use crate::utils::cancel::{CancelHandle, cancelled_error, run_cancellable};
use crate::validation::ResponseValidator;

/// A successful call and where it was served.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub response: ChatResponse,
    /// The chain entry that answered.
    pub model: Model,
    /// Backend-specific id the model resolved to.
    pub resolved_model: String,
    pub backend: Backend,
    /// Attempts beyond the first, summed over every model tried.
    pub retries: u32,
    pub latency: Duration,
}

/// What one attempt is about to send.
struct Attempt {
    backend: Backend,
    number: u32,
    tracer: ProviderTracer,
    request: HttpTransportRequest,
}

/// Drives resolution, translation and transport across a fallback chain.
///
/// Cheap to share: clone it or wrap it in an `Arc` and call it from many
/// tasks. The rate-limit gate is the only mutable state and is shared by
/// every clone.
#[derive(Clone)]
pub struct Orchestrator {
    default_backend: Backend,
    configs: HashMap<Backend, ProviderConfig>,
    routes: HashMap<Model, Backend>,
    env_fallback: bool,
    transport: Arc<dyn HttpTransport>,
    gate: Arc<dyn RateLimitGate>,
    validators: Vec<Arc<dyn ResponseValidator>>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("default_backend", &self.default_backend)
            .field("backends", &self.configs.keys().collect::<Vec<_>>())
            .field("routes", &self.routes)
            .field("validators", &self.validators.len())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// Backend serving `model`: its route if one is registered, else the default.
    pub fn backend_for(&self, model: &Model) -> Backend {
        self.routes
            .get(model)
            .copied()
            .unwrap_or(self.default_backend)
    }

    fn config_for(&self, backend: Backend) -> Cow<'_, ProviderConfig> {
        match self.configs.get(&backend) {
            Some(config) => Cow::Borrowed(config),
            None if self.env_fallback => Cow::Owned(ProviderConfig::from_env(backend)),
            None => Cow::Owned(ProviderConfig::new(backend)),
        }
    }

    /// Single model, no retries, no cancellation.
    pub async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        self.execute(request, &request.model, &[], &RetryOptions::None, None)
            .await
            .map(|result| result.response)
    }

    /// Run `request` against `primary`, then each fallback in order.
    pub async fn execute(
        &self,
        request: &ChatRequest,
        primary: &Model,
        fallbacks: &[Model],
        retry: &RetryOptions,
        cancel: Option<&CancelHandle>,
    ) -> Result<ExecutionResult, LlmError> {
        let span = tracing::info_span!(
            "unillm.execute",
            call_id = %Uuid::new_v4(),
            primary = %primary,
            fallbacks = fallbacks.len(),
            streaming = false,
        );
        self.run_chain(
            request,
            primary,
            fallbacks,
            retry,
            cancel,
            false,
            || false,
            |attempt| self.unary_attempt(request, attempt, cancel),
        )
        .instrument(span)
        .await
    }

    /// Streamed variant of [`execute`](Self::execute).
    ///
    /// `on_delta` runs synchronously for every delta, in arrival order. The
    /// returned response is the accumulation of everything delivered.
    pub async fn execute_stream<F>(
        &self,
        request: &ChatRequest,
        primary: &Model,
        fallbacks: &[Model],
        retry: &RetryOptions,
        cancel: Option<&CancelHandle>,
        on_delta: F,
    ) -> Result<ExecutionResult, LlmError>
    where
        F: FnMut(&StreamDelta) + Send,
    {
        let span = tracing::info_span!(
            "unillm.execute",
            call_id = %Uuid::new_v4(),
            primary = %primary,
            fallbacks = fallbacks.len(),
            streaming = true,
        );
        let sink = Mutex::new(on_delta);
        let delivered = AtomicBool::new(false);
        let (sink, delivered) = (&sink, &delivered);
        self.run_chain(
            request,
            primary,
            fallbacks,
            retry,
            cancel,
            true,
            || delivered.load(Ordering::Acquire),
            |attempt| self.stream_attempt(request, attempt, cancel, sink, delivered),
        )
        .instrument(span)
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_chain<A, Fut, L>(
        &self,
        request: &ChatRequest,
        primary: &Model,
        fallbacks: &[Model],
        retry: &RetryOptions,
        cancel: Option<&CancelHandle>,
        streaming: bool,
        locked_in: L,
        mut attempt: A,
    ) -> Result<ExecutionResult, LlmError>
    where
        A: FnMut(Attempt) -> Fut,
        Fut: Future<Output = Result<ChatResponse, LlmError>>,
        L: Fn() -> bool,
    {
        let started = Instant::now();
        let mut retries = 0;
        let mut attempts = 0;
        let mut last_error = None;

        for model in std::iter::once(primary).chain(fallbacks) {
            if cancel.is_some_and(CancelHandle::is_cancelled) {
                return Err(cancelled_error());
            }
            let backend = self.backend_for(model);
            let model_id = resolve(backend, model);
            check_request(backend, &model_id, request, streaming);

            let config = self.config_for(backend);
            let http = match build_transport_request(&config, &model_id, request, streaming) {
                Ok(http) => http,
                Err(e) => {
                    tracing::warn!(model = %model, backend = %backend, error = %e, "skipping model");
                    last_error = Some(e.tagged(backend));
                    continue;
                }
            };
            let tracer = ProviderTracer::new(backend, model_id.as_str());

            let outcome = RetryExecutor::new(retry)
                .with_cancel(cancel)
                .execute_with_handler(
                    |number| {
                        attempt(Attempt {
                            backend,
                            number,
                            tracer: tracer.clone(),
                            request: http.clone(),
                        })
                    },
                    |_, _| !locked_in(),
                )
                .await;
            attempts += outcome.attempts;
            retries += outcome.retries();

            match outcome.result {
                Ok(response) => {
                    for validator in &self.validators {
                        validator
                            .validate(&response)
                            .map_err(|e| e.tagged(backend))?;
                    }
                    let latency = started.elapsed();
                    tracing::info!(
                        model = %model,
                        backend = %backend,
                        retries,
                        latency_ms = latency.as_millis() as u64,
                        "call succeeded"
                    );
                    return Ok(ExecutionResult {
                        response,
                        model: model.clone(),
                        resolved_model: model_id,
                        backend,
                        retries,
                        latency,
                    });
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    let e = e.tagged(backend);
                    if locked_in() {
                        // part of the answer already reached the caller
                        return Err(e);
                    }
                    tracing::warn!(
                        model = %model,
                        backend = %backend,
                        attempts = outcome.attempts,
                        error = %e,
                        "model exhausted, falling back"
                    );
                    last_error = Some(e);
                }
            }
        }

        let source = last_error
            .unwrap_or_else(|| LlmError::InternalError("empty fallback chain".to_string()));
        tracing::error!(primary = %primary, attempts, error = %source, "all models failed");
        Err(LlmError::FallbackExhausted {
            model: primary.clone(),
            attempts,
            source: Box::new(source),
        })
    }

    async fn acquire_gate(&self, cancel: Option<&CancelHandle>) -> Result<(), LlmError> {
        run_cancellable(cancel, async {
            self.gate.acquire().await;
            Ok(())
        })
        .await
    }

    async fn unary_attempt(
        &self,
        request: &ChatRequest,
        attempt: Attempt,
        cancel: Option<&CancelHandle>,
    ) -> Result<ChatResponse, LlmError> {
        self.acquire_gate(cancel).await?;
        let Attempt {
            backend,
            number,
            tracer,
            request: http,
        } = attempt;
        tracer.trace_request_start(number, &http.url);
        tracer.trace_request_details(&http.headers, &http.body);
        let started = Instant::now();

        let result = async {
            let response = run_cancellable(cancel, self.transport.execute_json(http)).await?;
            if !response.is_success() {
                return Err(classify_http_error(
                    backend,
                    response.status,
                    &response.text(),
                    &response.headers,
                ));
            }
            tracer.trace_response_success(response.status, started, response.body.len());
            spec_for(backend).transform_response(request, &response.body)
        }
        .await;
        if let Err(e) = &result
            && !e.is_cancelled()
        {
            tracer.trace_request_error(e, started);
        }
        result
    }

    async fn stream_attempt<F>(
        &self,
        request: &ChatRequest,
        attempt: Attempt,
        cancel: Option<&CancelHandle>,
        sink: &Mutex<F>,
        delivered: &AtomicBool,
    ) -> Result<ChatResponse, LlmError>
    where
        F: FnMut(&StreamDelta),
    {
        self.acquire_gate(cancel).await?;
        let Attempt {
            backend,
            number,
            tracer,
            request: http,
        } = attempt;
        tracer.trace_request_start(number, &http.url);
        tracer.trace_request_details(&http.headers, &http.body);
        let started = Instant::now();

        let response = run_cancellable(cancel, self.transport.execute_stream(http)).await?;
        if !(200..300).contains(&response.status) {
            let status = response.status;
            let headers = response.headers.clone();
            let body = run_cancellable(cancel, response.collect_text()).await?;
            let error = classify_http_error(backend, status, &body, &headers);
            tracer.trace_request_error(&error, started);
            return Err(error);
        }

        let mut decoder = spec_for(backend).stream_decoder(request);
        let mut events = sse_events(response.body);
        let mut accumulator = StreamAccumulator::new();
        let mut chunks = 0usize;
        // Connection close without an end marker also ends the stream.
        while let Some(event) = run_cancellable(cancel, async { Ok(events.next().await) }).await? {
            let decoded = decoder.decode(&event?)?;
            for delta in &decoded.deltas {
                accumulator.push(delta);
                delivered.store(true, Ordering::Release);
                let mut guard = sink.lock().unwrap_or_else(PoisonError::into_inner);
                let on_delta = &mut *guard;
                on_delta(delta);
            }
            chunks += 1;
            if decoded.done {
                break;
            }
        }
        tracer.trace_response_success(response.status, started, chunks);
        Ok(accumulator.finish())
    }
}

/// Builder for [`Orchestrator`].
#[derive(Default)]
pub struct OrchestratorBuilder {
    default_backend: Option<Backend>,
    configs: HashMap<Backend, ProviderConfig>,
    routes: HashMap<Model, Backend>,
    without_env: bool,
    transport: Option<Arc<dyn HttpTransport>>,
    gate: Option<Arc<dyn RateLimitGate>>,
    validators: Vec<Arc<dyn ResponseValidator>>,
    http_config: Option<HttpConfig>,
}

impl OrchestratorBuilder {
    /// Backend for models without an explicit route. Defaults to OpenRouter.
    pub fn default_backend(mut self, backend: Backend) -> Self {
        self.default_backend = Some(backend);
        self
    }

    /// Connection settings for one backend, replacing any earlier ones.
    pub fn provider(mut self, config: ProviderConfig) -> Self {
        self.configs.insert(config.backend, config);
        self
    }

    /// Serve `model` from `backend` instead of the default backend.
    pub fn route(mut self, model: impl Into<Model>, backend: Backend) -> Self {
        self.routes.insert(model.into(), backend);
        self
    }

    /// Do not read credentials from the environment for backends without an
    /// explicit [`provider`](Self::provider) entry.
    pub fn without_env(mut self) -> Self {
        self.without_env = true;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn rate_limit_gate(mut self, gate: Arc<dyn RateLimitGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn validator(mut self, validator: impl ResponseValidator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// HTTP settings for the default transport. Ignored when a transport is
    /// supplied.
    pub fn http_config(mut self, config: HttpConfig) -> Self {
        self.http_config = Some(config);
        self
    }

    pub fn build(self) -> Result<Orchestrator, LlmError> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(
                &self.http_config.unwrap_or_default(),
            )?),
        };
        Ok(Orchestrator {
            default_backend: self.default_backend.unwrap_or(Backend::OpenRouter),
            configs: self.configs,
            routes: self.routes,
            env_fallback: !self.without_env,
            transport,
            gate: self.gate.unwrap_or_else(|| Arc::new(NoopGate)),
            validators: self.validators,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::http::transport::{HttpStreamResponse, HttpTransportResponse};
    use crate::types::ChatMessage;
    use async_trait::async_trait;
    use reqwest::header::HeaderMap;
    use std::sync::atomic::AtomicU32;

    /// Answers every call with the same status and body, counting calls.
    struct Scripted {
        status: u16,
        body: &'static str,
        calls: AtomicU32,
        urls: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(status: u16, body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                status,
                body,
                calls: AtomicU32::new(0),
                urls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl HttpTransport for Scripted {
        async fn execute_json(
            &self,
            request: HttpTransportRequest,
        ) -> Result<HttpTransportResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().unwrap().push(request.url);
            Ok(HttpTransportResponse {
                status: self.status,
                headers: HeaderMap::new(),
                body: self.body.as_bytes().to_vec(),
            })
        }

        async fn execute_stream(
            &self,
            _request: HttpTransportRequest,
        ) -> Result<HttpStreamResponse, LlmError> {
            Err(LlmError::UnsupportedOperation("unary only".into()))
        }
    }

    fn orchestrator(transport: Arc<Scripted>) -> Orchestrator {
        Orchestrator::builder()
            .default_backend(Backend::OpenAi)
            .provider(ProviderConfig::new(Backend::OpenAi).with_api_key("sk-test"))
            .provider(ProviderConfig::new(Backend::Anthropic).with_api_key("ak-test"))
            .route("claude-sonnet-4.5", Backend::Anthropic)
            .without_env()
            .transport(transport)
            .build()
            .unwrap()
    }

    fn request() -> ChatRequest {
        ChatRequest::new("gpt-5", vec![ChatMessage::user("hi")])
    }

    #[tokio::test]
    async fn routes_pick_the_backend_and_resolve_the_model() {
        let transport = Scripted::new(200, r#"{"content":[{"type":"text","text":"ok"}]}"#);
        let orchestrator = orchestrator(transport.clone());
        let result = orchestrator
            .execute(
                &request(),
                &Model::new("claude-sonnet-4.5"),
                &[],
                &RetryOptions::None,
                None,
            )
            .await
            .unwrap();
        assert_eq!(result.backend, Backend::Anthropic);
        assert_eq!(result.response.content, "ok");
        assert_ne!(result.resolved_model, "claude-sonnet-4.5");
        assert!(transport.urls.lock().unwrap()[0].ends_with("/messages"));
    }

    #[tokio::test]
    async fn backend_errors_advance_without_local_retry() {
        let transport = Scripted::new(400, r#"{"error":{"message":"bad","code":"invalid_value"}}"#);
        let orchestrator = orchestrator(transport.clone());
        let err = orchestrator
            .execute(
                &request(),
                &Model::new("gpt-5"),
                &[Model::new("gpt-4o")],
                &RetryOptions::fixed(3),
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
        assert_eq!(err.requested_model().map(Model::as_str), Some("gpt-5"));
        assert_eq!(err.error_code(), Some("invalid_value"));
    }

    #[tokio::test]
    async fn validation_rejection_is_terminal() {
        let transport = Scripted::new(200, r#"{"choices":[{"message":{"content":""}}]}"#);
        let orchestrator = Orchestrator::builder()
            .default_backend(Backend::Ollama)
            .without_env()
            .transport(transport.clone())
            .validator(crate::validation::NonEmptyResponse)
            .build()
            .unwrap();
        let err = orchestrator
            .execute(
                &request(),
                &Model::new("llama3.2"),
                &[Model::new("qwen3")],
                &RetryOptions::fixed(2),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err.root(), LlmError::ValidationError(_)));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_credentials_never_reach_the_transport() {
        let transport = Scripted::new(200, "{}");
        let orchestrator = Orchestrator::builder()
            .default_backend(Backend::Google)
            .without_env()
            .transport(transport.clone())
            .build()
            .unwrap();
        let err = orchestrator.send(&request()).await.unwrap_err();
        assert!(matches!(err.root(), LlmError::ConfigurationError(_)));
        assert_eq!(err.backend(), Some(Backend::Google));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }
}
