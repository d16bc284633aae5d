//! Provider Specification
//!
//! A [`ProviderSpec`] concentrates everything backend-specific about a chat
//! call: authentication headers, the endpoint URL, and which wire standard
//! translates the request, the response and the stream events. The
//! orchestrator stays backend-agnostic and only talks to this trait.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::collections::HashMap;

use crate::defaults;
use crate::error::LlmError;
use crate::execution::http::client::header_map;
use crate::execution::http::transport::HttpTransportRequest;
use crate::standards::{anthropic, gemini, openai};
use crate::streaming::StreamDecoder;
use crate::types::{Backend, ChatRequest, ChatResponse, ProviderConfig};

/// Resolved connection context for one call (credentials already checked).
#[derive(Clone)]
pub struct ProviderContext {
    pub backend: Backend,
    pub base_url: String,
    pub api_key: Option<String>,
    pub api_version: Option<String>,
    pub organization: Option<String>,
    pub headers: HashMap<String, String>,
}

impl std::fmt::Debug for ProviderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderContext")
            .field("backend", &self.backend)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_version", &self.api_version)
            .field("organization", &self.organization)
            .finish_non_exhaustive()
    }
}

impl ProviderContext {
    /// Build a context from configuration, failing fast on missing
    /// credentials or an unconfigured endpoint.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, LlmError> {
        let api_key = config.require_api_key()?.map(str::to_string);
        let base_url = config.base_url().to_string();
        if base_url.is_empty() {
            return Err(LlmError::ConfigurationError(format!(
                "no base URL configured for {}",
                config.backend
            )));
        }
        Ok(Self {
            backend: config.backend,
            base_url,
            api_key,
            api_version: config.api_version.clone(),
            organization: config.organization.clone(),
            headers: config.headers.clone(),
        })
    }
}

/// Backend-specific routing and translation.
pub trait ProviderSpec: Send + Sync {
    fn backend(&self) -> Backend;

    /// Authentication and custom headers.
    fn build_headers(&self, ctx: &ProviderContext) -> Result<HeaderMap, LlmError>;

    /// Endpoint for a chat call against the resolved `model_id`.
    fn chat_url(
        &self,
        model_id: &str,
        stream: bool,
        req: &ChatRequest,
        ctx: &ProviderContext,
    ) -> Result<String, LlmError>;

    /// Translate the abstract request into the backend's JSON body.
    fn transform_request(
        &self,
        model_id: &str,
        req: &ChatRequest,
        stream: bool,
    ) -> Result<Value, LlmError>;

    /// Decode a 2xx response body.
    fn transform_response(&self, req: &ChatRequest, body: &[u8]) -> Result<ChatResponse, LlmError>;

    /// A fresh decoder for one streamed call.
    fn stream_decoder(&self, req: &ChatRequest) -> Box<dyn StreamDecoder>;
}

/// OpenAI, Azure OpenAI, OpenRouter and Ollama: Chat Completions, plus the
/// Responses API on OpenAI and Azure.
#[derive(Debug, Clone, Copy)]
pub struct OpenAiSpec {
    backend: Backend,
}

impl OpenAiSpec {
    fn uses_responses(&self, req: &ChatRequest) -> bool {
        matches!(self.backend, Backend::OpenAi | Backend::Azure) && req.needs_responses_api()
    }
}

impl ProviderSpec for OpenAiSpec {
    fn backend(&self) -> Backend {
        self.backend
    }

    fn build_headers(&self, ctx: &ProviderContext) -> Result<HeaderMap, LlmError> {
        let mut headers = json_headers();
        if let Some(key) = &ctx.api_key {
            if self.backend == Backend::Azure {
                insert(&mut headers, "api-key", key)?;
            } else {
                headers.insert(AUTHORIZATION, header_value(&format!("Bearer {key}"))?);
            }
        }
        if let Some(org) = &ctx.organization {
            insert(&mut headers, "OpenAI-Organization", org)?;
        }
        extend(&mut headers, ctx)?;
        Ok(headers)
    }

    fn chat_url(
        &self,
        model_id: &str,
        _stream: bool,
        req: &ChatRequest,
        ctx: &ProviderContext,
    ) -> Result<String, LlmError> {
        let base = &ctx.base_url;
        let responses = self.uses_responses(req);
        if self.backend != Backend::Azure {
            let path = if responses { "responses" } else { "chat/completions" };
            return Ok(format!("{base}/{path}"));
        }
        let version = ctx
            .api_version
            .as_deref()
            .unwrap_or(defaults::azure::API_VERSION);
        Ok(if responses {
            format!("{base}/openai/responses?api-version={version}")
        } else {
            format!(
                "{base}/openai/deployments/{}/chat/completions?api-version={version}",
                urlencoding::encode(model_id)
            )
        })
    }

    fn transform_request(
        &self,
        model_id: &str,
        req: &ChatRequest,
        stream: bool,
    ) -> Result<Value, LlmError> {
        if self.uses_responses(req) {
            openai::responses::build_responses_request(model_id, req, stream)
        } else {
            openai::chat::build_chat_request(self.backend, model_id, req, stream)
        }
    }

    fn transform_response(&self, req: &ChatRequest, body: &[u8]) -> Result<ChatResponse, LlmError> {
        if self.uses_responses(req) {
            openai::responses::parse_responses_response(self.backend, body)
        } else {
            openai::chat::parse_chat_response(self.backend, body)
        }
    }

    fn stream_decoder(&self, req: &ChatRequest) -> Box<dyn StreamDecoder> {
        if self.uses_responses(req) {
            Box::new(openai::responses::ResponsesStreamDecoder::new(self.backend))
        } else {
            Box::new(openai::chat::ChatStreamDecoder::new(self.backend))
        }
    }
}

/// Anthropic Messages API.
#[derive(Debug, Clone, Copy)]
pub struct AnthropicSpec;

impl ProviderSpec for AnthropicSpec {
    fn backend(&self) -> Backend {
        Backend::Anthropic
    }

    fn build_headers(&self, ctx: &ProviderContext) -> Result<HeaderMap, LlmError> {
        let mut headers = json_headers();
        if let Some(key) = &ctx.api_key {
            insert(&mut headers, "x-api-key", key)?;
        }
        insert(&mut headers, "anthropic-version", defaults::anthropic::VERSION)?;
        extend(&mut headers, ctx)?;
        Ok(headers)
    }

    fn chat_url(
        &self,
        _model_id: &str,
        _stream: bool,
        _req: &ChatRequest,
        ctx: &ProviderContext,
    ) -> Result<String, LlmError> {
        Ok(format!("{}/messages", ctx.base_url))
    }

    fn transform_request(
        &self,
        model_id: &str,
        req: &ChatRequest,
        stream: bool,
    ) -> Result<Value, LlmError> {
        anthropic::build_messages_request(model_id, req, stream)
    }

    fn transform_response(&self, _req: &ChatRequest, body: &[u8]) -> Result<ChatResponse, LlmError> {
        anthropic::parse_messages_response(Backend::Anthropic, body)
    }

    fn stream_decoder(&self, _req: &ChatRequest) -> Box<dyn StreamDecoder> {
        Box::new(anthropic::MessagesStreamDecoder::new(Backend::Anthropic))
    }
}

/// Google Gemini `generateContent`.
#[derive(Debug, Clone, Copy)]
pub struct GeminiSpec;

impl ProviderSpec for GeminiSpec {
    fn backend(&self) -> Backend {
        Backend::Google
    }

    fn build_headers(&self, ctx: &ProviderContext) -> Result<HeaderMap, LlmError> {
        let mut headers = json_headers();
        if let Some(key) = &ctx.api_key {
            insert(&mut headers, "x-goog-api-key", key)?;
        }
        extend(&mut headers, ctx)?;
        Ok(headers)
    }

    fn chat_url(
        &self,
        model_id: &str,
        stream: bool,
        _req: &ChatRequest,
        ctx: &ProviderContext,
    ) -> Result<String, LlmError> {
        let model = urlencoding::encode(model_id);
        Ok(if stream {
            format!("{}/models/{model}:streamGenerateContent?alt=sse", ctx.base_url)
        } else {
            format!("{}/models/{model}:generateContent", ctx.base_url)
        })
    }

    fn transform_request(
        &self,
        _model_id: &str,
        req: &ChatRequest,
        _stream: bool,
    ) -> Result<Value, LlmError> {
        gemini::build_generate_request(req)
    }

    fn transform_response(&self, _req: &ChatRequest, body: &[u8]) -> Result<ChatResponse, LlmError> {
        gemini::parse_generate_response(Backend::Google, body)
    }

    fn stream_decoder(&self, _req: &ChatRequest) -> Box<dyn StreamDecoder> {
        Box::new(gemini::GenerateStreamDecoder::new(Backend::Google))
    }
}

static OPENAI: OpenAiSpec = OpenAiSpec {
    backend: Backend::OpenAi,
};
static AZURE: OpenAiSpec = OpenAiSpec {
    backend: Backend::Azure,
};
static OPENROUTER: OpenAiSpec = OpenAiSpec {
    backend: Backend::OpenRouter,
};
static OLLAMA: OpenAiSpec = OpenAiSpec {
    backend: Backend::Ollama,
};

/// The spec serving `backend`.
pub fn spec_for(backend: Backend) -> &'static dyn ProviderSpec {
    match backend {
        Backend::OpenAi => &OPENAI,
        Backend::Azure => &AZURE,
        Backend::OpenRouter => &OPENROUTER,
        Backend::Ollama => &OLLAMA,
        Backend::Anthropic => &AnthropicSpec,
        Backend::Google => &GeminiSpec,
    }
}

/// Assemble the full HTTP request for one attempt. Credentials are checked
/// before anything else so a missing key never reaches the network.
pub fn build_transport_request(
    config: &ProviderConfig,
    model_id: &str,
    req: &ChatRequest,
    stream: bool,
) -> Result<HttpTransportRequest, LlmError> {
    let ctx = ProviderContext::from_config(config)?;
    let spec = spec_for(config.backend);
    Ok(HttpTransportRequest {
        backend: config.backend,
        url: spec.chat_url(model_id, stream, req, &ctx)?,
        headers: spec.build_headers(&ctx)?,
        body: spec.transform_request(model_id, req, stream)?,
    })
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

fn header_value(value: &str) -> Result<HeaderValue, LlmError> {
    HeaderValue::from_str(value)
        .map_err(|e| LlmError::ConfigurationError(format!("invalid header value: {e}")))
}

fn insert(headers: &mut HeaderMap, name: &'static str, value: &str) -> Result<(), LlmError> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| LlmError::ConfigurationError(format!("invalid header name: {e}")))?;
    headers.insert(name, header_value(value)?);
    Ok(())
}

fn extend(headers: &mut HeaderMap, ctx: &ProviderContext) -> Result<(), LlmError> {
    headers.extend(header_map(&ctx.headers)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hosted_tools::openai as tools;
    use crate::types::ChatMessage;

    fn request() -> ChatRequest {
        ChatRequest::new("m", vec![ChatMessage::user("hi")])
    }

    #[test]
    fn missing_key_is_a_configuration_error() {
        let config = ProviderConfig::new(Backend::OpenAi);
        let err = build_transport_request(&config, "gpt-5", &request(), false).unwrap_err();
        assert!(matches!(err, LlmError::ConfigurationError(_)));
    }

    #[test]
    fn ollama_needs_no_key() {
        let config = ProviderConfig::new(Backend::Ollama);
        let http = build_transport_request(&config, "llama3.2", &request(), false).unwrap();
        assert_eq!(http.url, "http://localhost:11434/v1/chat/completions");
        assert!(http.headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn openai_switches_to_responses_for_hosted_tools() {
        let config = ProviderConfig::new(Backend::OpenAi)
            .with_api_key("sk-test")
            .with_header("X-Trace", "1");
        let req = request().with_builtin_tool(tools::web_search().build());
        let http = build_transport_request(&config, "gpt-5", &req, false).unwrap();
        assert_eq!(http.url, "https://api.openai.com/v1/responses");
        assert_eq!(http.headers[AUTHORIZATION], "Bearer sk-test");
        assert_eq!(http.headers["x-trace"], "1");
        assert_eq!(http.body["input"], "hi");
    }

    #[test]
    fn openrouter_keeps_chat_completions_with_hosted_tools() {
        let config = ProviderConfig::new(Backend::OpenRouter).with_api_key("or-key");
        let req = request().with_builtin_tool(tools::web_search().build());
        let http = build_transport_request(&config, "openai/gpt-5", &req, false).unwrap();
        assert_eq!(http.url, "https://openrouter.ai/api/v1/chat/completions");
        assert_eq!(http.body["tools"][0]["type"], "web_search");
    }

    #[test]
    fn azure_routes_by_deployment() {
        let config = ProviderConfig::new(Backend::Azure)
            .with_api_key("az-key")
            .with_base_url("https://res.openai.azure.com/")
            .with_api_version("2024-10-21");
        let http = build_transport_request(&config, "gpt-4o", &request(), false).unwrap();
        assert_eq!(
            http.url,
            "https://res.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-10-21"
        );
        assert_eq!(http.headers["api-key"], "az-key");
        assert!(http.headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn azure_without_endpoint_fails() {
        let config = ProviderConfig::new(Backend::Azure).with_api_key("az-key");
        let err = build_transport_request(&config, "gpt-4o", &request(), false).unwrap_err();
        assert!(matches!(err, LlmError::ConfigurationError(_)));
    }

    #[test]
    fn anthropic_and_gemini_headers_and_urls() {
        let anthropic = ProviderConfig::new(Backend::Anthropic).with_api_key("ak");
        let http = build_transport_request(&anthropic, "claude-x", &request(), true).unwrap();
        assert_eq!(http.url, "https://api.anthropic.com/v1/messages");
        assert_eq!(http.headers["x-api-key"], "ak");
        assert_eq!(http.headers["anthropic-version"], defaults::anthropic::VERSION);

        let google = ProviderConfig::new(Backend::Google).with_api_key("gk");
        let http = build_transport_request(&google, "gemini-2.5-pro", &request(), true).unwrap();
        assert_eq!(
            http.url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-pro:streamGenerateContent?alt=sse"
        );
        assert_eq!(http.headers["x-goog-api-key"], "gk");
    }

    #[test]
    fn context_debug_redacts_key() {
        let config = ProviderConfig::new(Backend::OpenAi).with_api_key("sk-secret");
        let ctx = ProviderContext::from_config(&config).unwrap();
        assert!(!format!("{ctx:?}").contains("sk-secret"));
    }
}
