//! Core error type and classification helpers.

use serde_json::Value;
use thiserror::Error;

use crate::types::{Backend, Model};

/// Maximum number of body bytes rendered in a `ParseError` display string.
const RAW_BODY_DISPLAY_LIMIT: usize = 2048;

/// Coarse error classes used by callers to decide what to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing credentials or malformed local configuration.
    Configuration,
    /// Connection, timeout and retryable HTTP status failures.
    Transport,
    /// A structured error reported by the backend itself.
    Backend,
    /// The backend answered with a body that could not be decoded.
    Decode,
    /// A response validator rejected otherwise successful content.
    Validation,
    /// The caller cancelled the call.
    Cancelled,
    Other,
}

/// Unified error type for every backend and the orchestrator.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("Request cancelled: {0}")]
    Cancelled(String),

    /// Non-2xx HTTP status without a more specific classification.
    #[error("API error {code}: {message}")]
    ApiError {
        code: u16,
        message: String,
        error_code: Option<String>,
        details: Option<Value>,
    },

    #[error("Rate limit exceeded: {message}")]
    RateLimitError {
        message: String,
        error_code: Option<String>,
    },

    #[error("Quota exceeded: {message}")]
    QuotaExceededError {
        message: String,
        error_code: Option<String>,
    },

    #[error("Authentication failed: {message}")]
    AuthenticationError {
        message: String,
        error_code: Option<String>,
    },

    /// Structured error object returned by the backend.
    #[error("{}", format_provider_error(*backend, message, error_code.as_deref()))]
    ProviderError {
        backend: Backend,
        message: String,
        error_code: Option<String>,
    },

    /// The response envelope could not be decoded. `raw_body` keeps the
    /// undecoded payload for diagnosis.
    #[error("Parse error: {message}\nBody: {}", truncate_body(raw_body))]
    ParseError { message: String, raw_body: String },

    #[error("JSON error: {0}")]
    JsonError(String),

    #[error("Response rejected: {0}")]
    ValidationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    /// Attaches the backend identity to an error raised while talking to it.
    #[error("{backend}: {source}")]
    Backend {
        backend: Backend,
        #[source]
        source: Box<LlmError>,
    },

    /// Every model in the fallback chain failed. `model` is the primary
    /// model the caller asked for, `source` the last recorded failure.
    #[error("all models failed for {model} after {attempts} attempt(s): {source}")]
    FallbackExhausted {
        model: Model,
        attempts: u32,
        #[source]
        source: Box<LlmError>,
    },
}

fn format_provider_error(backend: Backend, message: &str, code: Option<&str>) -> String {
    match code {
        Some(code) if !code.is_empty() => format!("{backend}: [{code}] {message}"),
        _ => format!("{backend}: {message}"),
    }
}

fn truncate_body(body: &str) -> &str {
    if body.len() <= RAW_BODY_DISPLAY_LIMIT {
        return body;
    }
    let mut end = RAW_BODY_DISPLAY_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

impl LlmError {
    /// Create a top-level decode error carrying the raw body.
    pub fn parse_error(message: impl Into<String>, raw_body: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
            raw_body: raw_body.into(),
        }
    }

    /// Tag this error with the backend it originated from.
    ///
    /// Errors that already carry a backend, and cancellations, are returned
    /// unchanged.
    pub fn tagged(self, backend: Backend) -> Self {
        match self {
            Self::Backend { .. }
            | Self::ProviderError { .. }
            | Self::FallbackExhausted { .. }
            | Self::Cancelled(_) => self,
            other => Self::Backend {
                backend,
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, with backend and chain wrappers removed.
    pub fn root(&self) -> &LlmError {
        match self {
            Self::Backend { source, .. } | Self::FallbackExhausted { source, .. } => source.root(),
            other => other,
        }
    }

    /// Backend that produced this error, if known.
    pub fn backend(&self) -> Option<Backend> {
        match self {
            Self::Backend { backend, .. } | Self::ProviderError { backend, .. } => Some(*backend),
            Self::FallbackExhausted { source, .. } => source.backend(),
            _ => None,
        }
    }

    /// Backend-supplied error code, if any.
    pub fn error_code(&self) -> Option<&str> {
        match self.root() {
            Self::ProviderError { error_code, .. }
            | Self::ApiError { error_code, .. }
            | Self::RateLimitError { error_code, .. }
            | Self::QuotaExceededError { error_code, .. }
            | Self::AuthenticationError { error_code, .. } => error_code.as_deref(),
            _ => None,
        }
    }

    /// HTTP status associated with the error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self.root() {
            Self::ApiError { code, .. } => Some(*code),
            Self::RateLimitError { .. } | Self::QuotaExceededError { .. } => Some(429),
            Self::AuthenticationError { .. } => Some(401),
            _ => None,
        }
    }

    /// The model originally requested when a fallback chain was exhausted.
    pub fn requested_model(&self) -> Option<&Model> {
        match self {
            Self::FallbackExhausted { model, .. } => Some(model),
            _ => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self.root() {
            Self::ConfigurationError(_) | Self::AuthenticationError { .. } | Self::InvalidInput(_) => {
                ErrorCategory::Configuration
            }
            Self::HttpError(_)
            | Self::ConnectionError(_)
            | Self::TimeoutError(_)
            | Self::RateLimitError { .. } => ErrorCategory::Transport,
            Self::ApiError { code, .. } if is_transient_status(*code) => ErrorCategory::Transport,
            Self::ApiError { .. } | Self::ProviderError { .. } | Self::QuotaExceededError { .. } => {
                ErrorCategory::Backend
            }
            Self::ParseError { .. } | Self::JsonError(_) => ErrorCategory::Decode,
            Self::ValidationError(_) => ErrorCategory::Validation,
            Self::Cancelled(_) => ErrorCategory::Cancelled,
            _ => ErrorCategory::Other,
        }
    }

    /// Whether retrying the same request against the same model may succeed.
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transport
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Self::Cancelled(_))
    }
}

/// HTTP statuses that indicate a transient condition.
pub(crate) fn is_transient_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500..=599)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_display_with_and_without_code() {
        let with_code = LlmError::ProviderError {
            backend: Backend::OpenAi,
            message: "bad request".into(),
            error_code: Some("invalid_value".into()),
        };
        assert_eq!(with_code.to_string(), "openai: [invalid_value] bad request");

        let without_code = LlmError::ProviderError {
            backend: Backend::Anthropic,
            message: "overloaded".into(),
            error_code: None,
        };
        assert_eq!(without_code.to_string(), "anthropic: overloaded");
    }

    #[test]
    fn tagging_is_idempotent() {
        let err = LlmError::TimeoutError("slow".into())
            .tagged(Backend::Google)
            .tagged(Backend::OpenAi);
        assert_eq!(err.backend(), Some(Backend::Google));
        assert!(matches!(err.root(), LlmError::TimeoutError(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn cancellation_is_never_wrapped() {
        let err = LlmError::Cancelled("stop".into()).tagged(Backend::OpenAi);
        assert!(matches!(err, LlmError::Cancelled(_)));
        assert_eq!(err.category(), ErrorCategory::Cancelled);
    }

    #[test]
    fn retryability_by_class() {
        assert!(LlmError::ConnectionError("reset".into()).is_retryable());
        assert!(
            LlmError::ApiError {
                code: 503,
                message: "unavailable".into(),
                error_code: None,
                details: None
            }
            .is_retryable()
        );
        assert!(
            !LlmError::ApiError {
                code: 400,
                message: "bad".into(),
                error_code: None,
                details: None
            }
            .is_retryable()
        );
        assert!(
            !LlmError::ProviderError {
                backend: Backend::OpenAi,
                message: "refused".into(),
                error_code: None
            }
            .is_retryable()
        );
        assert!(!LlmError::parse_error("eof", "{").is_retryable());
        assert!(!LlmError::ConfigurationError("no key".into()).is_retryable());
    }

    #[test]
    fn exhausted_chain_exposes_primary_model_and_inner_detail() {
        let inner = LlmError::ProviderError {
            backend: Backend::OpenRouter,
            message: "nope".into(),
            error_code: Some("429".into()),
        };
        let err = LlmError::FallbackExhausted {
            model: Model::new("gpt-5.2"),
            attempts: 3,
            source: Box::new(inner),
        };
        assert_eq!(err.requested_model().map(Model::as_str), Some("gpt-5.2"));
        assert_eq!(err.backend(), Some(Backend::OpenRouter));
        assert_eq!(err.error_code(), Some("429"));
        assert!(err.to_string().contains("gpt-5.2"));
    }

    #[test]
    fn parse_error_display_truncates_long_bodies() {
        let body = "x".repeat(RAW_BODY_DISPLAY_LIMIT * 2);
        let err = LlmError::parse_error("unexpected token", body.clone());
        assert!(err.to_string().len() < body.len());
        match err {
            LlmError::ParseError { raw_body, .. } => assert_eq!(raw_body.len(), body.len()),
            other => panic!("unexpected error variant: {other:?}"),
        }
    }
}
