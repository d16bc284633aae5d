use reqwest::header::HeaderMap;
use serde_json::Value;

use crate::error::LlmError;
use crate::types::Backend;

/// Body sample length used when no structured message is available.
const BODY_SAMPLE_CHARS: usize = 200;

const REQUEST_ID_HEADERS: &[&str] = &[
    "x-request-id",
    "request-id",
    "x-goog-request-id",
    "x-openrouter-request-id",
];

/// The error object a backend embeds in a response body.
///
/// Recognizes the OpenAI/OpenRouter shape (`{"error":{"message","type","code"}}`),
/// the Anthropic shape (`{"type":"error","error":{"type","message"}}`), the
/// Gemini shape (`{"error":{"code":429,"message","status"}}`, possibly wrapped
/// in an array) and a bare `{"error":"text"}`. `"error": null` is not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorEnvelope {
    pub message: String,
    pub code: Option<String>,
}

impl ErrorEnvelope {
    pub fn from_value(value: &Value) -> Option<Self> {
        if let Value::Array(items) = value {
            return items.first().and_then(Self::from_value);
        }
        match value.get("error")? {
            Value::Null => None,
            Value::String(message) => Some(Self {
                message: message.clone(),
                code: None,
            }),
            Value::Object(err) => {
                let message = err
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string();
                let code = ["code", "status", "type"]
                    .iter()
                    .find_map(|key| err.get(*key).and_then(Value::as_str))
                    .map(str::to_string)
                    .or_else(|| err.get("code").and_then(Value::as_i64).map(|c| c.to_string()));
                Some(Self { message, code })
            }
            _ => None,
        }
    }

    pub fn from_body(body: &str) -> Option<Self> {
        serde_json::from_str::<Value>(body)
            .ok()
            .as_ref()
            .and_then(Self::from_value)
    }

    /// Convert an envelope found in a 2xx body into a backend error.
    pub fn into_error(self, backend: Backend) -> LlmError {
        LlmError::ProviderError {
            backend,
            message: self.message,
            error_code: self.code,
        }
    }

    /// Billing exhaustion, as opposed to a transient rate limit. Gemini's
    /// ordinary 429 mentions "quota" in its message and is not one.
    fn is_quota(&self) -> bool {
        self.code.as_deref() == Some("insufficient_quota")
    }
}

/// Classify a non-2xx HTTP answer.
///
/// - 401/403 → `AuthenticationError`
/// - 429 → `RateLimitError`, or `QuotaExceededError` for quota envelopes
/// - 408 and 5xx → retryable `ApiError`
/// - any other status → `ProviderError` with the envelope's code
pub fn classify_http_error(
    backend: Backend,
    status: u16,
    body: &str,
    headers: &HeaderMap,
) -> LlmError {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let envelope = parsed.as_ref().and_then(ErrorEnvelope::from_value);
    let quota = envelope.as_ref().is_some_and(ErrorEnvelope::is_quota);
    let error_code = envelope.as_ref().and_then(|env| env.code.clone());
    let message = match &envelope {
        Some(env) => env.message.clone(),
        None if body.trim().is_empty() => format!("http {status}"),
        None => body.chars().take(BODY_SAMPLE_CHARS).collect(),
    };
    let message = match request_ids(headers) {
        Some(ids) => format!("{message} ({ids})"),
        None => message,
    };

    match status {
        401 | 403 => LlmError::AuthenticationError {
            message: format!("{backend}: {message}"),
            error_code,
        },
        429 if quota => LlmError::QuotaExceededError {
            message: format!("{backend}: {message}"),
            error_code,
        },
        429 => {
            let retry_after = headers
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .map(|v| format!(" retry_after={v}"))
                .unwrap_or_default();
            LlmError::RateLimitError {
                message: format!("{backend}: {message}{retry_after}"),
                error_code,
            }
        }
        408 | 500..=599 => LlmError::ApiError {
            code: status,
            message,
            error_code,
            details: parsed,
        },
        _ => LlmError::ProviderError {
            backend,
            message,
            error_code,
        },
    }
}

fn request_ids(headers: &HeaderMap) -> Option<String> {
    let ids: Vec<String> = REQUEST_ID_HEADERS
        .iter()
        .filter_map(|name| {
            headers
                .get(*name)
                .and_then(|v| v.to_str().ok())
                .map(|v| format!("{name}={v}"))
        })
        .collect();
    (!ids.is_empty()).then(|| ids.join(","))
}
