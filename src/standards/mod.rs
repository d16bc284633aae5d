//! Wire protocol standards.
//!
//! Each standard translates the abstract request into its backend's JSON
//! body and decodes bodies and stream events back. Backends sharing a wire
//! protocol (OpenAI, Azure, OpenRouter and Ollama all speak Chat Completions)
//! share a standard.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::LlmError;
use crate::retry::ErrorEnvelope;
use crate::types::Backend;

/// Parse a 2xx body. A top-level error object wins over everything else in
/// the body; an undecodable envelope keeps the raw body for diagnosis.
pub(crate) fn decode_body(backend: Backend, body: &[u8]) -> Result<Value, LlmError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        LlmError::parse_error(
            format!("invalid {backend} response body: {e}"),
            String::from_utf8_lossy(body),
        )
    })?;
    if let Some(envelope) = ErrorEnvelope::from_value(&value) {
        return Err(envelope.into_error(backend));
    }
    Ok(value)
}

/// Deserialize a decoded body into a typed envelope.
pub(crate) fn decode_envelope<T: DeserializeOwned>(
    backend: Backend,
    value: Value,
    body: &[u8],
) -> Result<T, LlmError> {
    serde_json::from_value(value).map_err(|e| {
        LlmError::parse_error(
            format!("unexpected {backend} response shape: {e}"),
            String::from_utf8_lossy(body),
        )
    })
}

/// Parse one stream event payload, surfacing embedded error objects.
pub(crate) fn decode_event_data(backend: Backend, data: &str) -> Result<Option<Value>, LlmError> {
    let value: Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(backend = %backend, error = %e, "skipping undecodable stream event");
            return Ok(None);
        }
    };
    if let Some(envelope) = ErrorEnvelope::from_value(&value) {
        return Err(envelope.into_error(backend));
    }
    Ok(Some(value))
}

/// Split a `data:` URI into (media type, base64 payload).
pub(crate) fn split_data_uri(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    let (meta, data) = rest.split_once(',')?;
    let media_type = meta.strip_suffix(";base64")?;
    Some((media_type, data))
}
