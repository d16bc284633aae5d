//! Tracing Module - Logging and Debugging Instrumentation
//!
//! The library itself only emits `tracing` events. Applications that want to
//! see them either install their own subscriber or call [`init_tracing`].

use ::tracing::{debug, error, info};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::ChronoUtc;

use crate::error::LlmError;
use crate::types::Backend;

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Subscriber configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingConfig {
    /// Default filter directive, e.g. `info` or `unillm=debug`.
    pub level: String,
    pub format: OutputFormat,
    /// Let `RUST_LOG` override `level`.
    pub respect_env: bool,
    pub with_target: bool,
    /// Mask credentials in logged headers.
    pub mask_sensitive_values: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: OutputFormat::Compact,
            respect_env: true,
            with_target: true,
            mask_sensitive_values: true,
        }
    }
}

impl TracingConfig {
    pub fn debug() -> Self {
        Self {
            level: "unillm=debug".to_string(),
            format: OutputFormat::Pretty,
            ..Self::default()
        }
    }

    pub fn json() -> Self {
        Self {
            format: OutputFormat::Json,
            ..Self::default()
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    fn filter(&self) -> Result<EnvFilter, LlmError> {
        if self.respect_env
            && let Ok(filter) = EnvFilter::try_from_default_env()
        {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.level).map_err(|e| {
            LlmError::ConfigurationError(format!("invalid log filter '{}': {e}", self.level))
        })
    }
}

/// Install a global fmt subscriber.
///
/// Returns `Ok(false)` when a global subscriber was already installed; the
/// existing one is left untouched.
pub fn init_tracing(config: &TracingConfig) -> Result<bool, LlmError> {
    let filter = config.filter()?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .with_timer(ChronoUtc::rfc_3339());
    let installed = match config.format {
        OutputFormat::Compact => builder.compact().try_init(),
        OutputFormat::Pretty => builder.pretty().try_init(),
        OutputFormat::Json => builder.json().try_init(),
    };
    Ok(installed.is_ok())
}

/// Shorten a credential so logs never carry it whole.
pub fn mask_sensitive_value(value: &str) -> String {
    fn ends(value: &str, head: usize) -> String {
        let chars: Vec<char> = value.chars().collect();
        let start: String = chars[..head].iter().collect();
        let end: String = chars[chars.len() - 4..].iter().collect();
        format!("{start}...{end}")
    }

    if let Some(token) = value.strip_prefix("Bearer ") {
        return format!("Bearer {}", mask_sensitive_value(token));
    }
    match value.chars().count() {
        n if n > 16 => ends(value, 6),
        n if n > 8 => ends(value, 2),
        _ => "***".to_string(),
    }
}

fn is_sensitive(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.contains("authorization") || name.contains("key") || name.contains("token")
}

/// Render headers as JSON with credentials masked.
pub fn format_headers_for_logging(headers: &HeaderMap, mask: bool) -> String {
    let map: BTreeMap<&str, String> = headers
        .iter()
        .map(|(k, v)| {
            let value = v.to_str().unwrap_or("<binary>");
            let value = if mask && is_sensitive(k.as_str()) {
                mask_sensitive_value(value)
            } else {
                value.to_string()
            };
            (k.as_str(), value)
        })
        .collect();
    serde_json::to_string(&map).unwrap_or_else(|_| format!("{map:?}"))
}

/// Per-attempt request logging.
#[derive(Debug, Clone)]
pub struct ProviderTracer {
    backend: Backend,
    model: String,
    mask: bool,
}

impl ProviderTracer {
    pub fn new(backend: Backend, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            mask: true,
        }
    }

    pub fn with_masking(mut self, mask: bool) -> Self {
        self.mask = mask;
        self
    }

    pub fn trace_request_start(&self, attempt: u32, url: &str) {
        info!(backend = %self.backend, model = %self.model, attempt, url, "Request started");
    }

    pub fn trace_request_details(&self, headers: &HeaderMap, body: &serde_json::Value) {
        debug!(
            backend = %self.backend,
            model = %self.model,
            request_headers = %format_headers_for_logging(headers, self.mask),
            request_body = %body,
            "Request details"
        );
    }

    pub fn trace_response_success(&self, status: u16, started: Instant, length: usize) {
        debug!(
            backend = %self.backend,
            model = %self.model,
            status,
            duration_ms = started.elapsed().as_millis() as u64,
            response_length = length,
            "Request completed"
        );
    }

    pub fn trace_request_error(&self, error: &LlmError, started: Instant) {
        error!(
            backend = %self.backend,
            model = %self.model,
            status = error.status_code(),
            error = %error,
            duration_ms = started.elapsed().as_millis() as u64,
            "Request failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};

    #[test]
    fn masks_keys_and_bearer_tokens() {
        assert_eq!(
            mask_sensitive_value("sk-abcdefghijklmnopqrstuvwxyz"),
            "sk-abc...wxyz"
        );
        assert_eq!(mask_sensitive_value("Bearer short"), "Bearer ***");
        assert_eq!(mask_sensitive_value("0123456789"), "01...6789");
    }

    #[test]
    fn only_credential_headers_are_masked() {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_static("Bearer sk-abcdefghijklmnopqrstuvwxyz"),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let rendered = format_headers_for_logging(&headers, true);
        assert!(!rendered.contains("sk-abcdefghijklmnopqrstuvwxyz"));
        assert!(rendered.contains("application/json"));
    }

    #[test]
    fn invalid_filter_is_a_configuration_error() {
        let config = TracingConfig {
            level: "[[[".to_string(),
            respect_env: false,
            ..TracingConfig::default()
        };
        assert!(matches!(
            init_tracing(&config),
            Err(LlmError::ConfigurationError(_))
        ));
    }
}
