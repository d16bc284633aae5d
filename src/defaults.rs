//! Default Configuration Values
//!
//! Centralizes endpoints, timeouts and protocol versions used by every backend.

use std::time::Duration;

use crate::types::Backend;

/// HTTP client default configurations
pub mod http {
    use super::*;

    /// Default request timeout. Large models routinely take 10-20 seconds to
    /// answer before network latency is added.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    /// Default connection timeout for establishing HTTP connections
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    pub const USER_AGENT: &str = concat!("unillm/", env!("CARGO_PKG_VERSION"));
}

pub mod anthropic {
    /// `anthropic-version` header value.
    pub const VERSION: &str = "2023-06-01";
    /// The Messages API requires `max_tokens`.
    pub const MAX_TOKENS: u32 = 4096;
}

pub mod azure {
    pub const API_VERSION: &str = "2025-04-01-preview";
}

/// Legacy fixed retry schedule unit (`attempt² × 100ms`).
pub const LEGACY_RETRY_UNIT: Duration = Duration::from_millis(100);

pub fn base_url(backend: Backend) -> &'static str {
    match backend {
        Backend::OpenRouter => "https://openrouter.ai/api/v1",
        Backend::OpenAi => "https://api.openai.com/v1",
        Backend::Anthropic => "https://api.anthropic.com/v1",
        Backend::Google => "https://generativelanguage.googleapis.com/v1beta",
        Backend::Ollama => "http://localhost:11434/v1",
        // Azure endpoints are per-resource; this must be configured.
        Backend::Azure => "",
    }
}
