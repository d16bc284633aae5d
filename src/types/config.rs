//! Per-backend connection settings.

use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;

use super::backend::Backend;
use crate::defaults;
use crate::error::LlmError;

/// Credentials and endpoint for one backend.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub backend: Backend,
    pub api_key: Option<SecretString>,
    pub base_url: String,
    /// Azure `api-version` query parameter.
    pub api_version: Option<String>,
    /// OpenAI organization header.
    pub organization: Option<String>,
    /// Extra headers for this backend only.
    pub headers: HashMap<String, String>,
}

impl ProviderConfig {
    /// Configuration with the backend's default endpoint and no credentials.
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            api_key: None,
            base_url: defaults::base_url(backend).to_string(),
            api_version: (backend == Backend::Azure)
                .then(|| defaults::azure::API_VERSION.to_string()),
            organization: None,
            headers: HashMap::new(),
        }
    }

    /// Read the conventional environment variables for `backend`.
    pub fn from_env(backend: Backend) -> Self {
        Self::from_lookup(backend, |name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(backend: Backend, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::new(backend);
        let key = match backend {
            Backend::OpenAi => non_empty("OPENAI_API_KEY"),
            Backend::OpenRouter => non_empty("OPENROUTER_API_KEY"),
            Backend::Anthropic => non_empty("ANTHROPIC_API_KEY"),
            Backend::Google => non_empty("GEMINI_API_KEY").or_else(|| non_empty("GOOGLE_API_KEY")),
            Backend::Azure => non_empty("AZURE_OPENAI_API_KEY"),
            Backend::Ollama => non_empty("OLLAMA_API_KEY"),
        };
        config.api_key = key.map(SecretString::from);

        let base_url = match backend {
            Backend::OpenAi => non_empty("OPENAI_BASE_URL"),
            Backend::OpenRouter => non_empty("OPENROUTER_BASE_URL"),
            Backend::Anthropic => non_empty("ANTHROPIC_BASE_URL"),
            Backend::Google => non_empty("GEMINI_BASE_URL"),
            Backend::Azure => non_empty("AZURE_OPENAI_ENDPOINT"),
            Backend::Ollama => non_empty("OLLAMA_BASE_URL"),
        };
        if let Some(url) = base_url {
            config.base_url = url;
        }
        if backend == Backend::Azure
            && let Some(version) = non_empty("AZURE_OPENAI_API_VERSION")
        {
            config.api_version = Some(version);
        }
        if backend == Backend::OpenAi {
            config.organization = non_empty("OPENAI_ORG_ID");
        }
        config
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// The API key, or a configuration error when the backend needs one.
    pub fn require_api_key(&self) -> Result<Option<&str>, LlmError> {
        let key = self
            .api_key
            .as_ref()
            .map(|k| k.expose_secret())
            .filter(|k| !k.trim().is_empty());
        match key {
            None if self.backend.requires_api_key() => Err(LlmError::ConfigurationError(
                format!("missing API key for {}", self.backend),
            )),
            key => Ok(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn google_falls_back_to_google_api_key() {
        let cfg = ProviderConfig::from_lookup(
            Backend::Google,
            lookup(&[("GEMINI_API_KEY", " "), ("GOOGLE_API_KEY", "g-key")]),
        );
        assert_eq!(cfg.require_api_key().unwrap(), Some("g-key"));
    }

    #[test]
    fn azure_reads_endpoint_and_version() {
        let cfg = ProviderConfig::from_lookup(
            Backend::Azure,
            lookup(&[
                ("AZURE_OPENAI_API_KEY", "k"),
                ("AZURE_OPENAI_ENDPOINT", "https://acme.openai.azure.com/"),
                ("AZURE_OPENAI_API_VERSION", "2025-01-01"),
            ]),
        );
        assert_eq!(cfg.base_url(), "https://acme.openai.azure.com");
        assert_eq!(cfg.api_version.as_deref(), Some("2025-01-01"));
    }

    #[test]
    fn missing_key_is_a_configuration_error() {
        let cfg = ProviderConfig::new(Backend::Anthropic);
        match cfg.require_api_key() {
            Err(LlmError::ConfigurationError(msg)) => assert!(msg.contains("anthropic")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn ollama_needs_no_key() {
        let cfg = ProviderConfig::new(Backend::Ollama);
        assert_eq!(cfg.require_api_key().unwrap(), None);
        assert_eq!(cfg.base_url(), defaults::base_url(Backend::Ollama));
    }
}
