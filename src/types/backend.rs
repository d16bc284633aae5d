//! Backend identities and explicit id parsing.
//!
//! Centralizing ids avoids "stringly-typed" routing scattered across layers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LlmError;

pub const OPENROUTER: &str = "openrouter";
pub const OPENAI: &str = "openai";
pub const ANTHROPIC: &str = "anthropic";
pub const GOOGLE: &str = "google";
pub const OLLAMA: &str = "ollama";
pub const AZURE: &str = "azure";

/// Alias ids accepted by [`Backend::parse`] (canonical ids are above).
const GEMINI_ALIAS: &str = "gemini";
const AZURE_OPENAI_ALIAS: &str = "azure-openai";

/// One vendor integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    OpenRouter,
    OpenAi,
    Anthropic,
    Google,
    Ollama,
    Azure,
}

impl Backend {
    pub const ALL: [Backend; 6] = [
        Backend::OpenRouter,
        Backend::OpenAi,
        Backend::Anthropic,
        Backend::Google,
        Backend::Ollama,
        Backend::Azure,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenRouter => OPENROUTER,
            Self::OpenAi => OPENAI,
            Self::Anthropic => ANTHROPIC,
            Self::Google => GOOGLE,
            Self::Ollama => OLLAMA,
            Self::Azure => AZURE,
        }
    }

    pub fn parse(id: &str) -> Option<Self> {
        match id.trim().to_ascii_lowercase().as_str() {
            OPENROUTER => Some(Self::OpenRouter),
            OPENAI => Some(Self::OpenAi),
            ANTHROPIC => Some(Self::Anthropic),
            GOOGLE | GEMINI_ALIAS => Some(Self::Google),
            OLLAMA => Some(Self::Ollama),
            AZURE | AZURE_OPENAI_ALIAS => Some(Self::Azure),
            _ => None,
        }
    }

    /// Backends that speak the OpenAI wire dialects (Chat Completions and,
    /// for first-party deployments, Responses).
    pub const fn is_openai_family(self) -> bool {
        matches!(
            self,
            Self::OpenAi | Self::Azure | Self::OpenRouter | Self::Ollama
        )
    }

    /// Backends that serve the Responses API with hosted tools.
    pub const fn supports_responses_api(self) -> bool {
        matches!(self, Self::OpenAi | Self::Azure)
    }

    /// Whether calls fail without an API key.
    pub const fn requires_api_key(self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| LlmError::InvalidInput(format!("Unknown backend: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_canonical_ids_and_aliases() {
        for backend in Backend::ALL {
            assert_eq!(Backend::parse(backend.as_str()), Some(backend));
        }
        assert_eq!(Backend::parse("gemini"), Some(Backend::Google));
        assert_eq!(Backend::parse(" Azure-OpenAI "), Some(Backend::Azure));
        assert_eq!(Backend::parse("bedrock"), None);
    }

    #[test]
    fn from_str_reports_unknown_ids() {
        let err = "nope".parse::<Backend>().unwrap_err();
        assert!(matches!(err, LlmError::InvalidInput(_)));
    }

    #[test]
    fn serde_uses_canonical_ids() {
        let json = serde_json::to_string(&Backend::OpenRouter).unwrap();
        assert_eq!(json, "\"openrouter\"");
        let back: Backend = serde_json::from_str("\"openai\"").unwrap();
        assert_eq!(back, Backend::OpenAi);
    }
}
