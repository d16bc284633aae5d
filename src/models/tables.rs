//! Static Model → backend id tables.
//!
//! Tables are built once on first use and are read-only afterwards. A backend
//! that shares another backend's identifier namespace is registered as a
//! delegate and points at the same table instead of carrying a copy.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{Backend, Model};

pub(crate) type ModelTable = HashMap<Model, String>;

/// OpenAI ids are the abstract ids themselves.
const OPENAI_MODELS: &[&str] = &[
    "gpt-5.2",
    "gpt-5.2-pro",
    "gpt-5.2-chat-latest",
    "gpt-5.1",
    "gpt-5.1-chat-latest",
    "gpt-5.1-codex",
    "gpt-5.1-codex-mini",
    "gpt-5",
    "gpt-5-pro",
    "gpt-5-mini",
    "gpt-5-nano",
    "gpt-5-codex",
    "codex-mini-latest",
    "computer-use-preview",
    "chatgpt-4o-latest",
    "gpt-4.1",
    "gpt-4.1-mini",
    "gpt-4.1-nano",
    "gpt-4o",
    "gpt-4o-mini",
    "o1",
    "o1-mini",
    "o1-pro",
    "o3",
    "o3-mini",
    "o3-pro",
    "o3-deep-research",
    "o4-mini",
    "o4-mini-deep-research",
    "gpt-4o-mini-tts",
    "gpt-4o-transcribe",
    "gpt-4o-mini-transcribe",
    "gpt-image-1",
    "gpt-image-1-mini",
    "text-embedding-3-small",
    "text-embedding-3-large",
];

/// Dotted shorthand → dated snapshot. Also consulted by the Anthropic
/// normalizer after namespace and variant suffix stripping.
pub(crate) const ANTHROPIC_SNAPSHOTS: &[(&str, &str)] = &[
    ("claude-opus-4.5", "claude-opus-4-5-20251101"),
    ("claude-sonnet-4.5", "claude-sonnet-4-5-20250929"),
    ("claude-haiku-4.5", "claude-haiku-4-5-20251001"),
    ("claude-opus-4.1", "claude-opus-4-1-20250805"),
    ("claude-opus-4", "claude-opus-4-20250514"),
    ("claude-sonnet-4", "claude-sonnet-4-20250514"),
    ("claude-3.7-sonnet", "claude-3-7-sonnet-20250219"),
    ("claude-3.5-haiku", "claude-3-5-haiku-20241022"),
    ("claude-3-haiku", "claude-3-haiku-20240307"),
    ("claude-3-opus", "claude-3-opus-20240229"),
    ("claude-3-sonnet", "claude-3-sonnet-20240229"),
];

const GOOGLE_MODELS: &[(&str, &str)] = &[
    ("gemini-3-pro", "gemini-3-pro-preview"),
    ("gemini-3-flash", "gemini-3-flash-preview"),
    ("gemini-2.5-pro", "gemini-2.5-pro"),
    ("gemini-2.5-flash", "gemini-2.5-flash"),
    ("gemini-2.5-flash-lite", "gemini-2.5-flash-lite"),
    ("gemini-2.0-flash", "gemini-2.0-flash"),
    ("gemini-2.0-flash-lite", "gemini-2.0-flash-lite"),
];

/// OpenRouter entries outside the OpenAI family, which is derived from
/// [`OPENAI_MODELS`] with an `openai/` namespace.
const OPENROUTER_MODELS: &[(&str, &str)] = &[
    ("claude-opus-4.5", "anthropic/claude-opus-4.5"),
    ("claude-sonnet-4.5", "anthropic/claude-sonnet-4.5"),
    ("claude-haiku-4.5", "anthropic/claude-haiku-4.5"),
    ("claude-opus-4.1", "anthropic/claude-opus-4.1"),
    ("claude-opus-4", "anthropic/claude-opus-4"),
    ("claude-sonnet-4", "anthropic/claude-sonnet-4"),
    ("claude-3.7-sonnet", "anthropic/claude-3.7-sonnet"),
    ("claude-3.5-haiku", "anthropic/claude-3.5-haiku"),
    ("claude-3-haiku", "anthropic/claude-3-haiku"),
    ("claude-3-opus", "anthropic/claude-3-opus"),
    ("gemini-3-pro", "google/gemini-3-pro-preview"),
    ("gemini-3-flash", "google/gemini-3-flash-preview"),
    ("gemini-2.5-pro", "google/gemini-2.5-pro"),
    ("gemini-2.5-flash", "google/gemini-2.5-flash"),
    ("gemini-2.5-flash-lite", "google/gemini-2.5-flash-lite"),
    ("gemini-2.0-flash", "google/gemini-2.0-flash-001"),
    ("gemini-2.0-flash-lite", "google/gemini-2.0-flash-lite-001"),
    ("grok-4", "x-ai/grok-4"),
    ("grok-4.1-fast", "x-ai/grok-4.1-fast"),
    ("grok-3", "x-ai/grok-3"),
    ("grok-3-mini", "x-ai/grok-3-mini"),
    ("qwen3-coder", "qwen/qwen3-coder"),
    ("qwen3-next", "qwen/qwen3-next-80b-a3b-instruct"),
    ("llama-4-maverick", "meta-llama/llama-4-maverick"),
    ("mistral-large", "mistralai/mistral-large"),
    ("deepseek-r1", "deepseek/deepseek-r1"),
    ("sora-2", "openai/sora-2"),
    ("sora-2-pro", "openai/sora-2-pro"),
];

/// Backends that reuse another backend's table.
const DELEGATES: &[(Backend, Backend)] = &[(Backend::Azure, Backend::OpenAi)];

fn table_from(pairs: impl IntoIterator<Item = (&'static str, String)>) -> ModelTable {
    pairs
        .into_iter()
        .map(|(model, id)| (Model::from_static(model), id))
        .collect()
}

static TABLES: Lazy<HashMap<Backend, Arc<ModelTable>>> = Lazy::new(|| {
    let mut tables: HashMap<Backend, Arc<ModelTable>> = HashMap::new();

    tables.insert(
        Backend::OpenAi,
        Arc::new(table_from(OPENAI_MODELS.iter().map(|m| (*m, m.to_string())))),
    );
    tables.insert(
        Backend::Anthropic,
        Arc::new(table_from(
            ANTHROPIC_SNAPSHOTS.iter().map(|(m, id)| (*m, id.to_string())),
        )),
    );
    tables.insert(
        Backend::Google,
        Arc::new(table_from(
            GOOGLE_MODELS.iter().map(|(m, id)| (*m, id.to_string())),
        )),
    );
    tables.insert(
        Backend::OpenRouter,
        Arc::new(table_from(
            OPENAI_MODELS
                .iter()
                .map(|m| (*m, format!("openai/{m}")))
                .chain(OPENROUTER_MODELS.iter().map(|(m, id)| (*m, id.to_string()))),
        )),
    );

    for (alias, target) in DELEGATES {
        if let Some(table) = tables.get(target).cloned() {
            tables.insert(*alias, table);
        }
    }
    tables
});

/// Exact-match lookup. `None` when the backend has no table or no entry.
pub(crate) fn lookup(backend: Backend, model: &Model) -> Option<&'static str> {
    TABLES
        .get(&backend)
        .and_then(|table| table.get(model))
        .map(String::as_str)
}

/// Every (model, backend id) entry known for `backend`, in no particular order.
pub fn known_models(backend: Backend) -> Vec<(Model, String)> {
    TABLES
        .get(&backend)
        .map(|table| {
            table
                .iter()
                .map(|(m, id)| (m.clone(), id.clone()))
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn anthropic_snapshot(shorthand: &str) -> Option<&'static str> {
    ANTHROPIC_SNAPSHOTS
        .iter()
        .find(|(short, _)| *short == shorthand)
        .map(|(_, snapshot)| *snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn azure_shares_the_openai_table() {
        let openai = TABLES.get(&Backend::OpenAi).unwrap();
        let azure = TABLES.get(&Backend::Azure).unwrap();
        assert!(Arc::ptr_eq(openai, azure));
    }

    #[test]
    fn ollama_has_no_table() {
        assert!(known_models(Backend::Ollama).is_empty());
        assert_eq!(lookup(Backend::Ollama, &Model::GPT_5_2), None);
    }

    #[test]
    fn source_lists_have_no_duplicate_keys() {
        let mut seen = HashSet::new();
        for m in OPENAI_MODELS {
            assert!(seen.insert(*m), "duplicate openai key {m}");
        }
        for (m, _) in OPENROUTER_MODELS {
            assert!(seen.insert(*m), "openrouter key {m} shadows an openai key");
        }
        let mut seen = HashSet::new();
        for (m, _) in ANTHROPIC_SNAPSHOTS {
            assert!(seen.insert(*m), "duplicate anthropic key {m}");
        }
    }

    #[test]
    fn openrouter_namespaces_openai_models() {
        assert_eq!(
            lookup(Backend::OpenRouter, &Model::GPT_5_2),
            Some("openai/gpt-5.2")
        );
        assert_eq!(
            lookup(Backend::OpenRouter, &Model::GEMINI_2_0_FLASH),
            Some("google/gemini-2.0-flash-001")
        );
    }
}
