//! Model Resolver
//!
//! Maps an abstract [`Model`] to the identifier a specific backend expects:
//!
//! 1. exact lookup in the backend's static table (always wins);
//! 2. otherwise backend-specific normalization of the raw id (namespace
//!    stripping or inference, snapshot mapping, dot-to-dash transliteration);
//! 3. otherwise the raw id, unchanged.

mod normalize;
mod tables;

pub use tables::known_models;

use crate::types::{Backend, Model};

/// Resolve `model` to the backend-specific id. Never fails.
pub fn resolve(backend: Backend, model: &Model) -> String {
    if let Some(id) = tables::lookup(backend, model) {
        return id.to_string();
    }
    normalize::normalize(backend, model.as_str())
}

#[cfg(test)]
mod tests {
    use super::resolve as res;
    use super::*;

    #[test]
    fn table_entries_always_win() {
        for backend in Backend::ALL {
            for (model, id) in known_models(backend) {
                assert_eq!(res(backend, &model), id, "{backend} {model}");
            }
        }
    }

    #[test]
    fn openai_strips_namespace() {
        assert_eq!(res(Backend::OpenAi, &"openai/gpt-9".into()), "gpt-9");
        assert_eq!(res(Backend::Azure, &"openai/gpt-9".into()), "gpt-9");
        assert_eq!(res(Backend::OpenAi, &"my-finetune".into()), "my-finetune");
    }

    #[test]
    fn azure_uses_openai_table() {
        assert_eq!(res(Backend::Azure, &Model::GPT_4O), "gpt-4o");
    }

    #[test]
    fn google_strips_namespaces() {
        assert_eq!(
            res(Backend::Google, &"google/gemini-9-ultra".into()),
            "gemini-9-ultra"
        );
        assert_eq!(
            res(Backend::Google, &"models/gemini-9-ultra".into()),
            "gemini-9-ultra"
        );
        assert_eq!(res(Backend::Google, &Model::GEMINI_3_PRO), "gemini-3-pro-preview");
    }

    #[test]
    fn anthropic_shorthand_maps_to_snapshots() {
        assert_eq!(
            res(Backend::Anthropic, &Model::CLAUDE_SONNET_4_5),
            "claude-sonnet-4-5-20250929"
        );
        assert_eq!(
            res(Backend::Anthropic, &"anthropic/claude-opus-4.1".into()),
            "claude-opus-4-1-20250805"
        );
        assert_eq!(
            res(Backend::Anthropic, &"anthropic/claude-3.7-sonnet:thinking".into()),
            "claude-3-7-sonnet-20250219"
        );
    }

    #[test]
    fn anthropic_unmapped_dotted_ids_are_transliterated() {
        assert_eq!(
            res(Backend::Anthropic, &"claude-opus-4.7".into()),
            "claude-opus-4-7"
        );
        assert_eq!(
            res(Backend::Anthropic, &"anthropic/claude-sonnet-5.1:beta".into()),
            "claude-sonnet-5-1"
        );
        assert_eq!(
            res(Backend::Anthropic, &"claude-sonnet-4-5-20250929".into()),
            "claude-sonnet-4-5-20250929"
        );
    }

    #[test]
    fn openrouter_infers_vendor_namespace() {
        assert_eq!(res(Backend::OpenRouter, &"gpt-9".into()), "openai/gpt-9");
        assert_eq!(res(Backend::OpenRouter, &"o7".into()), "openai/o7");
        assert_eq!(
            res(Backend::OpenRouter, &"claude-opus-9".into()),
            "anthropic/claude-opus-9"
        );
        assert_eq!(res(Backend::OpenRouter, &"grok-9".into()), "x-ai/grok-9");
        assert_eq!(
            res(Backend::OpenRouter, &"mistral-tiny".into()),
            "mistralai/mistral-tiny"
        );
    }

    #[test]
    fn openrouter_keeps_namespaced_and_unknown_ids() {
        assert_eq!(
            res(Backend::OpenRouter, &"nousresearch/hermes-4".into()),
            "nousresearch/hermes-4"
        );
        assert_eq!(res(Backend::OpenRouter, &"phi-4".into()), "phi-4");
    }

    #[test]
    fn ollama_passes_everything_through() {
        assert_eq!(res(Backend::Ollama, &"llama3.1:8b".into()), "llama3.1:8b");
        assert_eq!(res(Backend::Ollama, &Model::GPT_5_2), "gpt-5.2");
    }
}
