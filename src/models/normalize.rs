//! Heuristic model id normalization, applied when no table entry matches.
//!
//! Rules are intentionally small. Anything they do not recognize passes
//! through unchanged rather than being guessed.

use super::tables;
use crate::types::Backend;

/// Prefix families used to infer an OpenRouter vendor namespace.
const NAMESPACE_FAMILIES: &[(&str, &[&str])] = &[
    (
        "openai",
        &[
            "gpt-",
            "chatgpt-",
            "sora-",
            "whisper-",
            "tts-",
            "text-embedding-",
            "codex-",
            "computer-use-",
        ],
    ),
    ("anthropic", &["claude-"]),
    ("google", &["gemini-", "gemma-"]),
    ("x-ai", &["grok-"]),
    ("meta-llama", &["llama-"]),
    ("mistralai", &["mistral-", "mixtral-", "codestral-"]),
    ("deepseek", &["deepseek-"]),
    ("qwen", &["qwen"]),
];

pub(crate) fn normalize(backend: Backend, raw: &str) -> String {
    match backend {
        Backend::OpenAi | Backend::Azure => strip_namespace(raw, "openai/").to_string(),
        Backend::Google => {
            let id = strip_namespace(raw, "google/");
            strip_namespace(id, "models/").to_string()
        }
        Backend::Anthropic => normalize_anthropic(raw),
        Backend::OpenRouter => namespace_for_openrouter(raw),
        Backend::Ollama => raw.to_string(),
    }
}

fn strip_namespace<'a>(raw: &'a str, namespace: &str) -> &'a str {
    raw.strip_prefix(namespace).unwrap_or(raw)
}

fn normalize_anthropic(raw: &str) -> String {
    let id = strip_namespace(raw, "anthropic/");
    // OpenRouter routing variants such as `:thinking` mean nothing natively.
    let id = id.split_once(':').map_or(id, |(base, _)| base);
    match tables::anthropic_snapshot(id) {
        Some(snapshot) => snapshot.to_string(),
        None => dots_to_dashes(id),
    }
}

/// `claude-opus-4.7` → `claude-opus-4-7`. Only dots followed by a digit are
/// treated as version separators.
pub(crate) fn dots_to_dashes(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    let mut chars = id.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '.' && chars.peek().is_some_and(char::is_ascii_digit) {
            out.push('-');
        } else {
            out.push(c);
        }
    }
    out
}

fn namespace_for_openrouter(raw: &str) -> String {
    if raw.contains('/') {
        return raw.to_string();
    }
    match infer_vendor(raw) {
        Some(vendor) => format!("{vendor}/{raw}"),
        None => raw.to_string(),
    }
}

/// Vendor namespace for a bare identifier, if it belongs to a known family.
pub(crate) fn infer_vendor(raw: &str) -> Option<&'static str> {
    let lower = raw.to_ascii_lowercase();
    if is_openai_reasoning_id(&lower) {
        return Some("openai");
    }
    NAMESPACE_FAMILIES
        .iter()
        .find(|(_, prefixes)| prefixes.iter().any(|p| lower.starts_with(p)))
        .map(|(vendor, _)| *vendor)
}

/// `o1`, `o3-mini`, `o4-mini-deep-research`, ...
fn is_openai_reasoning_id(lower: &str) -> bool {
    let mut chars = lower.chars();
    chars.next() == Some('o') && chars.next().is_some_and(|c| c.is_ascii_digit())
}
