//! Abstract model identifiers.
//!
//! A [`Model`] names a model in the caller's vendor-neutral namespace. The
//! per-backend identifier is produced by [`crate::models::resolve`]. Aliases
//! are plain constants pointing at the same canonical value, so lookup
//! tables never carry duplicate keys.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Model(Cow<'static, str>);

impl Model {
    pub const fn from_static(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(Cow::Owned(id.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    // OpenAI
    pub const GPT_5_2: Model = Model::from_static("gpt-5.2");
    pub const GPT_5_1: Model = Model::from_static("gpt-5.1");
    pub const GPT_5: Model = Model::from_static("gpt-5");
    pub const GPT_5_MINI: Model = Model::from_static("gpt-5-mini");
    pub const GPT_5_NANO: Model = Model::from_static("gpt-5-nano");
    pub const GPT_4_1: Model = Model::from_static("gpt-4.1");
    pub const GPT_4_1_MINI: Model = Model::from_static("gpt-4.1-mini");
    pub const GPT_4O: Model = Model::from_static("gpt-4o");
    pub const GPT_4O_MINI: Model = Model::from_static("gpt-4o-mini");
    pub const O1: Model = Model::from_static("o1");
    pub const O3: Model = Model::from_static("o3");
    pub const O3_MINI: Model = Model::from_static("o3-mini");
    pub const O4_MINI: Model = Model::from_static("o4-mini");
    pub const GPT_IMAGE_1: Model = Model::from_static("gpt-image-1");
    pub const TEXT_EMBEDDING_3_SMALL: Model = Model::from_static("text-embedding-3-small");
    pub const TEXT_EMBEDDING_3_LARGE: Model = Model::from_static("text-embedding-3-large");

    // Anthropic
    pub const CLAUDE_OPUS_4_5: Model = Model::from_static("claude-opus-4.5");
    pub const CLAUDE_SONNET_4_5: Model = Model::from_static("claude-sonnet-4.5");
    pub const CLAUDE_HAIKU_4_5: Model = Model::from_static("claude-haiku-4.5");
    pub const CLAUDE_OPUS_4_1: Model = Model::from_static("claude-opus-4.1");
    pub const CLAUDE_OPUS_4: Model = Model::from_static("claude-opus-4");
    pub const CLAUDE_SONNET_4: Model = Model::from_static("claude-sonnet-4");
    pub const CLAUDE_3_7_SONNET: Model = Model::from_static("claude-3.7-sonnet");
    pub const CLAUDE_3_5_HAIKU: Model = Model::from_static("claude-3.5-haiku");

    // Google
    pub const GEMINI_3_PRO: Model = Model::from_static("gemini-3-pro");
    pub const GEMINI_3_FLASH: Model = Model::from_static("gemini-3-flash");
    pub const GEMINI_2_5_PRO: Model = Model::from_static("gemini-2.5-pro");
    pub const GEMINI_2_5_FLASH: Model = Model::from_static("gemini-2.5-flash");
    pub const GEMINI_2_5_FLASH_LITE: Model = Model::from_static("gemini-2.5-flash-lite");
    pub const GEMINI_2_0_FLASH: Model = Model::from_static("gemini-2.0-flash");
    pub const GEMINI_2_0_FLASH_LITE: Model = Model::from_static("gemini-2.0-flash-lite");

    // Other OpenRouter-hosted families
    pub const GROK_4: Model = Model::from_static("grok-4");
    pub const GROK_3: Model = Model::from_static("grok-3");
    pub const LLAMA_4_MAVERICK: Model = Model::from_static("llama-4-maverick");
    pub const MISTRAL_LARGE: Model = Model::from_static("mistral-large");
    pub const DEEPSEEK_R1: Model = Model::from_static("deepseek-r1");
    pub const QWEN3_CODER: Model = Model::from_static("qwen3-coder");

    // Aliases
    pub const GPT_LATEST: Model = Model::GPT_5_2;
    pub const CLAUDE_SONNET: Model = Model::CLAUDE_SONNET_4_5;
    pub const CLAUDE_OPUS: Model = Model::CLAUDE_OPUS_4_5;
    pub const CLAUDE_HAIKU: Model = Model::CLAUDE_HAIKU_4_5;
    pub const GEMINI_PRO: Model = Model::GEMINI_2_5_PRO;
    pub const GEMINI_FLASH: Model = Model::GEMINI_2_5_FLASH;
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Model {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Model {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl AsRef<str> for Model {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn static_and_owned_ids_compare_equal() {
        assert_eq!(Model::new("gpt-5.2"), Model::GPT_5_2);
        let mut set = HashSet::new();
        set.insert(Model::GPT_5_2);
        assert!(set.contains(&Model::from("gpt-5.2")));
    }

    #[test]
    fn aliases_share_the_canonical_value() {
        assert_eq!(Model::GPT_LATEST, Model::GPT_5_2);
        assert_eq!(Model::CLAUDE_SONNET.as_str(), "claude-sonnet-4.5");
    }
}
