//! ProviderCapabilities structure and the static per-backend registry.
//!
//! Capability flags never block a call. A request that uses a feature the
//! backend is not known to support only produces a warning; the backend may
//! still accept it, ignore it, or reject it on its own terms.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

use crate::hosted_tools::openai::BuiltinTool;
use crate::types::{Backend, ChatRequest};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderCapabilities {
    pub tools: bool,
    pub vision: bool,
    pub streaming: bool,
    /// Structured (JSON) output.
    pub json: bool,
    /// Reasoning effort / extended thinking.
    pub thinking: bool,
    pub pdf: bool,
    pub embeddings: bool,
    pub tts: bool,
    pub stt: bool,
    pub web_search: bool,
    pub file_search: bool,
    pub code_interpreter: bool,
    pub mcp: bool,
    pub image_generation: bool,
    pub computer_use: bool,
    pub shell: bool,
    pub apply_patch: bool,
}

impl ProviderCapabilities {
    pub const fn new() -> Self {
        Self {
            tools: false,
            vision: false,
            streaming: false,
            json: false,
            thinking: false,
            pdf: false,
            embeddings: false,
            tts: false,
            stt: false,
            web_search: false,
            file_search: false,
            code_interpreter: false,
            mcp: false,
            image_generation: false,
            computer_use: false,
            shell: false,
            apply_patch: false,
        }
    }

    /// Chat with tools, streaming and structured output.
    pub const fn chat_basics() -> Self {
        Self::new().with_tools().with_streaming().with_json()
    }

    pub const fn with_tools(mut self) -> Self {
        self.tools = true;
        self
    }
    pub const fn with_vision(mut self) -> Self {
        self.vision = true;
        self
    }
    pub const fn with_streaming(mut self) -> Self {
        self.streaming = true;
        self
    }
    pub const fn with_json(mut self) -> Self {
        self.json = true;
        self
    }
    pub const fn with_thinking(mut self) -> Self {
        self.thinking = true;
        self
    }
    pub const fn with_pdf(mut self) -> Self {
        self.pdf = true;
        self
    }
    pub const fn with_embeddings(mut self) -> Self {
        self.embeddings = true;
        self
    }
    pub const fn with_audio(mut self) -> Self {
        self.tts = true;
        self.stt = true;
        self
    }
    /// Every Responses API hosted tool.
    pub const fn with_hosted_tools(mut self) -> Self {
        self.web_search = true;
        self.file_search = true;
        self.code_interpreter = true;
        self.mcp = true;
        self.image_generation = true;
        self.computer_use = true;
        self.shell = true;
        self.apply_patch = true;
        self
    }
    pub const fn without_web_search(mut self) -> Self {
        self.web_search = false;
        self
    }

    pub const fn supports(&self, feature: Feature) -> bool {
        match feature {
            Feature::Tools => self.tools,
            Feature::Vision => self.vision,
            Feature::Streaming => self.streaming,
            Feature::Json => self.json,
            Feature::Thinking => self.thinking,
            Feature::Pdf => self.pdf,
            Feature::Embeddings => self.embeddings,
            Feature::Tts => self.tts,
            Feature::Stt => self.stt,
            Feature::WebSearch => self.web_search,
            Feature::FileSearch => self.file_search,
            Feature::CodeInterpreter => self.code_interpreter,
            Feature::Mcp => self.mcp,
            Feature::ImageGeneration => self.image_generation,
            Feature::ComputerUse => self.computer_use,
            Feature::Shell => self.shell,
            Feature::ApplyPatch => self.apply_patch,
        }
    }

    /// Look up a feature by name; unknown names are unsupported.
    pub fn supports_named(&self, feature: &str) -> bool {
        Feature::parse(feature).is_some_and(|f| self.supports(f))
    }
}

/// A request feature that backends may or may not support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Tools,
    Vision,
    Streaming,
    Json,
    Thinking,
    Pdf,
    Embeddings,
    Tts,
    Stt,
    WebSearch,
    FileSearch,
    CodeInterpreter,
    Mcp,
    ImageGeneration,
    ComputerUse,
    Shell,
    ApplyPatch,
}

impl Feature {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tools => "tools",
            Self::Vision => "vision",
            Self::Streaming => "streaming",
            Self::Json => "json",
            Self::Thinking => "thinking",
            Self::Pdf => "pdf",
            Self::Embeddings => "embeddings",
            Self::Tts => "tts",
            Self::Stt => "stt",
            Self::WebSearch => "web_search",
            Self::FileSearch => "file_search",
            Self::CodeInterpreter => "code_interpreter",
            Self::Mcp => "mcp",
            Self::ImageGeneration => "image_generation",
            Self::ComputerUse => "computer_use",
            Self::Shell => "shell",
            Self::ApplyPatch => "apply_patch",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let feature = match name {
            "tools" => Self::Tools,
            "vision" => Self::Vision,
            "streaming" => Self::Streaming,
            "json" | "structured_output" => Self::Json,
            "thinking" | "reasoning" => Self::Thinking,
            "pdf" => Self::Pdf,
            "embeddings" => Self::Embeddings,
            "tts" | "speech" => Self::Tts,
            "stt" | "transcription" => Self::Stt,
            "web_search" => Self::WebSearch,
            "file_search" => Self::FileSearch,
            "code_interpreter" => Self::CodeInterpreter,
            "mcp" => Self::Mcp,
            "image_generation" => Self::ImageGeneration,
            "computer_use" | "computer_use_preview" => Self::ComputerUse,
            "shell" => Self::Shell,
            "apply_patch" => Self::ApplyPatch,
            _ => return None,
        };
        Some(feature)
    }

    /// Capability required by a hosted tool.
    pub const fn for_builtin(tool: &BuiltinTool) -> Self {
        match tool {
            BuiltinTool::WebSearch(_) => Self::WebSearch,
            BuiltinTool::FileSearch(_) => Self::FileSearch,
            BuiltinTool::CodeInterpreter(_) => Self::CodeInterpreter,
            BuiltinTool::Mcp(_) => Self::Mcp,
            BuiltinTool::ImageGeneration(_) => Self::ImageGeneration,
            BuiltinTool::ComputerUse(_) => Self::ComputerUse,
            BuiltinTool::Shell => Self::Shell,
            BuiltinTool::ApplyPatch => Self::ApplyPatch,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static CAPABILITIES: Lazy<HashMap<Backend, ProviderCapabilities>> = Lazy::new(|| {
    let openai = ProviderCapabilities::chat_basics()
        .with_vision()
        .with_thinking()
        .with_pdf()
        .with_embeddings()
        .with_audio()
        .with_hosted_tools();
    HashMap::from([
        (Backend::OpenAi, openai),
        // Azure deployments lag behind on hosted web search.
        (Backend::Azure, openai.without_web_search()),
        (
            Backend::OpenRouter,
            ProviderCapabilities::chat_basics()
                .with_vision()
                .with_thinking()
                .with_pdf(),
        ),
        (
            Backend::Anthropic,
            ProviderCapabilities::new()
                .with_tools()
                .with_streaming()
                .with_vision()
                .with_thinking()
                .with_pdf(),
        ),
        (
            Backend::Google,
            ProviderCapabilities::chat_basics()
                .with_vision()
                .with_thinking()
                .with_pdf()
                .with_embeddings(),
        ),
        (
            Backend::Ollama,
            ProviderCapabilities::chat_basics()
                .with_vision()
                .with_embeddings(),
        ),
    ])
});

/// Static capability lookup.
pub fn capabilities(backend: Backend) -> ProviderCapabilities {
    CAPABILITIES.get(&backend).copied().unwrap_or_default()
}

/// Emit a warning when `feature` is used but `backend` does not advertise it.
///
/// Returns `true` when a warning was emitted. Never fails.
pub fn warn_if_unsupported(backend: Backend, model: &str, feature: Feature, used: bool) -> bool {
    if !used || capabilities(backend).supports(feature) {
        return false;
    }
    tracing::warn!(
        backend = %backend,
        model = %model,
        feature = %feature,
        "feature may not be supported by backend; sending anyway"
    );
    true
}

/// Check every feature a request uses against `backend`.
///
/// Returns the features that triggered a warning, in check order.
pub fn check_request(
    backend: Backend,
    model: &str,
    request: &ChatRequest,
    streaming: bool,
) -> Vec<Feature> {
    let mut checks = vec![
        (Feature::Tools, !request.tools.is_empty()),
        (Feature::Thinking, request.reasoning_effort.is_some()),
        (Feature::Json, request.json_mode),
        (Feature::Vision, request.has_images()),
        (Feature::Streaming, streaming),
    ];
    checks.extend(
        request
            .builtin_tools
            .iter()
            .map(|tool| (Feature::for_builtin(tool), true)),
    );

    checks
        .into_iter()
        .filter(|(feature, used)| warn_if_unsupported(backend, model, *feature, *used))
        .map(|(feature, _)| feature)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hosted_tools::openai;
    use crate::types::{ChatMessage, Model, ReasoningEffort};
    use tracing_test::traced_test;

    #[test]
    fn openai_supports_every_hosted_tool() {
        let caps = capabilities(Backend::OpenAi);
        for name in [
            "web_search",
            "file_search",
            "code_interpreter",
            "mcp",
            "image_generation",
            "computer_use",
            "shell",
            "apply_patch",
        ] {
            assert!(caps.supports_named(name), "{name}");
        }
    }

    #[test]
    fn azure_shares_openai_flags_except_web_search() {
        let azure = capabilities(Backend::Azure);
        assert!(!azure.web_search);
        assert!(azure.code_interpreter);
        assert_eq!(
            ProviderCapabilities {
                web_search: true,
                ..azure
            },
            capabilities(Backend::OpenAi)
        );
    }

    #[test]
    fn unknown_feature_names_are_unsupported() {
        assert!(!capabilities(Backend::OpenAi).supports_named("telepathy"));
    }

    #[test]
    #[traced_test]
    fn unsupported_feature_warns_but_unused_does_not() {
        assert!(warn_if_unsupported(
            Backend::Anthropic,
            "claude-sonnet-4-5-20250929",
            Feature::Json,
            true
        ));
        assert!(logs_contain("feature may not be supported"));
        assert!(!warn_if_unsupported(
            Backend::Anthropic,
            "claude",
            Feature::Json,
            false
        ));
        assert!(!warn_if_unsupported(
            Backend::OpenAi,
            "gpt-5.2",
            Feature::Json,
            true
        ));
    }

    #[test]
    fn check_request_collects_every_mismatch() {
        let request = ChatRequest::new(Model::GPT_5_2, vec![ChatMessage::user("hi")])
            .with_reasoning_effort(ReasoningEffort::High)
            .with_json_mode(true)
            .with_builtin_tool(openai::web_search().build())
            .with_builtin_tool(openai::shell());
        let warned = check_request(Backend::Ollama, "llama3", &request, false);
        assert_eq!(
            warned,
            vec![Feature::Thinking, Feature::WebSearch, Feature::Shell]
        );
        assert!(check_request(Backend::OpenAi, "gpt-5.2", &request, true).is_empty());
    }
}
