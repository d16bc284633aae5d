//! Core data types shared by every backend.

pub mod backend;
pub mod chat;
pub mod config;
pub mod http;
pub mod model;
pub mod tool_calls;

pub use backend::Backend;
pub use chat::{
    ChatMessage, ChatRequest, ChatResponse, Citation, ContentPart, FinishReason, FunctionTool,
    ImageDetail, MessageContent, MessageRole, ReasoningEffort, Usage,
};
pub use config::ProviderConfig;
pub use http::{HttpConfig, HttpConfigBuilder};
pub use model::Model;
pub use tool_calls::{
    ApplyPatchCall, ApplyPatchCallOutput, ComputerAction, ComputerCall, ComputerCallOutput,
    FunctionCall, HostedToolCall, HostedToolOutput, ImageGenerationCall, PatchOperation,
    PatchOperationKind, SafetyCheck, ShellAction, ShellCall, ShellCallOutput, ShellCommandOutput,
    ToolCallResult, ToolOutcome,
};
