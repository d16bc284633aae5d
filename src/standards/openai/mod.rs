//! OpenAI wire protocols.
//!
//! - `chat`: Chat Completions, spoken by OpenAI, Azure, OpenRouter and Ollama
//! - `responses`: the Responses API, used on OpenAI and Azure when a request
//!   declares hosted tools, sends hosted tool outputs or continues a previous
//!   response

pub mod chat;
pub mod responses;

use crate::types::FinishReason;

pub(crate) fn map_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "stop" | "completed" => FinishReason::Stop,
        "length" | "max_tokens" | "max_output_tokens" => FinishReason::Length,
        "tool_calls" | "function_call" => FinishReason::ToolCalls,
        "content_filter" => FinishReason::ContentFilter,
        other => FinishReason::Other(other.to_string()),
    }
}
