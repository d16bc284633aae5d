//! Chat Completions translation.

use eventsource_stream::Event;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::map_finish_reason;
use crate::error::LlmError;
use crate::standards::{decode_body, decode_envelope, decode_event_data};
use crate::streaming::{DecodedEvent, StreamDecoder, StreamDelta, ToolCallDelta};
use crate::types::{
    Backend, ChatMessage, ChatRequest, ChatResponse, ContentPart, FunctionCall, MessageContent,
    MessageRole, ToolCallResult, Usage,
};

/// Build the `/chat/completions` body.
pub fn build_chat_request(
    backend: Backend,
    model_id: &str,
    req: &ChatRequest,
    stream: bool,
) -> Result<Value, LlmError> {
    let mut body = Map::new();
    body.insert("model".into(), json!(model_id));
    body.insert(
        "messages".into(),
        Value::Array(req.messages.iter().map(convert_message).collect()),
    );
    if let Some(temperature) = req.temperature {
        body.insert("temperature".into(), json!(temperature));
    }
    if let Some(max_tokens) = req.max_tokens {
        // OpenAI deprecated `max_tokens` for reasoning models; others only know it.
        let key = match backend {
            Backend::OpenAi | Backend::Azure => "max_completion_tokens",
            _ => "max_tokens",
        };
        body.insert(key.into(), json!(max_tokens));
    }
    if let Some(effort) = req.reasoning_effort {
        body.insert("reasoning_effort".into(), json!(effort.as_str()));
    }

    let mut tools: Vec<Value> = req
        .tools
        .iter()
        .map(|tool| {
            let mut function = Map::new();
            function.insert("name".into(), json!(tool.name));
            if let Some(description) = &tool.description {
                function.insert("description".into(), json!(description));
            }
            function.insert("parameters".into(), tool.parameters.clone());
            json!({"type": "function", "function": function})
        })
        .collect();
    tools.extend(req.builtin_tools.iter().map(|tool| tool.to_wire()));
    if !tools.is_empty() {
        body.insert("tools".into(), Value::Array(tools));
    }

    if req.json_mode {
        body.insert("response_format".into(), json!({"type": "json_object"}));
    }
    if stream {
        body.insert("stream".into(), json!(true));
        body.insert("stream_options".into(), json!({"include_usage": true}));
    }
    Ok(Value::Object(body))
}

fn convert_message(message: &ChatMessage) -> Value {
    let mut out = Map::new();
    out.insert("role".into(), json!(message.role.as_str()));
    match message.role {
        MessageRole::Tool => {
            out.insert("content".into(), json!(message.text()));
            if let Some(id) = &message.tool_call_id {
                out.insert("tool_call_id".into(), json!(id));
            }
        }
        MessageRole::Assistant if !message.tool_calls.is_empty() => {
            let text = message.text();
            out.insert(
                "content".into(),
                if text.is_empty() { Value::Null } else { json!(text) },
            );
            let calls: Vec<Value> = message
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.call_id,
                        "type": "function",
                        "function": {"name": call.name, "arguments": call.arguments},
                    })
                })
                .collect();
            out.insert("tool_calls".into(), Value::Array(calls));
        }
        _ => {
            out.insert("content".into(), convert_content(&message.content));
        }
    }
    Value::Object(out)
}

fn convert_content(content: &MessageContent) -> Value {
    match content {
        MessageContent::Text(text) => json!(text),
        MessageContent::MultiModal(parts) => Value::Array(
            parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => json!({"type": "text", "text": text}),
                    ContentPart::Image { url, detail } => {
                        let mut image_url = Map::new();
                        image_url.insert("url".into(), json!(url));
                        if let Some(detail) = detail {
                            image_url.insert("detail".into(), json!(detail));
                        }
                        json!({"type": "image_url", "image_url": image_url})
                    }
                })
                .collect(),
        ),
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<AssistantMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<Value>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
struct CompletionUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

impl From<CompletionUsage> for Usage {
    fn from(u: CompletionUsage) -> Self {
        let total = if u.total_tokens > 0 {
            u.total_tokens
        } else {
            u.prompt_tokens.saturating_add(u.completion_tokens)
        };
        Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: total,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// Decode a `/chat/completions` body.
pub fn parse_chat_response(backend: Backend, body: &[u8]) -> Result<ChatResponse, LlmError> {
    let value = decode_body(backend, body)?;
    let completion: ChatCompletion = decode_envelope(backend, value, body)?;

    let choice = completion.choices.into_iter().next();
    let finish_reason = choice
        .as_ref()
        .and_then(|c| c.finish_reason.as_deref())
        .map(map_finish_reason);
    let message = choice.and_then(|c| c.message).unwrap_or_default();

    let tool_calls = message
        .tool_calls
        .into_iter()
        .filter_map(|raw| match serde_json::from_value::<WireToolCall>(raw) {
            Ok(call) => Some(ToolCallResult::Function(FunctionCall::new(
                call.id,
                call.function.name,
                call.function.arguments,
            ))),
            Err(e) => {
                tracing::debug!(backend = %backend, error = %e, "skipping malformed tool call");
                None
            }
        })
        .collect();

    Ok(ChatResponse {
        id: completion.id,
        model: completion.model,
        content: message.content.unwrap_or_default(),
        usage: completion.usage.map(Usage::from).unwrap_or_default(),
        tool_calls,
        finish_reason,
        ..Default::default()
    })
}

/// Decoder for Chat Completions SSE chunks.
#[derive(Debug)]
pub struct ChatStreamDecoder {
    backend: Backend,
}

impl ChatStreamDecoder {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }
}

impl StreamDecoder for ChatStreamDecoder {
    fn decode(&mut self, event: &Event) -> Result<DecodedEvent, LlmError> {
        let data = event.data.trim();
        if data == "[DONE]" {
            return Ok(DecodedEvent::done());
        }
        let Some(chunk) = decode_event_data(self.backend, data)? else {
            return Ok(DecodedEvent::none());
        };

        let mut deltas = Vec::new();
        if let Some(choice) = chunk.pointer("/choices/0") {
            let delta = choice.get("delta");
            let text_field = |key: &str| {
                delta
                    .and_then(|d| d.get(key))
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
            };
            if let Some(thinking) = text_field("reasoning_content").or_else(|| text_field("reasoning")) {
                deltas.push(StreamDelta::Thinking(thinking.to_string()));
            }
            if let Some(text) = text_field("content") {
                deltas.push(StreamDelta::Text(text.to_string()));
            }
            let calls = delta
                .and_then(|d| d.get("tool_calls"))
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for (position, call) in calls.iter().enumerate() {
                let index = call
                    .get("index")
                    .and_then(Value::as_u64)
                    .and_then(|i| u32::try_from(i).ok())
                    .unwrap_or(position as u32);
                let function = call.get("function");
                deltas.push(StreamDelta::ToolCall(ToolCallDelta {
                    index,
                    call_id: call.get("id").and_then(Value::as_str).map(str::to_string),
                    name: function
                        .and_then(|f| f.get("name"))
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    arguments: function
                        .and_then(|f| f.get("arguments"))
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                }));
            }
            if let Some(reason) = choice.get("finish_reason").and_then(Value::as_str) {
                deltas.push(StreamDelta::Finish(map_finish_reason(reason)));
            }
        }
        if let Some(usage) = chunk
            .get("usage")
            .filter(|u| !u.is_null())
            .and_then(|u| serde_json::from_value::<CompletionUsage>(u.clone()).ok())
        {
            deltas.push(StreamDelta::Usage(usage.into()));
        }
        Ok(DecodedEvent::deltas(deltas))
    }
}
