//! Anthropic Messages API translation.

use eventsource_stream::Event;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::defaults;
use crate::error::LlmError;
use crate::standards::{decode_body, decode_envelope, decode_event_data, split_data_uri};
use crate::streaming::{DecodedEvent, StreamDecoder, StreamDelta, ToolCallDelta};
use crate::types::{
    Backend, ChatMessage, ChatRequest, ChatResponse, ContentPart, FinishReason, FunctionCall,
    MessageContent, MessageRole, ToolCallResult, Usage,
};

/// Build the `/messages` body.
pub fn build_messages_request(
    model_id: &str,
    req: &ChatRequest,
    stream: bool,
) -> Result<Value, LlmError> {
    let mut body = Map::new();
    body.insert("model".into(), json!(model_id));
    if let Some(system) = req.system_prompt() {
        body.insert("system".into(), json!(system));
    }
    body.insert(
        "messages".into(),
        Value::Array(req.conversation().map(convert_message).collect()),
    );

    let budget = req.reasoning_effort.map(|e| e.budget_tokens());
    let mut max_tokens = req.max_tokens.unwrap_or(defaults::anthropic::MAX_TOKENS);
    if let Some(budget) = budget {
        // max_tokens must exceed the thinking budget
        if max_tokens <= budget {
            max_tokens = budget.saturating_add(defaults::anthropic::MAX_TOKENS);
        }
        body.insert(
            "thinking".into(),
            json!({"type": "enabled", "budget_tokens": budget}),
        );
    } else if let Some(temperature) = req.temperature {
        body.insert("temperature".into(), json!(temperature));
    }
    body.insert("max_tokens".into(), json!(max_tokens));

    let mut tools: Vec<Value> = req
        .tools
        .iter()
        .map(|tool| {
            let mut out = Map::new();
            out.insert("name".into(), json!(tool.name));
            if let Some(description) = &tool.description {
                out.insert("description".into(), json!(description));
            }
            out.insert("input_schema".into(), tool.parameters.clone());
            Value::Object(out)
        })
        .collect();
    tools.extend(req.builtin_tools.iter().map(|tool| tool.to_wire()));
    if !tools.is_empty() {
        body.insert("tools".into(), Value::Array(tools));
    }

    if stream {
        body.insert("stream".into(), json!(true));
    }
    Ok(Value::Object(body))
}

fn convert_message(message: &ChatMessage) -> Value {
    match message.role {
        MessageRole::Tool => json!({
            "role": "user",
            "content": [{
                "type": "tool_result",
                "tool_use_id": message.tool_call_id.clone().unwrap_or_default(),
                "content": message.text(),
            }],
        }),
        MessageRole::Assistant if !message.tool_calls.is_empty() => {
            let mut blocks = Vec::new();
            let text = message.text();
            if !text.is_empty() {
                blocks.push(json!({"type": "text", "text": text}));
            }
            for call in &message.tool_calls {
                let input = call.parsed_arguments().unwrap_or_else(|_| json!({}));
                blocks.push(json!({
                    "type": "tool_use",
                    "id": call.call_id,
                    "name": call.name,
                    "input": input,
                }));
            }
            json!({"role": "assistant", "content": blocks})
        }
        role => {
            let role = if role == MessageRole::Assistant {
                "assistant"
            } else {
                "user"
            };
            json!({"role": role, "content": convert_content(&message.content)})
        }
    }
}

fn convert_content(content: &MessageContent) -> Value {
    match content {
        MessageContent::Text(text) => json!(text),
        MessageContent::MultiModal(parts) => Value::Array(
            parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => json!({"type": "text", "text": text}),
                    ContentPart::Image { url, .. } => {
                        let source = match split_data_uri(url) {
                            Some((media_type, data)) => json!({
                                "type": "base64",
                                "media_type": media_type,
                                "data": data,
                            }),
                            None => json!({"type": "url", "url": url}),
                        };
                        json!({"type": "image", "source": source})
                    }
                })
                .collect(),
        ),
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    content: Vec<Value>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

impl From<AnthropicUsage> for Usage {
    fn from(u: AnthropicUsage) -> Self {
        Usage::new(u.input_tokens, u.output_tokens)
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
    },
}

fn map_stop_reason(reason: &str) -> FinishReason {
    match reason {
        "end_turn" | "stop_sequence" => FinishReason::Stop,
        "max_tokens" => FinishReason::Length,
        "tool_use" => FinishReason::ToolCalls,
        "refusal" => FinishReason::ContentFilter,
        other => FinishReason::Other(other.to_string()),
    }
}

/// Decode a `/messages` body. Thinking blocks are not part of the answer text.
pub fn parse_messages_response(backend: Backend, body: &[u8]) -> Result<ChatResponse, LlmError> {
    let value = decode_body(backend, body)?;
    let message: MessagesResponse = decode_envelope(backend, value, body)?;

    let mut content = String::new();
    let mut tool_calls = Vec::new();
    for raw in message.content {
        match serde_json::from_value::<ContentBlock>(raw) {
            Ok(ContentBlock::Text { text }) => content.push_str(&text),
            Ok(ContentBlock::ToolUse { id, name, input }) => {
                let arguments = if input.is_null() {
                    "{}".to_string()
                } else {
                    input.to_string()
                };
                tool_calls.push(ToolCallResult::Function(FunctionCall::new(id, name, arguments)));
            }
            Ok(ContentBlock::Thinking { .. }) => {}
            Err(e) => tracing::debug!(backend = %backend, error = %e, "skipping content block"),
        }
    }

    Ok(ChatResponse {
        id: message.id,
        model: message.model,
        content,
        usage: message.usage.map(Usage::from).unwrap_or_default(),
        tool_calls,
        finish_reason: message.stop_reason.as_deref().map(map_stop_reason),
        ..Default::default()
    })
}

/// Stateful decoder for Messages API stream events.
///
/// Input tokens arrive in `message_start`, output tokens in `message_delta`;
/// tool-use blocks are keyed by their content block index.
#[derive(Debug)]
pub struct MessagesStreamDecoder {
    backend: Backend,
    input_tokens: u32,
}

impl MessagesStreamDecoder {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            input_tokens: 0,
        }
    }
}

impl StreamDecoder for MessagesStreamDecoder {
    fn decode(&mut self, event: &Event) -> Result<DecodedEvent, LlmError> {
        let Some(value) = decode_event_data(self.backend, &event.data)? else {
            return Ok(DecodedEvent::none());
        };
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or(event.event.as_str());
        let index = || {
            value
                .get("index")
                .and_then(Value::as_u64)
                .and_then(|i| u32::try_from(i).ok())
                .unwrap_or_default()
        };

        let decoded = match kind {
            "message_start" => {
                self.input_tokens = value
                    .pointer("/message/usage/input_tokens")
                    .and_then(Value::as_u64)
                    .and_then(|n| u32::try_from(n).ok())
                    .unwrap_or_default();
                DecodedEvent::none()
            }
            "content_block_start" => {
                let block = value.get("content_block");
                if block.and_then(|b| b.get("type")).and_then(Value::as_str) == Some("tool_use") {
                    let field = |key: &str| {
                        block
                            .and_then(|b| b.get(key))
                            .and_then(Value::as_str)
                            .map(str::to_string)
                    };
                    DecodedEvent::deltas(vec![StreamDelta::ToolCall(ToolCallDelta {
                        index: index(),
                        call_id: field("id"),
                        name: field("name"),
                        arguments: String::new(),
                    })])
                } else {
                    DecodedEvent::none()
                }
            }
            "content_block_delta" => {
                let delta = value.get("delta");
                let field = |key: &str| {
                    delta
                        .and_then(|d| d.get(key))
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                };
                match delta.and_then(|d| d.get("type")).and_then(Value::as_str) {
                    Some("text_delta") => DecodedEvent::deltas(vec![StreamDelta::Text(field("text"))]),
                    Some("thinking_delta") => {
                        DecodedEvent::deltas(vec![StreamDelta::Thinking(field("thinking"))])
                    }
                    Some("input_json_delta") => {
                        DecodedEvent::deltas(vec![StreamDelta::ToolCall(ToolCallDelta {
                            index: index(),
                            arguments: field("partial_json"),
                            ..Default::default()
                        })])
                    }
                    _ => DecodedEvent::none(),
                }
            }
            "message_delta" => {
                let mut deltas = Vec::new();
                if let Some(output) = value
                    .pointer("/usage/output_tokens")
                    .and_then(Value::as_u64)
                    .and_then(|n| u32::try_from(n).ok())
                {
                    deltas.push(StreamDelta::Usage(Usage::new(self.input_tokens, output)));
                }
                if let Some(reason) = value.pointer("/delta/stop_reason").and_then(Value::as_str) {
                    deltas.push(StreamDelta::Finish(map_stop_reason(reason)));
                }
                DecodedEvent::deltas(deltas)
            }
            "message_stop" => DecodedEvent::done(),
            // ping, content_block_stop
            _ => DecodedEvent::none(),
        };
        Ok(decoded)
    }
}
