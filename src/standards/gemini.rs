//! Gemini `generateContent` translation.

use eventsource_stream::Event;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::error::LlmError;
use crate::standards::{decode_body, decode_envelope, decode_event_data, split_data_uri};
use crate::streaming::{DecodedEvent, StreamDecoder, StreamDelta, ToolCallDelta};
use crate::types::{
    Backend, ChatMessage, ChatRequest, ChatResponse, Citation, ContentPart, FinishReason,
    FunctionCall, MessageContent, MessageRole, ToolCallResult, Usage,
};

/// Build the `generateContent` body. The model id travels in the URL.
pub fn build_generate_request(req: &ChatRequest) -> Result<Value, LlmError> {
    let mut body = Map::new();
    if let Some(system) = req.system_prompt() {
        body.insert(
            "systemInstruction".into(),
            json!({"parts": [{"text": system}]}),
        );
    }
    let contents: Vec<Value> = req.conversation().map(|m| convert_message(req, m)).collect();
    body.insert("contents".into(), Value::Array(contents));

    let mut tools = Vec::new();
    if !req.tools.is_empty() {
        let declarations: Vec<Value> = req
            .tools
            .iter()
            .map(|tool| {
                let mut declaration = Map::new();
                declaration.insert("name".into(), json!(tool.name));
                if let Some(description) = &tool.description {
                    declaration.insert("description".into(), json!(description));
                }
                declaration.insert("parameters".into(), tool.parameters.clone());
                Value::Object(declaration)
            })
            .collect();
        tools.push(json!({"functionDeclarations": declarations}));
    }
    tools.extend(req.builtin_tools.iter().map(|tool| tool.to_wire()));
    if !tools.is_empty() {
        body.insert("tools".into(), Value::Array(tools));
    }

    let mut generation = Map::new();
    if let Some(temperature) = req.temperature {
        generation.insert("temperature".into(), json!(temperature));
    }
    if let Some(max_tokens) = req.max_tokens {
        generation.insert("maxOutputTokens".into(), json!(max_tokens));
    }
    if req.json_mode {
        generation.insert("responseMimeType".into(), json!("application/json"));
    }
    if let Some(effort) = req.reasoning_effort {
        generation.insert(
            "thinkingConfig".into(),
            json!({"thinkingBudget": effort.budget_tokens()}),
        );
    }
    if !generation.is_empty() {
        body.insert("generationConfig".into(), Value::Object(generation));
    }
    Ok(Value::Object(body))
}

fn convert_message(req: &ChatRequest, message: &ChatMessage) -> Value {
    match message.role {
        MessageRole::Tool => {
            // functionResponse is keyed by name, not call id
            let call_id = message.tool_call_id.as_deref().unwrap_or_default();
            let name = req
                .messages
                .iter()
                .flat_map(|m| m.tool_calls.iter())
                .find(|c| c.call_id == call_id)
                .map_or(call_id, |c| c.name.as_str());
            json!({
                "role": "user",
                "parts": [{"functionResponse": {
                    "name": name,
                    "response": {"content": message.text()},
                }}],
            })
        }
        MessageRole::Assistant => {
            let mut parts = Vec::new();
            let text = message.text();
            if !text.is_empty() {
                parts.push(json!({"text": text}));
            }
            for call in &message.tool_calls {
                let args = call.parsed_arguments().unwrap_or_else(|_| json!({}));
                parts.push(json!({"functionCall": {"name": call.name, "args": args}}));
            }
            json!({"role": "model", "parts": parts})
        }
        MessageRole::User | MessageRole::System => {
            json!({"role": "user", "parts": convert_parts(&message.content)})
        }
    }
}

fn convert_parts(content: &MessageContent) -> Vec<Value> {
    match content {
        MessageContent::Text(text) => vec![json!({"text": text})],
        MessageContent::MultiModal(parts) => parts
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => json!({"text": text}),
                ContentPart::Image { url, .. } => match split_data_uri(url) {
                    Some((mime_type, data)) => {
                        json!({"inlineData": {"mimeType": mime_type, "data": data}})
                    }
                    None => json!({"fileData": {"fileUri": url}}),
                },
            })
            .collect(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    response_id: Option<String>,
    #[serde(default)]
    model_version: Option<String>,
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
    #[serde(default)]
    function_call: Option<WireFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct WireFunctionCall {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    thoughts_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

impl From<UsageMetadata> for Usage {
    fn from(u: UsageMetadata) -> Self {
        let completion = u.candidates_token_count.saturating_add(u.thoughts_token_count);
        Usage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: completion,
            total_tokens: if u.total_token_count > 0 {
                u.total_token_count
            } else {
                u.prompt_token_count.saturating_add(completion)
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct WebSource {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

fn map_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::Length,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => {
            FinishReason::ContentFilter
        }
        other => FinishReason::Other(other.to_string()),
    }
}

/// Text, thinking and function calls of one candidate.
struct CandidateParts {
    text: String,
    thinking: String,
    calls: Vec<FunctionCall>,
}

fn split_parts(backend: Backend, parts: Vec<Value>, call_offset: usize) -> CandidateParts {
    let mut out = CandidateParts {
        text: String::new(),
        thinking: String::new(),
        calls: Vec::new(),
    };
    for raw in parts {
        let part = match serde_json::from_value::<Part>(raw) {
            Ok(part) => part,
            Err(e) => {
                tracing::debug!(backend = %backend, error = %e, "skipping candidate part");
                continue;
            }
        };
        if let Some(call) = part.function_call {
            // Gemini rarely assigns call ids; synthesize stable ones.
            let call_id = call
                .id
                .unwrap_or_else(|| format!("call_{}", call_offset + out.calls.len()));
            let args = if call.args.is_null() {
                "{}".to_string()
            } else {
                call.args.to_string()
            };
            out.calls.push(FunctionCall::new(call_id, call.name, args));
        } else if let Some(text) = part.text {
            if part.thought {
                out.thinking.push_str(&text);
            } else {
                out.text.push_str(&text);
            }
        }
    }
    out
}

/// Decode a `generateContent` body.
pub fn parse_generate_response(backend: Backend, body: &[u8]) -> Result<ChatResponse, LlmError> {
    let value = decode_body(backend, body)?;
    let response: GenerateResponse = decode_envelope(backend, value, body)?;

    let candidate = response.candidates.into_iter().next();
    let finish = candidate.as_ref().and_then(|c| c.finish_reason.as_deref());
    let citations: Vec<Citation> = candidate
        .as_ref()
        .and_then(|c| c.grounding_metadata.as_ref())
        .map(|g| {
            g.grounding_chunks
                .iter()
                .filter_map(|chunk| chunk.web.as_ref())
                .map(|web| Citation {
                    kind: "url_citation".to_string(),
                    url: web.uri.clone(),
                    title: web.title.clone(),
                    ..Default::default()
                })
                .collect()
        })
        .unwrap_or_default();

    let mut finish_reason = finish.map(map_finish_reason);
    let parts = candidate
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default();
    let decoded = split_parts(backend, parts, 0);
    if !decoded.calls.is_empty() && finish_reason == Some(FinishReason::Stop) {
        finish_reason = Some(FinishReason::ToolCalls);
    }

    Ok(ChatResponse {
        id: response.response_id,
        model: response.model_version,
        content: decoded.text,
        usage: response.usage_metadata.map(Usage::from).unwrap_or_default(),
        tool_calls: decoded
            .calls
            .into_iter()
            .map(ToolCallResult::Function)
            .collect(),
        citations,
        finish_reason,
        ..Default::default()
    })
}

/// Decoder for `streamGenerateContent?alt=sse` chunks. Every chunk is a full
/// `GenerateContentResponse` carrying only the new parts; function calls
/// arrive whole.
#[derive(Debug)]
pub struct GenerateStreamDecoder {
    backend: Backend,
    calls_seen: usize,
}

impl GenerateStreamDecoder {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            calls_seen: 0,
        }
    }
}

impl StreamDecoder for GenerateStreamDecoder {
    fn decode(&mut self, event: &Event) -> Result<DecodedEvent, LlmError> {
        let Some(value) = decode_event_data(self.backend, &event.data)? else {
            return Ok(DecodedEvent::none());
        };
        let chunk: GenerateResponse = match serde_json::from_value(value) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::debug!(backend = %self.backend, error = %e, "skipping stream chunk");
                return Ok(DecodedEvent::none());
            }
        };

        let mut deltas = Vec::new();
        let mut finish = None;
        if let Some(candidate) = chunk.candidates.into_iter().next() {
            finish = candidate.finish_reason;
            let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
            let decoded = split_parts(self.backend, parts, self.calls_seen);
            if !decoded.thinking.is_empty() {
                deltas.push(StreamDelta::Thinking(decoded.thinking));
            }
            if !decoded.text.is_empty() {
                deltas.push(StreamDelta::Text(decoded.text));
            }
            for call in decoded.calls {
                deltas.push(StreamDelta::ToolCall(ToolCallDelta {
                    index: self.calls_seen as u32,
                    call_id: Some(call.call_id),
                    name: Some(call.name),
                    arguments: call.arguments,
                }));
                self.calls_seen += 1;
            }
        }
        if let Some(usage) = chunk.usage_metadata {
            deltas.push(StreamDelta::Usage(usage.into()));
        }
        if let Some(reason) = finish {
            let mut reason = map_finish_reason(&reason);
            if reason == FinishReason::Stop && self.calls_seen > 0 {
                reason = FinishReason::ToolCalls;
            }
            deltas.push(StreamDelta::Finish(reason));
        }
        Ok(DecodedEvent::deltas(deltas))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FunctionTool, ReasoningEffort};

    fn event(data: Value) -> Event {
        Event {
            event: "message".to_string(),
            data: data.to_string(),
            id: String::new(),
            retry: None,
        }
    }

    #[test]
    fn request_shape() {
        let req = ChatRequest::new(
            "gemini-2.5-pro",
            vec![
                ChatMessage::system("be brief"),
                ChatMessage::user("weather?"),
                ChatMessage::assistant("")
                    .with_tool_calls(vec![FunctionCall::new("call_0", "weather", r#"{"city":"Oslo"}"#)]),
                ChatMessage::tool("call_0", "rainy"),
            ],
        )
        .with_tool(FunctionTool::new("weather", json!({"type": "object"})).with_description("forecast"))
        .with_json_mode(true)
        .with_max_tokens(256)
        .with_reasoning_effort(ReasoningEffort::Low);
        let body = build_generate_request(&req).unwrap();
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[1]["parts"][0]["functionCall"]["args"]["city"], "Oslo");
        assert_eq!(contents[2]["parts"][0]["functionResponse"]["name"], "weather");
        assert_eq!(body["tools"][0]["functionDeclarations"][0]["description"], "forecast");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
        assert_eq!(body["generationConfig"]["thinkingConfig"]["thinkingBudget"], 2048);
    }

    #[test]
    fn response_with_grounding_and_calls() {
        let body = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "thinking...", "thought": true},
                    {"text": "It is "},
                    {"text": "rainy."},
                    {"functionCall": {"name": "log", "args": {"level": "info"}}}
                ]},
                "finishReason": "STOP",
                "groundingMetadata": {"groundingChunks": [
                    {"web": {"uri": "https://weather.example", "title": "Weather"}}
                ]}
            }],
            "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 6, "totalTokenCount": 10},
            "modelVersion": "gemini-2.5-pro"
        });
        let response =
            parse_generate_response(Backend::Google, body.to_string().as_bytes()).unwrap();
        assert_eq!(response.content, "It is rainy.");
        assert_eq!(response.citations[0].url.as_deref(), Some("https://weather.example"));
        assert_eq!(response.function_calls().next().unwrap().call_id, "call_0");
        assert_eq!(response.finish_reason, Some(FinishReason::ToolCalls));
        assert_eq!(response.usage.total_tokens, 10);
        assert_eq!(response.model.as_deref(), Some("gemini-2.5-pro"));
    }

    #[test]
    fn error_envelope_with_numeric_code() {
        let body = br#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        let err = parse_generate_response(Backend::Google, body).unwrap_err();
        assert_eq!(err.error_code(), Some("INVALID_ARGUMENT"));
    }

    #[test]
    fn stream_chunks() {
        let mut decoder = GenerateStreamDecoder::new(Backend::Google);
        let first = decoder
            .decode(&event(json!({"candidates": [{"content": {"parts": [{"text": "Hel"}]}}]})))
            .unwrap();
        assert_eq!(first.deltas, vec![StreamDelta::Text("Hel".into())]);

        let last = decoder
            .decode(&event(json!({
                "candidates": [{"content": {"parts": [{"text": "lo"}]}, "finishReason": "MAX_TOKENS"}],
                "usageMetadata": {"promptTokenCount": 2, "candidatesTokenCount": 2}
            })))
            .unwrap();
        assert_eq!(
            last.deltas,
            vec![
                StreamDelta::Text("lo".into()),
                StreamDelta::Usage(Usage::new(2, 2)),
                StreamDelta::Finish(FinishReason::Length),
            ]
        );
    }
}
