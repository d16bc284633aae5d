//! Responses API translation, including the polymorphic output item decoder.
//!
//! Output items are decoded one at a time. An item that does not match its
//! discriminator's shape is logged and skipped; the rest of the body is still
//! used. The `action` field is shared by `computer_call` and `shell_call`
//! with different payload shapes, so it is kept raw and decoded against the
//! item's own discriminator; a mismatch drops only that field.

use eventsource_stream::Event;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use super::map_finish_reason;
use crate::error::LlmError;
use crate::hosted_tools::openai::BuiltinTool;
use crate::retry::ErrorEnvelope;
use crate::standards::{decode_body, decode_envelope, decode_event_data};
use crate::streaming::{DecodedEvent, StreamDecoder, StreamDelta, ToolCallDelta};
use crate::types::{
    ApplyPatchCall, Backend, ChatMessage, ChatRequest, ChatResponse, Citation, ComputerAction,
    ComputerCall, ContentPart, FinishReason, FunctionCall, HostedToolCall, ImageGenerationCall,
    MessageContent, MessageRole, PatchOperation, SafetyCheck, ShellAction, ShellCall,
    ToolCallResult, ToolOutcome, Usage,
};

/// Build the `/responses` body.
pub fn build_responses_request(
    model_id: &str,
    req: &ChatRequest,
    stream: bool,
) -> Result<Value, LlmError> {
    let mut body = Map::new();
    body.insert("model".into(), json!(model_id));
    body.insert("input".into(), build_input(req));
    if let Some(instructions) = req.system_prompt() {
        body.insert("instructions".into(), json!(instructions));
    }

    let mut tools: Vec<Value> = req.builtin_tools.iter().map(BuiltinTool::to_wire).collect();
    tools.extend(req.tools.iter().map(|tool| {
        let mut function = Map::new();
        function.insert("type".into(), json!("function"));
        function.insert("name".into(), json!(tool.name));
        if let Some(description) = &tool.description {
            function.insert("description".into(), json!(description));
        }
        function.insert("parameters".into(), tool.parameters.clone());
        Value::Object(function)
    }));
    if !tools.is_empty() {
        body.insert("tools".into(), Value::Array(tools));
        body.insert("tool_choice".into(), json!("auto"));
    }

    if let Some(temperature) = req.temperature {
        body.insert("temperature".into(), json!(temperature));
    }
    if let Some(max_tokens) = req.max_tokens {
        body.insert("max_output_tokens".into(), json!(max_tokens));
    }
    if let Some(effort) = req.reasoning_effort {
        body.insert("reasoning".into(), json!({"effort": effort.as_str()}));
    }
    if req.json_mode {
        body.insert("text".into(), json!({"format": {"type": "json_object"}}));
    }
    if let Some(previous) = &req.previous_response_id {
        body.insert("previous_response_id".into(), json!(previous));
    }
    if stream {
        body.insert("stream".into(), json!(true));
    }
    Ok(Value::Object(body))
}

/// A single plain-text user message becomes a bare string; anything else is
/// a list of input items.
fn build_input(req: &ChatRequest) -> Value {
    let conversation: Vec<&ChatMessage> = req.conversation().collect();
    if let [only] = conversation.as_slice()
        && only.role == MessageRole::User
        && req.hosted_tool_outputs.is_empty()
        && let MessageContent::Text(text) = &only.content
    {
        return json!(text);
    }

    let mut items = Vec::new();
    for message in conversation {
        match message.role {
            MessageRole::Tool => items.push(json!({
                "type": "function_call_output",
                "call_id": message.tool_call_id.clone().unwrap_or_default(),
                "output": message.text(),
            })),
            MessageRole::Assistant => {
                let text = message.text();
                if !text.is_empty() {
                    items.push(json!({"role": "assistant", "content": text}));
                }
                items.extend(message.tool_calls.iter().map(|call| {
                    json!({
                        "type": "function_call",
                        "call_id": call.call_id,
                        "name": call.name,
                        "arguments": call.arguments,
                    })
                }));
            }
            MessageRole::User | MessageRole::System => items.push(json!({
                "role": message.role.as_str(),
                "content": input_content(&message.content),
            })),
        }
    }
    items.extend(req.hosted_tool_outputs.iter().map(|out| out.to_wire()));
    Value::Array(items)
}

fn input_content(content: &MessageContent) -> Value {
    match content {
        MessageContent::Text(text) => json!(text),
        MessageContent::MultiModal(parts) => Value::Array(
            parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => json!({"type": "input_text", "text": text}),
                    ContentPart::Image { url, detail } => {
                        let mut image = Map::new();
                        image.insert("type".into(), json!("input_image"));
                        image.insert("image_url".into(), json!(url));
                        if let Some(detail) = detail {
                            image.insert("detail".into(), json!(detail));
                        }
                        Value::Object(image)
                    }
                })
                .collect(),
        ),
    }
}

#[derive(Debug, Deserialize)]
struct ResponsesEnvelope {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    output: Vec<Value>,
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    usage: Option<ResponsesUsage>,
    #[serde(default)]
    incomplete_details: Option<IncompleteDetails>,
    #[serde(default)]
    tools: Vec<Value>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
struct ResponsesUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

impl From<ResponsesUsage> for Usage {
    fn from(u: ResponsesUsage) -> Self {
        Usage {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
            total_tokens: if u.total_tokens > 0 {
                u.total_tokens
            } else {
                u.input_tokens.saturating_add(u.output_tokens)
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct IncompleteDetails {
    #[serde(default)]
    reason: Option<String>,
}

/// Wire shape shared by every output item. Fields outside an item's own
/// discriminator are ignored.
#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    call_id: Option<String>,
    #[serde(default)]
    content: Vec<RawContent>,
    #[serde(default)]
    server_label: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    outputs: Option<Vec<Value>>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    revised_prompt: Option<String>,
    #[serde(default)]
    result: Option<String>,
    /// Deferred: `ComputerAction` or `ShellAction` depending on `kind`.
    #[serde(default)]
    action: Option<Value>,
    #[serde(default)]
    pending_safety_checks: Vec<SafetyCheck>,
    #[serde(default)]
    operation: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    annotations: Vec<Value>,
}

/// Text, citations and typed tool calls decoded from `output`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DecodedOutput {
    pub text: String,
    pub citations: Vec<Citation>,
    pub tool_calls: Vec<ToolCallResult>,
}

/// Decode raw output items. Never fails: malformed items are skipped.
pub fn decode_output_items(items: &[Value]) -> DecodedOutput {
    let mut out = DecodedOutput::default();
    for (index, item) in items.iter().enumerate() {
        let raw = match RawItem::deserialize(item) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(index, error = %e, "skipping malformed output item");
                continue;
            }
        };
        match decode_item(raw, &mut out) {
            Ok(()) => {}
            Err(reason) => tracing::debug!(index, reason, "skipping output item"),
        }
    }
    out
}

fn decode_item(raw: RawItem, out: &mut DecodedOutput) -> Result<(), &'static str> {
    let id = raw.id.clone().unwrap_or_default();
    let call = match raw.kind.as_str() {
        "message" => {
            for part in raw.content {
                if !matches!(part.kind.as_str(), "output_text" | "text") {
                    continue;
                }
                if let Some(text) = &part.text {
                    out.text.push_str(text);
                }
                out.citations.extend(
                    part.annotations
                        .into_iter()
                        .filter_map(|a| deferred::<Citation>(a, "annotation")),
                );
            }
            return Ok(());
        }
        "function_call" => {
            let (Some(call_id), Some(name)) = (raw.call_id, raw.name) else {
                return Err("function_call without call_id or name");
            };
            ToolCallResult::Function(FunctionCall {
                id: raw.id,
                call_id,
                name,
                arguments: raw.arguments.unwrap_or_default(),
            })
        }
        kind @ ("web_search_call" | "file_search_call" | "mcp_call" | "code_interpreter_call") => {
            let outcome = tool_outcome(raw.error.as_ref(), raw.output.as_ref(), raw.outputs.as_deref());
            let hosted = HostedToolCall {
                id,
                status: raw.status,
                call_id: raw.call_id,
                server_label: raw.server_label,
                name: raw.name,
                arguments: raw.arguments,
                outcome,
            };
            match kind {
                "web_search_call" => ToolCallResult::WebSearch(hosted),
                "file_search_call" => ToolCallResult::FileSearch(hosted),
                "mcp_call" => ToolCallResult::Mcp(hosted),
                _ => ToolCallResult::CodeInterpreter(hosted),
            }
        }
        "image_generation_call" => ToolCallResult::ImageGeneration(ImageGenerationCall {
            id,
            status: raw.status,
            revised_prompt: raw.revised_prompt,
            result: raw.result,
        }),
        "computer_call" => ToolCallResult::ComputerUse(ComputerCall {
            id,
            status: raw.status,
            call_id: raw.call_id,
            action: raw.action.and_then(|a| deferred::<ComputerAction>(a, "computer action")),
            pending_safety_checks: raw.pending_safety_checks,
        }),
        "shell_call" => ToolCallResult::Shell(ShellCall {
            id,
            status: raw.status,
            call_id: raw.call_id,
            action: raw.action.and_then(|a| deferred::<ShellAction>(a, "shell action")),
        }),
        "apply_patch_call" => ToolCallResult::ApplyPatch(ApplyPatchCall {
            id,
            status: raw.status,
            call_id: raw.call_id,
            operation: raw
                .operation
                .filter(|op| !op.is_null())
                .and_then(|op| deferred::<PatchOperation>(op, "patch operation")),
        }),
        // reasoning summaries and anything newer than this decoder
        _ => return Ok(()),
    };
    out.tool_calls.push(call);
    Ok(())
}

/// Decode a raw field into its target shape, dropping it on mismatch.
fn deferred<T: DeserializeOwned>(raw: Value, what: &'static str) -> Option<T> {
    match serde_json::from_value(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(field = what, error = %e, "dropping undecodable field");
            None
        }
    }
}

fn tool_outcome(
    error: Option<&Value>,
    output: Option<&Value>,
    outputs: Option<&[Value]>,
) -> Option<ToolOutcome> {
    let error_text = error.and_then(|e| match e {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(o) => o.get("message").and_then(Value::as_str).map(str::to_string),
        _ => None,
    });
    if let Some(error) = error_text {
        return Some(ToolOutcome::Error(error));
    }
    if let Some(Value::String(text)) = output {
        return Some(ToolOutcome::Output(text.clone()));
    }
    let logs: Vec<&str> = outputs
        .unwrap_or_default()
        .iter()
        .filter_map(|o| o.get("logs").and_then(Value::as_str))
        .collect();
    (!logs.is_empty()).then(|| ToolOutcome::Output(logs.join("\n")))
}

/// Decode a `/responses` body.
pub fn parse_responses_response(backend: Backend, body: &[u8]) -> Result<ChatResponse, LlmError> {
    let value = decode_body(backend, body)?;
    let envelope: ResponsesEnvelope = decode_envelope(backend, value, body)?;

    let mut decoded = decode_output_items(&envelope.output);
    if decoded.text.is_empty()
        && let Some(text) = envelope.output_text.filter(|t| !t.is_empty())
    {
        decoded.text = text;
    }

    let finish_reason = if decoded
        .tool_calls
        .iter()
        .any(|c| matches!(c, ToolCallResult::Function(_)))
    {
        Some(FinishReason::ToolCalls)
    } else {
        match envelope.status.as_deref() {
            Some("incomplete") => Some(
                envelope
                    .incomplete_details
                    .and_then(|d| d.reason)
                    .map_or(FinishReason::Length, |r| map_finish_reason(&r)),
            ),
            Some(status) => Some(map_finish_reason(status)),
            None => None,
        }
    };

    let hosted_tools = envelope
        .tools
        .iter()
        .filter(|t| t.get("type").and_then(Value::as_str) != Some("function"))
        .filter_map(|t| match BuiltinTool::from_wire(t) {
            Ok(tool) => Some(tool),
            Err(e) => {
                tracing::debug!(error = %e, "skipping unrecognized echoed tool");
                None
            }
        })
        .collect();

    Ok(ChatResponse {
        id: envelope.id,
        model: envelope.model,
        content: decoded.text,
        usage: envelope.usage.map(Usage::from).unwrap_or_default(),
        tool_calls: decoded.tool_calls,
        citations: decoded.citations,
        finish_reason,
        hosted_tools,
    })
}

/// Decoder for Responses API stream events.
#[derive(Debug)]
pub struct ResponsesStreamDecoder {
    backend: Backend,
}

impl ResponsesStreamDecoder {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }
}

impl StreamDecoder for ResponsesStreamDecoder {
    fn decode(&mut self, event: &Event) -> Result<DecodedEvent, LlmError> {
        let data = event.data.trim();
        if data == "[DONE]" {
            return Ok(DecodedEvent::done());
        }
        let value: Value = match serde_json::from_str(data) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(error = %e, "skipping undecodable responses event");
                return Ok(DecodedEvent::none());
            }
        };
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or(event.event.as_str());
        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let output_index = || {
            value
                .get("output_index")
                .and_then(Value::as_u64)
                .and_then(|i| u32::try_from(i).ok())
                .unwrap_or_default()
        };

        let decoded = match kind {
            "response.output_text.delta" => {
                DecodedEvent::deltas(vec![StreamDelta::Text(text("delta"))])
            }
            "response.reasoning_summary_text.delta" | "response.reasoning_text.delta" => {
                DecodedEvent::deltas(vec![StreamDelta::Thinking(text("delta"))])
            }
            "response.output_item.added" => {
                let item = value.get("item");
                if item.and_then(|i| i.get("type")).and_then(Value::as_str) == Some("function_call")
                {
                    let field = |key: &str| {
                        item.and_then(|i| i.get(key))
                            .and_then(Value::as_str)
                            .map(str::to_string)
                    };
                    DecodedEvent::deltas(vec![StreamDelta::ToolCall(ToolCallDelta {
                        index: output_index(),
                        call_id: field("call_id"),
                        name: field("name"),
                        arguments: String::new(),
                    })])
                } else {
                    DecodedEvent::none()
                }
            }
            "response.function_call_arguments.delta" => {
                DecodedEvent::deltas(vec![StreamDelta::ToolCall(ToolCallDelta {
                    index: output_index(),
                    arguments: text("delta"),
                    ..Default::default()
                })])
            }
            "response.completed" | "response.incomplete" => {
                let response = value.get("response");
                let mut deltas = Vec::new();
                if let Some(usage) = response
                    .and_then(|r| r.get("usage"))
                    .and_then(|u| serde_json::from_value::<ResponsesUsage>(u.clone()).ok())
                {
                    deltas.push(StreamDelta::Usage(usage.into()));
                }
                deltas.push(StreamDelta::Finish(if kind == "response.completed" {
                    FinishReason::Stop
                } else {
                    FinishReason::Length
                }));
                DecodedEvent {
                    deltas,
                    done: true,
                }
            }
            "response.failed" => {
                let envelope = value
                    .get("response")
                    .and_then(ErrorEnvelope::from_value)
                    .unwrap_or_else(|| ErrorEnvelope {
                        message: "response failed".to_string(),
                        code: None,
                    });
                return Err(envelope.into_error(self.backend));
            }
            "error" => {
                return Err(LlmError::ProviderError {
                    backend: self.backend,
                    message: value
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("stream error")
                        .to_string(),
                    error_code: value.get("code").and_then(Value::as_str).map(str::to_string),
                });
            }
            _ => {
                // Some proxies wrap failures in a plain error envelope.
                decode_event_data(self.backend, data)?;
                DecodedEvent::none()
            }
        };
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hosted_tools::openai;
    use crate::types::{HostedToolOutput, ShellCallOutput, ShellCommandOutput};

    fn event(data: Value) -> Event {
        Event {
            event: "message".to_string(),
            data: data.to_string(),
            id: String::new(),
            retry: None,
        }
    }

    #[test]
    fn single_user_message_is_a_string_input() {
        let req = ChatRequest::new(
            "gpt-5",
            vec![ChatMessage::system("be terse"), ChatMessage::user("hi")],
        )
        .with_builtin_tool(openai::web_search().build());
        let body = build_responses_request("gpt-5", &req, false).unwrap();
        assert_eq!(body["input"], "hi");
        assert_eq!(body["instructions"], "be terse");
        assert_eq!(body["tools"][0]["type"], "web_search");
        assert_eq!(body["tool_choice"], "auto");
    }

    #[test]
    fn multi_turn_input_with_hosted_outputs() {
        let req = ChatRequest::new(
            "gpt-5",
            vec![
                ChatMessage::user("list files"),
                ChatMessage::assistant("running").with_tool_calls(vec![FunctionCall::new(
                    "call_9", "ls", "{}",
                )]),
                ChatMessage::tool("call_9", "a.txt"),
            ],
        )
        .with_reasoning_effort(crate::types::ReasoningEffort::High)
        .with_json_mode(true)
        .with_previous_response_id("resp_1")
        .with_hosted_tool_output(HostedToolOutput::Shell(ShellCallOutput {
            call_id: "sh_1".into(),
            output: vec![ShellCommandOutput {
                stdout: "ok".into(),
                stderr: String::new(),
                exit_code: Some(0),
            }],
            max_output_length: None,
        }));
        let body = build_responses_request("gpt-5", &req, true).unwrap();
        let input = body["input"].as_array().unwrap();
        assert_eq!(input[0]["role"], "user");
        assert_eq!(input[1]["role"], "assistant");
        assert_eq!(input[2]["type"], "function_call");
        assert_eq!(input[3]["type"], "function_call_output");
        assert_eq!(input[4]["type"], "shell_call_output");
        assert_eq!(body["reasoning"]["effort"], "high");
        assert_eq!(body["text"]["format"]["type"], "json_object");
        assert_eq!(body["previous_response_id"], "resp_1");
        assert_eq!(body["stream"], true);
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn decodes_every_output_item_kind() {
        let items = json!([
            {"type": "web_search_call", "id": "ws_1", "status": "completed"},
            {"type": "message", "id": "msg_1", "role": "assistant", "content": [
                {"type": "output_text", "text": "See ", "annotations": [
                    {"type": "url_citation", "url": "https://a", "title": "A", "start_index": 0, "end_index": 3}
                ]},
                {"type": "output_text", "text": "docs", "annotations": [
                    {"type": "file_citation", "file_id": "file_1", "filename": "f.pdf"}
                ]}
            ]},
            {"type": "file_search_call", "id": "fs_1", "status": "completed"},
            {"type": "mcp_call", "id": "mcp_1", "server_label": "deepwiki", "name": "ask", "arguments": "{}", "output": "answer"},
            {"type": "code_interpreter_call", "id": "ci_1", "outputs": [{"type": "logs", "logs": "2"}]},
            {"type": "image_generation_call", "id": "ig_1", "revised_prompt": "a cat", "result": "iVBOR"},
            {"type": "computer_call", "id": "cu_1", "call_id": "c1", "action": {"type": "click", "x": 10, "y": 20, "button": "left"},
             "pending_safety_checks": [{"id": "sc_1", "code": "malicious_instructions", "message": "careful"}]},
            {"type": "shell_call", "id": "sh_1", "call_id": "c2", "action": {"commands": ["ls -la"], "timeout_ms": 1000}},
            {"type": "apply_patch_call", "id": "ap_1", "call_id": "c3", "operation": {"type": "update_file", "path": "src/lib.rs", "diff": "@@"}},
            {"type": "function_call", "id": "fc_1", "call_id": "c4", "name": "lookup", "arguments": "{\"q\":1}"},
            {"type": "reasoning", "id": "rs_1", "summary": []}
        ]);
        let out = decode_output_items(items.as_array().unwrap());
        assert_eq!(out.text, "See docs");
        assert_eq!(out.citations.len(), 2);
        assert_eq!(out.citations[0].url.as_deref(), Some("https://a"));
        assert_eq!(out.citations[1].filename.as_deref(), Some("f.pdf"));
        assert_eq!(out.tool_calls.len(), 9);

        match &out.tool_calls[2] {
            ToolCallResult::Mcp(call) => {
                assert_eq!(call.server_label.as_deref(), Some("deepwiki"));
                assert_eq!(call.outcome, Some(ToolOutcome::Output("answer".into())));
            }
            other => panic!("unexpected {other:?}"),
        }
        match &out.tool_calls[3] {
            ToolCallResult::CodeInterpreter(call) => {
                assert_eq!(call.outcome, Some(ToolOutcome::Output("2".into())))
            }
            other => panic!("unexpected {other:?}"),
        }
        match &out.tool_calls[5] {
            ToolCallResult::ComputerUse(call) => {
                let action = call.action.as_ref().unwrap();
                assert_eq!(action.kind, "click");
                assert_eq!((action.x, action.y), (Some(10), Some(20)));
                assert_eq!(call.pending_safety_checks[0].id, "sc_1");
            }
            other => panic!("unexpected {other:?}"),
        }
        match &out.tool_calls[6] {
            ToolCallResult::Shell(call) => {
                let action = call.action.as_ref().unwrap();
                assert_eq!(action.commands, vec!["ls -la".to_string()]);
                assert_eq!(action.timeout_ms, Some(1000));
            }
            other => panic!("unexpected {other:?}"),
        }
        match &out.tool_calls[7] {
            ToolCallResult::ApplyPatch(call) => {
                let op = call.operation.as_ref().unwrap();
                assert_eq!(op.path, "src/lib.rs");
                assert_eq!(op.diff.as_deref(), Some("@@"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn mismatched_action_shape_drops_only_the_action() {
        let items = json!([
            {"type": "shell_call", "id": "sh_1", "call_id": "c1", "status": "in_progress",
             "action": {"type": "click", "x": 1, "y": 2}},
            {"type": "computer_call", "id": "cu_1", "call_id": "c2",
             "action": {"commands": ["rm -rf /"]}}
        ]);
        let out = decode_output_items(items.as_array().unwrap());
        assert_eq!(out.tool_calls.len(), 2);
        match &out.tool_calls[0] {
            ToolCallResult::Shell(call) => {
                assert!(call.action.is_none());
                assert_eq!(call.status.as_deref(), Some("in_progress"));
                assert_eq!(call.call_id.as_deref(), Some("c1"));
            }
            other => panic!("unexpected {other:?}"),
        }
        match &out.tool_calls[1] {
            ToolCallResult::ComputerUse(call) => assert!(call.action.is_none()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn malformed_item_is_skipped() {
        let body = json!({
            "id": "resp_1",
            "status": "completed",
            "output": [
                {"type": "message", "content": [{"type": "output_text", "text": "hello"}]},
                {"type": "web_search_call", "id": 42, "status": ["bad"]},
                {"no_type": true}
            ],
            "usage": {"input_tokens": 3, "output_tokens": 2, "total_tokens": 5}
        });
        let response =
            parse_responses_response(Backend::OpenAi, body.to_string().as_bytes()).unwrap();
        assert_eq!(response.content, "hello");
        assert!(response.tool_calls.is_empty());
        assert_eq!(response.usage, Usage::new(3, 2));
        assert_eq!(response.finish_reason, Some(FinishReason::Stop));
    }

    #[test]
    fn top_level_error_short_circuits() {
        let body = json!({
            "output": [{"type": "message", "content": [{"type": "output_text", "text": "partial"}]}],
            "error": {"message": "model overloaded", "code": "server_error"}
        });
        let err =
            parse_responses_response(Backend::OpenAi, body.to_string().as_bytes()).unwrap_err();
        match err {
            LlmError::ProviderError {
                backend,
                error_code,
                ..
            } => {
                assert_eq!(backend, Backend::OpenAi);
                assert_eq!(error_code.as_deref(), Some("server_error"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn output_text_is_only_a_fallback() {
        let empty = json!({"output": [], "output_text": "fallback", "error": null});
        let response =
            parse_responses_response(Backend::OpenAi, empty.to_string().as_bytes()).unwrap();
        assert_eq!(response.content, "fallback");

        let full = json!({
            "output": [{"type": "message", "content": [{"type": "output_text", "text": "primary"}]}],
            "output_text": "fallback"
        });
        let response =
            parse_responses_response(Backend::OpenAi, full.to_string().as_bytes()).unwrap();
        assert_eq!(response.content, "primary");
    }

    #[test]
    fn echoed_tools_decode_back_to_builtin_tools() {
        let search = openai::web_search()
            .with_allowed_domains(vec!["docs.rs".into()])
            .build();
        let body = json!({
            "output": [],
            "tools": [
                search.to_wire(),
                {"type": "function", "name": "lookup", "parameters": {}},
                {"type": "future_tool"}
            ]
        });
        let response =
            parse_responses_response(Backend::OpenAi, body.to_string().as_bytes()).unwrap();
        assert_eq!(response.hosted_tools, vec![search]);
    }

    #[test]
    fn invalid_envelope_is_a_parse_error_with_body() {
        let err = parse_responses_response(Backend::Azure, br#"{"output": 5}"#).unwrap_err();
        match err {
            LlmError::ParseError { raw_body, .. } => assert_eq!(raw_body, r#"{"output": 5}"#),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn stream_events() {
        let mut decoder = ResponsesStreamDecoder::new(Backend::OpenAi);
        let d = decoder
            .decode(&event(json!({"type": "response.output_text.delta", "delta": "Hel"})))
            .unwrap();
        assert_eq!(d.deltas, vec![StreamDelta::Text("Hel".into())]);

        let d = decoder
            .decode(&event(json!({
                "type": "response.output_item.added", "output_index": 1,
                "item": {"type": "function_call", "call_id": "c1", "name": "f"}
            })))
            .unwrap();
        assert!(matches!(&d.deltas[0], StreamDelta::ToolCall(t) if t.index == 1 && t.name.as_deref() == Some("f")));

        let d = decoder
            .decode(&event(json!({"type": "response.in_progress"})))
            .unwrap();
        assert!(d.deltas.is_empty() && !d.done);

        let d = decoder
            .decode(&event(json!({
                "type": "response.completed",
                "response": {"usage": {"input_tokens": 1, "output_tokens": 1, "total_tokens": 2}}
            })))
            .unwrap();
        assert!(d.done);
        assert_eq!(d.deltas[0], StreamDelta::Usage(Usage::new(1, 1)));

        let err = decoder
            .decode(&event(json!({"type": "error", "code": "rate_limit_exceeded", "message": "slow"})))
            .unwrap_err();
        assert_eq!(err.error_code(), Some("rate_limit_exceeded"));
    }
}
