//! Typed tool-call results and the caller's follow-up outputs.
//!
//! Results mirror the hosted tool variants of
//! [`BuiltinTool`](crate::hosted_tools::openai::BuiltinTool) plus plain
//! function calls.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolCallResult {
    Function(FunctionCall),
    WebSearch(HostedToolCall),
    FileSearch(HostedToolCall),
    Mcp(HostedToolCall),
    CodeInterpreter(HostedToolCall),
    ImageGeneration(ImageGenerationCall),
    ComputerUse(ComputerCall),
    Shell(ShellCall),
    ApplyPatch(ApplyPatchCall),
}

impl ToolCallResult {
    /// Item id assigned by the backend, if any.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Function(c) => c.id.as_deref(),
            Self::WebSearch(c) | Self::FileSearch(c) | Self::Mcp(c) | Self::CodeInterpreter(c) => {
                Some(c.id.as_str())
            }
            Self::ImageGeneration(c) => Some(c.id.as_str()),
            Self::ComputerUse(c) => Some(c.id.as_str()),
            Self::Shell(c) => Some(c.id.as_str()),
            Self::ApplyPatch(c) => Some(c.id.as_str()),
        }
    }
}

/// A function call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub call_id: String,
    pub name: String,
    /// Raw JSON arguments as produced by the model.
    pub arguments: String,
}

impl FunctionCall {
    pub fn new(
        call_id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            call_id: call_id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Parse the argument string as JSON.
    pub fn parsed_arguments(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.arguments)
    }
}

/// Either the tool output or the error the backend reported for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolOutcome {
    Output(String),
    Error(String),
}

/// Uniform shape for search, file search, remote tool server and code
/// execution calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostedToolCall {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    /// Remote tool server label (`mcp_call` only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ToolOutcome>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageGenerationCall {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revised_prompt: Option<String>,
    /// Base64-encoded image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// One step of the computer-control loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComputerAction {
    /// `click`, `double_click`, `scroll`, `type`, `keypress`, `move`, `drag`,
    /// `screenshot` or `wait`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_x: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_y: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SafetyCheck {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComputerCall {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ComputerAction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending_safety_checks: Vec<SafetyCheck>,
}

/// Commands the model wants executed in a shell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShellAction {
    pub commands: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_length: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShellCall {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ShellAction>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PatchOperationKind {
    CreateFile,
    UpdateFile,
    DeleteFile,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatchOperation {
    #[serde(rename = "type")]
    pub kind: PatchOperationKind,
    pub path: String,
    /// Unified diff (absent for deletions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplyPatchCall {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<PatchOperation>,
}

/// Result of executing a computer action, sent back on the next turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComputerCallOutput {
    pub call_id: String,
    /// Screenshot as an image URL or `data:` URI.
    pub screenshot_url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acknowledged_safety_checks: Vec<SafetyCheck>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShellCommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the command timed out.
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShellCallOutput {
    pub call_id: String,
    pub output: Vec<ShellCommandOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_length: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplyPatchCallOutput {
    pub call_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// Caller-side result for a hosted tool call that runs on the caller's
/// machine (computer, shell, patch).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostedToolOutput {
    Computer(ComputerCallOutput),
    Shell(ShellCallOutput),
    ApplyPatch(ApplyPatchCallOutput),
}

impl HostedToolOutput {
    /// Responses API input item for this output.
    pub fn to_wire(&self) -> Value {
        match self {
            Self::Computer(out) => {
                let mut item = json!({
                    "type": "computer_call_output",
                    "call_id": out.call_id,
                    "output": {
                        "type": "computer_screenshot",
                        "image_url": out.screenshot_url,
                    },
                });
                if !out.acknowledged_safety_checks.is_empty() {
                    item["acknowledged_safety_checks"] = json!(out.acknowledged_safety_checks);
                }
                item
            }
            Self::Shell(out) => {
                let output: Vec<Value> = out
                    .output
                    .iter()
                    .map(|cmd| {
                        let outcome = match cmd.exit_code {
                            Some(code) => json!({"type": "exit", "exit_code": code}),
                            None => json!({"type": "timeout"}),
                        };
                        json!({"stdout": cmd.stdout, "stderr": cmd.stderr, "outcome": outcome})
                    })
                    .collect();
                let mut item = Map::new();
                item.insert("type".into(), json!("shell_call_output"));
                item.insert("call_id".into(), json!(out.call_id));
                item.insert("output".into(), Value::Array(output));
                if let Some(max) = out.max_output_length {
                    item.insert("max_output_length".into(), json!(max));
                }
                Value::Object(item)
            }
            Self::ApplyPatch(out) => {
                let mut item = json!({
                    "type": "apply_patch_call_output",
                    "call_id": out.call_id,
                    "status": if out.success { "completed" } else { "failed" },
                });
                if let Some(output) = out.output.as_deref().filter(|s| !s.is_empty()) {
                    item["output"] = json!(output);
                }
                item
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_output_marks_timeouts() {
        let out = HostedToolOutput::Shell(ShellCallOutput {
            call_id: "call_1".into(),
            output: vec![
                ShellCommandOutput {
                    stdout: "ok".into(),
                    stderr: String::new(),
                    exit_code: Some(0),
                },
                ShellCommandOutput {
                    stdout: String::new(),
                    stderr: String::new(),
                    exit_code: None,
                },
            ],
            max_output_length: None,
        });
        let wire = out.to_wire();
        assert_eq!(wire["type"], "shell_call_output");
        assert_eq!(wire["output"][0]["outcome"]["exit_code"], 0);
        assert_eq!(wire["output"][1]["outcome"]["type"], "timeout");
        assert!(wire.get("max_output_length").is_none());
    }

    #[test]
    fn apply_patch_output_status() {
        let wire = HostedToolOutput::ApplyPatch(ApplyPatchCallOutput {
            call_id: "c".into(),
            success: false,
            output: Some("conflict".into()),
        })
        .to_wire();
        assert_eq!(wire["status"], "failed");
        assert_eq!(wire["output"], "conflict");
    }

    #[test]
    fn computer_output_wraps_screenshot() {
        let wire = HostedToolOutput::Computer(ComputerCallOutput {
            call_id: "c".into(),
            screenshot_url: "data:image/png;base64,AAAA".into(),
            acknowledged_safety_checks: vec![],
        })
        .to_wire();
        assert_eq!(wire["output"]["type"], "computer_screenshot");
        assert!(wire.get("acknowledged_safety_checks").is_none());
    }
}
