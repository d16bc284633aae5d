//! Streaming primitives shared by every backend.
//!
//! The transport yields raw bytes; [`sse_events`] turns them into SSE events
//! (via eventsource-stream, which handles UTF-8 boundaries and line
//! buffering); a backend's [`StreamDecoder`] turns each event into zero or
//! more [`StreamDelta`]s. [`StreamAccumulator`] folds the deltas back into a
//! [`ChatResponse`] so streamed and unary calls return the same shape.

use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures::{Stream, StreamExt};
use std::collections::BTreeMap;
use std::pin::Pin;

use crate::error::LlmError;
use crate::execution::http::transport::ByteStream;
use crate::types::{ChatResponse, FinishReason, FunctionCall, ToolCallResult, Usage};

/// One incremental piece of a streamed answer.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamDelta {
    Text(String),
    /// Reasoning/thinking text, kept apart from the answer text.
    Thinking(String),
    ToolCall(ToolCallDelta),
    /// Usage so far. Later values replace earlier ones.
    Usage(Usage),
    Finish(FinishReason),
}

/// A fragment of a function call. Fragments sharing an `index` belong to the
/// same call; `arguments` fragments are concatenated in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallDelta {
    pub index: u32,
    pub call_id: Option<String>,
    pub name: Option<String>,
    pub arguments: String,
}

/// Result of decoding one SSE event.
#[derive(Debug, Default, PartialEq)]
pub struct DecodedEvent {
    pub deltas: Vec<StreamDelta>,
    /// The backend signalled the end of the stream.
    pub done: bool,
}

impl DecodedEvent {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn done() -> Self {
        Self {
            deltas: Vec::new(),
            done: true,
        }
    }

    pub fn deltas(deltas: Vec<StreamDelta>) -> Self {
        Self {
            deltas,
            done: false,
        }
    }
}

/// Backend-specific, possibly stateful, SSE event decoder.
///
/// An `Err` is terminal for the stream (backend-reported error event).
pub trait StreamDecoder: Send {
    fn decode(&mut self, event: &Event) -> Result<DecodedEvent, LlmError>;
}

pub type SseStream = Pin<Box<dyn Stream<Item = Result<Event, LlmError>> + Send>>;

/// Parse a raw byte stream as server-sent events.
pub fn sse_events(body: ByteStream) -> SseStream {
    Box::pin(body.eventsource().map(|item| {
        item.map_err(|err| match err {
            EventStreamError::Transport(inner) => inner,
            other => LlmError::parse_error(format!("invalid SSE stream: {other}"), String::new()),
        })
    }))
}

/// Folds deltas into a final response.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
    usage: Option<Usage>,
    finish_reason: Option<FinishReason>,
    tool_calls: BTreeMap<u32, ToolCallDelta>,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, delta: &StreamDelta) {
        match delta {
            StreamDelta::Text(text) => self.text.push_str(text),
            StreamDelta::Thinking(_) => {}
            StreamDelta::ToolCall(fragment) => {
                let call = self
                    .tool_calls
                    .entry(fragment.index)
                    .or_insert_with(|| ToolCallDelta {
                        index: fragment.index,
                        ..Default::default()
                    });
                if fragment.call_id.is_some() {
                    call.call_id.clone_from(&fragment.call_id);
                }
                if fragment.name.is_some() {
                    call.name.clone_from(&fragment.name);
                }
                call.arguments.push_str(&fragment.arguments);
            }
            StreamDelta::Usage(usage) => self.usage = Some(*usage),
            StreamDelta::Finish(reason) => self.finish_reason = Some(reason.clone()),
        }
    }

    pub fn finish(self) -> ChatResponse {
        let tool_calls = self
            .tool_calls
            .into_values()
            .map(|call| {
                ToolCallResult::Function(FunctionCall::new(
                    call.call_id.unwrap_or_default(),
                    call.name.unwrap_or_default(),
                    call.arguments,
                ))
            })
            .collect();
        ChatResponse {
            content: self.text,
            usage: self.usage.unwrap_or_default(),
            tool_calls,
            finish_reason: self.finish_reason,
            ..Default::default()
        }
    }
}
