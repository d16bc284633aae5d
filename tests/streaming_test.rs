//! Streamed calls: ordering, accumulation and the first-chunk boundary for
//! retry and fallback.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Reply, ScriptedTransport, orchestrator, request, server_error};
use unillm::prelude::*;

fn chunk(data: &str) -> Result<String, LlmError> {
    Ok(format!("data: {data}\n\n"))
}

fn text_chunks(parts: &[&str]) -> Vec<Result<String, LlmError>> {
    let mut chunks: Vec<_> = parts
        .iter()
        .map(|p| chunk(&format!(r#"{{"choices":[{{"delta":{{"content":"{p}"}}}}]}}"#)))
        .collect();
    chunks.push(chunk(r#"{"choices":[{"delta":{},"finish_reason":"stop"}],"usage":{"prompt_tokens":4,"completion_tokens":3,"total_tokens":7}}"#));
    chunks.push(chunk("[DONE]"));
    chunks
}

#[tokio::test]
async fn deltas_arrive_in_order_and_accumulate() {
    let transport = Arc::new(ScriptedTransport::new(|_, req| {
        assert_eq!(req.body["stream"], true);
        Reply::Stream(200, text_chunks(&["Hel", "lo", " world"]))
    }));
    let orchestrator = orchestrator(transport);
    let mut seen = Vec::new();

    let result = orchestrator
        .execute_stream(
            &request("hi"),
            &Model::new("gpt-5"),
            &[],
            &RetryOptions::None,
            None,
            |delta| seen.push(delta.clone()),
        )
        .await
        .unwrap();

    assert_eq!(
        seen[..3],
        [
            StreamDelta::Text("Hel".into()),
            StreamDelta::Text("lo".into()),
            StreamDelta::Text(" world".into()),
        ]
    );
    assert_eq!(result.response.content, "Hello world");
    assert_eq!(result.response.finish_reason, Some(FinishReason::Stop));
    assert_eq!(result.response.usage.total_tokens, 7);
}

#[tokio::test]
async fn connection_close_without_marker_ends_the_stream() {
    let transport = Arc::new(ScriptedTransport::new(|_, _| {
        Reply::Stream(200, vec![chunk(r#"{"choices":[{"delta":{"content":"partial"}}]}"#)])
    }));
    let orchestrator = orchestrator(transport);

    let result = orchestrator
        .execute_stream(&request("hi"), &Model::new("gpt-5"), &[], &RetryOptions::None, None, |_| {})
        .await
        .unwrap();
    assert_eq!(result.response.content, "partial");
}

#[tokio::test(start_paused = true)]
async fn failures_before_the_first_delta_are_retried() {
    let transport = Arc::new(ScriptedTransport::new(|n, _| {
        if n == 1 {
            server_error()
        } else {
            Reply::Stream(200, text_chunks(&["ok"]))
        }
    }));
    let orchestrator = orchestrator(transport.clone());

    let result = orchestrator
        .execute_stream(
            &request("hi"),
            &Model::new("gpt-5"),
            &[],
            &RetryOptions::fixed(2),
            None,
            |_| {},
        )
        .await
        .unwrap();
    assert_eq!(result.response.content, "ok");
    assert_eq!(result.retries, 1);
    assert_eq!(transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn failures_after_the_first_delta_are_terminal() {
    let transport = Arc::new(ScriptedTransport::new(|_, _| {
        Reply::Stream(
            200,
            vec![
                chunk(r#"{"choices":[{"delta":{"content":"half"}}]}"#),
                Err(LlmError::ConnectionError("reset by peer".into())),
            ],
        )
    }));
    let orchestrator = orchestrator(transport.clone());
    let mut seen = 0;

    let err = orchestrator
        .execute_stream(
            &request("hi"),
            &Model::new("gpt-5"),
            &[Model::new("gpt-4o")],
            &RetryOptions::fixed(3),
            None,
            |_| seen += 1,
        )
        .await
        .unwrap_err();

    assert_eq!(seen, 1);
    assert_eq!(transport.calls(), 1);
    assert!(matches!(err.root(), LlmError::ConnectionError(_)));
}

#[tokio::test]
async fn stream_error_event_is_surfaced() {
    let transport = Arc::new(ScriptedTransport::new(|_, _| {
        Reply::Stream(
            200,
            vec![chunk(r#"{"error":{"message":"context too long","code":"context_length_exceeded"}}"#)],
        )
    }));
    let orchestrator = orchestrator(transport);

    let err = orchestrator
        .execute_stream(&request("hi"), &Model::new("gpt-5"), &[], &RetryOptions::None, None, |_| {})
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), Some("context_length_exceeded"));
}

#[tokio::test(start_paused = true)]
async fn cancelling_a_stalled_stream_returns_promptly() {
    let transport = Arc::new(ScriptedTransport::new(|_, _| Reply::Hang));
    let orchestrator = orchestrator(transport.clone());
    let cancel = CancelHandle::new();
    cancel.cancel_after(Duration::from_millis(20));

    let err = orchestrator
        .execute_stream(
            &request("hi"),
            &Model::new("gpt-5"),
            &[Model::new("gpt-4o")],
            &RetryOptions::fixed(3),
            Some(&cancel),
            |_| {},
        )
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(transport.calls(), 1);
}
