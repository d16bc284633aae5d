//! Response validation hooks.
//!
//! Validators run after a successful, fully decoded response. A rejection is
//! terminal: the orchestrator neither retries nor falls back.

use crate::error::LlmError;
use crate::types::ChatResponse;

pub trait ResponseValidator: Send + Sync {
    /// Inspect a response; return an error to reject it.
    fn validate(&self, response: &ChatResponse) -> Result<(), LlmError>;
}

impl<F> ResponseValidator for F
where
    F: Fn(&ChatResponse) -> Result<(), LlmError> + Send + Sync,
{
    fn validate(&self, response: &ChatResponse) -> Result<(), LlmError> {
        self(response)
    }
}

/// Rejects responses with neither text nor tool calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonEmptyResponse;

impl ResponseValidator for NonEmptyResponse {
    fn validate(&self, response: &ChatResponse) -> Result<(), LlmError> {
        if response.content.trim().is_empty() && response.tool_calls.is_empty() {
            return Err(LlmError::ValidationError("empty response".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_validators() {
        let no_apologies = |r: &ChatResponse| {
            if r.content.contains("sorry") {
                Err(LlmError::ValidationError("apology".into()))
            } else {
                Ok(())
            }
        };
        let ok = ChatResponse {
            content: "done".into(),
            ..Default::default()
        };
        let bad = ChatResponse {
            content: "sorry".into(),
            ..Default::default()
        };
        assert!(no_apologies.validate(&ok).is_ok());
        assert!(no_apologies.validate(&bad).is_err());
    }

    #[test]
    fn empty_responses_are_rejected() {
        let err = NonEmptyResponse
            .validate(&ChatResponse::default())
            .unwrap_err();
        assert!(matches!(err, LlmError::ValidationError(_)));
    }
}
