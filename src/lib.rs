//! unillm
//!
//! One request shape over OpenAI, Azure OpenAI, OpenRouter, Anthropic, Gemini
//! and Ollama, with model-name resolution, capability warnings, hosted tool
//! translation and multi-model retry/fallback orchestration.
//!
//! ```rust,ignore
//! use unillm::prelude::*;
//!
//! let orchestrator = Orchestrator::builder()
//!     .default_backend(Backend::OpenRouter)
//!     .provider(ProviderConfig::from_env(Backend::OpenRouter))
//!     .build()?;
//! let request = ChatRequest::new("gpt-5", vec![ChatMessage::user("hello")]);
//! let result = orchestrator
//!     .execute(
//!         &request,
//!         &request.model,
//!         &[Model::new("claude-sonnet-4.5")],
//!         &RetryOptions::policy(RetryPolicy::new()),
//!         None,
//!     )
//!     .await?;
//! println!("{} (served by {})", result.response.content, result.model);
//! ```
#![deny(unsafe_code)]

pub mod core;
pub mod defaults;
pub mod error;
pub mod execution;
pub mod hosted_tools;
pub mod models;
pub mod observability;
pub mod orchestrator;
pub mod retry;
pub mod standards;
pub mod streaming;
pub mod traits;
pub mod types;
pub mod utils;
pub mod validation;

pub use error::LlmError;

/// Common imports.
pub mod prelude {
    pub use crate::error::{ErrorCategory, LlmError};
    pub use crate::execution::{MinIntervalGate, NoopGate, RateLimitGate};
    pub use crate::hosted_tools::openai::{self as hosted, BuiltinTool};
    pub use crate::models::resolve;
    pub use crate::orchestrator::{ExecutionResult, Orchestrator, OrchestratorBuilder};
    pub use crate::retry::{JitterStrategy, RetryOptions, RetryPolicy};
    pub use crate::streaming::StreamDelta;
    pub use crate::traits::{Feature, capabilities};
    pub use crate::types::*;
    pub use crate::utils::CancelHandle;
    pub use crate::validation::ResponseValidator;
}
