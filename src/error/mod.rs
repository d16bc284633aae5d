//! Error handling types for unillm.
//!
//! Every failure surfaced by the orchestration layer is an [`LlmError`].
//! Errors produced while talking to a backend are tagged with that backend,
//! and an exhausted fallback chain is anchored on the primary model.

mod conversions;
pub mod types;

pub use types::*;
