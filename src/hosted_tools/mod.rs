//! Provider-defined tools.
//!
//! "Hosted tools" execute on the backend side (web search, file search, code
//! execution, remote tool servers, ...) rather than in the caller's own
//! function-calling loop.
//!
//! Currently supported:
//! - `hosted_tools::openai` – OpenAI Responses API built-in tools

pub mod openai;
