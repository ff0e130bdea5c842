//! genpaper-llm — hosted language model abstraction.
//!
//! The model is a black-box text-completion collaborator behind the
//! `LlmBackend` trait: a system/user prompt pair in, either a complete text
//! or a token stream out. Backends cover any OpenAI-compatible endpoint and
//! the Anthropic Messages API. See ARCHITECTURE.md §7.

pub mod backend;
pub mod sse;
pub mod structured;

pub use backend::{
    AnthropicBackend, LlmBackend, LlmError, LlmRequest, LlmResponse, Message,
    OpenAiCompatibleBackend, TokenStream,
};
pub use structured::complete_structured;
