//! LLM provider abstraction layer
//!
//! Provider-agnostic inference interface with Anthropic and OpenAI backends.

pub mod provider;
pub mod providers;

pub use provider::*;
pub use providers::*;
