//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the prompt-building core and an
//! external system (the completion service, the filesystem).
//! Implementations live in `src/adapters/`.

pub mod filesystem;
pub mod llm;

pub use filesystem::FileSystem;
pub use llm::{ChatMessage, CompletionRequest, CompletionResponse, LlmClient, LlmFuture};
