//! Live adapters backed by real I/O.

pub mod filesystem;
pub mod llm;

pub use filesystem::LiveFileSystem;
pub use llm::LiveLlmClient;
