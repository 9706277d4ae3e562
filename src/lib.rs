//! File-templated chat prompts for completion APIs.
//!
//! An [`App`] is a named prompt: its system, user and assistant messages are
//! loaded from `{name}_{role}.md` templates in the working directory (or set
//! directly), variables and JSON format hints are folded into the system
//! prompt at compile time, and every response overwrites
//! `answers/{name}_result_latest.md`.
//!
//! ```no_run
//! use aiapp::{ClientRegistry, SamplingParams};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let mut registry = ClientRegistry::from_current_dir()?;
//! let app = registry.ai(Some("demo"))?;
//! app.borrow_mut()
//!     .var("topic", "borrow checking")
//!     .gpt4(Some("Explain the topic."), SamplingParams::default().temperature(0.2))?
//!     .result_print();
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod app;
pub mod cassette;
pub mod compiler;
pub mod config;
pub mod message;
pub mod model;
pub mod ports;
pub mod registry;

pub use app::{App, AppOptions};
pub use compiler::{CompiledPrompt, FormatHint, Variables};
pub use config::Settings;
pub use message::Role;
pub use model::{Model, SamplingParams};
pub use registry::{ClientRegistry, SharedApp};
