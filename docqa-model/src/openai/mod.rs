//! OpenAI chat-completions provider.
//!
//! Available with the `openai` feature. Works against the OpenAI API and any
//! OpenAI-compatible endpoint via [`OpenAIConfig::with_base_url`].

mod client;
mod config;

pub use client::OpenAIChatModel;
pub use config::{DEFAULT_CHAT_MODEL, OpenAIConfig};
