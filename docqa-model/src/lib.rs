//! # docqa-model
//!
//! Language-model clients used by the docqa answering and summarization steps.
//!
//! ## Overview
//!
//! The crate exposes a single seam, the [`LanguageModel`] trait: a prompt and a
//! temperature go in, completion text comes out. Implementations:
//!
//! - [`OpenAIChatModel`] - OpenAI chat completions (`gpt-4-turbo`, `gpt-4o`, ...),
//!   behind the `openai` feature
//! - [`MockModel`] - scripted model for tests
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docqa_model::openai::{OpenAIChatModel, OpenAIConfig};
//! use docqa_model::{CompletionRequest, LanguageModel};
//!
//! let model = OpenAIChatModel::new(OpenAIConfig::new(
//!     std::env::var("OPENAI_API_KEY")?,
//!     "gpt-4-turbo",
//! ))?;
//! let response = model.complete(CompletionRequest::new("Say hello", 0.2)).await?;
//! println!("{}", response.text);
//! ```

mod error;
pub mod mock;
mod model;
#[cfg(feature = "openai")]
pub mod openai;

pub use error::{ModelError, Result};
pub use mock::MockModel;
pub use model::{CompletionRequest, CompletionResponse, LanguageModel};
#[cfg(feature = "openai")]
pub use openai::{OpenAIChatModel, OpenAIConfig};
