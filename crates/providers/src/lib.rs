//! LLM provider implementations for dialform.
//!
//! All providers implement the `dialform_core::Llm` trait.
//! The router builds the configured provider at startup; the dialog
//! engine receives it by injection, never through process-global state.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;
