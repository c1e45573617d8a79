//! # Dialform Core
//!
//! Domain types, traits, and error definitions for the dialform
//! conversational form-filling engine. This crate has **zero framework
//! dependencies** — it defines the domain model that all other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! The LLM backend is defined as a trait here ([`Llm`]); implementations
//! live in `dialform-providers`. The dialog engine receives its provider
//! by injection, which keeps every piece of the extraction protocol
//! testable with in-process fakes.

pub mod error;
pub mod llm;
pub mod message;
pub mod schema;
pub mod state;
pub mod value;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ExtractionError, LlmError, Result, SchemaError, StoreError};
pub use llm::{Llm, LlmRequest};
pub use message::{Conversation, ConversationId, Message, Role};
pub use schema::{FieldSpec, FieldType, FormSchema};
pub use state::{FieldState, FieldStatus, FormState};
pub use value::FieldValue;
