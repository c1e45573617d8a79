//! # Dialform Engine
//!
//! The field-extraction and state-reconciliation protocol: the contract
//! between the dialog loop and the LLM.
//!
//! - [`prompt`] renders schema + state + history into the instruction
//!   payload for the model.
//! - [`extract`] parses and strictly validates the model's JSON reply.
//! - [`merge`] reconciles a validated candidate into the authoritative
//!   state under the no-regression invariant.
//! - [`dialog`] is the control loop deciding what to ask next.

pub mod dialog;
pub mod extract;
pub mod merge;
pub mod prompt;

pub use dialog::{DialogEngine, EngineReply};
pub use extract::parse_extraction;
pub use merge::merge;
pub use prompt::build_messages;
