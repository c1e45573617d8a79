//! Prompt construction for extraction calls.
//!
//! A deterministic function of (schema, state, history): the system
//! message carries the merge/status policy plus the serialized schema and
//! the full current state (never a diff), followed by the conversation in
//! order. Error-role transcript events are excluded from the payload.

use dialform_core::message::{Conversation, Message};
use dialform_core::schema::FormSchema;
use dialform_core::state::FormState;

/// The policy preamble sent at the top of every extraction call.
///
/// Encodes the status vocabulary and the merge rules as natural-language
/// policy; the structural rules are additionally enforced in code by the
/// validator and the merger.
const POLICY: &str = "\
You fill a form by reading a dialog between a user and an assistant.

Field statuses form a closed vocabulary:
- \"not_started\": the user has not addressed the field yet; value must be null
- \"filled\": the value is set and conforms to the field's declared type
- \"invalid\": the user addressed the field but the value could not be normalized
- \"skipped\": the user declined an optional field

Rules:
1. Fields with status \"filled\" or \"skipped\" are frozen. Do not change
   them unless the user explicitly asks for a correction.
2. If a value is ambiguous but normalizable, canonicalize it to the
   field's declared format and mark the field \"filled\". Dates become
   YYYY-MM-DD (e.g. \"23 December 2002\" becomes \"2002-12-23\").
3. If a value cannot be normalized to the declared type, mark the field
   \"invalid\" and ask exactly one follow-up question about one invalid
   field in \"next_question\".
4. When no field is invalid, \"next_question\" may be null or a question
   about the next unfilled field.

Respond with a single JSON object and nothing else (no prose, no markdown):
{\"state\": {<field name>: {\"value\": ..., \"status\": ..., \"optional\": ...}, ...}, \"next_question\": <string or null>}
The \"state\" object must contain every field of the form.";

/// Render the complete message list for one extraction call.
///
/// Pure: no side effects, deterministic for identical inputs.
pub fn build_messages(
    schema: &FormSchema,
    state: &FormState,
    history: &Conversation,
) -> Vec<Message> {
    // Serialization cannot fail for these types; fall back to empty
    // objects rather than panicking in the dialog path.
    let schema_json = serde_json::to_string_pretty(schema).unwrap_or_else(|_| "{}".into());
    let state_json = serde_json::to_string_pretty(state).unwrap_or_else(|_| "{}".into());

    let system = format!(
        "{POLICY}\n\nThe form:\n{schema_json}\n\nThe current state:\n{state_json}"
    );

    let mut messages = Vec::with_capacity(history.messages.len() + 1);
    messages.push(Message::system(system));
    messages.extend(history.llm_visible().cloned());
    messages
}
