//! The dialog control loop.
//!
//! A [`DialogEngine`] owns one session: the schema, the authoritative
//! state, the conversation history, and the injected LLM. It is
//! I/O-free — the caller feeds it user text turn by turn and presents
//! whatever [`EngineReply`] comes back, which keeps the whole state
//! machine testable with an in-process fake model.

use std::sync::Arc;

use dialform_core::error::Error;
use dialform_core::llm::{Llm, LlmRequest};
use dialform_core::message::{Conversation, Message};
use dialform_core::schema::{FieldSpec, FormSchema};
use dialform_core::state::{FieldStatus, FormState};
use tracing::{debug, info, warn};

use crate::{extract, merge, prompt};

/// Exit sentinels, checked case-insensitively at every input point.
const EXIT_WORDS: &[&str] = &["выход", "exit", "quit"];

/// Canonical affirmatives for the confirmation step.
const YES_WORDS: &[&str] = &["да", "yes", "y"];

/// What the engine wants presented to the user next.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineReply {
    /// A question awaiting a free-text answer.
    Ask(String),

    /// The previous turn failed recoverably: surface the error, then
    /// re-ask the same outstanding question. State is unchanged.
    Retry { question: String, error: String },

    /// Every field is filled or skipped: the summary plus a yes/no
    /// confirmation request.
    Confirm(String),

    /// The user confirmed. Terminal; the caller persists the final state.
    Completed,

    /// The user typed the exit sentinel. Terminal; nothing is persisted.
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Collecting,
    Confirming,
    Completed,
    Aborted,
}

/// The dialog state machine for one form-filling session.
pub struct DialogEngine {
    schema: FormSchema,
    state: FormState,
    conversation: Conversation,
    llm: Arc<dyn Llm>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,

    /// The question currently awaiting an answer, re-asked on retry.
    outstanding_question: Option<String>,

    /// Set when the user rejected the confirmation summary: the next
    /// extraction turn is a user-initiated correction and may overwrite
    /// frozen fields.
    correction_pending: bool,

    phase: Phase,
}

impl DialogEngine {
    /// Create a new session over a validated schema.
    pub fn new(schema: FormSchema, llm: Arc<dyn Llm>, model: impl Into<String>) -> Self {
        let state = FormState::init(&schema);
        Self {
            schema,
            state,
            conversation: Conversation::new(),
            llm,
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
            outstanding_question: None,
            correction_pending: false,
            phase: Phase::Collecting,
        }
    }

    /// Set the sampling temperature for extraction calls.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the max tokens per LLM response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// The authoritative form state.
    pub fn state(&self) -> &FormState {
        &self.state
    }

    /// The form schema this session fills.
    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    /// The full transcript, error events included.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Open the session: the first question, or immediate completion when
    /// the form has no fields.
    pub fn opening(&mut self) -> EngineReply {
        if self.schema.fields.is_empty() {
            info!(form = %self.schema.id, "Form has no fields, nothing to do");
            self.phase = Phase::Completed;
            return EngineReply::Completed;
        }

        // A non-empty schema always has an open field at session start.
        let question = match self.state.next_open(&self.schema) {
            Some(name) => self.canned_question(name),
            None => return self.emit_confirmation(),
        };
        self.emit_question(question)
    }

    /// Process one user message and decide what to present next.
    ///
    /// Recoverable failures (transport, malformed output, contract
    /// violations) come back as [`EngineReply::Retry`], never as `Err`:
    /// a session only ends on explicit user exit or confirmation.
    pub async fn handle_input(&mut self, text: &str) -> Result<EngineReply, Error> {
        let trimmed = text.trim();

        match self.phase {
            Phase::Completed => return Ok(EngineReply::Completed),
            Phase::Aborted => return Ok(EngineReply::Aborted),
            Phase::Collecting | Phase::Confirming => {}
        }

        // Exit sentinel wins at any input point; nothing is saved.
        if is_exit(trimmed) {
            info!(form = %self.schema.id, "User exited the session");
            self.phase = Phase::Aborted;
            return Ok(EngineReply::Aborted);
        }

        if self.phase == Phase::Confirming {
            return Ok(self.handle_confirmation(trimmed));
        }

        self.conversation.push(Message::user(trimmed));
        let correction = self.correction_pending;

        let reply_text = match self.call_model().await {
            Ok(text) => text,
            Err(e) => return Ok(self.recoverable_failure(e.to_string(), e.to_string())),
        };

        let (candidate, next_question) = match extract::parse_extraction(&reply_text, &self.schema)
        {
            Ok(parsed) => parsed,
            Err(e) => return Ok(self.recoverable_failure(reply_text, e.to_string())),
        };

        if let Err(e) = merge::merge(&mut self.state, &candidate, correction) {
            return Ok(self.recoverable_failure(reply_text, e.to_string()));
        }
        self.correction_pending = false;

        debug!(
            form = %self.schema.id,
            invalid = self.state.has_invalid(),
            complete = self.state.is_complete(),
            "Merged extraction result"
        );

        Ok(self.next_reply(next_question))
    }

    /// The deterministic filled/skipped summary. Calling it twice without
    /// an intervening state change yields identical output.
    pub fn summary(&self) -> String {
        let mut lines = Vec::with_capacity(self.schema.fields.len());
        for spec in &self.schema.fields {
            let Some(field) = self.state.get(&spec.name) else {
                continue;
            };
            let rendered = match (field.status, &field.value) {
                (FieldStatus::Skipped, _) => "(skipped)".to_string(),
                (_, Some(value)) => render_value(value),
                (_, None) => "—".to_string(),
            };
            lines.push(format!("  {}: {}", spec.name, rendered));
        }
        lines.join("\n")
    }

    // --- internals ---

    async fn call_model(&self) -> Result<String, dialform_core::error::LlmError> {
        let messages = prompt::build_messages(&self.schema, &self.state, &self.conversation);
        let mut request = LlmRequest::new(&self.model, messages);
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;
        self.llm.ask(request).await
    }

    /// Decide what to ask after a successful merge.
    fn next_reply(&mut self, next_question: Option<String>) -> EngineReply {
        if self.state.has_invalid() {
            let question = match next_question {
                Some(q) => q,
                None => {
                    // Contract violation: invalid fields demand a follow-up
                    // question. Fall back to a canned one.
                    warn!(
                        form = %self.schema.id,
                        "Model reported invalid fields without a follow-up question"
                    );
                    match self.state.first_invalid(&self.schema) {
                        Some(name) => self.canned_question(name),
                        None => String::new(),
                    }
                }
            };
            return self.emit_question(question);
        }

        if let Some(name) = self.state.next_open(&self.schema) {
            // Prefer the model's own phrasing when it offered one.
            let question = next_question.unwrap_or_else(|| self.canned_question(name));
            return self.emit_question(question);
        }

        self.emit_confirmation()
    }

    fn handle_confirmation(&mut self, trimmed: &str) -> EngineReply {
        self.conversation.push(Message::user(trimmed));

        if is_affirmative(trimmed) {
            info!(form = %self.schema.id, "User confirmed the answers");
            self.phase = Phase::Completed;
            return EngineReply::Completed;
        }

        // Anything short of a canonical yes is a correction request. The
        // next user message re-runs extraction with the correction flag;
        // no field resets to not_started.
        self.correction_pending = true;
        self.phase = Phase::Collecting;
        let question = "What would you like to change?".to_string();
        self.emit_question(question)
    }

    /// Log a recoverable failure with the raw offending content and
    /// re-ask the same outstanding question. History is not rolled back.
    fn recoverable_failure(&mut self, raw: String, error: String) -> EngineReply {
        warn!(form = %self.schema.id, error = %error, "Turn failed, re-asking");
        self.conversation.push(Message::error_event(raw));

        let question = self
            .outstanding_question
            .clone()
            .or_else(|| self.state.next_open(&self.schema).map(|n| self.canned_question(n)))
            .unwrap_or_default();
        EngineReply::Retry { question, error }
    }

    fn emit_confirmation(&mut self) -> EngineReply {
        self.phase = Phase::Confirming;
        self.outstanding_question = None;
        let text = self.confirmation_text();
        self.conversation.push(Message::assistant(&text));
        EngineReply::Confirm(text)
    }

    fn emit_question(&mut self, question: String) -> EngineReply {
        self.conversation.push(Message::assistant(&question));
        self.outstanding_question = Some(question.clone());
        EngineReply::Ask(question)
    }

    fn canned_question(&self, field_name: &str) -> String {
        match self.schema.field(field_name) {
            Some(spec) => render_canned_question(spec),
            None => format!("Please provide a value for \"{field_name}\"."),
        }
    }

    fn confirmation_text(&self) -> String {
        format!(
            "Here is everything so far:\n{}\nIs this correct? (да/yes)",
            self.summary()
        )
    }
}

fn is_exit(input: &str) -> bool {
    let lowered = input.to_lowercase();
    EXIT_WORDS.iter().any(|w| *w == lowered)
}

fn is_affirmative(input: &str) -> bool {
    let lowered = input.to_lowercase();
    YES_WORDS.iter().any(|w| *w == lowered)
}

fn render_canned_question(spec: &FieldSpec) -> String {
    let mut question = match &spec.description {
        Some(description) => {
            format!("Please provide a value for \"{}\" ({}).", spec.name, description)
        }
        None => format!("Please provide a value for \"{}\".", spec.name),
    };
    if let Some(options) = &spec.options {
        question.push_str(&format!(" Options: {}.", options.join(", ")));
    }
    question
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialform_core::error::LlmError;
    use dialform_core::schema::FieldType;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// A mock model that plays back scripted replies in order.
    struct MockLlm {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
    }

    impl MockLlm {
        fn scripted(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().collect()),
            })
        }
    }

    #[async_trait::async_trait]
    impl Llm for MockLlm {
        fn name(&self) -> &str {
            "mock"
        }

        async fn ask(&self, _request: LlmRequest) -> Result<String, LlmError> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::Network("script exhausted".into())))
        }
    }

    fn one_field_schema() -> FormSchema {
        FormSchema {
            id: "test".into(),
            title: "Test".into(),
            description: String::new(),
            fields: vec![FieldSpec {
                name: "Фамилия".into(),
                field_type: FieldType::Str,
                required: true,
                description: Some("Введите фамилию".into()),
                options: None,
                reference_type: None,
            }],
        }
    }

    fn filled_reply(value: &str) -> String {
        format!(
            r#"{{"state": {{"Фамилия": {{"value": "{value}", "status": "filled", "optional": false}}}}, "next_question": null}}"#
        )
    }

    #[tokio::test]
    async fn valid_extraction_reaches_confirmation() {
        let llm = MockLlm::scripted(vec![Ok(filled_reply("Иванов"))]);
        let mut engine = DialogEngine::new(one_field_schema(), llm, "mock-model");

        let opening = engine.opening();
        assert!(matches!(opening, EngineReply::Ask(q) if q.contains("Фамилия")));

        let reply = engine.handle_input("Иванов").await.unwrap();
        match reply {
            EngineReply::Confirm(text) => assert!(text.contains("Иванов")),
            other => panic!("expected Confirm, got {other:?}"),
        }
        assert_eq!(
            engine.state().get("Фамилия").unwrap().status,
            FieldStatus::Filled
        );
    }

    #[tokio::test]
    async fn confirmation_yes_completes_session() {
        let llm = MockLlm::scripted(vec![Ok(filled_reply("Иванов"))]);
        let mut engine = DialogEngine::new(one_field_schema(), llm, "mock-model");
        engine.opening();
        engine.handle_input("Иванов").await.unwrap();

        let reply = engine.handle_input("да").await.unwrap();
        assert_eq!(reply, EngineReply::Completed);
    }

    #[tokio::test]
    async fn malformed_output_retries_same_question() {
        let llm = MockLlm::scripted(vec![
            Ok("This is not a JSON response at all".into()),
            Ok(filled_reply("Иванов")),
        ]);
        let mut engine = DialogEngine::new(one_field_schema(), llm, "mock-model");

        let opening_question = match engine.opening() {
            EngineReply::Ask(q) => q,
            other => panic!("expected Ask, got {other:?}"),
        };

        let reply = engine.handle_input("Иванов").await.unwrap();
        match reply {
            EngineReply::Retry { question, .. } => assert_eq!(question, opening_question),
            other => panic!("expected Retry, got {other:?}"),
        }
        // state unchanged
        assert_eq!(
            engine.state().get("Фамилия").unwrap().status,
            FieldStatus::NotStarted
        );
        // the raw offending content is in the transcript as an error event
        assert!(engine
            .conversation()
            .messages
            .iter()
            .any(|m| m.role == dialform_core::message::Role::Error
                && m.content.contains("not a JSON response")));

        // retry succeeds against the same outstanding question
        let reply = engine.handle_input("Иванов").await.unwrap();
        assert!(matches!(reply, EngineReply::Confirm(_)));
    }

    #[tokio::test]
    async fn missing_schema_field_retries_and_keeps_state() {
        let llm = MockLlm::scripted(vec![Ok(
            r#"{"state": {}, "next_question": null}"#.to_string()
        )]);
        let mut engine = DialogEngine::new(one_field_schema(), llm, "mock-model");
        engine.opening();

        let reply = engine.handle_input("Иванов").await.unwrap();
        match reply {
            EngineReply::Retry { error, .. } => assert!(error.contains("Фамилия")),
            other => panic!("expected Retry, got {other:?}"),
        }
        assert_eq!(
            engine.state().get("Фамилия").unwrap().status,
            FieldStatus::NotStarted
        );
    }

    #[tokio::test]
    async fn bogus_status_retries_and_keeps_state() {
        let llm = MockLlm::scripted(vec![Ok(
            r#"{"state": {"Фамилия": {"value": "Иванов", "status": "bogus", "optional": false}}, "next_question": null}"#
                .to_string(),
        )]);
        let mut engine = DialogEngine::new(one_field_schema(), llm, "mock-model");
        engine.opening();

        let reply = engine.handle_input("Иванов").await.unwrap();
        assert!(matches!(reply, EngineReply::Retry { .. }));
        assert_eq!(
            engine.state().get("Фамилия").unwrap().status,
            FieldStatus::NotStarted
        );
    }

    #[tokio::test]
    async fn transport_error_is_recoverable() {
        let llm = MockLlm::scripted(vec![
            Err(LlmError::Network("connection refused".into())),
            Ok(filled_reply("Иванов")),
        ]);
        let mut engine = DialogEngine::new(one_field_schema(), llm, "mock-model");
        engine.opening();

        let reply = engine.handle_input("Иванов").await.unwrap();
        assert!(matches!(reply, EngineReply::Retry { .. }));

        let reply = engine.handle_input("Иванов").await.unwrap();
        assert!(matches!(reply, EngineReply::Confirm(_)));
    }

    #[tokio::test]
    async fn exit_sentinel_aborts_at_first_prompt() {
        let llm = MockLlm::scripted(vec![]);
        let mut engine = DialogEngine::new(one_field_schema(), llm, "mock-model");
        engine.opening();

        let reply = engine.handle_input("выход").await.unwrap();
        assert_eq!(reply, EngineReply::Aborted);

        // terminal: further input changes nothing
        let reply = engine.handle_input("Иванов").await.unwrap();
        assert_eq!(reply, EngineReply::Aborted);
    }

    #[tokio::test]
    async fn exit_sentinel_aborts_during_confirmation() {
        let llm = MockLlm::scripted(vec![Ok(filled_reply("Иванов"))]);
        let mut engine = DialogEngine::new(one_field_schema(), llm, "mock-model");
        engine.opening();
        engine.handle_input("Иванов").await.unwrap();

        let reply = engine.handle_input("exit").await.unwrap();
        assert_eq!(reply, EngineReply::Aborted);
    }

    #[tokio::test]
    async fn invalid_field_relays_model_question() {
        let llm = MockLlm::scripted(vec![Ok(r#"{"state": {"Фамилия": {"value": "123", "status": "invalid", "optional": false}}, "next_question": "Пожалуйста, введите корректную фамилию"}"#.to_string())]);
        let mut engine = DialogEngine::new(one_field_schema(), llm, "mock-model");
        engine.opening();

        let reply = engine.handle_input("123").await.unwrap();
        match reply {
            EngineReply::Ask(q) => assert_eq!(q, "Пожалуйста, введите корректную фамилию"),
            other => panic!("expected Ask, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_field_with_null_question_falls_back_to_canned() {
        let llm = MockLlm::scripted(vec![Ok(r#"{"state": {"Фамилия": {"value": "123", "status": "invalid", "optional": false}}, "next_question": null}"#.to_string())]);
        let mut engine = DialogEngine::new(one_field_schema(), llm, "mock-model");
        engine.opening();

        let reply = engine.handle_input("123").await.unwrap();
        match reply {
            EngineReply::Ask(q) => assert!(q.contains("Фамилия")),
            other => panic!("expected Ask, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejected_confirmation_allows_correction() {
        let llm = MockLlm::scripted(vec![
            Ok(filled_reply("Иванов")),
            Ok(filled_reply("Петров")),
        ]);
        let mut engine = DialogEngine::new(one_field_schema(), llm, "mock-model");
        engine.opening();
        engine.handle_input("Иванов").await.unwrap();

        // reject the summary; the engine asks what to change
        let reply = engine.handle_input("no").await.unwrap();
        assert!(matches!(reply, EngineReply::Ask(_)));

        // the correction turn may overwrite the frozen field
        let reply = engine.handle_input("Фамилия Петров").await.unwrap();
        match reply {
            EngineReply::Confirm(text) => assert!(text.contains("Петров")),
            other => panic!("expected Confirm, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn frozen_field_survives_overwrite_without_correction() {
        let mut schema = one_field_schema();
        schema.fields.push(FieldSpec {
            name: "Имя".into(),
            field_type: FieldType::Str,
            required: true,
            description: None,
            options: None,
            reference_type: None,
        });

        // First turn fills Фамилия; second turn tries to overwrite it
        // while filling Имя.
        let llm = MockLlm::scripted(vec![
            Ok(r#"{"state": {"Фамилия": {"value": "Иванов", "status": "filled", "optional": false}, "Имя": {"value": null, "status": "not_started", "optional": false}}, "next_question": null}"#.to_string()),
            Ok(r#"{"state": {"Фамилия": {"value": "Хакеров", "status": "filled", "optional": false}, "Имя": {"value": "Иван", "status": "filled", "optional": false}}, "next_question": null}"#.to_string()),
        ]);
        let mut engine = DialogEngine::new(schema, llm, "mock-model");
        engine.opening();
        engine.handle_input("Иванов").await.unwrap();
        engine.handle_input("Иван").await.unwrap();

        assert_eq!(
            engine.state().get("Фамилия").unwrap().value,
            Some(json!("Иванов"))
        );
        assert_eq!(engine.state().get("Имя").unwrap().value, Some(json!("Иван")));
    }

    #[tokio::test]
    async fn empty_schema_completes_immediately() {
        let schema = FormSchema {
            id: "empty".into(),
            title: String::new(),
            description: String::new(),
            fields: vec![],
        };
        let llm = MockLlm::scripted(vec![]);
        let mut engine = DialogEngine::new(schema, llm, "mock-model");
        assert_eq!(engine.opening(), EngineReply::Completed);
    }

    #[tokio::test]
    async fn summary_is_idempotent() {
        let llm = MockLlm::scripted(vec![Ok(filled_reply("Иванов"))]);
        let mut engine = DialogEngine::new(one_field_schema(), llm, "mock-model");
        engine.opening();
        engine.handle_input("Иванов").await.unwrap();

        assert_eq!(engine.summary(), engine.summary());
    }

    #[tokio::test]
    async fn total_key_invariant_holds_across_turns() {
        let llm = MockLlm::scripted(vec![
            Ok("garbage".into()),
            Ok(filled_reply("Иванов")),
        ]);
        let schema = one_field_schema();
        let mut engine = DialogEngine::new(schema.clone(), llm, "mock-model");
        engine.opening();

        for input in ["Иванов", "Иванов"] {
            engine.handle_input(input).await.unwrap();
            let state_keys: Vec<&String> = engine.state().field_names().collect();
            let schema_keys: Vec<&str> = schema.field_names();
            assert_eq!(state_keys.len(), schema_keys.len());
            for key in schema_keys {
                assert!(engine.state().contains(key));
            }
        }
    }
}
