//! Error types for the dialform domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all dialform operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- LLM transport errors ---
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    // --- Extraction contract errors ---
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    // --- Form template errors ---
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    // --- Persistence errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Transport-level failures from an LLM backend.
///
/// Distinguishable from content errors ([`ExtractionError`]): a transport
/// failure means the model was never heard from (or answered with a
/// protocol-level error), not that it answered badly.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Content-level failures while validating a model reply against the
/// extraction contract. Always recoverable: the engine re-asks the same
/// outstanding question and the session continues.
#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    /// The reply was not parseable JSON, even after stripping a single
    /// fenced code block.
    #[error("model output is not valid JSON: {0}")]
    MalformedOutput(String),

    /// The reply parsed, but violates the `{state, next_question}`
    /// contract or the form schema.
    #[error("model output violates the extraction contract: {detail}")]
    SchemaViolation { detail: String },
}

/// Form template loading/validation failures. Fatal at startup, before
/// any session state exists.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read form template {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("failed to parse form template {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("invalid form template: {reason}")]
    Validation { reason: String },
}

/// Persistence sink failures (answer files, transcript logs).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write {path}: {reason}")]
    Write { path: String, reason: String },

    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_error_displays_correctly() {
        let err = Error::Llm(LlmError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn extraction_error_displays_correctly() {
        let err = Error::Extraction(ExtractionError::SchemaViolation {
            detail: "missing fields: Surname".into(),
        });
        assert!(err.to_string().contains("Surname"));
    }

    #[test]
    fn transport_and_content_errors_are_distinct() {
        let transport = Error::Llm(LlmError::Network("connection refused".into()));
        let content = Error::Extraction(ExtractionError::MalformedOutput("not json".into()));
        assert!(matches!(transport, Error::Llm(_)));
        assert!(matches!(content, Error::Extraction(_)));
    }
}
