//! Persistence sink for completed sessions.
//!
//! Two artifacts per confirmed session, both stable JSON that round-trips
//! losslessly:
//! - the final form state (field name → {value, status, optional})
//! - the full turn-by-turn transcript ({timestamp, role, content}),
//!   error events included, so a session's exact LLM exchanges can be
//!   replayed later.
//!
//! Nothing here runs on abort: an aborted session leaves no files.

pub mod answers;
pub mod transcript;

pub use answers::{load_answers, save_answers};
pub use transcript::save_transcript;

use chrono::{DateTime, Utc};

/// Timestamp fragment used in output file names.
pub(crate) fn file_stamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}
