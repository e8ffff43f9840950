//! Errors raised by the persistence layer.
//!
//! Everything below the session coordinator fails with [`DbError`]: SQLite
//! connection and query failures, a `board` or `winner` column that no longer
//! parses, a migration that cannot be applied, and a blocking repository task
//! that panicked or was cancelled.

use derive_more::{Display, Error};
use tracing::instrument;

/// Storage failure, tagged with the source location that raised it.
///
/// The message is for logs. Clients only ever see a generic failure.
#[derive(Debug, Clone, Display, Error)]
#[display("Database error: {} at {}:{}", message, file, line)]
pub struct DbError {
    /// What went wrong.
    pub message: String,
    /// Line of the raising call.
    pub line: u32,
    /// File of the raising call.
    pub file: &'static str,
}

impl DbError {
    /// Builds an error located at the caller.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<diesel::result::Error> for DbError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        Self::new(format!("Query failed: {}", err))
    }
}

impl From<diesel::ConnectionError> for DbError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        Self::new(format!("Connection error: {}", err))
    }
}

/// The board is stored as a JSON array of 14 counts.
impl From<serde_json::Error> for DbError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("Malformed board column: {}", err))
    }
}

/// A `spawn_blocking` repository call that never returned a result.
impl From<tokio::task::JoinError> for DbError {
    #[track_caller]
    fn from(err: tokio::task::JoinError) -> Self {
        Self::new(format!("Database task failed: {}", err))
    }
}
