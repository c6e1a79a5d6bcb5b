//! Error types for the catalog store.

use std::{io, path::PathBuf};

use rusqlite::ErrorCode;

/// Errors surfaced by catalog operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The write lock could not be acquired within the retry budget.
    /// Callers may retry.
    #[error("catalog busy: {0}")]
    Busy(String),

    /// A queried entity does not exist. Most callers treat this as
    /// a non-error.
    #[error("not found: {0}")]
    NotFound(String),

    /// A constraint or invariant was violated. Indicates a bug.
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// The on-disk schema does not match this build. Fatal; surface
    /// to the administrator.
    #[error(
        "schema mismatch in {}: found version {found}, expected {expected}",
        .path.display()
    )]
    Schema {
        /// Path of the offending database file.
        path: PathBuf,
        /// Version recorded in the file.
        found: i64,
        /// Version this build expects.
        expected: i64,
    },

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Any other database failure.
    #[error("database error: {0}")]
    Database(#[source] rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(error: rusqlite::Error) -> Self {
        match &error {
            rusqlite::Error::SqliteFailure(code, message) => match code.code {
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                    Self::Busy(message.clone().unwrap_or_else(|| code.to_string()))
                }
                ErrorCode::ConstraintViolation => {
                    Self::Integrity(message.clone().unwrap_or_else(|| code.to_string()))
                }
                _ => Self::Database(error),
            },
            rusqlite::Error::QueryReturnedNoRows => {
                Self::NotFound(String::from("query returned no rows"))
            }
            _ => Self::Database(error),
        }
    }
}
