//! Error types for the theming engine.

use std::{io, path::PathBuf};

/// Errors surfaced by theming operations.
///
/// Per-template failures during an apply are isolated and logged; what
/// callers see is limited to configuration loading problems.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Filesystem failure reading a template or writing a destination.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A config or template file exists but cannot be parsed.
    #[error("malformed file {}: {reason}", .path.display())]
    Malformed {
        /// The offending file.
        path: PathBuf,
        /// Parser diagnostics.
        reason: String,
    },
}
