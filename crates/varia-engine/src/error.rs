//! Error types for the selection engine.

use std::io;

/// Errors surfaced by engine operations.
///
/// Hot paths never surface palette or template problems; those degrade
/// and log. What remains is catalog trouble and filesystem trouble.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The catalog store rejected or failed an operation.
    #[error(transparent)]
    Catalog(#[from] varia_catalog::Error),

    /// Filesystem failure while walking folders.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
