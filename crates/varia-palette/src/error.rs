//! Error types for palette extraction.

use std::path::PathBuf;

/// Reasons an extraction attempt produced no palette.
///
/// The extractor maps every variant to `None` for its callers; the enum
/// exists so each failure can be logged at the right level.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The color tool is not on `PATH`.
    #[error("color tool not installed")]
    NotInstalled,

    /// The tool ran past its deadline and was killed.
    #[error("color tool timed out after {0} seconds")]
    Timeout(u64),

    /// The tool exited non-zero or could not be spawned.
    #[error("color tool failed: {0}")]
    External(String),

    /// The tool reported too few distinct colors in the image.
    #[error("not enough colors in image")]
    InsufficientColors,

    /// The tool's cache directory does not exist.
    #[error("cache directory missing: {}", .0.display())]
    CacheDirMissing(PathBuf),

    /// No cache file matching the palette type was fresh enough.
    #[error("no fresh palette file under {}", .0.display())]
    NoFreshCacheFile(PathBuf),

    /// The cache file exists but cannot be understood.
    #[error("malformed palette file: {0}")]
    Malformed(String),
}
