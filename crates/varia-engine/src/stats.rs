//! Aggregate catalog statistics.

use serde::Serialize;

/// Snapshot of catalog counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    /// Images in the catalog.
    pub total_images: i64,
    /// Known sources.
    pub total_sources: i64,
    /// Images with an extracted palette.
    pub images_with_palettes: i64,
    /// Total displays across all images.
    pub total_displays: i64,
    /// Images displayed at least once.
    pub images_shown: i64,
}
