//! History-aware wallpaper selection.
//!
//! Replaces uniform-random "pick a file" with weighted, color-aware
//! selection over a durable catalog. The pieces:
//!
//! - an indexer that walks wallpaper folders into the catalog,
//! - a pure weight function over recency, source balance, favorites,
//!   newness, and color closeness,
//! - weighted sampling without replacement,
//! - display recording that feeds history back into future weights and
//!   triggers best-effort palette extraction.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::{Path, PathBuf};
//! use varia_engine::{SelectionConfig, SmartSelector, SourceMap};
//!
//! # async fn example() -> Result<(), varia_engine::Error> {
//! let selector = SmartSelector::new(
//!     Path::new("/tmp/smart_selection.db"),
//!     SelectionConfig::default(),
//!     true,
//! )?;
//!
//! let mut sources = SourceMap::new();
//! sources.insert(PathBuf::from("/walls"), "walls");
//! selector.rebuild_index(&[PathBuf::from("/walls")], &sources, |done, total| {
//!     println!("{done}/{total} folders");
//! })?;
//!
//! for path in selector.select_images(1, None)? {
//!     // hand `path` to the wallpaper setter, then:
//!     selector.record_shown(&path, None).await?;
//! }
//! # Ok(())
//! # }
//! ```

mod config;
pub mod error;
mod indexer;
mod sampling;
mod selector;
mod stats;
pub mod weight;

pub use config::{ColorContext, DecayCurve, SelectionConfig, SelectionConstraints};
pub use error::Error;
pub use indexer::{IndexSummary, SourceMap};
pub use selector::{BackfillSummary, RebuildSummary, SmartSelector};
pub use stats::Statistics;
