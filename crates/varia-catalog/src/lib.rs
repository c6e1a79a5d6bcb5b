//! Durable, concurrency-safe catalog of wallpaper images.
//!
//! One SQLite file holds four tables: `images`, `sources`, `palettes`
//! (one-to-one with images, cascade delete), and the append-only
//! `display_events` log. The hot selection path reads denormalized
//! counters on images and sources; the event log exists for analytics.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use varia_catalog::{Catalog, ImageFilter, ImageRecord};
//!
//! # fn example() -> Result<(), varia_catalog::Error> {
//! let catalog = Catalog::open(Path::new("/tmp/smart_selection.db"))?;
//!
//! let mut record = ImageRecord::new("/walls/sunset.jpg".into());
//! record.width = Some(1920);
//! record.height = Some(1080);
//! record.aspect_ratio = Some(1920.0 / 1080.0);
//! catalog.upsert_image(&record)?;
//!
//! let favorites = catalog.query_images(&ImageFilter {
//!     favorites_only: true,
//!     ..Default::default()
//! })?;
//! # let _ = favorites;
//! # Ok(())
//! # }
//! ```

pub mod error;
mod query;
mod store;
mod types;

pub use error::Error;
pub use query::ImageFilter;
pub use store::Catalog;
pub use types::{DisplayEvent, ImageRecord, MAX_PALETTE_COLORS, PaletteRecord, SourceRecord};
