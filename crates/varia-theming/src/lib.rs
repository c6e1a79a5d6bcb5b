//! Palette-driven theming.
//!
//! Consumes the current wallpaper's stored palette to render templated
//! config files (terminal colors, bar styles, anything text) and then
//! signals the owning applications to reload. Renders are atomic;
//! bursts of wallpaper changes are debounced.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use varia_theming::{ThemeEngine, ThemingConfig};
//!
//! # async fn example(catalog: varia_catalog::Catalog) -> Result<(), varia_theming::Error> {
//! let config = ThemingConfig::load(
//!     Path::new("~/.config/varia/wallust.toml"),
//!     Path::new("~/.config/varia/theming.json"),
//! )?;
//!
//! let engine = ThemeEngine::new(config, move |path| {
//!     catalog.get_palette(path).ok().flatten()
//! });
//!
//! // Debounced, on every wallpaper change:
//! engine.apply(Path::new("/walls/sunset.jpg"));
//!
//! // One-shot, e.g. from the CLI:
//! engine.apply_now(Path::new("/walls/sunset.jpg")).await;
//!
//! engine.cleanup();
//! # Ok(())
//! # }
//! ```

mod atomic;
mod config;
mod engine;
pub mod error;
mod template;

pub use config::{ColorToolSettings, TemplateSpec, ThemingConfig};
pub use engine::{ThemeEngine, build_context};
pub use error::Error;
pub use template::render;
