//! Dominant-color palette extraction.
//!
//! Runs the external `wallust` binary against an image, then reads the
//! palette JSON it drops into its cache directory. Every failure mode
//! degrades to `None` so callers never have to unwind a wallpaper change
//! because a color tool hiccuped.

mod error;
mod extractor;
mod parse;

pub use error::Error;
pub use extractor::{PaletteConfig, PaletteExtractor};
