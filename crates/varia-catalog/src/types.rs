//! Catalog entities.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Upper bound on palette slots (`color0..color15`).
pub const MAX_PALETTE_COLORS: usize = 16;

/// One indexed wallpaper image, keyed by absolute filesystem path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Absolute path; primary key.
    pub filepath: PathBuf,
    /// Basename of `filepath`.
    pub filename: String,
    /// Logical origin of the image, if known.
    pub source_id: Option<String>,
    /// Pixel width, if the header could be read.
    pub width: Option<u32>,
    /// Pixel height, if the header could be read.
    pub height: Option<u32>,
    /// `width / height` when both are known.
    pub aspect_ratio: Option<f64>,
    /// File size in bytes at index time; used for change detection.
    pub file_size: i64,
    /// File modification time, wall-clock seconds. May go backwards
    /// on clock correction; tolerated.
    pub file_mtime: i64,
    /// Whether the user marked this image as a favorite.
    pub is_favorite: bool,
    /// How many times the selector has recorded this image as shown.
    pub times_shown: i64,
    /// Wall-clock seconds of the most recent display, if any.
    pub last_shown_at: Option<i64>,
}

impl ImageRecord {
    /// Creates a record for a path with empty history and no metadata.
    pub fn new(filepath: PathBuf) -> Self {
        let filename = filepath
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            filepath,
            filename,
            source_id: None,
            width: None,
            height: None,
            aspect_ratio: None,
            file_size: 0,
            file_mtime: 0,
            is_favorite: false,
            times_shown: 0,
            last_shown_at: None,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if let Some(width) = self.width
            && width == 0
        {
            return Err(Error::Integrity(format!(
                "zero width for {}",
                self.filepath.display()
            )));
        }
        if let Some(height) = self.height
            && height == 0
        {
            return Err(Error::Integrity(format!(
                "zero height for {}",
                self.filepath.display()
            )));
        }
        if let Some(aspect) = self.aspect_ratio
            && (!aspect.is_finite() || aspect <= 0.0)
        {
            return Err(Error::Integrity(format!(
                "non-positive aspect ratio {aspect} for {}",
                self.filepath.display()
            )));
        }
        if self.times_shown < 0 {
            return Err(Error::Integrity(format!(
                "negative times_shown for {}",
                self.filepath.display()
            )));
        }

        Ok(())
    }
}

/// Logical grouping of images by origin folder or provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Stable identifier, e.g. `favorites` or `downloaded/wallhaven`.
    pub id: String,
    /// Free-form kind tag, e.g. `folder` or `downloaded`.
    pub source_type: String,
    /// Wall-clock seconds of the most recent display from this source.
    pub last_shown_at: Option<i64>,
    /// How many displays this source has accumulated.
    pub times_shown: i64,
}

impl SourceRecord {
    /// Creates a source with empty history.
    pub fn new(id: impl Into<String>, source_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_type: source_type.into(),
            last_shown_at: None,
            times_shown: 0,
        }
    }
}

/// Dominant color palette of one image, one-to-one with [`ImageRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteRecord {
    /// Path of the owning image.
    pub filepath: PathBuf,
    /// Ordered hex colors, `color0` first. Never empty, at most 16.
    pub colors: Vec<String>,
    /// Circular mean hue of the palette, degrees `[0, 360)`.
    pub avg_hue: f32,
    /// Mean saturation, `[0, 1]`.
    pub avg_saturation: f32,
    /// Mean lightness, `[0, 1]`.
    pub avg_lightness: f32,
    /// Warm/cool balance, `[-1, +1]`.
    pub color_temperature: f32,
    /// Wall-clock seconds when the palette was extracted.
    pub extracted_at: Option<i64>,
}

impl PaletteRecord {
    /// The required primary color (`color0`).
    pub fn color0(&self) -> &str {
        self.colors.first().map(String::as_str).unwrap_or("#000000")
    }

    /// Clamps HSL aggregates into their documented ranges.
    pub fn clamp_ranges(&mut self) {
        self.avg_hue = self.avg_hue.rem_euclid(360.0);
        self.avg_saturation = self.avg_saturation.clamp(0.0, 1.0);
        self.avg_lightness = self.avg_lightness.clamp(0.0, 1.0);
        self.color_temperature = self.color_temperature.clamp(-1.0, 1.0);
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.colors.is_empty() {
            return Err(Error::Integrity(format!(
                "palette for {} has no colors",
                self.filepath.display()
            )));
        }
        if self.colors.len() > MAX_PALETTE_COLORS {
            return Err(Error::Integrity(format!(
                "palette for {} has {} colors (max {MAX_PALETTE_COLORS})",
                self.filepath.display(),
                self.colors.len()
            )));
        }
        for color in &self.colors {
            if !varia_color::is_valid_hex(color) {
                return Err(Error::Integrity(format!(
                    "invalid hex color {color:?} for {}",
                    self.filepath.display()
                )));
            }
        }

        Ok(())
    }
}

/// One append-only display log row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayEvent {
    /// Path of the displayed image.
    pub filepath: PathBuf,
    /// Wall-clock seconds of the display.
    pub shown_at: i64,
    /// Source of the image at display time, if known.
    pub source_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_image_derives_filename() {
        let record = ImageRecord::new(PathBuf::from("/walls/sunset.jpg"));
        assert_eq!(record.filename, "sunset.jpg");
        assert_eq!(record.times_shown, 0);
        assert_eq!(record.last_shown_at, None);
    }

    #[test]
    fn validate_rejects_non_positive_aspect() {
        let mut record = ImageRecord::new(PathBuf::from("/walls/a.jpg"));
        record.aspect_ratio = Some(0.0);
        assert!(record.validate().is_err());

        record.aspect_ratio = Some(-1.5);
        assert!(record.validate().is_err());

        record.aspect_ratio = Some(1.777);
        assert!(record.validate().is_ok());
    }

    #[test]
    fn palette_requires_color0() {
        let palette = PaletteRecord {
            filepath: PathBuf::from("/walls/a.jpg"),
            colors: vec![],
            avg_hue: 0.0,
            avg_saturation: 0.0,
            avg_lightness: 0.0,
            color_temperature: 0.0,
            extracted_at: None,
        };
        assert!(palette.validate().is_err());
    }

    #[test]
    fn palette_rejects_malformed_hex() {
        let palette = PaletteRecord {
            filepath: PathBuf::from("/walls/a.jpg"),
            colors: vec![String::from("#80C0FF"), String::from("red")],
            avg_hue: 0.0,
            avg_saturation: 0.0,
            avg_lightness: 0.0,
            color_temperature: 0.0,
            extracted_at: None,
        };
        assert!(palette.validate().is_err());
    }

    #[test]
    fn clamp_ranges_normalizes_aggregates() {
        let mut palette = PaletteRecord {
            filepath: PathBuf::from("/walls/a.jpg"),
            colors: vec![String::from("#80C0FF")],
            avg_hue: 400.0,
            avg_saturation: 1.5,
            avg_lightness: -0.2,
            color_temperature: 3.0,
            extracted_at: None,
        };
        palette.clamp_ranges();

        assert!((0.0..360.0).contains(&palette.avg_hue));
        assert_eq!(palette.avg_saturation, 1.0);
        assert_eq!(palette.avg_lightness, 0.0);
        assert_eq!(palette.color_temperature, 1.0);
    }
}
