//! Selection orchestration.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use varia_catalog::{Catalog, ImageFilter, PaletteRecord, SourceRecord};
use varia_palette::{PaletteConfig, PaletteExtractor};

use crate::{
    config::{SelectionConfig, SelectionConstraints},
    error::Error,
    indexer::{self, IndexSummary, SourceMap},
    sampling,
    stats::Statistics,
    weight,
};

/// Counters reported by a full rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildSummary {
    /// Folders walked.
    pub folders: usize,
    /// Images written to the fresh catalog.
    pub images: usize,
    /// Files that failed to stat; logged, never fatal.
    pub failed: usize,
    /// Whether the rebuild was cancelled before the swap. A cancelled
    /// rebuild leaves the catalog untouched.
    pub cancelled: bool,
}

/// Counters reported by a palette backfill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillSummary {
    /// Palettes extracted and stored.
    pub extracted: usize,
    /// Images whose extraction or storage failed.
    pub failed: usize,
    /// Whether the backfill stopped at the cancel flag.
    pub cancelled: bool,
}

/// History-aware wallpaper selector over a shared catalog.
///
/// Owned by the host rotator; all writes happen on its wallpaper-change
/// worker thread, reads may come from anywhere.
#[derive(Debug)]
pub struct SmartSelector {
    catalog: Catalog,
    config: SelectionConfig,
    extractor: Option<PaletteExtractor>,
    cancel: CancellationToken,
}

impl SmartSelector {
    /// Opens the catalog at `db_path` and wires up the selector.
    ///
    /// With `enable_palette_extraction`, a wallust-backed extractor with
    /// default settings is attached; displays then trigger palette
    /// extraction as a side effect.
    ///
    /// # Errors
    ///
    /// Returns error if the catalog cannot be opened or carries a
    /// mismatched schema.
    #[instrument(err)]
    pub fn new(
        db_path: &Path,
        config: SelectionConfig,
        enable_palette_extraction: bool,
    ) -> Result<Self, Error> {
        let extractor =
            enable_palette_extraction.then(|| PaletteExtractor::new(PaletteConfig::default()));
        Self::with_extractor(db_path, config, extractor)
    }

    /// Like [`new`](Self::new), but with a caller-configured extractor.
    ///
    /// # Errors
    ///
    /// Returns error if the catalog cannot be opened or carries a
    /// mismatched schema.
    pub fn with_extractor(
        db_path: &Path,
        config: SelectionConfig,
        extractor: Option<PaletteExtractor>,
    ) -> Result<Self, Error> {
        Ok(Self {
            catalog: Catalog::open(db_path)?,
            config,
            extractor,
            cancel: CancellationToken::new(),
        })
    }

    /// The underlying catalog handle.
    ///
    /// Cloning it is how the theming engine gets its palette lookups.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Token observed by long-running operations; cancel it to stop a
    /// rebuild or backfill between items.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Picks up to `count` images by weighted sampling without
    /// replacement.
    ///
    /// An empty candidate set, including one from contradictory
    /// constraints, yields an empty list. When every candidate weighs
    /// zero the draw falls back to uniform; that is logged, not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns catalog errors (`Busy`, `Integrity`) only.
    #[instrument(skip(self, constraints))]
    pub fn select_images(
        &self,
        count: usize,
        constraints: Option<&SelectionConstraints>,
    ) -> Result<Vec<PathBuf>, Error> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let filter = filter_from(constraints);
        let candidates = self.catalog.query_images(&filter)?;
        if candidates.is_empty() {
            info!("no candidates match selection constraints");
            return Ok(Vec::new());
        }

        let now = varia_common::now_secs();
        let sources: HashMap<String, SourceRecord> = self
            .catalog
            .query_sources()?
            .into_iter()
            .map(|source| (source.id.clone(), source))
            .collect();

        let color = constraints.and_then(|c| c.color.as_ref());
        let palettes: HashMap<PathBuf, PaletteRecord> = if color.is_some() {
            candidates
                .iter()
                .filter_map(|image| {
                    let palette = self.catalog.get_palette(&image.filepath).ok().flatten()?;
                    Some((image.filepath.clone(), palette))
                })
                .collect()
        } else {
            HashMap::new()
        };

        let weights: Vec<f64> = candidates
            .iter()
            .map(|image| {
                let source = image.source_id.as_deref().and_then(|id| sources.get(id));
                weight::weight(
                    image,
                    source,
                    palettes.get(&image.filepath),
                    now,
                    &self.config,
                    color,
                )
            })
            .collect();

        if weights.iter().all(|&w| w <= 0.0) {
            info!(
                candidates = candidates.len(),
                "all selection weights are zero, falling back to uniform"
            );
        }

        let mut rng = rand::rng();
        let picked = sampling::sample_without_replacement(&weights, count, &mut rng);

        debug!(candidates = candidates.len(), picked = picked.len(), "selection complete");
        Ok(picked
            .into_iter()
            .map(|index| candidates[index].filepath.clone())
            .collect())
    }

    /// Records that `filepath` was displayed.
    ///
    /// Phase one commits the history transaction (image counters, source
    /// counters, display event); phase two stores the supplied palette
    /// or, failing that, extracts one best-effort. History is durable
    /// even when extraction stalls or dies; a crash between the phases
    /// merely defers the palette to a later backfill.
    ///
    /// # Errors
    ///
    /// Returns catalog errors from phase one. Palette trouble never
    /// propagates.
    #[instrument(skip(self, palette), fields(path = %filepath.display()))]
    pub async fn record_shown(
        &self,
        filepath: &Path,
        palette: Option<PaletteRecord>,
    ) -> Result<(), Error> {
        self.catalog.record_image_shown(filepath)?;

        let record = match palette {
            Some(mut record) => {
                record.filepath = filepath.to_path_buf();
                Some(record)
            }
            None => match &self.extractor {
                Some(extractor) => extractor.extract(filepath).await,
                None => None,
            },
        };

        if let Some(record) = record
            && let Err(error) = self.catalog.upsert_palette(&record)
        {
            warn!(path = %filepath.display(), %error, "cannot store palette");
        }

        Ok(())
    }

    /// Extracts palettes for every image that lacks one.
    ///
    /// Continues past per-image failures and checks the cancel flag
    /// between items; partial progress stays durable.
    ///
    /// # Errors
    ///
    /// Returns catalog errors from listing the work; per-image failures
    /// are only counted.
    #[instrument(skip(self, progress))]
    pub async fn extract_all_palettes(
        &self,
        mut progress: impl FnMut(usize, usize),
    ) -> Result<BackfillSummary, Error> {
        let mut summary = BackfillSummary::default();

        let Some(extractor) = &self.extractor else {
            info!("palette extraction disabled, nothing to backfill");
            return Ok(summary);
        };

        let pending = self.catalog.images_without_palettes(None)?;
        let total = pending.len();

        for (index, image) in pending.iter().enumerate() {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            match extractor.extract(&image.filepath).await {
                Some(palette) => match self.catalog.upsert_palette(&palette) {
                    Ok(()) => summary.extracted += 1,
                    Err(error) => {
                        warn!(path = %image.filepath.display(), %error, "cannot store palette");
                        summary.failed += 1;
                    }
                },
                None => summary.failed += 1,
            }

            progress(index + 1, total);
        }

        Ok(summary)
    }

    /// Incrementally indexes `folders`, preserving display history.
    ///
    /// # Errors
    ///
    /// Returns catalog errors only; per-file failures are counted.
    pub fn index_folders(
        &self,
        folders: &[PathBuf],
        sources: &SourceMap,
        progress: impl FnMut(usize, usize),
    ) -> Result<IndexSummary, Error> {
        indexer::index_folders(&self.catalog, folders, sources, progress)
    }

    /// Rebuilds the catalog from scratch.
    ///
    /// Walks every folder, then swaps the whole image set in a single
    /// transaction; readers see the old catalog or the new one, never
    /// a partial state. An empty folder list clears the catalog. The
    /// progress callback fires per folder with
    /// `(folders_done, folders_total)`.
    ///
    /// # Errors
    ///
    /// Returns catalog errors from the swap; per-file walk failures are
    /// counted and logged.
    #[instrument(skip(self, sources, progress), fields(folders = folders.len()))]
    pub fn rebuild_index(
        &self,
        folders: &[PathBuf],
        sources: &SourceMap,
        mut progress: impl FnMut(usize, usize),
    ) -> Result<RebuildSummary, Error> {
        let folders_total = folders.len();
        let mut images = Vec::new();
        let mut failed = 0;

        for (index, folder) in folders.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!("rebuild cancelled, catalog left untouched");
                return Ok(RebuildSummary {
                    folders: index,
                    images: 0,
                    failed,
                    cancelled: true,
                });
            }

            let mut files = Vec::new();
            indexer::collect_images(folder, &mut files);

            for path in files {
                match indexer::build_record(&path, None, sources) {
                    Ok(Some(record)) => images.push(record),
                    Ok(None) => {}
                    Err(error) => {
                        warn!(path = %path.display(), %error, "cannot stat image");
                        failed += 1;
                    }
                }
            }

            progress(index + 1, folders_total);
        }

        let mut source_records: Vec<SourceRecord> = sources
            .source_ids()
            .map(|id| SourceRecord::new(id, "folder"))
            .collect();
        source_records.sort_by(|a, b| a.id.cmp(&b.id));
        source_records.dedup_by(|a, b| a.id == b.id);

        self.catalog.replace_all(&source_records, &images)?;

        Ok(RebuildSummary {
            folders: folders_total,
            images: images.len(),
            failed,
            cancelled: false,
        })
    }

    /// Snapshot of the catalog counters.
    ///
    /// # Errors
    ///
    /// Returns catalog errors only.
    pub fn get_statistics(&self) -> Result<Statistics, Error> {
        Ok(Statistics {
            total_images: self.catalog.count_images()?,
            total_sources: self.catalog.count_sources()?,
            images_with_palettes: self.catalog.count_images_with_palettes()?,
            total_displays: self.catalog.sum_times_shown()?,
            images_shown: self.catalog.count_shown_images()?,
        })
    }

    /// Marks or unmarks an image as favorite.
    ///
    /// # Errors
    ///
    /// Returns [`varia_catalog::Error::NotFound`] for uncataloged paths.
    pub fn set_favorite(&self, filepath: &Path, favorite: bool) -> Result<(), Error> {
        self.catalog.set_favorite(filepath, favorite)?;
        Ok(())
    }

    /// Zeroes all display history while keeping the images.
    ///
    /// # Errors
    ///
    /// Returns catalog errors only.
    pub fn clear_history(&self) -> Result<(), Error> {
        self.catalog.clear_history()?;
        Ok(())
    }

    /// Suggested color temperature for the current local hour: cool at
    /// night, warm in the late afternoon.
    pub fn time_based_temperature(&self) -> f64 {
        temperature_for_hour(varia_common::local_hour())
    }

    /// Ranks cataloged images by palette closeness to `target` (or to
    /// the current wallpaper's palette) and returns the `count` nearest
    /// with their distance scores, nearest first.
    ///
    /// Images without palettes are skipped; with no target available at
    /// all, the list is empty.
    ///
    /// # Errors
    ///
    /// Returns catalog errors only.
    pub fn color_aware_preview_candidates(
        &self,
        count: usize,
        target: Option<&PaletteRecord>,
    ) -> Result<Vec<(PathBuf, f32)>, Error> {
        let target = match target {
            Some(palette) => palette_point(palette),
            None => match self.current_palette()? {
                Some(palette) => palette_point(&palette),
                None => {
                    info!("no current palette, preview ranking unavailable");
                    return Ok(Vec::new());
                }
            },
        };

        let mut scored: Vec<(PathBuf, f32)> = self
            .catalog
            .query_images(&ImageFilter::default())?
            .into_iter()
            .filter_map(|image| {
                let palette = self.catalog.get_palette(&image.filepath).ok().flatten()?;
                let score = varia_color::perceptual_distance(target, palette_point(&palette));
                Some((image.filepath, score))
            })
            .collect();

        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(count);
        Ok(scored)
    }

    /// Flushes the catalog and cancels any in-flight long operations.
    ///
    /// # Errors
    ///
    /// Returns catalog errors from the final checkpoint.
    pub fn close(&self) -> Result<(), Error> {
        self.cancel.cancel();
        self.catalog.checkpoint()?;
        Ok(())
    }

    fn current_palette(&self) -> Result<Option<PaletteRecord>, Error> {
        let Some(current) = self.catalog.most_recent_shown()? else {
            return Ok(None);
        };
        Ok(self.catalog.get_palette(&current.filepath)?)
    }
}

impl Drop for SmartSelector {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn palette_point(palette: &PaletteRecord) -> (f32, f32, f32) {
    (
        palette.avg_hue,
        palette.avg_saturation,
        palette.avg_lightness,
    )
}

fn filter_from(constraints: Option<&SelectionConstraints>) -> ImageFilter {
    let Some(constraints) = constraints else {
        return ImageFilter::default();
    };

    ImageFilter {
        source_ids: constraints.source_ids.clone(),
        favorites_only: constraints.favorites_only,
        min_aspect: constraints.min_aspect,
        max_aspect: constraints.max_aspect,
        exclude_shown_within: constraints
            .exclude_shown_within_hours
            .map(|hours| (hours * 3_600.0).round() as i64),
        limit: None,
    }
}

/// Piecewise day curve: cool overnight, neutral midday, warm in the
/// late afternoon, easing off through the evening.
pub(crate) fn temperature_for_hour(hour: u32) -> f64 {
    match hour {
        6..=9 => -0.2,
        10..=14 => 0.0,
        15..=18 => 0.5,
        19..=21 => 0.2,
        _ => -0.5,
    }
}
