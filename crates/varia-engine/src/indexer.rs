//! Folder walking and catalog indexing.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    time::UNIX_EPOCH,
};

use tracing::{debug, warn};
use varia_catalog::{Catalog, ImageRecord, SourceRecord};

use crate::error::Error;

const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "gif", "tif", "tiff"];

/// Maps folder prefixes to source ids; the longest matching prefix wins.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    entries: Vec<(PathBuf, String)>,
}

impl SourceMap {
    /// Creates an empty map; every file falls into no source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a folder prefix as belonging to a source.
    pub fn insert(&mut self, prefix: PathBuf, source_id: impl Into<String>) {
        self.entries.push((prefix, source_id.into()));
    }

    /// Resolves the source of a file path, if any prefix matches.
    pub fn source_for(&self, path: &Path) -> Option<&str> {
        self.entries
            .iter()
            .filter(|(prefix, _)| path.starts_with(prefix))
            .max_by_key(|(prefix, _)| prefix.components().count())
            .map(|(_, id)| id.as_str())
    }

    /// Iterates over all registered source ids.
    pub fn source_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, id)| id.as_str())
    }
}

/// Counters reported by an indexing pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexSummary {
    /// Files inserted or refreshed.
    pub indexed: usize,
    /// Files skipped because `(size, mtime)` was unchanged.
    pub skipped: usize,
    /// Files that failed to stat or upsert; logged, never fatal.
    pub failed: usize,
}

/// Whether a path carries one of the supported image extensions.
pub(crate) fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Recursively collects supported image files under `root`.
///
/// Unreadable directories are logged and skipped.
pub(crate) fn collect_images(root: &Path, files: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(error) => {
            warn!(folder = %root.display(), %error, "cannot read folder");
            return;
        }
    };

    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        if path.is_dir() {
            collect_images(&path, files);
        } else if is_supported(&path) {
            files.push(path);
        }
    }
}

/// Builds a fresh record for `path`, or `None` when the existing record
/// is up to date.
///
/// Dimension probing failures leave width/height null; only stat
/// failures are errors.
pub(crate) fn build_record(
    path: &Path,
    existing: Option<&ImageRecord>,
    sources: &SourceMap,
) -> Result<Option<ImageRecord>, Error> {
    let metadata = fs::metadata(path)?;
    let size = i64::try_from(metadata.len()).unwrap_or(i64::MAX);
    let mtime = metadata
        .modified()?
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0);

    if let Some(existing) = existing
        && existing.file_size == size
        && existing.file_mtime == mtime
    {
        return Ok(None);
    }

    let mut record = ImageRecord::new(path.to_path_buf());
    record.file_size = size;
    record.file_mtime = mtime;
    record.source_id = sources.source_for(path).map(str::to_owned);

    match image::image_dimensions(path) {
        Ok((width, height)) if width > 0 && height > 0 => {
            record.width = Some(width);
            record.height = Some(height);
            record.aspect_ratio = Some(f64::from(width) / f64::from(height));
        }
        Ok((width, height)) => {
            debug!(path = %path.display(), width, height, "degenerate image dimensions");
        }
        Err(error) => {
            debug!(path = %path.display(), %error, "cannot read image dimensions");
        }
    }

    Ok(Some(record))
}

/// Incrementally indexes `folders` into the catalog.
///
/// History fields of existing records are preserved; unchanged files
/// (same size and mtime) are skipped. The progress callback receives
/// `(done, total)` where the total grows as new folders are walked.
pub(crate) fn index_folders(
    catalog: &Catalog,
    folders: &[PathBuf],
    sources: &SourceMap,
    mut progress: impl FnMut(usize, usize),
) -> Result<IndexSummary, Error> {
    let mut summary = IndexSummary::default();
    let mut known_sources: HashSet<String> = HashSet::new();
    let mut files: Vec<PathBuf> = Vec::new();
    let mut done = 0;

    for folder in folders {
        let start = files.len();
        collect_images(folder, &mut files);
        let total = files.len();

        for path in files[start..].to_vec() {
            done += 1;

            let existing = match catalog.get_image(&path) {
                Ok(existing) => existing,
                Err(error) => {
                    warn!(path = %path.display(), %error, "cannot look up image");
                    summary.failed += 1;
                    progress(done, total);
                    continue;
                }
            };

            match build_record(&path, existing.as_ref(), sources) {
                Ok(None) => summary.skipped += 1,
                Ok(Some(record)) => {
                    if let Err(error) = ensure_source(catalog, &record, &mut known_sources)
                        .and_then(|()| catalog.upsert_image(&record).map_err(Error::from))
                    {
                        warn!(path = %path.display(), %error, "cannot index image");
                        summary.failed += 1;
                    } else {
                        summary.indexed += 1;
                    }
                }
                Err(error) => {
                    warn!(path = %path.display(), %error, "cannot stat image");
                    summary.failed += 1;
                }
            }

            progress(done, total);
        }
    }

    Ok(summary)
}

fn ensure_source(
    catalog: &Catalog,
    record: &ImageRecord,
    known: &mut HashSet<String>,
) -> Result<(), Error> {
    if let Some(source_id) = &record.source_id
        && !known.contains(source_id)
    {
        catalog.upsert_source(&SourceRecord::new(source_id.clone(), "folder"))?;
        known.insert(source_id.clone());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::Write;

    use super::*;

    fn write_png(path: &Path, width: u32, height: u32) {
        image::RgbImage::new(width, height).save(path).unwrap();
    }

    #[test]
    fn supported_extensions_are_case_insensitive() {
        assert!(is_supported(Path::new("/walls/a.jpg")));
        assert!(is_supported(Path::new("/walls/a.JPEG")));
        assert!(is_supported(Path::new("/walls/a.WebP")));
        assert!(!is_supported(Path::new("/walls/a.txt")));
        assert!(!is_supported(Path::new("/walls/noext")));
    }

    #[test]
    fn collect_walks_subfolders() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("top.png"), 4, 4);
        fs::create_dir(dir.path().join("nested")).unwrap();
        write_png(&dir.path().join("nested/deep.png"), 4, 4);
        File::create(dir.path().join("notes.txt")).unwrap();

        let mut files = Vec::new();
        collect_images(dir.path(), &mut files);

        assert_eq!(files.len(), 2);
    }

    #[test]
    fn source_map_prefers_longest_prefix() {
        let mut map = SourceMap::new();
        map.insert(PathBuf::from("/walls"), "walls");
        map.insert(PathBuf::from("/walls/downloaded"), "downloaded/wallhaven");

        assert_eq!(map.source_for(Path::new("/walls/a.jpg")), Some("walls"));
        assert_eq!(
            map.source_for(Path::new("/walls/downloaded/b.jpg")),
            Some("downloaded/wallhaven")
        );
        assert_eq!(map.source_for(Path::new("/elsewhere/c.jpg")), None);
    }

    #[test]
    fn build_record_reads_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.png");
        write_png(&path, 64, 32);

        let record = build_record(&path, None, &SourceMap::new())
            .unwrap()
            .unwrap();

        assert_eq!(record.width, Some(64));
        assert_eq!(record.height, Some(32));
        assert!((record.aspect_ratio.unwrap() - 2.0).abs() < 1e-9);
        assert!(record.file_size > 0);
        assert!(record.file_mtime > 0);
    }

    #[test]
    fn build_record_tolerates_unreadable_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        File::create(&path).unwrap().write_all(b"not an image").unwrap();

        let record = build_record(&path, None, &SourceMap::new())
            .unwrap()
            .unwrap();

        assert_eq!(record.width, None);
        assert_eq!(record.aspect_ratio, None);
    }

    #[test]
    fn build_record_skips_unchanged_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("same.png");
        write_png(&path, 4, 4);

        let first = build_record(&path, None, &SourceMap::new())
            .unwrap()
            .unwrap();
        let second = build_record(&path, Some(&first), &SourceMap::new()).unwrap();

        assert!(second.is_none());
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = build_record(Path::new("/nonexistent/x.png"), None, &SourceMap::new());
        assert!(result.is_err());
    }
}
