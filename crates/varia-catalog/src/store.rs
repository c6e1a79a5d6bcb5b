//! SQLite-backed catalog store.
//!
//! One database file holds images, sources, palettes, and the display
//! log. Writes are serialized through a process-wide mutex; the store's
//! own busy timeout plus an exponential backoff (bounded at roughly one
//! second) covers cross-process contention.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use derive_more::Debug;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::{debug, instrument, warn};

use crate::{
    error::Error,
    query::ImageFilter,
    types::{DisplayEvent, ImageRecord, PaletteRecord, SourceRecord},
};

const SCHEMA_VERSION: i64 = 1;
const BUSY_BACKOFF_MS: [u64; 4] = [50, 100, 200, 400];

const IMAGE_COLUMNS: &str = "filepath, filename, source_id, width, height, aspect_ratio, \
     file_size, file_mtime, is_favorite, times_shown, last_shown_at";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sources (
    id TEXT PRIMARY KEY,
    source_type TEXT NOT NULL,
    last_shown_at INTEGER,
    times_shown INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS images (
    filepath TEXT PRIMARY KEY,
    filename TEXT NOT NULL,
    source_id TEXT REFERENCES sources(id) ON DELETE SET NULL,
    width INTEGER,
    height INTEGER,
    aspect_ratio REAL,
    file_size INTEGER NOT NULL DEFAULT 0,
    file_mtime INTEGER NOT NULL DEFAULT 0,
    is_favorite INTEGER NOT NULL DEFAULT 0,
    times_shown INTEGER NOT NULL DEFAULT 0,
    last_shown_at INTEGER
);

CREATE TABLE IF NOT EXISTS palettes (
    filepath TEXT PRIMARY KEY REFERENCES images(filepath) ON DELETE CASCADE,
    colors TEXT NOT NULL,
    avg_hue REAL NOT NULL,
    avg_saturation REAL NOT NULL,
    avg_lightness REAL NOT NULL,
    color_temperature REAL NOT NULL,
    extracted_at INTEGER
);

CREATE TABLE IF NOT EXISTS display_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    filepath TEXT NOT NULL REFERENCES images(filepath) ON DELETE CASCADE,
    shown_at INTEGER NOT NULL,
    source_id TEXT
);

CREATE INDEX IF NOT EXISTS idx_images_source ON images(source_id);
CREATE INDEX IF NOT EXISTS idx_images_last_shown ON images(last_shown_at);
CREATE INDEX IF NOT EXISTS idx_display_events_shown_at ON display_events(shown_at);
";

/// Durable catalog over images, sources, palettes, and display history.
///
/// Cloning is cheap; all clones share one serialized connection.
#[derive(Debug, Clone)]
pub struct Catalog {
    #[debug(skip)]
    connection: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl Catalog {
    /// Opens (creating if needed) the catalog at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] if the file carries a different schema
    /// version, or a database error if the file cannot be opened.
    #[instrument(err)]
    pub fn open(path: &Path) -> Result<Self, Error> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }

        let connection = Connection::open(path)?;
        connection.busy_timeout(Duration::from_secs(1))?;
        connection.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )?;

        let found: i64 = connection.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        match found {
            0 => {
                connection.execute_batch(SCHEMA)?;
                connection.pragma_update(None, "user_version", SCHEMA_VERSION)?;
            }
            v if v == SCHEMA_VERSION => {}
            v => {
                return Err(Error::Schema {
                    path: path.to_path_buf(),
                    found: v,
                    expected: SCHEMA_VERSION,
                });
            }
        }

        debug!(path = %path.display(), "catalog opened");
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            path: path.to_path_buf(),
        })
    }

    /// Path of the backing database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Inserts or refreshes an image row by filepath.
    ///
    /// Metadata columns are overwritten; `is_favorite`, `times_shown`,
    /// and `last_shown_at` are preserved for existing rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Integrity`] for invalid records (non-positive
    /// aspect, unknown source), [`Error::Busy`] past the retry budget.
    pub fn upsert_image(&self, record: &ImageRecord) -> Result<(), Error> {
        record.validate()?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO images (filepath, filename, source_id, width, height, aspect_ratio,
                                     file_size, file_mtime, is_favorite, times_shown, last_shown_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(filepath) DO UPDATE SET
                     filename = excluded.filename,
                     source_id = excluded.source_id,
                     width = excluded.width,
                     height = excluded.height,
                     aspect_ratio = excluded.aspect_ratio,
                     file_size = excluded.file_size,
                     file_mtime = excluded.file_mtime",
                params![
                    path_str(&record.filepath),
                    record.filename,
                    record.source_id,
                    record.width,
                    record.height,
                    record.aspect_ratio,
                    record.file_size,
                    record.file_mtime,
                    record.is_favorite,
                    record.times_shown,
                    record.last_shown_at,
                ],
            )?;
            Ok(())
        })
    }

    /// Looks up one image by path.
    ///
    /// # Errors
    ///
    /// Returns database errors; a missing row is `Ok(None)`.
    pub fn get_image(&self, filepath: &Path) -> Result<Option<ImageRecord>, Error> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {IMAGE_COLUMNS} FROM images WHERE filepath = ?1");
            let record = conn
                .query_row(&sql, params![path_str(filepath)], image_from_row)
                .optional()?;
            Ok(record)
        })
    }

    /// Returns images matching every predicate of `filter`.
    ///
    /// Contradictory filters return an empty list, never an error.
    ///
    /// # Errors
    ///
    /// Returns database errors only.
    pub fn query_images(&self, filter: &ImageFilter) -> Result<Vec<ImageRecord>, Error> {
        let (suffix, params) = filter.to_sql(varia_common::now_secs());
        self.with_conn(|conn| {
            let sql = format!("SELECT {IMAGE_COLUMNS} FROM images{suffix}");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(params.iter().cloned()), image_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Flips the favorite flag on an image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the image is not cataloged.
    pub fn set_favorite(&self, filepath: &Path, favorite: bool) -> Result<(), Error> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE images SET is_favorite = ?2 WHERE filepath = ?1",
                params![path_str(filepath), favorite],
            )?;
            if updated == 0 {
                return Err(Error::NotFound(format!("image {}", filepath.display())));
            }
            Ok(())
        })
    }

    /// Records a display of `filepath`: bumps the image counters, the
    /// parent source counters, and appends a display event, all in one
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for uncataloged paths, [`Error::Busy`]
    /// past the retry budget.
    #[instrument(skip(self), fields(path = %filepath.display()), err)]
    pub fn record_image_shown(&self, filepath: &Path) -> Result<(), Error> {
        let now = varia_common::now_secs();
        self.with_conn(|conn| {
            let tx = conn.transaction()?;

            let updated = tx.execute(
                "UPDATE images SET times_shown = times_shown + 1, last_shown_at = ?2
                 WHERE filepath = ?1",
                params![path_str(filepath), now],
            )?;
            if updated == 0 {
                return Err(Error::NotFound(format!("image {}", filepath.display())));
            }

            let source_id: Option<String> = tx.query_row(
                "SELECT source_id FROM images WHERE filepath = ?1",
                params![path_str(filepath)],
                |row| row.get(0),
            )?;

            if let Some(source_id) = &source_id {
                tx.execute(
                    "UPDATE sources SET times_shown = times_shown + 1, last_shown_at = ?2
                     WHERE id = ?1",
                    params![source_id, now],
                )?;
            }

            tx.execute(
                "INSERT INTO display_events (filepath, shown_at, source_id) VALUES (?1, ?2, ?3)",
                params![path_str(filepath), now, source_id],
            )?;

            tx.commit()?;
            Ok(())
        })
    }

    /// Inserts or refreshes a source, preserving its counters.
    ///
    /// # Errors
    ///
    /// Returns database errors only.
    pub fn upsert_source(&self, record: &SourceRecord) -> Result<(), Error> {
        self.with_conn(|conn| {
            upsert_source_in(conn, record)?;
            Ok(())
        })
    }

    /// Looks up one source by id.
    ///
    /// # Errors
    ///
    /// Returns database errors; a missing row is `Ok(None)`.
    pub fn get_source(&self, id: &str) -> Result<Option<SourceRecord>, Error> {
        self.with_conn(|conn| {
            let record = conn
                .query_row(
                    "SELECT id, source_type, last_shown_at, times_shown FROM sources WHERE id = ?1",
                    params![id],
                    source_from_row,
                )
                .optional()?;
            Ok(record)
        })
    }

    /// Returns every known source.
    ///
    /// # Errors
    ///
    /// Returns database errors only.
    pub fn query_sources(&self) -> Result<Vec<SourceRecord>, Error> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, source_type, last_shown_at, times_shown FROM sources ORDER BY id")?;
            let rows = stmt
                .query_map([], source_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Inserts or replaces the palette of an image.
    ///
    /// HSL aggregates are clamped into range before persistence.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Integrity`] for malformed colors or when the
    /// owning image is not cataloged.
    pub fn upsert_palette(&self, record: &PaletteRecord) -> Result<(), Error> {
        record.validate()?;
        let mut record = record.clone();
        record.clamp_ranges();

        let colors_json = serde_json::to_string(&record.colors)
            .map_err(|e| Error::Integrity(format!("cannot serialize palette colors: {e}")))?;

        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO palettes
                     (filepath, colors, avg_hue, avg_saturation, avg_lightness,
                      color_temperature, extracted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    path_str(&record.filepath),
                    colors_json,
                    f64::from(record.avg_hue),
                    f64::from(record.avg_saturation),
                    f64::from(record.avg_lightness),
                    f64::from(record.color_temperature),
                    record.extracted_at,
                ],
            )?;
            Ok(())
        })
    }

    /// Looks up the palette of an image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Integrity`] if the stored color list cannot be
    /// decoded; a missing row is `Ok(None)`.
    pub fn get_palette(&self, filepath: &Path) -> Result<Option<PaletteRecord>, Error> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT filepath, colors, avg_hue, avg_saturation, avg_lightness,
                            color_temperature, extracted_at
                     FROM palettes WHERE filepath = ?1",
                    params![path_str(filepath)],
                    palette_row,
                )
                .optional()?;

            match row {
                None => Ok(None),
                Some((record, colors_json)) => {
                    let colors: Vec<String> = serde_json::from_str(&colors_json).map_err(|e| {
                        Error::Integrity(format!(
                            "corrupt palette colors for {}: {e}",
                            record.filepath.display()
                        ))
                    })?;
                    Ok(Some(PaletteRecord { colors, ..record }))
                }
            }
        })
    }

    /// Returns images that do not yet have a palette, oldest path first.
    ///
    /// # Errors
    ///
    /// Returns database errors only.
    pub fn images_without_palettes(&self, limit: Option<u32>) -> Result<Vec<ImageRecord>, Error> {
        self.with_conn(|conn| {
            let mut sql = format!(
                "SELECT {IMAGE_COLUMNS} FROM images
                 WHERE filepath NOT IN (SELECT filepath FROM palettes)
                 ORDER BY filepath"
            );
            if let Some(limit) = limit {
                sql.push_str(&format!(" LIMIT {limit}"));
            }
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], image_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns the most recently displayed image, if any.
    ///
    /// # Errors
    ///
    /// Returns database errors only.
    pub fn most_recent_shown(&self) -> Result<Option<ImageRecord>, Error> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {IMAGE_COLUMNS} FROM images
                 WHERE last_shown_at IS NOT NULL
                 ORDER BY last_shown_at DESC LIMIT 1"
            );
            let record = conn.query_row(&sql, [], image_from_row).optional()?;
            Ok(record)
        })
    }

    /// Returns the newest display events, most recent first.
    ///
    /// # Errors
    ///
    /// Returns database errors only.
    pub fn recent_events(&self, limit: u32) -> Result<Vec<DisplayEvent>, Error> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT filepath, shown_at, source_id FROM display_events
                 ORDER BY shown_at DESC, id DESC LIMIT ?1",
            )?;
            let rows = stmt
                .query_map(params![limit], |row| {
                    Ok(DisplayEvent {
                        filepath: PathBuf::from(row.get::<_, String>(0)?),
                        shown_at: row.get(1)?,
                        source_id: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Number of cataloged images.
    ///
    /// # Errors
    ///
    /// Returns database errors only.
    pub fn count_images(&self) -> Result<i64, Error> {
        self.scalar("SELECT COUNT(*) FROM images")
    }

    /// Number of known sources.
    ///
    /// # Errors
    ///
    /// Returns database errors only.
    pub fn count_sources(&self) -> Result<i64, Error> {
        self.scalar("SELECT COUNT(*) FROM sources")
    }

    /// Number of images that have an extracted palette.
    ///
    /// # Errors
    ///
    /// Returns database errors only.
    pub fn count_images_with_palettes(&self) -> Result<i64, Error> {
        self.scalar("SELECT COUNT(*) FROM palettes")
    }

    /// Total displays across all images.
    ///
    /// # Errors
    ///
    /// Returns database errors only.
    pub fn sum_times_shown(&self) -> Result<i64, Error> {
        self.scalar("SELECT COALESCE(SUM(times_shown), 0) FROM images")
    }

    /// Number of images displayed at least once.
    ///
    /// # Errors
    ///
    /// Returns database errors only.
    pub fn count_shown_images(&self) -> Result<i64, Error> {
        self.scalar("SELECT COUNT(*) FROM images WHERE times_shown > 0")
    }

    /// Zeroes all display history: image and source counters, and the
    /// display log. Atomic.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] past the retry budget.
    #[instrument(skip(self), err)]
    pub fn clear_history(&self) -> Result<(), Error> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute("UPDATE images SET times_shown = 0, last_shown_at = NULL", [])?;
            tx.execute("UPDATE sources SET times_shown = 0, last_shown_at = NULL", [])?;
            tx.execute("DELETE FROM display_events", [])?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Deletes every image; palettes and display events cascade.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] past the retry budget.
    #[instrument(skip(self), err)]
    pub fn delete_all_images(&self) -> Result<(), Error> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM images", [])?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Atomically replaces the whole image set.
    ///
    /// Existing images (with their palettes and events) are deleted and
    /// the fresh records inserted in one transaction, so readers see the
    /// old or the new catalog, never a partial one. Sources are upserted
    /// and keep their counters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Integrity`] for invalid records, [`Error::Busy`]
    /// past the retry budget.
    #[instrument(skip_all, fields(images = images.len(), sources = sources.len()), err)]
    pub fn replace_all(
        &self,
        sources: &[SourceRecord],
        images: &[ImageRecord],
    ) -> Result<(), Error> {
        for image in images {
            image.validate()?;
        }

        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM images", [])?;
            for source in sources {
                upsert_source_in(&tx, source)?;
            }
            for image in images {
                tx.execute(
                    "INSERT OR REPLACE INTO images
                         (filepath, filename, source_id, width, height, aspect_ratio,
                          file_size, file_mtime, is_favorite, times_shown, last_shown_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    params![
                        path_str(&image.filepath),
                        image.filename,
                        image.source_id,
                        image.width,
                        image.height,
                        image.aspect_ratio,
                        image.file_size,
                        image.file_mtime,
                        image.is_favorite,
                        image.times_shown,
                        image.last_shown_at,
                    ],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Flushes the write-ahead log into the main database file.
    ///
    /// # Errors
    ///
    /// Returns database errors only.
    pub fn checkpoint(&self) -> Result<(), Error> {
        self.with_conn(|conn| {
            conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
            Ok(())
        })
    }

    fn scalar(&self, sql: &str) -> Result<i64, Error> {
        self.with_conn(|conn| {
            let value: i64 = conn.query_row(sql, [], |row| row.get(0))?;
            Ok(value)
        })
    }

    /// Runs `op` under the connection mutex, retrying on lock contention
    /// with exponential backoff until the budget is spent.
    fn with_conn<T>(&self, op: impl Fn(&mut Connection) -> Result<T, Error>) -> Result<T, Error> {
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| Error::Integrity(String::from("catalog connection mutex poisoned")))?;

        let mut attempt = 0;
        loop {
            match op(&mut guard) {
                Err(Error::Busy(reason)) => {
                    if attempt >= BUSY_BACKOFF_MS.len() {
                        return Err(Error::Busy(reason));
                    }
                    warn!(attempt, reason = %reason, "catalog busy, backing off");
                    thread::sleep(Duration::from_millis(BUSY_BACKOFF_MS[attempt]));
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn image_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ImageRecord> {
    Ok(ImageRecord {
        filepath: PathBuf::from(row.get::<_, String>(0)?),
        filename: row.get(1)?,
        source_id: row.get(2)?,
        width: row.get(3)?,
        height: row.get(4)?,
        aspect_ratio: row.get(5)?,
        file_size: row.get(6)?,
        file_mtime: row.get(7)?,
        is_favorite: row.get(8)?,
        times_shown: row.get(9)?,
        last_shown_at: row.get(10)?,
    })
}

fn source_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SourceRecord> {
    Ok(SourceRecord {
        id: row.get(0)?,
        source_type: row.get(1)?,
        last_shown_at: row.get(2)?,
        times_shown: row.get(3)?,
    })
}

/// Maps a palette row, returning the undecoded colors JSON alongside.
fn palette_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(PaletteRecord, String)> {
    Ok((
        PaletteRecord {
            filepath: PathBuf::from(row.get::<_, String>(0)?),
            colors: Vec::new(),
            avg_hue: row.get::<_, f64>(2)? as f32,
            avg_saturation: row.get::<_, f64>(3)? as f32,
            avg_lightness: row.get::<_, f64>(4)? as f32,
            color_temperature: row.get::<_, f64>(5)? as f32,
            extracted_at: row.get(6)?,
        },
        row.get(1)?,
    ))
}

fn upsert_source_in(conn: &Connection, record: &SourceRecord) -> Result<(), Error> {
    conn.execute(
        "INSERT INTO sources (id, source_type, last_shown_at, times_shown)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET source_type = excluded.source_type",
        params![
            record.id,
            record.source_type,
            record.last_shown_at,
            record.times_shown,
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn open_catalog() -> (TempDir, Catalog) {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::open(&dir.path().join("test.db")).unwrap();
        (dir, catalog)
    }

    fn image(path: &str) -> ImageRecord {
        let mut record = ImageRecord::new(PathBuf::from(path));
        record.width = Some(1920);
        record.height = Some(1080);
        record.aspect_ratio = Some(1920.0 / 1080.0);
        record.file_size = 1024;
        record.file_mtime = 1_700_000_000;
        record
    }

    fn palette(path: &str) -> PaletteRecord {
        PaletteRecord {
            filepath: PathBuf::from(path),
            colors: vec![String::from("#112233"), String::from("#80C0FF")],
            avg_hue: 210.0,
            avg_saturation: 0.5,
            avg_lightness: 0.6,
            color_temperature: -0.8,
            extracted_at: Some(1_700_000_000),
        }
    }

    #[test]
    fn upsert_and_get_round_trip() {
        let (_dir, catalog) = open_catalog();
        let record = image("/walls/a.jpg");

        catalog.upsert_image(&record).unwrap();
        let loaded = catalog.get_image(Path::new("/walls/a.jpg")).unwrap().unwrap();

        assert_eq!(loaded, record);
        assert!(catalog.get_image(Path::new("/walls/missing.jpg")).unwrap().is_none());
    }

    #[test]
    fn upsert_preserves_history_fields() {
        let (_dir, catalog) = open_catalog();
        catalog.upsert_image(&image("/walls/a.jpg")).unwrap();
        catalog.set_favorite(Path::new("/walls/a.jpg"), true).unwrap();
        catalog.record_image_shown(Path::new("/walls/a.jpg")).unwrap();

        let mut refreshed = image("/walls/a.jpg");
        refreshed.width = Some(2560);
        refreshed.height = Some(1440);
        refreshed.file_mtime = 1_800_000_000;
        catalog.upsert_image(&refreshed).unwrap();

        let loaded = catalog.get_image(Path::new("/walls/a.jpg")).unwrap().unwrap();
        assert_eq!(loaded.width, Some(2560));
        assert_eq!(loaded.file_mtime, 1_800_000_000);
        assert!(loaded.is_favorite);
        assert_eq!(loaded.times_shown, 1);
        assert!(loaded.last_shown_at.is_some());
    }

    #[test]
    fn record_shown_increments_and_stamps() {
        let (_dir, catalog) = open_catalog();
        catalog.upsert_image(&image("/walls/a.jpg")).unwrap();

        let before = catalog.get_image(Path::new("/walls/a.jpg")).unwrap().unwrap();
        catalog.record_image_shown(Path::new("/walls/a.jpg")).unwrap();
        let after = catalog.get_image(Path::new("/walls/a.jpg")).unwrap().unwrap();

        assert_eq!(after.times_shown, before.times_shown + 1);
        let shown_at = after.last_shown_at.unwrap();
        assert!((varia_common::now_secs() - shown_at).abs() <= 1);
    }

    #[test]
    fn record_shown_updates_source_and_log() {
        let (_dir, catalog) = open_catalog();
        catalog
            .upsert_source(&SourceRecord::new("walls", "folder"))
            .unwrap();
        let mut record = image("/walls/a.jpg");
        record.source_id = Some(String::from("walls"));
        catalog.upsert_image(&record).unwrap();

        catalog.record_image_shown(Path::new("/walls/a.jpg")).unwrap();

        let source = catalog.get_source("walls").unwrap().unwrap();
        assert_eq!(source.times_shown, 1);
        assert!(source.last_shown_at.is_some());

        let events = catalog.recent_events(10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].filepath, PathBuf::from("/walls/a.jpg"));
        assert_eq!(events[0].source_id.as_deref(), Some("walls"));
    }

    #[test]
    fn record_shown_unknown_path_is_not_found() {
        let (_dir, catalog) = open_catalog();
        let result = catalog.record_image_shown(Path::new("/walls/ghost.jpg"));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn clear_history_zeroes_counters_but_keeps_images() {
        let (_dir, catalog) = open_catalog();
        catalog.upsert_image(&image("/walls/a.jpg")).unwrap();
        catalog.upsert_image(&image("/walls/b.jpg")).unwrap();
        catalog.record_image_shown(Path::new("/walls/a.jpg")).unwrap();
        catalog.record_image_shown(Path::new("/walls/a.jpg")).unwrap();

        catalog.clear_history().unwrap();

        assert_eq!(catalog.count_images().unwrap(), 2);
        assert_eq!(catalog.sum_times_shown().unwrap(), 0);
        assert_eq!(catalog.count_shown_images().unwrap(), 0);
        assert!(catalog.recent_events(10).unwrap().is_empty());

        let loaded = catalog.get_image(Path::new("/walls/a.jpg")).unwrap().unwrap();
        assert_eq!(loaded.last_shown_at, None);
    }

    #[test]
    fn delete_all_cascades_palettes_and_events() {
        let (_dir, catalog) = open_catalog();
        catalog.upsert_image(&image("/walls/a.jpg")).unwrap();
        catalog.upsert_palette(&palette("/walls/a.jpg")).unwrap();
        catalog.record_image_shown(Path::new("/walls/a.jpg")).unwrap();

        catalog.delete_all_images().unwrap();

        assert_eq!(catalog.count_images().unwrap(), 0);
        assert_eq!(catalog.count_images_with_palettes().unwrap(), 0);
        assert!(catalog.recent_events(10).unwrap().is_empty());
    }

    #[test]
    fn query_filters_favorites() {
        let (_dir, catalog) = open_catalog();
        catalog.upsert_image(&image("/walls/a.jpg")).unwrap();
        catalog.upsert_image(&image("/walls/b.jpg")).unwrap();
        catalog.set_favorite(Path::new("/walls/b.jpg"), true).unwrap();

        let favorites = catalog
            .query_images(&ImageFilter {
                favorites_only: true,
                ..Default::default()
            })
            .unwrap();

        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].filepath, PathBuf::from("/walls/b.jpg"));
    }

    #[test]
    fn contradictory_filter_returns_empty() {
        let (_dir, catalog) = open_catalog();
        catalog.upsert_image(&image("/walls/a.jpg")).unwrap();

        let none = catalog
            .query_images(&ImageFilter {
                source_ids: Some(vec![]),
                ..Default::default()
            })
            .unwrap();
        assert!(none.is_empty());

        let impossible = catalog
            .query_images(&ImageFilter {
                min_aspect: Some(3.0),
                max_aspect: Some(1.0),
                ..Default::default()
            })
            .unwrap();
        assert!(impossible.is_empty());
    }

    #[test]
    fn query_excludes_recently_shown() {
        let (_dir, catalog) = open_catalog();
        catalog.upsert_image(&image("/walls/a.jpg")).unwrap();
        catalog.upsert_image(&image("/walls/b.jpg")).unwrap();
        catalog.record_image_shown(Path::new("/walls/a.jpg")).unwrap();

        let fresh = catalog
            .query_images(&ImageFilter {
                exclude_shown_within: Some(3_600),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].filepath, PathBuf::from("/walls/b.jpg"));
    }

    #[test]
    fn query_respects_aspect_range_and_limit() {
        let (_dir, catalog) = open_catalog();
        let mut portrait = image("/walls/portrait.jpg");
        portrait.width = Some(1080);
        portrait.height = Some(1920);
        portrait.aspect_ratio = Some(1080.0 / 1920.0);
        catalog.upsert_image(&portrait).unwrap();
        catalog.upsert_image(&image("/walls/wide-a.jpg")).unwrap();
        catalog.upsert_image(&image("/walls/wide-b.jpg")).unwrap();

        let wide = catalog
            .query_images(&ImageFilter {
                min_aspect: Some(1.0),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(wide.len(), 2);

        let limited = catalog
            .query_images(&ImageFilter {
                min_aspect: Some(1.0),
                limit: Some(1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn palette_round_trip_clamps_ranges() {
        let (_dir, catalog) = open_catalog();
        catalog.upsert_image(&image("/walls/a.jpg")).unwrap();

        let mut record = palette("/walls/a.jpg");
        record.avg_saturation = 1.7;
        record.color_temperature = -4.0;
        catalog.upsert_palette(&record).unwrap();

        let loaded = catalog.get_palette(Path::new("/walls/a.jpg")).unwrap().unwrap();
        assert_eq!(loaded.colors, record.colors);
        assert_eq!(loaded.avg_saturation, 1.0);
        assert_eq!(loaded.color_temperature, -1.0);
    }

    #[test]
    fn palette_without_image_is_integrity_error() {
        let (_dir, catalog) = open_catalog();
        let result = catalog.upsert_palette(&palette("/walls/orphan.jpg"));
        assert!(matches!(result, Err(Error::Integrity(_))));
    }

    #[test]
    fn replace_all_swaps_contents_atomically() {
        let (_dir, catalog) = open_catalog();
        catalog.upsert_image(&image("/walls/old-a.jpg")).unwrap();
        catalog.upsert_image(&image("/walls/old-b.jpg")).unwrap();
        catalog.upsert_palette(&palette("/walls/old-a.jpg")).unwrap();

        let sources = vec![SourceRecord::new("walls", "folder")];
        let mut fresh = image("/walls/new.jpg");
        fresh.source_id = Some(String::from("walls"));
        catalog.replace_all(&sources, &[fresh]).unwrap();

        assert_eq!(catalog.count_images().unwrap(), 1);
        assert_eq!(catalog.count_images_with_palettes().unwrap(), 0);
        assert!(catalog.get_image(Path::new("/walls/new.jpg")).unwrap().is_some());
        assert!(catalog.get_image(Path::new("/walls/old-a.jpg")).unwrap().is_none());
    }

    #[test]
    fn replace_all_with_empty_input_clears_catalog() {
        let (_dir, catalog) = open_catalog();
        catalog.upsert_image(&image("/walls/a.jpg")).unwrap();

        catalog.replace_all(&[], &[]).unwrap();

        assert_eq!(catalog.count_images().unwrap(), 0);
    }

    #[test]
    fn schema_mismatch_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let conn = Connection::open(&path).unwrap();
            conn.pragma_update(None, "user_version", 7_i64).unwrap();
        }

        let result = Catalog::open(&path);
        assert!(matches!(result, Err(Error::Schema { found: 7, .. })));
    }
}

