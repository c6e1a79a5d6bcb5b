//! Wallust invocation and cache pickup.

use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Mutex,
    time::{Duration, SystemTime},
};

use tokio::process::Command;
use tracing::{debug, info, instrument, warn};
use varia_catalog::PaletteRecord;
use varia_common::{CommandOutcome, StatePaths, run_with_timeout};

use crate::{error::Error, parse::parse_palette};

/// How far behind the invocation start a cache file's mtime may lag.
const MTIME_SLACK: Duration = Duration::from_secs(1);
/// Maximum age of a cache file before it is considered stale.
const FRESHNESS_WINDOW: Duration = Duration::from_secs(5);

/// Configuration for the palette extractor.
#[derive(Debug, Clone)]
pub struct PaletteConfig {
    /// Color tool binary name, looked up on `PATH`.
    pub tool: String,
    /// Tag the tool embeds in cache file names, e.g. `dark16`.
    pub palette_type: String,
    /// Hard deadline for one tool invocation.
    pub timeout: Duration,
    /// Override of the tool's cache directory (used by tests).
    pub cache_dir: Option<PathBuf>,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            tool: String::from("wallust"),
            palette_type: String::from("dark16"),
            timeout: Duration::from_secs(30),
            cache_dir: None,
        }
    }
}

/// Extracts dominant-color palettes by running the external color tool
/// and reading the palette file it writes to its cache directory.
///
/// Stateless apart from a cached availability probe; safe to call
/// concurrently as long as the external tool is.
#[derive(Debug)]
pub struct PaletteExtractor {
    config: PaletteConfig,
    availability: Mutex<Option<bool>>,
}

impl PaletteExtractor {
    /// Creates an extractor with the given configuration.
    pub fn new(config: PaletteConfig) -> Self {
        Self {
            config,
            availability: Mutex::new(None),
        }
    }

    /// Whether the color tool is present on `PATH`.
    ///
    /// The probe result is cached for the life of the process; call
    /// [`refresh_availability`](Self::refresh_availability) after
    /// installing the tool.
    pub fn is_available(&self) -> bool {
        let Ok(mut cached) = self.availability.lock() else {
            return false;
        };

        *cached.get_or_insert_with(|| {
            let found = find_on_path(&self.config.tool);
            if !found {
                info!(tool = %self.config.tool, "color tool not found, palette extraction disabled");
            }
            found
        })
    }

    /// Drops the cached availability probe.
    pub fn refresh_availability(&self) {
        if let Ok(mut cached) = self.availability.lock() {
            *cached = None;
        }
    }

    /// Extracts a palette for `image`, or `None` when anything along the
    /// way fails. Failures are logged, never propagated.
    #[instrument(skip(self), fields(image = %image.display()))]
    pub async fn extract(&self, image: &Path) -> Option<PaletteRecord> {
        match self.try_extract(image).await {
            Ok(record) => Some(record),
            Err(error) => {
                match &error {
                    Error::NotInstalled
                    | Error::CacheDirMissing(_)
                    | Error::NoFreshCacheFile(_)
                    | Error::InsufficientColors => {
                        debug!(image = %image.display(), %error, "palette extraction skipped");
                    }
                    Error::Timeout(_) | Error::External(_) | Error::Malformed(_) => {
                        warn!(image = %image.display(), %error, "palette extraction failed");
                    }
                }
                None
            }
        }
    }

    async fn try_extract(&self, image: &Path) -> Result<PaletteRecord, Error> {
        if !self.is_available() {
            return Err(Error::NotInstalled);
        }

        let t0 = SystemTime::now();

        let mut cmd = Command::new(&self.config.tool);
        cmd.arg("run").arg(image).arg("-s");

        let outcome = run_with_timeout(cmd, self.config.timeout)
            .await
            .map_err(|e| Error::External(e.to_string()))?;

        match outcome {
            CommandOutcome::TimedOut => return Err(Error::Timeout(self.config.timeout.as_secs())),
            CommandOutcome::Completed(output) if !output.status.success() => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                if stderr.to_lowercase().contains("not enough colors") {
                    return Err(Error::InsufficientColors);
                }
                return Err(Error::External(stderr));
            }
            CommandOutcome::Completed(_) => {}
        }

        let cache_file = self.find_cache_file(t0)?;
        let content = fs::read_to_string(&cache_file)
            .map_err(|e| Error::External(format!("cannot read {}: {e}", cache_file.display())))?;
        let colors = parse_palette(&content)?;

        debug!(
            image = %image.display(),
            cache_file = %cache_file.display(),
            colors = colors.len(),
            "palette extracted"
        );
        Ok(build_record(image, colors))
    }

    /// Finds the freshest cache file written at or after `t0` whose name
    /// carries the configured palette-type tag.
    fn find_cache_file(&self, t0: SystemTime) -> Result<PathBuf, Error> {
        let dir = match &self.config.cache_dir {
            Some(dir) => dir.clone(),
            None => StatePaths::wallust_cache_dir()
                .map_err(|e| Error::External(e.to_string()))?,
        };

        if !dir.is_dir() {
            return Err(Error::CacheDirMissing(dir));
        }

        let tag = self.config.palette_type.to_lowercase();
        let earliest = t0.checked_sub(MTIME_SLACK).unwrap_or(SystemTime::UNIX_EPOCH);
        let now = SystemTime::now();

        let entries = fs::read_dir(&dir)
            .map_err(|e| Error::External(format!("cannot read {}: {e}", dir.display())))?;

        let newest = entries
            .filter_map(Result::ok)
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .to_lowercase()
                    .contains(&tag)
            })
            .filter_map(|entry| {
                let mtime = entry.metadata().ok()?.modified().ok()?;
                let age = now.duration_since(mtime).unwrap_or(Duration::ZERO);
                (mtime >= earliest && age <= FRESHNESS_WINDOW).then(|| (mtime, entry.path()))
            })
            .max_by_key(|(mtime, _)| *mtime);

        match newest {
            Some((_, path)) => Ok(path),
            None => Err(Error::NoFreshCacheFile(dir)),
        }
    }
}

/// Aggregates extracted colors into a normalized palette record.
fn build_record(image: &Path, colors: Vec<String>) -> PaletteRecord {
    let hsl: Vec<(f32, f32, f32)> = colors
        .iter()
        .filter_map(|color| varia_color::hex_to_hsl(color))
        .collect();

    let hues: Vec<f32> = hsl.iter().map(|(h, _, _)| *h).collect();
    let count = hsl.len().max(1) as f32;

    let mut record = PaletteRecord {
        filepath: image.to_path_buf(),
        avg_hue: varia_color::circular_hue_mean(&hues),
        avg_saturation: hsl.iter().map(|(_, s, _)| s).sum::<f32>() / count,
        avg_lightness: hsl.iter().map(|(_, _, l)| l).sum::<f32>() / count,
        color_temperature: varia_color::color_temperature(&colors),
        extracted_at: Some(varia_common::now_secs()),
        colors,
    };
    record.clamp_ranges();
    record
}

fn find_on_path(tool: &str) -> bool {
    let Some(path) = env::var_os("PATH") else {
        return false;
    };

    env::split_paths(&path).any(|dir| dir.join(tool).is_file())
}
