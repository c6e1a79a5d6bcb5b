//! Theme application with debouncing and reload hooks.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::{Duration, SystemTime},
};

use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use varia_catalog::PaletteRecord;
use varia_common::run_shell_with_timeout;

use crate::{
    atomic,
    config::{TemplateSpec, ThemingConfig},
    error::Error,
    template,
};

/// Trailing debounce window for automatic applies.
const DEBOUNCE_DELAY: Duration = Duration::from_millis(100);
/// Deadline for each reload command.
const RELOAD_TIMEOUT: Duration = Duration::from_secs(10);
/// One LSB per channel; renders within this are "the same colors".
const COLOR_TOLERANCE: f32 = 1.5 / 255.0;

struct CachedSource {
    mtime: SystemTime,
    contents: String,
}

/// Renders templated config files from the current wallpaper's palette
/// and pokes dependent applications to reload.
///
/// Owned behind an [`Arc`] so debounced applies can outlive the caller's
/// stack frame; [`apply`](Self::apply) needs a tokio runtime.
pub struct ThemeEngine {
    config: ThemingConfig,
    lookup: Box<dyn Fn(&Path) -> Option<PaletteRecord> + Send + Sync>,
    source_cache: Mutex<HashMap<PathBuf, CachedSource>>,
    last_colors: Mutex<HashMap<String, Vec<String>>>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl ThemeEngine {
    /// Creates an engine over a palette lookup, typically a clone of the
    /// catalog handle wrapped in a closure.
    pub fn new(
        config: ThemingConfig,
        lookup: impl Fn(&Path) -> Option<PaletteRecord> + Send + Sync + 'static,
    ) -> Arc<Self> {
        if !config.is_enabled() {
            info!("no templates configured, theming disabled");
        }

        Arc::new(Self {
            config,
            lookup: Box::new(lookup),
            source_cache: Mutex::new(HashMap::new()),
            last_colors: Mutex::new(HashMap::new()),
            pending: Mutex::new(None),
        })
    }

    /// Debounced apply for wallpaper-change bursts: collapses calls
    /// arriving within the trailing 100 ms window into one render pass.
    #[instrument(skip(self), fields(wallpaper = %wallpaper.display()))]
    pub fn apply(self: &Arc<Self>, wallpaper: &Path) {
        if !self.config.is_enabled() {
            return;
        }

        let engine = Arc::clone(self);
        let wallpaper = wallpaper.to_path_buf();

        let Ok(mut pending) = self.pending.lock() else {
            return;
        };
        if let Some(handle) = pending.take() {
            handle.abort();
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(DEBOUNCE_DELAY).await;
            engine.apply_now(&wallpaper).await;
        }));
    }

    /// Immediate apply, bypassing the debounce (the CLI one-shot path).
    ///
    /// A wallpaper without a stored palette is a graceful skip. Every
    /// per-template failure is isolated: one bad template neither stops
    /// the others nor bubbles out of the wallpaper change.
    #[instrument(skip(self), fields(wallpaper = %wallpaper.display()))]
    pub async fn apply_now(&self, wallpaper: &Path) {
        let Some(palette) = (self.lookup)(wallpaper) else {
            info!(wallpaper = %wallpaper.display(), "no palette for wallpaper, skipping theming");
            return;
        };

        let vars = build_context(&palette);
        let mut reloads = Vec::new();

        for template in &self.config.templates {
            match self.render_one(template, &vars, &palette.colors) {
                Ok(true) => {
                    if let Some(command) = &template.reload_command {
                        reloads.push(command.clone());
                    }
                }
                Ok(false) => {
                    debug!(template = %template.name, "colors unchanged, reload skipped");
                }
                Err(error) => {
                    warn!(template = %template.name, %error, "template render failed");
                }
            }
        }

        for command in reloads {
            if let Err(error) = run_shell_with_timeout(&command, RELOAD_TIMEOUT).await {
                warn!(cmd = %command, %error, "cannot spawn reload command");
            }
        }
    }

    /// Cancels any pending debounced apply. Idempotent; called again by
    /// re-initialization and on drop.
    pub fn cleanup(&self) {
        if let Ok(mut pending) = self.pending.lock()
            && let Some(handle) = pending.take()
        {
            handle.abort();
        }
    }

    /// Renders one template and reports whether its colors changed
    /// since the previous successful render.
    fn render_one(
        &self,
        template: &TemplateSpec,
        vars: &HashMap<String, String>,
        colors: &[String],
    ) -> Result<bool, Error> {
        if let Some(palette_type) = &template.palette_type
            && *palette_type != self.config.tool.palette
        {
            debug!(
                template = %template.name,
                palette_type,
                "template palette type differs from tool settings"
            );
        }

        let source = self.read_source(&template.source_path)?;
        let rendered = template::render(&source, vars);
        atomic::write_atomic(&template.dest_path, &rendered)?;

        let Ok(mut last) = self.last_colors.lock() else {
            return Ok(true);
        };
        let changed = match last.get(&template.name) {
            Some(previous) => !colors_match(previous, colors),
            None => true,
        };
        if changed {
            last.insert(template.name.clone(), colors.to_vec());
        }

        Ok(changed)
    }

    /// Reads a template source through the mtime-validated cache.
    fn read_source(&self, path: &Path) -> Result<String, Error> {
        let mtime = fs::metadata(path)?.modified()?;

        if let Ok(mut cache) = self.source_cache.lock() {
            if let Some(cached) = cache.get(path)
                && cached.mtime == mtime
            {
                return Ok(cached.contents.clone());
            }
            let contents = fs::read_to_string(path)?;
            cache.insert(
                path.to_path_buf(),
                CachedSource {
                    mtime,
                    contents: contents.clone(),
                },
            );
            return Ok(contents);
        }

        Ok(fs::read_to_string(path)?)
    }
}

impl Drop for ThemeEngine {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn colors_match(a: &[String], b: &[String]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| varia_color::colors_equivalent(x, y, COLOR_TOLERANCE))
}

/// Builds the template variable set from a palette record: `colorN`
/// slots plus the `background`/`foreground`/`cursor`/`alpha`/`wallpaper`
/// aliases terminal templates expect.
pub fn build_context(palette: &PaletteRecord) -> HashMap<String, String> {
    let mut vars: HashMap<String, String> = palette
        .colors
        .iter()
        .enumerate()
        .map(|(index, color)| (format!("color{index}"), color.clone()))
        .collect();

    let background = palette.color0().to_string();
    let foreground = palette
        .colors
        .last()
        .cloned()
        .unwrap_or_else(|| background.clone());

    vars.insert(
        String::from("wallpaper"),
        palette.filepath.to_string_lossy().into_owned(),
    );
    vars.insert(String::from("background"), background);
    vars.insert(String::from("cursor"), foreground.clone());
    vars.insert(String::from("foreground"), foreground);
    vars.insert(String::from("alpha"), String::from("100"));

    vars
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn palette(color0: &str) -> PaletteRecord {
        PaletteRecord {
            filepath: PathBuf::from("/walls/a.jpg"),
            colors: vec![String::from(color0), String::from("#EEEEEE")],
            avg_hue: 210.0,
            avg_saturation: 0.4,
            avg_lightness: 0.3,
            color_temperature: -0.5,
            extracted_at: None,
        }
    }

    fn template_spec(dir: &Path, name: &str, body: &str) -> TemplateSpec {
        let source_path = dir.join(format!("{name}.tpl"));
        fs::write(&source_path, body).unwrap();
        TemplateSpec {
            name: String::from(name),
            source_path,
            dest_path: dir.join(format!("{name}.out")),
            reload_command: None,
            palette_type: None,
        }
    }

    fn engine_with(
        templates: Vec<TemplateSpec>,
        palette: Option<PaletteRecord>,
    ) -> Arc<ThemeEngine> {
        let config = ThemingConfig {
            templates,
            ..Default::default()
        };
        ThemeEngine::new(config, move |_| palette.clone())
    }

    #[tokio::test]
    async fn apply_now_renders_template() {
        let dir = tempfile::tempdir().unwrap();
        let spec = template_spec(dir.path(), "term", "bg={{ color0 }} fg={{ foreground }}");
        let dest = spec.dest_path.clone();

        let engine = engine_with(vec![spec], Some(palette("#112233")));
        engine.apply_now(Path::new("/walls/a.jpg")).await;

        assert_eq!(
            fs::read_to_string(&dest).unwrap(),
            "bg=#112233 fg=#EEEEEE"
        );
    }

    #[tokio::test]
    async fn missing_palette_is_a_graceful_skip() {
        let dir = tempfile::tempdir().unwrap();
        let spec = template_spec(dir.path(), "term", "bg={{ color0 }}");
        let dest = spec.dest_path.clone();

        let engine = engine_with(vec![spec], None);
        engine.apply_now(Path::new("/walls/a.jpg")).await;

        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn bad_template_does_not_stop_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let broken = TemplateSpec {
            name: String::from("broken"),
            source_path: dir.path().join("missing.tpl"),
            dest_path: dir.path().join("broken.out"),
            reload_command: None,
            palette_type: None,
        };
        let good = template_spec(dir.path(), "good", "bg={{ color0 }}");
        let good_dest = good.dest_path.clone();

        let engine = engine_with(vec![broken, good], Some(palette("#112233")));
        engine.apply_now(Path::new("/walls/a.jpg")).await;

        assert_eq!(fs::read_to_string(&good_dest).unwrap(), "bg=#112233");
    }

    #[tokio::test]
    async fn unchanged_colors_skip_reload() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let mut spec = template_spec(dir.path(), "term", "bg={{ color0 }}");
        spec.reload_command = Some(format!("echo reloaded >> '{}'", marker.display()));

        let config = ThemingConfig {
            templates: vec![spec],
            ..Default::default()
        };
        let current = Arc::new(Mutex::new(palette("#112233")));
        let lookup_palette = Arc::clone(&current);
        let engine = ThemeEngine::new(config, move |_| {
            lookup_palette.lock().ok().map(|p| p.clone())
        });

        engine.apply_now(Path::new("/walls/a.jpg")).await;
        engine.apply_now(Path::new("/walls/a.jpg")).await;
        assert_eq!(fs::read_to_string(&marker).unwrap().lines().count(), 1);

        *current.lock().unwrap() = palette("#AA0000");
        engine.apply_now(Path::new("/walls/a.jpg")).await;
        assert_eq!(fs::read_to_string(&marker).unwrap().lines().count(), 2);
    }

    #[tokio::test]
    async fn failing_reload_command_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = template_spec(dir.path(), "term", "bg={{ color0 }}");
        spec.reload_command = Some(String::from("exit 7"));
        let dest = spec.dest_path.clone();

        let engine = engine_with(vec![spec], Some(palette("#112233")));
        engine.apply_now(Path::new("/walls/a.jpg")).await;

        assert!(dest.exists());
    }

    #[tokio::test]
    async fn debounce_collapses_bursts() {
        let dir = tempfile::tempdir().unwrap();
        let spec = template_spec(dir.path(), "term", "bg={{ color0 }}");

        let lookups = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&lookups);
        let config = ThemingConfig {
            templates: vec![spec],
            ..Default::default()
        };
        let engine = ThemeEngine::new(config, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Some(palette("#112233"))
        });

        engine.apply(Path::new("/walls/a.jpg"));
        engine.apply(Path::new("/walls/a.jpg"));
        engine.apply(Path::new("/walls/b.jpg"));
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cleanup_cancels_pending_apply_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let spec = template_spec(dir.path(), "term", "bg={{ color0 }}");

        let lookups = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&lookups);
        let config = ThemingConfig {
            templates: vec![spec],
            ..Default::default()
        };
        let engine = ThemeEngine::new(config, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Some(palette("#112233"))
        });

        engine.apply(Path::new("/walls/a.jpg"));
        engine.cleanup();
        engine.cleanup();
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn source_cache_refreshes_on_mtime_change() {
        let dir = tempfile::tempdir().unwrap();
        let spec = template_spec(dir.path(), "term", "v1 {{ color0 }}");
        let source = spec.source_path.clone();
        let dest = spec.dest_path.clone();

        let engine = engine_with(vec![spec], Some(palette("#112233")));
        engine.apply_now(Path::new("/walls/a.jpg")).await;
        assert!(fs::read_to_string(&dest).unwrap().starts_with("v1"));

        // Rewrite with a strictly newer mtime.
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        fs::write(&source, "v2 {{ color0 }}").unwrap();
        engine.apply_now(Path::new("/walls/a.jpg")).await;
        assert!(fs::read_to_string(&dest).unwrap().starts_with("v2"));
    }

    #[test]
    fn context_includes_aliases() {
        let vars = build_context(&palette("#112233"));

        assert_eq!(vars.get("color0").map(String::as_str), Some("#112233"));
        assert_eq!(vars.get("color1").map(String::as_str), Some("#EEEEEE"));
        assert_eq!(vars.get("background").map(String::as_str), Some("#112233"));
        assert_eq!(vars.get("foreground").map(String::as_str), Some("#EEEEEE"));
        assert_eq!(vars.get("cursor").map(String::as_str), Some("#EEEEEE"));
        assert_eq!(vars.get("alpha").map(String::as_str), Some("100"));
        assert_eq!(vars.get("wallpaper").map(String::as_str), Some("/walls/a.jpg"));
    }
}
