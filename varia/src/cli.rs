//! CLI application structure and command execution.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use varia_catalog::Catalog;
use varia_common::{StatePaths, expand_tilde};
use varia_engine::{SelectionConfig, SelectionConstraints, SmartSelector, SourceMap};
use varia_theming::{ThemeEngine, ThemingConfig};

/// Result type for CLI operations.
pub type CliAction = Result<(), String>;

/// Smart wallpaper selection engine.
#[derive(Parser)]
#[command(name = "varia", version, about = "Smart wallpaper selection engine")]
pub struct Cli {
    /// Catalog database path (defaults to the XDG data dir).
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Rebuild the catalog from wallpaper folders.
    Index {
        /// Folders to walk for images.
        #[arg(required = true)]
        folders: Vec<PathBuf>,
        /// Upsert into the existing catalog instead of replacing it.
        #[arg(long)]
        incremental: bool,
    },
    /// Pick images from the catalog by weighted sampling.
    Select {
        /// How many images to pick.
        #[arg(long, short = 'n', default_value_t = 1)]
        count: usize,
        /// Only favorite images.
        #[arg(long)]
        favorites: bool,
        /// Restrict to these source ids.
        #[arg(long)]
        source: Vec<String>,
        /// Skip images shown within the last N hours.
        #[arg(long)]
        exclude_hours: Option<f64>,
    },
    /// Print catalog statistics.
    Stats,
    /// Extract palettes for images that lack one.
    ExtractPalettes,
    /// Zero all display history.
    ClearHistory,
    /// Mark or unmark an image as favorite.
    Favorite {
        /// Image path.
        path: PathBuf,
        /// Remove the favorite flag instead of setting it.
        #[arg(long)]
        unset: bool,
    },
    /// Render theming templates for a wallpaper (`current` or a path).
    ApplyTheme {
        /// `current` for the most recently shown wallpaper, or a path.
        target: String,
    },
}

/// Runs the parsed command.
///
/// # Errors
///
/// Returns a printable message for any failure.
pub async fn execute(cli: Cli) -> CliAction {
    let db_path = match cli.db {
        Some(db) => expand_tilde(&db),
        None => StatePaths::catalog_db().map_err(|e| e.to_string())?,
    };

    match cli.command {
        Commands::Index {
            folders,
            incremental,
        } => index(&db_path, &folders, incremental),
        Commands::Select {
            count,
            favorites,
            source,
            exclude_hours,
        } => select(&db_path, count, favorites, source, exclude_hours),
        Commands::Stats => stats(&db_path),
        Commands::ExtractPalettes => extract_palettes(&db_path).await,
        Commands::ClearHistory => {
            open_selector(&db_path)?
                .clear_history()
                .map_err(|e| e.to_string())?;
            println!("Display history cleared");
            Ok(())
        }
        Commands::Favorite { path, unset } => {
            open_selector(&db_path)?
                .set_favorite(&expand_tilde(&path), !unset)
                .map_err(|e| e.to_string())?;
            Ok(())
        }
        Commands::ApplyTheme { target } => apply_theme(&db_path, &target).await,
    }
}

fn open_selector(db_path: &Path) -> Result<SmartSelector, String> {
    SmartSelector::new(db_path, SelectionConfig::default(), true).map_err(|e| e.to_string())
}

fn index(db_path: &Path, folders: &[PathBuf], incremental: bool) -> CliAction {
    let selector = open_selector(db_path)?;

    let folders: Vec<PathBuf> = folders.iter().map(|f| expand_tilde(f)).collect();
    let mut sources = SourceMap::new();
    for folder in &folders {
        let id = folder
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| folder.display().to_string());
        sources.insert(folder.clone(), id);
    }

    if incremental {
        let summary = selector
            .index_folders(&folders, &sources, |done, total| {
                eprint!("\rIndexing {done}/{total} files");
            })
            .map_err(|e| e.to_string())?;
        eprintln!();
        println!(
            "Indexed {} images ({} unchanged, {} failed)",
            summary.indexed, summary.skipped, summary.failed
        );
    } else {
        let summary = selector
            .rebuild_index(&folders, &sources, |done, total| {
                eprint!("\rWalking folder {done}/{total}");
            })
            .map_err(|e| e.to_string())?;
        eprintln!();
        println!(
            "Rebuilt catalog with {} images ({} failed)",
            summary.images, summary.failed
        );
    }

    Ok(())
}

fn select(
    db_path: &Path,
    count: usize,
    favorites: bool,
    source: Vec<String>,
    exclude_hours: Option<f64>,
) -> CliAction {
    let selector = open_selector(db_path)?;

    let constraints = SelectionConstraints {
        source_ids: (!source.is_empty()).then_some(source),
        favorites_only: favorites,
        exclude_shown_within_hours: exclude_hours,
        ..Default::default()
    };

    let picked = selector
        .select_images(count, Some(&constraints))
        .map_err(|e| e.to_string())?;

    if picked.is_empty() {
        eprintln!("No images match the given constraints");
    }
    for path in picked {
        println!("{}", path.display());
    }

    Ok(())
}

fn stats(db_path: &Path) -> CliAction {
    let stats = open_selector(db_path)?
        .get_statistics()
        .map_err(|e| e.to_string())?;

    println!("Images:           {}", stats.total_images);
    println!("Sources:          {}", stats.total_sources);
    println!("With palettes:    {}", stats.images_with_palettes);
    println!("Total displays:   {}", stats.total_displays);
    println!("Images shown:     {}", stats.images_shown);

    Ok(())
}

async fn extract_palettes(db_path: &Path) -> CliAction {
    let selector = open_selector(db_path)?;

    let summary = selector
        .extract_all_palettes(|done, total| {
            eprint!("\rExtracting {done}/{total}");
        })
        .await
        .map_err(|e| e.to_string())?;
    eprintln!();

    println!(
        "Extracted {} palettes ({} failed)",
        summary.extracted, summary.failed
    );
    Ok(())
}

async fn apply_theme(db_path: &Path, target: &str) -> CliAction {
    let catalog = Catalog::open(db_path).map_err(|e| e.to_string())?;

    let wallpaper = if target == "current" {
        match catalog.most_recent_shown().map_err(|e| e.to_string())? {
            Some(record) => record.filepath,
            None => {
                println!("No wallpaper has been shown yet; nothing to theme");
                return Ok(());
            }
        }
    } else {
        expand_tilde(Path::new(target))
    };

    let config_dir = StatePaths::config_dir().map_err(|e| e.to_string())?;
    let config = ThemingConfig::load(
        &config_dir.join("wallust.toml"),
        &config_dir.join("theming.json"),
    )
    .map_err(|e| e.to_string())?;

    let lookup_catalog = catalog.clone();
    let engine = ThemeEngine::new(config, move |path| {
        lookup_catalog.get_palette(path).ok().flatten()
    });

    // One-shot: no debouncing.
    engine.apply_now(&wallpaper).await;
    engine.cleanup();

    Ok(())
}
