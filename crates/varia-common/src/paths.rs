//! Path resolution following the XDG Base Directory specification.

use std::{
    env, fs,
    io::{Error, ErrorKind},
    path::{Path, PathBuf},
};

/// Path resolver for varia's on-disk state.
pub struct StatePaths;

impl StatePaths {
    /// Configuration directory (`$XDG_CONFIG_HOME/varia` or `~/.config/varia`).
    ///
    /// # Errors
    ///
    /// Returns error if neither `XDG_CONFIG_HOME` nor `HOME` is set.
    pub fn config_dir() -> Result<PathBuf, Error> {
        let config_home = env::var("XDG_CONFIG_HOME")
            .or_else(|_| env::var("HOME").map(|home| format!("{home}/.config")))
            .map_err(|e| {
                Error::new(
                    ErrorKind::NotFound,
                    format!("Neither XDG_CONFIG_HOME nor HOME environment variable found: {e}"),
                )
            })?;

        Ok(PathBuf::from(config_home).join("varia"))
    }

    /// Data directory (`$XDG_DATA_HOME/varia` or `~/.local/share/varia`).
    /// Creates the directory if absent.
    ///
    /// # Errors
    ///
    /// Returns error if environment variables are not set or directory
    /// creation fails.
    pub fn data_dir() -> Result<PathBuf, Error> {
        let data_home = env::var("XDG_DATA_HOME")
            .or_else(|_| env::var("HOME").map(|home| format!("{home}/.local/share")))
            .map_err(|e| {
                Error::new(
                    ErrorKind::NotFound,
                    format!("Neither XDG_DATA_HOME nor HOME environment variable found: {e}"),
                )
            })?;

        let data_dir = PathBuf::from(data_home).join("varia");

        if !data_dir.exists() {
            fs::create_dir_all(&data_dir)?;
        }

        Ok(data_dir)
    }

    /// Default path of the selection catalog database.
    ///
    /// # Errors
    ///
    /// Returns error if the data directory cannot be determined or created.
    pub fn catalog_db() -> Result<PathBuf, Error> {
        Ok(Self::data_dir()?.join("smart_selection.db"))
    }

    /// Cache directory of the wallust color tool (`$XDG_CACHE_HOME/wallust`
    /// or `~/.cache/wallust`).
    ///
    /// The engine only ever reads from this directory; wallust owns it.
    ///
    /// # Errors
    ///
    /// Returns error if neither `XDG_CACHE_HOME` nor `HOME` is set.
    pub fn wallust_cache_dir() -> Result<PathBuf, Error> {
        let cache_home = env::var("XDG_CACHE_HOME")
            .or_else(|_| env::var("HOME").map(|home| format!("{home}/.cache")))
            .map_err(|e| {
                Error::new(
                    ErrorKind::NotFound,
                    format!("Neither XDG_CACHE_HOME nor HOME environment variable found: {e}"),
                )
            })?;

        Ok(PathBuf::from(cache_home).join("wallust"))
    }
}

/// Expands a leading `~` or `~/` to the user's home directory.
///
/// Paths without a leading tilde are returned unchanged, as are paths
/// when `HOME` is unset.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(home) = env::var("HOME") else {
        return path.to_path_buf();
    };
    expand_tilde_with(path, Path::new(&home))
}

fn expand_tilde_with(path: &Path, home: &Path) -> PathBuf {
    if path == Path::new("~") {
        return home.to_path_buf();
    }

    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}
