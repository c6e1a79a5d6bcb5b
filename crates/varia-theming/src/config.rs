//! Theming configuration loading.
//!
//! Two files feed the engine: a wallust-shaped TOML carrying the color
//! tool settings, and a JSON array of template descriptors. Either file
//! may be absent; theming then quietly covers less (or nothing).

use std::{fs, path::{Path, PathBuf}};

use serde::Deserialize;
use tracing::debug;
use varia_common::expand_tilde;

use crate::error::Error;

/// Color tool settings from the wallust-shaped main config.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColorToolSettings {
    /// Palette type tag, e.g. `dark16`.
    pub palette: String,
    /// Sampling backend the tool should use.
    pub backend: String,
    /// Color space the tool should quantize in.
    pub color_space: String,
}

impl Default for ColorToolSettings {
    fn default() -> Self {
        Self {
            palette: String::from("dark16"),
            backend: String::from("resized"),
            color_space: String::from("lab"),
        }
    }
}

/// One template descriptor from the theming JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateSpec {
    /// Display name, used in logs and render bookkeeping.
    pub name: String,
    /// Template file to read.
    pub source_path: PathBuf,
    /// File to render into (atomically replaced).
    pub dest_path: PathBuf,
    /// Command to run after the rendered colors change.
    #[serde(default)]
    pub reload_command: Option<String>,
    /// Palette type this template expects, when it differs from the
    /// tool settings.
    #[serde(default)]
    pub palette_type: Option<String>,
}

/// Full theming configuration.
#[derive(Debug, Clone, Default)]
pub struct ThemingConfig {
    /// Color tool settings.
    pub tool: ColorToolSettings,
    /// Templates to render on each wallpaper change.
    pub templates: Vec<TemplateSpec>,
}

impl ThemingConfig {
    /// Loads configuration from the two files, `~`-expanding all paths.
    ///
    /// Missing files disable the corresponding part silently; files
    /// that exist but cannot be parsed are errors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] for unparseable files and I/O errors
    /// for unreadable ones.
    pub fn load(main_config: &Path, theming_config: &Path) -> Result<Self, Error> {
        let main_config = expand_tilde(main_config);
        let theming_config = expand_tilde(theming_config);

        let tool = if main_config.exists() {
            let content = fs::read_to_string(&main_config)?;
            toml::from_str(&content).map_err(|e| Error::Malformed {
                path: main_config.clone(),
                reason: e.to_string(),
            })?
        } else {
            debug!(path = %main_config.display(), "no main config, using color tool defaults");
            ColorToolSettings::default()
        };

        let templates = if theming_config.exists() {
            let content = fs::read_to_string(&theming_config)?;
            let mut templates: Vec<TemplateSpec> =
                serde_json::from_str(&content).map_err(|e| Error::Malformed {
                    path: theming_config.clone(),
                    reason: e.to_string(),
                })?;
            for template in &mut templates {
                template.source_path = expand_tilde(&template.source_path);
                template.dest_path = expand_tilde(&template.dest_path);
            }
            templates
        } else {
            debug!(path = %theming_config.display(), "no theming config, theming disabled");
            Vec::new()
        };

        Ok(Self { tool, templates })
    }

    /// Whether any templates are configured.
    pub fn is_enabled(&self) -> bool {
        !self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn missing_files_disable_theming() {
        let dir = tempfile::tempdir().unwrap();
        let config = ThemingConfig::load(
            &dir.path().join("wallust.toml"),
            &dir.path().join("theming.json"),
        )
        .unwrap();

        assert!(!config.is_enabled());
        assert_eq!(config.tool.palette, "dark16");
    }

    #[test]
    fn loads_tool_settings_and_templates() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("wallust.toml");
        let json_path = dir.path().join("theming.json");

        fs::File::create(&toml_path)
            .unwrap()
            .write_all(b"palette = \"light16\"\nbackend = \"kmeans\"\n")
            .unwrap();
        fs::File::create(&json_path)
            .unwrap()
            .write_all(
                br#"[{
                    "name": "terminal",
                    "source_path": "/templates/colors.tpl",
                    "dest_path": "/out/colors.conf",
                    "reload_command": "true"
                }]"#,
            )
            .unwrap();

        let config = ThemingConfig::load(&toml_path, &json_path).unwrap();

        assert_eq!(config.tool.palette, "light16");
        assert_eq!(config.tool.backend, "kmeans");
        assert_eq!(config.tool.color_space, "lab");
        assert_eq!(config.templates.len(), 1);
        assert_eq!(config.templates[0].name, "terminal");
        assert_eq!(config.templates[0].reload_command.as_deref(), Some("true"));
        assert!(config.is_enabled());
    }

    #[test]
    fn unknown_toml_keys_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("wallust.toml");
        fs::File::create(&toml_path)
            .unwrap()
            .write_all(b"palette = \"dark16\"\ncheck_contrast = true\n")
            .unwrap();

        let config =
            ThemingConfig::load(&toml_path, &dir.path().join("theming.json")).unwrap();
        assert_eq!(config.tool.palette, "dark16");
    }

    #[test]
    fn broken_json_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("theming.json");
        fs::File::create(&json_path)
            .unwrap()
            .write_all(b"[{ not json")
            .unwrap();

        let result = ThemingConfig::load(&dir.path().join("wallust.toml"), &json_path);
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }
}
