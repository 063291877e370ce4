//! Per-user settings for evalloc, read from `settings.toml` in the user's config folder.
use crate::get_evalloc_config_dir;
use crate::input::read_toml;
use crate::log::{DEFAULT_LOG_LEVEL, parse_log_level};
use anyhow::{Context, Result};
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// Where the settings file lives, whether or not it exists
pub fn get_settings_file_path() -> PathBuf {
    get_evalloc_config_dir().join(SETTINGS_FILE_NAME)
}

/// Settings applying to every scenario run by this user.
///
/// Missing keys take their default values.
#[derive(Debug, DocumentedFields, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Terminal log level: off, error, warn, info, debug or trace.
    /// EVALLOC_LOG_LEVEL takes precedence if set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Replace the contents of an existing output folder without passing --overwrite
    #[serde(default)]
    pub overwrite: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            overwrite: false,
        }
    }
}

impl Settings {
    /// Load the user's settings, or the defaults if there is no settings file
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path())
    }

    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        let settings: Settings = read_toml(file_path)?;
        parse_log_level(&settings.log_level)
            .with_context(|| format!("Invalid log_level in {}", file_path.display()))?;

        Ok(settings)
    }

    /// A settings file with every key commented out at its default, above its description
    pub fn default_file_contents() -> Result<String> {
        let defaults = toml::Value::try_from(Settings::default())
            .context("Could not convert settings to TOML")?;
        let defaults = defaults
            .as_table()
            .context("Settings are not a TOML table")?;

        let mut out = String::from("# evalloc settings. Uncomment a key to change it.\n");
        for (field, docs) in Settings::FIELD_NAMES.iter().zip(Settings::FIELD_DOCS) {
            let value = defaults
                .get(*field)
                .with_context(|| format!("No default for {field}"))?;
            writeln!(&mut out)?;
            for line in docs.lines() {
                writeln!(&mut out, "# {}", line.trim())?;
            }
            writeln!(&mut out, "# {field} = {value}")?;
        }

        Ok(out)
    }
}
