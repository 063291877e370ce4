//! The `settings` subcommands.
use crate::log::{LOG_LEVEL_ENV_VAR, resolve_level};
use crate::settings::{Settings, get_settings_file_path};
use anyhow::{Context, Result};
use clap::Subcommand;
use std::fmt::Write;
use std::fs;
use std::path::Path;

/// Subcommands for the per-user settings file
#[derive(Subcommand)]
pub enum SettingsSubcommands {
    /// Open the settings file in a text editor, creating it first if needed
    Edit,
    /// Print the location of the settings file
    Path,
    /// Print the settings a run would use
    Show,
}

impl SettingsSubcommands {
    /// Execute the supplied settings subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::Edit => {
                let file_path = get_settings_file_path();
                create_settings_file(&file_path)?;
                println!("Opening settings file for editing: {}", file_path.display());
                edit::edit_file(&file_path)?;
            }
            Self::Path => println!("{}", get_settings_file_path().display()),
            Self::Show => print!("{}", describe_settings(&Settings::load()?)?),
        }

        Ok(())
    }
}

/// Write a commented-out settings file at `file_path`, unless there already is one
fn create_settings_file(file_path: &Path) -> Result<()> {
    if file_path.is_file() {
        return Ok(());
    }

    if let Some(dir_path) = file_path.parent() {
        fs::create_dir_all(dir_path)
            .with_context(|| format!("Failed to create directory: {}", dir_path.display()))?;
    }
    fs::write(file_path, Settings::default_file_contents()?)?;

    Ok(())
}

/// The settings in TOML form, noting the level actually in force if the environment overrides it
fn describe_settings(settings: &Settings) -> Result<String> {
    let mut out = toml::to_string(settings).context("Could not convert settings to TOML")?;
    if std::env::var_os(LOG_LEVEL_ENV_VAR).is_some() {
        let level = resolve_level(&settings.log_level)?;
        writeln!(
            &mut out,
            "# {LOG_LEVEL_ENV_VAR} is set: logging at {}",
            level.as_str().to_lowercase()
        )?;
    }

    Ok(out)
}
