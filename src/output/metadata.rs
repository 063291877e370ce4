//! Code for writing metadata to file
use crate::model::parameters::RunParameters;
use anyhow::Result;
use chrono::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// The output file name for metadata
const METADATA_FILE_NAME: &str = "metadata.toml";

#[derive(Serialize)]
struct Metadata<'a> {
    run: RunMetadata<'a>,
    program: ProgramMetadata,
}

/// Information about the scenario run
#[derive(Serialize)]
struct RunMetadata<'a> {
    /// Path to the scenario which was run
    model_path: &'a Path,
    /// The date and time on which the run started
    datetime: String,
    /// Seed for the random number generator
    seed: u64,
    /// Number of time steps simulated
    horizon: usize,
    /// Number of time steps per hour
    steps_per_hour: u32,
}

impl<'a> RunMetadata<'a> {
    fn new(model_path: &'a Path, parameters: &RunParameters) -> Self {
        Self {
            model_path,
            datetime: Local::now().to_rfc2822(),
            seed: parameters.seed,
            horizon: parameters.horizon,
            steps_per_hour: parameters.steps_per_hour,
        }
    }
}

#[derive(Serialize)]
struct ProgramMetadata {
    /// The program name
    name: &'static str,
    /// The program version as specified in Cargo.toml
    version: &'static str,
    /// Whether it is a debug build
    is_debug: bool,
}

impl Default for ProgramMetadata {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            is_debug: cfg!(debug_assertions),
        }
    }
}

/// Write metadata to the specified output path in TOML format
pub fn write_metadata(
    output_path: &Path,
    model_path: &Path,
    parameters: &RunParameters,
) -> Result<()> {
    let metadata = Metadata {
        run: RunMetadata::new(model_path, parameters),
        program: ProgramMetadata::default(),
    };
    let file_path = output_path.join(METADATA_FILE_NAME);
    fs::write(&file_path, toml::to_string(&metadata)?)?;

    Ok(())
}
