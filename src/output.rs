//! The module responsible for writing output data to disk.
use crate::event::ChargingEvent;
use crate::id::{LocationId, UseCase};
use crate::simulation::{LocatedEvent, UseCaseResult, UseCaseSummary};
use crate::site::{Site, SiteMode};
use crate::units::{Energy, Power};
use anyhow::{Context, Result, ensure};
use serde::Serialize;
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "evalloc_results";

/// The output file name for per-use-case totals
const SUMMARY_FILE_NAME: &str = "summary.csv";

/// The output file name for the charging locations of a use case
fn locations_file_name(use_case: UseCase) -> String {
    format!("{use_case}_charging_locations.csv")
}

/// The output file name for the located events of a use case
fn events_file_name(use_case: UseCase) -> String {
    format!("{use_case}_charging_events.csv")
}

/// Get the model name from the specified directory path
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Canonicalise in case the user has specified "."
    let model_dir = model_dir
        .canonicalize()
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory for the model specified at `model_dir`.
///
/// Returns whether an existing, non-empty folder was deleted to make way for the new one.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if let Ok(mut entries) = fs::read_dir(output_dir) {
        if entries.next().is_none() {
            // Already exists and is empty
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. \
            Please delete the folder or pass the --overwrite command-line option."
        );

        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Represents a row in a charging locations CSV file
#[derive(Serialize, Debug, PartialEq)]
struct LocationRow {
    location_id: LocationId,
    use_case: UseCase,
    x: f64,
    y: f64,
    charging_points: u32,
    average_charging_capacity: Power,
    mode: Option<SiteMode>,
}

impl LocationRow {
    fn new(use_case: UseCase, index: usize, site: &Site) -> Self {
        Self {
            location_id: LocationId::new(use_case, index),
            use_case,
            x: site.position.x,
            y: site.position.y,
            charging_points: site.charging_points,
            average_charging_capacity: site.average_charging_capacity,
            mode: site.mode,
        }
    }
}

/// Represents a row in a charging events CSV file
#[derive(Serialize, Debug, PartialEq)]
struct EventRow<'a> {
    event_id: u64,
    location_id: Option<LocationId>,
    event_start: usize,
    event_time: usize,
    energy: Energy,
    station_charging_capacity: Power,
    charging_use_case: &'a str,
    location: Option<&'a str>,
    vehicle_type: Option<&'a str>,
    mode: Option<SiteMode>,
    multi_use: bool,
    time_limited: bool,
}

impl<'a> EventRow<'a> {
    fn new(located: &'a LocatedEvent) -> Self {
        let ChargingEvent {
            event_id,
            event_start,
            event_time,
            energy,
            station_charging_capacity,
            charging_use_case,
            location,
            vehicle_type,
        } = &located.event;

        Self {
            event_id: *event_id,
            location_id: located.location,
            event_start: *event_start,
            event_time: *event_time,
            energy: *energy,
            station_charging_capacity: *station_charging_capacity,
            charging_use_case,
            location: location.as_deref(),
            vehicle_type: vehicle_type.as_deref(),
            mode: located.mode,
            multi_use: located.multi_use,
            time_limited: located.time_limited,
        }
    }
}

/// An object for writing the results of a scenario to file
pub struct DataWriter {
    output_path: PathBuf,
    summary_writer: csv::Writer<File>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    pub fn create(output_path: &Path) -> Result<Self> {
        let summary_path = output_path.join(SUMMARY_FILE_NAME);
        let summary_writer = csv::Writer::from_path(&summary_path)
            .with_context(|| format!("Could not create {}", summary_path.display()))?;

        Ok(Self {
            output_path: output_path.to_path_buf(),
            summary_writer,
        })
    }

    /// Write the charging locations and located events of a use case to their own CSV files
    pub fn write_use_case(&mut self, result: &UseCaseResult) -> Result<()> {
        let new_writer = |file_name: String| {
            let file_path = self.output_path.join(file_name);
            csv::Writer::from_path(&file_path)
                .with_context(|| format!("Could not create {}", file_path.display()))
        };

        let mut locations_writer = new_writer(locations_file_name(result.use_case))?;
        for (index, site) in result.sites.iter().enumerate() {
            locations_writer.serialize(LocationRow::new(result.use_case, index, site))?;
        }
        locations_writer.flush()?;

        let mut events_writer = new_writer(events_file_name(result.use_case))?;
        for located in &result.events {
            events_writer.serialize(EventRow::new(located))?;
        }
        events_writer.flush()?;

        Ok(())
    }

    /// Write per-use-case totals to a CSV file
    pub fn write_summary(&mut self, summaries: &[UseCaseSummary]) -> Result<()> {
        for summary in summaries {
            self.summary_writer.serialize(summary)?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.summary_writer.flush()?;

        Ok(())
    }
}
