//! Defines the `ScenarioParameters` struct, which represents the contents of `scenario.toml`.
use crate::event::ChargingEvent;
use crate::id::UseCase;
use crate::input::{input_err_msg, read_toml};
use crate::time_limit::ParkingTimeLimit;
use crate::units::Distance;
use anyhow::{Context, Result, ensure};
use log::warn;
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;

const SCENARIO_PARAMETERS_FILE_NAME: &str = "scenario.toml";

macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::new($value)
        }
    };
}

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_horizon, usize, 2000);
define_param_default!(default_steps_per_hour, u32, 4);
define_unit_param_default!(default_search_radius, Distance, 1000.0);
define_param_default!(default_events_file, PathBuf, "charging_events.csv".into());
define_param_default!(default_postprocess, bool, true);
define_param_default!(default_home_street_weight_column, String, "households_total".into());
define_param_default!(default_home_locations, Vec<String>, vec!["home".into()]);

/// Represents the contents of the entire scenario file.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScenarioParameters {
    /// Parameters for the whole run
    pub run: RunParameters,
    /// Limit on parking time applied to events before distribution
    #[serde(default)]
    pub time_limit: Option<ParkingTimeLimit>,
    /// The use cases to distribute
    pub use_cases: UseCaseTable,
}

/// Parameters for the whole run
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunParameters {
    /// Seed for the random number generator
    pub seed: u64,
    /// Number of time steps simulated
    #[serde(default = "default_horizon")]
    pub horizon: usize,
    /// Number of time steps per hour
    #[serde(default = "default_steps_per_hour")]
    pub steps_per_hour: u32,
    /// Radius within which public events may be moved to street sites
    #[serde(default = "default_search_radius")]
    pub search_radius: Distance,
    /// CSV file containing charging events, relative to the scenario directory
    #[serde(default = "default_events_file")]
    pub events_file: PathBuf,
}

/// Configuration for each use case. Use cases which are absent are not run.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct UseCaseTable {
    hpc: Option<UseCaseConfig>,
    retail: Option<UseCaseConfig>,
    public: Option<UseCaseConfig>,
    home_detached: Option<UseCaseConfig>,
    home_apartment: Option<UseCaseConfig>,
    work: Option<UseCaseConfig>,
    depot: Option<UseCaseConfig>,
}

impl UseCaseTable {
    /// Get the configuration for a use case, if it is enabled
    pub fn get(&self, use_case: UseCase) -> Option<&UseCaseConfig> {
        match use_case {
            UseCase::Hpc => self.hpc.as_ref(),
            UseCase::Retail => self.retail.as_ref(),
            UseCase::Public => self.public.as_ref(),
            UseCase::HomeDetached => self.home_detached.as_ref(),
            UseCase::HomeApartment => self.home_apartment.as_ref(),
            UseCase::Work => self.work.as_ref(),
            UseCase::Depot => self.depot.as_ref(),
        }
    }
}

/// How a use case grows its charging infrastructure
#[derive(DeserializeLabeledStringEnum, Debug, Clone, Copy, PartialEq, Default)]
pub enum GrowthMode {
    /// Use free charging points first, only installing new ones when needed
    #[default]
    #[string = "greedy"]
    Greedy,
    /// Install a new charging point for every event
    #[string = "pure_random"]
    PureRandom,
}

/// Selects the events served by a use case
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EventFilter {
    /// Required `charging_use_case` label
    pub label: String,
    /// If not empty, the event's `location` must be one of these
    #[serde(default)]
    pub include_locations: Vec<String>,
    /// The event's `location` must not be one of these
    #[serde(default)]
    pub exclude_locations: Vec<String>,
}

impl EventFilter {
    /// Whether the event is selected by this filter
    pub fn matches(&self, event: &ChargingEvent) -> bool {
        let location = event.location.as_deref();
        event.charging_use_case == self.label
            && (self.include_locations.is_empty()
                || location.is_some_and(|loc| self.include_locations.iter().any(|l| l == loc)))
            && !location.is_some_and(|loc| self.exclude_locations.iter().any(|l| l == loc))
    }
}

/// Configuration for a single use case
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct UseCaseConfig {
    /// CSV file with candidate sites, relative to the scenario directory
    pub sites_file: PathBuf,
    /// Site column used as the weight for random draws
    pub weight_column: String,
    /// Which events this use case serves
    pub events: Vec<EventFilter>,
    /// How charging points are installed
    #[serde(default)]
    pub mode: GrowthMode,
    /// Only sites with a weight above this value are candidates
    #[serde(default)]
    pub min_weight: Option<f64>,
    /// Retail only: pack public events into idle retail charging points
    #[serde(default)]
    pub multi_use: Option<MultiUseConfig>,
    /// Public only: residential buildings standing in for street parking near home
    #[serde(default)]
    pub home_street: Option<HomeStreetConfig>,
    /// Public only: move home-street events to nearby street sites afterwards
    #[serde(default = "default_postprocess")]
    pub postprocess: bool,
    /// Public only: serve pre-located events at sites with fixed capacities
    #[serde(default)]
    pub existing_capacity: Option<ExistingCapacityConfig>,
}

/// Configuration for multi-use packing at retail sites
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MultiUseConfig {
    /// The public events which are candidates for packing
    pub events: Vec<EventFilter>,
    /// Only events from vehicles of these types are candidates
    pub vehicle_types: Vec<String>,
    /// Maximum number of steps an event may be delayed by
    #[serde(default)]
    pub flexibility: usize,
}

impl MultiUseConfig {
    /// Whether the event is a candidate for packing
    pub fn matches(&self, event: &ChargingEvent) -> bool {
        self.events.iter().any(|filter| filter.matches(event))
            && event
                .vehicle_type
                .as_deref()
                .is_some_and(|vt| self.vehicle_types.iter().any(|t| t == vt))
    }
}

/// Configuration for home-street sites in the public use case
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HomeStreetConfig {
    /// CSV file with residential buildings, relative to the scenario directory
    pub sites_file: PathBuf,
    /// Site column used as the weight for random draws
    #[serde(default = "default_home_street_weight_column")]
    pub weight_column: String,
    /// Events at these locations are served by home-street sites
    #[serde(default = "default_home_locations")]
    pub locations: Vec<String>,
}

/// Configuration for serving pre-located public events at fixed capacities
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExistingCapacityConfig {
    /// CSV file with `event_id,site` columns, relative to the scenario directory
    pub located_events_file: PathBuf,
}

/// Check that the parking time limit fits within a day
fn check_time_limit(limit: &ParkingTimeLimit, steps_per_hour: u32) -> Result<()> {
    let steps_per_day = 24 * steps_per_hour as usize;
    ensure!(
        limit.start < limit.end && limit.end <= steps_per_day,
        "time_limit window must satisfy start < end <= {steps_per_day}"
    );
    ensure!(limit.duration > 0, "time_limit duration cannot be zero");

    Ok(())
}

impl UseCaseConfig {
    /// Check the configuration is valid for the given use case
    fn validate(&self, use_case: UseCase) -> Result<()> {
        ensure!(!self.events.is_empty(), "No event filters given");
        if let Some(min_weight) = self.min_weight {
            ensure!(min_weight.is_finite(), "min_weight must be a finite number");
        }

        if use_case != UseCase::Retail {
            ensure!(
                self.multi_use.is_none(),
                "multi_use is only supported for retail"
            );
        }
        if use_case != UseCase::Public {
            ensure!(
                self.home_street.is_none() && self.existing_capacity.is_none(),
                "home_street and existing_capacity are only supported for public"
            );
        }
        if let Some(multi_use) = &self.multi_use {
            ensure!(
                !multi_use.events.is_empty() && !multi_use.vehicle_types.is_empty(),
                "multi_use needs at least one event filter and vehicle type"
            );
        }
        ensure!(
            self.home_street.is_none() || self.existing_capacity.is_none(),
            "home_street cannot be combined with existing_capacity"
        );

        Ok(())
    }
}

impl ScenarioParameters {
    /// Read a scenario file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing scenario configuration files
    ///
    /// # Returns
    ///
    /// The file contents as a [`ScenarioParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ScenarioParameters> {
        let file_path = model_dir.as_ref().join(SCENARIO_PARAMETERS_FILE_NAME);
        let params: ScenarioParameters = read_toml(&file_path)?;

        params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(params)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        ensure!(self.run.horizon > 0, "horizon cannot be zero");
        ensure!(self.run.steps_per_hour > 0, "steps_per_hour cannot be zero");
        ensure!(
            self.run.search_radius.is_finite() && self.run.search_radius > Distance(0.0),
            "search_radius must be a finite number greater than zero"
        );

        if let Some(limit) = &self.time_limit {
            check_time_limit(limit, self.run.steps_per_hour)?;
        }

        let mut any_enabled = false;
        for use_case in UseCase::iter() {
            if let Some(config) = self.use_cases.get(use_case) {
                any_enabled = true;
                config
                    .validate(use_case)
                    .with_context(|| format!("Invalid configuration for use case {use_case}"))?;
            }
        }
        ensure!(any_enabled, "No use cases are enabled");

        let multi_use = self
            .use_cases
            .get(UseCase::Retail)
            .is_some_and(|c| c.multi_use.is_some());
        if multi_use && self.use_cases.get(UseCase::Public).is_none() {
            warn!(
                "Multi-use packing is enabled but the public use case is not. Events which cannot \
                be packed will not be served."
            );
        }

        Ok(())
    }
}
