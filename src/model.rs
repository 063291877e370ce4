//! The model represents the static input data provided by the user.
use crate::event::ChargingEvent;
use crate::id::UseCase;
use crate::input::event::{read_charging_events, read_located_events};
use crate::input::site::read_sites;
use crate::site::Site;
use crate::time_limit::limit_parking_time;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::{info, warn};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use strum::IntoEnumIterator;

pub mod parameters;
pub use parameters::ScenarioParameters;

/// Sites read for a single use case
#[derive(Debug, Clone, PartialEq)]
pub struct UseCaseInputs {
    /// The candidate (or, with existing capacity, existing) sites
    pub sites: Vec<Site>,
    /// Public only: home-street sites
    pub home_street_sites: Option<Vec<Site>>,
    /// Public only: the site already chosen for each event ID
    pub located_events: Option<HashMap<u64, usize>>,
}

/// Scenario definition
pub struct Model {
    /// Parameters from the scenario file
    pub parameters: ScenarioParameters,
    /// All charging events, with parking time limits applied
    pub events: Vec<ChargingEvent>,
    /// IDs of events whose duration was shortened by the parking time limit
    pub time_limited: HashSet<u64>,
    /// Inputs for each enabled use case, in run order
    pub use_cases: IndexMap<UseCase, UseCaseInputs>,
}

impl Model {
    /// Read a scenario from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing scenario configuration files
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
        let model_dir = model_dir.as_ref();
        let parameters = ScenarioParameters::from_path(model_dir)?;

        let mut events = read_charging_events(&model_dir.join(&parameters.run.events_file))?;
        let time_limited = match &parameters.time_limit {
            Some(limit) => {
                let limited = limit_parking_time(
                    &mut events,
                    limit,
                    f64::from(parameters.run.steps_per_hour),
                );
                info!(
                    "Parking time limit shortened {} \"{}\" events",
                    limited.len(),
                    limit.label
                );
                limited
            }
            None => HashSet::new(),
        };

        let mut use_cases = IndexMap::new();
        for use_case in UseCase::iter() {
            let Some(config) = parameters.use_cases.get(use_case) else {
                continue;
            };

            let sites = read_sites(&model_dir.join(&config.sites_file))
                .with_context(|| format!("Failed to read sites for use case {use_case}"))?;
            let home_street_sites = config
                .home_street
                .as_ref()
                .map(|home_street| read_sites(&model_dir.join(&home_street.sites_file)))
                .transpose()
                .with_context(|| format!("Failed to read home-street sites for {use_case}"))?;
            let located_events = config
                .existing_capacity
                .as_ref()
                .map(|existing| {
                    read_located_events(
                        &model_dir.join(&existing.located_events_file),
                        sites.len(),
                    )
                })
                .transpose()?;

            if located_events.is_some() && sites.iter().all(|site| site.charging_points == 0) {
                warn!("Use case {use_case} has existing capacity enabled, but no charging points");
            }

            use_cases.insert(
                use_case,
                UseCaseInputs {
                    sites,
                    home_street_sites,
                    located_events,
                },
            );
        }

        Ok(Model {
            parameters,
            events,
            time_limited,
            use_cases,
        })
    }
}
