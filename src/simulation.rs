//! Functionality for running a scenario, one use case at a time.
use crate::distribution::{
    Distribution, DistributionMode, DistributionOptions, distribute_events,
};
use crate::event::ChargingEvent;
use crate::id::{LocationId, UseCase};
use crate::model::parameters::{EventFilter, GrowthMode, UseCaseConfig};
use crate::model::{Model, UseCaseInputs};
use crate::occupancy::OccupancyMatrix;
use crate::output::DataWriter;
use crate::site::{Site, SiteMode};
use crate::units::{Energy, Power};
use anyhow::{Context, Result};
use itertools::Itertools;
use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

pub mod public;
pub mod retail;
use retail::MultiUseHandback;

/// An event together with where it ended up
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedEvent {
    /// The event, with its interval moved if it was delayed
    pub event: ChargingEvent,
    /// The serving site, if any
    pub location: Option<LocationId>,
    /// The partition of the serving site, if the use case has more than one
    pub mode: Option<SiteMode>,
    /// Whether the event was packed into another use case's charging points
    pub multi_use: bool,
    /// Whether the event's duration was shortened by the parking time limit
    pub time_limited: bool,
}

/// Totals for one use case
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UseCaseSummary {
    /// The use case
    pub use_case: UseCase,
    /// Number of sites with at least one charging point
    pub sites: usize,
    /// Total number of charging points
    pub charging_points: u32,
    /// Energy delivered to assigned events
    pub energy: Energy,
    /// Sum over sites of average charging capacity multiplied by charging points
    pub installed_power: Power,
    /// Number of events considered
    pub events: usize,
    /// Number of events which could not be served
    pub unassigned_events: usize,
}

/// The located sites and events for one use case
#[derive(Debug, Clone, PartialEq)]
pub struct UseCaseResult {
    /// The use case
    pub use_case: UseCase,
    /// Sites with at least one charging point. The site at index `i` has ID `{use_case}-{i}`.
    pub sites: Vec<Site>,
    /// All events considered by the use case, in the order they were distributed
    pub events: Vec<LocatedEvent>,
    /// Totals
    pub summary: UseCaseSummary,
}

impl UseCaseResult {
    /// Assemble the result of a use case from its distribution.
    ///
    /// Sites without charging points are dropped and the rest are given IDs.
    ///
    /// # Arguments
    ///
    /// * `use_case` - The use case
    /// * `distribution` - Sites and one assignment per event
    /// * `events` - The events, in the same order as the assignments
    /// * `multi_use` - Which events were packed from another use case
    /// * `time_limited` - IDs of events shortened by the parking time limit
    pub fn new(
        use_case: UseCase,
        mut distribution: Distribution,
        events: &[ChargingEvent],
        multi_use: &[bool],
        time_limited: &HashSet<u64>,
    ) -> Self {
        distribution.drop_empty_sites();
        let Distribution {
            sites, assignments, ..
        } = distribution;

        let events = events
            .iter()
            .zip(&assignments)
            .zip(multi_use)
            .map(|((event, assignment), &multi_use)| {
                let mut event = event.clone();
                if assignment.site.is_some() {
                    event.set_interval(assignment.interval);
                }
                LocatedEvent {
                    location: assignment.site.map(|site| LocationId::new(use_case, site.0)),
                    mode: assignment.site.and_then(|site| sites[site.0].mode),
                    multi_use,
                    time_limited: time_limited.contains(&event.event_id),
                    event,
                }
            })
            .collect_vec();

        let summary = UseCaseSummary {
            use_case,
            sites: sites.len(),
            charging_points: sites.iter().map(|site| site.charging_points).sum(),
            energy: events
                .iter()
                .filter(|e| e.location.is_some())
                .map(|e| e.event.energy)
                .sum(),
            installed_power: sites.iter().map(Site::installed_power).sum(),
            events: events.len(),
            unassigned_events: events.iter().filter(|e| e.location.is_none()).count(),
        };

        Self {
            use_case,
            sites,
            events,
            summary,
        }
    }
}

/// Events matching any of the filters, grouped by filter and without duplicates
pub fn select_events(events: &[ChargingEvent], filters: &[EventFilter]) -> Vec<ChargingEvent> {
    filters
        .iter()
        .flat_map(|filter| events.iter().filter(move |event| filter.matches(event)))
        .unique_by(|event| event.event_id)
        .cloned()
        .collect()
}

/// Sites whose weight exceeds the configured minimum
pub fn candidate_sites(sites: &[Site], config: &UseCaseConfig) -> Vec<Site> {
    match config.min_weight {
        Some(min_weight) => sites
            .iter()
            .filter(|site| {
                site.weight(&config.weight_column)
                    .is_some_and(|weight| weight > min_weight)
            })
            .cloned()
            .collect(),
        None => sites.to_vec(),
    }
}

/// Distribution options for a use case
fn distribution_options(model: &Model, weight_column: &str) -> DistributionOptions {
    DistributionOptions {
        weight_column: weight_column.to_string(),
        horizon: model.parameters.run.horizon,
        steps_per_hour: f64::from(model.parameters.run.steps_per_hour),
    }
}

/// Distribute events over sites, installing charging points as needed.
///
/// With no events, the sites are returned without charging points.
pub fn grow_sites(
    mut sites: Vec<Site>,
    events: &[ChargingEvent],
    options: &DistributionOptions,
    mode: GrowthMode,
    rng: &mut StdRng,
) -> Result<Distribution> {
    if events.is_empty() {
        for site in &mut sites {
            site.charging_points = 0;
            site.average_charging_capacity = Power(0.0);
        }
        let occupancy = OccupancyMatrix::new(sites.len(), options.horizon);
        return Ok(Distribution {
            sites,
            assignments: Vec::new(),
            occupancy,
        });
    }

    let mode = match mode {
        GrowthMode::Greedy => DistributionMode::GreedyGrowth,
        GrowthMode::PureRandom => DistributionMode::PureRandom,
    };
    Ok(distribute_events(sites, events, options, mode, rng)?)
}

/// Run a use case with a single set of sites and no extra steps
fn run_standard(
    use_case: UseCase,
    config: &UseCaseConfig,
    inputs: &UseCaseInputs,
    model: &Model,
    rng: &mut StdRng,
) -> Result<UseCaseResult> {
    let events = select_events(&model.events, &config.events);
    let sites = candidate_sites(&inputs.sites, config);
    let options = distribution_options(model, &config.weight_column);
    let distribution = grow_sites(sites, &events, &options, config.mode, rng)?;

    Ok(UseCaseResult::new(
        use_case,
        distribution,
        &events,
        &vec![false; events.len()],
        &model.time_limited,
    ))
}

/// Run the scenario and write the results to `output_path`.
///
/// Use cases are run in a fixed order from a single seeded random number generator, so the
/// results are reproducible.
pub fn run(model: &Model, output_path: &Path) -> Result<Vec<UseCaseSummary>> {
    let mut rng = StdRng::seed_from_u64(model.parameters.run.seed);
    let mut writer = DataWriter::create(output_path)?;
    let mut handback: Option<MultiUseHandback> = None;
    let mut summaries = Vec::new();

    for (&use_case, inputs) in &model.use_cases {
        let config = model
            .parameters
            .use_cases
            .get(use_case)
            .with_context(|| format!("No configuration for use case {use_case}"))?;
        info!("Use case: {use_case}");

        let result = match use_case {
            UseCase::Retail => retail::run_retail(config, inputs, model, &mut rng).map(
                |(result, retail_handback)| {
                    handback = retail_handback;
                    result
                },
            ),
            UseCase::Public => public::run_public(config, inputs, model, handback.take(), &mut rng),
            _ => run_standard(use_case, config, inputs, model, &mut rng),
        }
        .with_context(|| format!("Failed to distribute charging events for use case {use_case}"))?;

        let summary = &result.summary;
        info!(
            "{use_case}: {} charging points at {} sites, {} kW installed",
            summary.charging_points, summary.sites, summary.installed_power
        );
        if summary.unassigned_events > 0 {
            warn!(
                "{use_case}: {} of {} events could not be served",
                summary.unassigned_events, summary.events
            );
        }

        writer.write_use_case(&result)?;
        summaries.push(result.summary);
    }

    if let Some(handback) = handback {
        warn!(
            "{} events could not be packed into retail charging points and will not be served",
            handback.residual.len()
        );
    }

    writer.write_summary(&summaries)?;
    writer.flush()?;

    Ok(summaries)
}
