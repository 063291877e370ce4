//! The public use case: street sites, optional home-street sites and postprocessing.
use super::retail::MultiUseHandback;
use super::{UseCaseResult, candidate_sites, distribution_options, grow_sites, select_events};
use crate::distribution::{Distribution, EventAssignment, report_past_horizon, validate_events};
use crate::event::ChargingEvent;
use crate::id::UseCase;
use crate::model::parameters::UseCaseConfig;
use crate::model::{Model, UseCaseInputs};
use crate::occupancy::OccupancyMatrix;
use crate::postprocess::postprocess_public;
use crate::rebalance::{PreLocatedEvent, rebalance_with_hard_caps};
use crate::site::{Site, SiteIndex, SiteMode};
use anyhow::Result;
use itertools::Itertools;
use log::{info, warn};
use rand::rngs::StdRng;
use std::collections::HashMap;

/// Tag every site with the given mode
fn with_mode(mut sites: Vec<Site>, mode: SiteMode) -> Vec<Site> {
    for site in &mut sites {
        site.mode = Some(mode);
    }
    sites
}

/// Run the public use case.
///
/// Events handed back from retail multi-use packing replace the candidates for packing.
pub fn run_public(
    config: &UseCaseConfig,
    inputs: &UseCaseInputs,
    model: &Model,
    handback: Option<MultiUseHandback>,
    rng: &mut StdRng,
) -> Result<UseCaseResult> {
    let mut events = select_events(&model.events, &config.events);
    if let Some(handback) = handback {
        events.retain(|event| !handback.candidates.contains(&event.event_id));
        events.extend(handback.residual);
    }

    if let Some(located) = &inputs.located_events {
        return run_with_existing_capacity(inputs, located, events, model);
    }

    let options = distribution_options(model, &config.weight_column);
    let street_sites = with_mode(candidate_sites(&inputs.sites, config), SiteMode::Street);
    let (Some(home_config), Some(home_sites)) = (&config.home_street, &inputs.home_street_sites)
    else {
        let distribution = grow_sites(street_sites, &events, &options, config.mode, rng)?;
        return Ok(UseCaseResult::new(
            UseCase::Public,
            distribution,
            &events,
            &vec![false; events.len()],
            &model.time_limited,
        ));
    };

    let (home_events, street_events): (Vec<_>, Vec<_>) =
        events.into_iter().partition(|event| {
            event
                .location
                .as_deref()
                .is_some_and(|loc| home_config.locations.iter().any(|l| l == loc))
        });

    let home_options = distribution_options(model, &home_config.weight_column);
    let home_sites = with_mode(home_sites.clone(), SiteMode::HomeStreet);
    let home_distribution = grow_sites(home_sites, &home_events, &home_options, config.mode, rng)?;
    let mut distribution = grow_sites(street_sites, &street_events, &options, config.mode, rng)?;

    // Street sites come first, then home-street sites
    distribution.append(home_distribution)?;
    let events = street_events.into_iter().chain(home_events).collect_vec();

    if config.postprocess {
        postprocess_public(&mut distribution, model.parameters.run.search_radius)?;
    }

    Ok(UseCaseResult::new(
        UseCase::Public,
        distribution,
        &events,
        &vec![false; events.len()],
        &model.time_limited,
    ))
}

/// Serve pre-located events at sites whose charging points are a hard cap.
fn run_with_existing_capacity(
    inputs: &UseCaseInputs,
    located: &HashMap<u64, usize>,
    events: Vec<ChargingEvent>,
    model: &Model,
) -> Result<UseCaseResult> {
    let sites = with_mode(inputs.sites.clone(), SiteMode::Street);
    let (distribution, events) =
        distribute_pre_located(sites, located, events, model.parameters.run.horizon)?;

    Ok(UseCaseResult::new(
        UseCase::Public,
        distribution,
        &events,
        &vec![false; events.len()],
        &model.time_limited,
    ))
}

/// Rebalance pre-located events between sites and size each site to its peak load.
///
/// Events without a site in the located events file, or running past the horizon, are left
/// unassigned. They come after the served candidates in the returned events.
fn distribute_pre_located(
    mut sites: Vec<Site>,
    located: &HashMap<u64, usize>,
    events: Vec<ChargingEvent>,
    horizon: usize,
) -> Result<(Distribution, Vec<ChargingEvent>)> {
    validate_events(&events)?;
    let capacities = sites.iter().map(|site| site.charging_points).collect_vec();

    let (located_events, unlocated): (Vec<_>, Vec<_>) = events
        .into_iter()
        .partition(|event| located.contains_key(&event.event_id));
    if !unlocated.is_empty() {
        warn!(
            "{} public events have no site in the located events file",
            unlocated.len()
        );
    }
    let (candidates, past_horizon): (Vec<_>, Vec<_>) = located_events
        .into_iter()
        .partition(|event| event.interval().fits_within(horizon));
    report_past_horizon(past_horizon.len(), horizon);

    let pre_located = candidates
        .iter()
        .map(|event| PreLocatedEvent {
            interval: event.interval(),
            site: SiteIndex(located[&event.event_id]),
        })
        .collect_vec();
    let outcome = rebalance_with_hard_caps(&capacities, &pre_located)?;
    info!(
        "Rebalancing moved {} events; {} could not be served",
        outcome.reassigned_count(),
        outcome.unserved_count()
    );

    for (site, &peak) in sites.iter_mut().zip(&outcome.peak_load) {
        site.charging_points = peak;
    }

    let mut occupancy = OccupancyMatrix::new(sites.len(), horizon);
    let mut assignments = Vec::new();
    for (event, rebalanced) in candidates.iter().zip(&outcome.events) {
        if let Some(site) = rebalanced.site {
            occupancy.add(site, event.interval())?;
        }
        assignments.push(EventAssignment {
            site: rebalanced.site,
            interval: event.interval(),
        });
    }

    let unassigned = unlocated.into_iter().chain(past_horizon).collect_vec();
    assignments.extend(unassigned.iter().map(|event| EventAssignment {
        site: None,
        interval: event.interval(),
    }));

    let distribution = Distribution {
        sites,
        assignments,
        occupancy,
    };
    let events = candidates.into_iter().chain(unassigned).collect_vec();

    Ok((distribution, events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::StepInterval;
    use crate::fixture::{charging_event, site_with_weight};
    use rstest::rstest;

    #[rstest]
    fn test_pre_located_event_past_horizon_unassigned() {
        let mut site = site_with_weight(1.0);
        site.charging_points = 1;
        let located = HashMap::from([(1, 0), (2, 0)]);
        let events = vec![charging_event(1, 0, 4, 11.0), charging_event(2, 8, 4, 11.0)];

        let (distribution, events) =
            distribute_pre_located(vec![site], &located, events, 10).unwrap();

        assert_eq!(events.iter().map(|event| event.event_id).collect_vec(), [1, 2]);
        assert_eq!(distribution.assignments[0].site, Some(SiteIndex(0)));
        assert_eq!(
            distribution.assignments[1],
            EventAssignment {
                site: None,
                interval: StepInterval::new(8, 12)
            }
        );
        assert_eq!(distribution.sites[0].charging_points, 1);
    }

    #[rstest]
    fn test_unlocated_event_unassigned() {
        let mut site = site_with_weight(1.0);
        site.charging_points = 2;
        let located = HashMap::from([(1, 0)]);
        let events = vec![charging_event(3, 2, 4, 11.0), charging_event(1, 0, 4, 11.0)];

        let (distribution, events) =
            distribute_pre_located(vec![site], &located, events, 10).unwrap();

        // Served events come first
        assert_eq!(events.iter().map(|event| event.event_id).collect_vec(), [1, 3]);
        assert_eq!(distribution.assigned_count(), 1);
        assert_eq!(distribution.unassigned_count(), 1);
        // Sized to the peak load rather than the existing capacity
        assert_eq!(distribution.sites[0].charging_points, 1);
    }
}
