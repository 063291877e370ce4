//! The retail use case, with optional multi-use packing of public events.
use super::{UseCaseResult, candidate_sites, distribution_options, grow_sites, select_events};
use crate::distribution::EventAssignment;
use crate::distribution::multi_use::pack_multi_use;
use crate::event::ChargingEvent;
use crate::id::UseCase;
use crate::model::parameters::UseCaseConfig;
use crate::model::{Model, UseCaseInputs};
use anyhow::Result;
use rand::rngs::StdRng;
use std::collections::HashSet;

/// Public events considered for multi-use packing, and those which didn't fit
#[derive(Debug, Clone, PartialEq)]
pub struct MultiUseHandback {
    /// IDs of all events considered for packing
    pub candidates: HashSet<u64>,
    /// Events which could not be packed, to be served by the public use case
    pub residual: Vec<ChargingEvent>,
}

/// Run the retail use case.
///
/// If multi-use packing is configured, the matching public events are packed into the retail
/// charging points once the retail events have been distributed. The events which don't fit are
/// handed back for the public use case.
pub fn run_retail(
    config: &UseCaseConfig,
    inputs: &UseCaseInputs,
    model: &Model,
    rng: &mut StdRng,
) -> Result<(UseCaseResult, Option<MultiUseHandback>)> {
    let mut events = select_events(&model.events, &config.events);
    let sites = candidate_sites(&inputs.sites, config);
    let options = distribution_options(model, &config.weight_column);
    let mut distribution = grow_sites(sites, &events, &options, config.mode, rng)?;
    let mut multi_use = vec![false; events.len()];

    let handback = if let Some(multi_use_config) = &config.multi_use {
        let candidates: Vec<ChargingEvent> = model
            .events
            .iter()
            .filter(|event| multi_use_config.matches(event))
            .cloned()
            .collect();
        let outcome = pack_multi_use(
            &distribution,
            &candidates,
            &options,
            multi_use_config.flexibility,
        )?;

        distribution.occupancy = outcome.occupancy;
        for packed in outcome.packed {
            distribution.assignments.push(EventAssignment {
                site: Some(packed.site),
                interval: packed.event.interval(),
            });
            events.push(packed.event);
            multi_use.push(true);
        }

        Some(MultiUseHandback {
            candidates: candidates.iter().map(|event| event.event_id).collect(),
            residual: outcome.residual,
        })
    } else {
        None
    };

    let result = UseCaseResult::new(
        UseCase::Retail,
        distribution,
        &events,
        &multi_use,
        &model.time_limited,
    );

    Ok((result, handback))
}
