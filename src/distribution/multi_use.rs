//! Packing a second population of events into the capacity left idle by a finished use case.
use super::constrained::fill_existing_only;
use super::{Distribution, DistributionError, DistributionOptions, validate_events};
use crate::event::ChargingEvent;
use crate::occupancy::OccupancyMatrix;
use crate::site::SiteIndex;
use log::info;

/// An event packed into another use case's sites
#[derive(Debug, Clone, PartialEq)]
pub struct PackedEvent {
    /// The event, with its interval moved if it had to be delayed
    pub event: ChargingEvent,
    /// The site serving the event
    pub site: SiteIndex,
    /// Whether the event was delayed
    pub shifted: bool,
}

/// The result of multi-use packing
#[derive(Debug, Clone, PartialEq)]
pub struct MultiUseOutcome {
    /// Events which found a free point
    pub packed: Vec<PackedEvent>,
    /// Events which did not, in input order
    pub residual: Vec<ChargingEvent>,
    /// Occupancy of the sites including the packed events
    pub occupancy: OccupancyMatrix,
}

/// Pack `events` into the idle capacity of a finished distribution.
///
/// The sites and their charging points are left as they are. Events may be delayed by up to
/// `flexibility` steps. Events running past the horizon end up in the residual.
pub fn pack_multi_use(
    base: &Distribution,
    events: &[ChargingEvent],
    options: &DistributionOptions,
    flexibility: usize,
) -> Result<MultiUseOutcome, DistributionError> {
    validate_events(events)?;
    let result = fill_existing_only(
        base.sites.clone(),
        events,
        options,
        base.occupancy.clone(),
        flexibility,
    )?;

    let mut packed = Vec::new();
    let mut residual = Vec::new();
    for (event, assignment) in events.iter().zip(&result.assignments) {
        if let Some(site) = assignment.site {
            let mut event = event.clone();
            let shifted = assignment.interval != event.interval();
            event.set_interval(assignment.interval);
            packed.push(PackedEvent {
                event,
                site,
                shifted,
            });
        } else {
            residual.push(event.clone());
        }
    }

    info!(
        "Multi-use: packed {} events into existing charging points, {} left over",
        packed.len(),
        residual.len()
    );

    Ok(MultiUseOutcome {
        packed,
        residual,
        occupancy: result.occupancy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::{DistributionMode, distribute_events};
    use crate::event::StepInterval;
    use crate::fixture::{charging_event, distribution_options, site_with_weight};
    use crate::units::Energy;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rstest::rstest;

    #[rstest]
    fn test_pack_multi_use(distribution_options: DistributionOptions) {
        // Daytime retail events, leaving the single point idle from step 8
        let retail_events = vec![charging_event(1, 0, 8, 11.0)];
        let mut rng = StdRng::seed_from_u64(0);
        let base = distribute_events(
            vec![site_with_weight(1.0)],
            &retail_events,
            &distribution_options,
            DistributionMode::GreedyGrowth,
            &mut rng,
        )
        .unwrap();
        assert_eq!(base.sites[0].charging_points, 1);

        let mut delayed = charging_event(10, 6, 4, 11.0);
        delayed.energy = Energy(5.5);
        let street_events = vec![
            charging_event(11, 20, 4, 11.0),
            delayed,
            charging_event(12, 0, 4, 11.0),
        ];
        let outcome = pack_multi_use(&base, &street_events, &distribution_options, 2).unwrap();

        assert_eq!(outcome.packed.len(), 2);
        assert_eq!(outcome.packed[0].event.event_id, 11);
        assert!(!outcome.packed[0].shifted);
        assert_eq!(outcome.packed[1].event.event_id, 10);
        assert!(outcome.packed[1].shifted);
        assert_eq!(
            outcome.packed[1].event.interval(),
            StepInterval::new(8, 10)
        );
        assert_eq!(outcome.residual.len(), 1);
        assert_eq!(outcome.residual[0].event_id, 12);

        // Event conservation
        assert_eq!(
            outcome.packed.len() + outcome.residual.len(),
            street_events.len()
        );

        // Capacity is respected everywhere
        assert!(outcome.occupancy.max_overall(SiteIndex(0)) <= base.sites[0].charging_points);
    }

    #[rstest]
    fn test_event_past_horizon_left_over() {
        let options = DistributionOptions {
            weight_column: "weight".into(),
            horizon: 10,
            steps_per_hour: 4.0,
        };
        let mut rng = StdRng::seed_from_u64(0);
        let base = distribute_events(
            vec![site_with_weight(1.0)],
            &[charging_event(1, 0, 4, 11.0)],
            &options,
            DistributionMode::GreedyGrowth,
            &mut rng,
        )
        .unwrap();

        let events = vec![charging_event(2, 4, 2, 11.0), charging_event(3, 8, 4, 11.0)];
        let outcome = pack_multi_use(&base, &events, &options, 0).unwrap();

        assert_eq!(outcome.packed.len(), 1);
        assert_eq!(outcome.packed[0].event.event_id, 2);
        assert_eq!(outcome.residual.len(), 1);
        assert_eq!(outcome.residual[0].event_id, 3);
    }
}
