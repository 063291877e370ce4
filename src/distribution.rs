//! The event distributor, which assigns charging events to sites.
//!
//! There are three modes:
//!
//! * [`DistributionMode::GreedyGrowth`]: each event goes to the first site with a free charging
//!   point for its whole interval. If there is none, a site is drawn at random (weighted) and a new
//!   charging point is installed there.
//! * [`DistributionMode::PureRandom`]: every event is placed at a randomly drawn site and always
//!   installs a new charging point.
//! * [`DistributionMode::CapacityConstrained`]: site capacities are fixed. Events may be delayed by
//!   up to `flexibility` steps to find a free point, otherwise they are left unassigned.
use crate::event::{ChargingEvent, StepInterval};
use crate::occupancy::OccupancyMatrix;
use crate::sampler::WeightedSiteSampler;
use crate::site::{Site, SiteIndex};
use crate::units::Power;
use log::{debug, info, warn};
use rand::Rng;

pub mod constrained;
pub mod multi_use;
use constrained::fill_existing_only;

/// Minimum number of events in a batch before progress is reported
const PROGRESS_REPORT_THRESHOLD: usize = 10_000;

/// Errors raised by the distribution engine
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum DistributionError {
    /// There were no sites to distribute events to
    #[display("no sites were provided")]
    NoSites,
    /// The sampling weights were unusable
    #[display("invalid weights: {_0}")]
    InvalidWeights(String),
    /// A site had no value for the configured weight column
    #[display("site {site} has no value for weight column \"{column}\"")]
    MissingWeight {
        /// The offending site
        site: SiteIndex,
        /// The requested weight column
        column: String,
    },
    /// An event has a zero duration
    #[display("event {event_id} has empty interval {interval}")]
    InvalidEventInterval {
        /// ID of the offending event
        event_id: u64,
        /// The event's interval
        interval: StepInterval,
    },
    /// An event requests zero, negative or non-finite power or energy
    #[display("event {event_id} has invalid power {power} or energy")]
    InvalidEventPower {
        /// ID of the offending event
        event_id: u64,
        /// The requested power
        power: Power,
    },
    /// An occupancy query used an interval outside the matrix
    #[display("interval {interval} is empty or exceeds horizon {horizon}")]
    IntervalOutOfRange {
        /// The requested interval
        interval: StepInterval,
        /// The number of steps in the matrix
        horizon: usize,
    },
    /// An occupancy query used a site outside the matrix
    #[display("site {site} is out of range (there are {n_sites} sites)")]
    SiteOutOfRange {
        /// The requested site
        site: SiteIndex,
        /// The number of sites in the matrix
        n_sites: usize,
    },
    /// Releasing an event would make occupancy negative
    #[display("releasing site {site} would make occupancy negative at step {step}")]
    NegativeOccupancy {
        /// The site being released
        site: SiteIndex,
        /// The first step at which occupancy is already zero
        step: usize,
    },
    /// An inherited occupancy matrix doesn't match the sites and horizon
    #[display("occupancy matrix has shape {actual:?}, expected {expected:?}")]
    SnapshotMismatch {
        /// Expected `(sites, horizon)`
        expected: (usize, usize),
        /// Actual `(sites, horizon)`
        actual: (usize, usize),
    },
}

impl std::error::Error for DistributionError {}

/// How events are to be distributed
#[derive(Debug, Clone, PartialEq)]
pub enum DistributionMode {
    /// Fill existing points first, otherwise grow a randomly drawn site
    GreedyGrowth,
    /// Always grow a randomly drawn site
    PureRandom,
    /// Fill existing points only, allowing events to be delayed
    CapacityConstrained {
        /// Occupancy already present at the sites
        occupancy: OccupancyMatrix,
        /// Maximum number of steps an event may be delayed by
        flexibility: usize,
    },
}

/// Parameters shared by all modes
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionOptions {
    /// The site weight used for random draws
    pub weight_column: String,
    /// Number of time steps simulated
    pub horizon: usize,
    /// Number of time steps per hour
    pub steps_per_hour: f64,
}

/// Where an event ended up
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventAssignment {
    /// The site serving the event, if any
    pub site: Option<SiteIndex>,
    /// The interval during which the event occupies the site.
    ///
    /// This differs from the event's own interval if it was delayed.
    pub interval: StepInterval,
}

/// The result of a distribution run
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    /// The sites, with charging points and average capacity updated
    pub sites: Vec<Site>,
    /// One assignment per input event, in input order
    pub assignments: Vec<EventAssignment>,
    /// Occupancy of each site resulting from the assignments
    pub occupancy: OccupancyMatrix,
}

impl Distribution {
    /// Number of events which were assigned to a site
    pub fn assigned_count(&self) -> usize {
        self.assignments.iter().filter(|a| a.site.is_some()).count()
    }

    /// Number of events which could not be assigned
    pub fn unassigned_count(&self) -> usize {
        self.assignments.len() - self.assigned_count()
    }

    /// Total number of installed charging points
    pub fn total_charging_points(&self) -> u32 {
        self.sites.iter().map(|site| site.charging_points).sum()
    }

    /// Append the sites and assignments of another distribution, which must have the same horizon.
    ///
    /// Site indices in `other` are shifted to follow on from the sites already present.
    pub fn append(&mut self, other: Distribution) -> Result<(), DistributionError> {
        let offset = self.sites.len();
        self.occupancy.append(&other.occupancy)?;
        self.sites.extend(other.sites);
        self.assignments
            .extend(other.assignments.into_iter().map(|a| EventAssignment {
                site: a.site.map(|SiteIndex(idx)| SiteIndex(idx + offset)),
                interval: a.interval,
            }));

        Ok(())
    }

    /// Remove sites without charging points, renumbering the remaining sites.
    ///
    /// Events assigned to removed sites become unassigned.
    pub fn drop_empty_sites(&mut self) {
        let keep: Vec<bool> = self
            .sites
            .iter()
            .map(|site| site.charging_points > 0)
            .collect();

        let mut new_index = Vec::with_capacity(keep.len());
        let mut next = 0;
        for &kept in &keep {
            new_index.push(kept.then(|| {
                next += 1;
                SiteIndex(next - 1)
            }));
        }

        for assignment in &mut self.assignments {
            assignment.site = assignment.site.and_then(|SiteIndex(idx)| new_index[idx]);
        }
        let mut keep_iter = keep.iter();
        self.sites.retain(|_| *keep_iter.next().unwrap_or(&false));
        self.occupancy.retain_sites(&keep);
    }
}

/// Check that every event has a non-empty interval and a usable power.
///
/// Events running past the horizon are not malformed: each mode leaves them unassigned.
pub(crate) fn validate_events(events: &[ChargingEvent]) -> Result<(), DistributionError> {
    for event in events {
        let interval = event.interval();
        if interval.is_empty() {
            return Err(DistributionError::InvalidEventInterval {
                event_id: event.event_id,
                interval,
            });
        }

        let power = event.station_charging_capacity;
        if !(power.is_finite() && power > Power(0.0) && event.energy.is_finite()) {
            return Err(DistributionError::InvalidEventPower {
                event_id: event.event_id,
                power,
            });
        }
    }

    Ok(())
}

/// Collect the named weight for every site
fn collect_weights(sites: &[Site], column: &str) -> Result<Vec<f64>, DistributionError> {
    sites
        .iter()
        .enumerate()
        .map(|(idx, site)| {
            site.weight(column)
                .ok_or_else(|| DistributionError::MissingWeight {
                    site: SiteIndex(idx),
                    column: column.to_string(),
                })
        })
        .collect()
}

/// Warn about events left unassigned because they run past the horizon
pub(crate) fn report_past_horizon(count: usize, horizon: usize) {
    if count > 0 {
        warn!("{count} events run past the horizon of {horizon} steps and were left unassigned");
    }
}

/// Log progress through a long batch of events every ten percent
pub(crate) fn report_progress(done: usize, total: usize) {
    if total < PROGRESS_REPORT_THRESHOLD {
        return;
    }

    let step = total / 10;
    if done > 0 && step > 0 && done % step == 0 {
        info!("Distributed {}% of events", done * 100 / total);
    }
}

/// Distribute events to sites.
///
/// All events are validated before anything is modified, so an error means nothing was done.
/// Events are processed in the order given. Events which run past the horizon are left
/// unassigned in every mode.
///
/// # Arguments
///
/// * `sites` - The candidate sites. In the growth modes their charging points are reset to zero.
/// * `events` - The events to distribute
/// * `options` - Weight column, horizon and time resolution
/// * `mode` - How to distribute
/// * `rng` - Source of randomness for weighted draws
///
/// # Returns
///
/// The updated sites, one assignment per event and the resulting occupancy
pub fn distribute_events<R: Rng + ?Sized>(
    sites: Vec<Site>,
    events: &[ChargingEvent],
    options: &DistributionOptions,
    mode: DistributionMode,
    rng: &mut R,
) -> Result<Distribution, DistributionError> {
    if sites.is_empty() {
        return Err(DistributionError::NoSites);
    }
    validate_events(events)?;

    match mode {
        DistributionMode::GreedyGrowth => grow(sites, events, options, true, rng),
        DistributionMode::PureRandom => grow(sites, events, options, false, rng),
        DistributionMode::CapacityConstrained {
            occupancy,
            flexibility,
        } => fill_existing_only(sites, events, options, occupancy, flexibility),
    }
}

/// Distribute events, installing new charging points where needed
fn grow<R: Rng + ?Sized>(
    mut sites: Vec<Site>,
    events: &[ChargingEvent],
    options: &DistributionOptions,
    fill_existing_first: bool,
    rng: &mut R,
) -> Result<Distribution, DistributionError> {
    let sampler = WeightedSiteSampler::new(&collect_weights(&sites, &options.weight_column)?)?;
    for site in &mut sites {
        site.charging_points = 0;
        site.average_charging_capacity = Power(0.0);
    }

    let mut occupancy = OccupancyMatrix::new(sites.len(), options.horizon);
    let mut assignments = Vec::with_capacity(events.len());
    let mut past_horizon = 0;
    for (done, event) in events.iter().enumerate() {
        report_progress(done, events.len());

        let interval = event.interval();
        if !interval.fits_within(options.horizon) {
            past_horizon += 1;
            assignments.push(EventAssignment {
                site: None,
                interval,
            });
            continue;
        }

        let free = if fill_existing_first {
            occupancy.first_free_site(interval, sites.iter().map(|site| site.charging_points))?
        } else {
            None
        };

        let site = if let Some(site) = free {
            site
        } else {
            let site = sampler.sample(rng);
            sites[site.0].add_charging_point(event.station_charging_capacity);
            site
        };

        occupancy.add(site, interval)?;
        assignments.push(EventAssignment {
            site: Some(site),
            interval,
        });
    }

    report_past_horizon(past_horizon, options.horizon);

    for site in &mut sites {
        site.average_charging_capacity = Power(site.average_charging_capacity.value().trunc());
    }

    let distribution = Distribution {
        sites,
        assignments,
        occupancy,
    };
    debug!(
        "Installed {} charging points for {} events",
        distribution.total_charging_points(),
        events.len()
    );

    Ok(distribution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{charging_event, distribution_options, site_with_weight};
    use float_cmp::assert_approx_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rstest::rstest;

    #[rstest]
    fn test_greedy_single_site(distribution_options: DistributionOptions) {
        // two overlapping events need two points; a later event reuses one
        let sites = vec![site_with_weight(1.0)];
        let events = vec![
            charging_event(1, 0, 4, 11.0),
            charging_event(2, 2, 4, 11.0),
            charging_event(3, 10, 2, 11.0),
        ];
        let mut rng = StdRng::seed_from_u64(0);
        let result = distribute_events(
            sites,
            &events,
            &distribution_options,
            DistributionMode::GreedyGrowth,
            &mut rng,
        )
        .unwrap();

        assert_eq!(result.sites[0].charging_points, 2);
        assert_approx_eq!(Power, result.sites[0].average_charging_capacity, Power(11.0));
        assert_eq!(result.occupancy.max_overall(SiteIndex(0)), 2);
        assert!(
            result
                .assignments
                .iter()
                .all(|a| a.site == Some(SiteIndex(0)))
        );
    }

    #[rstest]
    fn test_greedy_zero_weight_not_grown(distribution_options: DistributionOptions) {
        // only the positive-weight site ever receives points
        let sites = vec![site_with_weight(0.0), site_with_weight(1.0)];
        let events = vec![charging_event(1, 0, 4, 11.0), charging_event(2, 0, 4, 22.0)];
        let mut rng = StdRng::seed_from_u64(3);
        let result = distribute_events(
            sites,
            &events,
            &distribution_options,
            DistributionMode::GreedyGrowth,
            &mut rng,
        )
        .unwrap();

        assert_eq!(result.sites[0].charging_points, 0);
        assert_eq!(result.sites[1].charging_points, 2);
        assert_approx_eq!(Power, result.sites[1].average_charging_capacity, Power(16.0));
    }

    #[rstest]
    fn test_greedy_resets_existing_points(distribution_options: DistributionOptions) {
        let mut site = site_with_weight(1.0);
        site.charging_points = 5;
        let events = vec![charging_event(1, 0, 4, 11.0)];
        let mut rng = StdRng::seed_from_u64(3);
        let result = distribute_events(
            vec![site],
            &events,
            &distribution_options,
            DistributionMode::GreedyGrowth,
            &mut rng,
        )
        .unwrap();
        assert_eq!(result.sites[0].charging_points, 1);
    }

    #[rstest]
    fn test_pure_random_always_grows(distribution_options: DistributionOptions) {
        let sites = vec![site_with_weight(1.0), site_with_weight(1.0)];
        let events = vec![
            charging_event(1, 0, 4, 11.0),
            charging_event(2, 10, 4, 11.0),
            charging_event(3, 20, 4, 11.0),
        ];
        let mut rng = StdRng::seed_from_u64(9);
        let result = distribute_events(
            sites,
            &events,
            &distribution_options,
            DistributionMode::PureRandom,
            &mut rng,
        )
        .unwrap();

        // Events never overlap, but each still installs its own point
        assert_eq!(result.total_charging_points(), 3);
        assert_eq!(result.assigned_count(), 3);
    }

    #[rstest]
    #[case(DistributionMode::GreedyGrowth)]
    #[case(DistributionMode::PureRandom)]
    fn test_event_past_horizon_unassigned(#[case] mode: DistributionMode) {
        let options = DistributionOptions {
            weight_column: "weight".into(),
            horizon: 10,
            steps_per_hour: 4.0,
        };
        let events = vec![charging_event(1, 0, 4, 11.0), charging_event(2, 8, 4, 11.0)];
        let mut rng = StdRng::seed_from_u64(0);
        let result =
            distribute_events(vec![site_with_weight(1.0)], &events, &options, mode, &mut rng)
                .unwrap();

        assert_eq!(result.assignments[0].site, Some(SiteIndex(0)));
        assert_eq!(
            result.assignments[1],
            EventAssignment {
                site: None,
                interval: StepInterval::new(8, 12)
            }
        );
        assert_eq!(result.unassigned_count(), 1);
        // No point is installed for the event which was left out
        assert_eq!(result.total_charging_points(), 1);
    }

    #[rstest]
    fn test_zero_duration_rejected(distribution_options: DistributionOptions) {
        let sites = vec![site_with_weight(1.0)];
        let events = vec![charging_event(5, 3, 0, 11.0)];
        let mut rng = StdRng::seed_from_u64(0);
        let result = distribute_events(
            sites,
            &events,
            &distribution_options,
            DistributionMode::PureRandom,
            &mut rng,
        );
        assert!(matches!(
            result,
            Err(DistributionError::InvalidEventInterval { event_id: 5, .. })
        ));
    }

    #[rstest]
    fn test_no_sites(distribution_options: DistributionOptions) {
        let mut rng = StdRng::seed_from_u64(0);
        let result = distribute_events(
            Vec::new(),
            &[charging_event(1, 0, 4, 11.0)],
            &distribution_options,
            DistributionMode::GreedyGrowth,
            &mut rng,
        );
        assert_eq!(result, Err(DistributionError::NoSites));
    }

    #[rstest]
    fn test_missing_weight(distribution_options: DistributionOptions) {
        let mut site = site_with_weight(1.0);
        site.weights.clear();
        let mut rng = StdRng::seed_from_u64(0);
        let result = distribute_events(
            vec![site],
            &[charging_event(1, 0, 4, 11.0)],
            &distribution_options,
            DistributionMode::GreedyGrowth,
            &mut rng,
        );
        assert!(matches!(
            result,
            Err(DistributionError::MissingWeight { .. })
        ));
    }

    #[rstest]
    fn test_drop_empty_sites(distribution_options: DistributionOptions) {
        let sites = vec![
            site_with_weight(0.0),
            site_with_weight(1.0),
            site_with_weight(0.0),
        ];
        let events = vec![charging_event(1, 0, 4, 11.0)];
        let mut rng = StdRng::seed_from_u64(0);
        let mut result = distribute_events(
            sites,
            &events,
            &distribution_options,
            DistributionMode::GreedyGrowth,
            &mut rng,
        )
        .unwrap();

        result.drop_empty_sites();
        assert_eq!(result.sites.len(), 1);
        assert_eq!(result.assignments[0].site, Some(SiteIndex(0)));
        assert_eq!(result.occupancy.n_sites(), 1);
        assert_eq!(result.occupancy.max_overall(SiteIndex(0)), 1);
    }

    #[test]
    fn test_average_truncated() {
        let options = DistributionOptions {
            weight_column: "weight".into(),
            horizon: 100,
            steps_per_hour: 4.0,
        };
        let events = vec![charging_event(1, 0, 4, 11.0), charging_event(2, 0, 4, 3.7)];
        let mut rng = StdRng::seed_from_u64(0);
        let result = distribute_events(
            vec![site_with_weight(1.0)],
            &events,
            &options,
            DistributionMode::GreedyGrowth,
            &mut rng,
        )
        .unwrap();
        assert_approx_eq!(Power, result.sites[0].average_charging_capacity, Power(7.0));
    }

    #[rstest]
    fn test_greedy_reuses_idle_points() {
        // Three concurrent events need three points; the later two reuse them
        let options = DistributionOptions {
            weight_column: "weight".into(),
            horizon: 10,
            steps_per_hour: 4.0,
        };
        let sites = vec![site_with_weight(1.0); 3];
        let events = vec![
            charging_event(1, 0, 4, 11.0),
            charging_event(2, 0, 4, 22.0),
            charging_event(3, 0, 4, 22.0),
            charging_event(4, 4, 4, 11.0),
            charging_event(5, 4, 4, 22.0),
        ];
        let mut rng = StdRng::seed_from_u64(0);
        let result = distribute_events(
            sites,
            &events,
            &options,
            DistributionMode::GreedyGrowth,
            &mut rng,
        )
        .unwrap();

        assert_eq!(result.total_charging_points(), 3);
        assert_eq!(result.assigned_count(), 5);
    }

    /// Many overlapping events at sites of differing weight
    fn busy_day() -> (Vec<Site>, Vec<ChargingEvent>) {
        let sites = [1.0, 2.0, 0.5, 3.0]
            .into_iter()
            .map(site_with_weight)
            .collect();
        let powers = [3.7, 11.0, 22.0, 7.4, 50.0];
        let events = (0..200)
            .map(|idx| {
                charging_event(
                    idx,
                    (idx as usize * 7) % 80,
                    1 + (idx as usize * 3) % 16,
                    powers[idx as usize % powers.len()],
                )
            })
            .collect();
        (sites, events)
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(42)]
    fn test_greedy_points_match_peak_occupancy(
        distribution_options: DistributionOptions,
        #[case] seed: u64,
    ) {
        let (sites, events) = busy_day();
        let mut rng = StdRng::seed_from_u64(seed);
        let result = distribute_events(
            sites,
            &events,
            &distribution_options,
            DistributionMode::GreedyGrowth,
            &mut rng,
        )
        .unwrap();

        assert_eq!(result.assigned_count(), events.len());
        for (idx, site) in result.sites.iter().enumerate() {
            assert_eq!(
                site.charging_points,
                result.occupancy.max_overall(SiteIndex(idx)),
                "site {idx}"
            );
        }
    }

    #[rstest]
    #[case(DistributionMode::GreedyGrowth)]
    #[case(DistributionMode::PureRandom)]
    fn test_average_between_assigned_powers(
        distribution_options: DistributionOptions,
        #[case] mode: DistributionMode,
    ) {
        let (sites, events) = busy_day();
        let mut rng = StdRng::seed_from_u64(7);
        let result = distribute_events(sites, &events, &distribution_options, mode, &mut rng)
            .unwrap();

        for (idx, site) in result.sites.iter().enumerate() {
            if site.charging_points == 0 {
                continue;
            }
            let powers = events
                .iter()
                .zip(&result.assignments)
                .filter(|(_, assignment)| assignment.site == Some(SiteIndex(idx)))
                .map(|(event, _)| event.station_charging_capacity.value());
            let (min, max) = powers.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p), hi.max(p))
            });
            let average = site.average_charging_capacity.value();
            assert!(
                min - 1.0 <= average && average <= max,
                "site {idx}: average {average} outside [{min}, {max}]"
            );
        }
    }
}
