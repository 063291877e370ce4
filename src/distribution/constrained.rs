//! Distribution of events to sites whose capacity is fixed.
use super::{
    Distribution, DistributionError, DistributionOptions, EventAssignment, report_past_horizon,
    report_progress,
};
use crate::event::{ChargingEvent, StepInterval};
use crate::occupancy::OccupancyMatrix;
use crate::site::{Site, SiteIndex};
use log::debug;

/// The window an event would occupy if delayed by `shift` steps.
///
/// Delaying an event eats into its parking time. Once the remaining time is shorter than the time
/// needed to deliver the event's energy, the window is lengthened to the charging time, but never
/// beyond the original duration.
pub fn shifted_window(event: &ChargingEvent, shift: usize, steps_per_hour: f64) -> StepInterval {
    let start = event.event_start + shift;
    let base_duration = event.event_time;
    let remaining = base_duration.saturating_sub(shift);
    let needed = event.steps_needed(steps_per_hour);

    let duration = if (remaining as f64) < needed {
        (needed.ceil() as usize).min(base_duration)
    } else {
        remaining
    };

    StepInterval::new(start, start + duration)
}

/// Find the earliest shifted window in which some site has a free point
fn find_slot(
    occupancy: &OccupancyMatrix,
    capacities: &[u32],
    event: &ChargingEvent,
    flexibility: usize,
    steps_per_hour: f64,
) -> Result<Option<(SiteIndex, StepInterval)>, DistributionError> {
    for shift in 0..=flexibility {
        let window = shifted_window(event, shift, steps_per_hour);
        if !window.fits_within(occupancy.horizon()) {
            continue;
        }

        if let Some(site) = occupancy.first_free_site(window, capacities.iter().copied())? {
            return Ok(Some((site, window)));
        }
    }

    Ok(None)
}

/// Place events at sites with fixed capacities, without installing any new points.
///
/// `occupancy` holds whatever is already booked at the sites. Events which can't be placed within
/// `flexibility` steps of their start are left unassigned.
pub fn fill_existing_only(
    sites: Vec<Site>,
    events: &[ChargingEvent],
    options: &DistributionOptions,
    mut occupancy: OccupancyMatrix,
    flexibility: usize,
) -> Result<Distribution, DistributionError> {
    if occupancy.n_sites() != sites.len() || occupancy.horizon() != options.horizon {
        return Err(DistributionError::SnapshotMismatch {
            expected: (sites.len(), options.horizon),
            actual: (occupancy.n_sites(), occupancy.horizon()),
        });
    }

    let capacities: Vec<u32> = sites.iter().map(|site| site.charging_points).collect();
    let mut assignments = Vec::with_capacity(events.len());
    let mut past_horizon = 0;
    for (done, event) in events.iter().enumerate() {
        report_progress(done, events.len());

        // Delays never move the end of a window earlier, so no shift can help
        if !event.interval().fits_within(options.horizon) {
            past_horizon += 1;
            assignments.push(EventAssignment {
                site: None,
                interval: event.interval(),
            });
            continue;
        }

        let assignment = match find_slot(
            &occupancy,
            &capacities,
            event,
            flexibility,
            options.steps_per_hour,
        )? {
            Some((site, window)) => {
                occupancy.add(site, window)?;
                EventAssignment {
                    site: Some(site),
                    interval: window,
                }
            }
            None => EventAssignment {
                site: None,
                interval: event.interval(),
            },
        };
        assignments.push(assignment);
    }
    report_past_horizon(past_horizon, options.horizon);

    let distribution = Distribution {
        sites,
        assignments,
        occupancy,
    };
    debug!(
        "Placed {} of {} events at existing charging points",
        distribution.assigned_count(),
        events.len()
    );

    Ok(distribution)
}
