//! Reassigning pre-located events so that no site exceeds a hard cap on charging points.
use crate::distribution::DistributionError;
use crate::event::StepInterval;
use crate::site::SiteIndex;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// An event which has already been given a site
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreLocatedEvent {
    /// The steps occupied by the event
    pub interval: StepInterval,
    /// The site the event was originally given
    pub site: SiteIndex,
}

/// Where a pre-located event ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebalancedEvent {
    /// The serving site, or `None` if every site was full
    pub site: Option<SiteIndex>,
    /// Whether the event moved away from its original site
    pub reassigned: bool,
}

/// The result of [`rebalance_with_hard_caps`]
#[derive(Debug, Clone, PartialEq)]
pub struct RebalanceOutcome {
    /// One entry per input event, in input order
    pub events: Vec<RebalancedEvent>,
    /// The highest simultaneous load seen at each site
    pub peak_load: Vec<u32>,
}

impl RebalanceOutcome {
    /// Number of events which could not be served
    pub fn unserved_count(&self) -> usize {
        self.events.iter().filter(|e| e.site.is_none()).count()
    }

    /// Number of events served somewhere other than their original site
    pub fn reassigned_count(&self) -> usize {
        self.events.iter().filter(|e| e.reassigned).count()
    }
}

/// Serve pre-located events at sites whose number of charging points can't be exceeded.
///
/// Events are swept in order of start time (longer events first on ties). Before each event, all
/// events ending at or before its start are released. An event stays at its original site if that
/// has room, otherwise it goes to the least-loaded site with room (lowest index on ties). If there
/// is none, the event is unserved.
pub fn rebalance_with_hard_caps(
    capacities: &[u32],
    events: &[PreLocatedEvent],
) -> Result<RebalanceOutcome, DistributionError> {
    let n_sites = capacities.len();
    if let Some(event) = events.iter().find(|e| e.site.0 >= n_sites) {
        return Err(DistributionError::SiteOutOfRange {
            site: event.site,
            n_sites,
        });
    }

    let mut order: Vec<usize> = (0..events.len()).collect();
    order.sort_by_key(|&idx| (events[idx].interval.start, Reverse(events[idx].interval.len())));

    let mut load = vec![0u32; n_sites];
    let mut peak_load = vec![0u32; n_sites];

    // Sites with room, keyed by the load at the time of insertion. Entries whose load no longer
    // matches are stale and skipped when popped.
    let mut available: BinaryHeap<Reverse<(u32, SiteIndex)>> = capacities
        .iter()
        .enumerate()
        .filter(|(_, cap)| **cap > 0)
        .map(|(idx, _)| Reverse((0, SiteIndex(idx))))
        .collect();
    let mut ending: BinaryHeap<Reverse<(usize, SiteIndex)>> = BinaryHeap::new();

    let mut results = vec![
        RebalancedEvent {
            site: None,
            reassigned: false,
        };
        events.len()
    ];
    for idx in order {
        let event = &events[idx];

        while let Some(Reverse((end, site))) = ending.peek().copied() {
            if end > event.interval.start {
                break;
            }
            ending.pop();
            load[site.0] -= 1;
            if load[site.0] < capacities[site.0] {
                available.push(Reverse((load[site.0], site)));
            }
        }

        let original = event.site;
        let chosen = if load[original.0] < capacities[original.0] {
            Some(original)
        } else {
            let mut chosen = None;
            while let Some(Reverse((site_load, site))) = available.pop() {
                if site_load == load[site.0] && load[site.0] < capacities[site.0] {
                    chosen = Some(site);
                    break;
                }
            }
            chosen
        };

        let Some(site) = chosen else {
            continue;
        };

        load[site.0] += 1;
        peak_load[site.0] = peak_load[site.0].max(load[site.0]);
        ending.push(Reverse((event.interval.end, site)));
        if load[site.0] < capacities[site.0] {
            available.push(Reverse((load[site.0], site)));
        }

        results[idx] = RebalancedEvent {
            site: Some(site),
            reassigned: site != original,
        };
    }

    Ok(RebalanceOutcome {
        events: results,
        peak_load,
    })
}
