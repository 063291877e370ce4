//! Code for reading charging events from CSV files.
use super::{input_err_msg, read_csv};
use crate::event::ChargingEvent;
use crate::units::{Energy, Power};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Read charging events from a CSV file.
///
/// Events must have unique IDs, a positive duration, non-negative energy and positive power.
pub fn read_charging_events(file_path: &Path) -> Result<Vec<ChargingEvent>> {
    let events_csv = read_csv(file_path)?;
    read_charging_events_from_iter(events_csv).with_context(|| input_err_msg(file_path))
}

fn read_charging_events_from_iter<I>(iter: I) -> Result<Vec<ChargingEvent>>
where
    I: Iterator<Item = ChargingEvent>,
{
    let mut ids = HashSet::new();
    let mut events = Vec::new();
    for event in iter {
        let id = event.event_id;
        ensure!(ids.insert(id), "Duplicate event ID: {id}");
        ensure!(event.event_time > 0, "Event {id}: event_time must be positive");
        ensure!(
            event.event_start.checked_add(event.event_time).is_some(),
            "Event {id}: event_start + event_time is too large"
        );
        ensure!(
            event.energy.is_finite() && event.energy >= Energy(0.0),
            "Event {id}: energy must be a finite, non-negative number"
        );
        ensure!(
            event.station_charging_capacity.is_finite()
                && event.station_charging_capacity > Power(0.0),
            "Event {id}: station_charging_capacity must be a finite number greater than zero"
        );

        events.push(event);
    }

    Ok(events)
}

/// A row of a file giving the sites already chosen for events
#[derive(Debug, PartialEq, Deserialize)]
struct LocatedEventRaw {
    event_id: u64,
    site: usize,
}

/// Read the site already chosen for each event.
///
/// `site` is the zero-based row number of the site in the corresponding sites file.
pub fn read_located_events(file_path: &Path, n_sites: usize) -> Result<HashMap<u64, usize>> {
    let located_csv = read_csv(file_path)?;
    read_located_events_from_iter(located_csv, n_sites).with_context(|| input_err_msg(file_path))
}

fn read_located_events_from_iter<I>(iter: I, n_sites: usize) -> Result<HashMap<u64, usize>>
where
    I: Iterator<Item = LocatedEventRaw>,
{
    let mut located = HashMap::new();
    for record in iter {
        ensure!(
            record.site < n_sites,
            "Event {}: site {} does not exist (there are {n_sites} sites)",
            record.event_id,
            record.site
        );
        ensure!(
            located.insert(record.event_id, record.site).is_none(),
            "Event {} is located more than once",
            record.event_id
        );
    }

    Ok(located)
}
