//! Charging events and the time intervals they occupy.
use crate::units::{Energy, Hours, Power};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A half-open interval of time steps, `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepInterval {
    /// First occupied step
    pub start: usize,
    /// One past the last occupied step
    pub end: usize,
}

impl StepInterval {
    /// Create a new [`StepInterval`]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of steps in the interval (zero for malformed intervals)
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the interval contains no steps
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Whether the interval is non-empty and lies within `[0, horizon)`
    pub fn fits_within(&self, horizon: usize) -> bool {
        !self.is_empty() && self.end <= horizon
    }
}

impl fmt::Display for StepInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// One vehicle's charging session, as produced by the upstream event simulation
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChargingEvent {
    /// Identifier of the event in the input table
    pub event_id: u64,
    /// First time step of the session
    pub event_start: usize,
    /// Length of the session in time steps
    pub event_time: usize,
    /// Energy delivered during the session
    pub energy: Energy,
    /// Requested charging power
    pub station_charging_capacity: Power,
    /// Category label used to decide which use case serves the event
    pub charging_use_case: String,
    /// Kind of place the vehicle is parked at (e.g. `home`, `shopping`)
    #[serde(default)]
    pub location: Option<String>,
    /// Vehicle owner type (e.g. `Private`, `Commercial`)
    #[serde(default)]
    pub vehicle_type: Option<String>,
}

impl ChargingEvent {
    /// The steps occupied by this event.
    ///
    /// Input rows whose end overflows are rejected on reading. The end saturates otherwise.
    pub fn interval(&self) -> StepInterval {
        StepInterval::new(
            self.event_start,
            self.event_start.saturating_add(self.event_time),
        )
    }

    /// Time steps required to deliver the event's energy at its requested power.
    ///
    /// This is fractional; callers decide how to round.
    pub fn steps_needed(&self, steps_per_hour: f64) -> f64 {
        let hours: Hours = self.energy / self.station_charging_capacity;
        hours.value() * steps_per_hour
    }

    /// Move the event to a new interval
    pub fn set_interval(&mut self, interval: StepInterval) {
        self.event_start = interval.start;
        self.event_time = interval.len();
    }
}
