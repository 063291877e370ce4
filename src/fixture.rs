//! Fixtures for tests

use crate::distribution::DistributionOptions;
use crate::event::ChargingEvent;
use crate::site::{Point, Site};
use crate::units::{Energy, Power};
use indexmap::indexmap;
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// A street charging event which needs one hour of charging at `power` kW
pub fn charging_event(event_id: u64, start: usize, time: usize, power: f64) -> ChargingEvent {
    ChargingEvent {
        event_id,
        event_start: start,
        event_time: time,
        energy: Energy(power),
        station_charging_capacity: Power(power),
        charging_use_case: "street".into(),
        location: None,
        vehicle_type: None,
    }
}

/// A site at the origin with a single weight column called `weight`
pub fn site_with_weight(weight: f64) -> Site {
    Site::new(Point::default(), indexmap! {"weight".into() => weight})
}

/// One day at 15-minute resolution
#[fixture]
pub fn distribution_options() -> DistributionOptions {
    DistributionOptions {
        weight_column: "weight".into(),
        horizon: 96,
        steps_per_hour: 4.0,
    }
}
