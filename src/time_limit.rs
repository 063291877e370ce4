//! Limiting how long vehicles may stay parked during a restricted daily window.
use crate::event::ChargingEvent;
use serde::Deserialize;
use std::collections::HashSet;

/// A daily window during which parking time is limited
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParkingTimeLimit {
    /// Events with this `charging_use_case` label are limited
    pub label: String,
    /// Step of the day at which the window opens
    pub start: usize,
    /// Step of the day at which the window closes
    pub end: usize,
    /// Maximum number of steps a vehicle may stay within the window
    pub duration: usize,
}

impl ParkingTimeLimit {
    /// New duration of `event` once the limit is applied.
    ///
    /// Within each day's window, time is capped to the larger of the limit and the time needed to
    /// deliver the event's energy. Vehicles arriving within the last `duration` steps of the window
    /// are exempt. The result is never longer than the original duration and never zero.
    pub fn limited_duration(&self, event: &ChargingEvent, steps_per_hour: f64) -> usize {
        let steps_per_day = (24.0 * steps_per_hour).round() as usize;
        let end = event.event_start + event.event_time;
        let max_in_window = event.steps_needed(steps_per_hour).max(self.duration as f64);

        let mut cursor = event.event_start;
        let mut new_duration = 0.0;
        while cursor < end {
            let day_start = cursor / steps_per_day * steps_per_day;
            let window_start = day_start + self.start;
            let window_end = day_start + self.end;
            let part_end = end.min(day_start + steps_per_day);

            let outside_window = cursor >= window_end || part_end <= window_start;
            let exempt = cursor + self.duration >= window_end;
            if outside_window || exempt {
                new_duration += (part_end - cursor) as f64;
                cursor = part_end;
                continue;
            }

            let overlap = part_end.min(window_end) - cursor.max(window_start);
            let before_window = window_start.saturating_sub(cursor);
            new_duration += before_window as f64 + (overlap as f64).min(max_in_window);
            cursor = window_end;
        }

        (new_duration.min(event.event_time as f64) as usize).max(1)
    }
}

/// Shorten events with the limit's label which overlap the restricted window.
///
/// Returns the IDs of events whose duration was reduced.
pub fn limit_parking_time(
    events: &mut [ChargingEvent],
    limit: &ParkingTimeLimit,
    steps_per_hour: f64,
) -> HashSet<u64> {
    let mut limited = HashSet::new();
    for event in events
        .iter_mut()
        .filter(|event| event.charging_use_case == limit.label)
    {
        let new_duration = limit.limited_duration(event, steps_per_hour);
        if new_duration < event.event_time {
            event.event_time = new_duration;
            limited.insert(event.event_id);
        }
    }

    limited
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::charging_event;
    use crate::units::Energy;
    use rstest::{fixture, rstest};

    /// 09:00 to 21:00, at most four hours
    #[fixture]
    fn limit() -> ParkingTimeLimit {
        ParkingTimeLimit {
            label: "street".into(),
            start: 36,
            end: 84,
            duration: 16,
        }
    }

    #[rstest]
    #[case(40, 40, 11.0, 16)] // inside the window
    #[case(30, 30, 11.0, 22)] // arrives before the window opens
    #[case(70, 20, 11.0, 20)] // arrives late in the window
    #[case(0, 20, 11.0, 20)] // before the window
    #[case(40, 40, 55.0, 20)] // needs longer than the limit to charge
    #[case(80, 70, 11.0, 68)] // overnight into the next day's window
    fn test_limited_duration(
        limit: ParkingTimeLimit,
        #[case] start: usize,
        #[case] duration: usize,
        #[case] energy: f64,
        #[case] expected: usize,
    ) {
        let mut event = charging_event(1, start, duration, 11.0);
        event.energy = Energy(energy);
        assert_eq!(limit.limited_duration(&event, 4.0), expected);
    }

    #[rstest]
    fn test_limit_parking_time(limit: ParkingTimeLimit) {
        let mut events = vec![
            charging_event(1, 40, 40, 11.0),
            charging_event(2, 0, 20, 11.0),
            charging_event(3, 40, 40, 11.0),
        ];
        events[2].charging_use_case = "work".into();

        let limited = limit_parking_time(&mut events, &limit, 4.0);
        assert_eq!(limited, HashSet::from([1]));
        assert_eq!(events[0].event_time, 16);
        assert_eq!(events[1].event_time, 20);
        assert_eq!(events[2].event_time, 40);
    }
}
