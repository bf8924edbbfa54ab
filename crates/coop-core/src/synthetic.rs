// ── Synthetic state sources ──
//
// What the fallback poller feeds the reducer while the status stream is
// down. Each source returns a partial update; the reducer merges it like
// any `fullUpdate`.

use chrono::{Local, NaiveTime, Timelike};
use rand::Rng;

use crate::config::FallbackMode;
use crate::message::PartialState;
use crate::model::{DeviceState, DoorStatus, INDICATOR_COUNT, Indicators};

/// Generator for fallback updates.
pub trait SyntheticSource: Send + Sync {
    /// Produce the next synthetic update given the current state.
    fn next(&self, current: &DeviceState) -> PartialState;
}

/// Build the source for a configured mode.
pub fn source_for(mode: FallbackMode) -> Box<dyn SyntheticSource> {
    match mode {
        FallbackMode::Simulate => Box::new(SimulatedSource),
        FallbackMode::Clock => Box::new(ClockSource),
    }
}

/// Format a wall-clock time the way the controller does: `7:05 AM`.
pub fn format_clock(time: NaiveTime) -> String {
    let (pm, hour) = time.hour12();
    let suffix = if pm { "PM" } else { "AM" };
    format!("{hour}:{:02} {suffix}", time.minute())
}

fn local_clock() -> String {
    format_clock(Local::now().time())
}

/// Local clock, random indicators, random open/closed door.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedSource;

impl SyntheticSource for SimulatedSource {
    fn next(&self, _current: &DeviceState) -> PartialState {
        let mut rng = rand::thread_rng();
        let mut flags = [false; INDICATOR_COUNT];
        for flag in &mut flags {
            *flag = rng.gen_bool(0.5);
        }
        let door = if rng.gen_bool(0.5) {
            DoorStatus::Open
        } else {
            DoorStatus::Closed
        };

        PartialState {
            current_time: Some(local_clock()),
            indicators: Some(Indicators::new(flags)),
            door_status: Some(door),
        }
    }
}

/// Local clock only; sensor values keep their last known state.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClockSource;

impl SyntheticSource for ClockSource {
    fn next(&self, _current: &DeviceState) -> PartialState {
        PartialState {
            current_time: Some(local_clock()),
            ..PartialState::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_formatting_matches_controller() {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        assert_eq!(format_clock(t(0, 5)), "12:05 AM");
        assert_eq!(format_clock(t(7, 30)), "7:30 AM");
        assert_eq!(format_clock(t(12, 0)), "12:00 PM");
        assert_eq!(format_clock(t(23, 59)), "11:59 PM");
    }

    #[test]
    fn simulated_source_fills_every_field() {
        let partial = SimulatedSource.next(&DeviceState::default());
        assert!(partial.current_time.is_some());
        assert!(partial.indicators.is_some());
        assert!(matches!(
            partial.door_status,
            Some(DoorStatus::Open | DoorStatus::Closed)
        ));
    }

    #[test]
    fn clock_source_leaves_sensors_alone() {
        let partial = ClockSource.next(&DeviceState::default());
        assert!(partial.current_time.is_some());
        assert!(partial.indicators.is_none());
        assert!(partial.door_status.is_none());
    }
}
