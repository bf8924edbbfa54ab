// ── State reducer ──
//
// Pure merge of one status message into the current device state.

use crate::message::StatusMessage;
use crate::model::DeviceState;

/// Apply `msg` to `state`.
///
/// Returns `None` when the message carries nothing this client applies
/// (an unknown type), so the caller publishes no new snapshot.
///
/// A `fullUpdate` replaces each present field and leaves absent ones at
/// their prior value. Indicators are always replaced as a whole.
pub fn reduce(state: &DeviceState, msg: &StatusMessage) -> Option<DeviceState> {
    let mut next = state.clone();
    match msg {
        StatusMessage::Time(time) => next.current_time.clone_from(time),
        StatusMessage::Indicators(indicators) => next.indicators = *indicators,
        StatusMessage::DoorStatus(status) => next.door_status = *status,
        StatusMessage::FullUpdate(partial) => {
            if let Some(ref time) = partial.current_time {
                next.current_time.clone_from(time);
            }
            if let Some(indicators) = partial.indicators {
                next.indicators = indicators;
            }
            if let Some(status) = partial.door_status {
                next.door_status = status;
            }
        }
        StatusMessage::Unknown(_) => return None,
    }
    Some(next)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::message::PartialState;
    use crate::model::{DoorStatus, Indicators};

    fn base() -> DeviceState {
        DeviceState {
            current_time: "6:00 AM".into(),
            indicators: Indicators::new([true, false, false, false, false]),
            door_status: DoorStatus::Closed,
        }
    }

    #[test]
    fn time_replaces_only_the_clock() {
        let next = reduce(&base(), &StatusMessage::Time("6:01 AM".into())).unwrap();
        assert_eq!(next.current_time, "6:01 AM");
        assert_eq!(next.indicators, base().indicators);
        assert_eq!(next.door_status, DoorStatus::Closed);
    }

    #[test]
    fn indicators_replace_whole_sequence() {
        let mut state = base();
        let sequence = [
            [false, true, false, false, false],
            [true, true, true, true, true],
            [false, false, false, true, false],
        ];
        for flags in sequence {
            state = reduce(&state, &StatusMessage::Indicators(Indicators::new(flags))).unwrap();
        }
        assert_eq!(state.indicators.as_array(), &[false, false, false, true, false]);
        assert_eq!(state.indicators.as_array().len(), 5);
    }

    #[test]
    fn full_update_with_null_door_status_keeps_it() {
        let msg = StatusMessage::FullUpdate(PartialState {
            current_time: Some("7:00 AM".into()),
            indicators: None,
            door_status: None,
        });
        let next = reduce(&base(), &msg).unwrap();
        assert_eq!(next.door_status, DoorStatus::Closed);
        assert_eq!(next.current_time, "7:00 AM");
        assert_eq!(next.indicators, base().indicators);
    }

    #[test]
    fn full_update_with_door_status_sets_it() {
        let msg = StatusMessage::FullUpdate(PartialState {
            door_status: Some(DoorStatus::Open),
            ..PartialState::default()
        });
        let next = reduce(&base(), &msg).unwrap();
        assert_eq!(next.door_status, DoorStatus::Open);
        assert_eq!(next.current_time, "6:00 AM");
    }

    #[test]
    fn full_update_indicators_are_last_writer() {
        let flags = Indicators::new([false, false, true, false, true]);
        let msg = StatusMessage::FullUpdate(PartialState {
            indicators: Some(flags),
            ..PartialState::default()
        });
        let next = reduce(&base(), &msg).unwrap();
        assert_eq!(next.indicators, flags);
    }

    #[test]
    fn unknown_type_produces_nothing() {
        assert!(reduce(&base(), &StatusMessage::Unknown("battery".into())).is_none());
    }
}
