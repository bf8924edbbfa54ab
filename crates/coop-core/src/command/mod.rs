// ── Command API ──
//
// All write operations flow through a unified `Command` enum. Each maps to
// exactly one backend endpoint; the in-flight set is keyed by endpoint.

mod in_flight;
mod schedule;

use serde::Serialize;
use serde_json::{Value, json};
use strum::{Display, IntoStaticStr};

pub use in_flight::{InFlight, InFlightGuard};
pub use schedule::ScheduleTime;

/// Backend command endpoints. Displays as the URL path segment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, IntoStaticStr, Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    Open,
    Close,
    SetOpenTime,
    SetCloseTime,
}

impl Endpoint {
    /// Path segment under the API root, e.g. `setopentime`.
    pub fn path(self) -> &'static str {
        self.into()
    }
}

/// All write operations against the coop controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open the door now.
    Open,
    /// Close the door now.
    Close,
    /// Set the daily auto-open time.
    SetOpenTime(ScheduleTime),
    /// Set the daily auto-close time.
    SetCloseTime(ScheduleTime),
}

impl Command {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::Open => Endpoint::Open,
            Self::Close => Endpoint::Close,
            Self::SetOpenTime(_) => Endpoint::SetOpenTime,
            Self::SetCloseTime(_) => Endpoint::SetCloseTime,
        }
    }

    /// The schedule time carried by this command, if any.
    pub fn schedule_time(&self) -> Option<ScheduleTime> {
        match self {
            Self::SetOpenTime(t) | Self::SetCloseTime(t) => Some(*t),
            Self::Open | Self::Close => None,
        }
    }

    /// JSON request body: `{ "time": "HH:MM" }` for schedule commands.
    pub fn body(&self) -> Option<Value> {
        self.schedule_time()
            .map(|t| json!({ "time": t.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_lowercase_paths() {
        assert_eq!(Endpoint::SetOpenTime.path(), "setopentime");
        assert_eq!(Endpoint::SetCloseTime.to_string(), "setclosetime");
        assert_eq!(Command::Close.endpoint().path(), "close");
    }

    #[test]
    fn schedule_body_is_zero_padded() {
        let cmd = Command::SetOpenTime(ScheduleTime::parse("7:30").unwrap());
        assert_eq!(cmd.body(), Some(json!({ "time": "07:30" })));
        assert_eq!(Command::Open.body(), None);
    }
}
