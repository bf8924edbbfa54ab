// ── Inbound status messages ──
//
// Validated form of a status frame. Produced by `crate::convert` from the
// wire frame and by the fallback poller's synthetic sources; consumed only
// by `crate::reducer`.

use crate::model::{DoorStatus, Indicators};

/// Fields carried by a `fullUpdate`. `None` means "keep the previous value".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialState {
    pub current_time: Option<String>,
    pub indicators: Option<Indicators>,
    pub door_status: Option<DoorStatus>,
}

impl PartialState {
    pub fn is_empty(&self) -> bool {
        self.current_time.is_none() && self.indicators.is_none() && self.door_status.is_none()
    }
}

/// A single update from the status stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    Time(String),
    Indicators(Indicators),
    DoorStatus(DoorStatus),
    FullUpdate(PartialState),
    /// Well-formed, but of a type this client does not understand.
    Unknown(String),
}

impl StatusMessage {
    /// Wire name of the message type, for logging.
    pub fn kind(&self) -> &str {
        match self {
            Self::Time(_) => "time",
            Self::Indicators(_) => "indicators",
            Self::DoorStatus(_) => "doorStatus",
            Self::FullUpdate(_) => "fullUpdate",
            Self::Unknown(kind) => kind,
        }
    }
}
