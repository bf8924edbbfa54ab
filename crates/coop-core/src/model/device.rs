// ── Door and sensor state ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::CoreError;

/// Number of sensor/command indicator lamps on the controller.
pub const INDICATOR_COUNT: usize = 5;

/// Door position as reported by the controller.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum DoorStatus {
    Open,
    Closed,
    #[default]
    Unknown,
}

impl DoorStatus {
    /// Map a wire string to a status. Anything unrecognized is `Unknown`.
    pub fn from_wire(value: &str) -> Self {
        value.trim().parse().unwrap_or(Self::Unknown)
    }
}

/// The five indicator lamps, in wire order.
///
/// Always exactly [`INDICATOR_COUNT`] flags; the array type makes any other
/// length unrepresentable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Indicators([bool; INDICATOR_COUNT]);

impl Indicators {
    /// Display labels, index-aligned with the flags.
    pub const LABELS: [&'static str; INDICATOR_COUNT] =
        ["Up Limit", "Down Limit", "Up Command", "Down Command", "Stop Command"];

    pub const fn new(flags: [bool; INDICATOR_COUNT]) -> Self {
        Self(flags)
    }

    pub fn as_array(&self) -> &[bool; INDICATOR_COUNT] {
        &self.0
    }

    pub fn up_limit(&self) -> bool {
        self.0[0]
    }

    pub fn down_limit(&self) -> bool {
        self.0[1]
    }

    pub fn up_command(&self) -> bool {
        self.0[2]
    }

    pub fn down_command(&self) -> bool {
        self.0[3]
    }

    pub fn stop_command(&self) -> bool {
        self.0[4]
    }

    /// `(label, flag)` pairs in wire order.
    pub fn labeled(&self) -> impl Iterator<Item = (&'static str, bool)> + '_ {
        Self::LABELS.into_iter().zip(self.0.iter().copied())
    }
}

impl TryFrom<Vec<bool>> for Indicators {
    type Error = CoreError;

    fn try_from(flags: Vec<bool>) -> Result<Self, Self::Error> {
        let len = flags.len();
        <[bool; INDICATOR_COUNT]>::try_from(flags)
            .map(Self)
            .map_err(|_| {
                CoreError::validation(format!(
                    "expected {INDICATOR_COUNT} indicators, got {len}"
                ))
            })
    }
}

/// Current known status of the coop door controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    /// Last clock reading, as a display string. The backend is authoritative.
    pub current_time: String,
    pub indicators: Indicators,
    pub door_status: DoorStatus,
}
