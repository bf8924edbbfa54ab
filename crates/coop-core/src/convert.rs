// ── API-to-domain type conversions ──
//
// Bridges raw `coop_api` wire types into canonical domain types. Frames
// and records that fail validation are reported as errors; callers decide
// whether to drop or surface them.

use chrono::{DateTime, Utc};
use coop_api::{RawMessage, RawPartialState, StatusFrame};

use crate::error::CoreError;
use crate::message::{PartialState, StatusMessage};
use crate::model::{DoorStatus, Indicators, LogEntry};

// ── Status frames ────────────────────────────────────────────────

impl TryFrom<StatusFrame> for StatusMessage {
    type Error = CoreError;

    fn try_from(frame: StatusFrame) -> Result<Self, Self::Error> {
        Ok(match frame {
            StatusFrame::Time(time) => StatusMessage::Time(time),
            StatusFrame::Indicators(flags) => StatusMessage::Indicators(flags.try_into()?),
            StatusFrame::DoorStatus(status) => {
                StatusMessage::DoorStatus(DoorStatus::from_wire(&status))
            }
            StatusFrame::FullUpdate(raw) => StatusMessage::FullUpdate(raw.try_into()?),
            StatusFrame::Unknown(kind) => StatusMessage::Unknown(kind),
        })
    }
}

impl TryFrom<RawPartialState> for PartialState {
    type Error = CoreError;

    /// Empty strings count as absent, the same as `null`.
    fn try_from(raw: RawPartialState) -> Result<Self, Self::Error> {
        Ok(PartialState {
            current_time: raw.current_time.filter(|t| !t.is_empty()),
            indicators: raw.indicators.map(Indicators::try_from).transpose()?,
            door_status: raw
                .door_status
                .filter(|s| !s.is_empty())
                .map(|s| DoorStatus::from_wire(&s)),
        })
    }
}

/// Parse and validate one text frame from the status stream.
pub fn decode_frame(text: &str) -> Result<StatusMessage, CoreError> {
    let frame = coop_api::websocket::parse_frame(text)?;
    StatusMessage::try_from(frame)
}

// ── Message log ──────────────────────────────────────────────────

impl TryFrom<RawMessage> for LogEntry {
    type Error = CoreError;

    fn try_from(raw: RawMessage) -> Result<Self, Self::Error> {
        let timestamp = DateTime::parse_from_rfc3339(&raw.timestamp)
            .map_err(|e| {
                CoreError::validation(format!(
                    "message {} has invalid timestamp {:?}: {e}",
                    raw.id, raw.timestamp
                ))
            })?
            .with_timezone(&Utc);

        Ok(LogEntry {
            id: raw.id,
            message: raw.message,
            timestamp,
        })
    }
}
