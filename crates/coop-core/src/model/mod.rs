// ── Domain model ──
//
// Canonical representations of what the controller reports. Wire shapes
// live in `coop_api::models`; `crate::convert` maps between the two.

pub mod device;
pub mod log;

pub use device::{DeviceState, DoorStatus, INDICATOR_COUNT, Indicators};
pub use log::LogEntry;
