//! Data types produced by polling sessions.

pub mod sensors;
pub mod snapshot;

pub use sensors::{decode, SensorKind};
pub use snapshot::DeviceSnapshot;
