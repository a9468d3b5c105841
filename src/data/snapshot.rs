//! Device snapshot data structures.
//!
//! The snapshot is the immutable result of one polling session.

use std::collections::HashMap;

use crate::data::sensors::SensorKind;

/// The complete result of one polling session against an iGrill.
///
/// Constructed empty at session start, populated incrementally by each
/// successful characteristic read, and returned complete (or partially
/// complete on soft failures) at session end. Never mutated after
/// return.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceSnapshot {
    /// The BLE address the session connected to.
    pub address: String,
    /// Hardware revision string. May be empty, not all devices expose
    /// firmware characteristics.
    pub hardware_version: String,
    /// Firmware revision string. May be empty.
    pub software_version: String,
    /// Advertised device name. May be empty.
    pub name: String,
    /// Device identifier string. May be empty.
    pub identifier: String,
    /// Decoded sensor values, keyed by kind.
    ///
    /// Contains only kinds the decoder recognizes; unrecognized
    /// characteristic reads are dropped, not stored.
    pub sensors: HashMap<SensorKind, Option<f64>>,
}

impl DeviceSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a sensor value, if the session read one.
    ///
    /// The outer `Option` is absence (never read), the inner is a null
    /// reading.
    pub fn sensor(&self, kind: SensorKind) -> Option<Option<f64>> {
        self.sensors.get(&kind).copied()
    }

    /// Convenience accessor for the battery percentage.
    pub fn battery_percent(&self) -> Option<f64> {
        self.sensor(SensorKind::BatteryPercent).flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_snapshot_is_empty() {
        let snapshot = DeviceSnapshot::new();
        assert_eq!(snapshot.address, "");
        assert_eq!(snapshot.hardware_version, "");
        assert!(snapshot.sensors.is_empty());
        assert_eq!(snapshot.battery_percent(), None);
    }

    #[test]
    fn test_sensor_accessors() {
        let mut snapshot = DeviceSnapshot::new();
        snapshot
            .sensors
            .insert(SensorKind::BatteryPercent, Some(87.0));

        assert_eq!(snapshot.sensor(SensorKind::BatteryPercent), Some(Some(87.0)));
        assert_eq!(snapshot.battery_percent(), Some(87.0));
    }

    #[test]
    fn test_null_reading_is_distinct_from_absence() {
        let mut snapshot = DeviceSnapshot::new();
        snapshot.sensors.insert(SensorKind::BatteryPercent, None);

        assert_eq!(snapshot.sensor(SensorKind::BatteryPercent), Some(None));
        assert_eq!(snapshot.battery_percent(), None);
    }
}
