//! Sensor kinds and the characteristic decoder.
//!
//! Maps raw characteristic payloads to named, typed sensor values. The
//! decoder is a pure function with no I/O; unrecognized characteristics
//! decode to `None` and are dropped by the session.

use uuid::Uuid;

use crate::ble::uuids::BATTERY_LEVEL_UUID;

/// The closed set of sensors an iGrill exposes.
///
/// Each kind maps 1:1 to a characteristic UUID and a decode rule. New
/// sensors are added here without touching the session logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SensorKind {
    /// Battery charge as a percentage.
    BatteryPercent,
}

impl SensorKind {
    /// All recognized sensor kinds.
    pub fn all() -> &'static [SensorKind] {
        &[Self::BatteryPercent]
    }

    /// The characteristic UUID this sensor is read from.
    pub fn characteristic_uuid(&self) -> Uuid {
        match self {
            Self::BatteryPercent => BATTERY_LEVEL_UUID,
        }
    }

    /// Resolve a characteristic UUID to a sensor kind.
    pub fn from_characteristic_uuid(uuid: &Uuid) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.characteristic_uuid() == *uuid)
    }

    /// Stable snake_case label for this sensor.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BatteryPercent => "battery_percent",
        }
    }
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Decode a raw characteristic payload into a sensor value.
///
/// Returns `None` for characteristics outside the recognized set and
/// for payloads too short to decode; the caller drops those. Values are
/// not range-validated here (a battery reading above 100 is passed
/// through for the caller to judge).
pub fn decode(characteristic_uuid: &Uuid, raw: &[u8]) -> Option<(SensorKind, f64)> {
    let kind = SensorKind::from_characteristic_uuid(characteristic_uuid)?;

    let value = match kind {
        // Standard GATT Battery Level: a single percentage byte.
        SensorKind::BatteryPercent => *raw.first()? as f64,
    };

    Some((kind, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_battery_payload() {
        let decoded = decode(&BATTERY_LEVEL_UUID, &[87]);
        assert_eq!(decoded, Some((SensorKind::BatteryPercent, 87.0)));
    }

    #[test]
    fn test_decode_unrecognized_characteristic() {
        let unknown = Uuid::from_u128(0x0000_2a00_0000_1000_8000_00805f9b34fb);
        assert_eq!(decode(&unknown, &[87]), None);
    }

    #[test]
    fn test_decode_empty_payload() {
        assert_eq!(decode(&BATTERY_LEVEL_UUID, &[]), None);
    }

    #[test]
    fn test_decode_does_not_range_validate() {
        // Out-of-range values are the caller's problem.
        let decoded = decode(&BATTERY_LEVEL_UUID, &[200]);
        assert_eq!(decoded, Some((SensorKind::BatteryPercent, 200.0)));
    }

    #[test]
    fn test_kind_uuid_mapping_is_bijective() {
        for kind in SensorKind::all() {
            let uuid = kind.characteristic_uuid();
            assert_eq!(SensorKind::from_characteristic_uuid(&uuid), Some(*kind));
        }
    }

    #[test]
    fn test_sensor_kind_name() {
        assert_eq!(SensorKind::BatteryPercent.name(), "battery_percent");
        assert_eq!(SensorKind::BatteryPercent.to_string(), "battery_percent");
    }
}
