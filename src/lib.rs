// Allow unusual byte groupings for UUIDs which have standard format
#![allow(clippy::unusual_byte_groupings)]

//! # igrill-rust-ble
//!
//! A cross-platform Rust library for polling Weber iGrill thermometers
//! via Bluetooth Low Energy.
//!
//! Each poll is a fresh, independent session: connect, perform the
//! vendor challenge/response handshake, read the recognized sensor
//! characteristics, disconnect, and return a [`DeviceSnapshot`]. The
//! library keeps no state between polls; schedules, retries across
//! polls and presentation belong to the host application.
//!
//! ## Features
//!
//! - **Discovery**: scan the neighborhood for iGrills by the Weber
//!   manufacturer address prefix
//! - **Authentication**: the iDevices challenge/response handshake
//!   (no key required)
//! - **Sensor reads**: battery level today; the [`SensorKind`] set is
//!   where new sensors are added
//! - **Testable core**: sessions run against the [`BleTransport`]
//!   trait, so protocol logic is exercised without a radio
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use igrill_rust_ble::{BtleplugTransport, DeviceSession, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let transport = BtleplugTransport::new().await?;
//!     let session = DeviceSession::new(transport);
//!
//!     let snapshot = session.update("70:91:8F:0A:0B:0C").await?;
//!
//!     if let Some(battery) = snapshot.battery_percent() {
//!         println!("Battery: {:.0}%", battery);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Platform Notes
//!
//! ### macOS
//! Requires Bluetooth permission. Add `NSBluetoothAlwaysUsageDescription`
//! to your Info.plist for bundled apps.
//!
//! ### Linux
//! Requires BlueZ. User may need to be in the `bluetooth` group.
//!
//! ### Windows
//! Requires Windows 10 or later with Bluetooth LE support.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization for data types

// Public modules
pub mod ble;
pub mod data;
pub mod error;
pub mod protocol;
pub mod session;

// Re-exports for convenience
pub use error::{Error, Result};
pub use session::DeviceSession;

// Re-export commonly used types from submodules
pub use ble::scanner::{DiscoveredDevice, IgrillScanner};
pub use ble::transport::{
    BleTransport, BtleplugConnection, BtleplugTransport, DeviceConnection, GattService,
    ProtectionLevel,
};
pub use data::{decode, DeviceSnapshot, SensorKind};
pub use protocol::handshake::HandshakeStep;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that key types are exported
        let _ = std::any::TypeId::of::<Error>();
        let _ = std::any::TypeId::of::<DeviceSnapshot>();
        let _ = std::any::TypeId::of::<SensorKind>();
        let _ = std::any::TypeId::of::<DiscoveredDevice>();
        let _ = std::any::TypeId::of::<HandshakeStep>();
    }
}
