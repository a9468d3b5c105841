//! BLE communication module.
//!
//! This module provides low-level Bluetooth Low Energy functionality
//! for discovering and communicating with iGrill devices.

pub mod scanner;
pub mod transport;
pub mod uuids;

pub use scanner::{DiscoveredDevice, IgrillScanner};
pub use transport::{
    BleTransport, BtleplugConnection, BtleplugTransport, DeviceConnection, GattService,
    ProtectionLevel,
};
pub use uuids::*;
