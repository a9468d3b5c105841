//! BLE scanning functionality.
//!
//! Provides one-shot discovery of nearby iGrill devices. Discovery is a
//! user-initiated action, not a background poll, so the scan is
//! time-bounded and performs no internal retry.

use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager};
use parking_lot::RwLock;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::ble::uuids::{address_has_prefix, WEBER_ADDRESS_PREFIX};
use crate::error::{Error, Result};

/// A device seen during a scan.
///
/// Transient: exists only for the duration of a discovery call and is
/// not persisted anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiscoveredDevice {
    /// The BLE address of the device.
    pub address: String,
    /// Inferred model label.
    pub model: String,
}

/// Filter scan candidates down to devices matching an address prefix.
///
/// `candidates` pairs each address with the advertised local name, if
/// any. The name is currently only logged; the model label is fixed.
pub fn filter_igrill_devices(
    candidates: impl IntoIterator<Item = (String, Option<String>)>,
    prefix: &[u8; 3],
) -> Vec<DiscoveredDevice> {
    let mut devices = Vec::new();

    for (address, name) in candidates {
        if !address_has_prefix(&address, prefix) {
            continue;
        }

        let model = "iGrill".to_string();
        info!(
            "Found {} with address {}, advertised name: {:?}",
            model, address, name
        );

        devices.push(DiscoveredDevice { address, model });
    }

    devices
}

/// Scanner for discovering iGrill devices.
pub struct IgrillScanner {
    /// The BLE adapter to use for scanning.
    adapter: Adapter,
    /// Whether a scan is currently active.
    is_scanning: RwLock<bool>,
}

impl IgrillScanner {
    /// Create a new scanner on the first available Bluetooth adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new() -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|_e| Error::BluetoothUnavailable)?;

        let adapters = manager.adapters().await.map_err(Error::Bluetooth)?;

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(Error::BluetoothUnavailable)?;

        info!(
            "Using Bluetooth adapter: {:?}",
            adapter.adapter_info().await.ok()
        );

        Ok(Self::with_adapter(adapter))
    }

    /// Create a scanner with a specific adapter.
    pub fn with_adapter(adapter: Adapter) -> Self {
        Self {
            adapter,
            is_scanning: RwLock::new(false),
        }
    }

    /// Check if a scan is currently active.
    pub fn is_scanning(&self) -> bool {
        *self.is_scanning.read()
    }

    /// Scan the BLE neighborhood for iGrill devices.
    ///
    /// Runs an active scan for `timeout`, then returns the devices whose
    /// address starts with the configured prefix. An empty result means
    /// no iGrills were in range, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Discovery`] if the scan cannot be started.
    pub async fn discover(&self, timeout: Duration) -> Result<Vec<DiscoveredDevice>> {
        info!("Starting BLE scan for iGrill devices");

        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(|e| Error::Discovery {
                reason: e.to_string(),
            })?;

        *self.is_scanning.write() = true;

        tokio::time::sleep(timeout).await;

        let candidates = self.collect_candidates().await;

        // Stop the scan and reset the flag before propagating a
        // collection failure; the scan must not outlive the call.
        if let Err(e) = self.adapter.stop_scan().await {
            warn!("Failed to stop scan: {}", e);
        }

        *self.is_scanning.write() = false;

        let candidates = candidates?;

        debug!("Scan finished with {} candidates", candidates.len());

        Ok(filter_igrill_devices(candidates, &WEBER_ADDRESS_PREFIX))
    }

    /// Snapshot the addresses and names the adapter has seen so far.
    async fn collect_candidates(&self) -> Result<Vec<(String, Option<String>)>> {
        let mut candidates = Vec::new();

        for peripheral in self.adapter.peripherals().await.map_err(Error::Bluetooth)? {
            let properties = match peripheral.properties().await {
                Ok(Some(p)) => p,
                _ => continue,
            };

            candidates.push((properties.address.to_string(), properties.local_name));
        }

        Ok(candidates)
    }
}

impl Drop for IgrillScanner {
    fn drop(&mut self) {
        *self.is_scanning.write() = false;
    }
}
