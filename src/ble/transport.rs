//! BLE transport abstraction.
//!
//! The session layer talks to devices exclusively through the
//! [`BleTransport`] and [`DeviceConnection`] traits so that protocol
//! logic can be exercised without a radio. [`BtleplugTransport`] is the
//! production implementation backed by btleplug.

use async_trait::async_trait;
use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::StreamExt;
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

#[cfg(test)]
use mockall::automock;

/// Link protection level requested when pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProtectionLevel {
    /// No encryption required.
    #[default]
    Open,
    /// Encrypted link.
    Encrypted,
    /// Encrypted and authenticated link.
    Authenticated,
}

/// A GATT service and the characteristics it exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattService {
    /// The service UUID.
    pub uuid: Uuid,
    /// UUIDs of the characteristics within the service.
    pub characteristics: Vec<Uuid>,
}

/// A live connection to a single BLE device.
///
/// At most one GATT operation may be in flight per connection; callers
/// issue reads and writes sequentially.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DeviceConnection: Send + Sync {
    /// The BLE address of the connected device.
    fn address(&self) -> String;

    /// Request link-level pairing.
    ///
    /// Best-effort: many devices work without explicit pairing, so
    /// callers are expected to log and continue on failure.
    async fn pair(&self, level: ProtectionLevel) -> Result<()>;

    /// Read the raw value of a characteristic.
    async fn read_characteristic(&self, uuid: &Uuid) -> Result<Vec<u8>>;

    /// Write raw bytes to a characteristic.
    async fn write_characteristic(&self, uuid: &Uuid, data: &[u8], with_response: bool)
        -> Result<()>;

    /// Enumerate all services and their characteristics.
    async fn list_services(&self) -> Result<Vec<GattService>>;

    /// Release the connection.
    async fn disconnect(&self) -> Result<()>;
}

/// Capability to open connections to BLE devices by address.
///
/// Implementations own connect retry and backoff; the session layer
/// only passes connect failures through.
#[async_trait]
pub trait BleTransport: Send + Sync {
    /// The connection handle type produced by this transport.
    type Connection: DeviceConnection + 'static;

    /// Resolve a live connection to the device at `address`.
    async fn connect(&self, address: &str) -> Result<Self::Connection>;
}

/// Production transport backed by btleplug.
pub struct BtleplugTransport {
    /// The BLE adapter used for peripheral resolution and connections.
    adapter: Adapter,
    /// Maximum connection attempts before giving up.
    max_connect_attempts: u32,
    /// Delay between connection attempts.
    connect_retry_delay: Duration,
    /// How long to scan when the target peripheral is not yet cached.
    resolve_scan_window: Duration,
}

impl BtleplugTransport {
    /// Create a transport on the first available Bluetooth adapter.
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

    /// Create a transport with a specific adapter.
    pub fn with_adapter(adapter: Adapter) -> Self {
        Self {
            adapter,
            max_connect_attempts: 3,
            connect_retry_delay: Duration::from_secs(1),
            resolve_scan_window: Duration::from_secs(5),
        }
    }

    /// Set the connect retry parameters.
    pub fn set_connect_params(&mut self, max_attempts: u32, delay: Duration) {
        self.max_connect_attempts = max_attempts;
        self.connect_retry_delay = delay;
    }

    /// Find a peripheral by address, scanning briefly if it is not
    /// already known to the adapter.
    async fn resolve_peripheral(&self, address: &str) -> Result<Peripheral> {
        if let Some(peripheral) = self.known_peripheral(address).await? {
            return Ok(peripheral);
        }

        debug!("Peripheral {} not cached, scanning for it", address);

        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(Error::Bluetooth)?;

        // Stop the scan before propagating; it must not outlive the
        // resolution attempt.
        let mut events = match self.adapter.events().await {
            Ok(events) => events,
            Err(e) => {
                if let Err(stop_err) = self.adapter.stop_scan().await {
                    warn!("Failed to stop resolution scan: {}", stop_err);
                }
                return Err(Error::Bluetooth(e));
            }
        };
        let deadline = tokio::time::Instant::now() + self.resolve_scan_window;
        let mut found = None;

        while found.is_none() {
            tokio::select! {
                Some(event) = events.next() => {
                    if let CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) =
                        event
                    {
                        found = self.matching_peripheral(&id, address).await;
                    }
                }
                _ = tokio::time::sleep_until(deadline) => break,
            }
        }

        if let Err(e) = self.adapter.stop_scan().await {
            warn!("Failed to stop resolution scan: {}", e);
        }

        found.ok_or_else(|| Error::DeviceNotFound {
            address: address.to_string(),
        })
    }

    /// Fetch a peripheral by id if its address matches the target.
    async fn matching_peripheral(
        &self,
        id: &btleplug::platform::PeripheralId,
        address: &str,
    ) -> Option<Peripheral> {
        let peripheral = self.adapter.peripheral(id).await.ok()?;
        let properties = peripheral.properties().await.ok()??;

        if properties.address.to_string().eq_ignore_ascii_case(address) {
            trace!("Scan hit for {}", address);
            Some(peripheral)
        } else {
            None
        }
    }

    /// Look for the address among the adapter's known peripherals.
    async fn known_peripheral(&self, address: &str) -> Result<Option<Peripheral>> {
        for peripheral in self.adapter.peripherals().await.map_err(Error::Bluetooth)? {
            let properties = match peripheral.properties().await {
                Ok(Some(p)) => p,
                _ => continue,
            };

            if properties.address.to_string().eq_ignore_ascii_case(address) {
                return Ok(Some(peripheral));
            }
        }

        Ok(None)
    }
}

#[async_trait]
impl BleTransport for BtleplugTransport {
    type Connection = BtleplugConnection;

    async fn connect(&self, address: &str) -> Result<BtleplugConnection> {
        let peripheral = self.resolve_peripheral(address).await?;

        if peripheral.is_connected().await.unwrap_or(false) {
            debug!("Peripheral {} already connected at BLE level", address);
            peripheral
                .discover_services()
                .await
                .map_err(Error::Bluetooth)?;

            return Ok(BtleplugConnection {
                peripheral,
                address: address.to_string(),
            });
        }

        let mut attempts = 0;

        while attempts < self.max_connect_attempts {
            attempts += 1;

            debug!(
                "Connection attempt {} of {}",
                attempts, self.max_connect_attempts
            );

            match peripheral.connect().await {
                Ok(_) => {
                    info!("Connected to {}", address);

                    peripheral
                        .discover_services()
                        .await
                        .map_err(Error::Bluetooth)?;

                    return Ok(BtleplugConnection {
                        peripheral,
                        address: address.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Connection attempt {} failed: {}", attempts, e);

                    if attempts < self.max_connect_attempts {
                        tokio::time::sleep(self.connect_retry_delay).await;
                    }
                }
            }
        }

        Err(Error::Transport {
            context: format!(
                "Failed to connect to {} after {} attempts",
                address, self.max_connect_attempts
            ),
        })
    }
}

/// A btleplug-backed connection to a single device.
pub struct BtleplugConnection {
    /// The connected peripheral.
    peripheral: Peripheral,
    /// The address the connection was opened against.
    address: String,
}

impl BtleplugConnection {
    /// Find a discovered characteristic by UUID.
    fn find_characteristic(&self, uuid: &Uuid) -> Result<btleplug::api::Characteristic> {
        self.peripheral
            .services()
            .into_iter()
            .flat_map(|service| service.characteristics)
            .find(|characteristic| characteristic.uuid == *uuid)
            .ok_or_else(|| Error::CharacteristicNotFound {
                uuid: uuid.to_string(),
            })
    }
}

#[async_trait]
impl DeviceConnection for BtleplugConnection {
    fn address(&self) -> String {
        self.address.clone()
    }

    async fn pair(&self, level: ProtectionLevel) -> Result<()> {
        // btleplug has no explicit pairing call; the platform stack
        // initiates pairing on demand when a protected characteristic
        // is accessed.
        debug!(
            "Pairing at level {:?} delegated to the platform stack",
            level
        );
        Ok(())
    }

    async fn read_characteristic(&self, uuid: &Uuid) -> Result<Vec<u8>> {
        let characteristic = self.find_characteristic(uuid)?;

        let data = self
            .peripheral
            .read(&characteristic)
            .await
            .map_err(Error::Bluetooth)?;

        trace!("Read {} bytes from characteristic {}", data.len(), uuid);

        Ok(data)
    }

    async fn write_characteristic(
        &self,
        uuid: &Uuid,
        data: &[u8],
        with_response: bool,
    ) -> Result<()> {
        let characteristic = self.find_characteristic(uuid)?;

        let write_type = if with_response {
            WriteType::WithResponse
        } else {
            WriteType::WithoutResponse
        };

        self.peripheral
            .write(&characteristic, data, write_type)
            .await
            .map_err(Error::Bluetooth)?;

        trace!("Wrote {} bytes to characteristic {}", data.len(), uuid);

        Ok(())
    }

    async fn list_services(&self) -> Result<Vec<GattService>> {
        let services = self
            .peripheral
            .services()
            .into_iter()
            .map(|service| GattService {
                uuid: service.uuid,
                characteristics: service
                    .characteristics
                    .into_iter()
                    .map(|characteristic| characteristic.uuid)
                    .collect(),
            })
            .collect();

        Ok(services)
    }

    async fn disconnect(&self) -> Result<()> {
        match self.peripheral.disconnect().await {
            Ok(_) => {
                info!("Disconnected from {}", self.address);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to disconnect from {}: {}", self.address, e);
                Err(Error::Bluetooth(e))
            }
        }
    }
}
