//! Device polling sessions.
//!
//! A session is one independent connect -> authenticate -> read ->
//! disconnect cycle producing a [`DeviceSnapshot`]. Sessions hold no
//! state across polls; retry cadence on failed polls is the caller's
//! policy.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::ble::transport::{BleTransport, DeviceConnection};
use crate::data::sensors::{decode, SensorKind};
use crate::data::snapshot::DeviceSnapshot;
use crate::error::Result;
use crate::protocol::handshake::authenticate;

/// Runs polling sessions against iGrill devices over a transport.
///
/// The transport owns connect retry and backoff; the session is a
/// linear sequence of GATT operations with no internal parallelism,
/// since the handshake must complete before any sensor read and GATT
/// operations on one connection cannot be issued concurrently.
pub struct DeviceSession<T: BleTransport> {
    /// The transport used to open connections.
    transport: T,
}

impl<T: BleTransport> DeviceSession<T> {
    /// Create a session runner over a transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Poll the device at `address` once and return its snapshot.
    ///
    /// The connection is released on every exit path before the result
    /// is returned or the error re-raised; if the caller drops the
    /// future mid-session, the disconnect runs on a background task. A
    /// failed read of one sensor characteristic is logged and skipped,
    /// partial data is still useful for polling; connect and handshake
    /// failures are fatal and propagate with no partial snapshot.
    ///
    /// # Errors
    ///
    /// Propagates transport errors from the connect step and
    /// [`Error::Authentication`](crate::Error::Authentication) from the
    /// handshake.
    pub async fn update(&self, address: &str) -> Result<DeviceSnapshot> {
        debug!("Starting session against {}", address);

        let connection = Arc::new(self.transport.connect(address).await?);
        let mut guard = DisconnectGuard::new(connection.clone());

        let result = Self::run_connected(connection.as_ref()).await;

        guard.disarm();

        // Unconditional release; a disconnect failure must not mask the
        // session outcome.
        if let Err(e) = connection.disconnect().await {
            warn!("Disconnect after session failed: {}", e);
        }

        result
    }

    /// The authenticated portion of a session.
    async fn run_connected(connection: &T::Connection) -> Result<DeviceSnapshot> {
        authenticate(connection).await?;

        let mut snapshot = DeviceSnapshot::new();
        snapshot.address = connection.address();

        Self::read_sensors(connection, &mut snapshot).await?;

        info!(
            "Session against {} read {} sensor(s)",
            snapshot.address,
            snapshot.sensors.len()
        );

        Ok(snapshot)
    }

    /// Read every recognized sensor characteristic into the snapshot.
    ///
    /// Reads happen one at a time; one in-flight operation per
    /// connection.
    async fn read_sensors(
        connection: &T::Connection,
        snapshot: &mut DeviceSnapshot,
    ) -> Result<()> {
        for service in connection.list_services().await? {
            for characteristic in service.characteristics {
                let kind = match SensorKind::from_characteristic_uuid(&characteristic) {
                    Some(kind) => kind,
                    None => continue,
                };

                debug!("Reading {} characteristic {}", kind, characteristic);

                let raw = match connection.read_characteristic(&characteristic).await {
                    Ok(raw) => raw,
                    Err(e) => {
                        // Non-fatal: skip this sensor and keep going.
                        warn!("Reading {} failed, skipping: {}", kind, e);
                        continue;
                    }
                };

                match decode(&characteristic, &raw) {
                    Some((kind, value)) => {
                        snapshot.sensors.insert(kind, Some(value));
                    }
                    None => {
                        debug!("Undecodable {} payload {:02X?}, dropping", kind, raw);
                    }
                }
            }
        }

        Ok(())
    }
}

/// Releases the connection if the session future is dropped mid-flight.
///
/// The normal exit paths disarm the guard and disconnect inline; on
/// cancellation the disconnect is an async call a destructor cannot
/// await, so it is handed to the runtime instead.
struct DisconnectGuard<C: DeviceConnection + 'static> {
    connection: Option<Arc<C>>,
}

impl<C: DeviceConnection + 'static> DisconnectGuard<C> {
    fn new(connection: Arc<C>) -> Self {
        Self {
            connection: Some(connection),
        }
    }

    fn disarm(&mut self) {
        self.connection = None;
    }
}

impl<C: DeviceConnection + 'static> Drop for DisconnectGuard<C> {
    fn drop(&mut self) {
        let connection = match self.connection.take() {
            Some(connection) => connection,
            None => return,
        };

        warn!("Session cancelled mid-flight, releasing the connection");

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = connection.disconnect().await {
                    warn!("Disconnect after cancelled session failed: {}", e);
                }
            });
        }
    }
}
