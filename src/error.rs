//! Error types for the igrill-rust-ble crate.

use thiserror::Error;

use crate::protocol::handshake::HandshakeStep;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Bluetooth-related error from the underlying BLE library.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Bluetooth is not available or is disabled on this system.
    #[error("Bluetooth not available or disabled")]
    BluetoothUnavailable,

    /// A transport-level failure not tied to the btleplug backend.
    ///
    /// Alternative transport implementations report connection, read and
    /// write failures through this variant.
    #[error("Transport error: {context}")]
    Transport {
        /// Description of what failed at the transport layer.
        context: String,
    },

    /// No device with the requested address could be resolved.
    #[error("Device not found: {address}")]
    DeviceNotFound {
        /// The BLE address that was searched for.
        address: String,
    },

    /// Characteristic not found on the device.
    #[error("Characteristic not found: {uuid}")]
    CharacteristicNotFound {
        /// The UUID of the characteristic that was not found.
        uuid: String,
    },

    /// The challenge/response handshake failed.
    ///
    /// Always fatal to the session; no partial snapshot is returned.
    #[error("Authentication failed at {step} step")]
    Authentication {
        /// The handshake exchange that failed.
        step: HandshakeStep,
        /// The underlying transport failure.
        #[source]
        source: Box<Error>,
    },

    /// A BLE scan could not be started.
    #[error("Discovery failed: {reason}")]
    Discovery {
        /// Description of why the scan could not start.
        reason: String,
    },
}

impl Error {
    /// Whether this error came from the authentication handshake.
    ///
    /// Authentication failures are always fatal to a session, so callers
    /// may want to surface them differently from transient link errors.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Whether this error is a transport-layer failure (connection,
    /// read or write at the BLE level).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Bluetooth(_)
                | Self::Transport { .. }
                | Self::DeviceNotFound { .. }
                | Self::CharacteristicNotFound { .. }
        )
    }
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
