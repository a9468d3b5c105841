//! Challenge/response authentication handshake.
//!
//! The iGrill uses the iDevices pairing scheme: the app writes a fixed
//! challenge, reads the device's encrypted challenge, and writes that
//! value back verbatim. No secret key is involved; the device only
//! verifies that its challenge is echoed. This is a weak legacy scheme
//! and is kept bit-compatible rather than hardened, since changing it
//! would break device compatibility.
//!
//! The exchange is linear with no branching on response content:
//!
//! Idle -> Pairing -> ChallengeSent -> ResponseExchanged
//!
//! Pairing is best-effort (many devices work without it); a failure at
//! any challenge/response step is fatal and aborts the session.

use tracing::{debug, warn};

use crate::ble::transport::{DeviceConnection, ProtectionLevel};
use crate::ble::uuids::{APP_CHALLENGE_UUID, DEVICE_CHALLENGE_UUID, DEVICE_RESPONSE_UUID};
use crate::error::{Error, Result};

/// Length in bytes of the challenge exchanged during the handshake.
pub const CHALLENGE_LENGTH: usize = 16;

/// The fixed all-zero challenge written to the app-challenge
/// characteristic.
pub const APP_CHALLENGE: [u8; CHALLENGE_LENGTH] = [0; CHALLENGE_LENGTH];

/// The fallible exchanges of the handshake, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeStep {
    /// Writing the fixed app challenge.
    AppChallenge,
    /// Reading the device's encrypted challenge.
    DeviceChallenge,
    /// Writing the device challenge back as the response.
    DeviceResponse,
}

impl std::fmt::Display for HandshakeStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AppChallenge => write!(f, "app challenge"),
            Self::DeviceChallenge => write!(f, "device challenge"),
            Self::DeviceResponse => write!(f, "device response"),
        }
    }
}

/// Wrap a transport failure as a fatal authentication error.
fn auth_error(step: HandshakeStep, source: Error) -> Error {
    Error::Authentication {
        step,
        source: Box::new(source),
    }
}

/// Perform the iGrill challenge/response handshake on a connection.
///
/// On success the connection is authorized for sensor characteristic
/// reads. There are no retries; a single failed read or write aborts
/// with [`Error::Authentication`].
pub async fn authenticate<C: DeviceConnection + ?Sized>(connection: &C) -> Result<()> {
    debug!("Pairing with {}", connection.address());

    // Best-effort: log and continue, many devices authenticate fine
    // without an explicitly paired link.
    if let Err(e) = connection.pair(ProtectionLevel::Encrypted).await {
        warn!("Pairing failed, continuing without: {}", e);
    }

    debug!("Authenticating, sending all-zero app challenge");

    connection
        .write_characteristic(&APP_CHALLENGE_UUID, &APP_CHALLENGE, true)
        .await
        .map_err(|e| auth_error(HandshakeStep::AppChallenge, e))?;

    let device_challenge = connection
        .read_characteristic(&DEVICE_CHALLENGE_UUID)
        .await
        .map_err(|e| auth_error(HandshakeStep::DeviceChallenge, e))?;

    // The device accepts its own challenge echoed back verbatim.
    connection
        .write_characteristic(&DEVICE_RESPONSE_UUID, &device_challenge, true)
        .await
        .map_err(|e| auth_error(HandshakeStep::DeviceResponse, e))?;

    debug!("Authenticated with {}", connection.address());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::transport::MockDeviceConnection;
    use mockall::predicate::*;
    use mockall::Sequence;

    fn quiet_connection() -> MockDeviceConnection {
        let mut connection = MockDeviceConnection::new();
        connection
            .expect_address()
            .return_const("70:91:8F:0A:0B:0C".to_string());
        connection
    }

    #[tokio::test]
    async fn test_app_challenge_written_before_device_challenge_read() {
        let mut connection = quiet_connection();
        let mut seq = Sequence::new();

        connection
            .expect_pair()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        connection
            .expect_write_characteristic()
            .withf(|uuid, data, with_response| {
                *uuid == APP_CHALLENGE_UUID && data == APP_CHALLENGE && *with_response
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        connection
            .expect_read_characteristic()
            .with(eq(DEVICE_CHALLENGE_UUID))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![0xAB; CHALLENGE_LENGTH]));
        connection
            .expect_write_characteristic()
            .withf(|uuid, data, with_response| {
                *uuid == DEVICE_RESPONSE_UUID
                    && data == [0xAB; CHALLENGE_LENGTH]
                    && *with_response
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));

        authenticate(&connection).await.unwrap();
    }

    #[tokio::test]
    async fn test_pairing_failure_is_not_fatal() {
        let mut connection = quiet_connection();

        connection.expect_pair().returning(|_| {
            Err(Error::Transport {
                context: "pairing rejected".to_string(),
            })
        });
        connection
            .expect_write_characteristic()
            .returning(|_, _, _| Ok(()));
        connection
            .expect_read_characteristic()
            .returning(|_| Ok(vec![0x01; CHALLENGE_LENGTH]));

        authenticate(&connection).await.unwrap();
    }

    #[tokio::test]
    async fn test_app_challenge_write_failure_is_fatal() {
        let mut connection = quiet_connection();

        connection.expect_pair().returning(|_| Ok(()));
        connection
            .expect_write_characteristic()
            .with(eq(APP_CHALLENGE_UUID), always(), always())
            .returning(|_, _, _| {
                Err(Error::Transport {
                    context: "write rejected".to_string(),
                })
            });
        // The device challenge must never be read after a failed write.
        connection.expect_read_characteristic().times(0);

        let err = authenticate(&connection).await.unwrap_err();
        assert!(err.is_authentication());
        match err {
            Error::Authentication { step, .. } => {
                assert_eq!(step, HandshakeStep::AppChallenge);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_device_challenge_read_failure_is_fatal() {
        let mut connection = quiet_connection();

        connection.expect_pair().returning(|_| Ok(()));
        connection
            .expect_write_characteristic()
            .with(eq(APP_CHALLENGE_UUID), always(), always())
            .returning(|_, _, _| Ok(()));
        connection
            .expect_read_characteristic()
            .with(eq(DEVICE_CHALLENGE_UUID))
            .returning(|_| {
                Err(Error::Transport {
                    context: "read failed".to_string(),
                })
            });

        let err = authenticate(&connection).await.unwrap_err();
        match err {
            Error::Authentication { step, .. } => {
                assert_eq!(step, HandshakeStep::DeviceChallenge);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_device_challenge_echoed_verbatim() {
        let mut connection = quiet_connection();
        let challenge: Vec<u8> = (0..CHALLENGE_LENGTH as u8).collect();
        let expected = challenge.clone();

        connection.expect_pair().returning(|_| Ok(()));
        connection
            .expect_write_characteristic()
            .with(eq(APP_CHALLENGE_UUID), always(), always())
            .returning(|_, _, _| Ok(()));
        connection
            .expect_read_characteristic()
            .returning(move |_| Ok(challenge.clone()));
        connection
            .expect_write_characteristic()
            .withf(move |uuid, data, with_response| {
                *uuid == DEVICE_RESPONSE_UUID && data == expected && *with_response
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        authenticate(&connection).await.unwrap();
    }

    #[test]
    fn test_handshake_step_display() {
        assert_eq!(format!("{}", HandshakeStep::AppChallenge), "app challenge");
        assert_eq!(
            format!("{}", HandshakeStep::DeviceResponse),
            "device response"
        );
    }

    #[test]
    fn test_app_challenge_is_all_zero() {
        assert_eq!(APP_CHALLENGE.len(), 16);
        assert!(APP_CHALLENGE.iter().all(|b| *b == 0));
    }
}
