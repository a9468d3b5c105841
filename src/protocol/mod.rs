//! iGrill wire protocol.
//!
//! Contains the challenge/response handshake that unlocks sensor
//! characteristic access on a freshly opened connection.

pub mod handshake;

pub use handshake::{authenticate, HandshakeStep, APP_CHALLENGE, CHALLENGE_LENGTH};
