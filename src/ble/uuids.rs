//! BLE characteristic UUIDs and address constants.
//!
//! Contains all fixed identifiers used for iGrill communication.

use uuid::Uuid;

// Authentication Service (iDevices Custom)
/// App Challenge characteristic UUID (write 16-byte challenge).
pub const APP_CHALLENGE_UUID: Uuid = Uuid::from_u128(0x64ac0002_4a4b_4b58_9f37_94d3c52ffdf7);
/// Device Challenge characteristic UUID (read the device's encrypted response).
pub const DEVICE_CHALLENGE_UUID: Uuid = Uuid::from_u128(0x64ac0003_4a4b_4b58_9f37_94d3c52ffdf7);
/// Device Response characteristic UUID (echo the device challenge back).
pub const DEVICE_RESPONSE_UUID: Uuid = Uuid::from_u128(0x64ac0004_4a4b_4b58_9f37_94d3c52ffdf7);

// Battery Service (Standard BLE)
/// Standard BLE Battery Level characteristic UUID.
pub const BATTERY_LEVEL_UUID: Uuid = Uuid::from_u128(0x0000_2a19_0000_1000_8000_00805f9b34fb);

/// First three octets of Weber Stephen Products BLE addresses.
///
/// Scan results are filtered against this prefix; devices report their
/// address in mixed case so the comparison is done on parsed octets.
pub const WEBER_ADDRESS_PREFIX: [u8; 3] = [0x70, 0x91, 0x8F];

/// Check whether a colon-separated BLE address starts with the given
/// three-octet prefix.
///
/// Malformed or truncated addresses simply do not match.
pub fn address_has_prefix(address: &str, prefix: &[u8; 3]) -> bool {
    let mut octets = address.split(':');

    for expected in prefix {
        let matched = octets
            .next()
            .and_then(|octet| u8::from_str_radix(octet, 16).ok())
            .map(|octet| octet == *expected)
            .unwrap_or(false);

        if !matched {
            return false;
        }
    }

    true
}

/// Check whether a BLE address belongs to a Weber device.
pub fn is_weber_address(address: &str) -> bool {
    address_has_prefix(address, &WEBER_ADDRESS_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_format() {
        // Verify UUIDs are properly formatted
        let app_challenge = APP_CHALLENGE_UUID.to_string();
        assert!(app_challenge.contains("64ac0002"));

        let battery = BATTERY_LEVEL_UUID.to_string();
        assert!(battery.contains("2a19"));
    }

    #[test]
    fn test_challenge_uuids_share_base() {
        let app = APP_CHALLENGE_UUID.to_string();
        let challenge = DEVICE_CHALLENGE_UUID.to_string();
        let response = DEVICE_RESPONSE_UUID.to_string();

        assert!(app.ends_with("94d3c52ffdf7"));
        assert!(challenge.ends_with("94d3c52ffdf7"));
        assert!(response.ends_with("94d3c52ffdf7"));
    }

    #[test]
    fn test_mixed_case_uuid_parses_equal() {
        // Devices report UUIDs in mixed case; parsing normalizes them.
        let parsed = Uuid::parse_str("64AC0002-4A4B-4B58-9F37-94D3C52FFDF7").unwrap();
        assert_eq!(parsed, APP_CHALLENGE_UUID);
    }

    #[test]
    fn test_is_weber_address() {
        assert!(is_weber_address("70:91:8F:DA:71:13"));
        assert!(is_weber_address("70:91:8f:da:71:13"));
        assert!(!is_weber_address("AA:BB:CC:11:22:33"));
    }

    #[test]
    fn test_address_has_prefix() {
        let prefix = [0x00, 0x1A, 0x7D];
        assert!(address_has_prefix("00:1A:7D:DA:71:13", &prefix));
        assert!(address_has_prefix("00:1a:7d:da:71:13", &prefix));
        assert!(!address_has_prefix("AA:BB:CC:11:22:33", &prefix));
    }

    #[test]
    fn test_malformed_addresses_do_not_match() {
        assert!(!is_weber_address(""));
        assert!(!is_weber_address("70:91"));
        assert!(!is_weber_address("not:an:address"));
        assert!(!is_weber_address("70-91-8F-DA-71-13"));
    }
}
