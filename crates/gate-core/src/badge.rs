//! RFID badge identifiers and their normalized text form
//!
//! A badge UID is rendered as uppercase hex, two digits per byte, each byte
//! preceded by a single space (`" 77 B6 0E 17"`). Dropping the leading space
//! gives the normalized form that is compared, exactly, against the
//! authorized ID.

use core::fmt::Write;

use thiserror_no_std::Error;

/// Longest UID an ISO 14443A card can report (triple size).
pub const MAX_UID_LEN: usize = 10;

/// Capacity of the space-padded hex rendering: three characters per byte.
pub const HEX_CAPACITY: usize = MAX_UID_LEN * 3;

pub type UidText = heapless::String<HEX_CAPACITY>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeError {
    #[error("badge UID is empty")]
    Empty,
    #[error("badge UID has {len} bytes, at most 10 are supported")]
    TooLong { len: usize },
    #[error("badge UID contains a token that is not a hex byte")]
    InvalidHex,
}

/// Raw UID bytes as read from a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeUid {
    bytes: heapless::Vec<u8, MAX_UID_LEN>,
}

impl BadgeUid {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BadgeError> {
        if bytes.is_empty() {
            return Err(BadgeError::Empty);
        }
        let bytes = heapless::Vec::from_slice(bytes)
            .map_err(|_| BadgeError::TooLong { len: bytes.len() })?;
        Ok(Self { bytes })
    }

    /// Parse whitespace-separated hex bytes in either case, e.g. `"77 b6 0E 17"`.
    pub fn parse(text: &str) -> Result<Self, BadgeError> {
        let mut bytes = heapless::Vec::<u8, MAX_UID_LEN>::new();
        let mut count = 0;
        for token in text.split_ascii_whitespace() {
            count += 1;
            if token.len() > 2 {
                return Err(BadgeError::InvalidHex);
            }
            let byte = u8::from_str_radix(token, 16).map_err(|_| BadgeError::InvalidHex)?;
            // overflow is reported below with the full token count
            let _ = bytes.push(byte);
        }

        if count == 0 {
            Err(BadgeError::Empty)
        } else if count > MAX_UID_LEN {
            Err(BadgeError::TooLong { len: count })
        } else {
            Ok(Self { bytes })
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Space-prefixed uppercase rendering, `" 77 B6 0E 17"`.
    pub fn padded_hex(&self) -> UidText {
        let mut text = UidText::new();
        for byte in &self.bytes {
            // capacity covers MAX_UID_LEN bytes
            let _ = write!(text, " {byte:02X}");
        }
        text
    }

    /// The padded rendering without its leading space, `"77 B6 0E 17"`.
    pub fn normalized(&self) -> UidText {
        let padded = self.padded_hex();
        let mut text = UidText::new();
        let _ = text.write_str(padded.strip_prefix(' ').unwrap_or(&padded));
        text
    }

    /// Exact comparison of the normalized form against an authorized ID.
    pub fn matches(&self, authorized: &str) -> bool {
        self.normalized().as_str() == authorized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_badge_normalization() {
        let uid = BadgeUid::from_bytes(&[0x77, 0xB6, 0x0E, 0x17]).unwrap();

        assert_eq!(uid.padded_hex().as_str(), " 77 B6 0E 17");
        assert_eq!(uid.normalized().as_str(), "77 B6 0E 17");
        assert!(uid.matches("77 B6 0E 17"));
    }

    #[test]
    fn test_single_digit_bytes_are_zero_padded() {
        let uid = BadgeUid::from_bytes(&[0x00, 0x0A, 0xF0]).unwrap();
        assert_eq!(uid.normalized().as_str(), "00 0A F0");
    }

    #[test]
    fn test_normalization_is_idempotent_and_case_insensitive() {
        let lower = BadgeUid::parse("77 b6 0e 17").unwrap();
        let upper = BadgeUid::parse("77 B6 0E 17").unwrap();
        assert_eq!(lower, upper);

        let once = lower.normalized();
        let twice = BadgeUid::parse(&once).unwrap().normalized();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_matching_is_exact() {
        let uid = BadgeUid::from_bytes(&[0x77, 0xB6, 0x0E, 0x17]).unwrap();

        assert!(!uid.matches("77 b6 0e 17"));
        assert!(!uid.matches(" 77 B6 0E 17"));
        assert!(!uid.matches("77 B6 0E"));

        let other = BadgeUid::from_bytes(&[0x77, 0xB6, 0x0E, 0x18]).unwrap();
        assert!(!other.matches("77 B6 0E 17"));
    }

    #[test]
    fn test_seven_and_ten_byte_uids() {
        let seven = BadgeUid::from_bytes(&[0x04, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66]).unwrap();
        assert_eq!(seven.normalized().as_str(), "04 11 22 33 44 55 66");

        let ten = BadgeUid::from_bytes(&[0xFF; 10]).unwrap();
        assert_eq!(ten.padded_hex().len(), HEX_CAPACITY);
        assert_eq!(ten.normalized().len(), HEX_CAPACITY - 1);
    }

    #[test]
    fn test_invalid_uids_rejected() {
        assert_eq!(BadgeUid::from_bytes(&[]), Err(BadgeError::Empty));
        assert_eq!(
            BadgeUid::from_bytes(&[0; 11]),
            Err(BadgeError::TooLong { len: 11 })
        );
        assert_eq!(BadgeUid::parse("   "), Err(BadgeError::Empty));
        assert_eq!(BadgeUid::parse("77 ZZ"), Err(BadgeError::InvalidHex));
        assert_eq!(BadgeUid::parse("77B6"), Err(BadgeError::InvalidHex));
        assert_eq!(
            BadgeUid::parse("01 02 03 04 05 06 07 08 09 0A 0B"),
            Err(BadgeError::TooLong { len: 11 })
        );
    }
}
