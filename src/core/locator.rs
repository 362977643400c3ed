//! Match Locator
//!
//! A 256-bit random token that addresses one match among the many a single
//! contract deployment hosts. It doubles as the invite token for private
//! matches, so it must be unguessable.

use std::fmt;
use std::str::FromStr;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Locator length in bytes.
pub const LOCATOR_LEN: usize = 32;

/// Query parameter carrying the locator in a join link.
pub const JOIN_PARAM: &str = "game";

/// Random match locator.
///
/// Serialized as lowercase hex for transport and storage.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Locator(pub [u8; LOCATOR_LEN]);

impl Locator {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; LOCATOR_LEN]) -> Self {
        Self(bytes)
    }

    /// Generate a fresh locator from the OS entropy source.
    pub fn generate() -> Self {
        let mut bytes = [0u8; LOCATOR_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Hex encoding used on the wire.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short prefix for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; LOCATOR_LEN] {
        &self.0
    }
}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Locator({}..)", self.short())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Locator parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocatorError {
    /// Not valid hex.
    #[error("locator is not valid hex")]
    InvalidHex,
    /// Wrong number of bytes.
    #[error("locator must be {LOCATOR_LEN} bytes, got {0}")]
    InvalidLength(usize),
}

impl FromStr for Locator {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim()).map_err(|_| LocatorError::InvalidHex)?;
        let arr: [u8; LOCATOR_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| LocatorError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }
}

impl Serialize for Locator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Locator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Build a shareable join link: `origin?game=<hex>`.
pub fn join_url(origin: &str, locator: &Locator) -> String {
    format!("{}?{}={}", origin.trim_end_matches('?'), JOIN_PARAM, locator.to_hex())
}

/// Extract the locator from a join link.
///
/// Returns `None` when the parameter is missing or malformed; an unknown or
/// already consumed locator is the contract's business, not a parse error.
pub fn parse_join_url(url: &str) -> Option<Locator> {
    let query = url.split_once('?')?.1;
    let query = query.split('#').next().unwrap_or_default();
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == JOIN_PARAM)
        .and_then(|(_, value)| value.parse().ok())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_random() {
        let a = Locator::generate();
        let b = Locator::generate();
        assert_ne!(a, b);
        assert_eq!(a.to_hex().len(), 64);
    }

    #[test]
    fn test_parse_hex() {
        let locator = Locator::new([0xab; 32]);
        let parsed: Locator = locator.to_hex().parse().unwrap();
        assert_eq!(parsed, locator);

        assert_eq!("zz".parse::<Locator>(), Err(LocatorError::InvalidHex));
        assert_eq!("abcd".parse::<Locator>(), Err(LocatorError::InvalidLength(2)));
    }

    #[test]
    fn test_serde_as_hex_string() {
        let locator = Locator::new([1; 32]);
        let json = serde_json::to_string(&locator).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(32)));

        let bad: Result<Locator, _> = serde_json::from_str("\"0102\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_join_url() {
        let locator = Locator::new([7; 32]);
        let url = join_url("https://rps.example", &locator);
        assert_eq!(url, format!("https://rps.example?game={}", "07".repeat(32)));
        assert_eq!(parse_join_url(&url), Some(locator));
    }

    #[test]
    fn test_parse_join_url_with_other_params() {
        let locator = Locator::new([9; 32]);
        let url = format!("https://rps.example/?ref=x&game={}#top", locator.to_hex());
        assert_eq!(parse_join_url(&url), Some(locator));
    }

    #[test]
    fn test_parse_join_url_rejects_garbage() {
        assert_eq!(parse_join_url("https://rps.example"), None);
        assert_eq!(parse_join_url("https://rps.example?game="), None);
        assert_eq!(parse_join_url("https://rps.example?game=nothex"), None);
        assert_eq!(parse_join_url("https://rps.example?other=01"), None);
    }
}
