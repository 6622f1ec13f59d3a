//! Chain link hashes for the access log.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const HASH_LEN: usize = 32;

/// BLAKE3 digest of a log record, stored in its successor's `PreviousHash`.
///
/// Serialized as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; HASH_LEN]);

impl ContentHash {
    /// Link carried by the first record of a chain.
    pub const GENESIS: Self = Self([0; HASH_LEN]);

    /// Keyed derivation of `data` under `domain`.
    #[must_use]
    pub fn hash_with_domain(domain: &str, data: &[u8]) -> Self {
        Self(blake3::derive_key(domain, data))
    }

    /// Whether this is the genesis link.
    #[must_use]
    pub fn is_genesis(&self) -> bool {
        *self == Self::GENESIS
    }

    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }
}

impl TryFrom<&[u8]> for ContentHash {
    type Error = hex::FromHexError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        <[u8; HASH_LEN]>::try_from(bytes)
            .map(Self)
            .map_err(|_| hex::FromHexError::InvalidStringLength)
    }
}

impl FromStr for ContentHash {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut out = [0; HASH_LEN];
        hex::decode_to_slice(s, &mut out)?;
        Ok(Self(out))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 8 bytes are enough to tell links apart in logs.
        let prefix = self.0.get(..8).unwrap_or(&self.0);
        write!(f, "ContentHash({}..)", hex::encode(prefix))
    }
}

impl Serialize for ContentHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
