//! Deterministic subscription identifiers.
//!
//! Subscriptions that are only known by a human-readable name still need a
//! stable partition key. The identifier is the first 16 bytes of the SHA-1
//! digest of the name, laid out as a GUID. The first three GUID groups are
//! stored little-endian, matching identifiers minted by the metering
//! platform's own tooling for the same names.

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;
use uuid::Uuid;

/// Opaque subscription identifier, also used as the Kafka partition key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Bytes used as the message key.
    pub fn as_key(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubscriptionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SubscriptionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Derive a stable subscription identifier from a name.
pub fn derive_id(name: &str) -> SubscriptionId {
    let digest = Sha1::digest(name.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    SubscriptionId(Uuid::from_bytes_le(bytes).to_string())
}
