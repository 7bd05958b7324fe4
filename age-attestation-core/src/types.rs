//! Core types used across the attestation system.

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// HMAC-SHA256 authentication tag (32 bytes), hex encoded on the wire.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Tag(pub [u8; 32]);

impl Tag {
    /// Lowercase hex rendering, as carried in the `signature` field.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a hex-encoded tag.
    pub fn from_hex(s: &str) -> Result<Self, String> {
        let bytes = hex::decode(s).map_err(|e| format!("signature is not valid hex: {e}"))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| format!("signature must be 32 bytes, got {}", v.len()))?;
        Ok(Tag(bytes))
    }
}

impl From<[u8; 32]> for Tag {
    fn from(bytes: [u8; 32]) -> Self {
        Tag(bytes)
    }
}

impl AsRef<[u8]> for Tag {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self.to_hex())
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Tag::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Caller-supplied subject identifier. Opaque to this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub String);

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Five-digit display label attached to each claim.
///
/// Roughly 16.5 bits of entropy and no uniqueness guarantee: a correlation
/// handle for humans, never a credential.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Alias(pub String);

impl Alias {
    pub const MIN: u32 = 10_000;
    pub const MAX: u32 = 99_999;

    /// Draw a fresh alias from `rng`.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Alias(rng.gen_range(Self::MIN..=Self::MAX).to_string())
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Render a timestamp in the wire format: RFC 3339, UTC, microseconds, `Z`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a wire timestamp. Any RFC 3339 offset is accepted and normalized to UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

// Serde support for wire timestamps
pub(crate) mod wire_timestamp {
    use super::{format_timestamp, parse_timestamp};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_timestamp(&s)
            .map_err(|e| serde::de::Error::custom(format!("invalid timestamp {s:?}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_alias_is_five_digits() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let alias = Alias::generate(&mut rng);
            assert_eq!(alias.0.len(), 5);
            let n: u32 = alias.0.parse().unwrap();
            assert!((Alias::MIN..=Alias::MAX).contains(&n));
        }
    }

    #[test]
    fn test_tag_hex() {
        let tag = Tag([0xab; 32]);
        let hex = tag.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(Tag::from_hex(&hex).unwrap(), tag);
        assert!(Tag::from_hex("abcd").is_err());
        assert!(Tag::from_hex("zz").is_err());
    }

    #[test]
    fn test_timestamp_format() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 16, 9, 30, 0).unwrap();
        assert_eq!(format_timestamp(&ts), "2024-05-16T09:30:00.000000Z");
        assert_eq!(parse_timestamp("2024-05-16T09:30:00.000000Z").unwrap(), ts);
        assert_eq!(parse_timestamp("2024-05-16T11:30:00+02:00").unwrap(), ts);
        assert!(parse_timestamp("2024-05-16 09:30").is_err());
    }

    #[test]
    fn test_subject_id_display() {
        let id = SubjectId("user001".to_string());
        assert_eq!(id.to_string(), "user001");
    }
}
