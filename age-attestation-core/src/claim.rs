//! Signed age claims and the builder that produces them.
//!
//! A claim asserts that a subject met a minimum age at issuance time. It is
//! authenticated with an HMAC over the canonical JSON encoding of every field
//! except the signature itself, and it is never encrypted.

use crate::config::AttestationPolicy;
use crate::crypto::SecretKey;
use crate::serialization::{from_canonical_cbor, to_canonical_cbor, CanonicalBytes, SerializationError};
use crate::types::{wire_timestamp, Alias, SubjectId, Tag};
use chrono::{DateTime, Datelike, NaiveDate, SubsecRound, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire format of birth dates.
pub const BIRTH_DATE_FORMAT: &str = "%Y-%m-%d";

/// A signed age claim.
///
/// Fields are read-only; any change after signing invalidates `signature`.
/// Serializes with the transport keys `alias`, `user_id`, `age_verified`,
/// `min_age`, `timestamp`, `expires_at` and `signature`. Unknown keys are
/// ignored when decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Random display label
    alias: Alias,

    /// Caller-supplied subject identifier
    #[serde(rename = "user_id")]
    subject_id: SubjectId,

    /// Whether the computed age met `min_age_threshold`
    #[serde(rename = "age_verified")]
    eligible: bool,

    /// Threshold in force when the claim was issued
    #[serde(rename = "min_age")]
    min_age_threshold: u32,

    #[serde(rename = "timestamp", with = "wire_timestamp")]
    issued_at: DateTime<Utc>,

    #[serde(with = "wire_timestamp")]
    expires_at: DateTime<Utc>,

    /// HMAC-SHA256 over the canonical encoding of all fields above
    signature: Tag,
}

impl Claim {
    pub fn alias(&self) -> &Alias {
        &self.alias
    }

    pub fn subject_id(&self) -> &SubjectId {
        &self.subject_id
    }

    pub fn eligible(&self) -> bool {
        self.eligible
    }

    pub fn min_age_threshold(&self) -> u32 {
        self.min_age_threshold
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn signature(&self) -> &Tag {
        &self.signature
    }

    /// A claim is expired strictly after `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Canonical encoding of every field except the signature.
    pub fn signing_input(&self) -> Result<CanonicalBytes, SerializationError> {
        self.unsigned().canonical_bytes()
    }

    fn unsigned(&self) -> UnsignedClaim<'_> {
        UnsignedClaim {
            age_verified: self.eligible,
            alias: &self.alias,
            expires_at: self.expires_at,
            min_age: self.min_age_threshold,
            timestamp: self.issued_at,
            user_id: &self.subject_id,
        }
    }

    /// Transport mapping of the claim.
    pub fn to_json(&self) -> Result<Value, SerializationError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Decode the transport mapping. Missing keys and wrong types are malformed.
    pub fn from_json(value: &Value) -> Result<Self, MalformedClaim> {
        if !value.is_object() {
            return Err(MalformedClaim("claim must be a JSON object".to_string()));
        }
        Claim::deserialize(value).map_err(|e| MalformedClaim(e.to_string()))
    }

    pub fn from_json_str(s: &str) -> Result<Self, MalformedClaim> {
        let value: Value = serde_json::from_str(s).map_err(|e| MalformedClaim(e.to_string()))?;
        Self::from_json(&value)
    }

    /// Serialize to canonical CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SerializationError> {
        to_canonical_cbor(self)
    }

    /// Deserialize from canonical CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SerializationError> {
        from_canonical_cbor(bytes)
    }
}

/// Signing view of a claim.
///
/// Field names are the transport keys, declared in their canonical
/// (bytewise lexicographic) order.
#[derive(Debug, Serialize)]
struct UnsignedClaim<'a> {
    age_verified: bool,
    alias: &'a Alias,
    #[serde(serialize_with = "wire_timestamp::serialize")]
    expires_at: DateTime<Utc>,
    min_age: u32,
    #[serde(serialize_with = "wire_timestamp::serialize")]
    timestamp: DateTime<Utc>,
    user_id: &'a SubjectId,
}

impl UnsignedClaim<'_> {
    fn canonical_bytes(&self) -> Result<CanonicalBytes, SerializationError> {
        CanonicalBytes::new(self)
    }
}

/// Whole years elapsed between `birth_date` and `today`.
///
/// The current year only counts once the (month, day) of birth has been
/// reached, so a 29 February birthday counts from 1 March in common years.
pub fn compute_age(birth_date: NaiveDate, today: NaiveDate) -> i64 {
    let mut age = today.year() as i64 - birth_date.year() as i64;
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

/// Parse a `YYYY-MM-DD` birth date.
pub fn parse_birth_date(s: &str) -> Result<NaiveDate, IssueError> {
    NaiveDate::parse_from_str(s.trim(), BIRTH_DATE_FORMAT)
        .map_err(|e| IssueError::InvalidInput(format!("birth date {s:?} is not YYYY-MM-DD: {e}")))
}

/// Builder for constructing signed claims.
#[derive(Debug, Default)]
pub struct ClaimBuilder {
    subject_id: Option<SubjectId>,
    birth_date: Option<NaiveDate>,
    issued_at: Option<DateTime<Utc>>,
}

impl ClaimBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject_id(mut self, id: impl Into<String>) -> Self {
        self.subject_id = Some(SubjectId(id.into()));
        self
    }

    pub fn birth_date(mut self, date: NaiveDate) -> Self {
        self.birth_date = Some(date);
        self
    }

    /// Issuance time; defaults to now. Truncated to microseconds.
    pub fn issued_at(mut self, ts: DateTime<Utc>) -> Self {
        self.issued_at = Some(ts);
        self
    }

    /// Build and sign the claim, drawing the alias from the thread-local RNG.
    pub fn build_and_sign(
        self,
        policy: &AttestationPolicy,
        key: &SecretKey,
    ) -> Result<Claim, IssueError> {
        self.build_and_sign_with_rng(policy, key, &mut rand::thread_rng())
    }

    /// Build and sign the claim, drawing the alias from `rng`.
    pub fn build_and_sign_with_rng<R: Rng + ?Sized>(
        self,
        policy: &AttestationPolicy,
        key: &SecretKey,
        rng: &mut R,
    ) -> Result<Claim, IssueError> {
        let subject_id = self.subject_id.ok_or(IssueError::MissingField("subject_id"))?;
        if subject_id.0.trim().is_empty() {
            return Err(IssueError::InvalidInput("subject id must not be empty".to_string()));
        }
        let birth_date = self.birth_date.ok_or(IssueError::MissingField("birth_date"))?;

        let issued_at = self.issued_at.unwrap_or_else(Utc::now).trunc_subsecs(6);
        let ttl = chrono::Duration::from_std(policy.ttl())
            .map_err(|_| IssueError::InvalidInput("ttl out of range".to_string()))?;
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .ok_or_else(|| IssueError::InvalidInput("expiry overflows timestamp range".to_string()))?
            .trunc_subsecs(6);
        if expires_at <= issued_at {
            return Err(IssueError::InvalidInput(
                "ttl must be at least one microsecond".to_string(),
            ));
        }

        let age = compute_age(birth_date, issued_at.date_naive());
        let min_age_threshold = policy.min_age();
        let eligible = age >= i64::from(min_age_threshold);
        let alias = Alias::generate(rng);

        let unsigned = UnsignedClaim {
            age_verified: eligible,
            alias: &alias,
            expires_at,
            min_age: min_age_threshold,
            timestamp: issued_at,
            user_id: &subject_id,
        };
        let message = unsigned.canonical_bytes()?;
        let signature = key.sign(message.as_bytes());

        tracing::debug!(
            alias = %alias,
            eligible,
            min_age = min_age_threshold,
            expires_at = %expires_at,
            "issued age claim"
        );

        Ok(Claim {
            alias,
            subject_id,
            eligible,
            min_age_threshold,
            issued_at,
            expires_at,
            signature,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Encoding failed: {0}")]
    Encoding(#[from] SerializationError),
}

/// A claim that could not be decoded for verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed claim: {0}")]
pub struct MalformedClaim(pub String);
