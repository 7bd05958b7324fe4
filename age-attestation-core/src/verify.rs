//! Claim verification.
//!
//! Checks run in a fixed order and stop at the first failure:
//! expiry, then signature, then eligibility. The outcomes are ordinary
//! values, not errors.

use crate::claim::Claim;
use crate::crypto::SecretKey;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Why a claim was accepted or rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified,
    Expired,
    InvalidSignature,
    AgeRequirementNotMet,
    /// The claim could not be decoded; carries the decoder's detail.
    Malformed(String),
}

impl VerificationOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationOutcome::Verified)
    }

    /// Human-readable reason.
    pub fn message(&self) -> String {
        match self {
            VerificationOutcome::Verified => "Attestation verified successfully".to_string(),
            VerificationOutcome::Expired => "Attestation expired".to_string(),
            VerificationOutcome::InvalidSignature => "Invalid signature".to_string(),
            VerificationOutcome::AgeRequirementNotMet => "Age requirement not met".to_string(),
            VerificationOutcome::Malformed(detail) => format!("Verification failed: {detail}"),
        }
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Result of verifying one claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub valid: bool,
    pub outcome: VerificationOutcome,
}

impl Verification {
    fn from_outcome(outcome: VerificationOutcome) -> Self {
        Self {
            valid: outcome.is_verified(),
            outcome,
        }
    }

    pub fn message(&self) -> String {
        self.outcome.message()
    }
}

/// Verify `claim` against `key` as of `now`.
pub fn verify_claim(claim: &Claim, key: &SecretKey, now: DateTime<Utc>) -> Verification {
    let outcome = check(claim, key, now);
    tracing::debug!(alias = %claim.alias(), outcome = ?outcome, "verified age claim");
    Verification::from_outcome(outcome)
}

fn check(claim: &Claim, key: &SecretKey, now: DateTime<Utc>) -> VerificationOutcome {
    if claim.is_expired_at(now) {
        return VerificationOutcome::Expired;
    }

    let message = match claim.signing_input() {
        Ok(message) => message,
        Err(e) => return VerificationOutcome::Malformed(e.to_string()),
    };
    if !key.verify_tag(message.as_bytes(), claim.signature()) {
        return VerificationOutcome::InvalidSignature;
    }

    if !claim.eligible() {
        return VerificationOutcome::AgeRequirementNotMet;
    }

    VerificationOutcome::Verified
}

/// Verifies claims with a shared key.
///
/// Stateless apart from the key: the same claim always verifies the same way
/// for the same `now`. Previously seen claims are not tracked, so an unexpired
/// claim can be presented any number of times.
#[derive(Debug, Clone)]
pub struct Verifier {
    key: Arc<SecretKey>,
}

impl Verifier {
    pub fn new(key: Arc<SecretKey>) -> Self {
        Self { key }
    }

    pub fn verify(&self, claim: &Claim, now: DateTime<Utc>) -> Verification {
        verify_claim(claim, &self.key, now)
    }

    /// Verify against the wall clock.
    pub fn verify_now(&self, claim: &Claim) -> Verification {
        self.verify(claim, Utc::now())
    }

    /// Verify a decoded transport mapping. Decode failures become `Malformed`.
    pub fn verify_json(&self, value: &Value, now: DateTime<Utc>) -> Verification {
        match Claim::from_json(value) {
            Ok(claim) => self.verify(&claim, now),
            Err(e) => {
                tracing::warn!(error = %e, "rejecting malformed claim");
                Verification::from_outcome(VerificationOutcome::Malformed(e.0))
            }
        }
    }

    /// Verify a canonical CBOR payload. Decode failures become `Malformed`.
    pub fn verify_bytes(&self, bytes: &[u8], now: DateTime<Utc>) -> Verification {
        match Claim::from_bytes(bytes) {
            Ok(claim) => self.verify(&claim, now),
            Err(e) => {
                tracing::warn!(error = %e, "rejecting malformed claim payload");
                Verification::from_outcome(VerificationOutcome::Malformed(e.to_string()))
            }
        }
    }
}
