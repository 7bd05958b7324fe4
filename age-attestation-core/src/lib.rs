//! # Age Attestation Core
//!
//! Issues and verifies short-lived, tamper-evident age claims: a signed
//! statement that a subject met a minimum age when the claim was issued.
//!
//! ## Key Features
//! - **Canonical JSON signing input**: sorted keys, compact, float-free
//! - **HMAC-SHA256 tags**: shared symmetric key, constant-time comparison
//! - **Expiry**: every claim carries `expires_at = issued_at + ttl`
//! - **Ordered verification**: expiry, then signature, then eligibility
//!
//! Claims are plaintext. The tag protects them against forgery and
//! tampering only; there is no replay protection and no revocation.

pub mod claim;
pub mod config;
pub mod crypto;
pub mod issuer;
pub mod serialization;
pub mod types;
pub mod verify;

pub use claim::{compute_age, parse_birth_date, Claim, ClaimBuilder, IssueError, MalformedClaim};
pub use config::{AttestationPolicy, PolicyError};
pub use crypto::{KeyError, SecretKey, SECRET_KEY_LEN};
pub use issuer::Issuer;
pub use serialization::{CanonicalBytes, SerializationError};
pub use types::*;
pub use verify::{verify_claim, Verification, VerificationOutcome, Verifier};
