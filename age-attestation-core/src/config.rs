//! Issuance policy: minimum age and claim lifetime.

use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MIN_AGE: u32 = 18;
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const SHORT_EXPIRY_TTL: Duration = Duration::from_secs(60);
/// Wire timestamps carry microseconds, so shorter lifetimes collapse to zero.
pub const MIN_TTL: Duration = Duration::from_micros(1);

pub const ENV_MIN_AGE: &str = "AGE_ATTEST_MIN_AGE";
pub const ENV_TTL_SECS: &str = "AGE_ATTEST_TTL_SECS";
pub const ENV_SHORT_EXPIRY: &str = "AGE_ATTEST_SHORT_EXPIRY";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Claim lifetime must be greater than zero")]
    ZeroTtl,

    #[error("Claim lifetime {0:?} is shorter than one microsecond")]
    TtlTooShort(Duration),

    #[error("Invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Policy applied when issuing claims.
///
/// Passed explicitly to each issuer, so instances with different thresholds
/// can coexist in one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttestationPolicy {
    pub(crate) min_age: u32,
    pub(crate) ttl: Duration,
}

impl Default for AttestationPolicy {
    fn default() -> Self {
        Self {
            min_age: DEFAULT_MIN_AGE,
            ttl: DEFAULT_TTL,
        }
    }
}

impl AttestationPolicy {
    pub fn new(min_age: u32, ttl: Duration) -> Result<Self, PolicyError> {
        if ttl.is_zero() {
            return Err(PolicyError::ZeroTtl);
        }
        if ttl < MIN_TTL {
            return Err(PolicyError::TtlTooShort(ttl));
        }
        Ok(Self { min_age, ttl })
    }

    /// Default threshold with a one minute lifetime, for testing expiry by hand.
    pub fn short_expiry() -> Self {
        Self {
            min_age: DEFAULT_MIN_AGE,
            ttl: SHORT_EXPIRY_TTL,
        }
    }

    pub fn with_min_age(mut self, min_age: u32) -> Self {
        self.min_age = min_age;
        self
    }

    pub fn with_ttl(self, ttl: Duration) -> Result<Self, PolicyError> {
        Self::new(self.min_age, ttl)
    }

    pub fn min_age(&self) -> u32 {
        self.min_age
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// True only for the one minute testing lifetime, not any short TTL.
    pub fn is_short_expiry(&self) -> bool {
        self.ttl == SHORT_EXPIRY_TTL
    }

    /// Build a policy from `AGE_ATTEST_*` environment variables.
    pub fn from_env() -> Result<Self, PolicyError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a policy from an arbitrary variable lookup.
    ///
    /// An explicit TTL wins over the short-expiry switch.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PolicyError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut policy = if parse_flag(ENV_SHORT_EXPIRY, lookup(ENV_SHORT_EXPIRY))? {
            Self::short_expiry()
        } else {
            Self::default()
        };

        if let Some(value) = lookup(ENV_MIN_AGE) {
            let min_age = value.trim().parse().map_err(|_| PolicyError::InvalidEnv {
                var: ENV_MIN_AGE,
                value: value.clone(),
            })?;
            policy = policy.with_min_age(min_age);
        }

        if let Some(value) = lookup(ENV_TTL_SECS) {
            let secs: u64 = value.trim().parse().map_err(|_| PolicyError::InvalidEnv {
                var: ENV_TTL_SECS,
                value: value.clone(),
            })?;
            policy = policy.with_ttl(Duration::from_secs(secs))?;
        }

        tracing::debug!(
            min_age = policy.min_age,
            ttl_secs = policy.ttl.as_secs(),
            "loaded attestation policy"
        );
        Ok(policy)
    }
}

fn parse_flag(var: &'static str, value: Option<String>) -> Result<bool, PolicyError> {
    let Some(value) = value else {
        return Ok(false);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(PolicyError::InvalidEnv { var, value }),
    }
}
