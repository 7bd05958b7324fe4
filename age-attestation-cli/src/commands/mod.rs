pub mod issue;
pub mod keygen;
pub mod policy;
pub mod verify;

use std::path::Path;
use std::time::Duration;

use age_attestation_core::{AttestationPolicy, SecretKey};
use anyhow::Context;
use clap::Args;

/// Policy overrides shared by `issue` and `policy`. Unset flags fall back to
/// the `AGE_ATTEST_*` environment variables, then to the defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct PolicyArgs {
    /// Minimum age in years.
    #[arg(long)]
    pub min_age: Option<u32>,

    /// Claim lifetime in seconds.
    #[arg(long)]
    pub ttl_secs: Option<u64>,

    /// Use the one minute test lifetime.
    #[arg(long)]
    pub short_expiry: bool,
}

impl PolicyArgs {
    pub fn resolve(&self) -> anyhow::Result<AttestationPolicy> {
        let mut policy = AttestationPolicy::from_env().context("invalid policy environment")?;
        if self.short_expiry {
            policy = AttestationPolicy::short_expiry().with_min_age(policy.min_age());
        }
        if let Some(min_age) = self.min_age {
            policy = policy.with_min_age(min_age);
        }
        if let Some(secs) = self.ttl_secs {
            policy = policy.with_ttl(Duration::from_secs(secs))?;
        }
        Ok(policy)
    }
}

/// Read a hex key file written by `keygen`.
pub fn load_key(path: &Path) -> anyhow::Result<SecretKey> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read key file {}", path.display()))?;
    let key = SecretKey::from_hex(&text)
        .with_context(|| format!("invalid key file {}", path.display()))?;
    tracing::debug!(fingerprint = %key.fingerprint(), "loaded key");
    Ok(key)
}

/// Treat `input` as a file path if one exists, otherwise as inline content.
pub fn read_inline_or_file(input: &str) -> anyhow::Result<String> {
    let path = Path::new(input);
    if path.is_file() {
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
    } else {
        Ok(input.to_string())
    }
}
