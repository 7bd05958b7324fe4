//! `age-attest policy` — print the effective issuance policy.

use age_attestation_core::AttestationPolicy;
use clap::Args;
use serde::Serialize;

use super::PolicyArgs;

#[derive(Args, Debug)]
pub struct PolicyCmdArgs {
    #[command(flatten)]
    pub policy: PolicyArgs,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct PolicyReport {
    min_age: u32,
    ttl_secs: u64,
    short_expiry: bool,
}

impl From<&AttestationPolicy> for PolicyReport {
    fn from(policy: &AttestationPolicy) -> Self {
        Self {
            min_age: policy.min_age(),
            ttl_secs: policy.ttl().as_secs(),
            short_expiry: policy.is_short_expiry(),
        }
    }
}

pub fn run(args: &PolicyCmdArgs) -> anyhow::Result<u8> {
    let policy = args.policy.resolve()?;
    println!("{}", serde_json::to_string_pretty(&PolicyReport::from(&policy))?);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_report() {
        let report = PolicyReport::from(&AttestationPolicy::default());
        assert_eq!(
            report,
            PolicyReport {
                min_age: 18,
                ttl_secs: 86_400,
                short_expiry: false,
            }
        );

        let policy = AttestationPolicy::new(21, Duration::from_secs(60)).unwrap();
        let report = PolicyReport::from(&policy);
        assert!(report.short_expiry);
        assert_eq!(report.min_age, 21);
    }

    #[test]
    fn test_explicit_short_ttl_is_not_short_expiry() {
        let args = PolicyArgs {
            min_age: None,
            ttl_secs: Some(30),
            short_expiry: false,
        };
        let report = PolicyReport::from(&args.resolve().unwrap());
        assert_eq!(report.ttl_secs, 30);
        assert!(!report.short_expiry);
    }

    #[test]
    fn test_flags_override() {
        let args = PolicyArgs {
            min_age: Some(16),
            ttl_secs: None,
            short_expiry: true,
        };
        let policy = args.resolve().unwrap();
        assert_eq!(policy.min_age(), 16);
        assert_eq!(policy.ttl(), Duration::from_secs(60));

        let args = PolicyArgs {
            min_age: None,
            ttl_secs: Some(0),
            short_expiry: false,
        };
        assert!(args.resolve().is_err());
    }
}
