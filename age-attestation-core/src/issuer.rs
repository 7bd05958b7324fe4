//! Issuance entry point for transport layers.

use crate::claim::{parse_birth_date, Claim, ClaimBuilder, IssueError};
use crate::config::AttestationPolicy;
use crate::crypto::SecretKey;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;

/// Issues claims under a fixed policy with a shared key.
#[derive(Debug, Clone)]
pub struct Issuer {
    policy: AttestationPolicy,
    key: Arc<SecretKey>,
}

impl Issuer {
    pub fn new(policy: AttestationPolicy, key: Arc<SecretKey>) -> Self {
        Self { policy, key }
    }

    pub fn policy(&self) -> &AttestationPolicy {
        &self.policy
    }

    /// Issue a claim for a `YYYY-MM-DD` birth date, as of now.
    pub fn issue(&self, birth_date: &str, subject_id: &str) -> Result<Claim, IssueError> {
        self.issue_at(birth_date, subject_id, Utc::now(), &mut rand::thread_rng())
    }

    /// Issue a claim with an explicit clock reading and alias source.
    pub fn issue_at<R: Rng + ?Sized>(
        &self,
        birth_date: &str,
        subject_id: &str,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Claim, IssueError> {
        let birth_date = parse_birth_date(birth_date)?;
        ClaimBuilder::new()
            .subject_id(subject_id)
            .birth_date(birth_date)
            .issued_at(now)
            .build_and_sign_with_rng(&self.policy, &self.key, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn issuer() -> Issuer {
        Issuer::new(AttestationPolicy::default(), Arc::new(SecretKey::generate()))
    }

    #[test]
    fn test_issue_examples() {
        let issuer = issuer();
        let now = Utc.with_ymd_and_hms(2024, 5, 16, 8, 0, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        let claim = issuer.issue_at("1990-05-15", "user001", now, &mut rng).unwrap();
        assert!(claim.eligible());
        assert_eq!(claim.subject_id().0, "user001");

        let claim = issuer.issue_at("2010-01-01", "user002", now, &mut rng).unwrap();
        assert!(!claim.eligible());
    }

    #[test]
    fn test_invalid_inputs() {
        let issuer = issuer();
        assert!(matches!(
            issuer.issue("not-a-date", "user001"),
            Err(IssueError::InvalidInput(_))
        ));
        assert!(matches!(
            issuer.issue("1990-05-15", ""),
            Err(IssueError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_alias_regenerated_per_call() {
        let issuer = issuer();
        let aliases: std::collections::HashSet<String> = (0..50)
            .map(|_| issuer.issue("1990-05-15", "user001").unwrap().alias().0.clone())
            .collect();
        // 50 draws from 90 000 values; a handful of collisions at most
        assert!(aliases.len() > 40);
    }

    #[test]
    fn test_policy_threshold_copied() {
        let issuer = Issuer::new(
            AttestationPolicy::short_expiry().with_min_age(21),
            Arc::new(SecretKey::generate()),
        );
        let claim = issuer.issue("2004-01-01", "user003").unwrap();
        assert_eq!(claim.min_age_threshold(), 21);
        assert_eq!(claim.expires_at() - claim.issued_at(), chrono::Duration::minutes(1));
    }
}
