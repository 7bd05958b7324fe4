//! Property tests: round-trip, tamper detection, expiry and encoding determinism.

use age_attestation_core::{
    compute_age, format_timestamp, parse_timestamp, AttestationPolicy, Claim, Issuer, SecretKey,
    VerificationOutcome, Verifier,
};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use std::sync::Arc;

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 16, 10, 15, 30).unwrap() + Duration::microseconds(250_001)
}

fn setup(min_age: u32) -> (Issuer, Verifier) {
    let key = Arc::new(SecretKey::from_bytes([0x5a; 32]));
    let policy = AttestationPolicy::default().with_min_age(min_age);
    (Issuer::new(policy, key.clone()), Verifier::new(key))
}

fn birth_date() -> impl Strategy<Value = NaiveDate> {
    (1900i32..2030, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn subject_id() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_@.-]{1,24}"
}

fn flip_char(s: &str, index: usize, bit: u8) -> String {
    let mut bytes = s.as_bytes().to_vec();
    let i = index % bytes.len();
    bytes[i] ^= 1 << (bit % 7);
    String::from_utf8(bytes).unwrap()
}

fn shift_timestamp(json: &mut Value, key: &str, micros: i64) {
    let ts = parse_timestamp(json[key].as_str().unwrap()).unwrap();
    json[key] = Value::from(format_timestamp(&(ts + Duration::microseconds(micros))));
}

proptest! {
    /// Before expiry a claim verifies iff the subject was old enough.
    #[test]
    fn roundtrip_verifies_iff_eligible(
        dob in birth_date(),
        subject in subject_id(),
        min_age in 0u32..100,
        elapsed_secs in 0i64..86_400,
        seed in any::<u64>(),
    ) {
        let (issuer, verifier) = setup(min_age);
        let now = fixed_now();
        let claim = issuer
            .issue_at(&dob.format("%Y-%m-%d").to_string(), &subject, now, &mut StdRng::seed_from_u64(seed))
            .unwrap();

        let eligible = compute_age(dob, now.date_naive()) >= i64::from(min_age);
        prop_assert_eq!(claim.eligible(), eligible);

        let result = verifier.verify(&claim, now + Duration::seconds(elapsed_secs));
        if eligible {
            prop_assert_eq!(result.outcome, VerificationOutcome::Verified);
        } else {
            prop_assert_eq!(result.outcome, VerificationOutcome::AgeRequirementNotMet);
        }
    }

    /// Changing any field other than the signature breaks the tag.
    #[test]
    fn tampering_is_detected(
        subject in subject_id(),
        field in 0usize..6,
        index in any::<usize>(),
        bit in 0u8..31,
    ) {
        let (issuer, verifier) = setup(18);
        let now = fixed_now();
        let claim = issuer
            .issue_at("1990-05-15", &subject, now, &mut StdRng::seed_from_u64(11))
            .unwrap();
        let mut json = claim.to_json().unwrap();

        match field {
            0 => json["alias"] = Value::from(flip_char(&claim.alias().0, index, bit)),
            1 => json["user_id"] = Value::from(flip_char(&claim.subject_id().0, index, bit)),
            2 => json["age_verified"] = Value::Bool(!claim.eligible()),
            3 => json["min_age"] = Value::from(claim.min_age_threshold() ^ (1u32 << bit)),
            4 => shift_timestamp(&mut json, "timestamp", -(1i64 << bit)),
            _ => shift_timestamp(&mut json, "expires_at", 1i64 << bit),
        }

        let result = verifier.verify_json(&json, now);
        prop_assert!(!result.valid);
        prop_assert_eq!(result.outcome, VerificationOutcome::InvalidSignature);
    }

    /// Past `expires_at` the answer is `Expired` no matter which key verifies.
    #[test]
    fn expiry_is_monotonic(eps_micros in 1i64..86_400_000_000, seed in any::<u64>()) {
        let (issuer, verifier) = setup(18);
        let claim = issuer
            .issue_at("1990-05-15", "user001", fixed_now(), &mut StdRng::seed_from_u64(seed))
            .unwrap();
        let stranger = Verifier::new(Arc::new(SecretKey::from_bytes([0xa5; 32])));
        let eps = Duration::microseconds(eps_micros);

        prop_assert_eq!(verifier.verify(&claim, claim.expires_at() + eps).outcome, VerificationOutcome::Expired);
        prop_assert_eq!(stranger.verify(&claim, claim.expires_at() + eps).outcome, VerificationOutcome::Expired);
        prop_assert_ne!(verifier.verify(&claim, claim.expires_at() - eps).outcome, VerificationOutcome::Expired);
    }

    /// The signing input matches an independent rendering of the canonical form.
    #[test]
    fn signing_input_is_canonical(
        dob in birth_date(),
        subject in "x\\PC{0,15}",
        seed in any::<u64>(),
    ) {
        let (issuer, _) = setup(18);
        let claim = issuer
            .issue_at(&dob.format("%Y-%m-%d").to_string(), &subject, fixed_now(), &mut StdRng::seed_from_u64(seed))
            .unwrap();

        let expected = format!(
            "{{\"age_verified\":{},\"alias\":{},\"expires_at\":\"{}\",\"min_age\":{},\"timestamp\":\"{}\",\"user_id\":{}}}",
            claim.eligible(),
            serde_json::to_string(&claim.alias().0).unwrap(),
            format_timestamp(&claim.expires_at()),
            claim.min_age_threshold(),
            format_timestamp(&claim.issued_at()),
            serde_json::to_string(&claim.subject_id().0).unwrap(),
        );
        let input = claim.signing_input().unwrap();
        prop_assert_eq!(input.as_bytes(), expected.as_bytes());

        // Same fields through the wire form give the same bytes
        let decoded = Claim::from_json(&claim.to_json().unwrap()).unwrap();
        prop_assert_eq!(decoded.signing_input().unwrap(), input);
    }
}
