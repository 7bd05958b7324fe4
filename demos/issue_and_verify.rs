//! Example: Issuing and verifying age claims
//!
//! Run with: cargo run --example issue_and_verify

use age_attestation_core::{AttestationPolicy, Issuer, SecretKey, Verifier};
use chrono::Duration;
use std::sync::Arc;

fn main() {
    println!("🔐 Age Attestation - Example Usage\n");
    println!("==============================================\n");

    // Step 1: Shared key (in production this comes from secure key storage)
    println!("1️⃣  Generating shared secret key...");
    let key = Arc::new(SecretKey::generate());
    println!("   ✓ Key fingerprint: {}\n", key.fingerprint());

    // Step 2: Issuer and verifier share the key; the policy is explicit
    println!("2️⃣  Configuring short-expiry policy...");
    let policy = AttestationPolicy::short_expiry();
    let issuer = Issuer::new(policy, key.clone());
    let verifier = Verifier::new(key);
    println!("   ✓ Minimum age: {}", policy.min_age());
    println!("   ✓ Claim lifetime: {}s\n", policy.ttl().as_secs());

    // Step 3: Issue claims for a few subjects
    println!("3️⃣  Issuing claims...");
    let subjects = [
        ("user001", "1990-05-15"),
        ("user002", "2012-08-22"),
        ("user003", "1985-12-03"),
    ];

    let mut claims = Vec::new();
    for (subject, birth_date) in subjects {
        let claim = issuer.issue(birth_date, subject).unwrap();
        println!(
            "   Issued {} (alias {}): eligible={}, expires {}",
            subject,
            claim.alias(),
            claim.eligible(),
            claim.expires_at()
        );
        claims.push(claim);
    }
    println!();

    // Step 4: Transport form
    println!("4️⃣  Serializing the first claim...");
    let json = serde_json::to_string_pretty(&claims[0]).unwrap();
    println!("{json}");
    let cbor = claims[0].to_bytes().unwrap();
    println!("   ✓ Canonical CBOR size: {} bytes\n", cbor.len());

    // Step 5: Verify each claim
    println!("5️⃣  Verifying claims...");
    for claim in &claims {
        let result = verifier.verify_now(claim);
        let mark = if result.valid { "✅" } else { "❌" };
        println!("   {} {}: {}", mark, claim.subject_id(), result.message());
    }
    println!();

    // Step 6: Tampering and expiry
    println!("6️⃣  Tampering and expiry...");
    let mut tampered = claims[1].to_json().unwrap();
    tampered["age_verified"] = serde_json::Value::Bool(true);
    let result = verifier.verify_json(&tampered, chrono::Utc::now());
    println!("   ❌ Forged eligibility: {}", result.message());

    let later = claims[0].expires_at() + Duration::seconds(1);
    let result = verifier.verify(&claims[0], later);
    println!("   ❌ One second after expiry: {}\n", result.message());

    println!("==============================================");
    println!("✅ Attestation workflow complete!");
    println!("\nLimitations:");
    println!("  - Claims are plaintext; the tag only prevents forgery");
    println!("  - An unexpired claim can be replayed");
    println!("  - There is no revocation");
}
