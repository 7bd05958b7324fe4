//! `age-attest verify` — verify a signed age claim.

use std::path::PathBuf;
use std::sync::Arc;

use age_attestation_core::{format_timestamp, Verification, VerificationOutcome, Verifier};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;

use super::{load_key, read_inline_or_file};

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Hex key file written by `keygen`.
    #[arg(short, long)]
    pub key: PathBuf,

    /// Claim JSON (inline or path to file), or hex CBOR with `--cbor`.
    #[arg(short, long)]
    pub claim: String,

    /// The claim is hex-encoded canonical CBOR.
    #[arg(long)]
    pub cbor: bool,
}

#[derive(Debug, Serialize)]
struct VerifyReport {
    valid: bool,
    message: String,
    timestamp: String,
}

pub fn run(args: &VerifyArgs) -> anyhow::Result<u8> {
    let now = Utc::now();
    let verification = verify(args, now)?;
    let report = VerifyReport {
        valid: verification.valid,
        message: verification.message(),
        timestamp: format_timestamp(&now),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(if verification.valid { 0 } else { 1 })
}

fn verify(args: &VerifyArgs, now: DateTime<Utc>) -> anyhow::Result<Verification> {
    let verifier = Verifier::new(Arc::new(load_key(&args.key)?));
    let input = read_inline_or_file(&args.claim)?;

    let verification = if args.cbor {
        match hex::decode(input.trim()) {
            Ok(bytes) => verifier.verify_bytes(&bytes, now),
            Err(e) => malformed(format!("claim is not valid hex: {e}")),
        }
    } else {
        match serde_json::from_str::<serde_json::Value>(&input) {
            Ok(value) => verifier.verify_json(&value, now),
            Err(e) => malformed(format!("claim is not valid JSON: {e}")),
        }
    };

    tracing::info!(valid = verification.valid, outcome = %verification.outcome, "verified claim");
    Ok(verification)
}

fn malformed(detail: String) -> Verification {
    Verification {
        valid: false,
        outcome: VerificationOutcome::Malformed(detail),
    }
}
