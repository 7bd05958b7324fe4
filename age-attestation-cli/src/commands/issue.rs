//! `age-attest issue` — issue a signed age claim.

use std::path::PathBuf;
use std::sync::Arc;

use age_attestation_core::Issuer;
use anyhow::Context;
use clap::Args;

use super::{load_key, PolicyArgs};

#[derive(Args, Debug)]
pub struct IssueArgs {
    /// Hex key file written by `keygen`.
    #[arg(short, long)]
    pub key: PathBuf,

    /// Birth date (YYYY-MM-DD).
    #[arg(short, long)]
    pub birth_date: String,

    /// Subject identifier.
    #[arg(short, long)]
    pub subject: String,

    /// Print the claim as hex-encoded canonical CBOR instead of JSON.
    #[arg(long)]
    pub cbor: bool,

    #[command(flatten)]
    pub policy: PolicyArgs,
}

pub fn run(args: &IssueArgs) -> anyhow::Result<u8> {
    println!("{}", render_claim(args)?);
    Ok(0)
}

fn render_claim(args: &IssueArgs) -> anyhow::Result<String> {
    let key = load_key(&args.key)?;
    let policy = args.policy.resolve()?;
    let issuer = Issuer::new(policy, Arc::new(key));

    let claim = issuer
        .issue(&args.birth_date, &args.subject)
        .context("failed to issue claim")?;
    tracing::info!(
        alias = %claim.alias(),
        eligible = claim.eligible(),
        expires_at = %claim.expires_at(),
        "issued claim"
    );

    if args.cbor {
        Ok(hex::encode(claim.to_bytes()?))
    } else {
        Ok(serde_json::to_string_pretty(&claim)?)
    }
}
