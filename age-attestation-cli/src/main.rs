//! age-attest — issue and verify age attestations from the command line.
//!
//! Subcommands: keygen, issue, verify, policy. Results go to stdout as JSON;
//! logs go to stderr (filter with `RUST_LOG`).

mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Issue and verify signed age attestations.
#[derive(Parser, Debug)]
#[command(name = "age-attest", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a new shared secret key.
    Keygen(commands::keygen::KeygenArgs),
    /// Issue a signed age claim.
    Issue(commands::issue::IssueArgs),
    /// Verify a signed age claim.
    Verify(commands::verify::VerifyArgs),
    /// Show the effective issuance policy.
    Policy(commands::policy::PolicyCmdArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match &cli.command {
        Commands::Keygen(args) => commands::keygen::run(args),
        Commands::Issue(args) => commands::issue::run(args),
        Commands::Verify(args) => commands::verify::run(args),
        Commands::Policy(args) => commands::policy::run(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
