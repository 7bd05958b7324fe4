//! `age-attest keygen` — generate a shared secret key.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use age_attestation_core::SecretKey;
use anyhow::Context;
use clap::Args;

#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Write the hex key to this file instead of stdout.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Overwrite an existing key file.
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: &KeygenArgs) -> anyhow::Result<u8> {
    let key = SecretKey::generate();

    match &args.out {
        Some(path) => {
            write_key(&key, path, args.force)?;
            tracing::info!(path = %path.display(), fingerprint = %key.fingerprint(), "wrote key");
        }
        None => println!("{}", key.to_hex()),
    }
    Ok(0)
}

fn write_key(key: &SecretKey, path: &Path, force: bool) -> anyhow::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .with_context(|| format!("failed to create key file {}", path.display()))?;
    writeln!(file, "{}", key.to_hex())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::load_key;

    #[test]
    fn test_write_and_load_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.hex");
        let key = SecretKey::generate();

        write_key(&key, &path, false).unwrap();
        let loaded = load_key(&path).unwrap();
        assert_eq!(loaded.fingerprint(), key.fingerprint());
    }

    #[test]
    fn test_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.hex");

        write_key(&SecretKey::generate(), &path, false).unwrap();
        assert!(write_key(&SecretKey::generate(), &path, false).is_err());

        let replacement = SecretKey::generate();
        write_key(&replacement, &path, true).unwrap();
        assert_eq!(load_key(&path).unwrap().fingerprint(), replacement.fingerprint());
    }
}
