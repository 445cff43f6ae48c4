//! `handoff verify`: Re-check a package without trusting its contents.

use crate::commands::input::load_transcript;
use anyhow::{Context, bail};
use handoff_core::ContextPackage;
use handoff_integrity::{HmacSigner, signing_payload, verify_fingerprint, verify_package};
use std::path::Path;

pub fn run(
    package_path: &Path,
    transcript_path: Option<&Path>,
    sign_key_env: Option<&str>,
) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(package_path)
        .with_context(|| format!("failed to read package {}", package_path.display()))?;

    let mut failures = Vec::new();

    let report = verify_package(&json)?;
    if report.valid {
        println!("checksum     ok        {}", report.actual);
    } else {
        println!("checksum     MISMATCH  expected {} got {}", report.expected, report.actual);
        failures.push("checksum");
    }

    let package: Option<ContextPackage> = if transcript_path.is_some() || sign_key_env.is_some() {
        Some(serde_json::from_str(&json).context("package does not match the package schema")?)
    } else {
        None
    };

    if let (Some(path), Some(package)) = (transcript_path, &package) {
        let transcript = load_transcript(path)?;
        if verify_fingerprint(&package.fingerprint, &transcript.messages) {
            println!("fingerprint  ok        {}", package.fingerprint.sha256);
        } else {
            println!("fingerprint  MISMATCH  {}", package.fingerprint.sha256);
            failures.push("fingerprint");
        }
    }

    if let (Some(var), Some(package)) = (sign_key_env, &package) {
        let secret = std::env::var(var).with_context(|| format!("{var} is not set"))?;
        match &package.signature {
            Some(signature) => {
                let signer = HmacSigner::new(signature.key_id.clone(), secret.into_bytes())?;
                let covers = signature.signed_payload == signing_payload(&report.actual);
                if covers && signer.verify(signature) {
                    println!("signature    ok        {}", signature.key_id);
                } else {
                    println!("signature    INVALID   {}", signature.key_id);
                    failures.push("signature");
                }
            }
            None => {
                println!("signature    missing");
                failures.push("signature");
            }
        }
    } else if report.signature_present {
        println!("signature    present (not checked)");
    }

    if !failures.is_empty() {
        bail!("verification failed: {}", failures.join(", "));
    }
    Ok(())
}
