//! `handoff pack`: Build, seal and optionally sign a context package.

use crate::commands::input::load_transcript;
use anyhow::Context;
use handoff_config::EngineConfig;
use handoff_core::Profile;
use handoff_engine::{Snapshot, SnapshotAssembler, SnapshotRequest};
use handoff_integrity::{HmacSigner, sign_package};
use std::path::PathBuf;
use tracing::{info, warn};

pub struct PackArgs {
    pub input: PathBuf,
    pub profile: Option<Profile>,
    pub output: Option<PathBuf>,
    pub include_transcript: bool,
    pub session: Option<String>,
    pub sign_key_env: Option<String>,
    pub key_id: String,
    pub pretty: bool,
}

pub async fn run(config: EngineConfig, args: PackArgs) -> anyhow::Result<()> {
    let mut transcript = load_transcript(&args.input)?;
    if let Some(session) = args.session {
        transcript.session_id = session;
    }

    let mut request = SnapshotRequest::new(transcript);
    if let Some(profile) = args.profile {
        request = request.with_profile(profile);
    }
    if args.include_transcript {
        request = request.include_transcript(true);
    }

    let assembler = SnapshotAssembler::new(config);
    let snapshot = assembler.generate(request).await?;
    if let Snapshot::Partial(partial) = &snapshot {
        warn!(
            reason = partial.reason.code(),
            stage = %partial.stage,
            "Package is partial"
        );
    }
    let mut package = snapshot.into_package();

    if let Some(var) = args.sign_key_env {
        let secret = std::env::var(&var).with_context(|| format!("{var} is not set"))?;
        // A signing failure leaves a valid, unsigned package
        match HmacSigner::new(args.key_id, secret.into_bytes()) {
            Ok(signer) => {
                if let Err(e) = sign_package(&mut package, &signer).await {
                    warn!(error = %e, "Writing unsigned package");
                }
            }
            Err(e) => warn!(error = %e, "Writing unsigned package"),
        }
    }

    let json = if args.pretty {
        package.to_json_pretty()?
    } else {
        package.to_json()?
    };

    match args.output {
        Some(path) => {
            std::fs::write(&path, &json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(
                path = %path.display(),
                profile = %package.profile(),
                checksum = %package.checksum(),
                bytes = json.len(),
                "Package written"
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}
