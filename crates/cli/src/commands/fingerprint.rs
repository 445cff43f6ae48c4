//! `handoff fingerprint`: Transcript hash without building a package.

use crate::commands::input::load_transcript;
use handoff_config::EngineConfig;
use handoff_integrity::{chunk_size_for, fingerprint_streamed};
use std::path::Path;

pub async fn run(
    config: &EngineConfig,
    input: &Path,
    chunk_size: Option<usize>,
) -> anyhow::Result<()> {
    let transcript = load_transcript(input)?;
    let chunk_size = chunk_size.unwrap_or_else(|| {
        let tier = config.tiers.classify(transcript.messages.len());
        chunk_size_for(tier, &config.caps.fingerprint_chunk)
    });

    let fingerprint = fingerprint_streamed(&transcript.messages, chunk_size).await;
    println!("{}", serde_json::to_string_pretty(&fingerprint)?);
    Ok(())
}
