//! Transcript file loading.

use anyhow::Context;
use handoff_core::{Message, Transcript};
use serde::Deserialize;
use std::path::Path;

/// Either a bare message array or a full transcript object.
#[derive(Deserialize)]
#[serde(untagged)]
enum TranscriptFile {
    Bare(Vec<Message>),
    Full(Transcript),
}

pub fn parse_transcript(json: &str) -> anyhow::Result<Transcript> {
    let file: TranscriptFile =
        serde_json::from_str(json).context("transcript is neither a message array nor an object")?;
    Ok(match file {
        TranscriptFile::Bare(messages) => Transcript::new(messages),
        TranscriptFile::Full(mut transcript) => {
            if transcript.session_id.is_empty() {
                transcript.session_id = Transcript::new(transcript.messages.clone()).session_id;
            }
            transcript
        }
    })
}

pub fn load_transcript(path: &Path) -> anyhow::Result<Transcript> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read transcript {}", path.display()))?;
    parse_transcript(&json).with_context(|| format!("invalid transcript {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_array() {
        let t = parse_transcript(
            r#"[{"id":"m1","role":"user","content":"hi","session_id":"s1"},
                {"id":"m2","role":"assistant","content":"hello"}]"#,
        )
        .unwrap();
        assert_eq!(t.messages.len(), 2);
        assert_eq!(t.session_id, "s1");
    }

    #[test]
    fn full_object_with_file_changes() {
        let t = parse_transcript(
            r#"{"session_id":"abc",
                "messages":[{"id":"m1","role":"user","content":"hi"}],
                "file_changes":[{"path":"src/db.rs","change":"modified","message_id":"m1"}]}"#,
        )
        .unwrap();
        assert_eq!(t.session_id, "abc");
        assert_eq!(t.file_changes.len(), 1);
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(parse_transcript(r#"{"foo": 1}"#).is_err());
        assert!(parse_transcript("42").is_err());
    }
}
