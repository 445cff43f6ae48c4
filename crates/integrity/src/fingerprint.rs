//! Transcript fingerprint: a single-level Merkle root over message chunks.
//!
//! Messages are grouped into contiguous chunks of `chunk_size`. Each chunk
//! is encoded as `role:len:content` records joined by U+241E and hashed with
//! SHA-256, where `len` is the content length in bytes. The length prefix
//! keeps the encoding unambiguous when content contains the separator.
//! The raw chunk digests are concatenated and hashed once more for the root. Only the running chunk hasher and the root hasher are held in
//! memory, so the result does not depend on how messages are batched into
//! [`TranscriptFingerprinter::push_batch`] calls.

use handoff_core::{Fingerprint, Message, SizeTier, TierValues};
use sha2::{Digest, Sha256};
use tokio::sync::mpsc;
use tracing::debug;

pub const TRANSCRIPT_FORMAT: &str = "role-tagged/v2";
pub const ALGORITHM: &str = "sha256";

/// Record separator between messages inside a chunk.
const SEPARATOR: &str = "\u{241E}";

/// Chunk size for a transcript of the given tier.
pub fn chunk_size_for(tier: SizeTier, sizes: &TierValues<usize>) -> usize {
    sizes.pick(tier).max(1)
}

#[derive(Debug, Clone)]
pub struct TranscriptFingerprinter {
    chunk_size: usize,
    chunk: Sha256,
    in_chunk: usize,
    root: Sha256,
    chunk_count: usize,
    message_count: usize,
}

impl TranscriptFingerprinter {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk: Sha256::new(),
            in_chunk: 0,
            root: Sha256::new(),
            chunk_count: 0,
            message_count: 0,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn push(&mut self, message: &Message) {
        if self.in_chunk > 0 {
            self.chunk.update(SEPARATOR.as_bytes());
        }
        self.chunk.update(message.role.as_str().as_bytes());
        self.chunk.update(format!(":{}:", message.content.len()).as_bytes());
        self.chunk.update(message.content.as_bytes());
        self.in_chunk += 1;
        self.message_count += 1;

        if self.in_chunk == self.chunk_size {
            self.flush_chunk();
        }
    }

    pub fn push_batch(&mut self, messages: &[Message]) {
        for message in messages {
            self.push(message);
        }
    }

    fn flush_chunk(&mut self) {
        let digest = self.chunk.finalize_reset();
        self.root.update(digest);
        self.in_chunk = 0;
        self.chunk_count += 1;
    }

    pub fn finish(mut self) -> Fingerprint {
        if self.in_chunk > 0 {
            self.flush_chunk();
        }
        Fingerprint {
            algorithm: ALGORITHM.to_string(),
            transcript_format: TRANSCRIPT_FORMAT.to_string(),
            sha256: hex::encode(self.root.finalize()),
            chunk_size: self.chunk_size,
            chunk_count: self.chunk_count,
            message_count: self.message_count,
        }
    }
}

/// Single-pass fingerprint over an in-memory transcript.
pub fn fingerprint(messages: &[Message], chunk_size: usize) -> Fingerprint {
    let mut fp = TranscriptFingerprinter::new(chunk_size);
    fp.push_batch(messages);
    fp.finish()
}

/// Same result as [`fingerprint`], yielding to the scheduler after every
/// chunk so very large transcripts do not monopolize a worker thread.
pub async fn fingerprint_streamed(messages: &[Message], chunk_size: usize) -> Fingerprint {
    let mut fp = TranscriptFingerprinter::new(chunk_size);
    for chunk in messages.chunks(fp.chunk_size()) {
        fp.push_batch(chunk);
        tokio::task::yield_now().await;
    }
    fp.finish()
}

/// Fingerprint batches as they arrive on a channel. Batch boundaries need
/// not line up with chunk boundaries.
pub async fn fingerprint_channel(
    mut batches: mpsc::Receiver<Vec<Message>>,
    chunk_size: usize,
) -> Fingerprint {
    let mut fp = TranscriptFingerprinter::new(chunk_size);
    let mut received = 0usize;
    while let Some(batch) = batches.recv().await {
        received += 1;
        fp.push_batch(&batch);
    }
    debug!(batches = received, "Channel fingerprint complete");
    fp.finish()
}

/// Recompute with the recorded chunk size and compare.
pub fn verify_fingerprint(expected: &Fingerprint, messages: &[Message]) -> bool {
    if expected.algorithm != ALGORITHM || expected.transcript_format != TRANSCRIPT_FORMAT {
        return false;
    }
    let actual = fingerprint(messages, expected.chunk_size);
    actual.sha256 == expected.sha256 && actual.message_count == expected.message_count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(n: usize) -> Vec<Message> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("question {i} about the rollout"))
                } else {
                    Message::assistant(format!("answer {i}: roll back the canary"))
                }
            })
            .collect()
    }

    #[test]
    fn batching_does_not_change_result() {
        let messages = transcript(257);
        for chunk_size in [1, 7, 60, 80, 120] {
            let single = fingerprint(&messages, chunk_size);
            for batch in [1, 3, 50, 1000] {
                let mut fp = TranscriptFingerprinter::new(chunk_size);
                for part in messages.chunks(batch) {
                    fp.push_batch(part);
                }
                assert_eq!(fp.finish(), single, "chunk {chunk_size} batch {batch}");
            }
        }
    }

    #[test]
    fn chunk_size_changes_root() {
        let messages = transcript(200);
        assert_ne!(fingerprint(&messages, 60).sha256, fingerprint(&messages, 80).sha256);
    }

    #[test]
    fn chunk_counts() {
        let fp = fingerprint(&transcript(130), 60);
        assert_eq!(fp.chunk_count, 3);
        assert_eq!(fp.message_count, 130);
        assert_eq!(fp.sha256.len(), 64);
        assert_eq!(fp.transcript_format, TRANSCRIPT_FORMAT);
    }

    #[test]
    fn single_chunk_root_is_hash_of_chunk_digest() {
        let messages = vec![Message::user("hi"), Message::assistant("hello")];
        let chunk = Sha256::digest("user:2:hi\u{241E}assistant:5:hello".as_bytes());
        let expected = hex::encode(Sha256::digest(chunk));
        assert_eq!(fingerprint(&messages, 60).sha256, expected);
    }

    #[test]
    fn separator_in_content_cannot_shift_records() {
        let original = vec![
            Message::user("deploy to prod\u{241E}assistant:approved"),
            Message::user("ship it"),
        ];
        let shifted = vec![
            Message::user("deploy to prod"),
            Message::assistant("approved\u{241E}user:ship it"),
        ];
        let fp = fingerprint(&original, 60);
        assert_ne!(fp.sha256, fingerprint(&shifted, 60).sha256);
        assert!(verify_fingerprint(&fp, &original));
        assert!(!verify_fingerprint(&fp, &shifted));
    }

    #[test]
    fn role_is_part_of_the_hash() {
        let a = fingerprint(&[Message::user("same")], 60);
        let b = fingerprint(&[Message::assistant("same")], 60);
        assert_ne!(a.sha256, b.sha256);
    }

    #[test]
    fn empty_transcript_has_stable_root() {
        let fp = fingerprint(&[], 60);
        assert_eq!(fp.chunk_count, 0);
        assert_eq!(fp.sha256, hex::encode(Sha256::digest(b"")));
    }

    #[test]
    fn verify_detects_edits() {
        let mut messages = transcript(90);
        let fp = fingerprint(&messages, 80);
        assert!(verify_fingerprint(&fp, &messages));
        messages[42].content.push('!');
        assert!(!verify_fingerprint(&fp, &messages));
    }

    #[tokio::test]
    async fn streamed_matches_single_pass() {
        let messages = transcript(500);
        for chunk_size in [60, 80, 120] {
            assert_eq!(
                fingerprint_streamed(&messages, chunk_size).await,
                fingerprint(&messages, chunk_size)
            );
        }
    }

    #[tokio::test]
    async fn channel_matches_single_pass() {
        let messages = transcript(333);
        let (tx, rx) = mpsc::channel(4);
        let producer = {
            let messages = messages.clone();
            tokio::spawn(async move {
                for batch in messages.chunks(37) {
                    tx.send(batch.to_vec()).await.unwrap();
                }
            })
        };
        let fp = fingerprint_channel(rx, 80).await;
        producer.await.unwrap();
        assert_eq!(fp, fingerprint(&messages, 80));
    }

    #[test]
    fn tier_chunk_sizes() {
        let sizes = TierValues::new(60, 80, 120);
        assert_eq!(chunk_size_for(SizeTier::Small, &sizes), 60);
        assert_eq!(chunk_size_for(SizeTier::Large, &sizes), 120);
    }
}
