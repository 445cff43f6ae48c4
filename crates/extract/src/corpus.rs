//! The normalized view of a transcript that every extractor reads.

use crate::tokenize::{normalize, tokenize};
use handoff_core::{Message, Role};

/// Minimum token length used for topic statistics and similarity.
pub const TOKEN_MIN_LEN: usize = 4;

/// One message after normalization.
#[derive(Debug, Clone)]
pub struct CorpusEntry {
    /// Position in the original transcript.
    pub index: usize,
    pub id: String,
    pub role: Role,
    /// Normalized text (code, URLs and markdown removed).
    pub text: String,
    pub tokens: Vec<String>,
}

impl CorpusEntry {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Normalized transcript, built once per run and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    entries: Vec<CorpusEntry>,
}

impl Corpus {
    pub fn build(messages: &[Message]) -> Self {
        let entries = messages
            .iter()
            .enumerate()
            .map(|(index, message)| {
                let text = normalize(&message.content);
                let tokens = tokenize(&text, TOKEN_MIN_LEN);
                CorpusEntry {
                    index,
                    id: message.id.clone(),
                    role: message.role,
                    text,
                    tokens,
                }
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CorpusEntry> {
        self.entries.get(index)
    }

    /// Entries in the inclusive range `[start, end]`, clamped to the corpus.
    pub fn range(&self, start: usize, end: usize) -> &[CorpusEntry] {
        if self.entries.is_empty() || start >= self.entries.len() {
            return &[];
        }
        let end = end.min(self.entries.len() - 1);
        if start > end {
            return &[];
        }
        &self.entries[start..=end]
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_normalized_entries() {
        let corpus = Corpus::build(&[
            Message::user("Set up the **database** schema").with_id("m1"),
            Message::assistant("```sql\nCREATE TABLE x;\n```").with_id("m2"),
        ]);
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.entries()[0].text, "Set up the database schema");
        assert_eq!(corpus.entries()[0].tokens, vec!["database", "schema"]);
        assert!(corpus.entries()[1].is_empty());
        assert_eq!(corpus.position("m2"), Some(1));
    }

    #[test]
    fn range_is_clamped() {
        let corpus = Corpus::build(&[Message::user("a").with_id("1"), Message::user("b").with_id("2")]);
        assert_eq!(corpus.range(0, 10).len(), 2);
        assert_eq!(corpus.range(1, 1).len(), 1);
        assert!(corpus.range(5, 6).is_empty());
        assert!(Corpus::default().range(0, 0).is_empty());
    }
}
