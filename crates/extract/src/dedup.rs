//! Near-duplicate suppression shared by every extractor.

use crate::tokenize::tokenize;
use std::collections::BTreeSet;

/// Tokens longer than three characters, as a set.
pub fn token_set(text: &str) -> BTreeSet<String> {
    tokenize(text, 4).into_iter().collect()
}

/// Overlap coefficient `|A∩B| / max(|A|,|B|)` over [`token_set`]s.
///
/// Two texts with no usable tokens are similar only if they are equal after
/// trimming and lowercasing.
pub fn similarity(a: &str, b: &str) -> f64 {
    set_similarity(&token_set(a), &token_set(b)).unwrap_or_else(|| {
        if a.trim().to_lowercase() == b.trim().to_lowercase() {
            1.0
        } else {
            0.0
        }
    })
}

/// `None` when both sets are empty.
pub fn set_similarity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> Option<f64> {
    let larger = a.len().max(b.len());
    if larger == 0 {
        return None;
    }
    let shared = a.intersection(b).count();
    Some(shared as f64 / larger as f64)
}

/// Drops items whose similarity to an already-kept item exceeds `threshold`.
/// Stable: kept items stay in input order and the first occurrence wins.
#[derive(Debug, Clone, Copy)]
pub struct SemanticDeduplicator {
    threshold: f64,
}

impl SemanticDeduplicator {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn dedup<T, F>(&self, items: Vec<T>, text: F) -> Vec<T>
    where
        F: Fn(&T) -> &str,
    {
        let mut kept: Vec<T> = Vec::with_capacity(items.len());
        let mut kept_sets: Vec<(BTreeSet<String>, String)> = Vec::with_capacity(items.len());

        for item in items {
            let raw = text(&item);
            let set = token_set(raw);
            let folded = raw.trim().to_lowercase();
            let duplicate = kept_sets.iter().any(|(other, other_folded)| {
                let sim = set_similarity(&set, other)
                    .unwrap_or(if folded == *other_folded { 1.0 } else { 0.0 });
                sim > self.threshold
            });
            if !duplicate {
                kept_sets.push((set, folded));
                kept.push(item);
            }
        }
        kept
    }
}
