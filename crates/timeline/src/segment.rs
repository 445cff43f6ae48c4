//! Cognitive segmentation by similarity drop.
//!
//! For every internal index the token sets of the `window` messages before
//! and after it are compared with Jaccard similarity. A drop below the
//! threshold, at least `min_segment` messages after the previous boundary,
//! starts a new day. When no boundary is found the transcript is cut into
//! uniform chunks instead.

use handoff_config::SegmentationConfig;
use handoff_core::{CognitiveDay, Decision, Segmentation, SegmentationMethod};
use handoff_extract::{Corpus, CorpusEntry};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

const FOCUS_TERMS: usize = 3;
const FOCUS_MIN_LEN: usize = 5;

pub fn segment(
    corpus: &Corpus,
    decisions: &[Decision],
    config: &SegmentationConfig,
) -> Segmentation {
    let n = corpus.len();
    if n == 0 {
        return Segmentation::none();
    }

    let min_segment = config.min_segment.max(1);
    let mut starts = similarity_boundaries(
        corpus,
        config.window.max(1),
        config.similarity_threshold,
        min_segment,
    );
    let method = if starts.len() > 1 {
        SegmentationMethod::Similarity
    } else {
        starts = uniform_starts(n, min_segment, config.max_uniform_segments.max(1));
        SegmentationMethod::Uniform
    };

    let ranges: Vec<[usize; 2]> = starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).map_or(n - 1, |next| next - 1);
            [start, end]
        })
        .collect();

    let mut days: Vec<CognitiveDay> = Vec::with_capacity(ranges.len());
    for (i, range) in ranges.into_iter().enumerate() {
        let focus = top_terms(corpus.range(range[0], range[1]), FOCUS_TERMS);
        let key_shift = key_shift(days.last().map(|d| d.focus.as_slice()), &focus);
        days.push(CognitiveDay {
            day_id: format!("day_{}", i + 1),
            decisions_in_scope: decisions_in(corpus, decisions, range),
            focus,
            key_shift,
            range,
        });
    }

    debug!(days = days.len(), method = ?method, "Segmentation complete");
    Segmentation { days, method }
}

fn similarity_boundaries(
    corpus: &Corpus,
    window: usize,
    threshold: f64,
    min_segment: usize,
) -> Vec<usize> {
    let entries = corpus.entries();
    let n = entries.len();
    let mut starts = vec![0];

    for i in 1..n {
        let last = starts.last().copied().unwrap_or(0);
        if i - last < min_segment {
            continue;
        }
        let before = token_union(&entries[i.saturating_sub(window)..i]);
        let after = token_union(&entries[i..(i + window).min(n)]);
        if jaccard(&before, &after) < threshold {
            starts.push(i);
        }
    }

    // a short tail joins the previous segment
    if starts.len() > 1 {
        let tail = n - starts[starts.len() - 1];
        if tail < min_segment {
            starts.pop();
        }
    }
    starts
}

fn uniform_starts(n: usize, min_segment: usize, max_segments: usize) -> Vec<usize> {
    let count = (n / min_segment).clamp(1, max_segments);
    (0..count).map(|i| i * n / count).collect()
}

fn token_union(entries: &[CorpusEntry]) -> BTreeSet<&str> {
    entries
        .iter()
        .flat_map(|e| e.tokens.iter().map(String::as_str))
        .collect()
}

/// Two empty windows count as identical.
fn jaccard(a: &BTreeSet<&str>, b: &BTreeSet<&str>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 1.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Most frequent tokens of at least five characters, ties alphabetical.
pub fn top_terms(entries: &[CorpusEntry], k: usize) -> Vec<String> {
    let mut freq: HashMap<&str, usize> = HashMap::new();
    for token in entries.iter().flat_map(|e| e.tokens.iter()) {
        if token.chars().count() >= FOCUS_MIN_LEN {
            *freq.entry(token.as_str()).or_default() += 1;
        }
    }
    let mut ranked: Vec<(&str, usize)> = freq.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.into_iter().take(k).map(|(t, _)| t.to_string()).collect()
}

fn key_shift(previous: Option<&[String]>, focus: &[String]) -> String {
    let Some(previous) = previous else {
        return if focus.is_empty() {
            "Opening".to_string()
        } else {
            format!("Opening: {}", focus.join(", "))
        };
    };

    let new: Vec<&str> = focus
        .iter()
        .filter(|f| !previous.contains(*f))
        .map(String::as_str)
        .collect();
    if new.is_empty() {
        if focus.is_empty() {
            return "No dominant topic".to_string();
        }
        return format!("Continued focus on {}", focus.join(", "));
    }
    match previous.first() {
        Some(from) => format!("Shift to {} (from {from})", new.join(", ")),
        None => format!("Shift to {}", new.join(", ")),
    }
}

/// Decisions whose own message (the last context ref) falls in `range`.
fn decisions_in(corpus: &Corpus, decisions: &[Decision], range: [usize; 2]) -> Vec<String> {
    decisions
        .iter()
        .filter(|d| {
            d.context_refs
                .last()
                .and_then(|id| corpus.position(id))
                .is_some_and(|pos| pos >= range[0] && pos <= range[1])
        })
        .map(|d| d.id.clone())
        .collect()
}
