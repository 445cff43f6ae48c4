//! TF-IDF topic extraction with bounded n-grams.
//!
//! Single terms need at least five characters. Two- and three-word phrases
//! are built from the stopword-filtered token stream and must occur at
//! least twice. Terms present in most messages of a large enough corpus are
//! treated as boilerplate and dropped before scoring.

use crate::corpus::Corpus;
use crate::tokenize::is_filler;
use handoff_config::ExtractionConfig;
use handoff_core::{
    Budget, ExtractionStatus, SizeTier, TierValues, Topic, TopicExtraction, TopicQuality,
};
use std::collections::{HashMap, HashSet};
use tracing::debug;

pub const METHOD: &str = "tfidf-ngram-v1";

const MIN_SINGLE_LEN: usize = 5;
const MAX_NGRAMS_PER_MESSAGE: usize = 256;
const MIN_NGRAM_TF: usize = 2;
const TOP_NGRAMS: usize = 7;
const TARGET_TOPICS: TierValues<usize> = TierValues::new(3, 5, 7);

#[derive(Debug, Default)]
struct TermStats {
    tf: usize,
    df: usize,
    /// Indices of containing messages, ascending.
    messages: Vec<usize>,
}

#[derive(Debug)]
struct Scored<'a> {
    term: &'a str,
    stats: &'a TermStats,
    score: f64,
}

pub fn extract_topics(
    corpus: &Corpus,
    budget: &Budget,
    config: &ExtractionConfig,
) -> TopicExtraction {
    let target = target_topics(budget.tier, budget.max_topics);
    let n = corpus.len();
    if n == 0 {
        return TopicExtraction {
            topics: Vec::new(),
            quality: TopicQuality::empty(METHOD, target),
        };
    }

    let mut singles: HashMap<String, TermStats> = HashMap::new();
    let mut ngrams: HashMap<String, TermStats> = HashMap::new();

    for entry in corpus.entries() {
        let mut seen_single: HashSet<&str> = HashSet::new();
        for token in entry.tokens.iter().filter(|t| t.chars().count() >= MIN_SINGLE_LEN) {
            count(&mut singles, token, entry.index, seen_single.insert(token.as_str()));
        }

        let mut seen_ngram: HashSet<String> = HashSet::new();
        for gram in ngrams_of(&entry.tokens).take(MAX_NGRAMS_PER_MESSAGE) {
            let first = seen_ngram.insert(gram.clone());
            count(&mut ngrams, &gram, entry.index, first);
        }
    }

    let boilerplate = |stats: &TermStats| {
        n >= config.boilerplate_min_messages
            && stats.df as f64 / n as f64 >= config.boilerplate_df_ratio
    };
    let score = |stats: &TermStats| stats.tf as f64 * ((n as f64 + 1.0) / stats.df as f64).ln();

    let ranked_singles = rank(&singles, |s| !boilerplate(s), score);
    let ranked_ngrams = rank(&ngrams, |s| s.tf >= MIN_NGRAM_TF && !boilerplate(s), score);

    let top_ngrams: Vec<&Scored<'_>> = ranked_ngrams.iter().take(TOP_NGRAMS).collect();
    let covered: HashSet<&str> = top_ngrams
        .iter()
        .flat_map(|s| s.term.split(' '))
        .collect();

    let mut merged: Vec<&Scored<'_>> = top_ngrams;
    merged.extend(ranked_singles.iter().filter(|s| !covered.contains(s.term)));
    merged.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.term.cmp(b.term)));
    merged.truncate(budget.max_topics);

    let max_tf = merged.iter().map(|s| s.stats.tf).max().unwrap_or(1).max(1);
    let len = merged.len();
    let topics: Vec<Topic> = merged
        .iter()
        .enumerate()
        .map(|(rank, scored)| Topic {
            label: scored.term.to_string(),
            weight: weight(rank, len, scored.stats.tf, max_tf),
            message_refs: recent_refs(corpus, &scored.stats.messages, budget.topic_refs),
            summary: format!(
                "{} mentions across {} message{}",
                scored.stats.tf,
                scored.stats.df,
                if scored.stats.df == 1 { "" } else { "s" }
            ),
        })
        .collect();

    let quality = quality(&topics, target);
    debug!(
        topics = topics.len(),
        candidates = ranked_singles.len() + ranked_ngrams.len(),
        status = ?quality.status,
        "Topic extraction complete"
    );
    TopicExtraction { topics, quality }
}

fn count(table: &mut HashMap<String, TermStats>, term: &str, index: usize, first_in_message: bool) {
    let stats = table.entry(term.to_string()).or_default();
    stats.tf += 1;
    if first_in_message {
        stats.df += 1;
        stats.messages.push(index);
    }
}

fn ngrams_of(tokens: &[String]) -> impl Iterator<Item = String> + '_ {
    (2..=3).flat_map(move |size| tokens.windows(size).map(|w| w.join(" ")))
}

fn rank<'a>(
    table: &'a HashMap<String, TermStats>,
    keep: impl Fn(&TermStats) -> bool,
    score: impl Fn(&TermStats) -> f64,
) -> Vec<Scored<'a>> {
    let mut ranked: Vec<Scored<'a>> = table
        .iter()
        .filter(|(_, stats)| keep(stats))
        .map(|(term, stats)| Scored {
            term: term.as_str(),
            stats,
            score: score(stats),
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.term.cmp(b.term)));
    ranked
}

/// Rank and frequency blended into `[200, 1000]`.
fn weight(rank: usize, len: usize, tf: usize, max_tf: usize) -> u32 {
    let rank_part = 1.0 - rank as f64 / len.max(1) as f64;
    let freq_part = tf as f64 / max_tf as f64;
    let w = 200.0 + (800.0 * (0.6 * rank_part + 0.4 * freq_part)).round();
    w.clamp(200.0, 1000.0) as u32
}

/// The `k` most recent containing messages, reported in transcript order.
fn recent_refs(corpus: &Corpus, indices: &[usize], k: usize) -> Vec<String> {
    let start = indices.len().saturating_sub(k);
    indices[start..]
        .iter()
        .filter_map(|&i| corpus.get(i).map(|e| e.id.clone()))
        .collect()
}

fn quality(topics: &[Topic], target: usize) -> TopicQuality {
    if topics.is_empty() {
        return TopicQuality::empty(METHOD, target);
    }
    let found = topics.len();
    TopicQuality {
        method: METHOD.to_string(),
        coverage: (found as f64 / target as f64).min(1.0),
        target_topics: target,
        average_weight: topics.iter().map(|t| t.weight as f64).sum::<f64>() / found as f64,
        stopword_collision: topics
            .iter()
            .any(|t| t.label.split(' ').any(is_filler)),
        status: if found >= target {
            ExtractionStatus::Extracted
        } else {
            ExtractionStatus::Partial
        },
    }
}

/// Size tier's topic target, exposed for callers that report coverage.
pub fn target_topics(tier: SizeTier, max_topics: usize) -> usize {
    TARGET_TOPICS.pick(tier).min(max_topics).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use handoff_core::Message;
    use std::time::Duration;

    fn budget(tier: SizeTier, refs: usize) -> Budget {
        let mut b = Budget::starting_now(Duration::from_secs(30), tier);
        b.topic_refs = refs;
        b
    }

    fn run(messages: &[Message]) -> TopicExtraction {
        extract_topics(
            &Corpus::build(messages),
            &budget(SizeTier::Small, 3),
            &ExtractionConfig::default(),
        )
    }

    #[test]
    fn empty_corpus_is_empty_status() {
        let out = run(&[]);
        assert!(out.topics.is_empty());
        assert_eq!(out.quality.status, ExtractionStatus::Empty);
        assert_eq!(out.quality.method, METHOD);
    }

    #[test]
    fn weights_in_range() {
        let out = run(&[
            Message::user("The kubernetes cluster keeps evicting pods").with_id("1"),
            Message::assistant("Kubernetes evicts pods when memory pressure rises").with_id("2"),
            Message::user("Can we raise the memory limits on kubernetes").with_id("3"),
            Message::assistant("Memory limits belong in the deployment manifest").with_id("4"),
        ]);
        assert!(!out.topics.is_empty());
        assert!(out.topics.len() <= 7);
        for t in &out.topics {
            assert!((200..=1000).contains(&t.weight), "{} out of range", t.weight);
        }
        assert!(out.topics.iter().any(|t| t.label.contains("kubernetes")));
    }

    #[test]
    fn ngrams_absorb_their_words() {
        let out = run(&[
            Message::user("memory limits are too low").with_id("1"),
            Message::assistant("raise memory limits in the manifest").with_id("2"),
            Message::user("memory limits still fail").with_id("3"),
        ]);
        let labels: Vec<&str> = out.topics.iter().map(|t| t.label.as_str()).collect();
        assert!(labels.contains(&"memory limits"));
        assert!(!labels.contains(&"memory"));
        assert!(!labels.contains(&"limits"));
    }

    #[test]
    fn refs_are_recent_and_ordered() {
        let messages: Vec<Message> = (0..6)
            .map(|i| Message::user(format!("postgres tuning round {i}")).with_id(format!("m{i}")))
            .collect();
        let out = extract_topics(
            &Corpus::build(&messages),
            &budget(SizeTier::Small, 3),
            &ExtractionConfig {
                boilerplate_min_messages: 100,
                ..ExtractionConfig::default()
            },
        );
        let postgres = out.topics.iter().find(|t| t.label.contains("postgres")).unwrap();
        assert_eq!(postgres.message_refs, vec!["m3", "m4", "m5"]);
    }

    #[test]
    fn boilerplate_terms_are_dropped() {
        let messages: Vec<Message> = (0..6)
            .map(|i| {
                Message::user(format!("greetings from assistant; subject{i} details{i}"))
                    .with_id(format!("m{i}"))
            })
            .collect();
        let out = extract_topics(
            &Corpus::build(&messages),
            &budget(SizeTier::Small, 3),
            &ExtractionConfig::default(),
        );
        assert!(out.topics.iter().all(|t| !t.label.contains("greetings")));
    }

    #[test]
    fn quality_reflects_target() {
        let out = run(&[Message::user("database").with_id("1")]);
        assert_eq!(out.topics.len(), 1);
        assert_eq!(out.quality.status, ExtractionStatus::Partial);
        assert_eq!(out.quality.target_topics, 3);
        assert!((out.quality.coverage - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(out.topics[0].weight, 1000);
    }

    #[test]
    fn filler_labels_flag_collision() {
        let out = run(&[Message::user("basically basically basically").with_id("1")]);
        assert!(out.quality.stopword_collision);
    }

    #[test]
    fn deterministic() {
        let messages = vec![
            Message::user("alpha service latency budget").with_id("1"),
            Message::assistant("latency budget for gamma service").with_id("2"),
        ];
        assert_eq!(run(&messages), run(&messages));
    }
}
