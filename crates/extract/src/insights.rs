//! Insight extraction: one insight per matching chunk, priority first.

use crate::corpus::Corpus;
use crate::dedup::SemanticDeduplicator;
use crate::patterns::{INSIGHT_RULES, first_match};
use crate::tokenize::{chunk_sentences, is_code_like, sentence_at, truncate_chars};
use handoff_config::ExtractionConfig;
use handoff_core::{Budget, Insight};
use tracing::debug;

const MIN_INSIGHT_CHARS: usize = 12;
const MAX_INSIGHT_CHARS: usize = 240;

pub fn extract_insights(
    corpus: &Corpus,
    budget: &Budget,
    config: &ExtractionConfig,
) -> Vec<Insight> {
    let mut found = Vec::new();

    for entry in corpus.entries().iter().filter(|e| !e.is_empty()) {
        for chunk in chunk_sentences(&entry.text, config.insight_chunk_chars) {
            if is_code_like(&chunk) {
                continue;
            }
            let Some((rule, caps)) = first_match(&INSIGHT_RULES, &chunk) else {
                continue;
            };
            let offset = caps.get(0).map_or(0, |m| m.start());
            let sentence = sentence_at(&chunk, offset);
            if sentence.chars().count() < MIN_INSIGHT_CHARS {
                continue;
            }
            found.push(Insight {
                text: truncate_chars(sentence, MAX_INSIGHT_CHARS),
                priority: rule.tag.priority,
                kind: rule.tag.kind.to_string(),
                message_ref: entry.id.clone(),
            });
        }
    }

    let matched = found.len();
    found.sort_by(|a, b| b.priority.cmp(&a.priority));
    let mut insights =
        SemanticDeduplicator::new(config.insight_dedup).dedup(found, |i| i.text.as_str());
    insights.truncate(budget.max_insights);

    debug!(matched, kept = insights.len(), "Insight extraction complete");
    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use handoff_core::{Message, SizeTier};
    use std::time::Duration;

    fn run(messages: &[Message], cap: usize) -> Vec<Insight> {
        let mut budget = Budget::starting_now(Duration::from_secs(30), SizeTier::Small);
        budget.max_insights = cap;
        extract_insights(&Corpus::build(messages), &budget, &ExtractionConfig::default())
    }

    #[test]
    fn no_markers_no_insights() {
        let insights = run(
            &[
                Message::user("Hello, can you help me with my garden layout"),
                Message::assistant("Sure, tell me more about the garden"),
            ],
            15,
        );
        assert!(insights.is_empty());
    }

    #[test]
    fn sorted_by_priority() {
        let insights = run(
            &[
                Message::assistant("Note that the staging cluster uses smaller nodes.").with_id("a"),
                Message::assistant("Turns out the cache was never invalidated.").with_id("b"),
                Message::assistant("The root cause was a missing index on orders.").with_id("c"),
            ],
            15,
        );
        let kinds: Vec<&str> = insights.iter().map(|i| i.kind.as_str()).collect();
        assert_eq!(kinds, vec!["root_cause", "discovery", "important_note"]);
        assert_eq!(insights[0].priority, 9);
        assert_eq!(insights[0].message_ref, "c");
    }

    #[test]
    fn duplicates_keep_highest_priority() {
        let insights = run(
            &[
                Message::assistant("Important: the migration locks the orders table.").with_id("a"),
                Message::assistant("Critical: the migration locks the orders table.").with_id("b"),
            ],
            15,
        );
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].kind, "critical");
        assert_eq!(insights[0].message_ref, "b");
    }

    #[test]
    fn capped() {
        let messages: Vec<Message> = (0..40)
            .map(|i| Message::assistant(format!("Turns out module{i} leaks handle{i} under load{i}.")))
            .collect();
        assert_eq!(run(&messages, 15).len(), 15);
    }

    #[test]
    fn insight_text_is_the_matching_sentence() {
        let insights = run(
            &[Message::assistant(
                "We ran the suite again. It turns out the flaky test depends on wall clock time. Moving on.",
            )],
            15,
        );
        assert_eq!(insights.len(), 1);
        assert_eq!(
            insights[0].text,
            "It turns out the flaky test depends on wall clock time."
        );
    }
}
