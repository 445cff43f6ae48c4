//! Constraint extraction over five independent categories.

use crate::corpus::Corpus;
use crate::dedup::SemanticDeduplicator;
use crate::patterns::constraint_rules;
use crate::tokenize::{is_code_like, split_sentences, truncate_chars};
use handoff_config::ExtractionConfig;
use handoff_core::{Budget, Constraint, ConstraintCategory, ConstraintSet};
use tracing::debug;

const MIN_CONSTRAINT_CHARS: usize = 12;
const MAX_CONSTRAINT_CHARS: usize = 200;

/// A sentence may land in several categories. A negated sentence ("must
/// not") is only a `dont`, never a `do`.
pub fn extract_constraints(
    corpus: &Corpus,
    budget: &Budget,
    config: &ExtractionConfig,
) -> ConstraintSet {
    let mut set = ConstraintSet::default();

    for entry in corpus.entries().iter().filter(|e| !e.is_empty()) {
        for sentence in split_sentences(&entry.text) {
            if sentence.chars().count() < MIN_CONSTRAINT_CHARS || is_code_like(sentence) {
                continue;
            }
            let negated = matches_category(ConstraintCategory::Dont, sentence);
            for category in ConstraintCategory::ALL {
                let hit = match category {
                    ConstraintCategory::Dont => negated,
                    ConstraintCategory::Do => !negated && matches_category(category, sentence),
                    _ => matches_category(category, sentence),
                };
                if hit {
                    set.category_mut(category).push(Constraint {
                        category,
                        text: truncate_chars(sentence, MAX_CONSTRAINT_CHARS),
                        message_ref: entry.id.clone(),
                    });
                }
            }
        }
    }

    let dedup = SemanticDeduplicator::new(config.constraint_dedup);
    for category in ConstraintCategory::ALL {
        let items = std::mem::take(set.category_mut(category));
        let mut kept = dedup.dedup(items, |c| c.text.as_str());
        kept.truncate(budget.max_constraints);
        *set.category_mut(category) = kept;
    }

    debug!(total = set.len(), cap = budget.max_constraints, "Constraint extraction complete");
    set
}

fn matches_category(category: ConstraintCategory, sentence: &str) -> bool {
    constraint_rules(category).any(|rule| rule.regex.is_match(sentence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use handoff_core::{Message, SizeTier};
    use std::time::Duration;

    fn run(messages: &[Message], cap: usize) -> ConstraintSet {
        let mut budget = Budget::starting_now(Duration::from_secs(30), SizeTier::Small);
        budget.max_constraints = cap;
        extract_constraints(&Corpus::build(messages), &budget, &ExtractionConfig::default())
    }

    #[test]
    fn categories_are_independent() {
        let set = run(
            &[Message::user(
                "Never commit API keys to the repository. Always run the linter before pushing. \
                 Responses must stay under 200 ms at p99.",
            )],
            10,
        );
        assert_eq!(set.dont.len(), 1);
        assert_eq!(set.security.len(), 1);
        assert_eq!(set.performance.len(), 1);
        assert!(set.must.iter().any(|c| c.text.starts_with("Always run the linter")));
        assert!(set.technical.is_empty());
    }

    #[test]
    fn negation_is_not_a_must() {
        let set = run(&[Message::user("You must not change the public schema.")], 10);
        assert_eq!(set.dont.len(), 1);
        assert!(set.must.is_empty());
    }

    #[test]
    fn french_constraints() {
        let set = run(&[Message::user("Il faut toujours chiffrer le mot de passe en base.")], 10);
        assert_eq!(set.must.len(), 1);
        assert_eq!(set.security.len(), 1);
    }

    #[test]
    fn each_category_capped_and_deduped() {
        let mut messages: Vec<Message> = (0..20)
            .map(|i| Message::user(format!("Never touch legacy module{i} without review{i} first.")))
            .collect();
        messages.push(Message::user("Never touch legacy module0 without review0 first."));
        let set = run(&messages, 10);
        assert_eq!(set.dont.len(), 10);
    }

    #[test]
    fn no_markers_no_constraints() {
        let set = run(&[Message::user("Tell me about the history of bread baking")], 10);
        assert!(set.is_empty());
    }
}
