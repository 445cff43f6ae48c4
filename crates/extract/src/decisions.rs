//! Decision extraction.
//!
//! Every message is chunked at sentence boundaries and each non-code chunk
//! is run through the decision table; the first matching rule decides the
//! intent and confidence. User-authored chunks only count when they match an
//! explicit rule, since most user turns are questions rather than choices.

use crate::corpus::Corpus;
use crate::dedup::SemanticDeduplicator;
use crate::patterns::{
    DECISION_RULES, DecisionCategory, EXPLICIT_CHOICE, GENERIC_CHOICE, first_match,
};
use crate::tokenize::{chunk_sentences, is_code_like, sentence_at, truncate_chars};
use handoff_config::ExtractionConfig;
use handoff_core::{Budget, Decision, DecisionQuality, Role, UNKNOWN_OPTION};
use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::debug;

const CHOICE_MAX_CHARS: usize = 160;
const EXCERPT_MAX_CHARS: usize = 240;
const CHOICE_SYMBOLS: &[char] = &['{', '}', '[', ']', '(', ')', '<', '>', '=', '|', '\\', ';', '$'];

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

pub fn extract_decisions(
    corpus: &Corpus,
    budget: &Budget,
    config: &ExtractionConfig,
) -> Vec<Decision> {
    let mut found: Vec<Decision> = Vec::new();

    for entry in corpus.entries() {
        if entry.is_empty() {
            continue;
        }
        let previous = entry
            .index
            .checked_sub(1)
            .and_then(|i| corpus.get(i))
            .map(|e| e.id.clone());

        for chunk in chunk_sentences(&entry.text, config.decision_chunk_chars) {
            if is_code_like(&chunk) {
                continue;
            }
            let Some((rule, caps)) = first_match(&DECISION_RULES, &chunk) else {
                continue;
            };
            if entry.role == Role::User && rule.tag.category != DecisionCategory::Explicit {
                continue;
            }

            let offset = caps.get(0).map_or(0, |m| m.start());
            let excerpt = truncate_chars(&collapse(sentence_at(&chunk, offset)), EXCERPT_MAX_CHARS);
            let chosen_option =
                resolve_choice(&chunk, &caps).unwrap_or_else(|| UNKNOWN_OPTION.to_string());

            let mut context_refs = Vec::with_capacity(2);
            context_refs.extend(previous.clone());
            context_refs.push(entry.id.clone());

            found.push(Decision {
                id: String::new(),
                intent: rule.tag.intent,
                chosen_option,
                context_refs,
                decision_quality: if rule.tag.category == DecisionCategory::Explicit {
                    DecisionQuality::Explicit
                } else {
                    DecisionQuality::Implicit
                },
                confidence: rule.tag.confidence,
                excerpt,
            });
        }
    }

    let matched = found.len();
    let mut decisions =
        SemanticDeduplicator::new(config.decision_dedup).dedup(found, |d| d.text());
    // stable: equal confidence keeps transcript order
    decisions.sort_by_key(|d| d.confidence);
    decisions.truncate(budget.max_decisions);
    for (i, decision) in decisions.iter_mut().enumerate() {
        decision.id = format!("dec_{}", i + 1);
    }

    debug!(
        matched,
        kept = decisions.len(),
        cap = budget.max_decisions,
        "Decision extraction complete"
    );
    decisions
}

/// Explicit marker, then the rule's own capture, then a generic verb
/// fallback. The first candidate that survives validation wins.
fn resolve_choice(chunk: &str, caps: &Captures<'_>) -> Option<String> {
    let explicit = EXPLICIT_CHOICE
        .captures(chunk)
        .and_then(|c| c.name("choice"))
        .map(|m| m.as_str());
    let captured = caps.name("choice").map(|m| m.as_str());
    let generic = GENERIC_CHOICE
        .captures(chunk)
        .and_then(|c| c.name("choice"))
        .map(|m| m.as_str());

    [explicit, captured, generic]
        .into_iter()
        .flatten()
        .map(sanitize_choice)
        .find(|c| is_valid_choice(c))
}

/// Collapse whitespace, drop leading punctuation and cut after the first
/// sentence terminator.
pub fn sanitize_choice(raw: &str) -> String {
    let collapsed = collapse(raw);
    let trimmed = collapsed.trim_start_matches(|c: char| {
        c.is_whitespace() || matches!(c, ':' | '-' | ',' | ';' | '"' | '\'' | '«' | '»' | '>')
    });

    let mut end = trimmed.len();
    let mut chars = trimmed.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = chars.peek().is_none_or(|(_, next)| next.is_whitespace());
            if at_boundary {
                end = i + c.len_utf8();
                break;
            }
        }
    }

    let cut = trimmed[..end].trim_end_matches(|c: char| c.is_whitespace() || c == ',');
    truncate_chars(cut, CHOICE_MAX_CHARS)
}

pub fn is_valid_choice(choice: &str) -> bool {
    let letters = choice.chars().filter(|c| c.is_alphabetic()).count();
    let words = choice.split_whitespace().count();
    let symbols = choice.chars().filter(|c| CHOICE_SYMBOLS.contains(c)).count();
    letters >= 8 && (words >= 2 || choice.chars().count() >= 16) && symbols < 3
}

fn collapse(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use handoff_core::{Confidence, DecisionIntent, Message, SizeTier};
    use std::time::Duration;

    fn budget() -> Budget {
        Budget::starting_now(Duration::from_secs(30), SizeTier::Small)
    }

    fn run(messages: &[Message]) -> Vec<Decision> {
        extract_decisions(&Corpus::build(messages), &budget(), &ExtractionConfig::default())
    }

    #[test]
    fn explicit_decision_marker() {
        let decisions = run(&[
            Message::user("Which database should we pick?").with_id("m1"),
            Message::user("Decision: Use PostgreSQL for storage.").with_id("m2"),
        ]);
        assert_eq!(decisions.len(), 1);
        let d = &decisions[0];
        assert_eq!(d.id, "dec_1");
        assert_eq!(d.chosen_option, "Use PostgreSQL for storage.");
        assert_eq!(d.decision_quality, DecisionQuality::Explicit);
        assert_eq!(d.confidence, Confidence::High);
        assert_eq!(d.intent, DecisionIntent::Decide);
        assert_eq!(d.context_refs, vec!["m1", "m2"]);
    }

    #[test]
    fn user_non_explicit_matches_are_ignored() {
        let decisions = run(&[Message::user("I recommend using Redis for the session cache.")]);
        assert!(decisions.is_empty());
    }

    #[test]
    fn assistant_recommendation_is_implicit() {
        let decisions = run(&[Message::assistant(
            "I recommend using Redis for the session cache. It is simple to run.",
        )]);
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].intent, DecisionIntent::Recommend);
        assert_eq!(decisions[0].decision_quality, DecisionQuality::Implicit);
        assert_eq!(decisions[0].chosen_option, "Redis for the session cache.");
    }

    #[test]
    fn unrecoverable_choice_is_unknown() {
        let decisions = run(&[Message::assistant("We could try it.")]);
        assert_eq!(decisions.len(), 1);
        assert!(decisions[0].is_unknown());
        assert_eq!(decisions[0].excerpt, "We could try it.");
    }

    #[test]
    fn code_blocks_do_not_produce_decisions() {
        let decisions = run(&[Message::assistant(
            "```\n// Decision: use unsafe pointer math\nlet p = x as *mut u8;\n```",
        )]);
        assert!(decisions.is_empty());
    }

    #[test]
    fn sorted_by_confidence_and_deduped() {
        let decisions = run(&[
            Message::assistant("We could cache the rendered pages in memory.").with_id("a"),
            Message::assistant("Let's go with PostgreSQL for the primary store.").with_id("b"),
            Message::assistant("Let's go with PostgreSQL for the primary store!").with_id("c"),
        ]);
        assert_eq!(decisions.len(), 2);
        assert_eq!(decisions[0].confidence, Confidence::High);
        assert_eq!(decisions[0].id, "dec_1");
        assert_eq!(decisions[1].confidence, Confidence::Low);
    }

    #[test]
    fn long_messages_are_chunked_not_skipped() {
        let filler = "This paragraph talks about unrelated background details. ".repeat(30);
        let text = format!("{filler}We decided to migrate the queue to NATS JetStream.");
        let decisions = run(&[Message::assistant(text)]);
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].chosen_option, "migrate the queue to NATS JetStream.");
    }

    #[test]
    fn cap_follows_budget() {
        let messages: Vec<Message> = (0..30)
            .map(|i| {
                Message::assistant(format!(
                    "Decision: adopt component{i} alpha{i} beta{i} gamma{i} for subsystem{i}."
                ))
            })
            .collect();
        let mut b = budget();
        b.max_decisions = 10;
        let decisions =
            extract_decisions(&Corpus::build(&messages), &b, &ExtractionConfig::default());
        assert_eq!(decisions.len(), 10);
    }

    #[test]
    fn choice_validation() {
        assert!(is_valid_choice("Use PostgreSQL for storage."));
        assert!(!is_valid_choice("it"));
        assert!(!is_valid_choice("Redis"));
        assert!(is_valid_choice("PostgreSQLdatabase"));
        assert!(!is_valid_choice("map[k] = f(x) { y }"));
    }

    #[test]
    fn sanitize_cuts_at_sentence_end() {
        assert_eq!(sanitize_choice(":  Use   v1.2 now. Then more"), "Use v1.2 now.");
    }
}
