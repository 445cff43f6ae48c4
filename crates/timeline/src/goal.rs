//! Stated-goal mining from user turns.

use handoff_core::Role;
use handoff_extract::Corpus;
use handoff_extract::tokenize::{split_sentences, truncate_chars};
use regex::Regex;
use std::sync::LazyLock;

const MAX_GOAL_CHARS: usize = 200;

static GOAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:i\s+want\s+to|i\s+need\s+to|i'd\s+like\s+to|i\s+would\s+like\s+to|my\s+goal\s+is|the\s+goal\s+is|we\s+want\s+to|trying\s+to|help\s+me|je\s+veux|j'aimerais|mon\s+objectif|l'objectif\s+est|aide-moi)\b",
    )
    .unwrap()
});

/// First user-authored sentence that states what the user is after.
pub fn stated_goal(corpus: &Corpus) -> Option<String> {
    corpus
        .entries()
        .iter()
        .filter(|e| e.role == Role::User)
        .flat_map(|e| split_sentences(&e.text))
        .find(|s| GOAL.is_match(s))
        .map(|s| truncate_chars(s, MAX_GOAL_CHARS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use handoff_core::Message;

    #[test]
    fn finds_first_user_goal() {
        let corpus = Corpus::build(&[
            Message::assistant("I want to help you with that.").with_id("a"),
            Message::user("Hi there. I need to migrate our billing service to Postgres.").with_id("b"),
            Message::user("My goal is zero downtime.").with_id("c"),
        ]);
        assert_eq!(
            stated_goal(&corpus).as_deref(),
            Some("I need to migrate our billing service to Postgres.")
        );
    }

    #[test]
    fn french_goal() {
        let corpus = Corpus::build(&[Message::user("Je veux automatiser les sauvegardes.")]);
        assert!(stated_goal(&corpus).is_some());
    }

    #[test]
    fn no_goal() {
        let corpus = Corpus::build(&[Message::user("What time is it?")]);
        assert!(stated_goal(&corpus).is_none());
    }
}
