//! UltraPlus narrative and spine.
//!
//! Everything here is derived from fields that were already extracted:
//! the summaries, the pruned decisions and insights, the constraints and
//! the stated goal. No new reading of the transcript happens beyond
//! looking up message positions. The lexical triggers are best-effort and
//! the narrative is always marked `unverified`.

use handoff_core::{
    ConstraintSet, Decision, DecisionIntent, Insight, KeyDecision, Narrative, ProgressiveSummary,
    SemanticsMarker, Spine, Topic,
};
use handoff_extract::Corpus;
use handoff_extract::tokenize::{split_sentences, truncate_chars};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

const MAX_CHECKLIST: usize = 5;
const MAX_UNDEFINED_TERMS: usize = 10;
const MAX_SPINE_ITEMS: usize = 5;
const MAX_ITEM_CHARS: usize = 200;
const MAX_CONTEXT_TOPICS: usize = 3;

static CONDITIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:only\s+if|only\s+when|if|unless|as\s+long\s+as|provided\s+that|assuming|sauf\s+si|seulement\s+si|uniquement\s+si|tant\s+que|à\s+condition\s+que)\s+[^.;!?]{4,}",
    )
    .unwrap()
});
static ACRONYM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[A-Z]{2,6}\b").unwrap());
static ASSUMPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:assum\w*|presum\w*|probably|likely|expected\s+to|should\s+be\s+(?:fine|enough|safe)|we\s+think|suppos\w*|on\s+suppose|a\s+priori)\b",
    )
    .unwrap()
});
static REJECTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:instead\s+of|rather\s+than|(?:chose|chosen|picked|prefer(?:red)?)\s+[^,.;!?]+?\s+over\b|(?:decided|chose)\s+not\s+to\s+(?:use\s+|go\s+with\s+)?|plutôt\s+que|au\s+lieu\s+de)\s*(?P<alt>[^,.;!?]{3,80})",
    )
    .unwrap()
});
static RESOLVED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:resolved|fixed|works\s+now|answered|solved|résolu|corrigé)\b").unwrap()
});

/// Acronyms common enough that nobody expects them to be spelled out.
const COMMON_ACRONYMS: &[&str] = &[
    "API", "CLI", "CPU", "CSS", "CSV", "DB", "HTML", "HTTP", "HTTPS", "ID", "IO", "JSON", "OK",
    "OS", "PR", "RAM", "SQL", "TODO", "UI", "URL", "UTF", "XML", "YAML",
];

/// The extracted fields the narrative is allowed to read.
#[derive(Debug, Clone, Copy)]
pub struct NarrativeInputs<'a> {
    pub corpus: &'a Corpus,
    pub summary: &'a ProgressiveSummary,
    pub goal: Option<&'a str>,
    pub topics: &'a [Topic],
    pub decisions: &'a [Decision],
    pub insights: &'a [Insight],
    pub constraints: Option<&'a ConstraintSet>,
}

impl NarrativeInputs<'_> {
    /// Every extracted text fragment, in a stable order.
    fn texts(&self) -> Vec<&str> {
        let mut texts: Vec<&str> = Vec::new();
        for decision in self.decisions {
            texts.push(&decision.excerpt);
            if !decision.is_unknown() {
                texts.push(&decision.chosen_option);
            }
        }
        texts.extend(self.insights.iter().map(|i| i.text.as_str()));
        if let Some(constraints) = self.constraints {
            texts.extend(constraints.iter().map(|c| c.text.as_str()));
        }
        texts
    }
}

pub fn narrative(inputs: &NarrativeInputs<'_>, max_chars: usize) -> Narrative {
    Narrative {
        summary: narrative_summary(inputs, max_chars),
        validation_checklist: validation_checklist(inputs.decisions),
        undefined_terms: undefined_terms(&inputs.texts()),
        semantics: SemanticsMarker::Unverified,
    }
}

fn narrative_summary(inputs: &NarrativeInputs<'_>, max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    let glance = inputs.summary.l1.trim();
    if !glance.is_empty() {
        parts.push(glance.to_string());
    }
    if let Some(decision) = key_decision_source(inputs.decisions)
        && !glance.contains(decision.chosen_option.trim_end_matches('.'))
    {
        parts.push(format!("Decided: {}", decision.chosen_option));
    }
    if let Some(tension) = main_tension(inputs) {
        parts.push(format!("Open: {tension}"));
    }
    truncate_chars(&parts.join(" "), max_chars)
}

/// Conditional clauses in decision text, each turned into a check.
fn validation_checklist(decisions: &[Decision]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut checklist = Vec::new();
    for decision in decisions {
        for clause in CONDITIONAL.find_iter(&decision.excerpt) {
            let clause = clause.as_str().trim();
            if seen.insert(clause.to_lowercase()) {
                checklist.push(format!(
                    "Verify {}",
                    truncate_chars(clause, MAX_ITEM_CHARS)
                ));
            }
            if checklist.len() == MAX_CHECKLIST {
                return checklist;
            }
        }
    }
    checklist
}

/// Acronyms used somewhere in `texts` but never introduced with a
/// parenthesised expansion (`TERM (...)` or `(... TERM)`).
fn undefined_terms(texts: &[&str]) -> Vec<String> {
    let mut used: BTreeSet<&str> = BTreeSet::new();
    for text in texts {
        used.extend(ACRONYM.find_iter(text).map(|m| m.as_str()));
    }

    used.into_iter()
        .filter(|term| !COMMON_ACRONYMS.contains(term))
        .filter(|term| !texts.iter().any(|t| is_defined(t, term)))
        .take(MAX_UNDEFINED_TERMS)
        .map(str::to_string)
        .collect()
}

fn is_defined(text: &str, term: &str) -> bool {
    text.contains(&format!("{term} ("))
        || text.contains(&format!("({term})"))
        || text.contains(&format!(" {term})"))
}

pub fn spine(inputs: &NarrativeInputs<'_>) -> Spine {
    let glance = inputs.summary.l1.trim();
    let core_context = match inputs.goal {
        Some(goal) => truncate_chars(goal, MAX_ITEM_CHARS),
        None if !glance.is_empty() => glance.to_string(),
        None => topic_context(inputs.topics),
    };

    Spine {
        core_context,
        main_tension: main_tension(inputs),
        key_decision: key_decision_source(inputs.decisions).map(key_decision),
        assumptions: assumptions(inputs),
        rejected_alternatives: rejected_alternatives(inputs.decisions),
        open_questions: open_questions(inputs.insights),
    }
}

/// Last resort when neither a goal nor a glance summary exists.
fn topic_context(topics: &[Topic]) -> String {
    let labels: Vec<&str> = topics
        .iter()
        .take(MAX_CONTEXT_TOPICS)
        .map(|t| t.label.as_str())
        .collect();
    if labels.is_empty() {
        String::new()
    } else {
        format!("Discussion of {}", labels.join(", "))
    }
}

fn key_decision_source(decisions: &[Decision]) -> Option<&Decision> {
    decisions.iter().find(|d| !d.is_unknown())
}

fn key_decision(decision: &Decision) -> KeyDecision {
    let falsifiable_if = match CONDITIONAL.find(&decision.excerpt) {
        Some(clause) => format!(
            "The condition no longer holds: {}",
            truncate_chars(clause.as_str().trim(), MAX_ITEM_CHARS)
        ),
        None => format!(
            "A later turn reports that \"{}\" failed or was reverted",
            truncate_chars(decision.chosen_option.trim_end_matches('.'), MAX_ITEM_CHARS)
        ),
    };
    KeyDecision {
        decision_id: decision.id.clone(),
        statement: decision.chosen_option.clone(),
        falsifiable_if,
    }
}

/// The most recent blocker or question that no later text marks resolved.
fn main_tension(inputs: &NarrativeInputs<'_>) -> Option<String> {
    inputs
        .insights
        .iter()
        .filter(|i| matches!(i.kind.as_str(), "critical" | "question") || i.text.ends_with('?'))
        .filter(|i| !RESOLVED.is_match(&i.text))
        .max_by_key(|i| inputs.corpus.position(&i.message_ref).unwrap_or(0))
        .map(|i| truncate_chars(&i.text, MAX_ITEM_CHARS))
}

fn assumptions(inputs: &NarrativeInputs<'_>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    inputs
        .texts()
        .into_iter()
        .flat_map(split_sentences)
        .filter(|s| ASSUMPTION.is_match(s))
        .filter(|s| seen.insert(s.to_lowercase()))
        .take(MAX_SPINE_ITEMS)
        .map(|s| truncate_chars(s, MAX_ITEM_CHARS))
        .collect()
}

/// Alternatives named next to a choice, plus the excerpts of comparison
/// decisions.
fn rejected_alternatives(decisions: &[Decision]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for decision in decisions {
        for caps in REJECTED.captures_iter(&decision.excerpt) {
            if let Some(alt) = caps.name("alt") {
                let alt = alt.as_str().trim();
                if seen.insert(alt.to_lowercase()) {
                    out.push(alt.to_string());
                }
            }
        }
        if decision.intent == DecisionIntent::Compare
            && out.is_empty()
            && seen.insert(decision.excerpt.to_lowercase())
        {
            out.push(truncate_chars(&decision.excerpt, MAX_ITEM_CHARS));
        }
    }
    out.truncate(MAX_SPINE_ITEMS);
    out
}

fn open_questions(insights: &[Insight]) -> Vec<String> {
    insights
        .iter()
        .filter(|i| i.kind == "question" || i.text.ends_with('?'))
        .filter(|i| !RESOLVED.is_match(&i.text))
        .take(MAX_SPINE_ITEMS)
        .map(|i| truncate_chars(&i.text, MAX_ITEM_CHARS))
        .collect()
}
