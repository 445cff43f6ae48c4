//! Progressive summaries at three zoom levels.
//!
//! - L1 (glance, ≤100 chars): one sentence picked from the context summary
//! - L2 (context, ≤500 chars): a fixed template over the extracted items
//! - L3 (detailed): one line per cognitive day or macro phase

use handoff_core::{
    CognitiveDay, Confidence, DaySummary, Decision, DecisionIntent, DecisionQuality, Insight,
    MacroPhase, ProgressiveSummary, Topic,
};
use handoff_extract::tokenize::{split_sentences, truncate_chars};
use regex::Regex;
use std::sync::LazyLock;

pub const L1_MAX_CHARS: usize = 100;
pub const L2_MAX_CHARS: usize = 500;

const CONTEXT_DECISIONS: usize = 5;
const CONTEXT_INSIGHTS: usize = 3;
const L2_TOPICS: usize = 5;
const L2_DECISIONS: usize = 3;
const SENTENCE_MIN: usize = 20;
const SENTENCE_MAX: usize = 150;

static DECISION_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:decided|decision|committed|chose|chosen|adopt\w*|recommended|architecture|fix|go\s+with|décid\w*)\b",
    )
    .unwrap()
});
static IMPORTANCE_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:important|critical|crucial|key|must|root\s+cause|blocker|essentiel|critique)\b",
    )
    .unwrap()
});

/// Everything the summarizer reads. All of it comes from earlier stages.
#[derive(Debug, Clone, Copy)]
pub struct SummaryInputs<'a> {
    pub context: &'a str,
    pub topics: &'a [Topic],
    pub decisions: &'a [Decision],
    pub insights: &'a [Insight],
    pub days: &'a [CognitiveDay],
    pub phases: &'a [MacroPhase],
    pub goal: Option<&'a str>,
    pub message_count: usize,
}

/// A short paragraph built from decisions and the top insights.
pub fn context_summary(decisions: &[Decision], insights: &[Insight]) -> String {
    let mut sentences: Vec<String> = Vec::new();
    for decision in decisions.iter().take(CONTEXT_DECISIONS) {
        if decision.is_unknown() {
            sentences.push(with_period(&decision.excerpt));
        } else {
            sentences.push(format!(
                "{}: {}",
                intent_lead(decision.intent),
                with_period(&decision.chosen_option)
            ));
        }
    }
    sentences.extend(
        insights
            .iter()
            .take(CONTEXT_INSIGHTS)
            .map(|i| with_period(&i.text)),
    );
    sentences.retain(|s| !s.is_empty());
    sentences.join(" ")
}

pub fn summarize(inputs: &SummaryInputs<'_>) -> ProgressiveSummary {
    let l1 = glance(inputs);
    let l2 = context(inputs);
    let l3 = detailed(inputs, &l1);
    ProgressiveSummary { l1, l2, l3 }
}

fn glance(inputs: &SummaryInputs<'_>) -> String {
    let candidates: Vec<&str> = split_sentences(inputs.context)
        .into_iter()
        .filter(|s| (SENTENCE_MIN..=SENTENCE_MAX).contains(&s.chars().count()))
        .collect();

    let picked = candidates
        .iter()
        .find(|s| DECISION_WORDS.is_match(s))
        .or_else(|| candidates.iter().find(|s| IMPORTANCE_WORDS.is_match(s)))
        .map(|s| s.to_string())
        .or_else(|| inputs.goal.map(str::to_string))
        .unwrap_or_else(|| synthesis(inputs));
    truncate_chars(&picked, L1_MAX_CHARS)
}

fn synthesis(inputs: &SummaryInputs<'_>) -> String {
    let labels: Vec<&str> = inputs.topics.iter().take(3).map(|t| t.label.as_str()).collect();
    let decision = inputs.decisions.iter().find(|d| !d.is_unknown());
    match (labels.is_empty(), decision) {
        (false, Some(d)) => format!("{}; decided: {}", labels.join(", "), d.chosen_option),
        (false, None) => format!("Discussion of {}", labels.join(", ")),
        (true, Some(d)) => format!("Decided: {}", d.chosen_option),
        (true, None) => format!("Conversation of {} messages", inputs.message_count),
    }
}

fn context(inputs: &SummaryInputs<'_>) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(subject) = inputs.topics.first() {
        parts.push(format!("Subject: {}", subject.label));
    }
    if let Some(goal) = inputs.goal {
        parts.push(format!("Goal: {}", strip_period(goal)));
    }
    if !inputs.topics.is_empty() {
        let labels: Vec<&str> = inputs
            .topics
            .iter()
            .take(L2_TOPICS)
            .map(|t| t.label.as_str())
            .collect();
        parts.push(format!("Topics: {}", labels.join(", ")));
    }

    let strong: Vec<&str> = inputs
        .decisions
        .iter()
        .filter(|d| {
            !d.is_unknown()
                && (d.decision_quality == DecisionQuality::Explicit
                    || d.confidence == Confidence::High)
        })
        .take(L2_DECISIONS)
        .map(|d| strip_period(&d.chosen_option))
        .collect();
    if !strong.is_empty() {
        parts.push(format!("Decisions: {}", strong.join("; ")));
    }
    if let Some(insight) = inputs.insights.first() {
        parts.push(format!("Key insight: {}", strip_period(&insight.text)));
    }
    parts.push(format!("Messages: {}", inputs.message_count));

    truncate_chars(&format!("{}.", parts.join(". ")), L2_MAX_CHARS)
}

fn detailed(inputs: &SummaryInputs<'_>, l1: &str) -> Vec<DaySummary> {
    if !inputs.days.is_empty() {
        return inputs
            .days
            .iter()
            .map(|day| {
                let scoped = day.decisions_in_scope.len();
                let headline = match scoped {
                    0 => day.key_shift.clone(),
                    1 => format!("{} (1 decision)", day.key_shift),
                    n => format!("{} ({n} decisions)", day.key_shift),
                };
                DaySummary {
                    id: day.day_id.clone(),
                    range: day.range,
                    headline,
                }
            })
            .collect();
    }

    if !inputs.phases.is_empty() {
        return inputs
            .phases
            .iter()
            .map(|phase| DaySummary {
                id: format!("phase_{}", phase.phase),
                range: phase.range,
                headline: if phase.keywords.is_empty() {
                    format!("Phase {}", phase.phase)
                } else {
                    format!("Phase {}: {}", phase.phase, phase.keywords.join(", "))
                },
            })
            .collect();
    }

    vec![DaySummary {
        id: "summary".to_string(),
        range: [0, inputs.message_count.saturating_sub(1)],
        headline: l1.to_string(),
    }]
}

fn intent_lead(intent: DecisionIntent) -> &'static str {
    match intent {
        DecisionIntent::Decide => "Decided",
        DecisionIntent::Commit => "Committed to",
        DecisionIntent::Architecture => "Architecture",
        DecisionIntent::Fix => "Fix",
        DecisionIntent::Recommend => "Recommended",
        DecisionIntent::Compare => "Preferred",
        DecisionIntent::Propose => "Proposed",
    }
}

fn with_period(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() || text.ends_with(['.', '!', '?']) {
        text.to_string()
    } else {
        format!("{text}.")
    }
}

fn strip_period(text: &str) -> &str {
    text.trim().trim_end_matches('.')
}
