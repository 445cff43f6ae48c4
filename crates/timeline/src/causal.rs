//! Causal chain linking: trigger → decision → implementation → outcome.

use handoff_config::CausalConfig;
use handoff_core::{
    CausalChain, ChangeKind, Confidence, Decision, DecisionQuality, FileChange, Implementation,
    ImplementationKind, Insight, Outcome, OutcomeStatus, Trigger, TriggerKind,
};
use handoff_extract::{Corpus, similarity};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

const TRIGGER_WEIGHT: f64 = 0.20;
const QUALITY_WEIGHT: f64 = 0.30;
const IMPLEMENTATION_WEIGHT: f64 = 0.25;
const OUTCOME_WEIGHT: f64 = 0.25;

const INFERRED_TRIGGER: &str = "inferred from conversation context";
const UNTRACKED: &str = "implicit/untracked";

static FAILURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:failed|fails|failing|broken|broke|regression|crash(?:es|ed)?|échoue|cassé)\b")
        .unwrap()
});
static SUCCESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:works|worked|working\s+now|fixed|resolved|succeeded|passes|passing|shipped|ça\s+marche|résolu|corrigé)\b",
    )
    .unwrap()
});

pub fn link_causal_chains(
    corpus: &Corpus,
    decisions: &[Decision],
    insights: &[Insight],
    file_changes: &[FileChange],
    config: &CausalConfig,
) -> Vec<CausalChain> {
    // transcript order, not confidence order
    let mut ordered: Vec<(usize, &Decision)> = decisions
        .iter()
        .map(|d| (message_position(corpus, d), d))
        .collect();
    ordered.sort_by_key(|(pos, _)| *pos);
    ordered.truncate(config.max_decisions);

    let mut chains: Vec<CausalChain> = ordered
        .into_iter()
        .map(|(pos, decision)| {
            let trigger = find_trigger(decision, insights, file_changes, config.trigger_similarity);
            let implementation = find_implementation(decision, file_changes);
            let outcome = find_outcome(corpus, decision, pos, &implementation, insights);
            let impact_score = impact(decision, &trigger, &implementation, &outcome);
            CausalChain {
                chain_id: String::new(),
                trigger,
                decision_id: decision.id.clone(),
                implementation,
                outcome,
                impact_score,
            }
        })
        .filter(|c| c.impact_score >= config.min_impact)
        .collect();

    chains.sort_by(|a, b| b.impact_score.total_cmp(&a.impact_score));
    chains.truncate(config.max_chains);
    for (i, chain) in chains.iter_mut().enumerate() {
        chain.chain_id = format!("chain_{}", i + 1);
    }

    debug!(chains = chains.len(), decisions = decisions.len(), "Causal linking complete");
    chains
}

fn message_position(corpus: &Corpus, decision: &Decision) -> usize {
    decision
        .context_refs
        .last()
        .and_then(|id| corpus.position(id))
        .unwrap_or(usize::MAX)
}

fn find_trigger(
    decision: &Decision,
    insights: &[Insight],
    file_changes: &[FileChange],
    min_similarity: f64,
) -> Trigger {
    let text = decision.text();
    let mut best: Option<(&Insight, f64)> = None;
    for insight in insights {
        let sim = similarity(text, &insight.text);
        if sim > min_similarity && best.is_none_or(|(_, b)| sim > b) {
            best = Some((insight, sim));
        }
    }
    if let Some((insight, _)) = best {
        return Trigger {
            kind: TriggerKind::Insight,
            text: insight.text.clone(),
        };
    }

    if let Some(change) = mentioned_file(decision, file_changes) {
        return Trigger {
            kind: TriggerKind::FileChange,
            text: change.path.clone(),
        };
    }

    Trigger {
        kind: TriggerKind::Inferred,
        text: INFERRED_TRIGGER.to_string(),
    }
}

/// A file change whose stem appears in the decision's text or excerpt.
fn mentioned_file<'a>(
    decision: &Decision,
    file_changes: &'a [FileChange],
) -> Option<&'a FileChange> {
    let haystack = format!("{} {}", decision.chosen_option, decision.excerpt).to_lowercase();
    file_changes
        .iter()
        .find(|c| c.stem().is_some_and(|stem| haystack.contains(&stem)))
}

fn find_implementation(decision: &Decision, file_changes: &[FileChange]) -> Implementation {
    let own_message = decision.context_refs.last();
    let by_message = file_changes
        .iter()
        .find(|c| c.message_id.is_some() && c.message_id.as_ref() == own_message);

    match by_message.or_else(|| mentioned_file(decision, file_changes)) {
        Some(change) => Implementation {
            kind: ImplementationKind::Tracked,
            detail: format!("{} {}", change_verb(change.change), change.path),
        },
        None => Implementation {
            kind: ImplementationKind::Untracked,
            detail: UNTRACKED.to_string(),
        },
    }
}

fn change_verb(kind: ChangeKind) -> &'static str {
    match kind {
        ChangeKind::Created => "created",
        ChangeKind::Modified => "modified",
        ChangeKind::Deleted => "deleted",
    }
}

/// Confident and tracked counts as success. Otherwise the first insight at
/// or after the decision that reads as a success or failure decides.
fn find_outcome(
    corpus: &Corpus,
    decision: &Decision,
    position: usize,
    implementation: &Implementation,
    insights: &[Insight],
) -> Outcome {
    if decision.confidence.score() > 70 && implementation.is_concrete() {
        return Outcome {
            status: OutcomeStatus::Success,
            evidence: Some(implementation.detail.clone()),
        };
    }

    let mut later: Vec<(usize, &Insight)> = insights
        .iter()
        .filter_map(|i| corpus.position(&i.message_ref).map(|p| (p, i)))
        .filter(|(p, _)| *p >= position || position == usize::MAX)
        .collect();
    later.sort_by_key(|(p, _)| *p);

    for (_, insight) in later {
        if FAILURE.is_match(&insight.text) {
            return Outcome {
                status: OutcomeStatus::Failure,
                evidence: Some(insight.text.clone()),
            };
        }
        if SUCCESS.is_match(&insight.text) {
            return Outcome {
                status: OutcomeStatus::Success,
                evidence: Some(insight.text.clone()),
            };
        }
    }

    Outcome {
        status: OutcomeStatus::Pending,
        evidence: None,
    }
}

fn impact(
    decision: &Decision,
    trigger: &Trigger,
    implementation: &Implementation,
    outcome: &Outcome,
) -> f64 {
    let trigger_score = match trigger.kind {
        TriggerKind::Insight => 1.0,
        TriggerKind::FileChange => 0.8,
        TriggerKind::Inferred => 0.1,
    };
    let quality_base = match decision.decision_quality {
        DecisionQuality::Explicit => 1.0,
        DecisionQuality::Implicit => 0.6,
    };
    let confidence_factor = match decision.confidence {
        Confidence::High => 1.0,
        Confidence::Medium => 0.75,
        Confidence::Low => 0.5,
    };
    let implementation_score = if implementation.is_concrete() { 1.0 } else { 0.3 };
    let outcome_score = match outcome.status {
        OutcomeStatus::Success => 1.0,
        OutcomeStatus::Failure => 0.6,
        OutcomeStatus::Pending => 0.3,
    };

    let raw = TRIGGER_WEIGHT * trigger_score
        + QUALITY_WEIGHT * quality_base * confidence_factor
        + IMPLEMENTATION_WEIGHT * implementation_score
        + OUTCOME_WEIGHT * outcome_score;
    (raw.clamp(0.0, 1.0) * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use handoff_core::{DecisionIntent, Message};

    fn corpus() -> Corpus {
        Corpus::build(&[
            Message::user("The connection pool keeps timing out").with_id("m0"),
            Message::assistant("Decision: raise the connection pool size to fifty.").with_id("m1"),
            Message::assistant("The fix works, tests are passing now").with_id("m2"),
        ])
    }

    fn decision(id: &str, quality: DecisionQuality, confidence: Confidence, msg: &str) -> Decision {
        Decision {
            id: id.into(),
            intent: DecisionIntent::Decide,
            chosen_option: "raise the connection pool size to fifty.".into(),
            context_refs: vec!["m0".into(), msg.into()],
            decision_quality: quality,
            confidence,
            excerpt: "Decision: raise the connection pool size to fifty.".into(),
        }
    }

    fn insight(text: &str, msg: &str) -> Insight {
        Insight {
            text: text.into(),
            priority: 6,
            kind: "outcome".into(),
            message_ref: msg.into(),
        }
    }

    #[test]
    fn fully_linked_chain_scores_high() {
        let changes = vec![FileChange {
            path: "src/db/pool.rs".into(),
            change: ChangeKind::Modified,
            message_id: Some("m1".into()),
        }];
        let insights = vec![insight("The connection pool size was the root cause", "m0")];
        let chains = link_causal_chains(
            &corpus(),
            &[decision("dec_1", DecisionQuality::Explicit, Confidence::High, "m1")],
            &insights,
            &changes,
            &CausalConfig::default(),
        );
        assert_eq!(chains.len(), 1);
        let chain = &chains[0];
        assert_eq!(chain.chain_id, "chain_1");
        assert_eq!(chain.trigger.kind, TriggerKind::Insight);
        assert_eq!(chain.implementation.kind, ImplementationKind::Tracked);
        assert_eq!(chain.implementation.detail, "modified src/db/pool.rs");
        assert_eq!(chain.outcome.status, OutcomeStatus::Success);
        assert_eq!(chain.impact_score, 1.0);
    }

    #[test]
    fn file_stem_is_a_trigger_fallback() {
        let changes = vec![FileChange::new("src/pool.rs", ChangeKind::Modified)];
        let chains = link_causal_chains(
            &corpus(),
            &[decision("dec_1", DecisionQuality::Explicit, Confidence::High, "m1")],
            &[],
            &changes,
            &CausalConfig::default(),
        );
        assert_eq!(chains[0].trigger.kind, TriggerKind::FileChange);
        assert_eq!(chains[0].trigger.text, "src/pool.rs");
    }

    #[test]
    fn outcome_from_later_insight() {
        let chains = link_causal_chains(
            &corpus(),
            &[decision("dec_1", DecisionQuality::Implicit, Confidence::Medium, "m1")],
            &[insight("The fix works, tests are passing now", "m2")],
            &[],
            &CausalConfig::default(),
        );
        assert_eq!(chains[0].outcome.status, OutcomeStatus::Success);
        assert_eq!(chains[0].implementation.detail, UNTRACKED);
    }

    #[test]
    fn weak_chains_are_dropped() {
        // inferred 0.02 + implicit/low 0.09 + untracked 0.075 + pending 0.075 = 0.26
        let chains = link_causal_chains(
            &corpus(),
            &[decision("dec_1", DecisionQuality::Implicit, Confidence::Low, "m1")],
            &[],
            &[],
            &CausalConfig::default(),
        );
        assert!(chains.is_empty());
    }

    #[test]
    fn sorted_by_impact_and_capped() {
        let decisions: Vec<Decision> = (0..5)
            .map(|i| {
                let confidence = if i % 2 == 0 { Confidence::High } else { Confidence::Medium };
                decision(&format!("dec_{i}"), DecisionQuality::Explicit, confidence, "m1")
            })
            .collect();
        let config = CausalConfig {
            max_chains: 3,
            ..CausalConfig::default()
        };
        let chains = link_causal_chains(&corpus(), &decisions, &[], &[], &config);
        assert_eq!(chains.len(), 3);
        assert!(chains.windows(2).all(|w| w[0].impact_score >= w[1].impact_score));
        assert!(chains.iter().all(|c| (0.0..=1.0).contains(&c.impact_score)));
    }
}
