//! Ultra pruning: keep only what survives a tight size budget.

use handoff_config::ProfilesConfig;
use handoff_core::{Confidence, Decision, Insight, PruneStats, Topic};

#[derive(Debug, Clone, Default)]
pub struct Pruned {
    pub topics: Vec<Topic>,
    pub decisions: Vec<Decision>,
    pub insights: Vec<Insight>,
    pub stats: PruneStats,
}

/// Topics strictly above the weight threshold, decisions that are either
/// high-confidence or carry a critical intent, and the top insights.
/// Relative order is kept.
pub fn prune(
    topics: Vec<Topic>,
    decisions: Vec<Decision>,
    insights: Vec<Insight>,
    config: &ProfilesConfig,
) -> Pruned {
    let mut stats = PruneStats::default();

    let before = topics.len();
    let topics: Vec<Topic> = topics
        .into_iter()
        .filter(|t| t.weight > config.ultra_topic_min_weight)
        .collect();
    stats.topics_dropped = before - topics.len();

    let before = decisions.len();
    let decisions: Vec<Decision> = decisions
        .into_iter()
        .filter(|d| d.confidence == Confidence::High || d.intent.is_critical())
        .collect();
    stats.decisions_dropped = before - decisions.len();

    let before = insights.len();
    let mut insights = insights;
    insights.truncate(config.ultra_max_insights);
    stats.insights_dropped = before - insights.len();

    Pruned {
        topics,
        decisions,
        insights,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handoff_core::{DecisionIntent, DecisionQuality};

    fn topic(label: &str, weight: u32) -> Topic {
        Topic {
            label: label.into(),
            weight,
            message_refs: vec![],
            summary: String::new(),
        }
    }

    fn decision(id: &str, intent: DecisionIntent, confidence: Confidence) -> Decision {
        Decision {
            id: id.into(),
            intent,
            chosen_option: "use the replica for reads".into(),
            context_refs: vec!["m1".into()],
            decision_quality: DecisionQuality::Implicit,
            confidence,
            excerpt: String::new(),
        }
    }

    fn insight(i: usize) -> Insight {
        Insight {
            text: format!("insight number {i}"),
            priority: 5,
            kind: "important_note".into(),
            message_ref: "m1".into(),
        }
    }

    #[test]
    fn applies_each_rule() {
        let pruned = prune(
            vec![topic("replica", 900), topic("misc", 300), topic("reads", 500)],
            vec![
                decision("dec_1", DecisionIntent::Propose, Confidence::High),
                decision("dec_2", DecisionIntent::Fix, Confidence::Low),
                decision("dec_3", DecisionIntent::Recommend, Confidence::Medium),
            ],
            (0..8).map(insight).collect(),
            &ProfilesConfig::default(),
        );

        let labels: Vec<&str> = pruned.topics.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, ["replica"]);
        let ids: Vec<&str> = pruned.decisions.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["dec_1", "dec_2"]);
        assert_eq!(pruned.insights.len(), 5);
        assert_eq!(
            pruned.stats,
            PruneStats {
                topics_dropped: 2,
                decisions_dropped: 1,
                insights_dropped: 3,
            }
        );
        assert_eq!(pruned.stats.total(), 6);
    }

    #[test]
    fn threshold_weight_is_dropped() {
        let config = ProfilesConfig::default();
        let at = config.ultra_topic_min_weight;
        let pruned = prune(
            vec![topic("at", at), topic("above", at + 1)],
            vec![],
            vec![],
            &config,
        );
        assert_eq!(pruned.topics.len(), 1);
        assert_eq!(pruned.topics[0].label, "above");
        assert_eq!(pruned.stats.topics_dropped, 1);
    }

    #[test]
    fn nothing_to_prune() {
        let pruned = prune(vec![], vec![], vec![], &ProfilesConfig::default());
        assert_eq!(pruned.stats.total(), 0);
    }
}
