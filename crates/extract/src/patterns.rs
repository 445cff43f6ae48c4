//! Static, ordered pattern tables.
//!
//! Each table is a list of `{name, pattern, tag}` rules compiled once on
//! first use. Matching is a first-match loop over the table, so table order
//! is category precedence. A rule whose regex fails to compile is skipped
//! with a warning; the rest of the table keeps working.

use handoff_core::{Confidence, ConstraintCategory, DecisionIntent};
use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::warn;

/// Source form of a table entry.
#[derive(Debug, Clone, Copy)]
pub struct Rule<T> {
    pub name: &'static str,
    pub pattern: &'static str,
    pub tag: T,
}

#[derive(Debug, Clone)]
pub struct CompiledRule<T> {
    pub name: &'static str,
    pub regex: Regex,
    pub tag: T,
}

pub fn compile<T: Copy>(rules: &[Rule<T>]) -> Vec<CompiledRule<T>> {
    rules
        .iter()
        .filter_map(|rule| match Regex::new(rule.pattern) {
            Ok(regex) => Some(CompiledRule {
                name: rule.name,
                regex,
                tag: rule.tag,
            }),
            Err(e) => {
                warn!(rule = rule.name, error = %e, "Skipping pattern that failed to compile");
                None
            }
        })
        .collect()
}

/// First rule (in table order) whose regex matches `text`.
pub fn first_match<'r, 'h, T>(
    rules: &'r [CompiledRule<T>],
    text: &'h str,
) -> Option<(&'r CompiledRule<T>, Captures<'h>)> {
    rules
        .iter()
        .find_map(|rule| rule.regex.captures(text).map(|caps| (rule, caps)))
}

// ── Decisions ────────────────────────────────────────────────────────────

/// Precedence bucket of a decision rule. Only [`DecisionCategory::Explicit`]
/// matches are accepted from user-authored messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionCategory {
    Explicit,
    Commitment,
    Architecture,
    Fix,
    Recommendation,
    Comparison,
    Proposal,
}

#[derive(Debug, Clone, Copy)]
pub struct DecisionTag {
    pub category: DecisionCategory,
    pub intent: DecisionIntent,
    pub confidence: Confidence,
}

const fn decision(
    name: &'static str,
    pattern: &'static str,
    category: DecisionCategory,
    intent: DecisionIntent,
    confidence: Confidence,
) -> Rule<DecisionTag> {
    Rule {
        name,
        pattern,
        tag: DecisionTag {
            category,
            intent,
            confidence,
        },
    }
}

use Confidence::{High, Low, Medium};
use DecisionCategory as C;
use DecisionIntent as I;

const DECISION_TABLE: &[Rule<DecisionTag>] = &[
    // explicit
    decision("explicit_marker", r"(?i)\b(?:final\s+)?d[ée]cision\s*:\s*(?P<choice>.+)", C::Explicit, I::Decide, High),
    decision("decided_to", r"(?i)\b(?:we|i)\s+(?:have\s+|'ve\s+|just\s+)?decided\s+(?:to\s+|on\s+|that\s+)?(?P<choice>.+)", C::Explicit, I::Decide, High),
    decision("decided_fr", r"(?i)\b(?:nous\s+avons|on\s+a|j'ai)\s+d[ée]cid[ée]\s+(?:de\s+|d'|que\s+)?(?P<choice>.+)", C::Explicit, I::Decide, High),
    // commitment
    decision("commit_go_with", r"(?i)\b(?:let's|let\s+us|we'll|we\s+will|i'll|i\s+will|we're\s+going\s+to)\s+(?:go\s+with|use|adopt|stick\s+with|switch\s+to|migrate\s+to)\s+(?P<choice>.+)", C::Commitment, I::Commit, High),
    decision("commit_fr", r"(?i)\b(?:on\s+va|nous\s+allons|je\s+vais)\s+(?:utiliser|adopter|partir\s+sur|passer\s+(?:à|a))\s+(?P<choice>.+)", C::Commitment, I::Commit, High),
    // architecture
    decision("architecture_will_be", r"(?i)\b(?:architecture|design|approach)\s+(?:will\s+be|is\s+to|should\s+be)\s+(?P<choice>.+)", C::Architecture, I::Architecture, Medium),
    decision("architecture_uses", r"(?i)\b(?:architecture|design)\s+(?:uses|relies\s+on|is\s+based\s+on)\s+(?P<choice>.+)", C::Architecture, I::Architecture, Medium),
    decision("architecture_fr", r"(?i)\bl'architecture\s+(?:sera|repose\s+sur|utilise)\s+(?P<choice>.+)", C::Architecture, I::Architecture, Medium),
    // fix
    decision("fix_is", r"(?i)\b(?:the\s+)?fix\s+(?:is|was|will\s+be)\s+(?:to\s+)?(?P<choice>.+)", C::Fix, I::Fix, Medium),
    decision("to_fix", r"(?i)\bto\s+fix\s+(?:this|it|the\s+\w+),?\s+(?P<choice>.+)", C::Fix, I::Fix, Medium),
    decision("solution_fr", r"(?i)\b(?:la\s+)?solution\s+(?:est|sera)\s+(?:de\s+|d')?(?P<choice>.+)", C::Fix, I::Fix, Medium),
    // recommendation
    decision("recommend", r"(?i)\bi\s+(?:would\s+|'d\s+|strongly\s+)?recommend\s+(?:using\s+|that\s+you\s+|to\s+)?(?P<choice>.+)", C::Recommendation, I::Recommend, Medium),
    decision("best_option", r"(?i)\b(?:the\s+)?best\s+(?:option|choice|approach)\s+(?:is|would\s+be)\s+(?:to\s+)?(?P<choice>.+)", C::Recommendation, I::Recommend, Medium),
    decision("you_should_use", r"(?i)\byou\s+should\s+(?:use|go\s+with|adopt|switch\s+to)\s+(?P<choice>.+)", C::Recommendation, I::Recommend, Medium),
    decision("recommend_fr", r"(?i)\bje\s+(?:vous\s+|te\s+)?recommande\s+(?:d'utiliser\s+|de\s+|d')?(?P<choice>.+)", C::Recommendation, I::Recommend, Medium),
    // comparison
    decision("better_than", r"(?i)\b(?P<choice>[\w.+#-]+(?:\s+[\w.+#-]+)?)\s+is\s+(?:better|faster|simpler|safer)\s+than\b", C::Comparison, I::Compare, Low),
    decision("prefer_over", r"(?i)\b(?:use|choose|prefer|pick)\s+(?P<choice>.+?)\s+(?:rather\s+than|instead\s+of|over)\s+", C::Comparison, I::Compare, Low),
    decision("plutot_que", r"(?i)\b(?:utiliser|choisir|prendre)\s+(?P<choice>.+?)\s+plutôt\s+que\b", C::Comparison, I::Compare, Low),
    // proposal
    decision("suggest", r"(?i)\b(?:i\s+(?:suggest|propose)|how\s+about|we\s+could|you\s+could|one\s+option\s+is(?:\s+to)?)\s+(?P<choice>.+)", C::Proposal, I::Propose, Low),
    decision("suggest_fr", r"(?i)\b(?:je\s+propose|on\s+pourrait|nous\s+pourrions)\s+(?:de\s+|d')?(?P<choice>.+)", C::Proposal, I::Propose, Low),
];

pub static DECISION_RULES: LazyLock<Vec<CompiledRule<DecisionTag>>> =
    LazyLock::new(|| compile(DECISION_TABLE));

/// Tried first when recovering the chosen option, regardless of which rule
/// matched.
pub static EXPLICIT_CHOICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:d[ée]cision|decided|chosen|choice|verdict)\s*:\s*(?P<choice>.+)").unwrap()
});

/// Last resort for the chosen option: whatever follows a commitment verb.
pub static GENERIC_CHOICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:use|using|go\s+with|adopt|switch\s+to|choose|utiliser|adopter)\s+(?P<choice>.+)",
    )
    .unwrap()
});

// ── Insights ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct InsightTag {
    pub kind: &'static str,
    pub priority: u8,
}

const fn insight(name: &'static str, pattern: &'static str, priority: u8) -> Rule<InsightTag> {
    Rule {
        name,
        pattern,
        tag: InsightTag { kind: name, priority },
    }
}

const INSIGHT_TABLE: &[Rule<InsightTag>] = &[
    insight("critical", r"(?i)\b(?:critical(?:ly)?|crucial|blocker|blocking|breaking\s+change|critique|bloquant)\b", 10),
    insight("root_cause", r"(?i)\b(?:root\s+cause|the\s+(?:real\s+)?(?:problem|issue|bug)\s+(?:is|was)|caused\s+by|la\s+cause|à\s+cause\s+de)\b", 9),
    insight("lesson", r"(?i)\b(?:lessons?\s+learned|learned\s+that|takeaway|in\s+hindsight|next\s+time|leçon|à\s+retenir)\b", 8),
    insight("discovery", r"(?i)\b(?:turns\s+out|it\s+appears|i\s+(?:found|noticed|realized|discovered)|we\s+(?:found|discovered)|on\s+a\s+découvert|j'ai\s+remarqué|il\s+s'avère)\b", 7),
    insight("outcome", r"(?i)\b(?:works\s+now|now\s+works|is\s+fixed|was\s+fixed|resolved|succeeded|tests?\s+pass(?:es|ed)?|failed|fails|broke|still\s+broken|ça\s+marche|résolu|corrigé|échoue)\b", 6),
    insight("important_note", r"(?i)\b(?:important|note\s+that|keep\s+in\s+mind|remember\s+that|à\s+noter|attention)\b", 5),
    insight("question", r"(?i)\b(?:open\s+question|unclear|not\s+sure|unsure|to\s+be\s+decided|tbd|still\s+need\s+to\s+figure|à\s+vérifier|pas\s+sûr)\b", 4),
    insight("tradeoff", r"(?i)\b(?:trade-?offs?|downside|drawback|on\s+the\s+other\s+hand|at\s+the\s+cost\s+of|inconvénient|compromis)\b", 4),
];

pub static INSIGHT_RULES: LazyLock<Vec<CompiledRule<InsightTag>>> =
    LazyLock::new(|| compile(INSIGHT_TABLE));

// ── Constraints ──────────────────────────────────────────────────────────

const fn constraint(
    name: &'static str,
    pattern: &'static str,
    category: ConstraintCategory,
) -> Rule<ConstraintCategory> {
    Rule {
        name,
        pattern,
        tag: category,
    }
}

const CONSTRAINT_TABLE: &[Rule<ConstraintCategory>] = &[
    constraint("dont", r"(?i)\b(?:don't|do\s+not|never|avoid|must\s+not|mustn't|should\s+not|shouldn't|no\s+longer)\b", ConstraintCategory::Dont),
    constraint("dont_fr", r"(?i)\b(?:ne\s+(?:\w+\s+)?(?:pas|jamais)|n'\w+\s+(?:pas|jamais)|évite[rz]?|interdit)\b", ConstraintCategory::Dont),
    constraint("do", r"(?i)\b(?:always|must|make\s+sure|ensure|be\s+sure\s+to|need\s+to|required)\b", ConstraintCategory::Do),
    constraint("do_fr", r"(?i)\b(?:il\s+faut|toujours|doit|doivent|assure[rz]?-vous)\b", ConstraintCategory::Do),
    constraint("technical", r"(?i)\b(?:requires|depends\s+on|compatible\s+with|only\s+supports?|not\s+supported|limited\s+to|version\s+\d[\w.]*|api\s+limits?)\b", ConstraintCategory::Technical),
    constraint("technical_fr", r"(?i)\b(?:dépend\s+de|compatible\s+avec|nécessite|uniquement\s+compatible)\b", ConstraintCategory::Technical),
    constraint("performance", r"(?i)\b(?:latency|throughput|performance|memory\s+usage|under\s+\d+\s*(?:ms|s|mb|gb)|within\s+\d+\s*(?:ms|s|seconds?)|timeouts?|p9[59])\b", ConstraintCategory::Performance),
    constraint("performance_fr", r"(?i)\b(?:latence|débit|mémoire|temps\s+de\s+réponse)\b", ConstraintCategory::Performance),
    constraint("security", r"(?i)\b(?:security|secure|secrets?|credentials?|passwords?|api\s+keys?|encrypt(?:ed|ion)?|authentication|authorization|permissions?|injection|xss|csrf)\b", ConstraintCategory::Security),
    constraint("security_fr", r"(?i)\b(?:sécurité|chiffr\w*|mot\s+de\s+passe|authentification)\b", ConstraintCategory::Security),
];

pub static CONSTRAINT_RULES: LazyLock<Vec<CompiledRule<ConstraintCategory>>> =
    LazyLock::new(|| compile(CONSTRAINT_TABLE));

/// Rules of one constraint category, in table order.
pub fn constraint_rules(
    category: ConstraintCategory,
) -> impl Iterator<Item = &'static CompiledRule<ConstraintCategory>> {
    CONSTRAINT_RULES.iter().filter(move |r| r.tag == category)
}
