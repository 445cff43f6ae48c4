//! Extraction output types: topics, decisions, insights and constraints.

use serde::{Deserialize, Serialize};

/// Sentinel used when a decision was detected but its chosen option could
/// not be recovered cleanly.
pub const UNKNOWN_OPTION: &str = "UNKNOWN";

/// A weighted topic with pointers back into the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub label: String,
    /// Rank + frequency score in `[200, 1000]`.
    pub weight: u32,
    /// IDs of the most recent messages mentioning the topic, in transcript order.
    pub message_refs: Vec<String>,
    pub summary: String,
}

/// Overall outcome of the topic pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    Extracted,
    Partial,
    Empty,
}

/// Trust signals emitted alongside the topics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicQuality {
    pub method: String,
    /// Topics found relative to the size-dependent target, capped at 1.0.
    pub coverage: f64,
    pub target_topics: usize,
    pub average_weight: f64,
    /// A label contains a conversational filler word.
    pub stopword_collision: bool,
    pub status: ExtractionStatus,
}

impl TopicQuality {
    pub fn empty(method: &str, target_topics: usize) -> Self {
        Self {
            method: method.to_string(),
            coverage: 0.0,
            target_topics,
            average_weight: 0.0,
            stopword_collision: false,
            status: ExtractionStatus::Empty,
        }
    }
}

/// Topics plus their quality metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicExtraction {
    pub topics: Vec<Topic>,
    pub quality: TopicQuality,
}

/// Per-stage health for extractors that may legitimately find nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    /// Produced at least one item
    Ok,
    /// Ran cleanly, matched nothing
    Empty,
    /// Failed internally and was downgraded to an empty result
    Degraded,
}

impl StageStatus {
    pub fn from_count(count: usize) -> Self {
        if count == 0 { Self::Empty } else { Self::Ok }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionIntent {
    Decide,
    Recommend,
    Propose,
    Commit,
    Compare,
    Architecture,
    Fix,
}

impl DecisionIntent {
    /// Intents that survive Ultra pruning regardless of confidence.
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::Decide | Self::Architecture | Self::Fix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionQuality {
    Explicit,
    Implicit,
}

/// Ordered so that sorting ascending puts `High` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Numeric confidence on a 0-100 scale.
    pub fn score(&self) -> u8 {
        match self {
            Self::High => 90,
            Self::Medium => 60,
            Self::Low => 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,
    pub intent: DecisionIntent,
    /// The chosen option, or [`UNKNOWN_OPTION`].
    pub chosen_option: String,
    /// Matching message and its predecessor, in transcript order.
    pub context_refs: Vec<String>,
    pub decision_quality: DecisionQuality,
    pub confidence: Confidence,
    /// The sanitized sentence the decision was read from.
    pub excerpt: String,
}

impl Decision {
    pub fn is_unknown(&self) -> bool {
        self.chosen_option == UNKNOWN_OPTION
    }

    /// Best available text for matching against other items.
    pub fn text(&self) -> &str {
        if self.is_unknown() { &self.excerpt } else { &self.chosen_option }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub text: String,
    /// Inherited from the triggering pattern; higher sorts first.
    pub priority: u8,
    pub kind: String,
    pub message_ref: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintCategory {
    Dont,
    Do,
    Technical,
    Performance,
    Security,
}

impl ConstraintCategory {
    pub const ALL: [ConstraintCategory; 5] = [
        Self::Dont,
        Self::Do,
        Self::Technical,
        Self::Performance,
        Self::Security,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub category: ConstraintCategory,
    pub text: String,
    pub message_ref: String,
}

/// Constraints grouped by category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSet {
    #[serde(default)]
    pub dont: Vec<Constraint>,
    #[serde(default, rename = "do")]
    pub must: Vec<Constraint>,
    #[serde(default)]
    pub technical: Vec<Constraint>,
    #[serde(default)]
    pub performance: Vec<Constraint>,
    #[serde(default)]
    pub security: Vec<Constraint>,
}

impl ConstraintSet {
    pub fn category(&self, category: ConstraintCategory) -> &[Constraint] {
        match category {
            ConstraintCategory::Dont => &self.dont,
            ConstraintCategory::Do => &self.must,
            ConstraintCategory::Technical => &self.technical,
            ConstraintCategory::Performance => &self.performance,
            ConstraintCategory::Security => &self.security,
        }
    }

    pub fn category_mut(&mut self, category: ConstraintCategory) -> &mut Vec<Constraint> {
        match category {
            ConstraintCategory::Dont => &mut self.dont,
            ConstraintCategory::Do => &mut self.must,
            ConstraintCategory::Technical => &mut self.technical,
            ConstraintCategory::Performance => &mut self.performance,
            ConstraintCategory::Security => &mut self.security,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        ConstraintCategory::ALL
            .into_iter()
            .flat_map(move |c| self.category(c).iter())
    }

    pub fn len(&self) -> usize {
        ConstraintCategory::ALL
            .iter()
            .map(|c| self.category(*c).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
