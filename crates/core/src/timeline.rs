//! Timeline-shaped outputs: cognitive days, causal chains, progressive
//! summaries and the two range timelines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A thematically coherent message range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CognitiveDay {
    pub day_id: String,
    /// Frequency-ranked dominant labels.
    pub focus: Vec<String>,
    pub key_shift: String,
    pub decisions_in_scope: Vec<String>,
    /// Inclusive `[start, end]` message indices.
    pub range: [usize; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentationMethod {
    /// Boundaries found by similarity drop
    Similarity,
    /// No boundary found; fixed-size fallback
    Uniform,
    /// Nothing to segment
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segmentation {
    pub days: Vec<CognitiveDay>,
    pub method: SegmentationMethod,
}

impl Segmentation {
    /// No days, nothing segmented.
    pub fn none() -> Self {
        Self {
            days: Vec::new(),
            method: SegmentationMethod::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Insight,
    FileChange,
    Inferred,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub kind: TriggerKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImplementationKind {
    Tracked,
    Untracked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Implementation {
    pub kind: ImplementationKind,
    pub detail: String,
}

impl Implementation {
    pub fn is_concrete(&self) -> bool {
        self.kind == ImplementationKind::Tracked
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Failure,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

/// trigger → decision → implementation → outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalChain {
    pub chain_id: String,
    pub trigger: Trigger,
    pub decision_id: String,
    pub implementation: Implementation,
    pub outcome: Outcome,
    /// Weighted blend in `[0, 1]`, rounded to two decimals.
    pub impact_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub id: String,
    pub range: [usize; 2],
    pub headline: String,
}

/// Three zoom levels over the same conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressiveSummary {
    /// Glance, at most 100 characters.
    pub l1: String,
    /// Context, at most 500 characters.
    pub l2: String,
    /// Detailed, one entry per day or phase.
    pub l3: Vec<DaySummary>,
}

/// Non-semantic per-range statistics (Digest profile).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub range: [usize; 2],
    pub user_messages: usize,
    pub assistant_messages: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_timestamp: Option<DateTime<Utc>>,
}

/// Collapsed phase for the Ultra profiles. Keywords are the most frequent
/// tokens in the phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroPhase {
    pub phase: usize,
    pub range: [usize; 2],
    pub message_count: usize,
    pub keywords: Vec<String>,
}
