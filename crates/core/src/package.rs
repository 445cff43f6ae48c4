//! The context package: one shared envelope, three profile layers.
//!
//! ```text
//! ContextPackage
//! ├── protocol_id, session_id, timestamp
//! ├── topics / decisions / insights / constraints?
//! ├── fingerprint            (transcript hash, always present)
//! ├── metadata               (status, quality signals, tier)
//! ├── layer                  Digest | Ultra | UltraPlus
//! ├── checksum               (sha256 over the canonical form)
//! └── signature?             (external, over "checksum:<hex>")
//! ```

use crate::budget::{SizeTier, Stage};
use crate::extraction::{ConstraintSet, Decision, Insight, StageStatus, Topic, TopicQuality};
use crate::message::Role;
use crate::timeline::{
    CausalChain, CognitiveDay, MacroPhase, ProgressiveSummary, SegmentationMethod, TimelineEntry,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Output profile, trading detail for size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// Full extraction, per-range timeline, optional transcript
    Digest,
    /// Pruned extraction, macro timeline, never a transcript
    Ultra,
    /// Ultra plus a derived narrative and spine
    UltraPlus,
}

impl Profile {
    pub fn protocol_id(&self) -> &'static str {
        match self {
            Self::Digest => "handoff.digest/v1",
            Self::Ultra => "handoff.ultra/v1",
            Self::UltraPlus => "handoff.ultraplus/v1",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Digest => "digest",
            Self::Ultra => "ultra",
            Self::UltraPlus => "ultra_plus",
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Profile {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "digest" => Ok(Self::Digest),
            "ultra" => Ok(Self::Ultra),
            "ultra_plus" | "ultraplus" => Ok(Self::UltraPlus),
            other => Err(crate::Error::InvalidInput(format!("unknown profile '{other}'"))),
        }
    }
}

/// Transcript hash that stays verifiable when the transcript is omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Always `"sha256"`.
    pub algorithm: String,
    /// Encoding of the hashed chunks, e.g. `role-tagged/v2`.
    pub transcript_format: String,
    /// Root digest, lowercase hex.
    pub sha256: String,
    pub chunk_size: usize,
    pub chunk_count: usize,
    pub message_count: usize,
}

/// Detached signature over `checksum:<hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub algorithm: String,
    pub key_id: String,
    pub public_key: String,
    pub signed_payload: String,
    /// Base64 signature bytes.
    pub value: String,
}

/// A verbatim message, embedded only in the Digest profile on request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialReason {
    DeadlineExceeded,
    InvalidInput,
    SerializationFailed,
}

impl PartialReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::InvalidInput => "invalid_input",
            Self::SerializationFailed => "serialization_failed",
        }
    }
}

/// Whether the run finished; partial packages carry the reason and the
/// stage at which assembly stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PackageStatus {
    Complete,
    Partial {
        reason: PartialReason,
        stage: Stage,
        detail: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitySignals {
    pub topics: TopicQuality,
    pub decisions: StageStatus,
    pub insights: StageStatus,
    pub constraints: StageStatus,
    /// Stages whose heuristic failed and was replaced by an empty result.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded_stages: Vec<Stage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub engine_version: String,
    pub profile: Profile,
    pub message_count: usize,
    pub size_tier: SizeTier,
    pub status: PackageStatus,
    pub quality: QualitySignals,
    pub segmentation: SegmentationMethod,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneStats {
    pub topics_dropped: usize,
    pub decisions_dropped: usize,
    pub insights_dropped: usize,
}

impl PruneStats {
    pub fn total(&self) -> usize {
        self.topics_dropped + self.decisions_dropped + self.insights_dropped
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DigestLayer {
    pub context_summary: String,
    pub summary: ProgressiveSummary,
    pub timeline: Vec<TimelineEntry>,
    pub cognitive_days: Vec<CognitiveDay>,
    pub causal_chains: Vec<CausalChain>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<Vec<TranscriptEntry>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UltraLayer {
    /// L1 summary.
    pub glance: String,
    /// L2 summary.
    pub context: String,
    pub macro_timeline: Vec<MacroPhase>,
    pub pruned: PruneStats,
}

/// Always `"unverified"`: the narrative is lexical, not checked for meaning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticsMarker {
    #[default]
    Unverified,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Narrative {
    /// At most 280 characters.
    pub summary: String,
    pub validation_checklist: Vec<String>,
    /// Acronyms used in extracted fields but never defined there.
    pub undefined_terms: Vec<String>,
    pub semantics: SemanticsMarker,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyDecision {
    pub decision_id: String,
    pub statement: String,
    pub falsifiable_if: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spine {
    pub core_context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_tension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_decision: Option<KeyDecision>,
    pub assumptions: Vec<String>,
    pub rejected_alternatives: Vec<String>,
    pub open_questions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UltraPlusLayer {
    pub glance: String,
    pub context: String,
    pub macro_timeline: Vec<MacroPhase>,
    pub pruned: PruneStats,
    pub narrative: Narrative,
    pub spine: Spine,
}

/// Variant-specific part of the package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "profile", rename_all = "snake_case")]
pub enum ProfileLayer {
    Digest(DigestLayer),
    Ultra(UltraLayer),
    UltraPlus(UltraPlusLayer),
}

impl ProfileLayer {
    pub fn profile(&self) -> Profile {
        match self {
            Self::Digest(_) => Profile::Digest,
            Self::Ultra(_) => Profile::Ultra,
            Self::UltraPlus(_) => Profile::UltraPlus,
        }
    }

    /// An empty layer of the given profile, used by partial packages.
    pub fn empty(profile: Profile) -> Self {
        match profile {
            Profile::Digest => Self::Digest(DigestLayer::default()),
            Profile::Ultra => Self::Ultra(UltraLayer::default()),
            Profile::UltraPlus => Self::UltraPlus(UltraPlusLayer::default()),
        }
    }
}

/// The structured artifact produced by one engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextPackage {
    pub protocol_id: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub topics: Vec<Topic>,
    pub decisions: Vec<Decision>,
    pub insights: Vec<Insight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<ConstraintSet>,
    pub fingerprint: Fingerprint,
    pub metadata: PackageMetadata,
    pub layer: ProfileLayer,
    /// Empty until sealed.
    #[serde(default)]
    pub checksum: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
}

impl ContextPackage {
    pub fn profile(&self) -> Profile {
        self.layer.profile()
    }

    pub fn is_partial(&self) -> bool {
        matches!(self.metadata.status, PackageStatus::Partial { .. })
    }

    pub fn has_transcript(&self) -> bool {
        matches!(&self.layer, ProfileLayer::Digest(d) if d.transcript.is_some())
    }
}
