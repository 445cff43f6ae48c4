//! # Handoff Core
//!
//! Domain types and error definitions for the Handoff context compression
//! engine. This crate holds **no heuristics**: it defines the data model that
//! the extractors, the timeline builders, the integrity layer and the
//! snapshot assembler all exchange.
//!
//! ## Design Philosophy
//!
//! - Inputs ([`Message`], [`FileChange`]) are immutable records supplied by
//!   the capture collaborator; nothing in the engine mutates them.
//! - Outputs are plain `serde` types so the package serializes to JSON with
//!   no bespoke encoding.
//! - The three output profiles share one envelope ([`ContextPackage`]) and
//!   differ only in their [`ProfileLayer`] variant.

pub mod budget;
pub mod error;
pub mod extraction;
pub mod message;
pub mod package;
pub mod timeline;

// Re-export key types at crate root for ergonomics
pub use budget::{Budget, SizeTier, Stage, TierBreakpoints, TierValues};
pub use error::{Error, Result, SigningError};
pub use extraction::{
    Confidence, Constraint, ConstraintCategory, ConstraintSet, Decision, DecisionIntent,
    DecisionQuality, ExtractionStatus, Insight, StageStatus, Topic, TopicExtraction, TopicQuality,
    UNKNOWN_OPTION,
};
pub use message::{ChangeKind, FileChange, Message, Role, Transcript};
pub use package::{
    ContextPackage, DigestLayer, Fingerprint, KeyDecision, Narrative, PackageMetadata,
    PackageStatus, PartialReason, Profile, ProfileLayer, PruneStats, QualitySignals,
    SemanticsMarker, Signature, Spine, TranscriptEntry, UltraLayer, UltraPlusLayer,
};
pub use timeline::{
    CausalChain, CognitiveDay, DaySummary, Implementation, ImplementationKind, MacroPhase,
    Outcome, OutcomeStatus, ProgressiveSummary, Segmentation, SegmentationMethod, TimelineEntry,
    Trigger, TriggerKind,
};
