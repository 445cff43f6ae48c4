//! Request and result types of one generation run.

use chrono::{DateTime, Utc};
use handoff_core::{PartialReason, Profile, Stage, Transcript};
use handoff_integrity::SealedPackage;

/// Everything one run needs. Unset options fall back to the engine config.
#[derive(Debug, Clone)]
pub struct SnapshotRequest {
    pub transcript: Transcript,
    pub profile: Option<Profile>,
    /// Package timestamp. Pin it to get byte-identical output across runs.
    pub generated_at: Option<DateTime<Utc>>,
    /// Embed the transcript (Digest only).
    pub include_transcript: Option<bool>,
}

impl SnapshotRequest {
    pub fn new(transcript: Transcript) -> Self {
        Self {
            transcript,
            profile: None,
            generated_at: None,
            include_transcript: None,
        }
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = Some(at);
        self
    }

    pub fn include_transcript(mut self, include: bool) -> Self {
        self.include_transcript = Some(include);
        self
    }
}

/// A package that stopped early. It is sealed like any other package and
/// its metadata carries the same reason and stage.
#[derive(Debug, Clone)]
pub struct PartialSnapshot {
    pub reason: PartialReason,
    pub stage: Stage,
    pub package: SealedPackage,
}

#[derive(Debug, Clone)]
pub enum Snapshot {
    Complete(SealedPackage),
    Partial(PartialSnapshot),
}

impl Snapshot {
    pub fn package(&self) -> &SealedPackage {
        match self {
            Self::Complete(package) => package,
            Self::Partial(partial) => &partial.package,
        }
    }

    pub fn into_package(self) -> SealedPackage {
        match self {
            Self::Complete(package) => package,
            Self::Partial(partial) => partial.package,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, Self::Partial(_))
    }
}
