//! Run budget: size tiers, adaptive caps and the wall-clock deadline.
//!
//! A [`Budget`] is created fresh for every generation run and is read-only
//! afterwards. Nothing here is shared between concurrent runs.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Corpus size class used to pick adaptive caps and chunk sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeTier {
    Small,
    Medium,
    Large,
}

impl std::fmt::Display for SizeTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        })
    }
}

/// Message-count breakpoints between tiers.
///
/// `medium_from = 100, large_from = 500` means `<100` small, `<500` medium,
/// everything else large.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierBreakpoints {
    pub medium_from: usize,
    pub large_from: usize,
}

impl Default for TierBreakpoints {
    fn default() -> Self {
        Self {
            medium_from: 100,
            large_from: 500,
        }
    }
}

impl TierBreakpoints {
    pub fn classify(&self, message_count: usize) -> SizeTier {
        if message_count >= self.large_from {
            SizeTier::Large
        } else if message_count >= self.medium_from {
            SizeTier::Medium
        } else {
            SizeTier::Small
        }
    }
}

/// One value per size tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierValues<T> {
    pub small: T,
    pub medium: T,
    pub large: T,
}

impl<T: Copy> TierValues<T> {
    pub const fn new(small: T, medium: T, large: T) -> Self {
        Self {
            small,
            medium,
            large,
        }
    }

    pub fn pick(&self, tier: SizeTier) -> T {
        match tier {
            SizeTier::Small => self.small,
            SizeTier::Medium => self.medium,
            SizeTier::Large => self.large,
        }
    }
}

/// Pipeline stages, in execution order. Used for deadline checks, partial
/// result tagging and quality reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validation,
    Normalization,
    Topics,
    Decisions,
    Insights,
    Constraints,
    Segmentation,
    CausalChains,
    Summaries,
    Fingerprint,
    Assembly,
    Checksum,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Normalization => "normalization",
            Self::Topics => "topics",
            Self::Decisions => "decisions",
            Self::Insights => "insights",
            Self::Constraints => "constraints",
            Self::Segmentation => "segmentation",
            Self::CausalChains => "causal_chains",
            Self::Summaries => "summaries",
            Self::Fingerprint => "fingerprint",
            Self::Assembly => "assembly",
            Self::Checksum => "checksum",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-run limits: one absolute deadline plus the item caps resolved for
/// this corpus's size tier.
#[derive(Debug, Clone)]
pub struct Budget {
    started: Instant,
    deadline: Instant,
    pub tier: SizeTier,
    pub max_topics: usize,
    pub topic_refs: usize,
    pub max_decisions: usize,
    pub max_insights: usize,
    pub max_constraints: usize,
}

impl Budget {
    /// Start the clock now, expiring after `timeout`.
    pub fn starting_now(timeout: Duration, tier: SizeTier) -> Self {
        let started = Instant::now();
        Self {
            started,
            deadline: started + timeout,
            tier,
            max_topics: 7,
            topic_refs: 5,
            max_decisions: 15,
            max_insights: 20,
            max_constraints: 15,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Cooperative cancellation point: call before starting `stage`.
    pub fn check(&self, stage: Stage) -> crate::Result<()> {
        if self.is_expired() {
            return Err(crate::Error::DeadlineExceeded {
                stage,
                elapsed_ms: self.elapsed().as_millis() as u64,
            });
        }
        Ok(())
    }
}
