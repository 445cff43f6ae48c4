//! Snapshot assembly: every stage, one deadline, one sealed package.
//!
//! ```text
//! validate ─▶ normalize ─▶ topics ─▶ decisions ─▶ insights ─▶ constraints
//!     ─▶ segment ─▶ ┬─ Digest:          causal chains, per-range timeline
//!                   └─ Ultra/UltraPlus: prune, macro timeline (+ narrative, spine)
//!     ─▶ summaries ─▶ fingerprint ─▶ assemble ─▶ seal
//! ```
//!
//! The budget is checked before every stage. When it runs out, the stages
//! completed so far are packaged, tagged partial and sealed. Each heuristic
//! stage sits behind a panic boundary; a failure there degrades the stage to
//! an empty result and is reported in the package metadata.

use crate::guard::Degraded;
use crate::narrative::{NarrativeInputs, narrative, spine};
use crate::prune::prune;
use crate::snapshot::{PartialSnapshot, Snapshot, SnapshotRequest};
use chrono::Utc;
use handoff_config::EngineConfig;
use handoff_core::{
    Budget, ConstraintSet, ContextPackage, Decision, DigestLayer, Error, Fingerprint, Insight,
    Message, PackageMetadata, PackageStatus, PartialReason, Profile, ProfileLayer, PruneStats,
    QualitySignals, Result, Segmentation, SizeTier, Stage, StageStatus, Topic, TopicQuality,
    TranscriptEntry, UltraLayer, UltraPlusLayer,
};
use handoff_extract::topics::{METHOD as TOPIC_METHOD, target_topics};
use handoff_extract::{
    Corpus, extract_constraints, extract_decisions, extract_insights, extract_topics,
};
use handoff_integrity::{SealedPackage, chunk_size_for, fingerprint, seal};
use handoff_timeline::{
    SummaryInputs, context_summary, link_causal_chains, macro_timeline, range_timeline, segment,
    stated_goal, summarize,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

// ── Run state ─────────────────────────────────────────────────────────────

/// What the stages have produced so far. A partial package is built from
/// whatever is here when the budget runs out.
struct Draft<'a> {
    profile: Profile,
    tier: SizeTier,
    messages: &'a [Message],
    corpus: Corpus,
    topics: Vec<Topic>,
    topic_quality: TopicQuality,
    decisions: Vec<Decision>,
    decision_status: StageStatus,
    insights: Vec<Insight>,
    insight_status: StageStatus,
    constraints: Option<ConstraintSet>,
    constraint_status: StageStatus,
    segmentation: Segmentation,
    pruned: Option<PruneStats>,
    fingerprint: Option<Fingerprint>,
    degraded: Degraded,
}

impl<'a> Draft<'a> {
    fn new(profile: Profile, budget: &Budget, messages: &'a [Message]) -> Self {
        Self {
            profile,
            tier: budget.tier,
            messages,
            corpus: Corpus::default(),
            topics: Vec::new(),
            topic_quality: TopicQuality::empty(
                TOPIC_METHOD,
                target_topics(budget.tier, budget.max_topics),
            ),
            decisions: Vec::new(),
            decision_status: StageStatus::Empty,
            insights: Vec::new(),
            insight_status: StageStatus::Empty,
            constraints: None,
            constraint_status: StageStatus::Empty,
            segmentation: Segmentation::none(),
            pruned: None,
            fingerprint: None,
            degraded: Degraded::default(),
        }
    }

    fn status(&self, stage: Stage, count: usize) -> StageStatus {
        if self.degraded.contains(stage) {
            StageStatus::Degraded
        } else {
            StageStatus::from_count(count)
        }
    }

    /// Ultra profiles never ship unpruned items, partial or not.
    fn ensure_pruned(&mut self, config: &EngineConfig) -> PruneStats {
        if self.profile == Profile::Digest {
            return PruneStats::default();
        }
        if let Some(stats) = &self.pruned {
            return stats.clone();
        }
        let pruned = prune(
            std::mem::take(&mut self.topics),
            std::mem::take(&mut self.decisions),
            std::mem::take(&mut self.insights),
            &config.profiles,
        );
        self.topics = pruned.topics;
        self.decisions = pruned.decisions;
        self.insights = pruned.insights;
        self.pruned = Some(pruned.stats.clone());
        pruned.stats
    }
}

// ── Assembler ─────────────────────────────────────────────────────────────

/// Runs the full pipeline for one transcript.
///
/// Cheap to clone. Runs share nothing, so any number may execute in
/// parallel.
#[derive(Debug, Clone)]
pub struct SnapshotAssembler {
    config: Arc<EngineConfig>,
}

impl SnapshotAssembler {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A fresh budget with the caps of `message_count`'s size tier.
    pub fn budget_for(&self, message_count: usize) -> Budget {
        let tier = self.config.tiers.classify(message_count);
        let caps = &self.config.caps;
        let mut budget = Budget::starting_now(self.config.deadline(), tier);
        budget.max_topics = caps.max_topics;
        budget.topic_refs = caps.topic_refs.pick(tier);
        budget.max_decisions = caps.decisions.pick(tier);
        budget.max_insights = caps.insights.pick(tier);
        budget.max_constraints = caps.constraints.pick(tier);
        budget
    }

    /// Run on a blocking thread so the async caller's runtime stays
    /// responsive on large transcripts.
    pub async fn generate(&self, request: SnapshotRequest) -> Result<Snapshot> {
        let assembler = self.clone();
        tokio::task::spawn_blocking(move || assembler.assemble(&request))
            .await
            .map_err(|e| Error::Internal(format!("assembly task failed: {e}")))?
    }

    /// Produce a sealed package. Deadline exhaustion and invalid input
    /// yield [`Snapshot::Partial`]; `Err` is returned only when not even a
    /// partial package can be serialized.
    pub fn assemble(&self, request: &SnapshotRequest) -> Result<Snapshot> {
        let messages = request.transcript.messages.as_slice();
        let profile = request.profile.unwrap_or(self.config.default_profile);
        let budget = self.budget_for(messages.len());
        let mut draft = Draft::new(profile, &budget, messages);

        debug!(
            profile = %profile,
            messages = messages.len(),
            tier = %budget.tier,
            "Starting context package assembly"
        );

        let layer = match self.run_stages(request, &budget, &mut draft) {
            Ok(layer) => layer,
            Err(Error::DeadlineExceeded { stage, elapsed_ms }) => {
                let detail = format!(
                    "deadline of {} ms exceeded after {elapsed_ms} ms",
                    self.config.deadline_ms
                );
                return self.partial(request, draft, PartialReason::DeadlineExceeded, stage, detail);
            }
            Err(Error::InvalidInput(detail)) => {
                return self.partial(
                    request,
                    draft,
                    PartialReason::InvalidInput,
                    Stage::Validation,
                    detail,
                );
            }
            Err(other) => return Err(other),
        };

        let package = self.package(request, &mut draft, layer, PackageStatus::Complete);
        match seal(package) {
            Ok(sealed) => {
                info!(
                    profile = %profile,
                    messages = messages.len(),
                    topics = sealed.topics.len(),
                    decisions = sealed.decisions.len(),
                    insights = sealed.insights.len(),
                    degraded = draft.degraded.stages().len(),
                    elapsed_ms = budget.elapsed().as_millis() as u64,
                    "Context package assembled"
                );
                Ok(Snapshot::Complete(sealed))
            }
            Err(e) => self.partial(
                request,
                draft,
                PartialReason::SerializationFailed,
                Stage::Checksum,
                e.to_string(),
            ),
        }
    }

    fn run_stages(
        &self,
        request: &SnapshotRequest,
        budget: &Budget,
        draft: &mut Draft<'_>,
    ) -> Result<ProfileLayer> {
        let config = &*self.config;
        let extraction = &config.extraction;

        budget.check(Stage::Validation)?;
        request.transcript.validate()?;

        budget.check(Stage::Normalization)?;
        draft.corpus = Corpus::build(draft.messages);

        budget.check(Stage::Topics)?;
        if let Some(found) = draft
            .degraded
            .run(Stage::Topics, || {
                fault_point(Stage::Topics);
                extract_topics(&draft.corpus, budget, extraction)
            })
        {
            draft.topics = found.topics;
            draft.topic_quality = found.quality;
        }

        budget.check(Stage::Decisions)?;
        draft.decisions = draft.degraded.run_or_default(Stage::Decisions, || {
            fault_point(Stage::Decisions);
            extract_decisions(&draft.corpus, budget, extraction)
        });
        draft.decision_status = draft.status(Stage::Decisions, draft.decisions.len());

        budget.check(Stage::Insights)?;
        draft.insights = draft.degraded.run_or_default(Stage::Insights, || {
            fault_point(Stage::Insights);
            extract_insights(&draft.corpus, budget, extraction)
        });
        draft.insight_status = draft.status(Stage::Insights, draft.insights.len());

        budget.check(Stage::Constraints)?;
        let constraints = draft.degraded.run_or_default(Stage::Constraints, || {
            fault_point(Stage::Constraints);
            extract_constraints(&draft.corpus, budget, extraction)
        });
        draft.constraint_status = draft.status(Stage::Constraints, constraints.len());
        draft.constraints = Some(constraints);

        budget.check(Stage::Segmentation)?;
        draft.segmentation = draft
            .degraded
            .run(Stage::Segmentation, || {
                fault_point(Stage::Segmentation);
                segment(&draft.corpus, &draft.decisions, &config.segmentation)
            })
            .unwrap_or_else(Segmentation::none);

        debug!(
            topics = draft.topics.len(),
            decisions = draft.decisions.len(),
            insights = draft.insights.len(),
            days = draft.segmentation.days.len(),
            "Extraction complete"
        );

        let layer = match draft.profile {
            Profile::Digest => self.digest_layer(request, budget, draft)?,
            Profile::Ultra | Profile::UltraPlus => self.ultra_layer(budget, draft)?,
        };

        budget.check(Stage::Fingerprint)?;
        draft.fingerprint = Some(self.fingerprint(draft));

        budget.check(Stage::Assembly)?;
        Ok(layer)
    }

    fn digest_layer(
        &self,
        request: &SnapshotRequest,
        budget: &Budget,
        draft: &mut Draft<'_>,
    ) -> Result<ProfileLayer> {
        budget.check(Stage::CausalChains)?;
        let file_changes = &request.transcript.file_changes;
        let causal_chains = draft.degraded.run_or_default(Stage::CausalChains, || {
            link_causal_chains(
                &draft.corpus,
                &draft.decisions,
                &draft.insights,
                file_changes,
                &self.config.causal,
            )
        });

        budget.check(Stage::Summaries)?;
        let days = &draft.segmentation.days;
        let (context, summary) = draft.degraded.run_or_default(Stage::Summaries, || {
            let goal = stated_goal(&draft.corpus);
            let context = context_summary(&draft.decisions, &draft.insights);
            let summary = summarize(&SummaryInputs {
                context: &context,
                topics: &draft.topics,
                decisions: &draft.decisions,
                insights: &draft.insights,
                days,
                phases: &[],
                goal: goal.as_deref(),
                message_count: draft.messages.len(),
            });
            (context, summary)
        });

        let include = request
            .include_transcript
            .unwrap_or(self.config.include_transcript);
        let transcript = include.then(|| {
            draft
                .messages
                .iter()
                .map(|m| TranscriptEntry {
                    id: m.id.clone(),
                    role: m.role,
                    content: m.content.clone(),
                    timestamp: m.timestamp,
                })
                .collect()
        });

        Ok(ProfileLayer::Digest(DigestLayer {
            context_summary: context,
            summary,
            timeline: range_timeline(draft.messages, self.config.profiles.timeline_range),
            cognitive_days: draft.segmentation.days.clone(),
            causal_chains,
            transcript,
        }))
    }

    fn ultra_layer(&self, budget: &Budget, draft: &mut Draft<'_>) -> Result<ProfileLayer> {
        let profiles = &self.config.profiles;
        let pruned = draft.ensure_pruned(&self.config);
        debug!(
            topics_dropped = pruned.topics_dropped,
            decisions_dropped = pruned.decisions_dropped,
            insights_dropped = pruned.insights_dropped,
            "Pruned for {}",
            draft.profile
        );

        budget.check(Stage::Summaries)?;
        let days = &draft.segmentation.days;
        let summarized = draft.degraded.run(Stage::Summaries, || {
            let goal = stated_goal(&draft.corpus);
            let phases = macro_timeline(&draft.corpus, days, profiles.macro_phases);
            let context = context_summary(&draft.decisions, &draft.insights);
            let summary = summarize(&SummaryInputs {
                context: &context,
                topics: &draft.topics,
                decisions: &draft.decisions,
                insights: &draft.insights,
                days,
                phases: &phases,
                goal: goal.as_deref(),
                message_count: draft.messages.len(),
            });
            (goal, phases, summary)
        });
        let (goal, macro_timeline, summary) = summarized.unwrap_or_default();

        let ultra = UltraLayer {
            glance: summary.l1.clone(),
            context: summary.l2.clone(),
            macro_timeline,
            pruned,
        };
        if draft.profile == Profile::Ultra {
            return Ok(ProfileLayer::Ultra(ultra));
        }

        let inputs = NarrativeInputs {
            corpus: &draft.corpus,
            summary: &summary,
            goal: goal.as_deref(),
            topics: &draft.topics,
            decisions: &draft.decisions,
            insights: &draft.insights,
            constraints: draft.constraints.as_ref(),
        };
        let (narrative, spine) = draft.degraded.run_or_default(Stage::Summaries, || {
            (narrative(&inputs, profiles.narrative_chars), spine(&inputs))
        });

        Ok(ProfileLayer::UltraPlus(UltraPlusLayer {
            glance: ultra.glance,
            context: ultra.context,
            macro_timeline: ultra.macro_timeline,
            pruned: ultra.pruned,
            narrative,
            spine,
        }))
    }

    fn fingerprint(&self, draft: &Draft<'_>) -> Fingerprint {
        let chunk_size = chunk_size_for(draft.tier, &self.config.caps.fingerprint_chunk);
        fingerprint(draft.messages, chunk_size)
    }

    // ── Packaging ─────────────────────────────────────────────────────────

    fn package(
        &self,
        request: &SnapshotRequest,
        draft: &mut Draft<'_>,
        layer: ProfileLayer,
        status: PackageStatus,
    ) -> ContextPackage {
        let fingerprint = match draft.fingerprint.take() {
            Some(fp) => fp,
            None => self.fingerprint(draft),
        };
        let session_id = session_id(request, &fingerprint);
        let quality = QualitySignals {
            topics: draft.topic_quality.clone(),
            decisions: draft.decision_status,
            insights: draft.insight_status,
            constraints: draft.constraint_status,
            degraded_stages: draft.degraded.stages().to_vec(),
        };

        ContextPackage {
            protocol_id: draft.profile.protocol_id().to_string(),
            session_id,
            timestamp: request.generated_at.unwrap_or_else(Utc::now),
            topics: std::mem::take(&mut draft.topics),
            decisions: std::mem::take(&mut draft.decisions),
            insights: std::mem::take(&mut draft.insights),
            constraints: draft.constraints.take(),
            fingerprint,
            metadata: PackageMetadata {
                engine_version: ENGINE_VERSION.to_string(),
                profile: draft.profile,
                message_count: draft.messages.len(),
                size_tier: draft.tier,
                status,
                quality,
                segmentation: draft.segmentation.method,
            },
            layer,
            checksum: String::new(),
            signature: None,
        }
    }

    fn partial(
        &self,
        request: &SnapshotRequest,
        mut draft: Draft<'_>,
        reason: PartialReason,
        stage: Stage,
        detail: String,
    ) -> Result<Snapshot> {
        warn!(
            reason = reason.code(),
            stage = %stage,
            detail = %detail,
            "Returning partial context package"
        );

        let pruned = draft.ensure_pruned(&self.config);
        let layer = match ProfileLayer::empty(draft.profile) {
            ProfileLayer::Ultra(layer) => ProfileLayer::Ultra(UltraLayer { pruned, ..layer }),
            ProfileLayer::UltraPlus(layer) => {
                ProfileLayer::UltraPlus(UltraPlusLayer { pruned, ..layer })
            }
            digest => digest,
        };
        let status = PackageStatus::Partial {
            reason,
            stage,
            detail,
        };
        let package = self.package(request, &mut draft, layer, status);
        let package: SealedPackage = seal(package)?;
        Ok(Snapshot::Partial(PartialSnapshot {
            reason,
            stage,
            package,
        }))
    }
}

#[cfg(test)]
thread_local! {
    static PANIC_AT: std::cell::Cell<Option<Stage>> = const { std::cell::Cell::new(None) };
}

/// Panics inside the stage boundary when a test has armed `stage`.
#[cfg(test)]
fn fault_point(stage: Stage) {
    if PANIC_AT.with(|armed| armed.get()) == Some(stage) {
        panic!("injected failure in {stage}");
    }
}

#[cfg(not(test))]
fn fault_point(_stage: Stage) {}

/// Explicit id, else the first message's session, else derived from the
/// fingerprint so repeated runs agree.
fn session_id(request: &SnapshotRequest, fingerprint: &Fingerprint) -> String {
    let transcript = &request.transcript;
    if !transcript.session_id.trim().is_empty() {
        return transcript.session_id.clone();
    }
    transcript
        .messages
        .iter()
        .map(|m| m.session_id.as_str())
        .find(|s| !s.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("session-{}", &fingerprint.sha256[..12]))
}
