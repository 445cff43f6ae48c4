//! # Handoff Engine
//!
//! The snapshot assembler: runs every extractor, the segmenter, the causal
//! linker and the summarizer under one wall-clock budget, shapes the result
//! into one of three profiles and seals it.
//!
//! | Profile | Keeps | Timeline | Transcript |
//! |---|---|---|---|
//! | Digest | everything extracted | per-range + cognitive days + causal chains | optional |
//! | Ultra | heavy topics, confident or critical decisions, top insights | ≤7 macro phases | never |
//! | UltraPlus | Ultra + narrative + spine | ≤7 macro phases | never |

pub mod assembler;
mod guard;
pub mod narrative;
pub mod prune;
pub mod snapshot;

pub use assembler::{ENGINE_VERSION, SnapshotAssembler};
pub use prune::{Pruned, prune};
pub use snapshot::{PartialSnapshot, Snapshot, SnapshotRequest};
