//! Structure derived from the extracted items: where the conversation
//! changed subject, how decisions connect to what caused and followed
//! them, and how the whole thing reads at three zoom levels.
//!
//! ```text
//! Corpus + Decisions ──▶ segment      ──▶ CognitiveDay[]
//! Decisions + Insights
//!   + FileChanges     ──▶ causal      ──▶ CausalChain[]
//! Messages            ──▶ ranges      ──▶ TimelineEntry[] / MacroPhase[]
//! everything above    ──▶ summary     ──▶ ProgressiveSummary
//! ```

pub mod causal;
pub mod goal;
pub mod ranges;
pub mod segment;
pub mod summary;

pub use causal::link_causal_chains;
pub use goal::stated_goal;
pub use ranges::{macro_timeline, range_timeline};
pub use segment::{segment, top_terms};
pub use summary::{SummaryInputs, context_summary, summarize};
