//! Lexical and statistical extraction passes.
//!
//! Every pass here is pure and deterministic: the same [`Corpus`] and
//! budget always produce the same output, and no pass ever returns an
//! error. A pass that finds nothing returns an empty list; the caller turns
//! that into a quality signal.
//!
//! ```text
//! Messages ──▶ Corpus (normalize + tokenize)
//!                 ├──▶ topics       (TF-IDF + n-grams)
//!                 ├──▶ decisions    (ordered pattern table, first match wins)
//!                 ├──▶ insights     (ordered pattern table, priority sorted)
//!                 └──▶ constraints  (five independent tables)
//! ```

pub mod constraints;
pub mod corpus;
pub mod decisions;
pub mod dedup;
pub mod insights;
pub mod patterns;
pub mod tokenize;
pub mod topics;

pub use constraints::extract_constraints;
pub use corpus::{Corpus, CorpusEntry};
pub use decisions::extract_decisions;
pub use dedup::{SemanticDeduplicator, similarity, token_set};
pub use insights::extract_insights;
pub use tokenize::{normalize, tokenize};
pub use topics::extract_topics;
