//! # Handoff Integrity
//!
//! Tamper evidence for context packages.
//!
//! - **Canonical form**: object keys sorted recursively, arrays kept in
//!   order, `checksum` and `signature` left out. Serialized compactly.
//! - **Checksum**: SHA-256 of the canonical form, lowercase hex. A
//!   [`SealedPackage`] recomputes it on every mutation.
//! - **Fingerprint**: a single-level Merkle root over fixed-size message
//!   chunks, so the transcript stays verifiable when it is not embedded.
//! - **Signing**: an optional external step over `checksum:<hex>`.
//!
//! ```text
//! Messages ─▶ TranscriptFingerprinter ─▶ Fingerprint ┐
//!                                                    ├─▶ ContextPackage ─▶ seal() ─▶ SealedPackage
//! Engine stages ─────────────────────────────────────┘                                   │
//!                                                            PackageSigner::sign ◀───────┘
//! ```

pub mod canonical;
pub mod fingerprint;
pub mod seal;
pub mod signing;

pub use canonical::{canonical_package, canonical_string, canonicalize, sha256_hex};
pub use fingerprint::{
    TRANSCRIPT_FORMAT, TranscriptFingerprinter, chunk_size_for, fingerprint, fingerprint_channel,
    fingerprint_streamed, verify_fingerprint,
};
pub use seal::{ChecksumReport, SealedPackage, compute_checksum, seal, verify_package};
pub use signing::{HmacSigner, PackageSigner, sign_package, signing_payload};
