//! Checksum computation and the sealed package wrapper.

use crate::canonical::{
    canonical_package, canonical_string, canonicalize, sha256_hex, strip_excluded,
};
use handoff_core::{ContextPackage, Error, Result, Signature};
use serde::Serialize;
use serde_json::Value;
use std::ops::Deref;

/// SHA-256 over the canonical form of `package`, lowercase hex.
pub fn compute_checksum(package: &ContextPackage) -> Result<String> {
    let canonical = canonical_string(&canonical_package(package)?)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

/// A package whose `checksum` field always matches its content.
///
/// The only way to change the content is [`SealedPackage::modify`], which
/// recomputes the checksum before handing the package back.
#[derive(Debug, Clone, PartialEq)]
pub struct SealedPackage {
    package: ContextPackage,
}

impl SealedPackage {
    /// Apply `f` and recompute the checksum. A previously attached
    /// signature no longer covers the content and is dropped.
    pub fn modify<F>(self, f: F) -> Result<Self>
    where
        F: FnOnce(&mut ContextPackage),
    {
        let mut package = self.package;
        f(&mut package);
        package.signature = None;
        seal(package)
    }

    /// The signature is outside the canonical form, so attaching it keeps
    /// the checksum valid.
    pub fn attach_signature(&mut self, signature: Signature) {
        self.package.signature = Some(signature);
    }

    pub fn checksum(&self) -> &str {
        &self.package.checksum
    }

    pub fn into_inner(self) -> ContextPackage {
        self.package
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.package)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.package)?)
    }
}

impl Deref for SealedPackage {
    type Target = ContextPackage;

    fn deref(&self) -> &ContextPackage {
        &self.package
    }
}

impl Serialize for SealedPackage {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.package.serialize(serializer)
    }
}

/// Compute and store the checksum. Any stale signature is kept only when it
/// already covers the new checksum.
pub fn seal(mut package: ContextPackage) -> Result<SealedPackage> {
    let checksum = compute_checksum(&package)?;
    if package
        .signature
        .as_ref()
        .is_some_and(|s| s.signed_payload != crate::signing_payload(&checksum))
    {
        package.signature = None;
    }
    package.checksum = checksum;
    Ok(SealedPackage { package })
}

/// Result of re-checking a serialized package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecksumReport {
    pub valid: bool,
    pub expected: String,
    pub actual: String,
    pub signature_present: bool,
}

/// Recompute the checksum of a serialized package and compare it with the
/// embedded one.
///
/// Works on the raw JSON value, so fields added by a newer engine version
/// still take part in the hash.
pub fn verify_package(json: &str) -> Result<ChecksumReport> {
    // Relies on serde_json's `float_roundtrip` so reparsed f64s keep their bits
    let mut value: Value = serde_json::from_str(json)?;
    let Value::Object(map) = &value else {
        return Err(Error::InvalidInput("package must be a JSON object".into()));
    };

    let expected = map
        .get("checksum")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let signature_present = map.get("signature").is_some_and(|s| !s.is_null());

    strip_excluded(&mut value);
    let actual = sha256_hex(canonical_string(&canonicalize(&value))?.as_bytes());

    Ok(ChecksumReport {
        valid: !expected.is_empty() && expected == actual,
        expected,
        actual,
        signature_present,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use handoff_core::{
        ConstraintSet, DigestLayer, Fingerprint, PackageMetadata, PackageStatus, Profile,
        ProfileLayer, QualitySignals, SegmentationMethod, SizeTier, StageStatus, TopicQuality,
    };

    fn package() -> ContextPackage {
        let quality = TopicQuality::empty("tfidf-ngram-v1", 3);
        ContextPackage {
            protocol_id: Profile::Digest.protocol_id().into(),
            session_id: "s1".into(),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            topics: vec![],
            decisions: vec![],
            insights: vec![],
            constraints: Some(ConstraintSet::default()),
            fingerprint: Fingerprint {
                algorithm: "sha256".into(),
                transcript_format: "role-tagged/v2".into(),
                sha256: "0".repeat(64),
                chunk_size: 60,
                chunk_count: 1,
                message_count: 2,
            },
            metadata: PackageMetadata {
                engine_version: "0.1.0".into(),
                profile: Profile::Digest,
                message_count: 2,
                size_tier: SizeTier::Small,
                status: PackageStatus::Complete,
                quality: QualitySignals {
                    topics: quality,
                    decisions: StageStatus::Degraded,
                    insights: StageStatus::Degraded,
                    constraints: StageStatus::Degraded,
                    degraded_stages: vec![],
                },
                segmentation: SegmentationMethod::None,
            },
            layer: ProfileLayer::Digest(DigestLayer::default()),
            checksum: String::new(),
            signature: None,
        }
    }

    #[test]
    fn sealed_package_verifies() {
        let sealed = seal(package()).unwrap();
        assert_eq!(sealed.checksum().len(), 64);
        let report = verify_package(&sealed.to_json().unwrap()).unwrap();
        assert!(report.valid);
        assert_eq!(report.expected, report.actual);
        assert!(!report.signature_present);
    }

    #[test]
    fn pretty_and_compact_json_verify_alike() {
        let sealed = seal(package()).unwrap();
        assert!(verify_package(&sealed.to_json_pretty().unwrap()).unwrap().valid);
    }

    #[test]
    fn tampering_is_detected() {
        let sealed = seal(package()).unwrap();
        let mut value: Value = serde_json::from_str(&sealed.to_json().unwrap()).unwrap();
        value["session_id"] = Value::String("s2".into());
        let report = verify_package(&value.to_string()).unwrap();
        assert!(!report.valid);
        assert_eq!(report.expected, sealed.checksum());
        assert_ne!(report.actual, report.expected);
    }

    #[test]
    fn fractional_weights_survive_verification() {
        let mut pkg = package();
        pkg.metadata.quality.topics.average_weight = 6306.0 / 7.0;
        pkg.metadata.quality.topics.coverage = 2.0 / 3.0;
        let sealed = seal(pkg).unwrap();
        for json in [sealed.to_json().unwrap(), sealed.to_json_pretty().unwrap()] {
            let report = verify_package(&json).unwrap();
            assert!(report.valid, "{} != {}", report.actual, report.expected);
        }
    }

    #[test]
    fn modify_reseals() {
        let sealed = seal(package()).unwrap();
        let before = sealed.checksum().to_string();
        let sealed = sealed.modify(|p| p.session_id = "s2".into()).unwrap();
        assert_ne!(sealed.checksum(), before);
        assert!(verify_package(&sealed.to_json().unwrap()).unwrap().valid);
    }

    #[test]
    fn checksum_ignores_existing_checksum_and_signature() {
        let mut pkg = package();
        let clean = compute_checksum(&pkg).unwrap();
        pkg.checksum = "f".repeat(64);
        pkg.signature = Some(Signature {
            algorithm: "hmac-sha256".into(),
            key_id: "k".into(),
            public_key: "p".into(),
            signed_payload: "checksum:x".into(),
            value: "v".into(),
        });
        assert_eq!(compute_checksum(&pkg).unwrap(), clean);
    }

    #[test]
    fn missing_checksum_is_invalid() {
        let json = serde_json::to_string(&package()).unwrap();
        let report = verify_package(&json).unwrap();
        assert!(!report.valid);
        assert!(report.expected.is_empty());
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(verify_package("[1,2,3]").is_err());
        assert!(verify_package("not json").is_err());
    }
}
