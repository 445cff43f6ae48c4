//! Optional signing of a sealed package.
//!
//! The signer never sees the package, only the `checksum:<hex>` payload, so
//! any key store (OS keychain, hardware token, remote KMS) can sit behind
//! [`PackageSigner`]. A failed signer leaves the package and its checksum
//! untouched.

use crate::seal::SealedPackage;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use handoff_core::{Result, Signature, SigningError};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

type HmacSha256 = Hmac<Sha256>;

/// The exact bytes a signer is asked to sign.
pub fn signing_payload(checksum: &str) -> String {
    format!("checksum:{checksum}")
}

/// An external signature provider.
#[async_trait]
pub trait PackageSigner: Send + Sync {
    /// Algorithm name recorded in the signature, e.g. `"hmac-sha256"`.
    fn algorithm(&self) -> &str;

    fn key_id(&self) -> &str;

    /// Public material a verifier can use to identify or check the key.
    fn public_key(&self) -> String;

    async fn sign(&self, payload: &[u8]) -> std::result::Result<Vec<u8>, SigningError>;
}

/// Sign `package` and attach the signature.
///
/// On error the package is returned to the caller unchanged; its checksum
/// stays valid.
pub async fn sign_package(
    package: &mut SealedPackage,
    signer: &dyn PackageSigner,
) -> Result<Signature> {
    let payload = signing_payload(package.checksum());
    let bytes = match signer.sign(payload.as_bytes()).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(key_id = signer.key_id(), error = %e, "Signing failed, package left unsigned");
            return Err(e.into());
        }
    };

    let signature = Signature {
        algorithm: signer.algorithm().to_string(),
        key_id: signer.key_id().to_string(),
        public_key: signer.public_key(),
        signed_payload: payload,
        value: BASE64.encode(bytes),
    };
    package.attach_signature(signature.clone());
    info!(key_id = %signature.key_id, algorithm = %signature.algorithm, "Package signed");
    Ok(signature)
}

/// Shared-secret signer. The "public key" is a SHA-256 fingerprint of the
/// secret, which identifies the key without revealing it.
pub struct HmacSigner {
    key_id: String,
    secret: Vec<u8>,
}

impl HmacSigner {
    pub const ALGORITHM: &'static str = "hmac-sha256";

    pub fn new(
        key_id: impl Into<String>,
        secret: impl Into<Vec<u8>>,
    ) -> std::result::Result<Self, SigningError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(SigningError::Unavailable("empty HMAC secret".into()));
        }
        Ok(Self {
            key_id: key_id.into(),
            secret,
        })
    }

    /// Check a signature produced by this key. Constant-time.
    pub fn verify(&self, signature: &Signature) -> bool {
        if signature.algorithm != Self::ALGORITHM || signature.key_id != self.key_id {
            return false;
        }
        let Ok(provided) = BASE64.decode(&signature.value) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.secret) else {
            return false;
        };
        mac.update(signature.signed_payload.as_bytes());
        mac.verify_slice(&provided).is_ok()
    }
}

impl std::fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSigner")
            .field("key_id", &self.key_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl PackageSigner for HmacSigner {
    fn algorithm(&self) -> &str {
        Self::ALGORITHM
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }

    fn public_key(&self) -> String {
        hex::encode(Sha256::digest(&self.secret))
    }

    async fn sign(&self, payload: &[u8]) -> std::result::Result<Vec<u8>, SigningError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|e| SigningError::Failed {
                key_id: self.key_id.clone(),
                reason: e.to_string(),
            })?;
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seal::{seal, verify_package};
    use chrono::Utc;
    use handoff_core::{
        ContextPackage, DigestLayer, Fingerprint, PackageMetadata, PackageStatus, Profile,
        ProfileLayer, QualitySignals, SegmentationMethod, SizeTier, StageStatus, TopicQuality,
    };

    fn sealed() -> SealedPackage {
        seal(ContextPackage {
            protocol_id: Profile::Ultra.protocol_id().into(),
            session_id: "s1".into(),
            timestamp: Utc::now(),
            topics: vec![],
            decisions: vec![],
            insights: vec![],
            constraints: None,
            fingerprint: Fingerprint {
                algorithm: "sha256".into(),
                transcript_format: "role-tagged/v2".into(),
                sha256: "a".repeat(64),
                chunk_size: 60,
                chunk_count: 1,
                message_count: 1,
            },
            metadata: PackageMetadata {
                engine_version: "0.1.0".into(),
                profile: Profile::Ultra,
                message_count: 1,
                size_tier: SizeTier::Small,
                status: PackageStatus::Complete,
                quality: QualitySignals {
                    topics: TopicQuality::empty("tfidf-ngram-v1", 3),
                    decisions: StageStatus::Empty,
                    insights: StageStatus::Empty,
                    constraints: StageStatus::Empty,
                    degraded_stages: vec![],
                },
                segmentation: SegmentationMethod::None,
            },
            layer: ProfileLayer::Ultra(Default::default()),
            checksum: String::new(),
            signature: None,
        })
        .unwrap()
    }

    struct BrokenSigner;

    #[async_trait]
    impl PackageSigner for BrokenSigner {
        fn algorithm(&self) -> &str {
            "ed25519"
        }
        fn key_id(&self) -> &str {
            "device-1"
        }
        fn public_key(&self) -> String {
            String::new()
        }
        async fn sign(&self, _payload: &[u8]) -> std::result::Result<Vec<u8>, SigningError> {
            Err(SigningError::Unavailable("keychain locked".into()))
        }
    }

    #[tokio::test]
    async fn hmac_signature_round_trip() {
        let signer = HmacSigner::new("team-key", b"s3cret".to_vec()).unwrap();
        let mut package = sealed();
        let signature = sign_package(&mut package, &signer).await.unwrap();

        assert_eq!(signature.signed_payload, format!("checksum:{}", package.checksum()));
        assert!(signer.verify(&signature));
        assert_eq!(package.signature.as_ref(), Some(&signature));

        let report = verify_package(&package.to_json().unwrap()).unwrap();
        assert!(report.valid);
        assert!(report.signature_present);
    }

    #[tokio::test]
    async fn wrong_key_does_not_verify() {
        let signer = HmacSigner::new("team-key", b"s3cret".to_vec()).unwrap();
        let other = HmacSigner::new("team-key", b"other".to_vec()).unwrap();
        let mut package = sealed();
        let signature = sign_package(&mut package, &signer).await.unwrap();
        assert!(!other.verify(&signature));
    }

    #[tokio::test]
    async fn failed_signer_leaves_package_intact() {
        let mut package = sealed();
        let before = package.clone();
        let err = sign_package(&mut package, &BrokenSigner).await.unwrap_err();
        assert!(matches!(err, handoff_core::Error::Signing(_)));
        assert_eq!(package, before);
        assert!(verify_package(&package.to_json().unwrap()).unwrap().valid);
    }

    #[tokio::test]
    async fn modify_drops_signature() {
        let signer = HmacSigner::new("k", b"x".to_vec()).unwrap();
        let mut package = sealed();
        sign_package(&mut package, &signer).await.unwrap();
        let package = package.modify(|p| p.session_id = "s9".into()).unwrap();
        assert!(package.signature.is_none());
    }

    #[test]
    fn empty_secret_is_unavailable() {
        assert!(matches!(
            HmacSigner::new("k", Vec::new()),
            Err(SigningError::Unavailable(_))
        ));
    }

    #[test]
    fn debug_redacts_secret() {
        let signer = HmacSigner::new("k", b"topsecret".to_vec()).unwrap();
        assert!(!format!("{signer:?}").contains("topsecret"));
    }
}
