use crate::config::AttesterConfig;
use crate::keystore::{load_signer, KeyProvider};
use crate::revocation::RevocationRegistry;
use crate::services::{AttestationService, ProofService, ServiceStats};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use zkattest_crypto::AttestationSigner;
use zkattest_types::{wire::RevocationStatus, ZkAttestError, ZkAttestResult};

/// Attester runtime: shared keys, the revocation registry and both services.
pub struct Attester {
    config: AttesterConfig,
    keys: Arc<KeyProvider>,
    revocations: Arc<RevocationRegistry>,
    proofs: ProofService,
    attestations: AttestationService,
}

impl Attester {
    /// Open the data directory, revocation snapshot and signing key. Circuit
    /// keys are loaded on first use.
    pub async fn open(config: AttesterConfig) -> ZkAttestResult<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.data_dir)
            .await
            .map_err(|e| ZkAttestError::Storage(format!("Failed to create data dir: {}", e)))?;

        let signer = load_signer(&config)?;
        let keys = Arc::new(KeyProvider::from_config(&config));
        let revocations = Arc::new(RevocationRegistry::open(config.revocation_file()).await?);

        info!(
            "Attester {} ready, public key {}",
            signer.attester_id(),
            signer.public_key()
        );
        Ok(Self::from_parts(config, keys, revocations, signer))
    }

    pub fn from_parts(
        config: AttesterConfig,
        keys: Arc<KeyProvider>,
        revocations: Arc<RevocationRegistry>,
        signer: AttestationSigner,
    ) -> Self {
        let proofs = ProofService::new(keys.clone());
        let attestations = AttestationService::new(
            keys.clone(),
            signer,
            revocations.clone(),
            config.attestation_ttl_secs,
        );

        Self {
            config,
            keys,
            revocations,
            proofs,
            attestations,
        }
    }

    pub fn config(&self) -> &AttesterConfig {
        &self.config
    }

    pub fn keys(&self) -> &Arc<KeyProvider> {
        &self.keys
    }

    pub fn revocations(&self) -> &Arc<RevocationRegistry> {
        &self.revocations
    }

    pub fn proofs(&self) -> &ProofService {
        &self.proofs
    }

    pub fn attestations(&self) -> &AttestationService {
        &self.attestations
    }

    pub async fn status(&self) -> AttesterStatus {
        AttesterStatus {
            attester_id: self.attestations.attester_id(),
            public_key: self.attestations.public_key().to_hex(),
            keys_loaded: self.keys.is_initialized(),
            revocations: self.revocations.status().await,
            proofs: self.proofs.stats(),
            attestations: self.attestations.stats(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttesterStatus {
    pub attester_id: u64,
    pub public_key: String,
    pub keys_loaded: bool,
    pub revocations: RevocationStatus,
    pub proofs: ServiceStats,
    pub attestations: ServiceStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::create_signing_key;

    #[tokio::test]
    async fn test_open_requires_signing_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AttesterConfig::default();
        config.data_dir = dir.path().to_path_buf();

        let err = Attester::open(config.clone()).await.err().unwrap();
        assert!(matches!(err, ZkAttestError::KeyMissing(_)));

        create_signing_key(&config.signing_key_file(), false).unwrap();
        let attester = Attester::open(config).await.unwrap();

        let status = attester.status().await;
        assert_eq!(status.attester_id, 1);
        assert_eq!(status.public_key.len(), 66);
        assert!(!status.keys_loaded);
        assert_eq!(status.revocations.count, 0);
    }

    #[tokio::test]
    async fn test_revocations_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AttesterConfig::default();
        config.data_dir = dir.path().to_path_buf();
        create_signing_key(&config.signing_key_file(), false).unwrap();

        let commitment = zkattest_types::Commitment::from_bytes([0x01; 32]);
        let attester = Attester::open(config.clone()).await.unwrap();
        attester.revocations().revoke(&commitment).await.unwrap();
        drop(attester);

        let attester = Attester::open(config).await.unwrap();
        assert!(attester.revocations().is_revoked(&commitment).await);
        assert_eq!(attester.status().await.revocations.count, 1);
    }
}
