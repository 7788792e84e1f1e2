use super::proof::ServiceStats;
use crate::keystore::KeyProvider;
use crate::revocation::RevocationRegistry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use zkattest_crypto::{decode_proof, AttestationSigner, PublicInputs};
use zkattest_types::{
    wire::{AttestationRequest, AttestationResponse, ErrorResponse},
    Attestation, AttesterPublicKey, Commitment, ErrorKind, ZkAttestError, ZkAttestResult,
};

/// Verifies eligibility proofs and signs the commitments that pass.
pub struct AttestationService {
    keys: Arc<KeyProvider>,
    signer: AttestationSigner,
    revocations: Arc<RevocationRegistry>,
    ttl_secs: u64,
    issued: AtomicU64,
    rejected: AtomicU64,
}

impl AttestationService {
    pub fn new(
        keys: Arc<KeyProvider>,
        signer: AttestationSigner,
        revocations: Arc<RevocationRegistry>,
        ttl_secs: u64,
    ) -> Self {
        Self {
            keys,
            signer,
            revocations,
            ttl_secs,
            issued: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    pub fn attester_id(&self) -> u64 {
        self.signer.attester_id()
    }

    pub fn public_key(&self) -> AttesterPublicKey {
        self.signer.public_key()
    }

    pub async fn attest(&self, request: &AttestationRequest) -> ZkAttestResult<Attestation> {
        self.attest_at(request, chrono::Utc::now().timestamp().max(0) as u64)
            .await
    }

    /// Attest with `now` as the issuance time in unix seconds.
    pub async fn attest_at(
        &self,
        request: &AttestationRequest,
        now: u64,
    ) -> ZkAttestResult<Attestation> {
        let result = self.check_and_sign(request, now).await;
        match &result {
            Ok(attestation) => {
                self.issued.fetch_add(1, Ordering::Relaxed);
                info!(
                    "Issued attestation for {} (attester {}, expires {})",
                    attestation.commitment.short(),
                    attestation.attester_id,
                    attestation.expiry
                );
            }
            Err(e) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                match e.kind() {
                    ErrorKind::CryptographicFailure => warn!(
                        target: "security",
                        "Attestation refused for requester {}: {}",
                        request.requester_identifier,
                        e
                    ),
                    ErrorKind::InfrastructureFailure => error!("Attestation failed: {}", e),
                    _ => debug!("Attestation request rejected ({}): {}", e.kind(), e),
                }
            }
        }
        result
    }

    async fn check_and_sign(
        &self,
        request: &AttestationRequest,
        now: u64,
    ) -> ZkAttestResult<Attestation> {
        let commitment = Commitment::from_hex(&request.commitment)?;
        let public_inputs = PublicInputs::from_hex(&request.public_inputs)?;
        if public_inputs.commitment_bytes() != commitment {
            return Err(ZkAttestError::Validation(
                "commitment does not match the proof's public inputs".into(),
            ));
        }
        let proof = decode_proof(&request.proof)?;

        if self.revocations.is_revoked(&commitment).await {
            return Err(ZkAttestError::AlreadyRevoked(commitment.to_hex()));
        }

        let verifier = self.keys.verifier().await?;
        let inputs = public_inputs.to_field_elements();
        let valid = tokio::task::spawn_blocking(move || verifier.verify(&proof, &inputs))
            .await
            .map_err(|e| ZkAttestError::Internal(format!("verification task failed: {}", e)))??;
        if !valid {
            return Err(ZkAttestError::InvalidProof(
                "proof does not verify against the public inputs".into(),
            ));
        }

        let expiry = now.saturating_add(self.ttl_secs);
        Ok(self.signer.attest(commitment, expiry))
    }

    /// Wire-level entry point.
    pub async fn handle(
        &self,
        request: &AttestationRequest,
    ) -> Result<AttestationResponse, ErrorResponse> {
        self.attest(request)
            .await
            .map(|attestation| AttestationResponse::from(&attestation))
            .map_err(|e| ErrorResponse::from(&e))
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            succeeded: self.issued.load(Ordering::Relaxed),
            failed: self.rejected.load(Ordering::Relaxed),
        }
    }
}
