use crate::keystore::KeyProvider;
use rand::rngs::OsRng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error};
use zkattest_crypto::{ProofBundle, ProofInputs, Prover};
use zkattest_types::{
    wire::{ErrorResponse, ProofRequest, ProofResponse},
    ErrorKind, ZkAttestError, ZkAttestResult,
};

pub struct ProofService {
    keys: Arc<KeyProvider>,
    generated: AtomicU64,
    refused: AtomicU64,
}

impl ProofService {
    pub fn new(keys: Arc<KeyProvider>) -> Self {
        Self {
            keys,
            generated: AtomicU64::new(0),
            refused: AtomicU64::new(0),
        }
    }

    /// Parse, build the witness and prove on the blocking pool.
    pub async fn prove(&self, request: &ProofRequest) -> ZkAttestResult<ProofBundle> {
        let result = self.prove_inner(request).await;
        match &result {
            Ok(bundle) => {
                self.generated.fetch_add(1, Ordering::Relaxed);
                debug!("Proof generated for commitment {}", bundle.commitment.short());
            }
            Err(e) if e.kind() == ErrorKind::InfrastructureFailure => {
                self.refused.fetch_add(1, Ordering::Relaxed);
                error!("Proof generation failed: {}", e);
            }
            Err(e) => {
                self.refused.fetch_add(1, Ordering::Relaxed);
                debug!("Proof request refused ({}): {}", e.kind(), e);
            }
        }
        result
    }

    async fn prove_inner(&self, request: &ProofRequest) -> ZkAttestResult<ProofBundle> {
        let witness = ProofInputs::from_request(request)?.build_witness()?;
        let prover = Prover::new(self.keys.keys().await?);

        tokio::task::spawn_blocking(move || prover.prove(&witness, &mut OsRng))
            .await
            .map_err(|e| ZkAttestError::Internal(format!("proving task failed: {}", e)))?
    }

    /// Wire-level entry point.
    pub async fn handle(&self, request: &ProofRequest) -> Result<ProofResponse, ErrorResponse> {
        self.prove(request)
            .await
            .and_then(|bundle| bundle.to_response())
            .map_err(|e| ErrorResponse::from(&e))
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            succeeded: self.generated.load(Ordering::Relaxed),
            failed: self.refused.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct ServiceStats {
    pub succeeded: u64,
    pub failed: u64,
}
