use super::utils::{print_json, read_json};
use std::path::Path;
use std::sync::Arc;
use zkattest_attester::{Attester, AttesterConfig, KeyProvider, ProofService};
use zkattest_types::{
    wire::{AttestationRequest, AttestationResponse, ErrorResponse, ProofRequest},
    ZkAttestResult,
};

/// Prints a `ProofResponse`, or an `ErrorResponse` before returning the error.
pub async fn handle_prove(config: &AttesterConfig, request_path: &Path) -> ZkAttestResult<()> {
    let request: ProofRequest = read_json(request_path)?;
    let service = ProofService::new(Arc::new(KeyProvider::from_config(config)));

    match service.prove(&request).await.and_then(|bundle| bundle.to_response()) {
        Ok(response) => print_json(&response),
        Err(e) => {
            print_json(&ErrorResponse::from(&e))?;
            Err(e)
        }
    }
}

pub async fn handle_attest(config: AttesterConfig, request_path: &Path) -> ZkAttestResult<()> {
    let request: AttestationRequest = read_json(request_path)?;
    let attester = Attester::open(config).await?;

    match attester.attestations().attest(&request).await {
        Ok(attestation) => print_json(&AttestationResponse::from(&attestation)),
        Err(e) => {
            print_json(&ErrorResponse::from(&e))?;
            Err(e)
        }
    }
}
