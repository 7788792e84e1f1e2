//! JSON shapes exchanged with the outer HTTP layer and the SDK.
//!
//! Big integers travel as decimal or `0x`-prefixed hex strings because they
//! exceed the native integer width of most clients.

use crate::crypto::Attestation;
use crate::error::{ErrorKind, ZkAttestError};
use serde::{Deserialize, Serialize};

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequest {
    pub age: String,
    pub jurisdiction: String,
    pub is_accredited: String,
    pub identity_data: String,
    pub nonce: String,
    pub merkle_path: Vec<String>,
    pub merkle_helper: Vec<String>,
    pub min_age: String,
    pub jurisdiction_root: String,
    pub require_accreditation: String,
}

impl std::fmt::Debug for ProofRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofRequest")
            .field("private", &"[REDACTED]")
            .field("min_age", &self.min_age)
            .field("jurisdiction_root", &self.jurisdiction_root)
            .field("require_accreditation", &self.require_accreditation)
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofResponse {
    /// Base64 of the compressed Groth16 proof.
    pub proof: String,
    /// `[minAge, jurisdictionRoot, requireAccreditation, commitment]`, hex.
    pub public_inputs: Vec<String>,
    pub commitment: String,
    pub success: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationRequest {
    pub commitment: String,
    pub public_inputs: Vec<String>,
    pub proof: String,
    pub requester_identifier: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationResponse {
    pub commitment: String,
    /// 128 hex characters.
    pub signature: String,
    pub attester_id: u64,
    pub expiry: u64,
    pub success: bool,
}

impl From<&Attestation> for AttestationResponse {
    fn from(attestation: &Attestation) -> Self {
        Self {
            commitment: attestation.commitment.to_hex(),
            signature: attestation.signature.to_hex(),
            attester_id: attestation.attester_id,
            expiry: attestation.expiry,
            success: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationStatus {
    pub root: String,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeRequest {
    pub commitment: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeResponse {
    pub commitment: String,
    pub root: String,
    pub count: u64,
    pub success: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorBody,
}

impl From<&ZkAttestError> for ErrorResponse {
    fn from(err: &ZkAttestError) -> Self {
        let kind = err.kind();
        // Infrastructure details stay in the logs.
        let message = match kind {
            ErrorKind::InfrastructureFailure => "internal error".to_string(),
            ErrorKind::CryptographicFailure => "verification failed".to_string(),
            _ => err.to_string(),
        };
        Self {
            success: false,
            error: ErrorBody { kind, message },
        }
    }
}
