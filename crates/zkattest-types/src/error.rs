use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ZkAttestError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Requirements not met: {0}")]
    ConstraintViolation(String),

    #[error("Invalid proof: {0}")]
    InvalidProof(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid key format: {0}")]
    InvalidKey(String),

    #[error("Already present: {0}")]
    AlreadyPresent(String),

    #[error("Already revoked: {0}")]
    AlreadyRevoked(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Tree full: capacity {0} reached")]
    TreeFull(u64),

    #[error("Key material unavailable: {0}")]
    KeyMissing(String),

    #[error("Circuit error: {0}")]
    Circuit(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ZkAttestResult<T> = Result<T, ZkAttestError>;

impl From<std::convert::Infallible> for ZkAttestError {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

/// Coarse error classes surfaced at the external interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed, missing or wrong-length input.
    Validation,
    /// The credential does not satisfy the requirement set.
    ConstraintViolation,
    /// A proof or signature check failed; possible tampering.
    CryptographicFailure,
    /// Duplicate insertion, revoked or missing entry.
    StateConflict,
    /// Keys, storage, serialization or configuration trouble.
    InfrastructureFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::ConstraintViolation => "constraint_violation",
            ErrorKind::CryptographicFailure => "cryptographic_failure",
            ErrorKind::StateConflict => "state_conflict",
            ErrorKind::InfrastructureFailure => "infrastructure_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ZkAttestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ZkAttestError::Validation(_) | ZkAttestError::InvalidKey(_) => ErrorKind::Validation,
            ZkAttestError::ConstraintViolation(_) => ErrorKind::ConstraintViolation,
            ZkAttestError::InvalidProof(_) | ZkAttestError::InvalidSignature(_) => {
                ErrorKind::CryptographicFailure
            }
            ZkAttestError::AlreadyPresent(_)
            | ZkAttestError::AlreadyRevoked(_)
            | ZkAttestError::NotFound(_)
            | ZkAttestError::TreeFull(_) => ErrorKind::StateConflict,
            ZkAttestError::KeyMissing(_)
            | ZkAttestError::Circuit(_)
            | ZkAttestError::Storage(_)
            | ZkAttestError::Serialization(_)
            | ZkAttestError::Config(_)
            | ZkAttestError::Internal(_) => ErrorKind::InfrastructureFailure,
        }
    }

    /// True for failures that may indicate tampering and are logged apart
    /// from ordinary input errors.
    pub fn is_security_relevant(&self) -> bool {
        self.kind() == ErrorKind::CryptographicFailure
    }
}
