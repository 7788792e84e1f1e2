mod attestation;
mod proof;

pub use attestation::AttestationService;
pub use proof::{ProofService, ServiceStats};
