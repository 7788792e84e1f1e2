pub const FIELD_ELEMENT_SIZE: usize = 32;

pub const COMMITMENT_SIZE: usize = 32;

pub const SECP256K1_PRIVATE_KEY_SIZE: usize = 32;

pub const SECP256K1_PUBLIC_KEY_SIZE: usize = 33;

/// Compact r || s, no recovery byte.
pub const ATTESTATION_SIGNATURE_SIZE: usize = 64;

/// Order of the public inputs is fixed: minAge, jurisdictionRoot,
/// requireAccreditation, commitment.
pub const PUBLIC_INPUT_COUNT: usize = 4;

/// Bit width assumed by the in-circuit age comparator.
pub const AGE_BIT_WIDTH: usize = 64;

pub const JURISDICTION_TREE_DEPTH: usize = 8;

pub const REVOCATION_TREE_DEPTH: usize = 20;

/// Bumped whenever the constraint layout or public input order changes.
pub const CIRCUIT_VERSION: &str = "eligibility-merkle-v1";

pub const DEFAULT_ATTESTATION_TTL_SECS: u64 = 86_400;
