//! Canonical Poseidon hash over the BN254 scalar field.
//!
//! Every hash in the system (commitments, Merkle nodes, both natively and
//! inside the circuit) goes through the single configuration held here.
//!
//! ## Parameters
//! - Width: 3 (rate=2, capacity=1)
//! - Full rounds: 8
//! - Partial rounds: 57
//! - S-box: x^5
//! - Round constants and MDS: Grain LFSR (arkworks `find_poseidon_ark_and_mds`)
//!
//! Output is the first squeezed element.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::{
    constraints::CryptographicSpongeVar,
    poseidon::{constraints::PoseidonSpongeVar, find_poseidon_ark_and_mds, PoseidonConfig, PoseidonSponge},
    CryptographicSponge,
};
use ark_r1cs_std::fields::fp::FpVar;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};
use std::sync::OnceLock;

const FIELD_BITS: u64 = 254;
const RATE: usize = 2;
const CAPACITY: usize = 1;
const FULL_ROUNDS: usize = 8;
const PARTIAL_ROUNDS: usize = 57;
const ALPHA: u64 = 5;

static CANONICAL_CONFIG: OnceLock<PoseidonConfig<Fr>> = OnceLock::new();

/// Shared Poseidon configuration, built on first use.
pub fn canonical_config() -> &'static PoseidonConfig<Fr> {
    CANONICAL_CONFIG.get_or_init(|| {
        let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
            FIELD_BITS,
            RATE,
            FULL_ROUNDS as u64,
            PARTIAL_ROUNDS as u64,
            0, // skip_matrices
        );

        PoseidonConfig {
            full_rounds: FULL_ROUNDS,
            partial_rounds: PARTIAL_ROUNDS,
            alpha: ALPHA,
            ark,
            mds,
            rate: RATE,
            capacity: CAPACITY,
        }
    })
}

/// Absorb `inputs` in order and squeeze one element.
pub fn poseidon_hash_fields(inputs: &[Fr]) -> Fr {
    let mut sponge = PoseidonSponge::new(canonical_config());
    for input in inputs {
        sponge.absorb(input);
    }
    let output: Vec<Fr> = sponge.squeeze_field_elements(1);
    output[0]
}

/// Two-to-one hash. Merkle nodes and commitments both use this.
pub fn poseidon_hash2_fields(left: Fr, right: Fr) -> Fr {
    poseidon_hash_fields(&[left, right])
}

// ============================================================================
// Constraint gadget
// ============================================================================

/// In-circuit counterpart of [`poseidon_hash_fields`].
pub fn poseidon_hash_gadget(
    cs: ConstraintSystemRef<Fr>,
    inputs: &[FpVar<Fr>],
) -> Result<FpVar<Fr>, SynthesisError> {
    let mut sponge = PoseidonSpongeVar::new(cs, canonical_config());
    for input in inputs {
        sponge.absorb(input)?;
    }
    let mut output = sponge.squeeze_field_elements(1)?;
    output.pop().ok_or(SynthesisError::Unsatisfiable)
}

pub fn poseidon_hash2_gadget(
    cs: ConstraintSystemRef<Fr>,
    left: &FpVar<Fr>,
    right: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    poseidon_hash_gadget(cs, &[left.clone(), right.clone()])
}

// ============================================================================
// Tests
// ============================================================================
