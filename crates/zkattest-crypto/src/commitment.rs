//! Identity commitment: `Poseidon(identityData, nonce)`.

use crate::field::{fr_from_be_bytes_canonical, fr_to_be_bytes, parse_field};
use crate::poseidon::{poseidon_hash2_fields, poseidon_hash2_gadget};
use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};
use zkattest_types::{Commitment, ZkAttestResult};

pub fn compute_commitment(identity_data: Fr, nonce: Fr) -> Fr {
    poseidon_hash2_fields(identity_data, nonce)
}

/// Constrains the output to equal [`compute_commitment`] of the inputs.
pub fn commitment_gadget(
    cs: ConstraintSystemRef<Fr>,
    identity_data: &FpVar<Fr>,
    nonce: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    poseidon_hash2_gadget(cs, identity_data, nonce)
}

/// Commitment from decimal or hex strings, as they arrive on the wire.
pub fn commitment_from_strings(identity_data: &str, nonce: &str) -> ZkAttestResult<Commitment> {
    let identity_data = parse_field("identityData", identity_data)?;
    let nonce = parse_field("nonce", nonce)?;
    Ok(field_to_commitment(&compute_commitment(identity_data, nonce)))
}

pub fn field_to_commitment(f: &Fr) -> Commitment {
    Commitment::from_bytes(fr_to_be_bytes(f))
}

pub fn commitment_to_field(commitment: &Commitment) -> ZkAttestResult<Fr> {
    fr_from_be_bytes_canonical("commitment", commitment.as_bytes())
}
