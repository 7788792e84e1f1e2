#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod circuit;
pub mod commitment;
pub mod field;
pub mod keys;
pub mod merkle;
pub mod poseidon;
pub mod prover;
pub mod signer;
pub mod verifier;
pub mod witness;

pub use circuit::EligibilityCircuit;
pub use commitment::{
    commitment_from_strings, commitment_gadget, commitment_to_field, compute_commitment,
    field_to_commitment,
};
pub use field::{fr_to_be_bytes, fr_to_hex, parse_field, parse_field_strict};
pub use keys::{compute_vk_hash, CircuitKeys, KeyMetadata, VerifierKey};
pub use merkle::{
    fold_path, verify_proof, Blake3Hasher, JurisdictionTree, MerkleHasher, MerkleProof,
    MerkleTree, PoseidonGadgetHasher, PoseidonHasher, PoseidonMerkleTree,
};
pub use poseidon::{canonical_config, poseidon_hash2_fields, poseidon_hash_fields};
pub use prover::{decode_proof, encode_proof, ProofBundle, Prover};
pub use signer::{
    derive_public_key, generate_attester_key, is_low_s, verify_attestation_signature,
    AttestationSigner,
};
pub use verifier::Verifier;
pub use witness::{
    Credential, ProofInputs, PublicInputs, Requirement, RequirementSet, Witness, WitnessBuilder,
};

pub use ark_bn254::Fr;

/// Groth16 setup is slow; every test in the crate shares one deterministic key pair.
#[cfg(test)]
pub(crate) fn test_keys() -> std::sync::Arc<CircuitKeys> {
    use rand::{rngs::StdRng, SeedableRng};
    use std::sync::{Arc, OnceLock};

    static KEYS: OnceLock<Arc<CircuitKeys>> = OnceLock::new();
    KEYS.get_or_init(|| {
        let mut rng = StdRng::seed_from_u64(42);
        Arc::new(CircuitKeys::generate(&mut rng).expect("setup"))
    })
    .clone()
}
