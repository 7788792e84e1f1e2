use crate::circuit::EligibilityCircuit;
use crate::commitment::field_to_commitment;
use crate::keys::CircuitKeys;
use crate::merkle::MerkleProof;
use crate::witness::{Credential, PublicInputs, RequirementSet, Witness, WitnessBuilder};
use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, Proof};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use base64::Engine;
use rand::{rngs::OsRng, CryptoRng, RngCore};
use std::sync::Arc;
use tracing::debug;
use zkattest_types::{wire::ProofResponse, Commitment, ZkAttestError, ZkAttestResult};

/// A proof together with the public inputs it was produced for.
#[derive(Clone, Debug)]
pub struct ProofBundle {
    pub proof: Proof<Bn254>,
    pub public_inputs: PublicInputs,
    pub commitment: Commitment,
}

impl ProofBundle {
    pub fn proof_bytes(&self) -> ZkAttestResult<Vec<u8>> {
        encode_proof_bytes(&self.proof)
    }

    pub fn proof_base64(&self) -> ZkAttestResult<String> {
        encode_proof(&self.proof)
    }

    pub fn to_response(&self) -> ZkAttestResult<ProofResponse> {
        Ok(ProofResponse {
            proof: self.proof_base64()?,
            public_inputs: self.public_inputs.to_hex(),
            commitment: self.commitment.to_hex(),
            success: true,
        })
    }
}

pub fn encode_proof_bytes(proof: &Proof<Bn254>) -> ZkAttestResult<Vec<u8>> {
    let mut bytes = Vec::new();
    proof
        .serialize_compressed(&mut bytes)
        .map_err(|e| ZkAttestError::Serialization(format!("proof: {}", e)))?;
    Ok(bytes)
}

/// Base64 of the compressed proof.
pub fn encode_proof(proof: &Proof<Bn254>) -> ZkAttestResult<String> {
    Ok(base64::engine::general_purpose::STANDARD.encode(encode_proof_bytes(proof)?))
}

/// Undecodable input is a validation failure, not a failed verification.
pub fn decode_proof(encoded: &str) -> ZkAttestResult<Proof<Bn254>> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| ZkAttestError::Validation(format!("proof: invalid base64: {}", e)))?;
    Proof::<Bn254>::deserialize_compressed(&bytes[..])
        .map_err(|e| ZkAttestError::Validation(format!("proof: undecodable: {}", e)))
}

pub struct Prover {
    keys: Arc<CircuitKeys>,
}

impl Prover {
    pub fn new(keys: Arc<CircuitKeys>) -> Self {
        Self { keys }
    }

    /// Prove `witness`. An unsatisfiable witness is reported as a
    /// `ConstraintViolation` and no proof is produced.
    pub fn prove<R: RngCore + CryptoRng>(
        &self,
        witness: &Witness,
        rng: &mut R,
    ) -> ZkAttestResult<ProofBundle> {
        check_satisfied(witness)?;

        let circuit = EligibilityCircuit::from_witness(witness);
        let proof = Groth16::<Bn254>::prove(self.keys.proving_key(), circuit, rng)
            .map_err(|e| ZkAttestError::Circuit(format!("proof generation failed: {}", e)))?;

        let commitment = field_to_commitment(&witness.public.commitment);
        debug!("Generated eligibility proof for commitment {}", commitment.short());

        Ok(ProofBundle {
            proof,
            public_inputs: witness.public.clone(),
            commitment,
        })
    }

    pub fn prove_credential(
        &self,
        credential: &Credential,
        requirements: &RequirementSet,
        membership: &MerkleProof<Fr>,
    ) -> ZkAttestResult<ProofBundle> {
        let witness = WitnessBuilder::build(credential, requirements, membership)?;
        self.prove(&witness, &mut OsRng)
    }
}

/// Synthesize into a fresh constraint system and check every constraint.
/// Groth16 proving does not reject unsatisfied witnesses in release builds.
fn check_satisfied(witness: &Witness) -> ZkAttestResult<()> {
    let cs = ConstraintSystem::<Fr>::new_ref();
    EligibilityCircuit::from_witness(witness)
        .generate_constraints(cs.clone())
        .map_err(|e| ZkAttestError::Circuit(format!("synthesis failed: {}", e)))?;

    let satisfied = cs
        .is_satisfied()
        .map_err(|e| ZkAttestError::Circuit(format!("satisfiability check failed: {}", e)))?;
    if satisfied {
        return Ok(());
    }

    let unmet = witness
        .unmet_requirements()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    let detail = if unmet.is_empty() {
        "credential does not satisfy the requirements".to_string()
    } else {
        unmet.join(", ")
    };
    Err(ZkAttestError::ConstraintViolation(detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::JurisdictionTree;
    use crate::test_keys;
    use crate::verifier::Verifier;
    use crate::witness::ProofInputs;
    use rand::{rngs::StdRng, SeedableRng};
    use zkattest_types::{wire::ProofRequest, ErrorKind};

    fn inputs(age: u64, min_age: u64, accredited: bool) -> (Credential, RequirementSet, MerkleProof<Fr>) {
        let tree = JurisdictionTree::jurisdictions((1..=4u64).map(Fr::from)).unwrap();
        let credential = Credential {
            age,
            jurisdiction: Fr::from(1u64),
            is_accredited: accredited,
            identity_data: Fr::from(12345u64),
            nonce: Fr::from(67890u64),
        };
        let requirements = RequirementSet {
            min_age,
            jurisdiction_root: tree.root(),
            require_accreditation: true,
        };
        (credential, requirements, tree.proof(&Fr::from(1u64)).unwrap())
    }

    #[test]
    fn test_prove_bundle_shape() {
        let prover = Prover::new(test_keys());
        let (credential, requirements, membership) = inputs(25, 18, true);
        let witness = WitnessBuilder::build(&credential, &requirements, &membership).unwrap();

        let mut rng = StdRng::seed_from_u64(7);
        let bundle = prover.prove(&witness, &mut rng).unwrap();
        assert_eq!(bundle.public_inputs, witness.public);
        assert_eq!(bundle.commitment, field_to_commitment(&credential.commitment()));

        let response = bundle.to_response().unwrap();
        assert!(response.success);
        assert_eq!(response.public_inputs[3], response.commitment);

        let decoded = decode_proof(&response.proof).unwrap();
        assert_eq!(decoded, bundle.proof);
    }

    #[test]
    fn test_unsatisfied_witness_never_proves() {
        let prover = Prover::new(test_keys());

        let (credential, requirements, membership) = inputs(25, 30, true);
        let err = prover
            .prove_credential(&credential, &requirements, &membership)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
        assert!(err.to_string().contains("age"));

        let (credential, requirements, membership) = inputs(25, 18, false);
        let err = prover
            .prove_credential(&credential, &requirements, &membership)
            .unwrap_err();
        assert!(matches!(err, ZkAttestError::ConstraintViolation(_)));
        assert!(err.to_string().contains("accreditation"));
    }

    /// Request for holder of `jurisdiction` against an allow-list of `1..=size`.
    fn member_request(size: u64, jurisdiction: u64) -> ProofRequest {
        let tree = JurisdictionTree::jurisdictions((1..=size).map(Fr::from)).unwrap();
        ProofInputs {
            credential: Credential {
                age: 25,
                jurisdiction: Fr::from(jurisdiction),
                is_accredited: true,
                identity_data: Fr::from(12345u64),
                nonce: Fr::from(67890u64),
            },
            requirements: RequirementSet {
                min_age: 18,
                jurisdiction_root: tree.root(),
                require_accreditation: true,
            },
            membership: tree.proof(&Fr::from(jurisdiction)).unwrap(),
        }
        .to_request()
    }

    #[test]
    fn test_prove_and_verify_non_zero_leaf_index() {
        let prover = Prover::new(test_keys());
        let verifier = Verifier::new(test_keys().verifying_key()).unwrap();
        let mut rng = StdRng::seed_from_u64(13);

        // Mid-tree leaf, and the last leaf of an odd-sized list
        for (size, jurisdiction, helper) in [(4u64, 3u64, ["0", "1"]), (5, 5, ["0", "0"])] {
            let request = member_request(size, jurisdiction);
            assert_eq!(request.merkle_helper[..2], helper);

            let witness = ProofInputs::from_request(&request)
                .unwrap()
                .build_witness()
                .unwrap();
            assert_eq!(witness.membership.leaf_index, jurisdiction - 1);

            let response = prover.prove(&witness, &mut rng).unwrap().to_response().unwrap();
            assert!(verifier
                .verify_encoded(&response.proof, &response.public_inputs)
                .unwrap());
        }
    }

    #[test]
    fn test_flipped_merkle_helper_is_constraint_violation() {
        let prover = Prover::new(test_keys());

        let mut request = member_request(4, 3);
        request.merkle_helper[1] = "0".into();

        let witness = ProofInputs::from_request(&request)
            .unwrap()
            .build_witness()
            .unwrap();
        let err = prover.prove(&witness, &mut OsRng).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
        assert!(err.to_string().contains("jurisdiction"));
    }

    #[test]
    fn test_decode_proof_rejects_garbage() {
        assert!(matches!(decode_proof("not base64!"), Err(ZkAttestError::Validation(_))));
        assert!(matches!(decode_proof("AAAA"), Err(ZkAttestError::Validation(_))));
    }
}
