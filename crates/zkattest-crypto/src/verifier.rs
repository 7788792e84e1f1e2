use crate::prover::decode_proof;
use crate::witness::parse_public_inputs;
use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, PreparedVerifyingKey, Proof, VerifyingKey};
use ark_snark::SNARK;
use tracing::{debug, warn};
use zkattest_types::{ZkAttestError, ZkAttestResult, PUBLIC_INPUT_COUNT};

/// Stateless Groth16 verifier bound to one verifying key.
#[derive(Clone)]
pub struct Verifier {
    prepared_vk: PreparedVerifyingKey<Bn254>,
}

impl Verifier {
    pub fn new(verifying_key: &VerifyingKey<Bn254>) -> ZkAttestResult<Self> {
        let prepared_vk = Groth16::<Bn254>::process_vk(verifying_key)
            .map_err(|e| ZkAttestError::Circuit(format!("failed to prepare verifying key: {}", e)))?;
        Ok(Self { prepared_vk })
    }

    pub fn from_prepared(prepared_vk: PreparedVerifyingKey<Bn254>) -> Self {
        Self { prepared_vk }
    }

    /// `Ok(false)` means the pairing check failed; malformed input is an error.
    pub fn verify(&self, proof: &Proof<Bn254>, public_inputs: &[Fr]) -> ZkAttestResult<bool> {
        if public_inputs.len() != PUBLIC_INPUT_COUNT {
            return Err(ZkAttestError::Validation(format!(
                "expected {} public inputs, got {}",
                PUBLIC_INPUT_COUNT,
                public_inputs.len()
            )));
        }

        let valid = Groth16::<Bn254>::verify_with_processed_vk(&self.prepared_vk, public_inputs, proof)
            .map_err(|e| ZkAttestError::Circuit(format!("verification failed to run: {}", e)))?;

        if valid {
            debug!("Eligibility proof verified");
        } else {
            warn!(target: "security", "Eligibility proof rejected by pairing check");
        }
        Ok(valid)
    }

    /// Verify a base64 proof against hex public inputs in wire order.
    pub fn verify_encoded(&self, proof_b64: &str, public_inputs: &[String]) -> ZkAttestResult<bool> {
        let inputs = parse_public_inputs(public_inputs)?;
        let proof = decode_proof(proof_b64)?;
        self.verify(&proof, &inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::fr_to_hex;
    use crate::keys::CircuitKeys;
    use crate::merkle::JurisdictionTree;
    use crate::prover::{encode_proof, Prover};
    use crate::test_keys;
    use crate::witness::{Credential, RequirementSet, WitnessBuilder};
    use rand::{rngs::StdRng, SeedableRng};
    use std::sync::OnceLock;

    fn bundle() -> &'static (String, Vec<String>) {
        static BUNDLE: OnceLock<(String, Vec<String>)> = OnceLock::new();
        BUNDLE.get_or_init(|| {
            let tree = JurisdictionTree::jurisdictions((1..=4u64).map(Fr::from)).unwrap();
            let credential = Credential {
                age: 25,
                jurisdiction: Fr::from(1u64),
                is_accredited: true,
                identity_data: Fr::from(12345u64),
                nonce: Fr::from(67890u64),
            };
            let requirements = RequirementSet {
                min_age: 18,
                jurisdiction_root: tree.root(),
                require_accreditation: true,
            };
            let membership = tree.proof(&Fr::from(1u64)).unwrap();
            let witness = WitnessBuilder::build(&credential, &requirements, &membership).unwrap();

            let mut rng = StdRng::seed_from_u64(11);
            let proof = Prover::new(test_keys()).prove(&witness, &mut rng).unwrap();
            (encode_proof(&proof.proof).unwrap(), proof.public_inputs.to_hex())
        })
    }

    fn verifier() -> Verifier {
        Verifier::new(test_keys().verifying_key()).unwrap()
    }

    #[test]
    fn test_valid_proof_verifies() {
        let (proof, inputs) = bundle();
        assert!(verifier().verify_encoded(proof, inputs).unwrap());

        let from_prepared = Verifier::from_prepared(test_keys().prepared_verifying_key().clone());
        assert!(from_prepared.verify_encoded(proof, inputs).unwrap());
    }

    #[test]
    fn test_tampered_public_input_fails() {
        let (proof, inputs) = bundle();
        let verifier = verifier();

        // Raising minAge after the fact
        let mut tampered = inputs.clone();
        tampered[0] = fr_to_hex(&Fr::from(30u64));
        assert!(!verifier.verify_encoded(proof, &tampered).unwrap());

        // Swapping the commitment
        let mut tampered = inputs.clone();
        tampered[3] = fr_to_hex(&Fr::from(1u64));
        assert!(!verifier.verify_encoded(proof, &tampered).unwrap());
    }

    #[test]
    fn test_wrong_input_count_rejected() {
        let (proof, inputs) = bundle();
        let err = verifier().verify_encoded(proof, &inputs[..3]).unwrap_err();
        assert!(matches!(err, ZkAttestError::Validation(_)));

        let mut extra = inputs.clone();
        extra.push(inputs[0].clone());
        assert!(verifier().verify_encoded(proof, &extra).is_err());
    }

    #[test]
    fn test_malformed_inputs_rejected() {
        let (proof, inputs) = bundle();

        let mut short = inputs.clone();
        short[1] = "0x1234".into();
        assert!(matches!(
            verifier().verify_encoded(proof, &short),
            Err(ZkAttestError::Validation(_))
        ));

        let mut non_canonical = inputs.clone();
        non_canonical[1] = format!("0x{}", "ff".repeat(32));
        assert!(verifier().verify_encoded(proof, &non_canonical).is_err());

        assert!(matches!(
            verifier().verify_encoded("%%%", inputs),
            Err(ZkAttestError::Validation(_))
        ));
    }

    #[test]
    fn test_mismatched_key_fails() {
        let (proof, inputs) = bundle();
        let mut rng = StdRng::seed_from_u64(99);
        let other = CircuitKeys::generate(&mut rng).unwrap();
        let verifier = Verifier::new(other.verifying_key()).unwrap();
        assert!(!verifier.verify_encoded(proof, inputs).unwrap());
    }
}
