//! Credential, requirement set and the full circuit assignment built from them.

use crate::commitment::{compute_commitment, field_to_commitment};
use crate::field::{fr_to_hex, parse_bool, parse_field, parse_field_strict, parse_u64};
use crate::merkle::{verify_proof, MerkleProof, PoseidonHasher};
use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use std::fmt;
use zkattest_types::{
    wire::ProofRequest, Commitment, ZkAttestError, ZkAttestResult, JURISDICTION_TREE_DEPTH,
    PUBLIC_INPUT_COUNT,
};

/// Private attributes of the holder. Never persisted.
#[derive(Clone)]
pub struct Credential {
    pub age: u64,
    pub jurisdiction: Fr,
    pub is_accredited: bool,
    pub identity_data: Fr,
    pub nonce: Fr,
}

impl Credential {
    pub fn commitment(&self) -> Fr {
        compute_commitment(self.identity_data, self.nonce)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("age", &"[REDACTED]")
            .field("jurisdiction", &"[REDACTED]")
            .field("is_accredited", &"[REDACTED]")
            .field("identity_data", &"[REDACTED]")
            .field("nonce", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequirementSet {
    pub min_age: u64,
    pub jurisdiction_root: Fr,
    pub require_accreditation: bool,
}

/// Public inputs in circuit allocation order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicInputs {
    pub min_age: u64,
    pub jurisdiction_root: Fr,
    pub require_accreditation: bool,
    pub commitment: Fr,
}

impl PublicInputs {
    pub fn to_field_elements(&self) -> Vec<Fr> {
        vec![
            Fr::from(self.min_age),
            self.jurisdiction_root,
            Fr::from(self.require_accreditation),
            self.commitment,
        ]
    }

    pub fn from_field_elements(inputs: &[Fr]) -> ZkAttestResult<Self> {
        let [min_age, jurisdiction_root, require_accreditation, commitment] = inputs else {
            return Err(ZkAttestError::Validation(format!(
                "expected {} public inputs, got {}",
                PUBLIC_INPUT_COUNT,
                inputs.len()
            )));
        };

        let min_age = fr_to_u64(min_age)
            .ok_or_else(|| ZkAttestError::Validation("minAge does not fit in 64 bits".into()))?;
        let require_accreditation = match fr_to_u64(require_accreditation) {
            Some(0) => false,
            Some(1) => true,
            _ => {
                return Err(ZkAttestError::Validation(
                    "requireAccreditation must be 0 or 1".into(),
                ))
            }
        };

        Ok(Self {
            min_age,
            jurisdiction_root: *jurisdiction_root,
            require_accreditation,
            commitment: *commitment,
        })
    }

    /// Fixed-width `0x` hex, one entry per input.
    pub fn to_hex(&self) -> Vec<String> {
        self.to_field_elements().iter().map(fr_to_hex).collect()
    }

    pub fn from_hex(inputs: &[String]) -> ZkAttestResult<Self> {
        let fields = parse_public_inputs(inputs)?;
        Self::from_field_elements(&fields)
    }

    pub fn commitment_bytes(&self) -> Commitment {
        field_to_commitment(&self.commitment)
    }
}

/// Strict decoding of hex-encoded public inputs.
pub fn parse_public_inputs(inputs: &[String]) -> ZkAttestResult<Vec<Fr>> {
    if inputs.len() != PUBLIC_INPUT_COUNT {
        return Err(ZkAttestError::Validation(format!(
            "expected {} public inputs, got {}",
            PUBLIC_INPUT_COUNT,
            inputs.len()
        )));
    }
    inputs
        .iter()
        .enumerate()
        .map(|(i, s)| parse_field_strict(&format!("publicInputs[{}]", i), s))
        .collect()
}

fn fr_to_u64(f: &Fr) -> Option<u64> {
    let bigint = f.into_bigint();
    if bigint.num_bits() > 64 {
        return None;
    }
    Some(bigint.as_ref()[0])
}

/// A circuit requirement, for reporting which one a credential fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Requirement {
    Age,
    Jurisdiction,
    Accreditation,
    Identity,
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Requirement::Age => "age below minimum",
            Requirement::Jurisdiction => "jurisdiction not in allow-list",
            Requirement::Accreditation => "accreditation required",
            Requirement::Identity => "commitment mismatch",
        };
        f.write_str(name)
    }
}

/// Complete assignment for one proof.
#[derive(Clone)]
pub struct Witness {
    pub public: PublicInputs,
    pub age: u64,
    pub jurisdiction: Fr,
    pub is_accredited: bool,
    pub identity_data: Fr,
    pub nonce: Fr,
    pub membership: MerkleProof<Fr>,
}

impl Witness {
    /// Evaluate every circuit check natively.
    pub fn unmet_requirements(&self) -> Vec<Requirement> {
        let mut unmet = Vec::new();
        if self.age < self.public.min_age {
            unmet.push(Requirement::Age);
        }
        if !verify_proof(
            &PoseidonHasher,
            &self.jurisdiction,
            &self.membership,
            &self.public.jurisdiction_root,
        ) {
            unmet.push(Requirement::Jurisdiction);
        }
        if self.public.require_accreditation && !self.is_accredited {
            unmet.push(Requirement::Accreditation);
        }
        if compute_commitment(self.identity_data, self.nonce) != self.public.commitment {
            unmet.push(Requirement::Identity);
        }
        unmet
    }
}

impl fmt::Debug for Witness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Witness")
            .field("public", &self.public)
            .field("private", &"[REDACTED]")
            .finish()
    }
}

pub struct WitnessBuilder;

impl WitnessBuilder {
    /// Assemble the assignment. Requirement satisfaction is left to the
    /// circuit; only structural consistency is checked here.
    pub fn build(
        credential: &Credential,
        requirements: &RequirementSet,
        membership: &MerkleProof<Fr>,
    ) -> ZkAttestResult<Witness> {
        if membership.depth() != JURISDICTION_TREE_DEPTH {
            return Err(ZkAttestError::Validation(format!(
                "merkle path must have {} siblings, got {}",
                JURISDICTION_TREE_DEPTH,
                membership.depth()
            )));
        }
        if membership.leaf_index >> JURISDICTION_TREE_DEPTH != 0 {
            return Err(ZkAttestError::Validation(
                "merkle leaf index exceeds tree capacity".into(),
            ));
        }
        if membership.leaf != credential.jurisdiction {
            return Err(ZkAttestError::Validation(
                "membership proof is for a different jurisdiction".into(),
            ));
        }

        Ok(Witness {
            public: PublicInputs {
                min_age: requirements.min_age,
                jurisdiction_root: requirements.jurisdiction_root,
                require_accreditation: requirements.require_accreditation,
                commitment: credential.commitment(),
            },
            age: credential.age,
            jurisdiction: credential.jurisdiction,
            is_accredited: credential.is_accredited,
            identity_data: credential.identity_data,
            nonce: credential.nonce,
            membership: membership.clone(),
        })
    }
}

/// Typed form of a [`ProofRequest`].
#[derive(Clone, Debug)]
pub struct ProofInputs {
    pub credential: Credential,
    pub requirements: RequirementSet,
    pub membership: MerkleProof<Fr>,
}

impl ProofInputs {
    pub fn from_request(request: &ProofRequest) -> ZkAttestResult<Self> {
        let credential = Credential {
            age: parse_u64("age", &request.age)?,
            jurisdiction: parse_field("jurisdiction", &request.jurisdiction)?,
            is_accredited: parse_bool("isAccredited", &request.is_accredited)?,
            identity_data: parse_field("identityData", &request.identity_data)?,
            nonce: parse_field("nonce", &request.nonce)?,
        };

        let requirements = RequirementSet {
            min_age: parse_u64("minAge", &request.min_age)?,
            jurisdiction_root: parse_field("jurisdictionRoot", &request.jurisdiction_root)?,
            require_accreditation: parse_bool(
                "requireAccreditation",
                &request.require_accreditation,
            )?,
        };

        let siblings = request
            .merkle_path
            .iter()
            .enumerate()
            .map(|(i, s)| parse_field(&format!("merklePath[{}]", i), s))
            .collect::<ZkAttestResult<Vec<_>>>()?;
        let bits = request
            .merkle_helper
            .iter()
            .enumerate()
            .map(|(i, s)| parse_bool(&format!("merkleHelper[{}]", i), s))
            .collect::<ZkAttestResult<Vec<_>>>()?;
        let membership = MerkleProof::from_path_bits(credential.jurisdiction, siblings, &bits)?;

        Ok(Self {
            credential,
            requirements,
            membership,
        })
    }

    pub fn to_request(&self) -> ProofRequest {
        ProofRequest {
            age: self.credential.age.to_string(),
            jurisdiction: fr_to_hex(&self.credential.jurisdiction),
            is_accredited: u8::from(self.credential.is_accredited).to_string(),
            identity_data: fr_to_hex(&self.credential.identity_data),
            nonce: fr_to_hex(&self.credential.nonce),
            merkle_path: self.membership.siblings.iter().map(fr_to_hex).collect(),
            merkle_helper: self
                .membership
                .path_bits()
                .into_iter()
                .map(|b| u8::from(b).to_string())
                .collect(),
            min_age: self.requirements.min_age.to_string(),
            jurisdiction_root: fr_to_hex(&self.requirements.jurisdiction_root),
            require_accreditation: u8::from(self.requirements.require_accreditation).to_string(),
        }
    }

    pub fn build_witness(&self) -> ZkAttestResult<Witness> {
        WitnessBuilder::build(&self.credential, &self.requirements, &self.membership)
    }
}
