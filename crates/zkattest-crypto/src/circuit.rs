use crate::commitment::commitment_gadget;
use crate::merkle::{fold_path, PoseidonGadgetHasher};
use crate::witness::Witness;
use ark_bn254::Fr;
use ark_ff::{BigInteger, Field, PrimeField};
use ark_r1cs_std::{
    alloc::AllocVar,
    boolean::Boolean,
    eq::EqGadget,
    fields::fp::FpVar,
    R1CSVar,
};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
use zkattest_types::{AGE_BIT_WIDTH, JURISDICTION_TREE_DEPTH};

/// Eligibility relation. Public inputs are allocated in the order
/// `minAge, jurisdictionRoot, requireAccreditation, commitment`.
#[derive(Clone)]
pub struct EligibilityCircuit {
    min_age: Option<u64>,
    jurisdiction_root: Option<Fr>,
    require_accreditation: Option<bool>,
    commitment: Option<Fr>,

    age: Option<u64>,
    jurisdiction: Option<Fr>,
    is_accredited: Option<bool>,
    identity_data: Option<Fr>,
    nonce: Option<Fr>,
    merkle_path: Vec<Option<Fr>>,
    merkle_indices: Vec<Option<bool>>,
}

impl EligibilityCircuit {
    pub fn from_witness(witness: &Witness) -> Self {
        Self {
            min_age: Some(witness.public.min_age),
            jurisdiction_root: Some(witness.public.jurisdiction_root),
            require_accreditation: Some(witness.public.require_accreditation),
            commitment: Some(witness.public.commitment),
            age: Some(witness.age),
            jurisdiction: Some(witness.jurisdiction),
            is_accredited: Some(witness.is_accredited),
            identity_data: Some(witness.identity_data),
            nonce: Some(witness.nonce),
            merkle_path: witness.membership.siblings.iter().copied().map(Some).collect(),
            merkle_indices: witness.membership.path_bits().into_iter().map(Some).collect(),
        }
    }

    /// Shape-only instance for key generation.
    pub fn empty() -> Self {
        Self {
            min_age: None,
            jurisdiction_root: None,
            require_accreditation: None,
            commitment: None,
            age: None,
            jurisdiction: None,
            is_accredited: None,
            identity_data: None,
            nonce: None,
            merkle_path: vec![None; JURISDICTION_TREE_DEPTH],
            merkle_indices: vec![None; JURISDICTION_TREE_DEPTH],
        }
    }
}

impl ConstraintSynthesizer<Fr> for EligibilityCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        if self.merkle_path.len() != JURISDICTION_TREE_DEPTH
            || self.merkle_indices.len() != JURISDICTION_TREE_DEPTH
        {
            return Err(SynthesisError::Unsatisfiable);
        }

        // Public inputs, in wire order
        let min_age = FpVar::new_input(cs.clone(), || {
            self.min_age.map(Fr::from).ok_or(SynthesisError::AssignmentMissing)
        })?;

        let jurisdiction_root = FpVar::new_input(cs.clone(), || {
            self.jurisdiction_root.ok_or(SynthesisError::AssignmentMissing)
        })?;

        let require_accreditation = Boolean::new_input(cs.clone(), || {
            self.require_accreditation.ok_or(SynthesisError::AssignmentMissing)
        })?;

        let commitment = FpVar::new_input(cs.clone(), || {
            self.commitment.ok_or(SynthesisError::AssignmentMissing)
        })?;

        // Private witness
        let age = FpVar::new_witness(cs.clone(), || {
            self.age.map(Fr::from).ok_or(SynthesisError::AssignmentMissing)
        })?;

        let jurisdiction = FpVar::new_witness(cs.clone(), || {
            self.jurisdiction.ok_or(SynthesisError::AssignmentMissing)
        })?;

        let is_accredited = Boolean::new_witness(cs.clone(), || {
            self.is_accredited.ok_or(SynthesisError::AssignmentMissing)
        })?;

        let identity_data = FpVar::new_witness(cs.clone(), || {
            self.identity_data.ok_or(SynthesisError::AssignmentMissing)
        })?;

        let nonce = FpVar::new_witness(cs.clone(), || {
            self.nonce.ok_or(SynthesisError::AssignmentMissing)
        })?;

        let mut merkle_path = Vec::with_capacity(JURISDICTION_TREE_DEPTH);
        for sibling in &self.merkle_path {
            merkle_path.push(FpVar::new_witness(cs.clone(), || {
                sibling.ok_or(SynthesisError::AssignmentMissing)
            })?);
        }

        let mut merkle_indices = Vec::with_capacity(JURISDICTION_TREE_DEPTH);
        for idx in &self.merkle_indices {
            merkle_indices.push(Boolean::new_witness(cs.clone(), || {
                idx.ok_or(SynthesisError::AssignmentMissing)
            })?);
        }

        // 1. age >= minAge
        enforce_greater_or_equal(cs.clone(), &age, &min_age, AGE_BIT_WIDTH)?;

        // 2. jurisdiction is a leaf under jurisdictionRoot
        let hasher = PoseidonGadgetHasher::new(cs.clone());
        let computed_root = fold_path(&hasher, &jurisdiction, &merkle_path, &merkle_indices)?;
        computed_root.enforce_equal(&jurisdiction_root)?;

        // 3. requireAccreditation * (1 - isAccredited) == 0
        require_accreditation
            .and(&is_accredited.not())?
            .enforce_equal(&Boolean::FALSE)?;

        // 4. commitment == Poseidon(identityData, nonce)
        let computed_commitment = commitment_gadget(cs, &identity_data, &nonce)?;
        computed_commitment.enforce_equal(&commitment)?;

        Ok(())
    }
}

/// Decompose `value` into `width` little-endian bits and constrain the
/// recomposition, which bounds `value < 2^width`.
pub fn enforce_bit_width(
    cs: ConstraintSystemRef<Fr>,
    value: &FpVar<Fr>,
    width: usize,
) -> Result<Vec<Boolean<Fr>>, SynthesisError> {
    let mut bits = Vec::with_capacity(width);
    for i in 0..width {
        bits.push(Boolean::new_witness(cs.clone(), || {
            let v = value.value()?;
            Ok(v.into_bigint().get_bit(i))
        })?);
    }
    Boolean::le_bits_to_fp_var(&bits)?.enforce_equal(value)?;
    Ok(bits)
}

/// Enforce `a >= b` for operands of at most `width` bits.
///
/// With both sides range-checked, `a - b + 2^width` lies in `[1, 2^(width+1))`
/// and its top bit is set exactly when `a >= b`.
pub fn enforce_greater_or_equal(
    cs: ConstraintSystemRef<Fr>,
    a: &FpVar<Fr>,
    b: &FpVar<Fr>,
    width: usize,
) -> Result<(), SynthesisError> {
    enforce_bit_width(cs.clone(), a, width)?;
    enforce_bit_width(cs.clone(), b, width)?;

    let offset = Fr::from(2u64).pow([width as u64]);
    let shifted = a - b + FpVar::Constant(offset);
    let bits = enforce_bit_width(cs, &shifted, width + 1)?;
    bits[width].enforce_equal(&Boolean::TRUE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::JurisdictionTree;
    use crate::witness::{Credential, Requirement, RequirementSet, WitnessBuilder};
    use ark_relations::r1cs::{ConstraintSystem, SynthesisMode};
    use zkattest_types::PUBLIC_INPUT_COUNT;

    fn witness(age: u64, min_age: u64, accredited: bool, require: bool) -> Witness {
        member_witness(4, 1, age, min_age, accredited, require)
    }

    /// Holder of `jurisdiction` against an allow-list of `1..=size`.
    fn member_witness(
        size: u64,
        jurisdiction: u64,
        age: u64,
        min_age: u64,
        accredited: bool,
        require: bool,
    ) -> Witness {
        let tree = JurisdictionTree::jurisdictions((1..=size).map(Fr::from)).unwrap();
        let credential = Credential {
            age,
            jurisdiction: Fr::from(jurisdiction),
            is_accredited: accredited,
            identity_data: Fr::from(12345u64),
            nonce: Fr::from(67890u64),
        };
        let requirements = RequirementSet {
            min_age,
            jurisdiction_root: tree.root(),
            require_accreditation: require,
        };
        let membership = tree.proof(&Fr::from(jurisdiction)).unwrap();
        WitnessBuilder::build(&credential, &requirements, &membership).unwrap()
    }

    fn is_satisfied(witness: &Witness) -> bool {
        let cs = ConstraintSystem::<Fr>::new_ref();
        EligibilityCircuit::from_witness(witness)
            .generate_constraints(cs.clone())
            .unwrap();
        cs.is_satisfied().unwrap()
    }

    #[test]
    fn test_satisfied() {
        assert!(is_satisfied(&witness(25, 18, true, true)));
        assert!(is_satisfied(&witness(18, 18, true, true)));
        assert!(is_satisfied(&witness(25, 18, false, false)));
        assert!(is_satisfied(&witness(u64::MAX, 0, true, false)));
    }

    #[test]
    fn test_satisfied_at_every_leaf_position() {
        for jurisdiction in 1..=4u64 {
            let w = member_witness(4, jurisdiction, 25, 18, true, true);
            assert_eq!(w.membership.leaf_index, jurisdiction - 1);
            assert!(is_satisfied(&w), "jurisdiction {}", jurisdiction);
        }

        // Last leaf of an odd level is paired with its own duplicate
        let w = member_witness(5, 5, 25, 18, true, true);
        assert_eq!(w.membership.siblings[0], Fr::from(5u64));
        assert!(is_satisfied(&w));
    }

    #[test]
    fn test_flipped_direction_bit() {
        let w = member_witness(4, 3, 25, 18, true, true);
        assert_eq!(w.membership.path_bits()[..2].to_vec(), vec![false, true]);

        for level in [0usize, 1] {
            let mut flipped = w.clone();
            flipped.membership.leaf_index ^= 1 << level;
            assert!(!is_satisfied(&flipped), "level {}", level);
            assert_eq!(flipped.unmet_requirements(), vec![Requirement::Jurisdiction]);
        }
    }

    #[test]
    fn test_age_below_minimum() {
        assert!(!is_satisfied(&witness(17, 18, true, true)));
        assert!(!is_satisfied(&witness(25, 30, true, true)));
        assert!(!is_satisfied(&witness(0, u64::MAX, true, false)));
    }

    #[test]
    fn test_accreditation_required() {
        assert!(!is_satisfied(&witness(25, 18, false, true)));
    }

    #[test]
    fn test_wrong_root() {
        let mut w = witness(25, 18, true, true);
        w.public.jurisdiction_root = Fr::from(42u64);
        assert!(!is_satisfied(&w));
    }

    #[test]
    fn test_wrong_commitment() {
        let mut w = witness(25, 18, true, true);
        w.nonce = Fr::from(1u64);
        assert!(!is_satisfied(&w));
    }

    #[test]
    fn test_public_input_layout() {
        let w = witness(25, 18, true, true);
        let cs = ConstraintSystem::<Fr>::new_ref();
        EligibilityCircuit::from_witness(&w)
            .generate_constraints(cs.clone())
            .unwrap();

        // Index 0 is the constant one
        assert_eq!(cs.num_instance_variables(), PUBLIC_INPUT_COUNT + 1);
        let cs = cs.borrow().unwrap();
        assert_eq!(cs.instance_assignment[1..].to_vec(), w.public.to_field_elements());
    }

    #[test]
    fn test_setup_shape_matches_proving_shape() {
        let setup = ConstraintSystem::<Fr>::new_ref();
        setup.set_mode(SynthesisMode::Setup);
        EligibilityCircuit::empty()
            .generate_constraints(setup.clone())
            .unwrap();

        let prove = ConstraintSystem::<Fr>::new_ref();
        EligibilityCircuit::from_witness(&witness(25, 18, true, true))
            .generate_constraints(prove.clone())
            .unwrap();

        assert_eq!(setup.num_constraints(), prove.num_constraints());
        assert_eq!(setup.num_witness_variables(), prove.num_witness_variables());
        assert_eq!(setup.num_instance_variables(), prove.num_instance_variables());
    }

    #[test]
    fn test_bit_width_rejects_overflow() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let value = FpVar::new_witness(cs.clone(), || Ok(Fr::from(256u64))).unwrap();
        enforce_bit_width(cs.clone(), &value, 8).unwrap();
        assert!(!cs.is_satisfied().unwrap());

        let cs = ConstraintSystem::<Fr>::new_ref();
        let value = FpVar::new_witness(cs.clone(), || Ok(Fr::from(255u64))).unwrap();
        enforce_bit_width(cs.clone(), &value, 8).unwrap();
        assert!(cs.is_satisfied().unwrap());
    }
}
