//! Fixed-depth binary Merkle accumulator.
//!
//! One tree implementation serves the jurisdiction allow-list and the
//! revocation list, and one path fold serves native verification and the
//! circuit. Layout rules:
//!
//! - A tree of depth `d` always has exactly `d` hashing levels.
//! - A level with an odd number of nodes is padded by duplicating its last
//!   node, so a lone node is hashed with itself.
//! - An empty tree has the root of a tree holding a single empty leaf.
//! - Direction bits are the little-endian bits of the leaf index; a set bit
//!   means the current node is the right child.
//!
//! A path proves that a leaf value is a member, not where it sits. Because of
//! the duplicate padding, the last node of an odd level also verifies under
//! the index one past it, so an in-range `leaf_index` may be `>= len()`.
//! Do not treat `leaf_index` as a unique position.

use crate::poseidon::{poseidon_hash2_fields, poseidon_hash2_gadget};
use ark_bn254::Fr;
use ark_r1cs_std::{boolean::Boolean, fields::fp::FpVar, select::CondSelectGadget};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};
use std::collections::HashMap;
use std::convert::Infallible;
use std::hash::Hash;
use zkattest_types::{ZkAttestError, ZkAttestResult, JURISDICTION_TREE_DEPTH, REVOCATION_TREE_DEPTH};

/// Deepest tree supported; leaf indices must fit in a `u64` with room to spare.
pub const MAX_TREE_DEPTH: usize = 32;

/// Node hashing for one tree flavour.
pub trait MerkleHasher {
    type Node: Clone;
    /// Direction selector. `true`/set means the current node is the right child.
    type Bit;
    type Error;

    fn hash_pair(&self, left: &Self::Node, right: &Self::Node) -> Result<Self::Node, Self::Error>;

    /// Order `(current, sibling)` into `(left, right)` according to `bit`.
    fn order(
        &self,
        bit: &Self::Bit,
        current: &Self::Node,
        sibling: &Self::Node,
    ) -> Result<(Self::Node, Self::Node), Self::Error>;

    fn empty_leaf(&self) -> Self::Node;
}

/// Hash `leaf` up the path. `siblings` and `bits` are consumed pairwise from
/// the leaf level upwards.
pub fn fold_path<H: MerkleHasher>(
    hasher: &H,
    leaf: &H::Node,
    siblings: &[H::Node],
    bits: &[H::Bit],
) -> Result<H::Node, H::Error> {
    let mut current = leaf.clone();
    for (sibling, bit) in siblings.iter().zip(bits) {
        let (left, right) = hasher.order(bit, &current, sibling)?;
        current = hasher.hash_pair(&left, &right)?;
    }
    Ok(current)
}

/// Little-endian direction bits of `index` over `depth` levels.
pub fn index_bits(index: u64, depth: usize) -> Vec<bool> {
    (0..depth)
        .map(|level| level < 64 && (index >> level) & 1 == 1)
        .collect()
}

// ============================================================================
// Hashers
// ============================================================================

#[derive(Clone, Copy, Debug, Default)]
pub struct PoseidonHasher;

impl MerkleHasher for PoseidonHasher {
    type Node = Fr;
    type Bit = bool;
    type Error = Infallible;

    fn hash_pair(&self, left: &Fr, right: &Fr) -> Result<Fr, Infallible> {
        Ok(poseidon_hash2_fields(*left, *right))
    }

    fn order(&self, bit: &bool, current: &Fr, sibling: &Fr) -> Result<(Fr, Fr), Infallible> {
        Ok(if *bit { (*sibling, *current) } else { (*current, *sibling) })
    }

    fn empty_leaf(&self) -> Fr {
        Fr::from(0u64)
    }
}

/// Same tree, expressed as constraints.
#[derive(Clone)]
pub struct PoseidonGadgetHasher {
    cs: ConstraintSystemRef<Fr>,
}

impl PoseidonGadgetHasher {
    pub fn new(cs: ConstraintSystemRef<Fr>) -> Self {
        Self { cs }
    }
}

impl MerkleHasher for PoseidonGadgetHasher {
    type Node = FpVar<Fr>;
    type Bit = Boolean<Fr>;
    type Error = SynthesisError;

    fn hash_pair(&self, left: &FpVar<Fr>, right: &FpVar<Fr>) -> Result<FpVar<Fr>, SynthesisError> {
        poseidon_hash2_gadget(self.cs.clone(), left, right)
    }

    fn order(
        &self,
        bit: &Boolean<Fr>,
        current: &FpVar<Fr>,
        sibling: &FpVar<Fr>,
    ) -> Result<(FpVar<Fr>, FpVar<Fr>), SynthesisError> {
        let left = FpVar::conditionally_select(bit, sibling, current)?;
        let right = FpVar::conditionally_select(bit, current, sibling)?;
        Ok((left, right))
    }

    fn empty_leaf(&self) -> FpVar<Fr> {
        FpVar::Constant(Fr::from(0u64))
    }
}

/// Byte-oriented tree for data that never enters the circuit.
#[derive(Clone, Copy, Debug, Default)]
pub struct Blake3Hasher;

impl MerkleHasher for Blake3Hasher {
    type Node = [u8; 32];
    type Bit = bool;
    type Error = Infallible;

    fn hash_pair(&self, left: &[u8; 32], right: &[u8; 32]) -> Result<[u8; 32], Infallible> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(left);
        hasher.update(right);
        Ok(*hasher.finalize().as_bytes())
    }

    fn order(
        &self,
        bit: &bool,
        current: &[u8; 32],
        sibling: &[u8; 32],
    ) -> Result<([u8; 32], [u8; 32]), Infallible> {
        Ok(if *bit { (*sibling, *current) } else { (*current, *sibling) })
    }

    fn empty_leaf(&self) -> [u8; 32] {
        [0u8; 32]
    }
}

// ============================================================================
// Proofs
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleProof<N> {
    pub leaf: N,
    pub leaf_index: u64,
    /// Leaf level first.
    pub siblings: Vec<N>,
}

impl<N> MerkleProof<N> {
    /// Rebuild a proof from explicit direction bits, leaf level first.
    pub fn from_path_bits(leaf: N, siblings: Vec<N>, bits: &[bool]) -> ZkAttestResult<Self> {
        if bits.len() != siblings.len() {
            return Err(ZkAttestError::Validation(format!(
                "merkle path has {} siblings but {} direction bits",
                siblings.len(),
                bits.len()
            )));
        }
        if bits.len() > MAX_TREE_DEPTH {
            return Err(ZkAttestError::Validation(format!(
                "merkle path deeper than {} levels",
                MAX_TREE_DEPTH
            )));
        }
        let leaf_index = bits
            .iter()
            .enumerate()
            .fold(0u64, |acc, (level, bit)| acc | (u64::from(*bit) << level));
        Ok(Self {
            leaf,
            leaf_index,
            siblings,
        })
    }

    pub fn depth(&self) -> usize {
        self.siblings.len()
    }

    pub fn path_bits(&self) -> Vec<bool> {
        index_bits(self.leaf_index, self.siblings.len())
    }

    /// Index fits in the path; otherwise high bits would be silently dropped.
    fn index_in_range(&self) -> bool {
        self.siblings.len() >= 64 || self.leaf_index >> self.siblings.len() == 0
    }
}

/// Check `proof` for `leaf` against `root` without access to the tree.
pub fn verify_proof<H>(hasher: &H, leaf: &H::Node, proof: &MerkleProof<H::Node>, root: &H::Node) -> bool
where
    H: MerkleHasher<Bit = bool>,
    H::Node: PartialEq,
{
    if proof.leaf != *leaf || !proof.index_in_range() {
        return false;
    }
    match fold_path(hasher, leaf, &proof.siblings, &proof.path_bits()) {
        Ok(computed) => computed == *root,
        Err(_) => false,
    }
}

// ============================================================================
// Tree
// ============================================================================

pub struct MerkleTree<H: MerkleHasher> {
    hasher: H,
    depth: usize,
    /// `levels[0]` holds the leaves, `levels[depth]` the root once non-empty.
    levels: Vec<Vec<H::Node>>,
    positions: HashMap<H::Node, u64>,
    empty_root: H::Node,
}

impl<H> MerkleTree<H>
where
    H: MerkleHasher<Bit = bool>,
    H::Node: Eq + Hash,
    ZkAttestError: From<H::Error>,
{
    pub fn new(hasher: H, depth: usize) -> ZkAttestResult<Self> {
        if depth == 0 || depth > MAX_TREE_DEPTH {
            return Err(ZkAttestError::Validation(format!(
                "tree depth must be between 1 and {}, got {}",
                MAX_TREE_DEPTH, depth
            )));
        }

        let mut empty_root = hasher.empty_leaf();
        for _ in 0..depth {
            empty_root = hasher.hash_pair(&empty_root, &empty_root)?;
        }

        Ok(Self {
            hasher,
            depth,
            levels: vec![Vec::new(); depth + 1],
            positions: HashMap::new(),
            empty_root,
        })
    }

    /// Build a tree and insert `leaves` in order.
    pub fn from_leaves<I>(hasher: H, depth: usize, leaves: I) -> ZkAttestResult<Self>
    where
        I: IntoIterator<Item = H::Node>,
    {
        let mut tree = Self::new(hasher, depth)?;
        for leaf in leaves {
            tree.insert(leaf)?;
        }
        Ok(tree)
    }

    /// Append `leaf` and return its index. Only the rightmost node of each
    /// level is recomputed.
    pub fn insert(&mut self, leaf: H::Node) -> ZkAttestResult<u64> {
        if self.positions.contains_key(&leaf) {
            return Err(ZkAttestError::AlreadyPresent(format!(
                "leaf already at index {}",
                self.positions[&leaf]
            )));
        }
        let index = self.len();
        if index >= self.capacity() {
            return Err(ZkAttestError::TreeFull(self.capacity()));
        }

        self.levels[0].push(leaf.clone());
        self.positions.insert(leaf, index);

        let mut position = index as usize;
        for level in 0..self.depth {
            let parent = position / 2;
            let left = &self.levels[level][parent * 2];
            let right = self.levels[level].get(parent * 2 + 1).unwrap_or(left);
            let hash = self.hasher.hash_pair(left, right)?;

            let next = &mut self.levels[level + 1];
            if parent < next.len() {
                next[parent] = hash;
            } else {
                next.push(hash);
            }
            position = parent;
        }

        Ok(index)
    }

    pub fn root(&self) -> H::Node {
        self.levels[self.depth]
            .first()
            .cloned()
            .unwrap_or_else(|| self.empty_root.clone())
    }

    pub fn proof(&self, leaf: &H::Node) -> ZkAttestResult<MerkleProof<H::Node>> {
        let index = *self
            .positions
            .get(leaf)
            .ok_or_else(|| ZkAttestError::NotFound("leaf is not in the tree".to_string()))?;
        self.proof_at(index)
    }

    pub fn proof_at(&self, index: u64) -> ZkAttestResult<MerkleProof<H::Node>> {
        if index >= self.len() {
            return Err(ZkAttestError::NotFound(format!("no leaf at index {}", index)));
        }

        let mut siblings = Vec::with_capacity(self.depth);
        let mut position = index as usize;
        for level in &self.levels[..self.depth] {
            let node = &level[position];
            siblings.push(level.get(position ^ 1).unwrap_or(node).clone());
            position /= 2;
        }

        Ok(MerkleProof {
            leaf: self.levels[0][index as usize].clone(),
            leaf_index: index,
            siblings,
        })
    }

    pub fn contains(&self, leaf: &H::Node) -> bool {
        self.positions.contains_key(leaf)
    }

    pub fn len(&self) -> u64 {
        self.levels[0].len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.levels[0].is_empty()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    pub fn leaves(&self) -> &[H::Node] {
        &self.levels[0]
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }
}

pub type PoseidonMerkleTree = MerkleTree<PoseidonHasher>;

/// Issuer-built allow-list of jurisdiction ids. Leaves are the raw ids.
pub type JurisdictionTree = PoseidonMerkleTree;

impl MerkleTree<PoseidonHasher> {
    pub fn jurisdictions<I>(ids: I) -> ZkAttestResult<Self>
    where
        I: IntoIterator<Item = Fr>,
    {
        Self::from_leaves(PoseidonHasher, JURISDICTION_TREE_DEPTH, ids)
    }

    pub fn revocations() -> ZkAttestResult<Self> {
        Self::new(PoseidonHasher, REVOCATION_TREE_DEPTH)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ark_r1cs_std::{alloc::AllocVar, R1CSVar};
    use ark_relations::r1cs::ConstraintSystem;
    use proptest::prelude::*;

    fn fr(v: u64) -> Fr {
        Fr::from(v)
    }

    /// Level-by-level rebuild used as a reference for the incremental tree.
    fn naive_root(leaves: &[Fr], depth: usize) -> Fr {
        let mut level: Vec<Fr> = if leaves.is_empty() { vec![fr(0)] } else { leaves.to_vec() };
        for _ in 0..depth {
            level = level
                .chunks(2)
                .map(|pair| {
                    let right = pair.get(1).unwrap_or(&pair[0]);
                    poseidon_hash2_fields(pair[0], *right)
                })
                .collect();
        }
        level[0]
    }

    #[test]
    fn test_incremental_root_matches_rebuild() {
        let mut tree = PoseidonMerkleTree::new(PoseidonHasher, 4).unwrap();
        let mut leaves = Vec::new();
        for v in 1..=7u64 {
            tree.insert(fr(v)).unwrap();
            leaves.push(fr(v));
            assert_eq!(tree.root(), naive_root(&leaves, 4), "after {} leaves", v);
        }
    }

    #[test]
    fn test_empty_tree_root() {
        let tree = PoseidonMerkleTree::new(PoseidonHasher, 3).unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.root(), naive_root(&[], 3));
    }

    #[test]
    fn test_single_leaf_hashes_with_itself() {
        let tree = PoseidonMerkleTree::from_leaves(PoseidonHasher, 1, [fr(9)]).unwrap();
        assert_eq!(tree.root(), poseidon_hash2_fields(fr(9), fr(9)));

        let proof = tree.proof(&fr(9)).unwrap();
        assert_eq!(proof.siblings, vec![fr(9)]);
    }

    #[test]
    fn test_proof_roundtrip() {
        let tree = JurisdictionTree::jurisdictions([fr(1), fr(2), fr(3), fr(4)]).unwrap();
        let root = tree.root();

        for v in 1..=4u64 {
            let proof = tree.proof(&fr(v)).unwrap();
            assert_eq!(proof.depth(), JURISDICTION_TREE_DEPTH);
            assert_eq!(proof.leaf_index, v - 1);
            assert!(verify_proof(&PoseidonHasher, &fr(v), &proof, &root));
        }
    }

    #[test]
    fn test_proof_invalid() {
        let tree = JurisdictionTree::jurisdictions([fr(1), fr(2), fr(3), fr(4)]).unwrap();
        let root = tree.root();
        let proof = tree.proof(&fr(1)).unwrap();

        // Wrong leaf fails
        assert!(!verify_proof(&PoseidonHasher, &fr(2), &proof, &root));

        // Wrong root fails
        assert!(!verify_proof(&PoseidonHasher, &fr(1), &proof, &fr(12345)));

        // Index with bits beyond the path fails
        let mut stretched = proof.clone();
        stretched.leaf_index |= 1 << JURISDICTION_TREE_DEPTH;
        assert!(!verify_proof(&PoseidonHasher, &fr(1), &stretched, &root));
    }

    #[test]
    fn test_old_proof_fails_against_new_root() {
        let full = JurisdictionTree::jurisdictions([fr(1), fr(2), fr(3), fr(4)]).unwrap();
        let proof = full.proof(&fr(1)).unwrap();

        let without_one = JurisdictionTree::jurisdictions([fr(2), fr(3), fr(4)]).unwrap();
        assert!(!without_one.contains(&fr(1)));
        assert!(!verify_proof(&PoseidonHasher, &fr(1), &proof, &without_one.root()));
    }

    #[test]
    fn test_missing_leaf_not_found() {
        let tree = JurisdictionTree::jurisdictions([fr(1), fr(2)]).unwrap();
        let err = tree.proof(&fr(3)).unwrap_err();
        assert!(matches!(err, ZkAttestError::NotFound(_)));
        assert!(tree.proof_at(2).is_err());
    }

    #[test]
    fn test_duplicate_and_capacity() {
        let mut tree = PoseidonMerkleTree::new(PoseidonHasher, 2).unwrap();
        for v in 0..4u64 {
            assert_eq!(tree.insert(fr(v + 10)).unwrap(), v);
        }

        let root = tree.root();
        let err = tree.insert(fr(10)).unwrap_err();
        assert!(matches!(err, ZkAttestError::AlreadyPresent(_)));

        let err = tree.insert(fr(99)).unwrap_err();
        assert!(matches!(err, ZkAttestError::TreeFull(4)));

        // Failed inserts leave the tree untouched
        assert_eq!(tree.root(), root);
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn test_invalid_depth() {
        assert!(PoseidonMerkleTree::new(PoseidonHasher, 0).is_err());
        assert!(PoseidonMerkleTree::new(PoseidonHasher, MAX_TREE_DEPTH + 1).is_err());
    }

    #[test]
    fn test_node_hash_vector() {
        let node = PoseidonHasher.hash_pair(&fr(12345), &fr(67890)).unwrap();
        assert_eq!(
            crate::field::fr_to_hex(&node),
            "0x282bacc2e67948f733b6d5fd36a7d5e4cbb471885e60598369babfc66620883f"
        );
    }

    #[test]
    fn test_padded_index_aliases_last_leaf() {
        let tree = JurisdictionTree::jurisdictions([fr(1), fr(2), fr(3), fr(4), fr(5)]).unwrap();
        let root = tree.root();
        let proof = tree.proof(&fr(5)).unwrap();
        assert_eq!(proof.leaf_index, 4);

        let aliased = MerkleProof {
            leaf_index: 5,
            ..proof.clone()
        };
        assert!(aliased.leaf_index >= tree.len());
        assert!(verify_proof(&PoseidonHasher, &fr(5), &aliased, &root));

        // Only the padded slot aliases; a real neighbour's index does not.
        let neighbour = MerkleProof {
            leaf_index: 3,
            ..proof
        };
        assert!(!verify_proof(&PoseidonHasher, &fr(5), &neighbour, &root));
    }

    #[test]
    fn test_path_bits_roundtrip() {
        let bits = [true, false, true, true];
        let proof = MerkleProof::from_path_bits(fr(1), vec![fr(0); 4], &bits).unwrap();
        assert_eq!(proof.leaf_index, 0b1101);
        assert_eq!(proof.path_bits(), bits.to_vec());

        assert!(MerkleProof::from_path_bits(fr(1), vec![fr(0); 3], &bits).is_err());
    }

    #[test]
    fn test_gadget_fold_matches_native() {
        let tree = JurisdictionTree::jurisdictions([fr(1), fr(2), fr(3), fr(4), fr(5)]).unwrap();
        let proof = tree.proof(&fr(5)).unwrap();

        let cs = ConstraintSystem::<Fr>::new_ref();
        let hasher = PoseidonGadgetHasher::new(cs.clone());
        let leaf = FpVar::new_witness(cs.clone(), || Ok(fr(5))).unwrap();
        let siblings = proof
            .siblings
            .iter()
            .map(|s| FpVar::new_witness(cs.clone(), || Ok(*s)).unwrap())
            .collect::<Vec<_>>();
        let bits = proof
            .path_bits()
            .into_iter()
            .map(|b| Boolean::new_witness(cs.clone(), || Ok(b)).unwrap())
            .collect::<Vec<_>>();

        let root = fold_path(&hasher, &leaf, &siblings, &bits).unwrap();
        assert_eq!(root.value().unwrap(), tree.root());
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_blake3_tree() {
        let leaves: Vec<[u8; 32]> = (0..5u8).map(|i| [i + 1; 32]).collect();
        let tree = MerkleTree::from_leaves(Blake3Hasher, 3, leaves.clone()).unwrap();
        let root = tree.root();
        for leaf in &leaves {
            let proof = tree.proof(leaf).unwrap();
            assert!(verify_proof(&Blake3Hasher, leaf, &proof, &root));
        }
    }

    proptest! {
        #[test]
        fn prop_blake3_every_leaf_verifies(
            values in proptest::collection::hash_set(any::<u64>(), 1..32usize),
            candidate in any::<u64>(),
        ) {
            let leaves: Vec<[u8; 32]> = values
                .iter()
                .map(|v| *blake3::hash(&v.to_le_bytes()).as_bytes())
                .collect();
            let tree = MerkleTree::from_leaves(Blake3Hasher, 5, leaves.clone()).unwrap();
            let root = tree.root();

            for leaf in &leaves {
                let proof = tree.proof(leaf).unwrap();
                prop_assert!(verify_proof(&Blake3Hasher, leaf, &proof, &root));
            }

            if !values.contains(&candidate) {
                let absent = *blake3::hash(&candidate.to_le_bytes()).as_bytes();
                prop_assert!(tree.proof(&absent).is_err());
            }
        }

        #[test]
        fn prop_poseidon_incremental_matches_rebuild(
            values in proptest::collection::hash_set(1u64..1_000_000, 1..9usize),
        ) {
            let leaves: Vec<Fr> = values.iter().map(|v| fr(*v)).collect();
            let tree = PoseidonMerkleTree::from_leaves(PoseidonHasher, 4, leaves.clone()).unwrap();
            prop_assert_eq!(tree.root(), naive_root(&leaves, 4));

            let root = tree.root();
            for leaf in &leaves {
                let proof = tree.proof(leaf).unwrap();
                prop_assert!(verify_proof(&PoseidonHasher, leaf, &proof, &root));
            }
        }
    }
}
