//! A binary Merkle tree with domain-separated SHA-256 hashing.
//!
//! Leaves are hashed as `SHA-256(0x00 || leaf)` and internal nodes as
//! `SHA-256(0x01 || left || right)`, so a leaf can never be confused with an
//! interior node. The bottom row is padded to the next power of two `P` with
//! the hash of the empty byte string, and the tree is stored as a 1-indexed
//! array of `2 * P` nodes with the root at index 1.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use subtle::ConstantTimeEq;

use super::{Error, Result};

/// A 32-byte SHA-256 digest.
pub type Digest = [u8; 32];

const LEAF_PREFIX: u8 = 0x00;
const INTERNAL_PREFIX: u8 = 0x01;

/// A Merkle tree over a list of equal-purpose byte leaves.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    leaves: Vec<Vec<u8>>,
    /// 1-indexed complete binary tree; `nodes[0]` is unused.
    nodes: Vec<Digest>,
    root: Digest,
}

impl MerkleTree {
    /// Builds a tree committing to `leaves`.
    ///
    /// For empty input the root is the all-zero digest. That sentinel only
    /// exists so that `build` is total; verify paths must never accept it.
    pub fn build(leaves: Vec<Vec<u8>>) -> Self {
        if leaves.is_empty() {
            return MerkleTree {
                leaves,
                nodes: Vec::new(),
                root: Digest::default(),
            };
        }

        let n = leaves.len();
        let p = n.next_power_of_two();
        let mut nodes = vec![Digest::default(); 2 * p];
        for (i, leaf) in leaves.iter().enumerate() {
            nodes[p + i] = hash_leaf(leaf);
        }
        if n < p {
            let pad = hash_leaf(&[]);
            for node in &mut nodes[p + n..] {
                *node = pad;
            }
        }
        for i in (1..p).rev() {
            nodes[i] = hash_internal(&nodes[2 * i], &nodes[2 * i + 1]);
        }
        let root = nodes[1];
        MerkleTree {
            leaves,
            nodes,
            root,
        }
    }

    /// Returns the root digest.
    pub fn root(&self) -> &Digest {
        &self.root
    }

    /// Returns the number of leaves.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Returns `true` if the tree has no leaves.
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Returns the leaf at `index`.
    ///
    /// Panics if `index` is past the last leaf; use [`MerkleTree::proof`] for
    /// a fallible lookup.
    pub fn leaf(&self, index: usize) -> &[u8] {
        &self.leaves[index]
    }

    /// Returns the slice of all leaves.
    pub fn leaves(&self) -> &[Vec<u8>] {
        &self.leaves
    }

    /// Returns the inclusion proof for the leaf at `index`: the sibling
    /// digests from the leaf's level up to, but not including, the root.
    pub fn proof(&self, index: usize) -> Result<Proof> {
        if index >= self.leaves.len() {
            return Err(Error::MerkleOutOfRange);
        }
        let padded = self.nodes.len() / 2;
        let mut siblings = Vec::with_capacity(padded.trailing_zeros() as usize);
        let mut t = index + padded;
        while t > 1 {
            siblings.push(self.nodes[t ^ 1]);
            t >>= 1;
        }
        Ok(Proof {
            leaf_index: index as u32,
            siblings,
        })
    }
}

/// A proof that some leaf sits at `leaf_index` in the tree with a given root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// The position of the proven leaf in the bottom row.
    pub leaf_index: u32,
    /// Sibling digests, ordered from the leaf's level towards the root.
    pub siblings: Vec<Digest>,
}

/// Recomputes the root from `leaf` and `proof` and compares it to `root` in
/// constant time.
pub fn verify(leaf: &[u8], proof: &Proof, root: &Digest) -> bool {
    let mut acc = hash_leaf(leaf);
    let mut idx = proof.leaf_index;
    for sibling in &proof.siblings {
        acc = if idx & 1 == 1 {
            hash_internal(sibling, &acc)
        } else {
            hash_internal(&acc, sibling)
        };
        idx >>= 1;
    }
    bool::from(acc[..].ct_eq(&root[..]))
}

fn hash_leaf(leaf: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(leaf);
    hasher.finalize().into()
}

fn hash_internal(left: &Digest, right: &Digest) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update([INTERNAL_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn leaves(n: usize) -> Vec<Vec<u8>> {
        (0..n).map(|i| vec![i as u8; 3]).collect()
    }

    #[test]
    fn test_roundtrip() {
        for &n in &[1, 2, 4, 7, 8, 9, 17] {
            let tree = MerkleTree::build(leaves(n));
            for i in 0..n {
                let proof = tree.proof(i).expect("couldn't get proof");
                assert!(verify(tree.leaf(i), &proof, tree.root()));
            }
            assert_eq!(tree.proof(n), Err(Error::MerkleOutOfRange));
        }
    }

    #[test]
    fn test_single_leaf_has_empty_proof() {
        let tree = MerkleTree::build(vec![b"only".to_vec()]);
        let proof = tree.proof(0).expect("proof");
        assert!(proof.siblings.is_empty());
        assert!(verify(b"only", &proof, tree.root()));
    }

    #[test]
    fn test_tampering_falsifies() {
        let tree = MerkleTree::build(leaves(5));
        let proof = tree.proof(2).expect("proof");
        let root = *tree.root();

        let mut bad_leaf = tree.leaf(2).to_vec();
        bad_leaf[0] ^= 1;
        assert!(!verify(&bad_leaf, &proof, &root));

        let mut bad_proof = proof.clone();
        bad_proof.siblings[0][0] ^= 1;
        assert!(!verify(tree.leaf(2), &bad_proof, &root));

        let mut bad_root = root;
        bad_root[31] ^= 1;
        assert!(!verify(tree.leaf(2), &proof, &bad_root));
    }

    #[test]
    fn test_wrong_index_falsifies() {
        let tree = MerkleTree::build(leaves(4));
        let mut proof = tree.proof(1).expect("proof");
        proof.leaf_index = 2;
        assert!(!verify(tree.leaf(1), &proof, tree.root()));
    }

    #[test]
    fn test_empty_tree_root_is_sentinel() {
        let tree = MerkleTree::build(Vec::new());
        assert_eq!(tree.root(), &[0u8; 32]);
    }

    proptest! {
        #[test]
        fn prop_roundtrip(
            (leaf_list, index) in proptest::collection::vec(
                proptest::collection::vec(any::<u8>(), 0..48),
                1..128,
            )
            .prop_flat_map(|leaf_list| {
                let len = leaf_list.len();
                (Just(leaf_list), 0..len)
            }),
        ) {
            let tree = MerkleTree::build(leaf_list.clone());
            let proof = tree.proof(index).expect("proof");
            prop_assert!(verify(&leaf_list[index], &proof, tree.root()));

            // Any single-bit flip in the leaf falsifies the proof.
            let mut tampered = leaf_list[index].clone();
            if let Some(byte) = tampered.first_mut() {
                *byte ^= 0x80;
                prop_assert!(!verify(&tampered, &proof, tree.root()));
            }
        }
    }

    #[test]
    fn test_leaf_is_not_internal() {
        // A single 64-byte leaf must not collide with the node built from its
        // halves; the 0x00/0x01 prefixes keep the two hash domains apart.
        let left = [7u8; 32];
        let right = [9u8; 32];
        let concat: Vec<u8> = left.iter().chain(right.iter()).cloned().collect();
        assert_ne!(hash_leaf(&concat), hash_internal(&left, &right));
    }
}
