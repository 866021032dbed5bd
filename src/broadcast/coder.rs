//! The broadcast's cryptographic service seam.
//!
//! Tree building, proof verification and decoding may be CPU-heavy for large
//! values, so the driver reaches them through an async trait; [`Coder`] is
//! the production implementation over the crate's own erasure code and
//! Merkle tree.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::crypto::erasure::Coding;
use crate::crypto::merkle::{self, Digest, MerkleTree, Proof};
use crate::crypto::Result;
use crate::messaging::NodeId;

/// The cryptography a [`super::ReliableBroadcast`] driver depends on.
#[async_trait]
pub trait BroadcastCrypto: Send + Sync {
    /// Erasure-encodes `data` into `N` stripes and builds the Merkle tree
    /// committing to them; the tree retains the stripes as its leaves.
    async fn build_tree(&self, data: &[u8]) -> Result<MerkleTree>;

    /// Whether `stripe` is proven by `proof` to sit under `root`.
    async fn verify_stripe(&self, stripe: &[u8], proof: &Proof, root: &Digest) -> bool;

    /// Reconstructs the value from at least `K` collected stripes.
    async fn decode(&self, stripes: &BTreeMap<NodeId, Vec<u8>>) -> Result<Vec<u8>>;
}

/// [`BroadcastCrypto`] backed by the crate's Reed-Solomon code and Merkle
/// tree, configured for `K = N - 2f` data stripes.
pub struct Coder {
    coding: Coding,
}

impl Coder {
    /// Creates the coder for `num_nodes` parties tolerating `num_faulty`
    /// faults; requires `N > 3f`.
    pub fn new(num_nodes: usize, num_faulty: usize) -> Result<Self> {
        if num_nodes <= 3 * num_faulty {
            return Err(crate::crypto::Error::InvalidPlayerCount);
        }
        let coding = Coding::new(num_nodes - 2 * num_faulty, num_nodes)?;
        Ok(Coder { coding })
    }
}

#[async_trait]
impl BroadcastCrypto for Coder {
    async fn build_tree(&self, data: &[u8]) -> Result<MerkleTree> {
        let stripes = self.coding.encode(data)?;
        Ok(MerkleTree::build(stripes))
    }

    async fn verify_stripe(&self, stripe: &[u8], proof: &Proof, root: &Digest) -> bool {
        merkle::verify(stripe, proof, root)
    }

    async fn decode(&self, stripes: &BTreeMap<NodeId, Vec<u8>>) -> Result<Vec<u8>> {
        let shards: BTreeMap<usize, Vec<u8>> = stripes
            .iter()
            .map(|(&id, stripe)| (id as usize, stripe.clone()))
            .collect();
        self.coding.decode(&shards)
    }
}
