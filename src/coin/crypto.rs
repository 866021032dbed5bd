//! The coin's cryptographic service seam.
//!
//! The driver only needs five operations; they are behind a trait so that a
//! deployment can offload the pairing work to a worker pool, and so the
//! driver tests can run with a mock. [`ThresholdSigner`] is the production
//! implementation over the crate's own TBLS module.

use async_trait::async_trait;

use crate::crypto::tbls::{self, PartialSignature, Signature, SignatureShare, TblsParams};
use crate::crypto::{PrivateKeyShare, Result};
use crate::messaging::NodeId;

/// The cryptography a [`super::CommonCoin`] driver depends on. All methods
/// are async: they may be CPU-heavy and are allowed to suspend.
#[async_trait]
pub trait CoinCrypto: Send + Sync {
    /// Signs the round payload with this party's key share.
    async fn sign_share(&self, payload: &[u8]) -> Result<SignatureShare>;

    /// Whether `share` is a valid share of `sender` over `payload`.
    async fn verify_share(&self, share: &SignatureShare, payload: &[u8], sender: NodeId) -> bool;

    /// Combines collected shares into the master signature. `None` signals
    /// the round cannot be completed from these shares.
    async fn combine_signatures(&self, shares: &[PartialSignature]) -> Option<Signature>;

    /// Whether `sig` is the master signature over `payload`.
    async fn verify_signature(&self, sig: &Signature, payload: &[u8]) -> bool;

    /// Extracts the coin bit from a combined signature.
    fn hash_to_bit(&self, sig: &Signature) -> bool;
}

/// [`CoinCrypto`] backed by this crate's TBLS implementation and one party's
/// key share.
pub struct ThresholdSigner {
    params: TblsParams,
    our_share: PrivateKeyShare,
}

impl ThresholdSigner {
    /// Creates the signer for the party owning `our_share`.
    pub fn new(params: TblsParams, our_share: PrivateKeyShare) -> Self {
        ThresholdSigner { params, our_share }
    }
}

#[async_trait]
impl CoinCrypto for ThresholdSigner {
    async fn sign_share(&self, payload: &[u8]) -> Result<SignatureShare> {
        Ok(tbls::sign_share(&self.our_share, payload).value)
    }

    async fn verify_share(&self, share: &SignatureShare, payload: &[u8], sender: NodeId) -> bool {
        // Party `p` holds the share dealt to player `p + 1`.
        tbls::verify_share(&self.params, share, payload, u64::from(sender) + 1).is_ok()
    }

    async fn combine_signatures(&self, shares: &[PartialSignature]) -> Option<Signature> {
        if shares.len() < self.params.threshold {
            return None;
        }
        // Lagrange is symmetric over any threshold-sized subset, so the
        // combiner takes exactly the first `threshold` shares.
        tbls::combine_partial_signatures(&self.params, &shares[..self.params.threshold]).ok()
    }

    async fn verify_signature(&self, sig: &Signature, payload: &[u8]) -> bool {
        tbls::verify_signature(&self.params, payload, sig).is_ok()
    }

    fn hash_to_bit(&self, sig: &Signature) -> bool {
        tbls::hash_to_bit(sig)
    }
}
