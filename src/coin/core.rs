//! Pure per-round coin state.
//!
//! The core owns nothing but maps and sets; the driver verifies shares
//! *before* handing them in and performs all signing, combining and I/O.

use std::collections::{BTreeMap, BTreeSet};

use crate::crypto::tbls::{PartialSignature, SignatureShare};
use crate::messaging::{NodeId, SessionId};

/// Bookkeeping for all rounds of one coin session.
#[derive(Debug)]
pub struct CoinCore {
    session_id: SessionId,
    our_id: NodeId,
    num_faulty: usize,
    /// Verified shares by round and sender; at most one per sender.
    received: BTreeMap<u64, BTreeMap<NodeId, SignatureShare>>,
    /// Rounds for which our own share has been broadcast.
    requested: BTreeSet<u64>,
    /// Rounds whose bit has been extracted; their shares are discarded.
    finished: BTreeSet<u64>,
}

impl CoinCore {
    /// Creates the state for one session of `num_nodes` parties tolerating
    /// `num_faulty` faults.
    pub fn new(
        session_id: SessionId,
        our_id: NodeId,
        _num_nodes: usize,
        num_faulty: usize,
    ) -> Self {
        CoinCore {
            session_id,
            our_id,
            num_faulty,
            received: BTreeMap::new(),
            requested: BTreeSet::new(),
            finished: BTreeSet::new(),
        }
    }

    /// The session this core serves.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// This party's id.
    pub fn our_id(&self) -> NodeId {
        self.our_id
    }

    /// The number of shares needed to extract a coin: `f + 1`.
    pub fn threshold(&self) -> usize {
        self.num_faulty + 1
    }

    /// Whether our own share for `round` has already been broadcast.
    pub fn has_requested(&self, round: u64) -> bool {
        self.requested.contains(&round)
    }

    /// Records that our own share for `round` is being broadcast. At most one
    /// share is ever sent per round.
    pub fn mark_requested(&mut self, round: u64) {
        self.requested.insert(round);
    }

    /// Absorbs a verified share. Duplicate senders are ignored. Returns
    /// whether the threshold is met for this round.
    pub fn add_share(&mut self, round: u64, sender: NodeId, share: SignatureShare) -> bool {
        let round_shares = self.received.entry(round).or_default();
        if round_shares.contains_key(&sender) {
            return false;
        }
        round_shares.insert(sender, share);
        self.is_threshold_met(round)
    }

    /// Whether at least `f + 1` shares are held for `round`.
    pub fn is_threshold_met(&self, round: u64) -> bool {
        self.received
            .get(&round)
            .map_or(false, |shares| shares.len() >= self.threshold())
    }

    /// The shares collected for `round`, tagged with their 1-based player
    /// ids. The Lagrange combination is symmetric, so order is irrelevant.
    pub fn get_shares(&self, round: u64) -> Vec<PartialSignature> {
        self.received
            .get(&round)
            .into_iter()
            .flatten()
            .map(|(&sender, &share)| PartialSignature {
                // Party `p` holds the Shamir share evaluated at `x = p + 1`.
                player_id: u64::from(sender) + 1,
                value: share,
            })
            .collect()
    }

    /// Whether the coin for `round` has been extracted.
    pub fn is_finished(&self, round: u64) -> bool {
        self.finished.contains(&round)
    }

    /// Marks `round` as done and discards its shares to bound memory.
    pub fn mark_finished(&mut self, round: u64) {
        self.finished.insert(round);
        self.received.remove(&round);
    }

    /// The canonical bytes all parties sign for `round`:
    /// the ASCII rendering of `"<session_id>:<round>"`. Different sessions
    /// therefore never reuse a coin.
    pub fn make_payload_bytes(&self, round: u64) -> Vec<u8> {
        format!("{}:{}", self.session_id, round).into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::tbls::{Signature, SignatureShare};
    use bls12_381::G1Projective;

    fn dummy_share(i: u64) -> SignatureShare {
        SignatureShare(Signature(G1Projective::generator() * bls12_381::Scalar::from(i + 1)))
    }

    #[test]
    fn test_payload_bytes() {
        let core = CoinCore::new(200, 1, 4, 1);
        assert_eq!(core.make_payload_bytes(1), b"200:1".to_vec());
        assert_eq!(core.make_payload_bytes(0), b"200:0".to_vec());
    }

    #[test]
    fn test_threshold_at_f_plus_one() {
        let mut core = CoinCore::new(7, 0, 4, 1);
        assert!(!core.add_share(3, 2, dummy_share(2)));
        assert!(!core.is_threshold_met(3));
        assert!(core.add_share(3, 0, dummy_share(0)));
        assert!(core.is_threshold_met(3));
    }

    #[test]
    fn test_duplicate_sender_ignored() {
        let mut core = CoinCore::new(7, 0, 4, 1);
        assert!(!core.add_share(1, 2, dummy_share(2)));
        // A second share from the same sender changes nothing, not even when
        // it would otherwise cross the threshold.
        assert!(!core.add_share(1, 2, dummy_share(9)));
        assert_eq!(core.get_shares(1).len(), 1);
        assert_eq!(core.get_shares(1)[0].value, dummy_share(2));
    }

    #[test]
    fn test_player_ids_are_one_based() {
        let mut core = CoinCore::new(7, 0, 4, 1);
        core.add_share(1, 0, dummy_share(0));
        core.add_share(1, 3, dummy_share(3));
        let ids: Vec<u64> = core.get_shares(1).iter().map(|p| p.player_id).collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[test]
    fn test_finish_discards_shares() {
        let mut core = CoinCore::new(7, 0, 4, 1);
        core.add_share(5, 0, dummy_share(0));
        core.add_share(5, 1, dummy_share(1));
        assert!(!core.is_finished(5));
        core.mark_finished(5);
        assert!(core.is_finished(5));
        assert!(core.get_shares(5).is_empty());
        assert!(!core.is_threshold_met(5));
    }

    #[test]
    fn test_requested_is_sticky() {
        let mut core = CoinCore::new(7, 0, 4, 1);
        assert!(!core.has_requested(2));
        core.mark_requested(2);
        assert!(core.has_requested(2));
    }
}
