//! The coin's only message kind: a broadcast signature share.

use std::fmt::{self, Debug};

use serde::{Deserialize, Serialize};

use crate::crypto::tbls::SignatureShare;
use crate::messaging::{NodeId, SessionId};

/// A signature share over one round's payload, broadcast by `sender`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The broadcasting party.
    pub sender: NodeId,
    /// The session this share belongs to.
    pub session_id: SessionId,
    /// The coin round the share contributes to.
    pub round: u64,
    /// The sender's TBLS share over the round payload.
    pub share: SignatureShare,
}

impl Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CoinShare {{ sender: {}, session: {}, round: {}, {:?} }}",
            self.sender, self.session_id, self.round, self.share
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::tbls::Signature;
    use bls12_381::{G1Projective, Scalar};

    #[test]
    fn test_serde_roundtrip() {
        let msg = Message {
            sender: 2,
            session_id: 200,
            round: 7,
            share: SignatureShare(Signature(G1Projective::generator() * Scalar::from(11u64))),
        };
        let ser = bincode::serialize(&msg).expect("serialize");
        let de: Message = bincode::deserialize(&ser).expect("deserialize");
        assert_eq!(msg, de);
        // The share travels as its 48-byte compression plus a length prefix.
        assert_eq!(ser.len(), 4 + 8 + 8 + 8 + 48);
    }
}
