//! The three broadcast message kinds and the core's effect type.

use std::fmt::{self, Debug};

use hex_fmt::HexFmt;
use serde::{Deserialize, Serialize};

use crate::crypto::merkle::{Digest, Proof};
use crate::messaging::{NodeId, SessionId};

/// A stripe together with the Merkle commitment tying it to a root:
/// the content of `Val` and `Echo` messages.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StripePayload {
    /// The Merkle root committing to all `N` stripes.
    pub root: Digest,
    /// Inclusion proof for `stripe` under `root`.
    pub proof: Proof,
    /// One erasure-code stripe of the leader's value.
    pub stripe: Vec<u8>,
}

impl Debug for StripePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ #{}, root: {:0.10}, stripe: {:0.10} }}",
            self.proof.leaf_index,
            HexFmt(&self.root),
            HexFmt(&self.stripe)
        )
    }
}

/// The kinds of message sent during a reliable broadcast.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// The leader's stripe hand-out, unicast to its owner.
    Val(StripePayload),
    /// A party's own stripe, multicast so everyone can reconstruct.
    Echo(StripePayload),
    /// Confirmation that the sender knows everyone will be able to decode
    /// the value behind this root.
    Ready(Digest),
}

impl Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Val(p) => f.debug_tuple("Val").field(p).finish(),
            Payload::Echo(p) => f.debug_tuple("Echo").field(p).finish(),
            Payload::Ready(root) => write!(f, "Ready({:0.10})", HexFmt(root)),
        }
    }
}

/// A broadcast message, tagged with its sender and session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The sending party.
    pub sender: NodeId,
    /// The session this message belongs to.
    pub session_id: SessionId,
    /// The message content.
    pub payload: Payload,
}

/// An I/O action requested by the pure core. The driver performs effects in
/// emission order before feeding the core its next message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Multicast the message to every party, this one included.
    Broadcast(Message),
    /// Send the message to the given party only.
    SendTo(NodeId, Message),
    /// The delivery predicate holds for this root; decode and output.
    Deliver(Digest),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_roundtrip() {
        let val = Message {
            sender: 3,
            session_id: 9,
            payload: Payload::Val(StripePayload {
                root: [7; 32],
                proof: Proof {
                    leaf_index: 3,
                    siblings: vec![[1; 32], [2; 32]],
                },
                stripe: vec![1, 2, 3, 4, 5],
            }),
        };
        let ser = bincode::serialize(&val).expect("serialize");
        let de: Message = bincode::deserialize(&ser).expect("deserialize");
        assert_eq!(val, de);

        let ready = Message {
            sender: 0,
            session_id: 9,
            payload: Payload::Ready([9; 32]),
        };
        let ser = bincode::serialize(&ready).expect("serialize");
        let de: Message = bincode::deserialize(&ser).expect("deserialize");
        assert_eq!(ready, de);
    }
}
