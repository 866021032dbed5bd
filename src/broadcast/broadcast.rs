//! The asynchronous reliable-broadcast driver.

use log::{debug, warn};

use super::coder::BroadcastCrypto;
use super::core::{RbcConfig, RbcCore};
use super::error::{Error, Result};
use super::message::{Effect, Message, Payload, StripePayload};
use crate::crypto::merkle::Digest;
use crate::messaging::{MessageStream, NodeId, Transceiver};

/// The outcome of a completed broadcast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RbcOutput {
    /// The Merkle root the network agreed on.
    pub root: Digest,
    /// The leader's value, reconstructed from the collected stripes.
    pub payload: Vec<u8>,
}

/// One party's instance of a reliable broadcast session.
///
/// The driver owns the [`RbcCore`] exclusively; running it means feeding it
/// the message stream until the value delivers. Inbound `Val` and `Echo`
/// stripes are checked against their Merkle commitment before they reach the
/// core, and messages that fail - wrong proof, wrong index, wrong session -
/// are silently dropped, which is the entire defence against Byzantine
/// senders.
pub struct ReliableBroadcast<T, C> {
    config: RbcConfig,
    transport: T,
    crypto: C,
    core: RbcCore,
}

impl<T, C> ReliableBroadcast<T, C>
where
    T: Transceiver<Message>,
    C: BroadcastCrypto,
{
    /// Creates the instance described by `config`.
    pub fn new(config: RbcConfig, transport: T, crypto: C) -> Self {
        ReliableBroadcast {
            config,
            transport,
            crypto,
            core: RbcCore::new(config),
        }
    }

    /// Runs the session to completion.
    ///
    /// If this party is the leader, `input` is the value to disseminate; all
    /// other parties pass `None`. Returns the delivered output, or
    /// [`Error::Incomplete`] if the stream ends first.
    pub async fn run<S>(mut self, input: Option<Vec<u8>>, mut stream: S) -> Result<RbcOutput>
    where
        S: MessageStream<Message>,
    {
        if let Some(data) = input {
            if self.config.our_id != self.config.leader {
                return Err(Error::NotLeader);
            }
            if let Some(output) = self.propose(data).await? {
                return Ok(output);
            }
        }

        while let Some(msg) = stream.next().await {
            if msg.session_id != self.config.session_id {
                debug!("dropping message for foreign session {}", msg.session_id);
                continue;
            }
            if !self.is_valid(&msg).await {
                warn!("dropping invalid broadcast message from {}", msg.sender);
                continue;
            }
            let effects = self.core.handle_message(msg);
            if let Some(output) = self.apply_effects(effects).await? {
                return Ok(output);
            }
        }
        Err(Error::Incomplete)
    }

    /// The leader's proposal: encode, commit, hand every party its stripe.
    /// Our own `Val` goes through the core first, so the resulting `Echo`
    /// precedes the stripe hand-outs on the wire.
    async fn propose(&mut self, data: Vec<u8>) -> Result<Option<RbcOutput>> {
        let tree = self.crypto.build_tree(&data).await?;
        let root = *tree.root();
        for index in 0..self.config.num_nodes {
            let proof = tree.proof(index).map_err(Error::Coding)?;
            let msg = Message {
                sender: self.config.our_id,
                session_id: self.config.session_id,
                payload: Payload::Val(StripePayload {
                    root,
                    proof,
                    stripe: tree.leaf(index).to_vec(),
                }),
            };
            if index as NodeId == self.config.our_id {
                let effects = self.core.handle_message(msg.clone());
                if let Some(output) = self.apply_effects(effects).await? {
                    return Ok(Some(output));
                }
            }
            // The transport may short-circuit the copy to ourselves; the
            // core's leader-root guard absorbs it either way.
            self.transport.unicast(index as NodeId, msg).await;
        }
        Ok(None)
    }

    /// Validates a message before it may touch the core. The sender must be
    /// a known party, `Val` must prove our own stripe index, `Echo` the
    /// sender's, and both must verify against the claimed root.
    async fn is_valid(&self, msg: &Message) -> bool {
        if msg.sender as usize >= self.config.num_nodes {
            return false;
        }
        let (payload, expected_index) = match &msg.payload {
            Payload::Val(p) => (p, self.config.our_id),
            Payload::Echo(p) => (p, msg.sender),
            Payload::Ready(_) => return true,
        };
        payload.proof.leaf_index == expected_index
            && self
                .crypto
                .verify_stripe(&payload.stripe, &payload.proof, &payload.root)
                .await
    }

    /// Performs the core's effects in emission order. A `Deliver` effect
    /// decodes the collected stripes and finishes the session; a decode
    /// failure at that point means the leader handed out stripes that do not
    /// form a codeword, which is fatal.
    async fn apply_effects(&mut self, effects: Vec<Effect>) -> Result<Option<RbcOutput>> {
        for effect in effects {
            match effect {
                Effect::Broadcast(msg) => self.transport.broadcast(msg).await,
                Effect::SendTo(target, msg) => self.transport.unicast(target, msg).await,
                Effect::Deliver(root) => {
                    let stripes = self.core.stripes(&root).cloned().unwrap_or_default();
                    let payload = self.crypto.decode(&stripes).await.map_err(Error::Coding)?;
                    return Ok(Some(RbcOutput { root, payload }));
                }
            }
        }
        Ok(None)
    }
}
