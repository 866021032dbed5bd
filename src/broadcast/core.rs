//! The pure reliable-broadcast state machine.
//!
//! The core consumes one message at a time and returns the effects the
//! driver must perform, in order. It does no hashing and no I/O; stripe
//! validity against the Merkle commitment is the driver's job, *before* the
//! message reaches the core. What the core does enforce is the protocol's
//! equivocation tolerance: only the leader's first root is ever accepted
//! from a `Val`, duplicate senders are ignored, and `Ready` is emitted at
//! most once per root.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use super::message::{Effect, Message, Payload, StripePayload};
use crate::crypto::merkle::Digest;
use crate::messaging::{NodeId, SessionId};

/// Fixed parameters of one broadcast session.
#[derive(Clone, Copy, Debug)]
pub struct RbcConfig {
    /// The session this instance serves.
    pub session_id: SessionId,
    /// This party's id.
    pub our_id: NodeId,
    /// The number of parties `N`.
    pub num_nodes: usize,
    /// The fault tolerance `f`, with `N > 3f`.
    pub num_faulty: usize,
    /// The party expected to propose the value.
    pub leader: NodeId,
}

impl RbcConfig {
    /// `N - f`: echoes required to send `Ready`.
    fn echo_threshold(&self) -> usize {
        self.num_nodes - self.num_faulty
    }

    /// `f + 1`: `Ready`s required to amplify our own `Ready`.
    fn ready_threshold(&self) -> usize {
        self.num_faulty + 1
    }

    /// `2f + 1`: `Ready`s required to deliver.
    fn output_threshold(&self) -> usize {
        2 * self.num_faulty + 1
    }

    /// `K = N - 2f`: stripes required to decode.
    fn stripe_threshold(&self) -> usize {
        self.num_nodes - 2 * self.num_faulty
    }
}

/// Per-session broadcast state.
#[derive(Debug)]
pub struct RbcCore {
    config: RbcConfig,
    /// The root proposed by the leader; set by the first valid `Val` and
    /// never changed again.
    leader_root: Option<Digest>,
    /// Stripes by root and the party they belong to; at most one per party.
    stripes: BTreeMap<Digest, BTreeMap<NodeId, Vec<u8>>>,
    /// Who has echoed each root.
    echo_senders: BTreeMap<Digest, BTreeSet<NodeId>>,
    /// Who has sent `Ready` for each root.
    ready_senders: BTreeMap<Digest, BTreeSet<NodeId>>,
    /// Roots we have broadcast `Ready` for. Monotone: never unset.
    ready_sent: BTreeSet<Digest>,
    /// The delivered root, if any. At most one root delivers per session.
    delivered: Option<Digest>,
}

impl RbcCore {
    /// Creates the state machine for one session.
    pub fn new(config: RbcConfig) -> Self {
        RbcCore {
            config,
            leader_root: None,
            stripes: BTreeMap::new(),
            echo_senders: BTreeMap::new(),
            ready_senders: BTreeMap::new(),
            ready_sent: BTreeSet::new(),
            delivered: None,
        }
    }

    /// Consumes one validated message and returns the effects to perform.
    /// Messages from foreign sessions are dropped here as a second line of
    /// defence; drivers filter them earlier.
    pub fn handle_message(&mut self, msg: Message) -> Vec<Effect> {
        if msg.session_id != self.config.session_id {
            debug!(
                "dropping broadcast message for foreign session {}",
                msg.session_id
            );
            return Vec::new();
        }
        match msg.payload {
            Payload::Val(p) => self.handle_val(msg.sender, p),
            Payload::Echo(p) => self.handle_echo(msg.sender, p),
            Payload::Ready(root) => self.handle_ready(msg.sender, root),
        }
    }

    /// The stripes collected for `root`, for the driver to decode once the
    /// `Deliver` effect has been emitted.
    pub fn stripes(&self, root: &Digest) -> Option<&BTreeMap<NodeId, Vec<u8>>> {
        self.stripes.get(root)
    }

    /// The root this session delivered, if it has.
    pub fn delivered(&self) -> Option<&Digest> {
        self.delivered.as_ref()
    }

    /// `Val`: accept only the leader's first root, store our stripe under
    /// our own id and echo it to everyone.
    fn handle_val(&mut self, sender: NodeId, p: StripePayload) -> Vec<Effect> {
        if sender != self.config.leader {
            debug!("dropping Val from non-leader {}", sender);
            return Vec::new();
        }
        if self.leader_root.is_some() {
            debug!("dropping repeated Val from leader {}", sender);
            return Vec::new();
        }
        let root = p.root;
        self.leader_root = Some(root);
        self.stripes
            .entry(root)
            .or_default()
            .insert(self.config.our_id, p.stripe.clone());
        self.echo_senders
            .entry(root)
            .or_default()
            .insert(self.config.our_id);
        vec![Effect::Broadcast(self.our_message(Payload::Echo(p)))]
    }

    /// `Echo`: record the sender's stripe; `N - f` echoes trigger `Ready`.
    fn handle_echo(&mut self, sender: NodeId, p: StripePayload) -> Vec<Effect> {
        let root = p.root;
        let echoes = self.echo_senders.entry(root).or_default();
        if !echoes.insert(sender) {
            debug!("ignoring duplicate Echo from {}", sender);
            return Vec::new();
        }
        self.stripes.entry(root).or_default().insert(sender, p.stripe);

        let mut effects = Vec::new();
        if self.echo_senders[&root].len() >= self.config.echo_threshold() {
            effects.extend(self.send_ready(&root));
        }
        effects.extend(self.check_delivery(&root));
        effects
    }

    /// `Ready`: count the sender; `f + 1` `Ready`s amplify our own.
    fn handle_ready(&mut self, sender: NodeId, root: Digest) -> Vec<Effect> {
        let readys = self.ready_senders.entry(root).or_default();
        if !readys.insert(sender) {
            debug!("ignoring duplicate Ready from {}", sender);
            return Vec::new();
        }

        let mut effects = Vec::new();
        if self.ready_senders[&root].len() >= self.config.ready_threshold() {
            effects.extend(self.send_ready(&root));
        }
        effects.extend(self.check_delivery(&root));
        effects
    }

    /// Emits `Ready(root)` unless it was already sent. Our own membership in
    /// the `Ready` set is recorded immediately; the broadcast copy that the
    /// transport loops back is absorbed as a duplicate.
    fn send_ready(&mut self, root: &Digest) -> Option<Effect> {
        if !self.ready_sent.insert(*root) {
            return None;
        }
        self.ready_senders
            .entry(*root)
            .or_default()
            .insert(self.config.our_id);
        Some(Effect::Broadcast(
            self.our_message(Payload::Ready(*root)),
        ))
    }

    /// The delivery predicate: `2f + 1` `Ready`s and `K` stripes, at most
    /// once per session.
    fn check_delivery(&mut self, root: &Digest) -> Option<Effect> {
        if self.delivered.is_some() {
            return None;
        }
        let readys = self.ready_senders.get(root).map_or(0, BTreeSet::len);
        if readys < self.config.output_threshold() {
            return None;
        }
        let stripes = self.stripes.get(root).map_or(0, BTreeMap::len);
        if stripes < self.config.stripe_threshold() {
            return None;
        }
        self.delivered = Some(*root);
        Some(Effect::Deliver(*root))
    }

    fn our_message(&self, payload: Payload) -> Message {
        Message {
            sender: self.config.our_id,
            session_id: self.config.session_id,
            payload,
        }
    }
}
