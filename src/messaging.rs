//! Identifiers and the I/O seams shared by all protocol drivers.
//!
//! The drivers in [`crate::broadcast`] and [`crate::coin`] never touch a
//! socket. Outbound traffic goes through a [`Transceiver`] and inbound traffic
//! is pulled from a [`MessageStream`]; an integrator wires both to its actual
//! transport. The in-memory implementations used by the test suites are
//! ordinary `tokio` channels via the blanket [`MessageStream`] impl below.

use async_trait::async_trait;
use tokio::sync::mpsc;

/// A party's identifier: an integer in `[0, N)`.
pub type NodeId = u32;

/// Identifier of one protocol instance. State is never shared across sessions;
/// every message carries the session it belongs to and messages from other
/// sessions are dropped on ingress.
pub type SessionId = u64;

/// The outbound half of the transport, shared by all sessions of one party.
///
/// `broadcast` must eventually deliver the message to every party *including
/// the sender*; a transport may short-circuit the local copy. Delivery is
/// asynchronous and unordered - the protocols tolerate arbitrary delay,
/// reordering and duplication. Sending is infallible from the protocol's
/// perspective; retries and peer lifecycle are the transport's concern.
#[async_trait]
pub trait Transceiver<M>: Send + Sync {
    /// Sends `msg` to exactly one peer.
    async fn unicast(&self, target: NodeId, msg: M);

    /// Sends `msg` to every party, including this one.
    async fn broadcast(&self, msg: M);
}

/// The inbound half of the transport: an asynchronous pull stream of messages
/// addressed to one protocol instance. `None` means the stream is exhausted
/// and no further message will ever arrive.
#[async_trait]
pub trait MessageStream<M>: Send {
    /// Awaits the next inbound message.
    async fn next(&mut self) -> Option<M>;
}

#[async_trait]
impl<M: Send> MessageStream<M> for mpsc::Receiver<M> {
    async fn next(&mut self) -> Option<M> {
        self.recv().await
    }
}

#[async_trait]
impl<M: Send> MessageStream<M> for mpsc::UnboundedReceiver<M> {
    async fn next(&mut self) -> Option<M> {
        self.recv().await
    }
}
