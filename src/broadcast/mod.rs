//! Reliable broadcast.
//!
//! Bracha-style reliable broadcast with erasure coding and Merkle
//! commitments. A designated leader splits its value into `N` stripes of
//! which any `K = N - 2f` reconstruct it, commits to them with a Merkle
//! tree, and sends each party its stripe plus inclusion proof (`Val`).
//! Parties echo their stripes to everyone (`Echo`); `N - f` echoes - or,
//! for parties running behind, `f + 1` `Ready` confirmations - trigger a
//! `Ready` broadcast, and `2f + 1` `Ready`s plus `K` stripes deliver. Every
//! correct party delivers the same value or none, an equivocating leader
//! cannot split the network, and per-party bandwidth stays proportional to
//! the value size.
//!
//! [`RbcCore`] is the pure state machine emitting [`Effect`]s;
//! [`ReliableBroadcast`] is the async driver that validates stripes against
//! the Merkle commitment, performs the sends and decodes on delivery.

mod broadcast;
mod coder;
mod core;
mod error;
mod message;

pub use self::broadcast::{RbcOutput, ReliableBroadcast};
pub use self::coder::{BroadcastCrypto, Coder};
pub use self::core::{RbcConfig, RbcCore};
pub use self::error::{Error, Result};
pub use self::message::{Effect, Message, Payload, StripePayload};
