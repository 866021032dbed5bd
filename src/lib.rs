//! # HoneyBFT core
//!
//! Building blocks for asynchronous Byzantine fault tolerant consensus in the
//! HoneyBadgerBFT family. Among `N` participants of which up to `f < N / 3`
//! may behave arbitrarily, this crate provides the two primitives that
//! higher-level atomic broadcast is composed of:
//!
//! - [`broadcast`]: **Reliable Broadcast** (RBC). A designated leader
//!   disseminates a value; every correct party eventually delivers the same
//!   value, even under full asynchrony and equivocation attempts. Bandwidth is
//!   kept at `O(|v|)` per party by erasure-coding the value and committing to
//!   the stripes with a Merkle tree.
//! - [`coin`]: **Common Coin**. For each round, all correct parties obtain the
//!   same unpredictable bit, produced by combining `f + 1` BLS threshold
//!   signature shares over a round-specific payload.
//!
//! Both protocols are split into a *pure core* - a state machine that consumes
//! one message at a time and emits effects, with no I/O of its own - and an
//! *async driver* that performs network sends, message-stream pulls and
//! potentially CPU-heavy cryptography behind the seams declared in
//! [`messaging`].
//!
//! The [`crypto`] module holds the underlying primitives: Shamir key
//! generation, threshold BLS signatures, threshold public-key encryption with
//! a hybrid AES layer, the domain-separated Merkle tree and the systematic
//! Reed-Solomon erasure code, all over BLS12-381.
//!
//! Transports, process orchestration and the outer agreement layer that
//! composes RBC and the coin into a full protocol are out of scope; the crate
//! only assumes the [`messaging::Transceiver`] and [`messaging::MessageStream`]
//! contracts.

#![warn(missing_docs)]

pub mod broadcast;
pub mod coin;
pub mod crypto;
pub mod messaging;

pub use crate::messaging::{MessageStream, NodeId, SessionId, Transceiver};
