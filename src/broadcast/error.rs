use std::result;

use thiserror::Error as ThisError;

use crate::crypto;

/// A broadcast error.
#[derive(Clone, PartialEq, Debug, ThisError)]
pub enum Error {
    /// Merkle or erasure-code failure; fatal for the session.
    #[error("coding error: {0}")]
    Coding(#[from] crypto::Error),
    /// A value was supplied but this instance's party is not the leader.
    #[error("only the leader's instance can propose a value")]
    NotLeader,
    /// The message stream ended before the delivery predicate held.
    #[error("message stream ended before broadcast could complete")]
    Incomplete,
}

/// A broadcast result.
pub type Result<T> = result::Result<T, Error>;
