//! Crypto errors.

use thiserror::Error as ThisError;

/// A crypto error.
///
/// Keygen, combining and the codecs return these to the caller; share-level
/// verification failures are additionally surfaced here so that protocol
/// drivers can decide to drop the offending message instead of aborting.
#[derive(Clone, Eq, PartialEq, Debug, ThisError)]
pub enum Error {
    /// The threshold is not in `1..=players`.
    #[error("invalid threshold for the number of players")]
    InvalidThreshold,
    /// The number of players is zero or exceeds what the scheme supports.
    #[error("invalid number of players")]
    InvalidPlayerCount,
    /// A player id outside `1..=players` was presented.
    #[error("share id out of range")]
    InvalidShareId,
    /// A signature or decryption share does not match its verification key.
    #[error("share verification failed")]
    ShareVerificationFailed,
    /// A combined signature does not match the master public key.
    #[error("signature verification failed")]
    SignatureVerificationFailed,
    /// Fewer shares than the threshold requires.
    #[error("not enough signature shares")]
    NotEnoughShares,
    /// Two shares carry the same player id.
    #[error("shares contain a duplicated player id")]
    DuplicatePlayerId,
    /// The id list and the share list have different lengths.
    #[error("mismatched number of ids and shares")]
    MismatchedIdsAndSigs,
    /// Bytes that do not encode a group element, or a backend failure.
    #[error("bytes don't encode a valid group element")]
    InvalidGroupElement,
    /// The system randomness source failed.
    #[error("could not gather randomness")]
    RandomnessFailure,
    /// A ciphertext failed its pairing consistency check.
    #[error("invalid ciphertext")]
    InvalidCiphertext,
    /// Symmetric decryption failed; wrong key or corrupted data.
    #[error("symmetric decryption failed")]
    DecryptionFailed,
    /// Fewer than `K` erasure-code stripes were supplied.
    #[error("not enough stripes to reconstruct")]
    InsufficientShards,
    /// The supplied stripes are not all of the same length.
    #[error("stripes have inconsistent sizes")]
    InconsistentShardSize,
    /// The decode submatrix could not be inverted. Unreachable with a Cauchy
    /// generator matrix; kept as a guard against corrupted state.
    #[error("decode matrix is not invertible")]
    UninvertibleMatrix,
    /// The reconstructed payload's length prefix exceeds the data.
    #[error("corrupt length prefix in reconstructed data")]
    CorruptLengthPrefix,
    /// The payload is too large for the 32-bit length prefix.
    #[error("payload exceeds the encodable size")]
    PayloadTooLarge,
    /// A Merkle proof was requested for an index past the last leaf.
    #[error("leaf index out of range")]
    MerkleOutOfRange,
}

/// A crypto result.
pub type Result<T> = ::std::result::Result<T, Error>;
