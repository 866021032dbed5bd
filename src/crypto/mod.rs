//! Cryptographic primitives over BLS12-381.
//!
//! Pairing-based threshold cryptography plus the two codecs reliable
//! broadcast depends on:
//!
//! - [`keygen`]: Shamir polynomial key generation for a `(k, n)` scheme.
//! - [`tbls`]: threshold BLS signatures, combined by Lagrange interpolation.
//! - [`tpke`]: threshold public-key encryption and the hybrid AES layer.
//! - [`merkle`]: a binary, domain-separated SHA-256 Merkle tree.
//! - [`erasure`]: a systematic Reed-Solomon code over GF(2^8).
//!
//! Scalars and group elements come from the `bls12_381` crate; hashing to the
//! curve follows RFC 9380 (`SSWU_RO` with `expand_message_xmd` over SHA-256).
//! Signatures are compressed `G1` elements (48 bytes), public keys compressed
//! `G2` elements (96 bytes).

pub mod error;
pub mod erasure;
pub mod keygen;
pub mod merkle;
pub mod serde_impl;
pub mod tbls;
pub mod tpke;

use bls12_381::hash_to_curve::{ExpandMsgXmd, HashToCurve, HashToField};
use bls12_381::{G1Projective, G2Projective, Scalar};
use group::Group;
use rand::{CryptoRng, RngCore};
use sha2::{Digest as _, Sha256};

pub use self::error::{Error, Result};
pub use self::keygen::{DistributedKeySet, PrivateKeyShare, VerificationParameters};

/// Domain separation tag for TBLS signatures (G1, RFC 9380 ciphersuite name).
pub const DST_SIG: &[u8] = b"BLS_SIG_BLS12381G1_XMD:SHA-256_SSWU_RO_NUL_";

/// Domain separation tag for the TPKE hash `H: (U, V) -> G2`.
pub const DST_TPKE_H: &[u8] = b"TPKE_HASH_H_BLS12381G2_XMD:SHA-256_SSWU_RO_NUL_";

/// Domain separation tag under which fresh random scalars are derived.
const DST_RANDOM: &[u8] = b"HBFT_DEFAULT_SALT";

/// Returns the SHA-256 digest of `data`.
pub(crate) fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&Sha256::digest(data));
    hash
}

/// Hashes a message to `G1` under the given domain separation tag.
pub(crate) fn hash_to_g1(msg: &[u8], dst: &[u8]) -> G1Projective {
    <G1Projective as HashToCurve<ExpandMsgXmd<Sha256>>>::hash_to_curve(msg, dst)
}

/// Hashes a message to `G2` under the given domain separation tag.
pub(crate) fn hash_to_g2(msg: &[u8], dst: &[u8]) -> G2Projective {
    <G2Projective as HashToCurve<ExpandMsgXmd<Sha256>>>::hash_to_curve(msg, dst)
}

/// Draws a uniformly random scalar.
///
/// 32 bytes of CSPRNG entropy are expanded to a 48-byte span with
/// `expand_message_xmd` and reduced mod the group order; sampling wider than
/// the order and reducing eliminates modular bias.
pub(crate) fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Scalar> {
    let mut ikm = [0u8; 32];
    rng.try_fill_bytes(&mut ikm)
        .map_err(|_| Error::RandomnessFailure)?;
    let mut out = [Scalar::zero()];
    <Scalar as HashToField>::hash_to_field::<ExpandMsgXmd<Sha256>>(&ikm, DST_RANDOM, &mut out);
    Ok(out[0])
}

/// Given samples `(x_i, f(x_i) * g)` of a polynomial `f` of degree below the
/// sample count, evaluated in the exponent of a group generator `g`, returns
/// `f(0) * g` by Lagrange interpolation at zero.
pub(crate) fn interpolate_at_zero<C>(samples: &[(u64, C)]) -> Result<C>
where
    C: Group<Scalar = Scalar>,
{
    if samples.is_empty() {
        return Err(Error::NotEnoughShares);
    }
    let mut xs = Vec::with_capacity(samples.len());
    for &(id, _) in samples {
        if id == 0 {
            return Err(Error::InvalidShareId);
        }
        let x = Scalar::from(id);
        if xs.contains(&x) {
            return Err(Error::DuplicatePlayerId);
        }
        xs.push(x);
    }

    let mut result = C::identity();
    for (i, &(_, sample)) in samples.iter().enumerate() {
        // The value at 0 of the Lagrange basis polynomial that is 1 at `x_i`
        // and 0 at every other sample point.
        let mut num = Scalar::one();
        let mut denom = Scalar::one();
        for (j, x_j) in xs.iter().enumerate() {
            if i == j {
                continue;
            }
            num *= -*x_j;
            denom *= xs[i] - x_j;
        }
        let lambda =
            num * Option::<Scalar>::from(denom.invert()).expect("interpolation points are distinct");
        result += sample * lambda;
    }
    Ok(result)
}
