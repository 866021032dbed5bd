//! Threshold BLS signatures.
//!
//! Signatures live in `G1` (48 bytes compressed) and public keys in `G2`
//! (96 bytes compressed), hashing to the curve with the standard
//! `BLS_SIG_BLS12381G1_XMD:SHA-256_SSWU_RO_NUL_` ciphersuite tag. Any `k`
//! shares of a `(k, n)` key combine - by Lagrange interpolation at zero,
//! carried out in `G1` - into the unique master signature, which verifies
//! under the master public key. Uniqueness is what makes the scheme usable
//! as a common-coin source: no subset of fewer than `k` players can bias or
//! predict the combined value.

use std::fmt;

use bls12_381::{pairing, G1Affine, G1Projective, G2Affine, G2Projective};
use hex_fmt::HexFmt;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use super::keygen::{self, DistributedKeySet, PrivateKeyShare, VerificationParameters};
use super::{hash_to_g1, interpolate_at_zero, serde_impl, sha256, Error, Result, DST_SIG};

/// Verification parameters of a TBLS key: master key and share keys in `G2`.
pub type TblsParams = VerificationParameters<G2Projective, G2Projective>;

/// A full TBLS key set as produced by key generation.
pub type TblsKeySet = DistributedKeySet<G2Projective, G2Projective>;

/// A master signature: a `G1` element, 48 bytes compressed.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(#[serde(with = "serde_impl::group_elem")] pub(crate) G1Projective);

impl Signature {
    /// Returns the canonical compressed encoding.
    pub fn to_compressed(&self) -> [u8; 48] {
        G1Affine::from(&self.0).to_compressed()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({:0.10})", HexFmt(self.to_compressed()))
    }
}

/// A signature share: one player's contribution to a master signature.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureShare(pub Signature);

impl fmt::Debug for SignatureShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureShare({:0.10})", HexFmt(self.0.to_compressed()))
    }
}

/// A signature share tagged with the 1-based id of the player that made it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialSignature {
    /// The signing player's id in `1..=n`; the x-coordinate of the share.
    pub player_id: u64,
    /// The share itself.
    pub value: SignatureShare,
}

/// Generates a TBLS key set: any `threshold` of the `players` shares can
/// produce a signature under the master public key.
pub fn generate_keys<R: RngCore + CryptoRng>(
    players: usize,
    threshold: usize,
    rng: &mut R,
) -> Result<TblsKeySet> {
    keygen::generate_keys(players, threshold, rng)
}

/// Signs `msg` with a private key share.
pub fn sign_share(share: &PrivateKeyShare, msg: &[u8]) -> PartialSignature {
    let h = hash_to_g1(msg, DST_SIG);
    PartialSignature {
        player_id: share.player_id,
        value: SignatureShare(Signature(h * share.secret)),
    }
}

/// Verifies that `share` is player `player_id`'s signature share over `msg`.
pub fn verify_share(
    params: &TblsParams,
    share: &SignatureShare,
    msg: &[u8],
    player_id: u64,
) -> Result<()> {
    if player_id < 1 || player_id > params.verification_vector.len() as u64 {
        return Err(Error::InvalidShareId);
    }
    let vk = &params.verification_vector[player_id as usize - 1];
    if core_verify(vk, msg, &share.0 .0) {
        Ok(())
    } else {
        Err(Error::ShareVerificationFailed)
    }
}

/// Combines exactly `threshold` partial signatures into the master signature
/// by Lagrange interpolation at zero.
pub fn combine_partial_signatures(
    params: &TblsParams,
    partials: &[PartialSignature],
) -> Result<Signature> {
    if partials.len() != params.threshold {
        return Err(Error::NotEnoughShares);
    }
    let samples: Vec<(u64, G1Projective)> = partials
        .iter()
        .map(|p| (p.player_id, p.value.0 .0))
        .collect();
    Ok(Signature(interpolate_at_zero(&samples)?))
}

/// Convenience entry point taking player ids and shares as parallel slices.
pub fn combine_signatures(
    params: &TblsParams,
    ids: &[u64],
    shares: &[SignatureShare],
) -> Result<Signature> {
    if ids.len() != shares.len() {
        return Err(Error::MismatchedIdsAndSigs);
    }
    let partials: Vec<PartialSignature> = ids
        .iter()
        .zip(shares)
        .map(|(&player_id, &value)| PartialSignature { player_id, value })
        .collect();
    combine_partial_signatures(params, &partials)
}

/// Verifies a combined signature against the master public key.
pub fn verify_signature(params: &TblsParams, msg: &[u8], sig: &Signature) -> Result<()> {
    if core_verify(&params.master_public_key, msg, &sig.0) {
        Ok(())
    } else {
        Err(Error::SignatureVerificationFailed)
    }
}

/// Extracts the coin bit from a combined signature: the low bit of byte 0 of
/// the SHA-256 digest of the canonical 48-byte compression. Hashing first
/// avoids any correlation with the signature's serialized form.
pub fn hash_to_bit(sig: &Signature) -> bool {
    sha256(&sig.to_compressed())[0] & 1 == 1
}

/// The BLS verification equation `e(sig, g2) == e(H(msg), pk)`.
fn core_verify(pk: &G2Projective, msg: &[u8], sig: &G1Projective) -> bool {
    let h = hash_to_g1(msg, DST_SIG);
    pairing(&G1Affine::from(sig), &G2Affine::generator())
        == pairing(&G1Affine::from(h), &G2Affine::from(pk))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_roundtrip() {
        let mut rng = rand::thread_rng();
        let keys = generate_keys(4, 2, &mut rng).expect("keygen");
        let msg = b"Real news";

        for share in &keys.private_shares {
            let partial = sign_share(share, msg);
            assert_eq!(partial.player_id, share.player_id);
            verify_share(
                &keys.public_params,
                &partial.value,
                msg,
                partial.player_id,
            )
            .expect("share verifies");
            // The same share does not verify for a different message or id.
            assert_eq!(
                verify_share(&keys.public_params, &partial.value, b"Fake news", partial.player_id),
                Err(Error::ShareVerificationFailed)
            );
            let other_id = partial.player_id % 4 + 1;
            assert_eq!(
                verify_share(&keys.public_params, &partial.value, msg, other_id),
                Err(Error::ShareVerificationFailed)
            );
        }
    }

    #[test]
    fn test_share_id_bounds() {
        let mut rng = rand::thread_rng();
        let keys = generate_keys(4, 2, &mut rng).expect("keygen");
        let msg = b"bounds";
        let partial = sign_share(&keys.private_shares[0], msg);
        assert_eq!(
            verify_share(&keys.public_params, &partial.value, msg, 0),
            Err(Error::InvalidShareId)
        );
        assert_eq!(
            verify_share(&keys.public_params, &partial.value, msg, 5),
            Err(Error::InvalidShareId)
        );
    }

    #[test]
    fn test_combine_and_verify() {
        let mut rng = rand::thread_rng();
        let keys = generate_keys(7, 3, &mut rng).expect("keygen");
        let msg = b"Totally real news";

        let partials: Vec<PartialSignature> = keys.private_shares[..3]
            .iter()
            .map(|s| sign_share(s, msg))
            .collect();
        let sig = combine_partial_signatures(&keys.public_params, &partials).expect("combine");
        verify_signature(&keys.public_params, msg, &sig).expect("master sig verifies");
        assert_eq!(
            verify_signature(&keys.public_params, b"other", &sig),
            Err(Error::SignatureVerificationFailed)
        );
    }

    #[test]
    fn test_subset_independence() {
        let mut rng = rand::thread_rng();
        let keys = generate_keys(7, 3, &mut rng).expect("keygen");
        let msg = b"any subset will do";

        let sign = |ids: &[usize]| {
            let partials: Vec<PartialSignature> = ids
                .iter()
                .map(|&i| sign_share(&keys.private_shares[i], msg))
                .collect();
            combine_partial_signatures(&keys.public_params, &partials).expect("combine")
        };
        assert_eq!(sign(&[0, 1, 2]), sign(&[4, 5, 6]));
        assert_eq!(sign(&[0, 3, 6]), sign(&[2, 1, 5]));
    }

    #[test]
    fn test_combine_argument_checks() {
        let mut rng = rand::thread_rng();
        let keys = generate_keys(4, 3, &mut rng).expect("keygen");
        let msg = b"checks";
        let partials: Vec<PartialSignature> = keys.private_shares[..3]
            .iter()
            .map(|s| sign_share(s, msg))
            .collect();

        assert_eq!(
            combine_partial_signatures(&keys.public_params, &partials[..2]),
            Err(Error::NotEnoughShares)
        );
        let duplicated = vec![partials[0], partials[1], partials[0]];
        assert_eq!(
            combine_partial_signatures(&keys.public_params, &duplicated),
            Err(Error::DuplicatePlayerId)
        );
        let shares: Vec<SignatureShare> = partials.iter().map(|p| p.value).collect();
        assert_eq!(
            combine_signatures(&keys.public_params, &[1, 2], &shares),
            Err(Error::MismatchedIdsAndSigs)
        );
        let ids: Vec<u64> = partials.iter().map(|p| p.player_id).collect();
        let sig = combine_signatures(&keys.public_params, &ids, &shares).expect("combine");
        verify_signature(&keys.public_params, msg, &sig).expect("verifies");
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut rng = rand::thread_rng();
        let keys = generate_keys(4, 2, &mut rng).expect("keygen");
        let partial = sign_share(&keys.private_shares[2], b"wire format");

        let ser = bincode::serialize(&partial).expect("serialize");
        let de: PartialSignature = bincode::deserialize(&ser).expect("deserialize");
        assert_eq!(partial, de);

        let ser = bincode::serialize(&keys.public_params).expect("serialize");
        let de: TblsParams = bincode::deserialize(&ser).expect("deserialize");
        assert_eq!(keys.public_params, de);
    }
}
