//! Threshold public-key encryption with a hybrid AES layer.
//!
//! The asymmetric part encrypts a 32-byte symmetric key to the master public
//! key (a `G1` element here; share verification keys stay in `G2`):
//! `U = g1 * r`, `V = key XOR SHA-256(compress(pk * r))`, `W = H(U, V) * r`.
//! Any `k` decryption shares `U * sk_i` recover `pk * r` by Lagrange
//! interpolation and with it the key. The pairing check
//! `e(g1, W) == e(U, H(U, V))` rejects mauled ciphertexts before any share
//! is produced.
//!
//! The hybrid layer wraps a fresh session key per message and carries the
//! payload under AES-256-CBC with PKCS#7 padding, the 16-byte IV prepended
//! to the ciphertext.

use std::fmt;

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use bls12_381::{pairing, G1Affine, G1Projective, G2Affine, G2Projective};
use hex_fmt::HexFmt;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use super::keygen::{self, DistributedKeySet, PrivateKeyShare, VerificationParameters};
use super::{
    hash_to_g2, interpolate_at_zero, random_scalar, serde_impl, sha256, Error, Result, DST_TPKE_H,
};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const IV_SIZE: usize = 16;

/// Verification parameters of a TPKE key: the master key lives in `G1`,
/// share verification keys in `G2`.
pub type TpkeParams = VerificationParameters<G1Projective, G2Projective>;

/// A full TPKE key set as produced by key generation.
pub type TpkeKeySet = DistributedKeySet<G1Projective, G2Projective>;

/// An encrypted 32-byte symmetric key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext {
    /// `g1 * r`.
    #[serde(with = "serde_impl::group_elem")]
    pub u: G1Projective,
    /// The masked key, `key XOR SHA-256(compress(pk * r))`.
    pub v: [u8; 32],
    /// `H(U, V) * r`; binds `U` and `V` together.
    #[serde(with = "serde_impl::group_elem")]
    pub w: G2Projective,
}

impl fmt::Debug for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ciphertext({:0.10})", HexFmt(&self.v))
    }
}

/// One player's decryption share, `U * sk_i`.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionShare(#[serde(with = "serde_impl::group_elem")] pub(crate) G1Projective);

impl fmt::Debug for DecryptionShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DecryptionShare({:0.10})",
            HexFmt(G1Affine::from(&self.0).to_compressed())
        )
    }
}

/// A decryption share tagged with the 1-based id of the player that made it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialDecryption {
    /// The decrypting player's id in `1..=n`.
    pub player_id: u64,
    /// The share itself.
    pub value: DecryptionShare,
}

/// A hybrid ciphertext: the wrapped session key plus the AES payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HybridCiphertext {
    /// The TPKE-encrypted session key.
    pub key_ciphertext: Ciphertext,
    /// `IV || AES-256-CBC(session_key, payload)`.
    pub data_ciphertext: Vec<u8>,
}

/// Generates a TPKE key set: any `threshold` of the `players` shares can
/// decrypt what was encrypted to the master public key.
pub fn generate_keys<R: RngCore + CryptoRng>(
    players: usize,
    threshold: usize,
    rng: &mut R,
) -> Result<TpkeKeySet> {
    keygen::generate_keys(players, threshold, rng)
}

/// Encrypts a 32-byte symmetric key to the master public key.
pub fn encrypt_key<R: RngCore + CryptoRng>(
    params: &TpkeParams,
    key: &[u8; 32],
    rng: &mut R,
) -> Result<Ciphertext> {
    let r = random_scalar(rng)?;
    let u = G1Projective::generator() * r;
    let mask = hash_g(&(params.master_public_key * r));
    let v = xor_32(key, &mask);
    let w = hash_h(&u, &v) * r;
    Ok(Ciphertext { u, v, w })
}

/// Returns `true` if the ciphertext is internally consistent:
/// `e(g1, W) == e(U, H(U, V))`. Rejecting inconsistent ciphertexts before
/// producing shares is the scheme's chosen-ciphertext defence.
pub fn verify_ciphertext(ct: &Ciphertext) -> bool {
    let h = hash_h(&ct.u, &ct.v);
    pairing(&G1Affine::generator(), &G2Affine::from(&ct.w))
        == pairing(&G1Affine::from(&ct.u), &G2Affine::from(&h))
}

/// Produces this player's decryption share `U * sk_i`, refusing invalid
/// ciphertexts.
pub fn decrypt_share(share: &PrivateKeyShare, ct: &Ciphertext) -> Result<PartialDecryption> {
    if !verify_ciphertext(ct) {
        return Err(Error::InvalidCiphertext);
    }
    Ok(PartialDecryption {
        player_id: share.player_id,
        value: DecryptionShare(ct.u * share.secret),
    })
}

/// Verifies a decryption share against the ciphertext:
/// `e(share, g2) == e(U, vk_i)`.
pub fn verify_share(
    params: &TpkeParams,
    decryption: &PartialDecryption,
    ct: &Ciphertext,
) -> Result<()> {
    if decryption.player_id < 1
        || decryption.player_id > params.verification_vector.len() as u64
    {
        return Err(Error::InvalidShareId);
    }
    let vk = &params.verification_vector[decryption.player_id as usize - 1];
    let lhs = pairing(
        &G1Affine::from(&decryption.value.0),
        &G2Affine::generator(),
    );
    let rhs = pairing(&G1Affine::from(&ct.u), &G2Affine::from(vk));
    if lhs == rhs {
        Ok(())
    } else {
        Err(Error::ShareVerificationFailed)
    }
}

/// Combines at least `threshold` decryption shares and recovers the 32-byte
/// symmetric key.
pub fn combine_shares(
    params: &TpkeParams,
    ct: &Ciphertext,
    shares: &[PartialDecryption],
) -> Result<[u8; 32]> {
    if shares.len() < params.threshold {
        return Err(Error::NotEnoughShares);
    }
    let samples: Vec<(u64, G1Projective)> =
        shares.iter().map(|s| (s.player_id, s.value.0)).collect();
    // This recovers pk * r, the point the key was masked with.
    let recovered = interpolate_at_zero(&samples)?;
    Ok(xor_32(&ct.v, &hash_g(&recovered)))
}

/// Encrypts an arbitrary payload: a fresh session key is TPKE-wrapped and
/// the payload carried under AES-256-CBC.
pub fn encrypt<R: RngCore + CryptoRng>(
    params: &TpkeParams,
    plaintext: &[u8],
    rng: &mut R,
) -> Result<HybridCiphertext> {
    let mut session_key = [0u8; 32];
    rng.try_fill_bytes(&mut session_key)
        .map_err(|_| Error::RandomnessFailure)?;
    let key_ciphertext = encrypt_key(params, &session_key, rng)?;
    let data_ciphertext = aes_encrypt(&session_key, plaintext, rng)?;
    Ok(HybridCiphertext {
        key_ciphertext,
        data_ciphertext,
    })
}

/// Decrypts a hybrid ciphertext with at least `threshold` decryption shares.
pub fn decrypt(
    params: &TpkeParams,
    ct: &HybridCiphertext,
    shares: &[PartialDecryption],
) -> Result<Vec<u8>> {
    if !verify_ciphertext(&ct.key_ciphertext) {
        return Err(Error::InvalidCiphertext);
    }
    let session_key = combine_shares(params, &ct.key_ciphertext, shares)?;
    aes_decrypt(&session_key, &ct.data_ciphertext)
}

/// AES-256-CBC with PKCS#7 padding; returns `IV || ciphertext`.
pub fn aes_encrypt<R: RngCore + CryptoRng>(
    key: &[u8; 32],
    plaintext: &[u8],
    rng: &mut R,
) -> Result<Vec<u8>> {
    let mut iv = [0u8; IV_SIZE];
    rng.try_fill_bytes(&mut iv)
        .map_err(|_| Error::RandomnessFailure)?;
    let mut out = iv.to_vec();
    out.extend(Aes256CbcEnc::new(key.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext));
    Ok(out)
}

/// Inverse of [`aes_encrypt`]; expects `IV || ciphertext`.
pub fn aes_decrypt(key: &[u8; 32], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < IV_SIZE {
        return Err(Error::DecryptionFailed);
    }
    let (iv, ciphertext) = data.split_at(IV_SIZE);
    let iv: [u8; IV_SIZE] = iv.try_into().expect("split at IV_SIZE");
    Aes256CbcDec::new(key.into(), &iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| Error::DecryptionFailed)
}

/// The key mask: SHA-256 of the compressed `G1` point.
fn hash_g(point: &G1Projective) -> [u8; 32] {
    sha256(&G1Affine::from(point).to_compressed())
}

/// The binding hash `H: (U, V) -> G2` over `compress(U) || V`.
fn hash_h(u: &G1Projective, v: &[u8]) -> G2Projective {
    let mut msg = Vec::with_capacity(48 + v.len());
    msg.extend_from_slice(&G1Affine::from(u).to_compressed());
    msg.extend_from_slice(v);
    hash_to_g2(&msg, DST_TPKE_H)
}

fn xor_32(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (o, (x, y)) in out.iter_mut().zip(a.iter().zip(b)) {
        *o = x ^ y;
    }
    out
}
