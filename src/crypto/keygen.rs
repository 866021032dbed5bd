//! Shamir polynomial key generation.
//!
//! A `(k, n)` scheme samples a random polynomial of degree `k - 1` over the
//! scalar field; the master secret is the constant term and player `p`'s
//! share is the evaluation at `x = p` for `p` in `1..=n`. The same routine
//! serves both TBLS and TPKE - the two schemes only differ in which groups
//! the master and share public keys live in, so both are type parameters.
//!
//! This is trusted-dealer key generation: whoever runs it sees the master
//! secret. The polynomial coefficients are dropped before returning.

use bls12_381::Scalar;
use group::{Group, GroupEncoding};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use super::serde_impl;
use super::{random_scalar, Error, Result};

/// The public material of a distributed key: replicated to every party.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "M: GroupEncoding + Clone, S: GroupEncoding + Clone")]
pub struct VerificationParameters<M, S> {
    /// The number of players `n`.
    pub total_players: usize,
    /// The number of shares `k` needed to act for the master key.
    pub threshold: usize,
    /// The master public key, `G_M * a_0`.
    #[serde(with = "serde_impl::group_elem")]
    pub master_public_key: M,
    /// Per-player share verification keys; entry `p - 1` is `G_S * f(p)`.
    #[serde(with = "serde_impl::group_vec")]
    pub verification_vector: Vec<S>,
}

/// One player's secret share. Owned by exactly one party; never replicated.
#[derive(Clone)]
pub struct PrivateKeyShare {
    /// The player id this share was dealt to, in `1..=n`.
    pub player_id: u64,
    /// The share scalar, `f(player_id)`.
    pub(crate) secret: Scalar,
}

impl ::std::fmt::Debug for PrivateKeyShare {
    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        // Never print the secret scalar.
        f.debug_struct("PrivateKeyShare")
            .field("player_id", &self.player_id)
            .finish_non_exhaustive()
    }
}

/// The full output of key generation.
#[derive(Clone, Debug)]
pub struct DistributedKeySet<M, S> {
    /// The public parameters, safe to publish.
    pub public_params: VerificationParameters<M, S>,
    /// The private shares, to be handed to the players and then forgotten.
    pub private_shares: Vec<PrivateKeyShare>,
}

/// Generates a `(threshold, players)` key set.
///
/// `M` is the group the master public key lives in and `S` the group of the
/// share verification keys.
pub fn generate_keys<M, S, R>(
    players: usize,
    threshold: usize,
    rng: &mut R,
) -> Result<DistributedKeySet<M, S>>
where
    M: Group<Scalar = Scalar>,
    S: Group<Scalar = Scalar>,
    R: RngCore + CryptoRng,
{
    if players < 1 {
        return Err(Error::InvalidPlayerCount);
    }
    if threshold < 1 || threshold > players {
        return Err(Error::InvalidThreshold);
    }

    // A (k, n) scheme needs a polynomial of degree k - 1: k coefficients.
    let coefficients: Vec<Scalar> = (0..threshold)
        .map(|_| random_scalar(rng))
        .collect::<Result<_>>()?;

    let master_public_key = M::generator() * coefficients[0];

    let mut private_shares = Vec::with_capacity(players);
    let mut verification_vector = Vec::with_capacity(players);
    for player_id in 1..=players as u64 {
        let secret = poly_eval(&coefficients, Scalar::from(player_id));
        verification_vector.push(S::generator() * secret);
        private_shares.push(PrivateKeyShare { player_id, secret });
    }

    // `coefficients` - the master secret included - dies here.
    Ok(DistributedKeySet {
        public_params: VerificationParameters {
            total_players: players,
            threshold,
            master_public_key,
            verification_vector,
        },
        private_shares,
    })
}

/// Horner evaluation of the polynomial with the given coefficients,
/// `coefficients[i]` being the coefficient of `x^i`.
fn poly_eval(coefficients: &[Scalar], x: Scalar) -> Scalar {
    coefficients
        .iter()
        .rev()
        .fold(Scalar::zero(), |acc, c| acc * x + c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bls12_381::{G1Projective, G2Projective};

    #[test]
    fn test_parameter_validation() {
        let mut rng = rand::thread_rng();
        let err = generate_keys::<G2Projective, G2Projective, _>(0, 1, &mut rng).err();
        assert_eq!(err, Some(Error::InvalidPlayerCount));
        let err = generate_keys::<G2Projective, G2Projective, _>(4, 0, &mut rng).err();
        assert_eq!(err, Some(Error::InvalidThreshold));
        let err = generate_keys::<G2Projective, G2Projective, _>(4, 5, &mut rng).err();
        assert_eq!(err, Some(Error::InvalidThreshold));
    }

    #[test]
    fn test_shares_match_verification_vector() {
        let mut rng = rand::thread_rng();
        let keys =
            generate_keys::<G1Projective, G2Projective, _>(5, 3, &mut rng).expect("keygen");
        assert_eq!(keys.public_params.total_players, 5);
        assert_eq!(keys.public_params.verification_vector.len(), 5);
        for (i, share) in keys.private_shares.iter().enumerate() {
            assert_eq!(share.player_id, i as u64 + 1);
            assert_eq!(
                G2Projective::generator() * share.secret,
                keys.public_params.verification_vector[i]
            );
        }
    }

    #[test]
    fn test_poly_eval_horner() {
        // f(x) = 3 + 2x + x^2, f(4) = 3 + 8 + 16 = 27.
        let coeffs = vec![Scalar::from(3), Scalar::from(2), Scalar::from(1)];
        assert_eq!(poly_eval(&coeffs, Scalar::from(4)), Scalar::from(27));
        assert_eq!(poly_eval(&[], Scalar::from(4)), Scalar::zero());
    }
}
