//! Systematic Reed-Solomon erasure coding over GF(2^8).
//!
//! A payload is split into `K` data stripes and extended with `N - K` parity
//! stripes computed from the lower rows of an `N x K` Cauchy generator
//! matrix. The matrix is systematic: the first `K` rows are the identity, so
//! the data stripes are plain chunks of the (length-prefixed, zero-padded)
//! input. Any `K` stripes reconstruct the payload; any square submatrix of a
//! Cauchy matrix is invertible, which is what makes that guarantee
//! unconditional.
//!
//! Wire layout: the encoder prepends a 4-byte little-endian length, pads with
//! zeros to a multiple of `K`, and every stripe has size
//! `B = (4 + |data|).div_ceil(K)`.

use std::collections::BTreeMap;

use byteorder::{ByteOrder, LittleEndian};

use super::{Error, Result};

const LEN_PREFIX_SIZE: usize = 4;

/// GF(2^8) arithmetic with the 0x11D reduction polynomial.
mod gf {
    const POLY: u16 = 0x11D;

    const TABLES: ([u8; 512], [u8; 256]) = build_tables();

    const fn build_tables() -> ([u8; 512], [u8; 256]) {
        let mut exp = [0u8; 512];
        let mut log = [0u8; 256];
        let mut x: u16 = 1;
        let mut i = 0;
        while i < 255 {
            exp[i] = x as u8;
            log[x as usize] = i as u8;
            x <<= 1;
            if x & 0x100 != 0 {
                x ^= POLY;
            }
            i += 1;
        }
        // Mirror the cycle so products of logs never need a mod 255.
        while i < 512 {
            exp[i] = exp[i - 255];
            i += 1;
        }
        (exp, log)
    }

    pub fn mul(a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            return 0;
        }
        let (exp, log) = (&TABLES.0, &TABLES.1);
        exp[log[a as usize] as usize + log[b as usize] as usize]
    }

    /// Multiplicative inverse; `a` must be nonzero.
    pub fn inv(a: u8) -> u8 {
        let (exp, log) = (&TABLES.0, &TABLES.1);
        exp[255 - log[a as usize] as usize]
    }
}

/// An erasure coding configuration for `K` data stripes out of `N` total.
#[derive(Debug, Clone)]
pub struct Coding {
    data_shards: usize,
    total_shards: usize,
    /// The `N x K` Cauchy generator matrix, row major.
    matrix: Vec<u8>,
}

impl Coding {
    /// Creates a coding configuration with `data_shards` out of
    /// `total_shards`. GF(2^8) limits the total to 255.
    pub fn new(data_shards: usize, total_shards: usize) -> Result<Self> {
        if total_shards == 0 || total_shards > 255 {
            return Err(Error::InvalidPlayerCount);
        }
        if data_shards == 0 || data_shards > total_shards {
            return Err(Error::InvalidThreshold);
        }
        Ok(Coding {
            data_shards,
            total_shards,
            matrix: cauchy_matrix(data_shards, total_shards),
        })
    }

    /// Returns the number of data stripes `K`.
    pub fn data_shards(&self) -> usize {
        self.data_shards
    }

    /// Returns the total number of stripes `N`.
    pub fn total_shards(&self) -> usize {
        self.total_shards
    }

    /// Encodes `data` into `N` equal-length stripes, the first `K` of which
    /// are the raw (length-prefixed, padded) chunks.
    pub fn encode(&self, data: &[u8]) -> Result<Vec<Vec<u8>>> {
        if data.len() > u32::MAX as usize {
            return Err(Error::PayloadTooLarge);
        }
        let k = self.data_shards;
        let n = self.total_shards;

        let mut buffer = vec![0u8; LEN_PREFIX_SIZE + data.len()];
        LittleEndian::write_u32(&mut buffer[..LEN_PREFIX_SIZE], data.len() as u32);
        buffer[LEN_PREFIX_SIZE..].copy_from_slice(data);
        let stripe_len = (buffer.len() + k - 1) / k;
        buffer.resize(stripe_len * k, 0);

        let mut stripes: Vec<Vec<u8>> = buffer.chunks(stripe_len).map(<[u8]>::to_vec).collect();
        for row in k..n {
            let coeffs = &self.matrix[row * k..(row + 1) * k];
            let mut parity = vec![0u8; stripe_len];
            for (c, coeff) in coeffs.iter().enumerate() {
                for (p, b) in parity.iter_mut().zip(&stripes[c]) {
                    *p ^= gf::mul(*coeff, *b);
                }
            }
            stripes.push(parity);
        }
        Ok(stripes)
    }

    /// Reconstructs the original payload from at least `K` stripes, given as
    /// a mapping from stripe index to stripe bytes.
    pub fn decode(&self, shards: &BTreeMap<usize, Vec<u8>>) -> Result<Vec<u8>> {
        let k = self.data_shards;
        if shards.len() < k {
            return Err(Error::InsufficientShards);
        }
        let stripe_len = shards.values().next().map_or(0, Vec::len);
        if shards.values().any(|s| s.len() != stripe_len) {
            return Err(Error::InconsistentShardSize);
        }
        if shards.keys().any(|&i| i >= self.total_shards) {
            return Err(Error::InvalidShareId);
        }
        if stripe_len == 0 {
            return Err(Error::CorruptLengthPrefix);
        }

        let received: Vec<(usize, &[u8])> = shards
            .iter()
            .take(k)
            .map(|(&i, s)| (i, s.as_slice()))
            .collect();

        let buffer = if received.iter().enumerate().all(|(pos, &(i, _))| pos == i) {
            // Fast path: the systematic rows arrived in order.
            let mut buffer = Vec::with_capacity(k * stripe_len);
            for &(_, stripe) in &received {
                buffer.extend_from_slice(stripe);
            }
            buffer
        } else {
            self.reconstruct(&received, stripe_len)?
        };

        if buffer.len() < LEN_PREFIX_SIZE {
            return Err(Error::CorruptLengthPrefix);
        }
        let payload_len = LittleEndian::read_u32(&buffer[..LEN_PREFIX_SIZE]) as usize;
        if payload_len > buffer.len() - LEN_PREFIX_SIZE {
            return Err(Error::CorruptLengthPrefix);
        }
        Ok(buffer[LEN_PREFIX_SIZE..LEN_PREFIX_SIZE + payload_len].to_vec())
    }

    /// Inverts the received rows of the generator matrix and multiplies the
    /// received stripes through, recovering the `K` systematic rows.
    fn reconstruct(&self, received: &[(usize, &[u8])], stripe_len: usize) -> Result<Vec<u8>> {
        let k = self.data_shards;
        let mut submatrix = vec![0u8; k * k];
        for (row, &(idx, _)) in received.iter().enumerate() {
            submatrix[row * k..(row + 1) * k]
                .copy_from_slice(&self.matrix[idx * k..(idx + 1) * k]);
        }
        let inverse = invert_matrix(submatrix, k)?;

        let mut buffer = vec![0u8; k * stripe_len];
        for row in 0..k {
            let coeffs = &inverse[row * k..(row + 1) * k];
            let out = &mut buffer[row * stripe_len..(row + 1) * stripe_len];
            for (c, coeff) in coeffs.iter().enumerate() {
                for (o, b) in out.iter_mut().zip(received[c].1) {
                    *o ^= gf::mul(*coeff, *b);
                }
            }
        }
        Ok(buffer)
    }
}

/// The `N x K` generator matrix: identity on top, `inv(i ^ j)` below. The
/// XOR of a row index `i >= K` and a column index `j < K` is never zero, and
/// the resulting matrix keeps every `K`-row subset invertible.
fn cauchy_matrix(k: usize, n: usize) -> Vec<u8> {
    let mut matrix = vec![0u8; n * k];
    for i in 0..k {
        matrix[i * k + i] = 1;
    }
    for i in k..n {
        for j in 0..k {
            matrix[i * k + j] = gf::inv((i ^ j) as u8);
        }
    }
    matrix
}

/// Gauss-Jordan inversion in GF(2^8).
fn invert_matrix(mut m: Vec<u8>, k: usize) -> Result<Vec<u8>> {
    let mut inv = vec![0u8; k * k];
    for i in 0..k {
        inv[i * k + i] = 1;
    }
    for col in 0..k {
        let pivot = (col..k)
            .find(|&r| m[r * k + col] != 0)
            .ok_or(Error::UninvertibleMatrix)?;
        if pivot != col {
            for j in 0..k {
                m.swap(pivot * k + j, col * k + j);
                inv.swap(pivot * k + j, col * k + j);
            }
        }
        let scale = gf::inv(m[col * k + col]);
        for j in 0..k {
            m[col * k + j] = gf::mul(m[col * k + j], scale);
            inv[col * k + j] = gf::mul(inv[col * k + j], scale);
        }
        for row in 0..k {
            if row == col {
                continue;
            }
            let factor = m[row * k + col];
            if factor == 0 {
                continue;
            }
            for j in 0..k {
                let t = gf::mul(factor, m[col * k + j]);
                m[row * k + j] ^= t;
                let t = gf::mul(factor, inv[col * k + j]);
                inv[row * k + j] ^= t;
            }
        }
    }
    Ok(inv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn subset_map(stripes: &[Vec<u8>], indices: &[usize]) -> BTreeMap<usize, Vec<u8>> {
        indices.iter().map(|&i| (i, stripes[i].clone())).collect()
    }

    #[test]
    fn test_gf_inverses() {
        for a in 1..=255u8 {
            assert_eq!(gf::mul(a, gf::inv(a)), 1, "a = {}", a);
        }
    }

    #[test]
    fn test_roundtrip_all_subsets() {
        let data = b"the quick brown fox jumps over the lazy dog";
        for &(k, n) in &[(2usize, 4usize), (3, 5), (1, 3), (4, 7)] {
            let coding = Coding::new(k, n).expect("valid params");
            let stripes = coding.encode(data).expect("encode");
            assert_eq!(stripes.len(), n);
            for mask in 0u32..(1 << n) {
                if mask.count_ones() as usize != k {
                    continue;
                }
                let indices: Vec<usize> = (0..n).filter(|i| mask & (1 << i) != 0).collect();
                let decoded = coding.decode(&subset_map(&stripes, &indices)).expect("decode");
                assert_eq!(decoded, data, "k={} n={} subset={:?}", k, n, indices);
            }
        }
    }

    #[test]
    fn test_empty_input() {
        let coding = Coding::new(2, 4).expect("valid params");
        let stripes = coding.encode(&[]).expect("encode");
        // Length prefix 0, padded to a multiple of K.
        assert_eq!(stripes[0], vec![0, 0]);
        assert_eq!(stripes[1], vec![0, 0]);
        let decoded = coding.decode(&subset_map(&stripes, &[2, 3])).expect("decode");
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_stripe_sizes_are_equal() {
        let coding = Coding::new(3, 5).expect("valid params");
        let stripes = coding.encode(&[17; 100]).expect("encode");
        let expected = (4 + 100 + 2) / 3;
        assert!(stripes.iter().all(|s| s.len() == expected));
    }

    #[test]
    fn test_insufficient_shards() {
        let coding = Coding::new(3, 5).expect("valid params");
        let stripes = coding.encode(b"hello").expect("encode");
        let result = coding.decode(&subset_map(&stripes, &[0, 4]));
        assert_eq!(result, Err(Error::InsufficientShards));
    }

    #[test]
    fn test_inconsistent_sizes() {
        let coding = Coding::new(2, 4).expect("valid params");
        let stripes = coding.encode(b"hello").expect("encode");
        let mut shards = subset_map(&stripes, &[0, 1]);
        shards.get_mut(&1).expect("present").push(0);
        assert_eq!(coding.decode(&shards), Err(Error::InconsistentShardSize));
    }

    #[test]
    fn test_corrupt_length_prefix() {
        let coding = Coding::new(2, 4).expect("valid params");
        let stripes = coding.encode(b"ab").expect("encode");
        let mut shards = subset_map(&stripes, &[0, 1]);
        // Claim a payload longer than the reconstructed buffer.
        shards.get_mut(&0).expect("present")[0] = 0xFF;
        assert_eq!(coding.decode(&shards), Err(Error::CorruptLengthPrefix));
    }

    #[test]
    fn test_out_of_range_index() {
        let coding = Coding::new(2, 4).expect("valid params");
        let stripes = coding.encode(b"hello").expect("encode");
        let mut shards = subset_map(&stripes, &[0]);
        shards.insert(9, stripes[1].clone());
        assert_eq!(coding.decode(&shards), Err(Error::InvalidShareId));
    }

    #[test]
    fn test_invalid_params() {
        assert_eq!(Coding::new(0, 4).err(), Some(Error::InvalidThreshold));
        assert_eq!(Coding::new(5, 4).err(), Some(Error::InvalidThreshold));
        assert_eq!(Coding::new(1, 0).err(), Some(Error::InvalidPlayerCount));
        assert_eq!(Coding::new(1, 256).err(), Some(Error::InvalidPlayerCount));
    }

    proptest! {
        #[test]
        fn prop_roundtrip(
            data in proptest::collection::vec(any::<u8>(), 0..2048),
            (k, n, seed) in (1usize..6).prop_flat_map(|k| {
                ((k + 1)..10).prop_flat_map(move |n| (Just(k), Just(n), any::<u64>()))
            }),
        ) {
            let coding = Coding::new(k, n).expect("valid params");
            let stripes = coding.encode(&data).expect("encode");
            // Pick a pseudo-random K-subset from the seed.
            let mut indices: Vec<usize> = (0..n).collect();
            let mut state = seed;
            for i in (1..indices.len()).rev() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                indices.swap(i, (state % (i as u64 + 1)) as usize);
            }
            indices.truncate(k);
            indices.sort_unstable();
            let decoded = coding.decode(&subset_map(&stripes, &indices)).expect("decode");
            prop_assert_eq!(decoded, data);
        }
    }
}
