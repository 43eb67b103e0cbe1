// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Pairwise-independent hash family mapping item keys to bucket indices.
//!
//! Each row `i` owns a pair of coefficients `(a_i, b_i)` and maps a key `x`
//! to `((a_i * (x mod p) + b_i) mod p) mod w`, where `p` is a prime modulus
//! shared by every row and `w` is the row width. Moduli range up to
//! [`MODULUS_LIMIT`]; products are reduced without overflow.
//!
//! Two keys that are congruent mod `p` collide in every row, so `p` must
//! exceed every key the sketch sees. The default, [`DEFAULT_PRIME`], lies
//! above `u64::MAX` and covers every [`SketchKey`].

mod key;
mod prime;

pub use self::key::SketchKey;
pub use self::key::DEFAULT_UPDATE_SEED;

use self::prime::is_prime;
use self::prime::mul_mod;
use crate::common::random::RandomSource;
use crate::error::Error;

/// The smallest prime above `2^64`, the default modulus.
///
/// Every `u64` key is its own residue, so distinct keys never collide in
/// all rows by construction.
pub const DEFAULT_PRIME: u128 = (1 << 64) + 13;

/// Exclusive upper bound on the prime modulus.
pub const MODULUS_LIMIT: u128 = 1 << 65;

/// Largest accepted width or depth.
pub const MAX_DIMENSION: usize = u32::MAX as usize;

/// Coefficients of the hash function for a single row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowHash {
    a: u128,
    b: u128,
}

impl RowHash {
    /// Creates the coefficient pair `(a, b)`.
    ///
    /// The pair is validated against a modulus when a [`HashFamily`] is built.
    pub const fn new(a: u128, b: u128) -> Self {
        Self { a, b }
    }

    /// Returns the multiplier `a`.
    pub fn a(&self) -> u128 {
        self.a
    }

    /// Returns the offset `b`.
    pub fn b(&self) -> u128 {
        self.b
    }
}

impl From<(u64, u64)> for RowHash {
    fn from((a, b): (u64, u64)) -> Self {
        Self::new(a as u128, b as u128)
    }
}

/// A fixed set of `depth` hash functions sharing a prime modulus and a width.
///
/// Parameters are immutable after construction, so a family can be shared
/// freely between concurrent readers and writers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashFamily {
    prime: u128,
    width: usize,
    rows: Vec<RowHash>,
}

impl HashFamily {
    /// Creates a family from explicit coefficient pairs.
    ///
    /// Only the first `depth` pairs are used.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind::ConfigInvalid)
    /// if the shape is invalid (see [`generate`](Self::generate)), if fewer
    /// than `depth` pairs are supplied, if the used pairs are not distinct, or
    /// if a pair violates `0 < a < p` and `0 <= b < p`.
    pub fn new(
        prime: u128,
        width: usize,
        depth: usize,
        params: impl IntoIterator<Item = RowHash>,
    ) -> Result<Self, Error> {
        validate_shape(prime, width, depth)?;

        let rows: Vec<RowHash> = params.into_iter().take(depth).collect();
        if rows.len() < depth {
            return Err(Error::config_invalid(format!(
                "{depth} hash coefficient pairs are required, got {}",
                rows.len()
            )));
        }
        for (row, params) in rows.iter().enumerate() {
            if params.a == 0 || params.a >= prime || params.b >= prime {
                return Err(Error::config_invalid(
                    "hash coefficients must satisfy 0 < a < p and 0 <= b < p",
                )
                .with_context("row", row)
                .with_context("a", params.a)
                .with_context("b", params.b)
                .with_context("prime", prime));
            }
            if rows[..row].contains(params) {
                return Err(Error::config_invalid("hash coefficient pairs must be distinct")
                    .with_context("row", row)
                    .with_context("a", params.a)
                    .with_context("b", params.b));
            }
        }

        Ok(Self { prime, width, rows })
    }

    /// Creates a family whose coefficients are drawn from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind::ConfigInvalid)
    /// if `width` or `depth` is zero or above [`MAX_DIMENSION`], if the
    /// counter matrix would not fit in memory, if `prime` is not a prime below
    /// [`MODULUS_LIMIT`], or if it admits fewer than `depth` distinct pairs.
    pub fn generate(
        prime: u128,
        width: usize,
        depth: usize,
        source: &mut impl RandomSource,
    ) -> Result<Self, Error> {
        validate_shape(prime, width, depth)?;

        // (p - 1) * p pairs; overflow means plenty.
        let exhausted = (prime - 1)
            .checked_mul(prime)
            .is_some_and(|available| available < depth as u128);
        if exhausted {
            return Err(Error::config_invalid(format!(
                "prime {prime} admits too few distinct coefficient pairs, {depth} required"
            )));
        }

        let mut rows = Vec::with_capacity(depth);
        while rows.len() < depth {
            let a = 1 + source.next_below_wide(prime - 1);
            let b = source.next_below_wide(prime);
            let params = RowHash::new(a, b);
            if !rows.contains(&params) {
                rows.push(params);
            }
        }

        Ok(Self { prime, width, rows })
    }

    /// Returns the prime modulus.
    pub fn prime(&self) -> u128 {
        self.prime
    }

    /// Returns the number of buckets per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the number of rows.
    pub fn depth(&self) -> usize {
        self.rows.len()
    }

    /// Returns the coefficient pairs, one per row.
    pub fn params(&self) -> &[RowHash] {
        &self.rows
    }

    /// Maps `key` to its bucket in `row`.
    ///
    /// # Panics
    ///
    /// Panics if `row >= depth`.
    pub fn hash(&self, key: u64, row: usize) -> usize {
        let RowHash { a, b } = self.rows[row];
        self.apply(a, b, key)
    }

    /// Returns an iterator over `(row, bucket)` for every row.
    pub fn buckets(&self, key: u64) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .map(move |(row, params)| (row, self.apply(params.a, params.b, key)))
    }

    fn apply(&self, a: u128, b: u128, key: u64) -> usize {
        let p = self.prime;
        let x = key as u128 % p;
        // both terms are below p < 2^65
        let h = (mul_mod(a, x, p) + b) % p;
        (h % self.width as u128) as usize
    }
}

fn validate_shape(prime: u128, width: usize, depth: usize) -> Result<(), Error> {
    if width == 0 {
        return Err(Error::config_invalid("width must be positive"));
    }
    if depth == 0 {
        return Err(Error::config_invalid("depth must be positive"));
    }
    if width > MAX_DIMENSION || depth > MAX_DIMENSION {
        return Err(Error::config_invalid("width and depth must not exceed 2^32 - 1")
            .with_context("width", width)
            .with_context("depth", depth));
    }
    let fits = width
        .checked_mul(depth)
        .and_then(|cells| cells.checked_mul(size_of::<u64>()))
        .is_some_and(|bytes| bytes <= isize::MAX as usize);
    if !fits {
        return Err(Error::config_invalid("counter matrix is too large to allocate")
            .with_context("width", width)
            .with_context("depth", depth));
    }
    if prime >= MODULUS_LIMIT {
        return Err(Error::config_invalid("modulus must be below 2^65").with_context("prime", prime));
    }
    if !is_prime(prime) {
        return Err(Error::config_invalid("modulus must be a prime number").with_context("prime", prime));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::random::XorShift64;
    use crate::error::ErrorKind;

    fn pairs(values: &[(u64, u64)]) -> Vec<RowHash> {
        values.iter().copied().map(RowHash::from).collect()
    }

    #[test]
    fn hash_matches_formula() {
        let family = HashFamily::new(43, 4, 2, pairs(&[(3, 1), (5, 2)])).unwrap();
        // (3 * 5 + 1) % 43 = 16, 16 % 4 = 0
        assert_eq!(family.hash(5, 0), 0);
        // (5 * 42 + 2) % 43 = 40, 40 % 4 = 0
        assert_eq!(family.hash(42, 1), 0);
        // keys are reduced mod p before multiplying
        assert_eq!(family.hash(5 + 43, 0), family.hash(5, 0));
    }

    #[test]
    fn wide_arithmetic_near_u64_max() {
        // 18446744073709551557 is the largest prime below 2^64.
        let prime = 18_446_744_073_709_551_557;
        let family =
            HashFamily::new(prime, 1000, 1, [RowHash::new(prime - 1, prime - 1)]).unwrap();
        // (p-1) * (p-1) + (p-1) = p * (p-1) ≡ 0 mod p
        assert_eq!(family.hash((prime - 1) as u64, 0), 0);
        assert!(family.hash(u64::MAX, 0) < 1000);
    }

    #[test]
    fn wide_arithmetic_above_u64() {
        let p = DEFAULT_PRIME;
        // a = p - 1 = -1, so h = b - x mod p
        let family = HashFamily::new(p, 1 << 20, 1, [RowHash::new(p - 1, 5)]).unwrap();
        assert_eq!(family.hash(0, 0), 5);
        assert_eq!(family.hash(5, 0), 0);
        // 5 - 6 = p - 1 = 2^64 + 12
        assert_eq!(family.hash(6, 0), 12);
        // 5 - u64::MAX = p - 2^64 + 6 = 19
        assert_eq!(family.hash(u64::MAX, 0), 19);
    }

    #[test]
    fn default_prime_separates_every_key() {
        // u64::MAX and 7 differ by a multiple of 2^61 - 1 but not of the default prime.
        let mersenne = (1 << 61) - 1;
        let family = HashFamily::new(mersenne, 1 << 16, 1, [RowHash::new(3, 1)]).unwrap();
        assert_eq!(family.hash(u64::MAX, 0), family.hash(7, 0));

        let family =
            HashFamily::generate(DEFAULT_PRIME, 1 << 16, 8, &mut XorShift64::seeded(5)).unwrap();
        let shared = (0..8)
            .filter(|&row| family.hash(u64::MAX, row) == family.hash(7, row))
            .count();
        assert!(shared < 8);
    }

    #[test]
    fn buckets_cover_every_row() {
        let family =
            HashFamily::generate(DEFAULT_PRIME, 128, 5, &mut XorShift64::seeded(3)).unwrap();
        let buckets: Vec<_> = family.buckets(12345).collect();
        assert_eq!(buckets.len(), 5);
        for (row, bucket) in buckets {
            assert_eq!(bucket, family.hash(12345, row));
            assert!(bucket < 128);
        }
    }

    #[test]
    fn generated_pairs_are_valid_and_distinct() {
        let family = HashFamily::generate(5, 7, 20, &mut XorShift64::seeded(11)).unwrap();
        let params = family.params();
        for (i, p) in params.iter().enumerate() {
            assert!(p.a() > 0 && p.a() < 5);
            assert!(p.b() < 5);
            assert!(!params[..i].contains(p));
        }

        let family =
            HashFamily::generate(DEFAULT_PRIME, 7, 20, &mut XorShift64::seeded(11)).unwrap();
        for p in family.params() {
            assert!(p.a() > 0 && p.a() < DEFAULT_PRIME);
            assert!(p.b() < DEFAULT_PRIME);
        }
    }

    #[test]
    fn generate_rejects_exhausted_modulus() {
        // p = 2 admits only (1, 0) and (1, 1).
        let err = HashFamily::generate(2, 7, 3, &mut XorShift64::seeded(0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn new_rejects_bad_configuration() {
        let cases = [
            HashFamily::new(43, 0, 1, pairs(&[(1, 0)])),
            HashFamily::new(43, 4, 0, pairs(&[(1, 0)])),
            HashFamily::new(0, 4, 1, pairs(&[(1, 0)])),
            HashFamily::new(42, 4, 1, pairs(&[(1, 0)])),
            HashFamily::new(MODULUS_LIMIT, 4, 1, pairs(&[(1, 0)])),
            HashFamily::new(43, 4, 2, pairs(&[(1, 0)])),
            HashFamily::new(43, 4, 2, pairs(&[(1, 0), (1, 0)])),
            HashFamily::new(43, 4, 1, pairs(&[(0, 0)])),
            HashFamily::new(43, 4, 1, pairs(&[(43, 0)])),
            HashFamily::new(43, 4, 1, pairs(&[(1, 43)])),
        ];
        for result in cases {
            assert_eq!(result.unwrap_err().kind(), ErrorKind::ConfigInvalid);
        }
    }

    #[test]
    fn oversized_shapes_are_rejected() {
        let cases = [
            (MAX_DIMENSION + 1, 1),
            (1, MAX_DIMENSION + 1),
            (usize::MAX / 2, 3),
            (MAX_DIMENSION, MAX_DIMENSION),
        ];
        for (width, depth) in cases {
            let err = HashFamily::generate(43, width, depth, &mut XorShift64::seeded(0))
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ConfigInvalid, "{width} x {depth}");
        }
    }

    #[test]
    fn extra_pairs_are_ignored() {
        let family = HashFamily::new(43, 4, 1, pairs(&[(3, 1), (3, 1)])).unwrap();
        assert_eq!(family.depth(), 1);
    }
}
