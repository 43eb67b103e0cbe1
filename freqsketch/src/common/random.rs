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

//! Seeded random source for hash coefficient generation.

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

const GOLDEN_GAMMA: u64 = 0x9e3779b97f4a7c15;

/// Random number source for drawing hash coefficients.
pub trait RandomSource {
    /// Returns the next random 64-bit value.
    fn next_u64(&mut self) -> u64;

    /// Returns a value uniformly distributed in `[0, bound)`.
    ///
    /// Uses rejection sampling so that no residue is favoured.
    ///
    /// # Panics
    ///
    /// Panics if `bound` is 0.
    fn next_below(&mut self, bound: u64) -> u64 {
        assert!(bound > 0, "bound must be positive");
        let zone = u64::MAX - (u64::MAX % bound);
        loop {
            let value = self.next_u64();
            if value < zone {
                return value % bound;
            }
        }
    }

    /// Returns a value uniformly distributed in `[0, bound)` for bounds
    /// beyond `u64`.
    ///
    /// Bounds that fit in 64 bits draw exactly as [`next_below`](Self::next_below).
    ///
    /// # Panics
    ///
    /// Panics if `bound` is 0.
    fn next_below_wide(&mut self, bound: u128) -> u128 {
        if let Ok(narrow) = u64::try_from(bound) {
            return self.next_below(narrow) as u128;
        }
        let zone = u128::MAX - (u128::MAX % bound);
        loop {
            let value = ((self.next_u64() as u128) << 64) | self.next_u64() as u128;
            if value < zone {
                return value % bound;
            }
        }
    }
}

/// Xorshift-based random generator.
#[derive(Debug, Clone, Copy)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Creates a new generator using the provided seed.
    ///
    /// The seed is scrambled first so that small neighbouring seeds
    /// produce unrelated streams.
    pub fn seeded(seed: u64) -> Self {
        let state = splitmix64(seed);
        let state = if state == 0 { GOLDEN_GAMMA } else { state };
        Self { state }
    }
}

/// Draws a seed from the clock and the process id.
pub fn fresh_seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    nanos as u64 ^ (std::process::id() as u64).rotate_left(32)
}

impl Default for XorShift64 {
    fn default() -> Self {
        Self::seeded(fresh_seed())
    }
}

impl RandomSource for XorShift64 {
    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

fn splitmix64(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(GOLDEN_GAMMA);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = XorShift64::seeded(7);
        let mut b = XorShift64::seeded(7);
        for _ in 0..16 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn neighbouring_seeds_diverge() {
        let mut a = XorShift64::seeded(1);
        let mut b = XorShift64::seeded(2);
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn next_below_stays_in_range() {
        let mut rng = XorShift64::seeded(0);
        for bound in [1u64, 2, 3, 123457, u64::MAX] {
            for _ in 0..64 {
                assert!(rng.next_below(bound) < bound);
            }
        }
    }

    #[test]
    fn next_below_wide_covers_bounds_above_u64() {
        let mut rng = XorShift64::seeded(0);
        let bound = (1u128 << 64) + 13;
        let draws: Vec<u128> = (0..256).map(|_| rng.next_below_wide(bound)).collect();
        assert!(draws.iter().all(|&v| v < bound));
        assert!(draws.iter().any(|&v| v > u64::MAX as u128 / 2));

        let mut narrow = XorShift64::seeded(9);
        let mut wide = XorShift64::seeded(9);
        assert_eq!(narrow.next_below(43) as u128, wide.next_below_wide(43));
    }
}
