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

use super::MODULUS_LIMIT;

// Witnesses that make Miller-Rabin deterministic below 3.3 * 10^24.
const WITNESSES: [u128; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

const LOW_64: u128 = u64::MAX as u128;

/// Returns true if `n` is prime.
///
/// Deterministic Miller-Rabin; `n` must be below [`MODULUS_LIMIT`].
pub(crate) fn is_prime(n: u128) -> bool {
    debug_assert!(n < MODULUS_LIMIT);
    if n < 2 {
        return false;
    }
    for &p in &WITNESSES {
        if n % p == 0 {
            return n == p;
        }
    }

    let mut d = n - 1;
    let mut s = 0;
    while d % 2 == 0 {
        d /= 2;
        s += 1;
    }

    'witness: for &a in &WITNESSES {
        let mut x = pow_mod(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..s {
            x = mul_mod(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Returns `a * b mod m` for `a, b < m < 2^65`.
///
/// Splits each operand at bit 64 so no partial product exceeds `2^128`.
pub(crate) fn mul_mod(a: u128, b: u128, m: u128) -> u128 {
    debug_assert!(a < m && b < m && m < MODULUS_LIMIT);
    let (a_hi, a_lo) = (a >> 64, a & LOW_64);
    let (b_hi, b_lo) = (b >> 64, b & LOW_64);

    let mut r = a_lo * b_lo % m;
    if a_hi != 0 {
        r = (r + shl64_mod(b_lo, m)) % m;
    }
    if b_hi != 0 {
        r = (r + shl64_mod(a_lo, m)) % m;
    }
    if a_hi != 0 && b_hi != 0 {
        r = (r + (1u128 << 127) % m * 2 % m) % m;
    }
    r
}

// y * 2^64 mod m, for y < 2^64
fn shl64_mod(y: u128, m: u128) -> u128 {
    (y << 64) % m
}

fn pow_mod(mut base: u128, mut exp: u128, m: u128) -> u128 {
    let mut result = 1;
    base %= m;
    while exp > 0 {
        if exp & 1 == 1 {
            result = mul_mod(result, base, m);
        }
        base = mul_mod(base, base, m);
        exp >>= 1;
    }
    result
}
