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

use std::f64::consts::E;

use crate::common::random::XorShift64;
use crate::common::random::fresh_seed;
use crate::countmin::ConcurrentCountMinSketch;
use crate::countmin::CountMinSketch;
use crate::error::Error;
use crate::hash::DEFAULT_PRIME;
use crate::hash::HashFamily;
use crate::hash::MAX_DIMENSION;
use crate::hash::RowHash;

const DEFAULT_WIDTH: usize = 10_000;
const DEFAULT_DEPTH: usize = 5;

#[derive(Debug, Clone, Copy)]
enum Sizing {
    Accuracy { epsilon: f64, delta: f64 },
    Dimensions { width: usize, depth: usize },
}

#[derive(Debug, Clone)]
enum Coefficients {
    Explicit(Vec<RowHash>),
    Seeded(u64),
    Randomized,
}

/// Builder for creating Count-Min sketches.
///
/// A sketch is sized either from accuracy targets or from explicit
/// dimensions, and draws its hash coefficients from one of three sources:
/// explicit pairs, a fixed seed (reproducible runs), or a fresh seed per
/// run (independent trials). Without further configuration the builder
/// produces a `10_000 x 5` sketch over the smallest prime above `2^64` with a
/// fresh seed.
///
/// # Examples
///
/// ```
/// use freqsketch::countmin::CountMinSketch;
///
/// let mut sketch = CountMinSketch::builder()
///     .accuracy(0.001, 0.01)
///     .seed(42)
///     .build()
///     .unwrap();
///
/// assert_eq!(sketch.width(), 2719);
/// assert_eq!(sketch.depth(), 5);
///
/// sketch.update(7);
/// assert!(sketch.estimate(7) >= 1);
/// ```
#[derive(Debug, Clone)]
pub struct CountMinSketchBuilder {
    sizing: Sizing,
    prime: u128,
    key_domain: Option<u64>,
    coefficients: Coefficients,
}

impl Default for CountMinSketchBuilder {
    fn default() -> Self {
        Self {
            sizing: Sizing::Dimensions {
                width: DEFAULT_WIDTH,
                depth: DEFAULT_DEPTH,
            },
            prime: DEFAULT_PRIME,
            key_domain: None,
            coefficients: Coefficients::Randomized,
        }
    }
}

impl CountMinSketchBuilder {
    /// Sizes the sketch from a relative error `epsilon` and failure
    /// probability `delta`: `width = ⌈e/ε⌉`, `depth = ⌈ln(1/δ)⌉`.
    pub fn accuracy(mut self, epsilon: f64, delta: f64) -> Self {
        self.sizing = Sizing::Accuracy { epsilon, delta };
        self
    }

    /// Sizes the sketch explicitly.
    pub fn dimensions(mut self, width: usize, depth: usize) -> Self {
        self.sizing = Sizing::Dimensions { width, depth };
        self
    }

    /// Sets the prime modulus of the hash family.
    ///
    /// A prime that does not exceed `u64::MAX` cannot separate every key, so
    /// it must be paired with a [`key_domain`](Self::key_domain) below it.
    pub fn prime(mut self, prime: u128) -> Self {
        self.prime = prime;
        self
    }

    /// Declares the largest key the stream can contain.
    ///
    /// The prime modulus must exceed it, otherwise distinct keys that are
    /// congruent modulo the prime would always collide. Keys above the
    /// declared domain are not checked on update.
    pub fn key_domain(mut self, max_key: u64) -> Self {
        self.key_domain = Some(max_key);
        self
    }

    /// Uses explicit coefficient pairs, one per row.
    pub fn hash_params<P>(mut self, params: impl IntoIterator<Item = P>) -> Self
    where
        P: Into<RowHash>,
    {
        self.coefficients = Coefficients::Explicit(params.into_iter().map(Into::into).collect());
        self
    }

    /// Generates coefficients deterministically from `seed`.
    pub fn seed(mut self, seed: u64) -> Self {
        self.coefficients = Coefficients::Seeded(seed);
        self
    }

    /// Generates coefficients from a fresh seed drawn at build time.
    ///
    /// The drawn seed is logged and exposed through
    /// [`CountMinSketch::seed`] so a trial can be replayed.
    pub fn randomized(mut self) -> Self {
        self.coefficients = Coefficients::Randomized;
        self
    }

    /// Builds a sketch for single-threaded ingestion.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind::ConfigInvalid)
    /// if the accuracy targets are outside `(0, 1)` or need a width above
    /// [`MAX_DIMENSION`], a dimension is zero or too large to allocate, the
    /// modulus is not a prime exceeding the key domain, or the coefficient
    /// pairs are insufficient or invalid.
    pub fn build(self) -> Result<CountMinSketch, Error> {
        let (hashes, seed) = self.build_hash_family()?;
        Ok(CountMinSketch::from_parts(hashes, seed))
    }

    /// Builds a sketch that accepts concurrent updates through `&self`.
    ///
    /// # Errors
    ///
    /// Same as [`build`](Self::build).
    pub fn build_concurrent(self) -> Result<ConcurrentCountMinSketch, Error> {
        let (hashes, seed) = self.build_hash_family()?;
        Ok(ConcurrentCountMinSketch::from_parts(hashes, seed))
    }

    fn build_hash_family(self) -> Result<(HashFamily, Option<u64>), Error> {
        let (width, depth) = match self.sizing {
            Sizing::Dimensions { width, depth } => (width, depth),
            Sizing::Accuracy { epsilon, delta } => {
                if !(epsilon > 0.0 && epsilon < 1.0) {
                    return Err(Error::config_invalid("epsilon must be in (0, 1)")
                        .with_context("epsilon", epsilon));
                }
                if !(delta > 0.0 && delta < 1.0) {
                    return Err(Error::config_invalid("delta must be in (0, 1)")
                        .with_context("delta", delta));
                }
                let width = E / epsilon;
                if !width.is_finite() || width > MAX_DIMENSION as f64 {
                    return Err(Error::config_invalid(
                        "epsilon is too small for a representable width",
                    )
                    .with_context("epsilon", epsilon));
                }
                (
                    CountMinSketch::suggest_width(epsilon),
                    CountMinSketch::suggest_depth(delta),
                )
            }
        };

        let max_key = self.key_domain.unwrap_or(u64::MAX);
        if self.prime <= max_key as u128 {
            let err = match self.key_domain {
                Some(_) => Error::config_invalid("prime modulus must exceed the key domain"),
                None => Error::config_invalid(
                    "prime modulus does not cover every u64 key; declare the key domain",
                ),
            };
            return Err(err
                .with_context("prime", self.prime)
                .with_context("max_key", max_key));
        }

        let (hashes, seed) = match self.coefficients {
            Coefficients::Explicit(params) => {
                (HashFamily::new(self.prime, width, depth, params)?, None)
            }
            Coefficients::Seeded(seed) => (generate(self.prime, width, depth, seed)?, Some(seed)),
            Coefficients::Randomized => {
                let seed = fresh_seed();
                tracing::info!(seed, "drew hash coefficient seed");
                (generate(self.prime, width, depth, seed)?, Some(seed))
            }
        };

        tracing::debug!(
            width,
            depth,
            prime = %self.prime,
            seed = ?seed,
            "built count-min hash family"
        );
        Ok((hashes, seed))
    }
}

fn generate(prime: u128, width: usize, depth: usize, seed: u64) -> Result<HashFamily, Error> {
    HashFamily::generate(prime, width, depth, &mut XorShift64::seeded(seed))
}
