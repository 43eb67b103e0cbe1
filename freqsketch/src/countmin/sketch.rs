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

use crate::countmin::CountMinSketchBuilder;
use crate::countmin::FrequencyEstimator;
use crate::countmin::table::CounterTable;
use crate::error::Error;
use crate::hash::HashFamily;
use crate::hash::SketchKey;

/// Count-Min sketch over a single, exclusively owned counter matrix.
///
/// Every update increments one counter per row; a point query returns the
/// minimum of the item's counters. The estimate never undercounts, and with
/// `width = ⌈e/ε⌉` and `depth = ⌈ln(1/δ)⌉` it exceeds the true count by more
/// than `ε·N` with probability at most `δ`, where `N` is the number of items
/// ingested so far.
///
/// Bucket indices are recomputed from the hash family on every query, so
/// memory stays at `depth * width` counters no matter how many distinct
/// items the stream contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountMinSketch {
    hashes: HashFamily,
    table: CounterTable,
    total: u64,
    seed: Option<u64>,
}

impl CountMinSketch {
    /// Returns a builder for configuring a sketch.
    pub fn builder() -> CountMinSketchBuilder {
        CountMinSketchBuilder::default()
    }

    /// Creates a sketch sized for the `(epsilon, delta)` targets with
    /// coefficients drawn from a fresh random seed.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind::ConfigInvalid)
    /// if either target lies outside `(0, 1)`.
    pub fn new(epsilon: f64, delta: f64) -> Result<Self, Error> {
        Self::builder().accuracy(epsilon, delta).build()
    }

    /// Creates an empty sketch over an existing hash family.
    pub fn with_hash_family(hashes: HashFamily) -> Self {
        Self::from_parts(hashes, None)
    }

    pub(crate) fn from_parts(hashes: HashFamily, seed: Option<u64>) -> Self {
        let table = CounterTable::new(hashes.depth(), hashes.width());
        Self {
            hashes,
            table,
            total: 0,
            seed,
        }
    }

    pub(crate) fn from_snapshot(
        hashes: HashFamily,
        table: CounterTable,
        total: u64,
        seed: Option<u64>,
    ) -> Self {
        Self {
            hashes,
            table,
            total,
            seed,
        }
    }

    /// Suggests the number of buckets per row for a relative error `epsilon`.
    ///
    /// # Panics
    ///
    /// Panics if `epsilon` is not in `(0, 1)`.
    pub fn suggest_width(epsilon: f64) -> usize {
        assert!(
            epsilon > 0.0 && epsilon < 1.0,
            "epsilon must be in (0, 1), got {epsilon}"
        );
        (E / epsilon).ceil() as usize
    }

    /// Suggests the number of rows for a failure probability `delta`.
    ///
    /// # Panics
    ///
    /// Panics if `delta` is not in `(0, 1)`.
    pub fn suggest_depth(delta: f64) -> usize {
        assert!(
            delta > 0.0 && delta < 1.0,
            "delta must be in (0, 1), got {delta}"
        );
        ((1.0 / delta).ln().ceil() as usize).max(1)
    }

    /// Returns the number of buckets per row.
    pub fn width(&self) -> usize {
        self.hashes.width()
    }

    /// Returns the number of rows.
    pub fn depth(&self) -> usize {
        self.hashes.depth()
    }

    /// Returns the hash family.
    pub fn hash_family(&self) -> &HashFamily {
        &self.hashes
    }

    /// Returns the counter matrix.
    pub fn table(&self) -> &CounterTable {
        &self.table
    }

    /// Returns the seed the coefficients were generated from, if any.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Returns the number of items ingested so far.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Returns true if nothing has been ingested.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Returns the relative error `e / width` this sketch guarantees.
    pub fn epsilon(&self) -> f64 {
        E / self.width() as f64
    }

    /// Returns the failure probability `e^-depth` this sketch guarantees.
    pub fn delta(&self) -> f64 {
        (-(self.depth() as f64)).exp()
    }

    /// Returns the additive error bound `ε·N` for the current stream length.
    pub fn error_bound(&self) -> f64 {
        self.epsilon() * self.total as f64
    }

    /// Records one occurrence of `item`.
    pub fn update<K: SketchKey>(&mut self, item: K) {
        self.update_key(item.sketch_key());
    }

    /// Records one occurrence of an integer key.
    pub fn update_key(&mut self, key: u64) {
        for (row, bucket) in self.hashes.buckets(key) {
            if let Err(err) = self.table.increment(row, bucket) {
                super::defect(err);
            }
        }
        self.total += 1;
    }

    /// Records every item of `items` and returns how many were ingested.
    ///
    /// The iterator may be unbounded and is consumed lazily; if it is
    /// abandoned early the sketch stays consistent for the items seen.
    pub fn ingest<I>(&mut self, items: I) -> u64
    where
        I: IntoIterator,
        I::Item: SketchKey,
    {
        let before = self.total;
        for item in items {
            self.update(item);
        }
        self.total - before
    }

    /// Records items from a fallible source, stopping at the first error.
    ///
    /// Items before the failing one remain recorded.
    pub fn try_ingest<I, K, Err>(&mut self, items: I) -> Result<u64, Err>
    where
        I: IntoIterator<Item = Result<K, Err>>,
        K: SketchKey,
    {
        let before = self.total;
        for item in items {
            self.update(item?);
        }
        Ok(self.total - before)
    }

    /// Returns the estimated number of occurrences of `item`.
    pub fn estimate<K: SketchKey>(&self, item: K) -> u64 {
        self.estimate_key(item.sketch_key())
    }

    /// Returns the estimated number of occurrences of an integer key.
    pub fn estimate_key(&self, key: u64) -> u64 {
        let mut min = u64::MAX;
        for (row, bucket) in self.hashes.buckets(key) {
            match self.table.read(row, bucket) {
                Ok(count) => min = min.min(count),
                Err(err) => super::defect(err),
            }
        }
        min
    }
}

impl FrequencyEstimator for CountMinSketch {
    fn estimate_key(&self, key: u64) -> u64 {
        CountMinSketch::estimate_key(self, key)
    }

    fn total(&self) -> u64 {
        self.total
    }
}
