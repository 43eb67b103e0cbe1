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

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use parking_lot::RwLock;

use crate::countmin::CountMinSketch;
use crate::countmin::FrequencyEstimator;
use crate::countmin::table::CounterTable;
use crate::error::Error;
use crate::hash::HashFamily;
use crate::hash::SketchKey;

const STRIPE_BITS: u32 = 6;
const NUM_STRIPES: usize = 1 << STRIPE_BITS;

/// Count-Min sketch that accepts updates and queries from many threads.
///
/// Counters are atomics, so concurrent increments of the same bucket are
/// never lost. Items are additionally spread over a fixed set of lock
/// stripes: updates hold their item's stripe in shared mode and may run in
/// parallel, while a point query holds the stripe exclusively. A query for
/// `x` therefore observes either none or all of the `depth` increments of
/// any in-flight update of `x`; updates and queries of items on other
/// stripes interleave freely.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
///
/// use freqsketch::countmin::CountMinSketch;
///
/// let sketch = Arc::new(
///     CountMinSketch::builder()
///         .dimensions(1024, 4)
///         .seed(7)
///         .build_concurrent()
///         .unwrap(),
/// );
///
/// let workers: Vec<_> = (0..4)
///     .map(|_| {
///         let sketch = Arc::clone(&sketch);
///         thread::spawn(move || sketch.ingest(0..100u64))
///     })
///     .collect();
/// for worker in workers {
///     worker.join().unwrap();
/// }
///
/// assert_eq!(sketch.total(), 400);
/// assert!(sketch.estimate(42u64) >= 4);
/// ```
#[derive(Debug)]
pub struct ConcurrentCountMinSketch {
    hashes: HashFamily,
    counters: Box<[AtomicU64]>,
    total: AtomicU64,
    stripes: Box<[RwLock<()>]>,
    seed: Option<u64>,
}

impl ConcurrentCountMinSketch {
    /// Creates an empty sketch over an existing hash family.
    pub fn with_hash_family(hashes: HashFamily) -> Self {
        Self::from_parts(hashes, None)
    }

    pub(crate) fn from_parts(hashes: HashFamily, seed: Option<u64>) -> Self {
        let len = hashes.depth() * hashes.width();
        Self {
            hashes,
            counters: (0..len).map(|_| AtomicU64::new(0)).collect(),
            total: AtomicU64::new(0),
            stripes: (0..NUM_STRIPES).map(|_| RwLock::new(())).collect(),
            seed,
        }
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

    /// Returns the seed the coefficients were generated from, if any.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Returns the number of completed updates.
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Records one occurrence of `item`.
    pub fn update<K: SketchKey>(&self, item: K) {
        self.update_key(item.sketch_key());
    }

    /// Records one occurrence of an integer key.
    pub fn update_key(&self, key: u64) {
        let _shared = self.stripe(key).read();
        for (row, bucket) in self.hashes.buckets(key) {
            self.counter(row, bucket).fetch_add(1, Ordering::Relaxed);
        }
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Records every item of `items` and returns how many were ingested.
    pub fn ingest<I>(&self, items: I) -> u64
    where
        I: IntoIterator,
        I::Item: SketchKey,
    {
        let mut n = 0;
        for item in items {
            self.update(item);
            n += 1;
        }
        n
    }

    /// Returns the estimated number of occurrences of `item`.
    pub fn estimate<K: SketchKey>(&self, item: K) -> u64 {
        self.estimate_key(item.sketch_key())
    }

    /// Returns the estimated number of occurrences of an integer key.
    pub fn estimate_key(&self, key: u64) -> u64 {
        let _exclusive = self.stripe(key).write();
        self.hashes
            .buckets(key)
            .map(|(row, bucket)| self.counter(row, bucket).load(Ordering::Relaxed))
            .min()
            .unwrap_or(0)
    }

    /// Copies the current counters into a single-threaded sketch.
    ///
    /// Updates running concurrently with the copy may be partially
    /// reflected; call this once producers are done for an exact copy.
    pub fn snapshot(&self) -> CountMinSketch {
        let counts = self
            .counters
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .collect();
        let table = CounterTable::from_counts(self.depth(), self.width(), counts);
        CountMinSketch::from_snapshot(self.hashes.clone(), table, self.total(), self.seed)
    }

    /// Converts into a single-threaded sketch once ingestion is finished.
    pub fn into_sketch(self) -> CountMinSketch {
        let counts = self
            .counters
            .into_vec()
            .into_iter()
            .map(AtomicU64::into_inner)
            .collect();
        let table = CounterTable::from_counts(self.hashes.depth(), self.hashes.width(), counts);
        CountMinSketch::from_snapshot(self.hashes, table, self.total.into_inner(), self.seed)
    }

    fn stripe(&self, key: u64) -> &RwLock<()> {
        let idx = key.wrapping_mul(0x9e3779b97f4a7c15) >> (u64::BITS - STRIPE_BITS);
        &self.stripes[idx as usize]
    }

    fn counter(&self, row: usize, bucket: usize) -> &AtomicU64 {
        let width = self.width();
        if row >= self.depth() || bucket >= width {
            super::defect(Error::index_out_of_range(row, bucket, self.depth(), width));
        }
        &self.counters[row * width + bucket]
    }
}

impl FrequencyEstimator for ConcurrentCountMinSketch {
    fn estimate_key(&self, key: u64) -> u64 {
        ConcurrentCountMinSketch::estimate_key(self, key)
    }

    fn total(&self) -> u64 {
        ConcurrentCountMinSketch::total(self)
    }
}
