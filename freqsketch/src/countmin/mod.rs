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

//! Count-Min sketch implementation for frequency estimation.
//!
//! The Count-Min sketch approximates how often each item occurred in a
//! stream using a fixed `depth x width` matrix of counters. Estimates never
//! undercount; they overcount by more than `ε·N` with probability at most `δ`.
//!
//! # Usage
//!
//! ```rust
//! use freqsketch::countmin::CountMinSketch;
//!
//! let mut sketch = CountMinSketch::builder()
//!     .dimensions(256, 5)
//!     .seed(9001)
//!     .build()
//!     .unwrap();
//!
//! sketch.update("apple");
//! sketch.ingest(["banana", "banana", "banana"]);
//!
//! let banana = sketch.estimate("banana");
//! assert!(banana >= 3);
//! assert_eq!(sketch.total(), 4);
//! ```
//!
//! # Configuration Helpers
//!
//! ```rust
//! use freqsketch::countmin::CountMinSketch;
//!
//! let width = CountMinSketch::suggest_width(0.01);
//! let depth = CountMinSketch::suggest_depth(0.01);
//!
//! let _sketch = CountMinSketch::builder()
//!     .dimensions(width, depth)
//!     .build()
//!     .unwrap();
//! ```
//!
//! # Reproducibility
//!
//! A sketch built from a seed, or from explicit coefficient pairs, is fully
//! deterministic: the same stream always yields the same counters.
//! [`CountMinSketch::serialize`] captures the counters together with the
//! hash parameters.

mod builder;
mod concurrent;
mod serialization;
mod sketch;
mod table;

pub use self::builder::CountMinSketchBuilder;
pub use self::concurrent::ConcurrentCountMinSketch;
pub use self::sketch::CountMinSketch;
pub use self::table::CounterTable;

use crate::error::Error;

/// Point frequency queries over integer keys.
///
/// Implemented by both sketch flavours; consumed by
/// [`ErrorAnalyzer`](crate::analysis::ErrorAnalyzer).
pub trait FrequencyEstimator {
    /// Returns the estimated number of occurrences of `key`.
    fn estimate_key(&self, key: u64) -> u64;

    /// Returns the number of items ingested so far.
    fn total(&self) -> u64;
}

// The hash family only emits in-range buckets; anything else is a bug.
fn defect(err: Error) -> ! {
    panic!("hash family produced an invalid counter index: {err}")
}
