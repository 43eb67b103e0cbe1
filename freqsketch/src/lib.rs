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

//! # freqsketch
//!
//! A Count-Min sketch for estimating item frequencies over large or
//! unbounded streams in memory sub-linear in the number of distinct items.
//!
//! - [`countmin`]: the sketch itself, its builder and a concurrent variant.
//! - [`hash`]: the pairwise-independent hash family and item keys.
//! - [`analysis`]: offline comparison of estimates with exact counts.
//! - [`input`]: readers for newline-delimited streams and tab-separated
//!   ground truth and hash coefficients.
//!
//! ```rust
//! use freqsketch::countmin::CountMinSketch;
//!
//! let mut sketch = CountMinSketch::builder()
//!     .accuracy(0.01, 0.01)
//!     .seed(17)
//!     .build()
//!     .unwrap();
//!
//! sketch.ingest([5, 5, 5, 7, 7, 9]);
//! assert!(sketch.estimate(5) >= 3);
//! assert!(sketch.estimate(7) >= 2);
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]

pub mod analysis;
pub mod common;
pub mod countmin;
pub mod error;
pub mod hash;
pub mod input;

mod codec;
