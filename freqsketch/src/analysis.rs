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

//! Offline comparison of sketch estimates against exact counts.
//!
//! The analyzer is a validation and reporting facility; it is never on the
//! ingestion or query path. Identifiers missing from the ground truth are
//! reported as [`ItemError::Unknown`] rather than failing the analysis.
//!
//! # Usage
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use freqsketch::analysis::ErrorAnalyzer;
//! use freqsketch::countmin::CountMinSketch;
//!
//! let mut sketch = CountMinSketch::builder().dimensions(64, 3).seed(5).build().unwrap();
//! sketch.ingest([1u64, 1, 2]);
//!
//! let truth = HashMap::from([(1, 2), (2, 1)]);
//! let report = ErrorAnalyzer::new(&truth, sketch.total()).analyze(&sketch, [1, 2, 3]);
//!
//! assert_eq!(report.len(), 3);
//! assert_eq!(report.unknown_ids(), vec![3]);
//! assert!(report.summary().max_relative_error() >= 0.0);
//! ```

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::io::Write;

use crate::countmin::FrequencyEstimator;
use crate::error::Error;

/// Accuracy of the estimate for an identifier with a known true count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemAccuracy {
    estimate: u64,
    true_count: u64,
    relative_error: f64,
    true_frequency: f64,
}

impl ItemAccuracy {
    /// Returns the sketch estimate.
    pub fn estimate(&self) -> u64 {
        self.estimate
    }

    /// Returns the exact count.
    pub fn true_count(&self) -> u64 {
        self.true_count
    }

    /// Returns `|estimate - true| / true`.
    ///
    /// For a true count of zero this is `0` when the estimate is also zero
    /// and infinite otherwise.
    pub fn relative_error(&self) -> f64 {
        self.relative_error
    }

    /// Returns the true count divided by the stream length.
    pub fn true_frequency(&self) -> f64 {
        self.true_frequency
    }

    /// Returns `estimate - true`.
    pub fn overestimate(&self) -> u64 {
        self.estimate.saturating_sub(self.true_count)
    }
}

/// Per-identifier outcome of an analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemError {
    /// The identifier has a true count.
    Known(ItemAccuracy),
    /// The identifier is absent from the ground truth.
    Unknown {
        /// The sketch estimate for the identifier.
        estimate: u64,
    },
}

impl ItemError {
    /// Returns the accuracy if the true count is known.
    pub fn known(&self) -> Option<&ItemAccuracy> {
        match self {
            ItemError::Known(accuracy) => Some(accuracy),
            ItemError::Unknown { .. } => None,
        }
    }

    /// Returns the sketch estimate.
    pub fn estimate(&self) -> u64 {
        match self {
            ItemError::Known(accuracy) => accuracy.estimate,
            ItemError::Unknown { estimate } => *estimate,
        }
    }
}

/// Compares estimates against a map of exact counts.
#[derive(Debug, Clone, Copy)]
pub struct ErrorAnalyzer<'a> {
    ground_truth: &'a HashMap<u64, u64>,
    total: u64,
}

impl<'a> ErrorAnalyzer<'a> {
    /// Creates an analyzer over `ground_truth` for a stream of `total` items.
    pub fn new(ground_truth: &'a HashMap<u64, u64>, total: u64) -> Self {
        Self {
            ground_truth,
            total,
        }
    }

    /// Evaluates a single identifier.
    pub fn evaluate<E: FrequencyEstimator + ?Sized>(&self, sketch: &E, key: u64) -> ItemError {
        let estimate = sketch.estimate_key(key);
        let Some(&true_count) = self.ground_truth.get(&key) else {
            return ItemError::Unknown { estimate };
        };

        let relative_error = if true_count > 0 {
            estimate.abs_diff(true_count) as f64 / true_count as f64
        } else if estimate == 0 {
            0.0
        } else {
            f64::INFINITY
        };
        let true_frequency = if self.total > 0 {
            true_count as f64 / self.total as f64
        } else {
            0.0
        };

        ItemError::Known(ItemAccuracy {
            estimate,
            true_count,
            relative_error,
            true_frequency,
        })
    }

    /// Evaluates every identifier in `keys`; duplicates are evaluated once.
    pub fn analyze<E, I>(&self, sketch: &E, keys: I) -> ErrorReport
    where
        E: FrequencyEstimator + ?Sized,
        I: IntoIterator<Item = u64>,
    {
        let mut items = BTreeMap::new();
        for key in keys {
            items
                .entry(key)
                .or_insert_with(|| self.evaluate(sketch, key));
        }
        let report = ErrorReport {
            total: self.total,
            items,
        };
        tracing::debug!(
            evaluated = report.len(),
            unknown = report.unknown_ids().len(),
            "analyzed sketch estimates"
        );
        report
    }

    /// Evaluates every identifier of the ground truth.
    pub fn analyze_ground_truth<E>(&self, sketch: &E) -> ErrorReport
    where
        E: FrequencyEstimator + ?Sized,
    {
        self.analyze(sketch, self.ground_truth.keys().copied())
    }
}

/// Result of an analysis, ordered by identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorReport {
    total: u64,
    items: BTreeMap<u64, ItemError>,
}

impl ErrorReport {
    /// Returns the stream length the report was computed for.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Returns the number of evaluated identifiers.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if no identifier was evaluated.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the outcome for `key`, if it was evaluated.
    pub fn get(&self, key: u64) -> Option<&ItemError> {
        self.items.get(&key)
    }

    /// Iterates over outcomes in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &ItemError)> {
        self.items.iter().map(|(k, v)| (*k, v))
    }

    /// Returns the identifiers absent from the ground truth.
    pub fn unknown_ids(&self) -> Vec<u64> {
        self.items
            .iter()
            .filter(|(_, item)| item.known().is_none())
            .map(|(k, _)| *k)
            .collect()
    }

    /// Counts identifiers whose overestimate exceeds `additive`.
    ///
    /// With `additive = ε·N` this is the number of failures of the
    /// Count-Min guarantee.
    pub fn count_exceeding(&self, additive: f64) -> usize {
        self.items
            .values()
            .filter_map(ItemError::known)
            .filter(|item| item.overestimate() as f64 > additive)
            .count()
    }

    /// Aggregates every known identifier.
    pub fn summary(&self) -> ErrorSummary {
        self.summary_where(|_| true)
    }

    /// Aggregates the known identifiers accepted by `filter`, e.g. heavy
    /// hitters by true count.
    pub fn summary_where(&self, filter: impl Fn(&ItemAccuracy) -> bool) -> ErrorSummary {
        let mut errors: Vec<f64> = self
            .items
            .values()
            .filter_map(ItemError::known)
            .filter(|item| filter(*item))
            .map(ItemAccuracy::relative_error)
            .collect();
        let unknown = self.items.len() - self.items.values().filter_map(ItemError::known).count();

        if errors.is_empty() {
            return ErrorSummary {
                evaluated: 0,
                unknown,
                ..ErrorSummary::default()
            };
        }

        errors.sort_by(f64::total_cmp);
        let evaluated = errors.len();
        let mid = evaluated / 2;
        let median = if evaluated % 2 == 0 {
            (errors[mid - 1] + errors[mid]) / 2.0
        } else {
            errors[mid]
        };
        ErrorSummary {
            evaluated,
            unknown,
            mean_relative_error: errors.iter().sum::<f64>() / evaluated as f64,
            median_relative_error: median,
            max_relative_error: errors[evaluated - 1],
            above_unity: errors.iter().filter(|&&e| e > 1.0).count(),
        }
    }

    /// Writes one tab-separated row per identifier:
    /// `id, true_frequency, relative_error, estimate, true_count`.
    ///
    /// Unknown identifiers carry `unknown` in the ground-truth columns.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Io`](crate::error::ErrorKind::Io) if the sink
    /// rejects a write.
    pub fn write_tsv<W: Write>(&self, mut out: W) -> Result<(), Error> {
        let io_err = |err: std::io::Error| Error::io("failed to write report", err);
        writeln!(out, "id\ttrue_frequency\trelative_error\testimate\ttrue_count").map_err(io_err)?;
        for (key, item) in &self.items {
            let written = match item {
                ItemError::Known(acc) => writeln!(
                    out,
                    "{key}\t{}\t{}\t{}\t{}",
                    acc.true_frequency, acc.relative_error, acc.estimate, acc.true_count
                ),
                ItemError::Unknown { estimate } => {
                    writeln!(out, "{key}\tunknown\tunknown\t{estimate}\tunknown")
                }
            };
            written.map_err(io_err)?;
        }
        Ok(())
    }
}

/// Aggregate relative-error statistics.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ErrorSummary {
    evaluated: usize,
    unknown: usize,
    mean_relative_error: f64,
    median_relative_error: f64,
    max_relative_error: f64,
    above_unity: usize,
}

impl ErrorSummary {
    /// Returns the number of identifiers aggregated.
    pub fn evaluated(&self) -> usize {
        self.evaluated
    }

    /// Returns the number of identifiers in the report without a true count.
    pub fn unknown(&self) -> usize {
        self.unknown
    }

    /// Returns the mean relative error.
    pub fn mean_relative_error(&self) -> f64 {
        self.mean_relative_error
    }

    /// Returns the median relative error.
    pub fn median_relative_error(&self) -> f64 {
        self.median_relative_error
    }

    /// Returns the largest relative error.
    pub fn max_relative_error(&self) -> f64 {
        self.max_relative_error
    }

    /// Returns how many identifiers have a relative error above 1.
    pub fn above_unity(&self) -> usize {
        self.above_unity
    }
}
