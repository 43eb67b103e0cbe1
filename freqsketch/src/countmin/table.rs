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

use crate::error::Error;

/// The `depth x width` matrix of non-negative counters.
///
/// Counters only ever grow. Rows are stored contiguously in a single
/// allocation, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterTable {
    depth: usize,
    width: usize,
    counts: Vec<u64>,
}

impl CounterTable {
    /// Allocates a zeroed table.
    ///
    /// # Panics
    ///
    /// Panics if `depth * width` overflows `usize`.
    pub fn new(depth: usize, width: usize) -> Self {
        let len = depth
            .checked_mul(width)
            .unwrap_or_else(|| panic!("counter matrix {depth} x {width} overflows usize"));
        Self {
            depth,
            width,
            counts: vec![0; len],
        }
    }

    pub(crate) fn from_counts(depth: usize, width: usize, counts: Vec<u64>) -> Self {
        debug_assert_eq!(counts.len(), depth * width);
        Self {
            depth,
            width,
            counts,
        }
    }

    /// Returns the number of rows.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the number of buckets per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Adds one to the counter at `(row, bucket)`.
    ///
    /// Counters saturate at `u64::MAX` instead of wrapping.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::IndexOutOfRange`](crate::error::ErrorKind::IndexOutOfRange)
    /// if the index falls outside the matrix.
    pub fn increment(&mut self, row: usize, bucket: usize) -> Result<(), Error> {
        let idx = self.offset(row, bucket)?;
        self.counts[idx] = self.counts[idx].saturating_add(1);
        Ok(())
    }

    /// Returns the counter at `(row, bucket)`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::IndexOutOfRange`](crate::error::ErrorKind::IndexOutOfRange)
    /// if the index falls outside the matrix.
    pub fn read(&self, row: usize, bucket: usize) -> Result<u64, Error> {
        let idx = self.offset(row, bucket)?;
        Ok(self.counts[idx])
    }

    /// Returns the counters of `row`.
    ///
    /// # Panics
    ///
    /// Panics if `row >= depth`.
    pub fn row(&self, row: usize) -> &[u64] {
        let start = row * self.width;
        &self.counts[start..start + self.width]
    }

    /// Returns true if every counter is zero.
    pub fn is_zero(&self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }

    pub(crate) fn counts(&self) -> &[u64] {
        &self.counts
    }

    fn offset(&self, row: usize, bucket: usize) -> Result<usize, Error> {
        if row >= self.depth || bucket >= self.width {
            return Err(Error::index_out_of_range(
                row, bucket, self.depth, self.width,
            ));
        }
        Ok(row * self.width + bucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn starts_zeroed() {
        let table = CounterTable::new(3, 8);
        assert!(table.is_zero());
        for row in 0..3 {
            assert_eq!(table.row(row), &[0; 8]);
        }
    }

    #[test]
    fn increment_touches_one_cell() {
        let mut table = CounterTable::new(2, 4);
        table.increment(1, 3).unwrap();
        table.increment(1, 3).unwrap();
        table.increment(0, 0).unwrap();

        assert_eq!(table.read(1, 3).unwrap(), 2);
        assert_eq!(table.read(0, 0).unwrap(), 1);
        assert_eq!(table.read(0, 3).unwrap(), 0);
        assert_eq!(table.row(1), &[0, 0, 0, 2]);
    }

    #[test]
    fn out_of_range_is_reported() {
        let mut table = CounterTable::new(2, 4);
        for (row, bucket) in [(2, 0), (0, 4), (7, 9)] {
            let err = table.increment(row, bucket).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::IndexOutOfRange);
            let err = table.read(row, bucket).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::IndexOutOfRange);
        }
        assert!(table.is_zero());
    }

    #[test]
    fn counters_saturate() {
        let mut table = CounterTable::from_counts(1, 1, vec![u64::MAX]);
        table.increment(0, 0).unwrap();
        assert_eq!(table.read(0, 0).unwrap(), u64::MAX);
    }
}
