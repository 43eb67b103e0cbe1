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

//! Snapshot encoding of a sketch together with its hash parameters.
//!
//! Layout (little-endian):
//!
//! ```text
//! byte 0      preamble longs (6)
//! byte 1      serial version
//! byte 2      family id
//! byte 3      flags
//! bytes 4-7   depth (u32)
//! bytes 8-11  width (u32)
//! bytes 12-15 reserved
//! longs 2-3   prime modulus (u128)
//! long 4      total items ingested
//! long 5      coefficient seed (meaningful when FLAGS_HAS_SEED is set)
//! then        depth pairs of (a, b), each a u128
//! then        depth * width counters, row-major
//! ```
//!
//! Counters are always present, so the decoder can check the declared
//! dimensions against the input length before allocating.

use crate::codec::Family;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::countmin::CountMinSketch;
use crate::countmin::table::CounterTable;
use crate::error::Error;
use crate::hash::HashFamily;
use crate::hash::RowHash;

const SERIAL_VERSION: u8 = 1;
const FLAGS_HAS_SEED: u8 = 1 << 0;
const LONG_SIZE_BYTES: usize = 8;
const PAIR_LONGS: usize = 4;

impl CountMinSketch {
    /// Serializes the counters and hash parameters into bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use freqsketch::countmin::CountMinSketch;
    ///
    /// let mut sketch = CountMinSketch::builder().dimensions(64, 3).seed(1).build().unwrap();
    /// sketch.ingest([1u64, 2, 2]);
    ///
    /// let bytes = sketch.serialize();
    /// let decoded = CountMinSketch::deserialize(&bytes).unwrap();
    /// assert_eq!(decoded, sketch);
    /// ```
    pub fn serialize(&self) -> Vec<u8> {
        let family = Family::COUNTMIN;
        let params = self.hash_family().params();
        let counts = self.table().counts();
        let longs = family.pre_longs as usize + PAIR_LONGS * params.len() + counts.len();

        let mut flags = 0;
        if self.seed().is_some() {
            flags |= FLAGS_HAS_SEED;
        }

        let mut bytes = SketchBytes::with_capacity(longs * LONG_SIZE_BYTES);
        bytes.write_u8(family.pre_longs);
        bytes.write_u8(SERIAL_VERSION);
        bytes.write_u8(family.id);
        bytes.write_u8(flags);
        // HashFamily bounds both dimensions by u32::MAX.
        bytes.write_u32_le(self.depth() as u32);
        bytes.write_u32_le(self.width() as u32);
        bytes.write_u32_le(0);
        bytes.write_u128_le(self.hash_family().prime());
        bytes.write_u64_le(self.total());
        bytes.write_u64_le(self.seed().unwrap_or(0));

        for p in params {
            bytes.write_u128_le(p.a());
            bytes.write_u128_le(p.b());
        }
        for &count in counts {
            bytes.write_u64_le(count);
        }
        bytes.into_bytes()
    }

    /// Deserializes a sketch from bytes produced by [`serialize`](Self::serialize).
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::MalformedDeserializeData`](crate::error::ErrorKind::MalformedDeserializeData)
    /// if the bytes are truncated, belong to another family or version, or
    /// carry invalid dimensions or hash parameters.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let family = Family::COUNTMIN;
        let mut cursor = SketchSlice::new(bytes);

        let pre_longs = cursor
            .read_u8()
            .map_err(|_| Error::insufficient_data("preamble_longs"))?;
        let serial_version = cursor
            .read_u8()
            .map_err(|_| Error::insufficient_data("serial_version"))?;
        let family_id = cursor
            .read_u8()
            .map_err(|_| Error::insufficient_data("family_id"))?;
        let flags = cursor
            .read_u8()
            .map_err(|_| Error::insufficient_data("flags"))?;

        family.validate_id(family_id)?;
        if serial_version != SERIAL_VERSION {
            return Err(Error::deserial(format!(
                "unsupported serial version: expected {SERIAL_VERSION}, got {serial_version}"
            )));
        }
        if pre_longs != family.pre_longs {
            return Err(Error::deserial(format!(
                "invalid preamble longs: expected {}, got {pre_longs}",
                family.pre_longs
            )));
        }

        let depth = cursor
            .read_u32_le()
            .map_err(|_| Error::insufficient_data("depth"))? as usize;
        let width = cursor
            .read_u32_le()
            .map_err(|_| Error::insufficient_data("width"))? as usize;
        cursor
            .read_u32_le()
            .map_err(|_| Error::insufficient_data("reserved"))?;
        let prime = cursor
            .read_u128_le()
            .map_err(|_| Error::insufficient_data("prime"))?;
        let total = cursor
            .read_u64_le()
            .map_err(|_| Error::insufficient_data("total"))?;
        let seed = cursor
            .read_u64_le()
            .map_err(|_| Error::insufficient_data("seed"))?;

        if flags & !FLAGS_HAS_SEED != 0 {
            return Err(Error::deserial(format!("unknown flags: {flags:#04x}")));
        }
        if depth == 0 || width == 0 {
            return Err(Error::deserial("depth and width must be positive")
                .with_context("depth", depth)
                .with_context("width", width));
        }

        // the length check must precede any allocation sized by the header
        let num_counters = depth
            .checked_mul(width)
            .ok_or_else(|| Error::deserial("sketch dimensions overflow"))?;
        let expected = depth
            .checked_mul(PAIR_LONGS)
            .and_then(|pairs| pairs.checked_add(num_counters))
            .and_then(|longs| longs.checked_mul(LONG_SIZE_BYTES))
            .ok_or_else(|| Error::deserial("sketch dimensions overflow"))?;
        if cursor.remaining() != expected {
            return Err(Error::deserial(format!(
                "expected {expected} bytes of hash parameters and counters, got {}",
                cursor.remaining()
            ))
            .with_context("depth", depth)
            .with_context("width", width));
        }

        let mut params = Vec::with_capacity(depth);
        for _ in 0..depth {
            let a = cursor
                .read_u128_le()
                .map_err(|_| Error::insufficient_data("hash coefficient a"))?;
            let b = cursor
                .read_u128_le()
                .map_err(|_| Error::insufficient_data("hash coefficient b"))?;
            params.push(RowHash::new(a, b));
        }
        let hashes = HashFamily::new(prime, width, depth, params)
            .map_err(|err| Error::deserial("invalid hash parameters").set_source(err))?;

        let mut counts = Vec::with_capacity(num_counters);
        for _ in 0..num_counters {
            counts.push(
                cursor
                    .read_u64_le()
                    .map_err(|_| Error::insufficient_data("counters"))?,
            );
        }
        let table = CounterTable::from_counts(depth, width, counts);

        let seed = (flags & FLAGS_HAS_SEED != 0).then_some(seed);
        Ok(CountMinSketch::from_snapshot(hashes, table, total, seed))
    }
}
