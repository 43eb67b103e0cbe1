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

use freqsketch::countmin::CountMinSketch;
use freqsketch::error::ErrorKind;
use googletest::assert_that;
use googletest::prelude::contains_substring;

const PREAMBLE_BYTES: usize = 48;
const PAIR_BYTES: usize = 32;

fn populated() -> CountMinSketch {
    let mut sketch = CountMinSketch::builder()
        .dimensions(32, 3)
        .seed(77)
        .build()
        .unwrap();
    for i in 0..1_000u64 {
        sketch.update(i % 97);
    }
    sketch
}

#[test]
fn test_empty_sketch_round_trip() {
    let sketch = CountMinSketch::builder()
        .dimensions(32, 3)
        .seed(77)
        .build()
        .unwrap();
    let bytes = sketch.serialize();
    assert_eq!(bytes.len(), PREAMBLE_BYTES + 3 * PAIR_BYTES + 32 * 3 * 8);

    let decoded = CountMinSketch::deserialize(&bytes).unwrap();
    assert_eq!(decoded, sketch);
    assert!(decoded.is_empty());
    assert_eq!(decoded.seed(), Some(77));
}

#[test]
fn test_populated_sketch_round_trip() {
    let sketch = populated();
    let bytes = sketch.serialize();
    assert_eq!(bytes.len(), PREAMBLE_BYTES + 3 * PAIR_BYTES + 32 * 3 * 8);

    let decoded = CountMinSketch::deserialize(&bytes).unwrap();
    assert_eq!(decoded.total(), 1_000);
    assert_eq!(decoded.hash_family(), sketch.hash_family());
    for i in 0..200u64 {
        assert_eq!(decoded.estimate(i), sketch.estimate(i));
    }
}

#[test]
fn test_explicit_parameters_have_no_seed() {
    let mut sketch = CountMinSketch::builder()
        .dimensions(4, 2)
        .prime(43)
        .key_domain(42)
        .hash_params([(3u64, 1u64), (5u64, 2u64)])
        .build()
        .unwrap();
    sketch.ingest([5u64, 5, 5, 7, 7, 9]);

    let decoded = CountMinSketch::deserialize(&sketch.serialize()).unwrap();
    assert_eq!(decoded.seed(), None);
    assert_eq!(decoded.estimate(5u64), 3);
    assert_eq!(decoded.estimate(42u64), 0);
}

#[test]
fn test_decoded_sketch_keeps_counting() {
    let mut decoded = CountMinSketch::deserialize(&populated().serialize()).unwrap();
    let before = decoded.estimate(5u64);
    decoded.update(5u64);
    assert_eq!(decoded.estimate(5u64), before + 1);
    assert_eq!(decoded.total(), 1_001);
}

#[test]
fn test_truncated_bytes() {
    let bytes = populated().serialize();
    for len in [0, 3, 10, PREAMBLE_BYTES - 1, PREAMBLE_BYTES + 5, bytes.len() - 1] {
        let err = CountMinSketch::deserialize(&bytes[..len]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData, "len {len}");
    }

    let err = CountMinSketch::deserialize(&bytes[..2]).unwrap_err();
    assert_that!(err.message(), contains_substring("insufficient data to read family_id"));
}

#[test]
fn test_trailing_bytes() {
    let mut bytes = populated().serialize();
    bytes.push(0);
    let err = CountMinSketch::deserialize(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);
}

#[test]
fn test_wrong_family() {
    let mut bytes = populated().serialize();
    bytes[2] = 7;
    let err = CountMinSketch::deserialize(&bytes).unwrap_err();
    assert_that!(err.message(), contains_substring("invalid family"));
}

#[test]
fn test_wrong_serial_version() {
    let mut bytes = populated().serialize();
    bytes[1] = 9;
    let err = CountMinSketch::deserialize(&bytes).unwrap_err();
    assert_that!(err.message(), contains_substring("unsupported serial version"));
}

#[test]
fn test_zero_width() {
    let mut bytes = populated().serialize();
    bytes[8..12].copy_from_slice(&0u32.to_le_bytes());
    let err = CountMinSketch::deserialize(&bytes).unwrap_err();
    assert_that!(err.message(), contains_substring("must be positive"));
}

#[test]
fn test_invalid_hash_parameters() {
    let mut bytes = populated().serialize();
    // first coefficient a = 0
    bytes[PREAMBLE_BYTES..PREAMBLE_BYTES + 16].copy_from_slice(&0u128.to_le_bytes());
    let err = CountMinSketch::deserialize(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);
    assert_that!(err.message(), contains_substring("invalid hash parameters"));

    let mut bytes = populated().serialize();
    // prime = 100
    bytes[16..32].copy_from_slice(&100u128.to_le_bytes());
    let err = CountMinSketch::deserialize(&bytes).unwrap_err();
    assert_that!(err.message(), contains_substring("invalid hash parameters"));
}

#[test]
fn test_preamble_length_matches_layout() {
    let sketch = populated();
    let bytes = sketch.serialize();
    let pre_longs = bytes[0] as usize;
    assert_eq!(pre_longs * 8, PREAMBLE_BYTES);
    assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 3);
    assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 32);
    assert_eq!(
        u128::from_le_bytes(bytes[16..32].try_into().unwrap()),
        sketch.hash_family().prime()
    );

    let first_a = &bytes[pre_longs * 8..pre_longs * 8 + 16];
    assert_eq!(
        u128::from_le_bytes(first_a.try_into().unwrap()),
        sketch.hash_family().params()[0].a()
    );
}

#[test]
fn test_huge_declared_width_is_rejected_before_allocating() {
    let sketch = CountMinSketch::builder()
        .dimensions(32, 3)
        .seed(77)
        .build()
        .unwrap();
    let mut bytes = sketch.serialize();
    bytes[8..12].copy_from_slice(&u32::MAX.to_le_bytes());
    let err = CountMinSketch::deserialize(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);

    // a header alone, claiming the largest matrix
    let mut header = bytes[..PREAMBLE_BYTES].to_vec();
    header[4..8].copy_from_slice(&u32::MAX.to_le_bytes());
    let err = CountMinSketch::deserialize(&header).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);
}

#[test]
fn test_unknown_flags() {
    let mut bytes = populated().serialize();
    bytes[3] |= 1 << 1;
    let err = CountMinSketch::deserialize(&bytes).unwrap_err();
    assert_that!(err.message(), contains_substring("unknown flags"));
}
