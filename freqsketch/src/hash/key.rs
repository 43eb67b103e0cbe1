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

/// Seed for hashing byte-like tokens into integer keys.
pub const DEFAULT_UPDATE_SEED: u64 = 9001;

/// A stream token that can be reduced to a 64-bit integer key.
///
/// Integers are their own key; signed integers are reinterpreted in two's
/// complement so that equal values of different widths share a key. Strings
/// and byte slices are hashed with MurmurHash3 (x64, 128-bit) and keep the
/// low half.
pub trait SketchKey {
    /// Returns the integer key for this token.
    fn sketch_key(&self) -> u64;
}

impl<T: SketchKey + ?Sized> SketchKey for &T {
    fn sketch_key(&self) -> u64 {
        (**self).sketch_key()
    }
}

macro_rules! impl_unsigned_key {
    ($($t:ty),*) => {
        $(
            impl SketchKey for $t {
                fn sketch_key(&self) -> u64 {
                    *self as u64
                }
            }
        )*
    };
}

macro_rules! impl_signed_key {
    ($($t:ty),*) => {
        $(
            impl SketchKey for $t {
                fn sketch_key(&self) -> u64 {
                    *self as i64 as u64
                }
            }
        )*
    };
}

impl_unsigned_key!(u8, u16, u32, u64, usize);
impl_signed_key!(i8, i16, i32, i64, isize);

impl SketchKey for [u8] {
    fn sketch_key(&self) -> u64 {
        let (h1, _) = mur3::murmurhash3_x64_128(self, DEFAULT_UPDATE_SEED as u32);
        h1
    }
}

impl SketchKey for Vec<u8> {
    fn sketch_key(&self) -> u64 {
        self.as_slice().sketch_key()
    }
}

impl SketchKey for str {
    fn sketch_key(&self) -> u64 {
        self.as_bytes().sketch_key()
    }
}

impl SketchKey for String {
    fn sketch_key(&self) -> u64 {
        self.as_bytes().sketch_key()
    }
}
