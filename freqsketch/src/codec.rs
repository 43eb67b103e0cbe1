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

//! Little-endian byte buffers for sketch snapshots.

mod family;

pub(crate) use self::family::Family;

use std::io;
use std::io::Cursor;

use byteorder::LE;
use byteorder::ReadBytesExt;
use byteorder::WriteBytesExt;

pub(crate) struct SketchBytes {
    bytes: Vec<u8>,
}

impl SketchBytes {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn write_u8(&mut self, n: u8) {
        self.bytes.push(n);
    }

    pub fn write_u32_le(&mut self, n: u32) {
        // Writing into a Vec cannot fail.
        let _ = self.bytes.write_u32::<LE>(n);
    }

    pub fn write_u64_le(&mut self, n: u64) {
        let _ = self.bytes.write_u64::<LE>(n);
    }

    pub fn write_u128_le(&mut self, n: u128) {
        let _ = self.bytes.write_u128::<LE>(n);
    }
}

pub(crate) struct SketchSlice<'a> {
    slice: Cursor<&'a [u8]>,
}

impl<'a> SketchSlice<'a> {
    pub fn new(slice: &'a [u8]) -> Self {
        Self {
            slice: Cursor::new(slice),
        }
    }

    pub fn remaining(&self) -> usize {
        let len = self.slice.get_ref().len() as u64;
        len.saturating_sub(self.slice.position()) as usize
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        self.slice.read_u8()
    }

    pub fn read_u32_le(&mut self) -> io::Result<u32> {
        self.slice.read_u32::<LE>()
    }

    pub fn read_u64_le(&mut self) -> io::Result<u64> {
        self.slice.read_u64::<LE>()
    }

    pub fn read_u128_le(&mut self) -> io::Result<u128> {
        self.slice.read_u128::<LE>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_are_little_endian() {
        let mut bytes = SketchBytes::with_capacity(13);
        bytes.write_u8(7);
        bytes.write_u32_le(0x01020304);
        bytes.write_u64_le(1);
        let bytes = bytes.into_bytes();
        assert_eq!(&bytes[..5], &[7, 4, 3, 2, 1]);

        let mut slice = SketchSlice::new(&bytes);
        assert_eq!(slice.read_u8().unwrap(), 7);
        assert_eq!(slice.read_u32_le().unwrap(), 0x01020304);
        assert_eq!(slice.remaining(), 8);
        assert_eq!(slice.read_u64_le().unwrap(), 1);
        assert!(slice.read_u8().is_err());
    }

    #[test]
    fn wide_values_span_two_longs() {
        let mut bytes = SketchBytes::with_capacity(16);
        bytes.write_u128_le((1 << 64) + 13);
        let bytes = bytes.into_bytes();
        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes[0], 13);
        assert_eq!(bytes[8], 1);

        let mut slice = SketchSlice::new(&bytes);
        assert_eq!(slice.read_u128_le().unwrap(), (1 << 64) + 13);
        assert_eq!(slice.remaining(), 0);
    }
}
