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

//! Readers for the plain-text stream, ground-truth and coefficient formats.
//!
//! - stream: one non-negative integer identifier per line;
//! - ground truth: `id<TAB>count` per line;
//! - hash parameters: `a<TAB>b` per line, one line per row.
//!
//! Blank lines are skipped everywhere; any whitespace separates fields.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::io::BufRead;
use std::io::Lines;
use std::str::FromStr;

use crate::error::Error;
use crate::hash::RowHash;

/// Lazily parses a newline-delimited stream of identifiers.
///
/// # Examples
///
/// ```
/// use freqsketch::countmin::CountMinSketch;
/// use freqsketch::input::read_stream;
///
/// let mut sketch = CountMinSketch::builder().dimensions(64, 3).seed(0).build().unwrap();
/// let n = sketch.try_ingest(read_stream("5\n5\n\n7\n".as_bytes())).unwrap();
/// assert_eq!(n, 3);
/// ```
pub fn read_stream<R: BufRead>(reader: R) -> StreamReader<R> {
    StreamReader {
        lines: reader.lines(),
        line: 0,
    }
}

/// Iterator returned by [`read_stream`].
///
/// Yields one `Result` per identifier; the caller decides whether to stop
/// at the first malformed line.
#[derive(Debug)]
pub struct StreamReader<R> {
    lines: Lines<R>,
    line: usize,
}

impl<R: BufRead> Iterator for StreamReader<R> {
    type Item = Result<u64, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let text = self.lines.next()?;
            self.line += 1;
            let text = match text {
                Ok(text) => text,
                Err(err) => {
                    return Some(Err(
                        Error::io("failed to read line", err).with_context("line", self.line)
                    ));
                }
            };
            let item = text.trim();
            if item.is_empty() {
                tracing::trace!(line = self.line, "skipping blank stream line");
                continue;
            }
            return Some(parse(self.line, item, "item identifier"));
        }
    }
}

/// Reads exact counts, one `id<TAB>count` pair per line.
///
/// # Errors
///
/// Returns [`ErrorKind::InvalidInput`](crate::error::ErrorKind::InvalidInput)
/// on malformed lines and on duplicate identifiers, and
/// [`ErrorKind::Io`](crate::error::ErrorKind::Io) if the reader fails.
pub fn read_ground_truth<R: BufRead>(reader: R) -> Result<HashMap<u64, u64>, Error> {
    let mut counts = HashMap::new();
    for_each_pair(reader, "identifier", "count", |line, id: u64, count: u64| {
        match counts.entry(id) {
            Entry::Vacant(entry) => {
                entry.insert(count);
                Ok(())
            }
            Entry::Occupied(_) => Err(Error::invalid_input(line, "duplicate identifier")
                .with_context("id", id)),
        }
    })?;
    Ok(counts)
}

/// Reads hash coefficients, one `a<TAB>b` pair per line.
///
/// The pairs are validated when the hash family is built.
///
/// # Errors
///
/// Returns [`ErrorKind::InvalidInput`](crate::error::ErrorKind::InvalidInput)
/// on malformed lines and [`ErrorKind::Io`](crate::error::ErrorKind::Io) if
/// the reader fails.
pub fn read_hash_params<R: BufRead>(reader: R) -> Result<Vec<RowHash>, Error> {
    let mut params = Vec::new();
    for_each_pair(reader, "coefficient a", "coefficient b", |_, a: u128, b: u128| {
        params.push(RowHash::new(a, b));
        Ok(())
    })?;
    Ok(params)
}

fn for_each_pair<R, T, F>(reader: R, first: &str, second: &str, mut f: F) -> Result<(), Error>
where
    R: BufRead,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: FnMut(usize, T, T) -> Result<(), Error>,
{
    for (idx, text) in reader.lines().enumerate() {
        let line = idx + 1;
        let text = text
            .map_err(|err| Error::io("failed to read line", err).with_context("line", line))?;
        let mut fields = text.split_whitespace();
        let (Some(x), Some(y)) = (fields.next(), fields.next()) else {
            if text.trim().is_empty() {
                continue;
            }
            return Err(Error::invalid_input(line, "expected two fields"));
        };
        if fields.next().is_some() {
            return Err(Error::invalid_input(line, "expected two fields"));
        }
        f(line, parse(line, x, first)?, parse(line, y, second)?)?;
    }
    Ok(())
}

fn parse<T>(line: usize, text: &str, what: &str) -> Result<T, Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    text.parse::<T>().map_err(|err| {
        Error::invalid_input(line, format!("invalid {what}: {text:?}")).set_source(err)
    })
}
