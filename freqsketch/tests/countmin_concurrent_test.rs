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

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;

use freqsketch::countmin::CountMinSketch;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

const THREADS: u64 = 8;

fn stream(seed: u64, len: usize) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(0..2_000)).collect()
}

#[test]
fn test_parallel_updates_match_sequential() {
    let concurrent = CountMinSketch::builder()
        .dimensions(512, 4)
        .seed(31)
        .build_concurrent()
        .unwrap();
    let mut sequential = CountMinSketch::builder()
        .dimensions(512, 4)
        .seed(31)
        .build()
        .unwrap();

    let chunks: Vec<Vec<u64>> = (0..THREADS).map(|t| stream(t, 5_000)).collect();
    thread::scope(|s| {
        for chunk in &chunks {
            let sketch = &concurrent;
            s.spawn(move || sketch.ingest(chunk));
        }
    });
    for chunk in &chunks {
        sequential.ingest(chunk);
    }

    assert_eq!(concurrent.total(), THREADS * 5_000);
    for key in 0..2_000u64 {
        assert_eq!(concurrent.estimate(key), sequential.estimate(key));
    }
    assert_eq!(concurrent.into_sketch(), sequential);
}

#[test]
fn test_queries_during_updates_never_decrease() {
    const HOT: u64 = 4_242;
    const PER_WRITER: u64 = 20_000;

    let sketch = CountMinSketch::builder()
        .dimensions(128, 4)
        .seed(8)
        .build_concurrent()
        .unwrap();
    let done = AtomicBool::new(false);

    thread::scope(|s| {
        let writers: Vec<_> = (0..4u64)
            .map(|w| {
                let sketch = &sketch;
                s.spawn(move || {
                    let mut rng = StdRng::seed_from_u64(w);
                    for _ in 0..PER_WRITER {
                        sketch.update(HOT);
                        sketch.update(rng.gen_range(0..1_000u64));
                    }
                })
            })
            .collect();

        let reader = s.spawn(|| {
            let mut last = 0;
            let mut observations = 0u64;
            while !done.load(Ordering::Acquire) {
                let current = sketch.estimate(HOT);
                assert!(current >= last, "estimate went from {last} to {current}");
                last = current;
                observations += 1;
            }
            observations
        });

        for writer in writers {
            writer.join().unwrap();
        }
        done.store(true, Ordering::Release);
        assert!(reader.join().unwrap() > 0);
    });

    assert!(sketch.estimate(HOT) >= 4 * PER_WRITER);
    assert_eq!(sketch.total(), 8 * PER_WRITER);
}

#[test]
fn test_snapshot_is_independent() {
    let sketch = CountMinSketch::builder()
        .dimensions(64, 3)
        .seed(2)
        .build_concurrent()
        .unwrap();
    sketch.ingest([1u64, 1, 2]);

    let snapshot = sketch.snapshot();
    sketch.update(1u64);

    assert_eq!(snapshot.total(), 3);
    assert!(snapshot.estimate(1u64) >= 2);
    assert!(sketch.estimate(1u64) >= 3);
    assert_eq!(snapshot.hash_family(), sketch.hash_family());
    assert_eq!(snapshot.seed(), Some(2));
}
