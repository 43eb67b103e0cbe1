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

//! Builds a Count-Min sketch from a stream file and reports its accuracy
//! against exact counts, or measures how often the additive bound fails
//! across independently seeded sketches.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use clap::Subcommand;
use freqsketch::analysis::ErrorAnalyzer;
use freqsketch::analysis::ErrorSummary;
use freqsketch::countmin::CountMinSketch;
use freqsketch::countmin::FrequencyEstimator;
use freqsketch::hash::DEFAULT_PRIME;
use freqsketch::input::read_ground_truth;
use freqsketch::input::read_hash_params;
use freqsketch::input::read_stream;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cms_report")]
#[command(version, about, long_about = None)]
struct Args {
    /// Log filter used when `RUST_LOG` is unset, e.g. `freqsketch=debug`
    #[arg(long, default_value = "info", global = true)]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sketch a stream file and write per-identifier relative errors
    Report(ReportArgs),
    /// Measure the empirical failure rate of the additive error bound
    Trials(TrialsArgs),
}

#[derive(clap::Args, Debug)]
struct ReportArgs {
    /// Stream file, one identifier per line
    #[arg(long)]
    stream: PathBuf,

    /// Exact counts, one `id<TAB>count` pair per line
    #[arg(long)]
    counts: PathBuf,

    /// Hash coefficients, one `a<TAB>b` pair per row
    #[arg(long)]
    params: Option<PathBuf>,

    /// Output file for the TSV report (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Counters per row
    #[arg(long, default_value = "10000")]
    width: usize,

    /// Number of rows
    #[arg(long, default_value = "5")]
    depth: usize,

    /// Prime modulus of the hash family
    #[arg(long, default_value_t = DEFAULT_PRIME)]
    prime: u128,

    /// Largest identifier in the stream; required when the prime is below 2^64
    #[arg(long)]
    max_key: Option<u64>,

    /// Seed for the hash coefficients; a fresh one is drawn if omitted
    #[arg(long, conflicts_with = "params")]
    seed: Option<u64>,

    /// Also summarize identifiers whose exact count is at least this
    #[arg(long)]
    heavy: Option<u64>,
}

#[derive(clap::Args, Debug)]
struct TrialsArgs {
    /// Target additive error as a fraction of the stream length
    #[arg(long, default_value = "0.01")]
    epsilon: f64,

    /// Target failure probability
    #[arg(long, default_value = "0.05")]
    delta: f64,

    /// Number of independently seeded sketches
    #[arg(long, default_value = "100")]
    trials: usize,

    /// Distinct identifiers in the synthetic stream
    #[arg(long, default_value = "2000")]
    items: u64,

    /// Occurrences of the most frequent identifier
    #[arg(long, default_value = "5000")]
    head: u64,

    /// Most frequent identifiers checked in each trial
    #[arg(long, default_value = "50")]
    queries: u64,

    /// Update threads; more than one uses the concurrent sketch
    #[arg(long, default_value = "1")]
    threads: usize,

    /// Seed for the stream order and the per-trial seeds
    #[arg(long, default_value = "0")]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&args.log)
            .with_context(|| format!("invalid log filter: {}", args.log))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Command::Report(args) => report(args),
        Command::Trials(args) => trials(args),
    }
}

fn report(args: ReportArgs) -> anyhow::Result<()> {
    let mut builder = CountMinSketch::builder()
        .dimensions(args.width, args.depth)
        .prime(args.prime);
    if let Some(max_key) = args.max_key {
        builder = builder.key_domain(max_key);
    }
    if let Some(path) = &args.params {
        let params = read_hash_params(open(path)?)
            .with_context(|| format!("failed to read hash parameters from {}", path.display()))?;
        builder = builder.hash_params(params);
    } else if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }
    let mut sketch = builder.build()?;

    let start = Instant::now();
    let items = sketch
        .try_ingest(read_stream(open(&args.stream)?))
        .with_context(|| format!("failed to read stream from {}", args.stream.display()))?;
    info!(items, elapsed = ?start.elapsed(), "ingested stream");

    let truth = read_ground_truth(open(&args.counts)?)
        .with_context(|| format!("failed to read counts from {}", args.counts.display()))?;
    let report = ErrorAnalyzer::new(&truth, sketch.total()).analyze_ground_truth(&sketch);

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut out = BufWriter::new(file);
            report.write_tsv(&mut out)?;
            out.flush()?;
        }
        None => report.write_tsv(std::io::stdout().lock())?,
    }

    log_summary("all identifiers", &report.summary());
    if let Some(heavy) = args.heavy {
        log_summary(
            "heavy hitters",
            &report.summary_where(|item| item.true_count() >= heavy),
        );
    }
    let exceeding = report.count_exceeding(sketch.error_bound());
    info!(
        bound = sketch.error_bound(),
        exceeding,
        delta = sketch.delta(),
        "additive error bound"
    );
    Ok(())
}

fn trials(args: TrialsArgs) -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(args.seed);
    let stream = skewed_stream(args.items, args.head, &mut rng);
    let mut truth: HashMap<u64, u64> = HashMap::new();
    for &item in &stream {
        *truth.entry(item).or_default() += 1;
    }
    let total = stream.len() as u64;
    let bound = args.epsilon * total as f64;
    info!(total, distinct = truth.len(), bound, "generated stream");

    let analyzer = ErrorAnalyzer::new(&truth, total);
    let mut failures = 0;
    let mut evaluations = 0;
    for trial in 0..args.trials {
        let builder = CountMinSketch::builder()
            .accuracy(args.epsilon, args.delta)
            .seed(rng.r#gen());
        let report = if args.threads > 1 {
            let sketch = builder.build_concurrent()?;
            let chunk = stream.len().div_ceil(args.threads).max(1);
            thread::scope(|s| {
                for part in stream.chunks(chunk) {
                    let sketch = &sketch;
                    s.spawn(move || sketch.ingest(part));
                }
            });
            analyze_top(&analyzer, &sketch, args.queries)
        } else {
            let mut sketch = builder.build()?;
            sketch.ingest(&stream);
            analyze_top(&analyzer, &sketch, args.queries)
        };
        let failed = report.count_exceeding(bound);
        tracing::debug!(trial, failed, "finished trial");
        failures += failed;
        evaluations += report.len();
    }

    let rate = failures as f64 / evaluations.max(1) as f64;
    println!("trials\tevaluations\tfailures\trate\tdelta");
    println!(
        "{}\t{evaluations}\t{failures}\t{rate}\t{}",
        args.trials, args.delta
    );
    if rate > args.delta {
        warn!(rate, delta = args.delta, "failure rate exceeds delta");
    }
    Ok(())
}

/// Item `i` occurs `head / i` times, in random order.
fn skewed_stream(items: u64, head: u64, rng: &mut impl Rng) -> Vec<u64> {
    let mut stream: Vec<u64> = (1..=items)
        .flat_map(|item| std::iter::repeat_n(item, (head / item) as usize))
        .collect();
    stream.shuffle(rng);
    stream
}

fn analyze_top<E: FrequencyEstimator>(
    analyzer: &ErrorAnalyzer<'_>,
    sketch: &E,
    queries: u64,
) -> freqsketch::analysis::ErrorReport {
    analyzer.analyze(sketch, 1..=queries)
}

fn log_summary(label: &str, summary: &ErrorSummary) {
    info!(
        label,
        evaluated = summary.evaluated(),
        unknown = summary.unknown(),
        mean = summary.mean_relative_error(),
        median = summary.median_relative_error(),
        max = summary.max_relative_error(),
        above_unity = summary.above_unity(),
        "relative error summary"
    );
}

fn open(path: &Path) -> anyhow::Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    Ok(BufReader::new(file))
}
