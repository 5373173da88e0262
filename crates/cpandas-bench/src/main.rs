//! Benchmark CLI (§6): generates a left/right frame pair of a requested size
//! and a configurable key match-rate, then times each join strategy.
//!
//! Grounded on the example pack's single-binary CSV tool
//! (`faradayio-scrubcsv/src/main.rs`) for overall shape — `clap` derive
//! instead of that crate's `structopt`, `env_logger` initialized from
//! `RUST_LOG` the same way.

use std::process;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use cpandas_core::join::{join, How, Strategy};
use cpandas_core::series::Series;
use cpandas_core::{CpResult, Frame};
use log::debug;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Auto,
    Nested,
    Hash,
    Sorted,
    All,
}

impl std::fmt::Display for StrategyArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StrategyArg::Auto => "auto",
            StrategyArg::Nested => "nested",
            StrategyArg::Hash => "hash",
            StrategyArg::Sorted => "sorted",
            StrategyArg::All => "all",
        };
        f.write_str(s)
    }
}

/// Benchmark cpandas join strategies on generated data.
#[derive(Debug, Parser)]
#[command(name = "cpandas-bench", about = "Time cpandas join strategies on generated frames")]
struct Opt {
    /// Number of rows in each generated frame.
    rows: usize,

    /// Run an inner join between the generated frames (this is currently the only benchmarked operation).
    #[arg(long)]
    join: bool,

    /// Which join strategy to time, or "all" to time every strategy in turn.
    #[arg(long, value_enum, default_value_t = StrategyArg::All)]
    strategy: StrategyArg,

    /// Fraction of left-side keys expected to find a match on the right, in [0, 1].
    #[arg(long, default_value_t = 0.5)]
    match_rate: f64,
}

fn generate_frame(name_suffix: &str, rows: usize, match_rate: f64, seed: u64) -> CpResult<Frame> {
    let mut rng = cpandas_core::stats::SplitMix64::new(seed);
    let mut ids = Vec::with_capacity(rows);
    for i in 0..rows {
        let matches = (rng.next_u64() as f64 / u64::MAX as f64) < match_rate;
        // Matching keys land in the shared `0..rows*match_rate` band; non-matching
        // keys are pushed into a disjoint band so the two sides only overlap
        // by roughly `match_rate`.
        let id = if matches { (i as u64) % rows.max(1) as u64 } else { rows as u64 + i as u64 };
        ids.push(id as i64);
    }
    let id_col = Series::from_i64("id", ids, vec![true; rows])?;
    let payload: Vec<String> = (0..rows).map(|i| format!("{name_suffix}{i}")).collect();
    let payload_col = Series::from_text(format!("payload{name_suffix}"), payload, vec![true; rows])?;
    Frame::from_series(vec![id_col, payload_col])
}

fn time_strategy(left: &Frame, right: &Frame, strategy: Strategy) -> CpResult<(Strategy, std::time::Duration, usize)> {
    let start = Instant::now();
    let out = join(left, right, &["id"], &["id"], How::Inner, strategy)?;
    Ok((strategy, start.elapsed(), out.nrows()))
}

fn strategies_to_run(arg: StrategyArg) -> Vec<Strategy> {
    match arg {
        StrategyArg::Auto => vec![Strategy::Auto],
        StrategyArg::Nested => vec![Strategy::Nested],
        StrategyArg::Hash => vec![Strategy::Hash],
        StrategyArg::Sorted => vec![Strategy::Sorted],
        StrategyArg::All => vec![Strategy::Nested, Strategy::Hash, Strategy::Sorted],
    }
}

fn run() -> CpResult<()> {
    env_logger::init();
    let opt = Opt::parse();
    debug!("options: {:?} rows, match_rate={}", opt.rows, opt.match_rate);

    if !opt.join {
        eprintln!("nothing to do: pass --join to benchmark the relational join kernel");
        return Ok(());
    }

    let left = generate_frame("_l", opt.rows, opt.match_rate, 0x5EED_0000_0000_0001);
    let right = generate_frame("_r", opt.rows, opt.match_rate, 0x5EED_0000_0000_0002);
    let (left, right) = (left?, right?);

    for strategy in strategies_to_run(opt.strategy) {
        let (strategy, elapsed, matched_rows) = time_strategy(&left, &right, strategy)?;
        println!("{strategy:?}: {:.3}ms, {matched_rows} matched rows", elapsed.as_secs_f64() * 1000.0);
    }

    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("ERROR: {err}");
        process::exit(1);
    }
}
