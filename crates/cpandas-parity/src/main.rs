//! Parity harness (§6): loads `inputs/basic.csv`, runs a fixed battery of
//! core operations, and diffs each result against a recorded
//! `expected/<name>.json` fixture (the schema `cpandas_io::json::read_json_frame`
//! reads). Mirrors the teacher's own `polars-io` parity tests, which build a
//! `Schema` and compare field-by-field rather than asserting on raw bytes.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use cpandas_core::error::CpResult;
use cpandas_core::frame::Frame;
use cpandas_core::value::{Kind, Scalar};
use cpandas_core::{groupby, sort, stats};
use cpandas_io::csv::{read_csv, CsvReadOptions};
use cpandas_io::json::read_json_frame;

/// Compares cpandas operation output against recorded JSON fixtures.
#[derive(Debug, Parser)]
#[command(name = "cpandas-parity", about = "Diff cpandas operations against recorded expected frames")]
struct Opt {
    /// Directory containing `inputs/basic.csv` and `expected/*.json`.
    dir: PathBuf,
}

const BASIC_KINDS: [Kind; 3] = [Kind::Int64, Kind::Float64, Kind::Text];
const CHECKS: &[&str] = &["head", "tail", "sort", "groupby", "describe", "dropna"];

fn load_basic(dir: &PathBuf) -> CpResult<Frame> {
    let text = fs::read_to_string(dir.join("inputs/basic.csv"))?;
    read_csv(&text, &BASIC_KINDS, &CsvReadOptions::default())
}

fn scalars_equal(a: &Scalar, b: &Scalar) -> bool {
    match (a, b) {
        (Scalar::Float64(x), Scalar::Float64(y)) if x.is_nan() && y.is_nan() => true,
        (Scalar::Float64(x), Scalar::Float64(y)) => (x - y).abs() <= 1e-9 * x.abs().max(y.abs()).max(1.0),
        _ => a == b,
    }
}

/// Returns the list of human-readable mismatch descriptions, empty when the
/// frames agree cell-by-cell (column order and names included).
fn diff_frames(name: &str, actual: &Frame, expected: &Frame) -> Vec<String> {
    let mut problems = Vec::new();
    if actual.columns() != expected.columns() {
        problems.push(format!("{name}: column names differ: {:?} vs {:?}", actual.columns(), expected.columns()));
        return problems;
    }
    if actual.nrows() != expected.nrows() {
        problems.push(format!("{name}: row count differs: {} vs {}", actual.nrows(), expected.nrows()));
        return problems;
    }
    for col_name in actual.columns() {
        let a_col = actual.column(col_name).expect("column just listed by name");
        let e_col = expected.column(col_name).expect("column just listed by name");
        for row in 0..actual.nrows() {
            let a_val = a_col.get(row).expect("row within bounds");
            let e_val = e_col.get(row).expect("row within bounds");
            if !scalars_equal(&a_val, &e_val) {
                problems.push(format!("{name}: row {row} col '{col_name}': got {a_val:?}, expected {e_val:?}"));
            }
        }
    }
    problems
}

fn check(dir: &PathBuf, name: &str, actual: CpResult<Frame>, problems: &mut Vec<String>) {
    let expected_path = dir.join("expected").join(format!("{name}.json"));
    let expected_text = match fs::read_to_string(&expected_path) {
        Ok(t) => t,
        Err(e) => {
            problems.push(format!("{name}: cannot read {}: {e}", expected_path.display()));
            return;
        },
    };
    let expected = match read_json_frame(&expected_text) {
        Ok(f) => f,
        Err(e) => {
            problems.push(format!("{name}: invalid expected JSON: {e}"));
            return;
        },
    };
    let actual = match actual {
        Ok(f) => f,
        Err(e) => {
            problems.push(format!("{name}: operation failed: {e}"));
            return;
        },
    };
    problems.extend(diff_frames(name, &actual, &expected));
}

fn run() -> CpResult<i32> {
    env_logger::init();
    let opt = Opt::parse();
    let basic = load_basic(&opt.dir)?;

    let mut problems = Vec::new();
    check(&opt.dir, "head", Ok(basic.head(2)), &mut problems);
    check(&opt.dir, "tail", Ok(basic.tail(2)), &mut problems);
    check(&opt.dir, "sort", sort::sort_values(&basic, "score", true), &mut problems);
    check(&opt.dir, "groupby", groupby::groupby_agg(&basic, "name", &["score"], &[groupby::AggOp::Sum]), &mut problems);
    check(&opt.dir, "describe", stats::describe(&basic), &mut problems);
    check(&opt.dir, "dropna", basic.dropna(), &mut problems);

    if problems.is_empty() {
        println!("parity ok: {} checks passed", CHECKS.len());
        Ok(0)
    } else {
        for p in &problems {
            eprintln!("MISMATCH: {p}");
        }
        Ok(1)
    }
}

fn main() {
    match run() {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("ERROR: {err}");
            process::exit(1);
        },
    }
}
