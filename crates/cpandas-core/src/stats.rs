//! Frame-level statistics and utilities (§4.9/§4.10): corr/cov,
//! nlargest/nsmallest, sample, unique/value_counts/duplicated, describe.

use hashbrown::HashMap;

use crate::cp_ensure;
use crate::error::CpResult;
use crate::frame::Frame;
use crate::keys::CellKey;
use crate::series::{float_cmp_nan_greatest, Series};
use crate::value::{Kind, Scalar};

fn numeric_columns(frame: &Frame) -> Vec<&Series> {
    frame.columns_slice().iter().filter(|c| c.kind() != Kind::Text).collect()
}

fn paired_values(a: &Series, b: &Series) -> Vec<(f64, f64)> {
    (0..a.len())
        .filter_map(|i| {
            let x = match a.kind() {
                Kind::Int64 => a.get_i64(i).ok()?.map(|v| v as f64),
                Kind::Float64 => a.get_f64(i).ok()?,
                Kind::Text => None,
            }?;
            let y = match b.kind() {
                Kind::Int64 => b.get_i64(i).ok()?.map(|v| v as f64),
                Kind::Float64 => b.get_f64(i).ok()?,
                Kind::Text => None,
            }?;
            Some((x, y))
        })
        .collect()
}

fn sample_cov(xy: &[(f64, f64)]) -> Option<f64> {
    if xy.len() < 2 {
        return None;
    }
    let n = xy.len() as f64;
    let mx = xy.iter().map(|(x, _)| x).sum::<f64>() / n;
    let my = xy.iter().map(|(_, y)| y).sum::<f64>() / n;
    Some(xy.iter().map(|(x, y)| (x - mx) * (y - my)).sum::<f64>() / (n - 1.0))
}

fn sample_std(xy: &[(f64, f64)], pick: impl Fn(&(f64, f64)) -> f64) -> Option<f64> {
    if xy.len() < 2 {
        return None;
    }
    let n = xy.len() as f64;
    let mean = xy.iter().map(&pick).sum::<f64>() / n;
    let var = xy.iter().map(|p| (pick(p) - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(var.sqrt())
}

/// Pairwise sample covariance matrix over numeric columns.
pub fn cov(frame: &Frame) -> CpResult<Frame> {
    matrix(frame, |xy, _, _| sample_cov(xy))
}

/// Pairwise sample correlation matrix (Pearson) over numeric columns.
pub fn corr(frame: &Frame) -> CpResult<Frame> {
    matrix(frame, |xy, sx, sy| match (sample_cov(xy), sx, sy) {
        (Some(c), Some(sx), Some(sy)) if sx > 0.0 && sy > 0.0 => Some(c / (sx * sy)),
        _ => None,
    })
}

fn matrix(frame: &Frame, f: impl Fn(&[(f64, f64)], Option<f64>, Option<f64>) -> Option<f64>) -> CpResult<Frame> {
    let cols = numeric_columns(frame);
    let mut label_col = Series::new("column", Kind::Text, cols.len());
    for c in &cols {
        label_col.push_scalar(&Scalar::Text(c.name().to_string()))?;
    }
    let mut out = vec![label_col];
    for b in &cols {
        let mut col = Series::new(b.name(), Kind::Float64, cols.len());
        for a in &cols {
            let xy = paired_values(a, b);
            let sx = sample_std(&xy, |p| p.0);
            let sy = sample_std(&xy, |p| p.1);
            match f(&xy, sx, sy) {
                Some(v) => col.push_scalar(&Scalar::Float64(v))?,
                None => col.push_null(),
            }
        }
        out.push(col);
    }
    Frame::from_series(out)
}

/// Selects the `k` rows with the largest (or smallest, `largest = false`)
/// non-null values of `name`, ties broken by original row order.
pub fn nlargest(frame: &Frame, name: &str, k: usize) -> CpResult<Frame> {
    select_extreme(frame, name, k, true)
}

pub fn nsmallest(frame: &Frame, name: &str, k: usize) -> CpResult<Frame> {
    select_extreme(frame, name, k, false)
}

fn select_extreme(frame: &Frame, name: &str, k: usize, largest: bool) -> CpResult<Frame> {
    let col = frame.column(name)?;
    cp_ensure!(col.kind() != Kind::Text, Invalid: "nlargest/nsmallest is not defined for Text column '{}'", name);

    let mut rows: Vec<usize> = (0..frame.nrows()).filter(|&i| !col.is_null(i)).collect();
    let value = |i: usize| -> f64 {
        match col.kind() {
            Kind::Int64 => col.get_i64(i).unwrap().unwrap() as f64,
            Kind::Float64 => col.get_f64(i).unwrap().unwrap(),
            Kind::Text => unreachable!(),
        }
    };
    rows.sort_by(|&a, &b| {
        let ord = float_cmp_nan_greatest(value(a), value(b));
        if largest { ord.reverse() } else { ord }
    });
    rows.truncate(k);
    frame.iloc(&rows, &(0..frame.ncols()).collect::<Vec<_>>())
}

/// Deterministic splitmix64 generator (§9: any sequence is conformant given
/// the same seed — tests must assert membership/size, not specific indices).
pub struct SplitMix64(u64);

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        SplitMix64(seed)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E3779B97F4A7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }

    /// Uniform integer in `[0, bound)`.
    fn below(&mut self, bound: usize) -> usize {
        (self.next_u64() % bound as u64) as usize
    }
}

pub fn sample(frame: &Frame, k: usize, with_replacement: bool, seed: u64) -> CpResult<Frame> {
    let mut rng = SplitMix64::new(seed);
    let nrows = frame.nrows();
    let all_cols: Vec<usize> = (0..frame.ncols()).collect();

    if with_replacement {
        let rows: Vec<usize> = if nrows == 0 { Vec::new() } else { (0..k).map(|_| rng.below(nrows)).collect() };
        return frame.iloc(&rows, &all_cols);
    }

    cp_ensure!(k <= nrows, Invalid: "sample without replacement requires k <= nrows ({} > {})", k, nrows);
    // Fisher-Yates partial shuffle.
    let mut pool: Vec<usize> = (0..nrows).collect();
    for i in 0..k {
        let j = i + rng.below(nrows - i);
        pool.swap(i, j);
    }
    pool.truncate(k);
    frame.iloc(&pool, &all_cols)
}

/// First-appearance order of distinct values in `name`; nulls form a single
/// bucket treated as a distinct value.
pub fn value_counts(frame: &Frame, name: &str) -> CpResult<Frame> {
    let col = frame.column(name)?;
    let mut order: Vec<Option<CellKey>> = Vec::new();
    let mut index: HashMap<Option<CellKey>, usize> = HashMap::new();
    let mut scalars: Vec<Scalar> = Vec::new();
    let mut counts: Vec<i64> = Vec::new();

    for i in 0..col.len() {
        let key = col.cell_key(i);
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            scalars.push(col.get(i).expect("row in range"));
            counts.push(0);
            order.len() - 1
        });
        counts[slot] += 1;
    }

    let mut value_col = Series::new(name, col.kind(), scalars.len());
    for s in &scalars {
        value_col.push_scalar(s)?;
    }
    let mut count_col = Series::new("count", Kind::Int64, counts.len());
    for c in &counts {
        count_col.push_scalar(&Scalar::Int64(*c))?;
    }
    Frame::from_series(vec![value_col, count_col])
}

pub fn unique(frame: &Frame, name: &str) -> CpResult<Series> {
    Ok(value_counts(frame, name)?.column(name)?.clone())
}

pub fn nunique(frame: &Frame, name: &str) -> CpResult<usize> {
    Ok(value_counts(frame, name)?.nrows())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keep {
    First,
    Last,
    None,
}

/// Marks duplicate rows of `name` per `keep` (nulls are a single bucket, like `value_counts`).
pub fn duplicated(frame: &Frame, name: &str, keep: Keep) -> CpResult<Vec<bool>> {
    let col = frame.column(name)?;
    let mut positions: HashMap<Option<CellKey>, Vec<usize>> = HashMap::new();
    for i in 0..col.len() {
        positions.entry(col.cell_key(i)).or_default().push(i);
    }

    let mut mask = vec![false; col.len()];
    for idxs in positions.values() {
        if idxs.len() < 2 {
            continue;
        }
        match keep {
            Keep::First => idxs[1..].iter().for_each(|&i| mask[i] = true),
            Keep::Last => idxs[..idxs.len() - 1].iter().for_each(|&i| mask[i] = true),
            Keep::None => idxs.iter().for_each(|&i| mask[i] = true),
        }
    }
    Ok(mask)
}

pub fn rank(frame: &Frame, name: &str) -> CpResult<Series> {
    frame.column(name)?.rank()
}

pub fn diff(frame: &Frame, name: &str) -> CpResult<Series> {
    frame.column(name)?.diff()
}

pub fn to_numeric(frame: &Frame, name: &str) -> CpResult<Series> {
    frame.column(name)?.to_numeric()
}

pub fn to_datetime(frame: &Frame, name: &str) -> CpResult<Series> {
    frame.column(name)?.to_datetime()
}

pub fn astype(frame: &Frame, name: &str, kind: Kind) -> CpResult<Series> {
    frame.column(name)?.astype(kind)
}

/// `Rows: N`, `Columns: M`, then one `[i] name (kind) non-null: K` line per column.
pub fn info(frame: &Frame, sink: &mut impl std::fmt::Write) -> std::fmt::Result {
    writeln!(sink, "Rows: {}", frame.nrows())?;
    writeln!(sink, "Columns: {}", frame.ncols())?;
    for (i, col) in frame.columns_slice().iter().enumerate() {
        writeln!(sink, "[{i}] {} ({}) non-null: {}", col.name(), col.kind(), col.count())?;
    }
    Ok(())
}

/// A 4-row frame over numeric columns: `count`, `mean`, `min`, `max`.
pub fn describe(frame: &Frame) -> CpResult<Frame> {
    let cols = numeric_columns(frame);
    let mut label = Series::new("stat", Kind::Text, 4);
    for s in ["count", "mean", "min", "max"] {
        label.push_scalar(&Scalar::Text(s.to_string()))?;
    }
    let mut out = vec![label];
    for c in &cols {
        let mut col = Series::new(c.name(), Kind::Float64, 4);
        col.push_scalar(&Scalar::Float64(c.count() as f64))?;
        for v in [c.mean(), c.min().map(scalar_to_f64), c.max().map(scalar_to_f64)] {
            match v {
                Ok(v) => col.push_scalar(&Scalar::Float64(v))?,
                Err(_) => col.push_null(),
            }
        }
        out.push(col);
    }
    Frame::from_series(out)
}

fn scalar_to_f64(s: Scalar) -> f64 {
    match s {
        Scalar::Int64(v) => v as f64,
        Scalar::Float64(v) => v,
        _ => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Series;

    fn numeric_frame() -> Frame {
        Frame::from_series(vec![
            Series::from_i64("a", vec![1, 2, 3, 4], vec![true; 4]).unwrap(),
            Series::from_f64("b", vec![4.0, 3.0, 2.0, 1.0], vec![true; 4]).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn corr_of_perfectly_inverse_columns_is_minus_one() {
        let f = numeric_frame();
        let c = corr(&f).unwrap();
        let row_b = c.column("b").unwrap();
        // row 0 is 'a' vs 'b'
        assert!((row_b.get_f64(0).unwrap().unwrap() + 1.0).abs() < 1e-9);
    }

    #[test]
    fn nlargest_breaks_ties_by_original_order() {
        let f = Frame::from_series(vec![Series::from_i64("x", vec![5, 5, 1, 9], vec![true; 4]).unwrap()]).unwrap();
        let top2 = nlargest(&f, "x", 2).unwrap();
        let vals: Vec<_> = (0..2).map(|i| top2.column("x").unwrap().get_i64(i).unwrap()).collect();
        assert_eq!(vals, vec![Some(9), Some(5)]);
    }

    #[test]
    fn sample_without_replacement_rejects_oversized_k() {
        let f = Frame::from_series(vec![Series::from_i64("x", vec![1, 2], vec![true, true]).unwrap()]).unwrap();
        assert!(sample(&f, 3, false, 42).is_err());
        let s = sample(&f, 2, false, 42).unwrap();
        assert_eq!(s.nrows(), 2);
    }

    #[test]
    fn value_counts_buckets_nulls_together() {
        let f = Frame::from_series(vec![Series::from_i64("x", vec![1, 0, 1, 0], vec![true, false, true, false]).unwrap()]).unwrap();
        let vc = value_counts(&f, "x").unwrap();
        assert_eq!(vc.nrows(), 2);
        assert_eq!(vc.column("count").unwrap().get_i64(0).unwrap(), Some(2));
        assert_eq!(vc.column("count").unwrap().get_i64(1).unwrap(), Some(2));
    }

    #[test]
    fn duplicated_keep_first() {
        let f = Frame::from_series(vec![Series::from_i64("x", vec![1, 1, 2, 1], vec![true; 4]).unwrap()]).unwrap();
        let mask = duplicated(&f, "x", Keep::First).unwrap();
        assert_eq!(mask, vec![false, true, false, true]);
    }
}
