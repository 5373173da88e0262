//! Group-by with per-column aggregation (§4.8). Group order is
//! first-appearance order of the key; null-key rows are excluded.

use hashbrown::HashMap;

use crate::error::CpResult;
use crate::{cp_bail, cp_ensure};
use crate::frame::Frame;
use crate::keys::CellKey;
use crate::series::{float_cmp_nan_greatest, Series};
use crate::value::{Kind, Scalar};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggOp {
    Sum,
    Mean,
    Min,
    Max,
    Count,
}

impl AggOp {
    fn name(&self) -> &'static str {
        match self {
            AggOp::Sum => "sum",
            AggOp::Mean => "mean",
            AggOp::Min => "min",
            AggOp::Max => "max",
            AggOp::Count => "count",
        }
    }

    pub(crate) fn output_kind(&self, in_kind: Kind) -> CpResult<Kind> {
        Ok(match (self, in_kind) {
            (AggOp::Count, _) => Kind::Int64,
            (AggOp::Sum, Kind::Int64) => Kind::Int64,
            (AggOp::Sum, Kind::Float64) => Kind::Float64,
            (AggOp::Sum, Kind::Text) => cp_bail!(Invalid: "sum is not defined for Text columns"),
            (AggOp::Mean, Kind::Int64) | (AggOp::Mean, Kind::Float64) => Kind::Float64,
            (AggOp::Mean, Kind::Text) => cp_bail!(Invalid: "mean is not defined for Text columns"),
            (AggOp::Min, Kind::Int64) | (AggOp::Max, Kind::Int64) => Kind::Int64,
            (AggOp::Min, Kind::Float64) | (AggOp::Max, Kind::Float64) => Kind::Float64,
            (AggOp::Min, Kind::Text) | (AggOp::Max, Kind::Text) => Kind::Text,
        })
    }
}

/// Accumulates one `(value_col, op)` pair across the rows of a single group.
pub(crate) struct Accumulator {
    op: AggOp,
    in_kind: Kind,
    any_nonnull: bool,
    sum_i: i64,
    sum_f: f64,
    count: usize,
    min_i: Option<i64>,
    max_i: Option<i64>,
    min_f: Option<f64>,
    max_f: Option<f64>,
    min_t: Option<String>,
    max_t: Option<String>,
}

impl Accumulator {
    pub(crate) fn new(op: AggOp, in_kind: Kind) -> CpResult<Self> {
        op.output_kind(in_kind)?;
        Ok(Accumulator {
            op,
            in_kind,
            any_nonnull: false,
            sum_i: 0,
            sum_f: 0.0,
            count: 0,
            min_i: None,
            max_i: None,
            min_f: None,
            max_f: None,
            min_t: None,
            max_t: None,
        })
    }

    pub(crate) fn update(&mut self, value: &Scalar) {
        match value {
            Scalar::Null => {},
            Scalar::Int64(v) => {
                self.any_nonnull = true;
                self.count += 1;
                self.sum_i = self.sum_i.wrapping_add(*v);
                self.sum_f += *v as f64;
                self.min_i = Some(self.min_i.map_or(*v, |m| m.min(*v)));
                self.max_i = Some(self.max_i.map_or(*v, |m| m.max(*v)));
            },
            Scalar::Float64(v) => {
                self.any_nonnull = true;
                self.count += 1;
                self.sum_f += *v;
                self.min_f = Some(match self.min_f {
                    Some(m) if float_cmp_nan_greatest(m, *v) != std::cmp::Ordering::Greater => m,
                    _ => *v,
                });
                self.max_f = Some(match self.max_f {
                    Some(m) if float_cmp_nan_greatest(m, *v) != std::cmp::Ordering::Less => m,
                    _ => *v,
                });
            },
            Scalar::Text(v) => {
                self.any_nonnull = true;
                self.count += 1;
                self.min_t = Some(match &self.min_t {
                    Some(m) if m.as_str() <= v.as_str() => m.clone(),
                    _ => v.clone(),
                });
                self.max_t = Some(match &self.max_t {
                    Some(m) if m.as_str() >= v.as_str() => m.clone(),
                    _ => v.clone(),
                });
            },
        }
    }

    pub(crate) fn finish(&self) -> Scalar {
        match self.op {
            AggOp::Count => Scalar::Int64(self.count as i64),
            AggOp::Sum if !self.any_nonnull => Scalar::Null,
            AggOp::Sum => match self.in_kind {
                Kind::Int64 => Scalar::Int64(self.sum_i),
                Kind::Float64 => Scalar::Float64(self.sum_f),
                Kind::Text => unreachable!(),
            },
            AggOp::Mean if !self.any_nonnull => Scalar::Null,
            AggOp::Mean => Scalar::Float64(self.sum_f / self.count as f64),
            AggOp::Min if !self.any_nonnull => Scalar::Null,
            AggOp::Min => match self.in_kind {
                Kind::Int64 => Scalar::Int64(self.min_i.unwrap()),
                Kind::Float64 => Scalar::Float64(self.min_f.unwrap()),
                Kind::Text => Scalar::Text(self.min_t.clone().unwrap()),
            },
            AggOp::Max if !self.any_nonnull => Scalar::Null,
            AggOp::Max => match self.in_kind {
                Kind::Int64 => Scalar::Int64(self.max_i.unwrap()),
                Kind::Float64 => Scalar::Float64(self.max_f.unwrap()),
                Kind::Text => Scalar::Text(self.max_t.clone().unwrap()),
            },
        }
    }
}

/// Groups `frame` by `key_col` (first-appearance order, null key excluded)
/// and aggregates each `value_cols[i]` with `ops[i]`.
pub fn groupby_agg(frame: &Frame, key_col: &str, value_cols: &[&str], ops: &[AggOp]) -> CpResult<Frame> {
    cp_ensure!(value_cols.len() == ops.len(), Invalid: "value_cols/ops length mismatch");

    let key_series = frame.column(key_col)?;
    let value_series: CpResult<Vec<&Series>> = value_cols.iter().map(|&n| frame.column(n)).collect();
    let value_series = value_series?;

    // Validate every (column, op) combination up front so a bad pairing
    // fails before any row is processed, not mid-accumulation.
    for (col, &op) in value_series.iter().zip(ops) {
        op.output_kind(col.kind())?;
    }

    let mut order: Vec<CellKey> = Vec::new();
    let mut group_index: HashMap<CellKey, usize> = HashMap::new();
    let mut key_scalars: Vec<Scalar> = Vec::new();
    let mut accs: Vec<Vec<Accumulator>> = Vec::new();

    for row in 0..frame.nrows() {
        let Some(key) = key_series.cell_key(row) else { continue };
        let group = *group_index.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            key_scalars.push(key_series.get(row).expect("row in range"));
            let row_accs = value_series
                .iter()
                .zip(ops)
                .map(|(col, &op)| Accumulator::new(op, col.kind()))
                .collect::<CpResult<Vec<_>>>()
                .expect("validated by output_kind below");
            accs.push(row_accs);
            accs.len() - 1
        });
        for (slot, col) in accs[group].iter_mut().zip(&value_series) {
            slot.update(&col.get(row)?);
        }
    }

    let mut out_columns = Vec::with_capacity(1 + value_cols.len());
    let mut key_out = Series::new(key_col, key_series.kind(), key_scalars.len());
    for s in &key_scalars {
        key_out.push_scalar(s)?;
    }
    out_columns.push(key_out);

    for (i, (&value_col, &op)) in value_cols.iter().zip(ops).enumerate() {
        let out_kind = op.output_kind(value_series[i].kind())?;
        let mut col = Series::new(format!("{value_col}_{}", op.name()), out_kind, accs.len());
        for g in &accs {
            col.push_scalar(&g[i].finish())?;
        }
        out_columns.push(col);
    }

    Frame::from_series(out_columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Series;

    #[test]
    fn spec_scenario_groupby() {
        let f = Frame::from_series(vec![
            Series::from_text(
                "city",
                vec!["NY".into(), "SF".into(), "NY".into(), "LA".into(), "SF".into(), String::new()],
                vec![true, true, true, true, true, false],
            )
            .unwrap(),
            Series::from_i64("sales", vec![10, 5, 7, 8, 0, 4], vec![true, true, true, true, false, true]).unwrap(),
        ])
        .unwrap();

        let out = groupby_agg(&f, "city", &["sales", "sales"], &[AggOp::Sum, AggOp::Count]).unwrap();
        assert_eq!(out.nrows(), 3);
        let cities: Vec<_> = (0..3).map(|i| out.column("city").unwrap().get_text(i).unwrap().unwrap().to_string()).collect();
        assert_eq!(cities, vec!["NY", "SF", "LA"]);
        assert_eq!(out.column("sales_sum").unwrap().get_i64(0).unwrap(), Some(17));
        assert_eq!(out.column("sales_count").unwrap().get_i64(1).unwrap(), Some(1));
    }

    #[test]
    fn sum_on_text_is_invalid() {
        let f = Frame::from_series(vec![
            Series::from_i64("k", vec![1], vec![true]).unwrap(),
            Series::from_text("v", vec!["a".into()], vec![true]).unwrap(),
        ])
        .unwrap();
        assert!(groupby_agg(&f, "k", &["v"], &[AggOp::Sum]).is_err());
    }
}
