//! `pivot_table` (§4.8): group-by `(index_col, columns_col)`, aggregate
//! `values_col`, reshape distinct `columns_col` values into output columns.

use hashbrown::HashMap;

use crate::error::CpResult;
use crate::frame::Frame;
use crate::groupby::{AggOp, Accumulator};
use crate::keys::CellKey;
use crate::series::Series;
use crate::value::Scalar;

pub fn pivot_table(frame: &Frame, index_col: &str, columns_col: &str, values_col: &str, op: AggOp) -> CpResult<Frame> {
    let index_series = frame.column(index_col)?;
    let columns_series = frame.column(columns_col)?;
    let values_series = frame.column(values_col)?;
    let out_kind = op.output_kind(values_series.kind())?;

    let mut idx_order: Vec<CellKey> = Vec::new();
    let mut idx_pos: HashMap<CellKey, usize> = HashMap::new();
    let mut idx_scalars: Vec<Scalar> = Vec::new();

    let mut col_order: Vec<CellKey> = Vec::new();
    let mut col_pos: HashMap<CellKey, usize> = HashMap::new();
    let mut col_scalars: Vec<Scalar> = Vec::new();

    let mut cells: HashMap<(usize, usize), Accumulator> = HashMap::new();

    for row in 0..frame.nrows() {
        let Some(ik) = index_series.cell_key(row) else { continue };
        let Some(ck) = columns_series.cell_key(row) else { continue };

        let ip = *idx_pos.entry(ik.clone()).or_insert_with(|| {
            idx_order.push(ik.clone());
            idx_scalars.push(index_series.get(row).expect("row in range"));
            idx_order.len() - 1
        });
        let cp = *col_pos.entry(ck.clone()).or_insert_with(|| {
            col_order.push(ck.clone());
            col_scalars.push(columns_series.get(row).expect("row in range"));
            col_order.len() - 1
        });

        let acc = cells
            .entry((ip, cp))
            .or_insert_with(|| Accumulator::new(op, values_series.kind()).expect("validated by output_kind above"));
        acc.update(&values_series.get(row)?);
    }

    let mut out_columns = Vec::with_capacity(1 + col_order.len());
    let mut index_out = Series::new(index_col, index_series.kind(), idx_scalars.len());
    for s in &idx_scalars {
        index_out.push_scalar(s)?;
    }
    out_columns.push(index_out);

    for cp in 0..col_order.len() {
        let mut col = Series::new(col_scalars[cp].to_string(), out_kind, idx_order.len());
        for ip in 0..idx_order.len() {
            let value = cells.get(&(ip, cp)).map(|a| a.finish()).unwrap_or(Scalar::Null);
            col.push_scalar(&value)?;
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
    fn basic_pivot_sums() {
        let f = Frame::from_series(vec![
            Series::from_text("region", vec!["E".into(), "E".into(), "W".into(), "W".into()], vec![true; 4]).unwrap(),
            Series::from_text("q", vec!["Q1".into(), "Q2".into(), "Q1".into(), "Q1".into()], vec![true; 4]).unwrap(),
            Series::from_i64("sales", vec![10, 20, 5, 7], vec![true; 4]).unwrap(),
        ])
        .unwrap();

        let out = pivot_table(&f, "region", "q", "sales", AggOp::Sum).unwrap();
        assert_eq!(out.nrows(), 2);
        assert_eq!(out.columns(), vec!["region", "Q1", "Q2"]);
        assert_eq!(out.column("Q1").unwrap().get_i64(0).unwrap(), Some(10));
        assert_eq!(out.column("Q2").unwrap().get_i64(0).unwrap(), Some(20));
        assert_eq!(out.column("Q2").unwrap().get_i64(1).unwrap(), None); // no W/Q2 rows
    }
}
