//! Row-oriented callbacks (§4.9): `apply`, `transform`, `iterrows`, `iteritems`.
//!
//! The source's function-pointer-with-void-context callbacks become plain
//! closures; a callback's failure (an `Err`, or an explicit `Ok(false)` from
//! the iteration callbacks) aborts the operation as INVALID, per Design
//! Notes §9 ("callbacks become polymorphism over a callable capability").

use crate::cp_bail;
use crate::error::CpResult;
use crate::frame::Frame;
use crate::series::Series;
use crate::value::{Kind, Scalar};

fn row_values(frame: &Frame, row: usize) -> CpResult<Vec<Scalar>> {
    frame.columns_slice().iter().map(|c| c.get(row)).collect()
}

/// Invokes `f` once per row with that row's cells; collects the results into
/// a single-column frame named `out_name` of kind `out_kind`.
pub fn apply(frame: &Frame, out_name: &str, out_kind: Kind, mut f: impl FnMut(&[Scalar]) -> CpResult<Scalar>) -> CpResult<Frame> {
    let mut out = Series::new(out_name, out_kind, frame.nrows());
    for row in 0..frame.nrows() {
        let cells = row_values(frame, row)?;
        out.push_scalar(&f(&cells)?)?;
    }
    Frame::from_series(vec![out])
}

/// Invokes `f` once per row; replaces `col_name` in a clone of `frame` with
/// the results (which must parse under that column's existing kind).
pub fn transform(frame: &Frame, col_name: &str, mut f: impl FnMut(&[Scalar]) -> CpResult<Scalar>) -> CpResult<Frame> {
    let idx = frame.col_index(col_name)?;
    let kind = frame.column_at(idx)?.kind();
    let mut replaced = Series::new(col_name, kind, frame.nrows());
    for row in 0..frame.nrows() {
        let cells = row_values(frame, row)?;
        replaced.push_scalar(&f(&cells)?)?;
    }
    let mut columns: Vec<Series> = frame.columns_slice().to_vec();
    columns[idx] = replaced;
    Frame::from_series(columns)
}

/// Invokes `f(row_index, cells)` per row; `Ok(false)` or `Err` aborts the
/// whole iteration as INVALID.
pub fn iterrows(frame: &Frame, mut f: impl FnMut(usize, &[Scalar]) -> CpResult<bool>) -> CpResult<()> {
    for row in 0..frame.nrows() {
        let cells = row_values(frame, row)?;
        if !f(row, &cells)? {
            cp_bail!(Invalid: "iterrows callback aborted at row {row}");
        }
    }
    Ok(())
}

/// Invokes `f(name, column)` per column; `Ok(false)` or `Err` aborts.
pub fn iteritems(frame: &Frame, mut f: impl FnMut(&str, &Series) -> CpResult<bool>) -> CpResult<()> {
    for col in frame.columns_slice() {
        if !f(col.name(), col)? {
            cp_bail!(Invalid: "iteritems callback aborted at column '{}'", col.name());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Series;

    fn frame() -> Frame {
        Frame::from_series(vec![
            Series::from_i64("a", vec![1, 2, 3], vec![true; 3]).unwrap(),
            Series::from_i64("b", vec![10, 20, 30], vec![true; 3]).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn apply_sums_each_row() {
        let f = frame();
        let out = apply(&f, "total", Kind::Int64, |cells| {
            Ok(Scalar::Int64(cells.iter().filter_map(|c| c.as_i64()).sum()))
        })
        .unwrap();
        assert_eq!(out.column("total").unwrap().get_i64(1).unwrap(), Some(22));
    }

    #[test]
    fn transform_replaces_one_column() {
        let f = frame();
        let out = transform(&f, "a", |cells| Ok(Scalar::Int64(cells[0].as_i64().unwrap() * 10))).unwrap();
        assert_eq!(out.column("a").unwrap().get_i64(2).unwrap(), Some(30));
        assert_eq!(out.column("b").unwrap().get_i64(2).unwrap(), Some(30));
    }

    #[test]
    fn iterrows_false_aborts_invalid() {
        let f = frame();
        let result = iterrows(&f, |row, _| Ok(row < 1));
        assert!(result.is_err());
    }

    #[test]
    fn iteritems_visits_every_column() {
        let f = frame();
        let mut seen = Vec::new();
        iteritems(&f, |name, _| {
            seen.push(name.to_string());
            Ok(true)
        })
        .unwrap();
        assert_eq!(seen, vec!["a", "b"]);
    }
}
