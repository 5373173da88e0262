//! Typed comparison mask builders (§4.6). A null cell never satisfies any
//! comparison except the explicit `== null`; NaN never compares true except
//! the explicit `== nan`.

use crate::cp_ensure;
use crate::error::CpResult;
use crate::series::Series;
use crate::value::Kind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

fn apply<T: PartialOrd>(op: CmpOp, a: &T, b: &T) -> bool {
    match op {
        CmpOp::Eq => a == b,
        CmpOp::Ne => a != b,
        CmpOp::Lt => a < b,
        CmpOp::Le => a <= b,
        CmpOp::Gt => a > b,
        CmpOp::Ge => a >= b,
    }
}

pub fn mask_int64(col: &Series, op: CmpOp, operand: i64) -> CpResult<Vec<bool>> {
    cp_ensure!(col.kind() == Kind::Int64, Invalid: "column '{}' is not Int64", col.name());
    (0..col.len()).map(|i| Ok(col.get_i64(i)?.is_some_and(|v| apply(op, &v, &operand)))).collect()
}

pub fn mask_float64(col: &Series, op: CmpOp, operand: f64) -> CpResult<Vec<bool>> {
    cp_ensure!(col.kind() == Kind::Float64, Invalid: "column '{}' is not Float64", col.name());
    (0..col.len())
        .map(|i| {
            Ok(match col.get_f64(i)? {
                // NaN never compares true, even against itself, except the
                // explicit `== nan` handled separately by `mask_nan`.
                Some(v) if v.is_nan() || operand.is_nan() => false,
                Some(v) => apply(op, &v, &operand),
                None => false,
            })
        })
        .collect()
}

pub fn mask_string(col: &Series, op: CmpOp, operand: &str) -> CpResult<Vec<bool>> {
    cp_ensure!(col.kind() == Kind::Text, Invalid: "column '{}' is not Text", col.name());
    (0..col.len()).map(|i| Ok(col.get_text(i)?.is_some_and(|v| apply(op, &v, &operand)))).collect()
}

/// `column == null`.
pub fn mask_null(col: &Series) -> Vec<bool> {
    (0..col.len()).map(|i| col.is_null(i)).collect()
}

/// `column == nan`; INVALID on non-Float64 columns.
pub fn mask_nan(col: &Series) -> CpResult<Vec<bool>> {
    cp_ensure!(col.kind() == Kind::Float64, Invalid: "'== nan' requires a Float64 column, got {}", col.kind());
    (0..col.len()).map(|i| Ok(col.get_f64(i)?.is_some_and(|v| v.is_nan()))).collect()
}

pub fn and(a: &[bool], b: &[bool]) -> Vec<bool> {
    a.iter().zip(b).map(|(&x, &y)| x && y).collect()
}

pub fn or(a: &[bool], b: &[bool]) -> Vec<bool> {
    a.iter().zip(b).map(|(&x, &y)| x || y).collect()
}

pub fn not(a: &[bool]) -> Vec<bool> {
    a.iter().map(|&x| !x).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_eq_ignores_nulls() {
        let s = Series::from_i64("x", vec![1, 2, 0], vec![true, true, false]).unwrap();
        let m = mask_int64(&s, CmpOp::Eq, 2).unwrap();
        assert_eq!(m, vec![false, true, false]);
    }

    #[test]
    fn float_nan_never_compares_true() {
        let s = Series::from_f64("x", vec![f64::NAN, 1.0], vec![true, true]).unwrap();
        let m = mask_float64(&s, CmpOp::Eq, f64::NAN).unwrap();
        assert_eq!(m, vec![false, false]);
        let nan_mask = mask_nan(&s).unwrap();
        assert_eq!(nan_mask, vec![true, false]);
    }

    #[test]
    fn string_mismatch_kind_is_invalid() {
        let s = Series::from_i64("x", vec![1], vec![true]).unwrap();
        assert!(mask_string(&s, CmpOp::Eq, "a").is_err());
    }
}
