//! Per-kind reductions, rank/diff, and kind-coercion helpers (§4.1, §4.9).

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use super::{Series, Storage};
use crate::error::CpResult;
use crate::value::{Kind, Scalar};
use crate::{cp_bail, cp_ensure};

/// Total order over `f64` with NaN greater than any finite value. Used both
/// for sorting (§4.5) and to give min/max/median a well-defined answer in
/// the presence of a stored NaN.
pub fn float_cmp_nan_greatest(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

impl Series {
    /// Non-null cell count (NaN counts as non-null — the null bit is authoritative).
    pub fn count(&self) -> usize {
        self.nulls.set_bits()
    }

    fn non_null_f64(&self) -> Vec<f64> {
        match &self.storage {
            Storage::Int64(v) => {
                v.iter().enumerate().filter(|(i, _)| self.nulls.get(*i)).map(|(_, &x)| x as f64).collect()
            },
            Storage::Float64(v) => {
                v.iter().enumerate().filter(|(i, _)| self.nulls.get(*i)).map(|(_, &x)| x).collect()
            },
            Storage::Text(_) => Vec::new(),
        }
    }

    pub fn sum(&self) -> CpResult<Scalar> {
        match &self.storage {
            Storage::Int64(v) => {
                let mut acc: i64 = 0;
                let mut any = false;
                for (i, &x) in v.iter().enumerate() {
                    if self.nulls.get(i) {
                        acc = acc.wrapping_add(x);
                        any = true;
                    }
                }
                cp_ensure!(any, Invalid: "no non-null values");
                Ok(Scalar::Int64(acc))
            },
            Storage::Float64(v) => {
                let mut acc = 0.0f64;
                let mut any = false;
                for (i, &x) in v.iter().enumerate() {
                    if self.nulls.get(i) {
                        acc += x;
                        any = true;
                    }
                }
                cp_ensure!(any, Invalid: "no non-null values");
                Ok(Scalar::Float64(acc))
            },
            Storage::Text(_) => cp_bail!(Invalid: "sum is not defined for text column '{}'", self.name),
        }
    }

    pub fn mean(&self) -> CpResult<f64> {
        cp_ensure!(self.kind() != Kind::Text, Invalid: "mean is not defined for text column '{}'", self.name);
        let n = self.count();
        cp_ensure!(n > 0, Invalid: "no non-null values");
        let sum = match self.sum()? {
            Scalar::Int64(v) => v as f64,
            Scalar::Float64(v) => v,
            _ => unreachable!(),
        };
        Ok(sum / n as f64)
    }

    pub fn min(&self) -> CpResult<Scalar> {
        match &self.storage {
            Storage::Int64(v) => v
                .iter()
                .enumerate()
                .filter(|(i, _)| self.nulls.get(*i))
                .map(|(_, &x)| x)
                .min()
                .map(Scalar::Int64)
                .ok_or_else(|| crate::cp_err!(Invalid: "no non-null values")),
            Storage::Float64(v) => v
                .iter()
                .enumerate()
                .filter(|(i, _)| self.nulls.get(*i))
                .map(|(_, &x)| x)
                .min_by(|a, b| float_cmp_nan_greatest(*a, *b))
                .map(Scalar::Float64)
                .ok_or_else(|| crate::cp_err!(Invalid: "no non-null values")),
            Storage::Text(v) => v
                .iter()
                .enumerate()
                .filter(|(i, _)| self.nulls.get(*i))
                .map(|(_, x)| x.clone())
                .min()
                .map(Scalar::Text)
                .ok_or_else(|| crate::cp_err!(Invalid: "no non-null values")),
        }
    }

    pub fn max(&self) -> CpResult<Scalar> {
        match &self.storage {
            Storage::Int64(v) => v
                .iter()
                .enumerate()
                .filter(|(i, _)| self.nulls.get(*i))
                .map(|(_, &x)| x)
                .max()
                .map(Scalar::Int64)
                .ok_or_else(|| crate::cp_err!(Invalid: "no non-null values")),
            Storage::Float64(v) => v
                .iter()
                .enumerate()
                .filter(|(i, _)| self.nulls.get(*i))
                .map(|(_, &x)| x)
                .max_by(|a, b| float_cmp_nan_greatest(*a, *b))
                .map(Scalar::Float64)
                .ok_or_else(|| crate::cp_err!(Invalid: "no non-null values")),
            Storage::Text(v) => v
                .iter()
                .enumerate()
                .filter(|(i, _)| self.nulls.get(*i))
                .map(|(_, x)| x.clone())
                .max()
                .map(Scalar::Text)
                .ok_or_else(|| crate::cp_err!(Invalid: "no non-null values")),
        }
    }

    pub fn median(&self) -> CpResult<f64> {
        cp_ensure!(self.kind() != Kind::Text, Invalid: "median is not defined for text column '{}'", self.name);
        let mut vals = self.non_null_f64();
        cp_ensure!(!vals.is_empty(), Invalid: "no non-null values");
        vals.sort_by(|a, b| float_cmp_nan_greatest(*a, *b));
        let n = vals.len();
        Ok(if n % 2 == 1 { vals[n / 2] } else { (vals[n / 2 - 1] + vals[n / 2]) / 2.0 })
    }

    /// Sample standard deviation (divisor `count - 1`).
    pub fn std(&self) -> CpResult<f64> {
        cp_ensure!(self.kind() != Kind::Text, Invalid: "std is not defined for text column '{}'", self.name);
        let vals = self.non_null_f64();
        cp_ensure!(vals.len() >= 2, Invalid: "std requires at least 2 non-null values");
        let n = vals.len() as f64;
        let mean = vals.iter().sum::<f64>() / n;
        let var = vals.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Ok(var.sqrt())
    }

    /// Average (1-based) ranks with ties averaged; nulls stay null (§4.9).
    pub fn rank(&self) -> CpResult<Series> {
        cp_ensure!(self.kind() != Kind::Text, Invalid: "rank is not defined for text column '{}'", self.name);
        let n = self.len();
        let mut order: Vec<usize> = (0..n).filter(|&i| self.nulls.get(i)).collect();
        let values = self.non_null_f64_by_index();
        order.sort_by(|&a, &b| float_cmp_nan_greatest(values[&a], values[&b]));

        let mut ranks = vec![0.0f64; n];
        let mut i = 0;
        while i < order.len() {
            let mut j = i;
            while j + 1 < order.len() && values[&order[j + 1]] == values[&order[i]] {
                j += 1;
            }
            // average rank across the tie run [i, j], 1-based
            let avg_rank = ((i + 1)..=(j + 1)).sum::<usize>() as f64 / (j - i + 1) as f64;
            for &idx in &order[i..=j] {
                ranks[idx] = avg_rank;
            }
            i = j + 1;
        }

        let null_mask: Vec<bool> = (0..n).map(|i| self.nulls.get(i)).collect();
        Series::from_f64(format!("{}_rank", self.name), ranks, null_mask)
    }

    fn non_null_f64_by_index(&self) -> hashbrown::HashMap<usize, f64> {
        let mut map = hashbrown::HashMap::new();
        match &self.storage {
            Storage::Int64(v) => {
                for (i, &x) in v.iter().enumerate() {
                    if self.nulls.get(i) {
                        map.insert(i, x as f64);
                    }
                }
            },
            Storage::Float64(v) => {
                for (i, &x) in v.iter().enumerate() {
                    if self.nulls.get(i) {
                        map.insert(i, x);
                    }
                }
            },
            Storage::Text(_) => {},
        }
        map
    }

    /// First-difference series; row 0 is null, as is any row whose current
    /// or previous cell is null (§4.9).
    pub fn diff(&self) -> CpResult<Series> {
        match &self.storage {
            Storage::Int64(v) => {
                let mut out = Vec::with_capacity(v.len());
                let mut mask = Vec::with_capacity(v.len());
                for i in 0..v.len() {
                    if i == 0 || !self.nulls.get(i) || !self.nulls.get(i - 1) {
                        out.push(0);
                        mask.push(false);
                    } else {
                        out.push(v[i].wrapping_sub(v[i - 1]));
                        mask.push(true);
                    }
                }
                Series::from_i64(format!("{}_diff", self.name), out, mask)
            },
            Storage::Float64(v) => {
                let mut out = Vec::with_capacity(v.len());
                let mut mask = Vec::with_capacity(v.len());
                for i in 0..v.len() {
                    if i == 0 || !self.nulls.get(i) || !self.nulls.get(i - 1) {
                        out.push(0.0);
                        mask.push(false);
                    } else {
                        out.push(v[i] - v[i - 1]);
                        mask.push(true);
                    }
                }
                Series::from_f64(format!("{}_diff", self.name), out, mask)
            },
            Storage::Text(_) => cp_bail!(Invalid: "diff is not defined for text column '{}'", self.name),
        }
    }

    /// Coerce a Text column to Float64 using the §4.1 float parser.
    pub fn to_numeric(&self) -> CpResult<Series> {
        let v = self.as_text_slice().ok_or_else(|| crate::cp_err!(Invalid: "to_numeric expects a Text column"))?;
        let mut out = Series::new(self.name.clone(), Kind::Float64, v.len());
        for (i, s) in v.iter().enumerate() {
            if self.nulls.get(i) {
                out.push_parsed(s)?;
            } else {
                out.push_null();
            }
        }
        Ok(out)
    }

    /// Parse a Text column into Int64 seconds-since-epoch (§4.9).
    pub fn to_datetime(&self) -> CpResult<Series> {
        let v = self.as_text_slice().ok_or_else(|| crate::cp_err!(Invalid: "to_datetime expects a Text column"))?;
        let mut out = Series::new(self.name.clone(), Kind::Int64, v.len());
        for (i, s) in v.iter().enumerate() {
            if !self.nulls.get(i) {
                out.push_null();
                continue;
            }
            let secs = parse_datetime_to_epoch(s)
                .map_err(|e| e.with_row(i))?;
            out.push_scalar(&Scalar::Int64(secs))?;
        }
        Ok(out)
    }

    /// Convert this column to `target`. Float→Int requires every value to be
    /// integral; Int/Float→Text produce canonical textual forms (§4.9).
    pub fn astype(&self, target: Kind) -> CpResult<Series> {
        if target == self.kind() {
            return Ok(self.clone());
        }
        match (&self.storage, target) {
            (Storage::Int64(v), Kind::Float64) => {
                let vals: Vec<f64> = v.iter().map(|&x| x as f64).collect();
                let mask: Vec<bool> = (0..v.len()).map(|i| self.nulls.get(i)).collect();
                Series::from_f64(self.name.clone(), vals, mask)
            },
            (Storage::Int64(v), Kind::Text) => {
                let vals: Vec<String> = v.iter().map(|x| x.to_string()).collect();
                let mask: Vec<bool> = (0..v.len()).map(|i| self.nulls.get(i)).collect();
                Series::from_text(self.name.clone(), vals, mask)
            },
            (Storage::Float64(v), Kind::Int64) => {
                let mut vals = Vec::with_capacity(v.len());
                for (i, &x) in v.iter().enumerate() {
                    if self.nulls.get(i) {
                        cp_ensure!(x.fract() == 0.0, Invalid: "cannot convert non-integral value {} to Int64", x);
                        vals.push(x as i64);
                    } else {
                        vals.push(0);
                    }
                }
                let mask: Vec<bool> = (0..v.len()).map(|i| self.nulls.get(i)).collect();
                Series::from_i64(self.name.clone(), vals, mask)
            },
            (Storage::Float64(v), Kind::Text) => {
                let vals: Vec<String> = v
                    .iter()
                    .map(|&x| if x.is_nan() { "nan".to_string() } else if x.fract() == 0.0 { format!("{}", x as i64) } else { x.to_string() })
                    .collect();
                let mask: Vec<bool> = (0..v.len()).map(|i| self.nulls.get(i)).collect();
                Series::from_text(self.name.clone(), vals, mask)
            },
            (Storage::Text(_), Kind::Float64) => self.to_numeric(),
            (Storage::Text(v), Kind::Int64) => {
                let float = self.to_numeric()?;
                let _ = v;
                float.astype(Kind::Int64)
            },
            _ => cp_bail!(Invalid: "unsupported conversion from {} to {}", self.kind(), target),
        }
    }
}

/// Parses the four formats named in §4.9:
/// `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, `YYYY/MM/DDTHH:MM:SSZ`, and the
/// RFC-3339-like `YYYY-MM-DD HH:MM:SS±HH:MM`.
fn parse_datetime_to_epoch(s: &str) -> CpResult<i64> {
    let s = s.trim();

    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let dt = d.and_hms_opt(0, 0, 0).expect("midnight is always valid");
        return Ok(Utc.from_utc_datetime(&dt).timestamp());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&dt).timestamp());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y/%m/%dT%H:%M:%SZ") {
        return Ok(Utc.from_utc_datetime(&dt).timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Ok(dt.timestamp());
    }

    Err(crate::cp_err!(Parse: "'{}' does not match any supported datetime format", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series_from(vals: &[i64], nulls: &[bool]) -> Series {
        Series::from_i64("x", vals.to_vec(), nulls.to_vec()).unwrap()
    }

    #[test]
    fn reductions_scenario_from_spec() {
        // [1, 2, null, -5]
        let s = series_from(&[1, 2, 0, -5], &[true, true, false, true]);
        assert_eq!(s.count(), 3);
        assert_eq!(s.sum().unwrap(), Scalar::Int64(-2));
        assert!((s.mean().unwrap() - (-2.0 / 3.0)).abs() < 1e-9);
        assert_eq!(s.min().unwrap(), Scalar::Int64(-5));
        assert_eq!(s.max().unwrap(), Scalar::Int64(2));
    }

    #[test]
    fn reduction_on_all_null_is_invalid() {
        let s = series_from(&[0, 0], &[false, false]);
        assert!(s.sum().is_err());
        assert!(s.mean().is_err());
    }

    #[test]
    fn std_requires_two_values() {
        let s = series_from(&[5], &[true]);
        assert!(s.std().is_err());
        let s2 = series_from(&[2, 4], &[true, true]);
        assert!((s2.std().unwrap() - std::f64::consts::SQRT_2).abs() < 1e-9);
    }

    #[test]
    fn median_even_and_odd() {
        let odd = series_from(&[3, 1, 2], &[true, true, true]);
        assert_eq!(odd.median().unwrap(), 2.0);
        let even = series_from(&[1, 2, 3, 4], &[true, true, true, true]);
        assert_eq!(even.median().unwrap(), 2.5);
    }

    #[test]
    fn rank_averages_ties() {
        let s = Series::from_f64("x", vec![10.0, 20.0, 20.0, 30.0], vec![true; 4]).unwrap();
        let r = s.rank().unwrap();
        assert_eq!(r.get_f64(0).unwrap(), Some(1.0));
        assert_eq!(r.get_f64(1).unwrap(), Some(2.5));
        assert_eq!(r.get_f64(2).unwrap(), Some(2.5));
        assert_eq!(r.get_f64(3).unwrap(), Some(4.0));
    }

    #[test]
    fn diff_first_row_and_nulls() {
        let s = series_from(&[10, 12, 0, 20], &[true, true, false, true]);
        let d = s.diff().unwrap();
        assert_eq!(d.get_i64(0).unwrap(), None);
        assert_eq!(d.get_i64(1).unwrap(), Some(2));
        assert_eq!(d.get_i64(2).unwrap(), None);
        assert_eq!(d.get_i64(3).unwrap(), None); // previous (idx 2) is null
    }

    #[test]
    fn astype_float_to_int_rejects_fraction() {
        let s = Series::from_f64("x", vec![2.0, 3.5], vec![true, true]).unwrap();
        assert!(s.astype(Kind::Int64).is_err());
        let s2 = Series::from_f64("x", vec![2.0, 3.0], vec![true, true]).unwrap();
        let out = s2.astype(Kind::Int64).unwrap();
        assert_eq!(out.get_i64(1).unwrap(), Some(3));
    }

    #[test]
    fn astype_float_to_text_prints_nan_and_drops_fraction_tail() {
        let s = Series::from_f64("x", vec![f64::NAN, 2.0], vec![true, true]).unwrap();
        let out = s.astype(Kind::Text).unwrap();
        assert_eq!(out.get_text(0).unwrap(), Some("nan"));
        assert_eq!(out.get_text(1).unwrap(), Some("2"));
    }

    #[test]
    fn to_datetime_parses_plain_date() {
        let s = Series::from_text("d", vec!["2024-01-02".to_string()], vec![true]).unwrap();
        let out = s.to_datetime().unwrap();
        assert_eq!(out.get_i64(0).unwrap(), Some(1704153600));
    }
}
