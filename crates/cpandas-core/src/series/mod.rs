//! [`Series`]: a single named, typed column with a null bitmap.
//!
//! Per the specification's Design Notes (§9), column storage is a closed sum
//! over `{Int64Array, Float64Array, TextArray}` (here [`Storage`]) rather
//! than the teacher's dynamic `Arc<dyn SeriesTrait>` dispatch
//! (`polars-core/src/series/implementations/date.rs`) — at this engine's
//! scale the extra indirection buys nothing and a closed enum is both
//! simpler and exhaustively matchable.

mod reductions;

use std::cmp::Ordering;

use cpandas_arrow::Bitmap;

use crate::error::CpResult;
use crate::keys::CellKey;
use crate::value::{Kind, Scalar};
use crate::{cp_bail, cp_ensure, cp_err};

pub use reductions::float_cmp_nan_greatest;

#[derive(Debug, Clone)]
enum Storage {
    Int64(Vec<i64>),
    Float64(Vec<f64>),
    Text(Vec<String>),
}

impl Storage {
    fn kind(&self) -> Kind {
        match self {
            Storage::Int64(_) => Kind::Int64,
            Storage::Float64(_) => Kind::Float64,
            Storage::Text(_) => Kind::Text,
        }
    }

    fn len(&self) -> usize {
        match self {
            Storage::Int64(v) => v.len(),
            Storage::Float64(v) => v.len(),
            Storage::Text(v) => v.len(),
        }
    }

    fn with_capacity(kind: Kind, capacity: usize) -> Self {
        match kind {
            Kind::Int64 => Storage::Int64(Vec::with_capacity(capacity)),
            Kind::Float64 => Storage::Float64(Vec::with_capacity(capacity)),
            Kind::Text => Storage::Text(Vec::with_capacity(capacity)),
        }
    }
}

/// A single named, typed column (§3 of the specification).
///
/// Invariant: `nulls.len() == storage.len()`. A Series owns its value
/// storage and string bytes outright.
#[derive(Debug, Clone)]
pub struct Series {
    name: String,
    nulls: Bitmap,
    storage: Storage,
}

impl Series {
    pub fn new(name: impl Into<String>, kind: Kind, capacity: usize) -> Self {
        Series {
            name: name.into(),
            nulls: Bitmap::with_capacity(capacity),
            storage: Storage::with_capacity(kind, capacity),
        }
    }

    pub fn from_i64(name: impl Into<String>, values: Vec<i64>, nulls: Vec<bool>) -> CpResult<Self> {
        cp_ensure!(values.len() == nulls.len(), Invalid: "value/null length mismatch");
        Ok(Series { name: name.into(), nulls: Bitmap::from_bools(&nulls), storage: Storage::Int64(values) })
    }

    pub fn from_f64(name: impl Into<String>, values: Vec<f64>, nulls: Vec<bool>) -> CpResult<Self> {
        cp_ensure!(values.len() == nulls.len(), Invalid: "value/null length mismatch");
        Ok(Series { name: name.into(), nulls: Bitmap::from_bools(&nulls), storage: Storage::Float64(values) })
    }

    pub fn from_text(name: impl Into<String>, values: Vec<String>, nulls: Vec<bool>) -> CpResult<Self> {
        cp_ensure!(values.len() == nulls.len(), Invalid: "value/null length mismatch");
        Ok(Series { name: name.into(), nulls: Bitmap::from_bools(&nulls), storage: Storage::Text(values) })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> Kind {
        self.storage.kind()
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn nulls(&self) -> &Bitmap {
        &self.nulls
    }

    pub fn is_null(&self, idx: usize) -> bool {
        !self.nulls.get(idx)
    }

    pub(crate) fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn as_i64_slice(&self) -> Option<&[i64]> {
        match &self.storage {
            Storage::Int64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64_slice(&self) -> Option<&[f64]> {
        match &self.storage {
            Storage::Float64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text_slice(&self) -> Option<&[String]> {
        match &self.storage {
            Storage::Text(v) => Some(v),
            _ => None,
        }
    }

    /// An empty clone with the same name and kind — used to build derived frames column-by-column.
    pub fn clone_empty_like(&self) -> Series {
        Series::new(self.name.clone(), self.kind(), 0)
    }

    pub fn get(&self, idx: usize) -> CpResult<Scalar> {
        cp_ensure!(idx < self.len(), Invalid: "index {} out of bounds (len {})", idx, self.len());
        if self.is_null(idx) {
            return Ok(Scalar::Null);
        }
        Ok(match &self.storage {
            Storage::Int64(v) => Scalar::Int64(v[idx]),
            Storage::Float64(v) => Scalar::Float64(v[idx]),
            Storage::Text(v) => Scalar::Text(v[idx].clone()),
        })
    }

    pub fn get_i64(&self, idx: usize) -> CpResult<Option<i64>> {
        cp_ensure!(self.kind() == Kind::Int64, Invalid: "column '{}' is not Int64", self.name);
        cp_ensure!(idx < self.len(), Invalid: "index {} out of bounds (len {})", idx, self.len());
        if self.is_null(idx) {
            return Ok(None);
        }
        match &self.storage {
            Storage::Int64(v) => Ok(Some(v[idx])),
            _ => unreachable!(),
        }
    }

    pub fn get_f64(&self, idx: usize) -> CpResult<Option<f64>> {
        cp_ensure!(self.kind() == Kind::Float64, Invalid: "column '{}' is not Float64", self.name);
        cp_ensure!(idx < self.len(), Invalid: "index {} out of bounds (len {})", idx, self.len());
        if self.is_null(idx) {
            return Ok(None);
        }
        match &self.storage {
            Storage::Float64(v) => Ok(Some(v[idx])),
            _ => unreachable!(),
        }
    }

    pub fn get_text(&self, idx: usize) -> CpResult<Option<&str>> {
        cp_ensure!(self.kind() == Kind::Text, Invalid: "column '{}' is not Text", self.name);
        cp_ensure!(idx < self.len(), Invalid: "index {} out of bounds (len {})", idx, self.len());
        if self.is_null(idx) {
            return Ok(None);
        }
        match &self.storage {
            Storage::Text(v) => Ok(Some(v[idx].as_str())),
            _ => unreachable!(),
        }
    }

    /// The hashable key for a cell, or `None` if the cell is null or NaN
    /// (neither ever matches in a join/group-by — §4.7/§4.8).
    pub fn cell_key(&self, idx: usize) -> Option<CellKey> {
        if self.is_null(idx) {
            return None;
        }
        match &self.storage {
            Storage::Int64(v) => Some(CellKey::Int64(v[idx])),
            Storage::Float64(v) => CellKey::from_f64(v[idx]),
            Storage::Text(v) => Some(CellKey::Text(v[idx].clone())),
        }
    }

    /// Total order used by `sort_values`: non-null ascending by value, NaN
    /// greater than any finite value, null greatest of all (§4.5).
    pub fn cmp_at(&self, i: usize, j: usize) -> Ordering {
        match (self.nulls.get(i), self.nulls.get(j)) {
            (false, false) => Ordering::Equal,
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            (true, true) => match &self.storage {
                Storage::Int64(v) => v[i].cmp(&v[j]),
                Storage::Float64(v) => float_cmp_nan_greatest(v[i], v[j]),
                Storage::Text(v) => v[i].cmp(&v[j]),
            },
        }
    }

    /// Like [`Series::cmp_at`], but `ascending` only flips the ordering among
    /// two non-null values — nulls stay greatest regardless of direction
    /// (§4.5: nulls sort to the end under both ascending and descending).
    pub fn cmp_at_dir(&self, i: usize, j: usize, ascending: bool) -> Ordering {
        match (self.nulls.get(i), self.nulls.get(j)) {
            (false, false) => Ordering::Equal,
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            (true, true) => {
                let ord = match &self.storage {
                    Storage::Int64(v) => v[i].cmp(&v[j]),
                    Storage::Float64(v) => float_cmp_nan_greatest(v[i], v[j]),
                    Storage::Text(v) => v[i].cmp(&v[j]),
                };
                if ascending {
                    ord
                } else {
                    ord.reverse()
                }
            },
        }
    }

    /// Push an explicit null, regardless of kind.
    pub fn push_null(&mut self) {
        match &mut self.storage {
            Storage::Int64(v) => v.push(0),
            Storage::Float64(v) => v.push(0.0),
            Storage::Text(v) => v.push(String::new()),
        }
        self.nulls.push(false);
    }

    /// Push `s` verbatim into a Text column as a non-null value, even if empty.
    /// Used by the CSV reader for a quoted empty field (`""`), which is an
    /// empty string, not null — unlike an unquoted empty field.
    pub fn push_raw_text(&mut self, s: &str) -> CpResult<()> {
        match &mut self.storage {
            Storage::Text(v) => {
                v.push(s.to_string());
                self.nulls.push(true);
                Ok(())
            },
            _ => cp_bail!(Invalid: "push_raw_text on non-Text column '{}'", self.name),
        }
    }

    pub fn push_scalar(&mut self, value: &Scalar) -> CpResult<()> {
        match (value, &mut self.storage) {
            (Scalar::Null, _) => self.push_null(),
            (Scalar::Int64(v), Storage::Int64(vals)) => {
                vals.push(*v);
                self.nulls.push(true);
            },
            (Scalar::Float64(v), Storage::Float64(vals)) => {
                vals.push(*v);
                self.nulls.push(true);
            },
            (Scalar::Text(v), Storage::Text(vals)) => {
                vals.push(v.clone());
                self.nulls.push(true);
            },
            _ => cp_bail!(Invalid: "scalar kind does not match column '{}' kind {}", self.name, self.kind()),
        }
        Ok(())
    }

    /// Parse `text` according to this column's kind (§4.1) and append it.
    ///
    /// Integers: optional sign + digits, surrounding whitespace trimmed,
    /// empty-after-trim → null. Floats: additionally decimal point/exponent;
    /// `nan` (case-insensitive) → stored NaN, not null. Text: bytes preserved
    /// exactly; only an empty string → null.
    pub fn push_parsed(&mut self, text: &str) -> CpResult<()> {
        match &mut self.storage {
            Storage::Int64(vals) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    vals.push(0);
                    self.nulls.push(false);
                    return Ok(());
                }
                let v: i64 = trimmed
                    .parse()
                    .map_err(|_| cp_err!(Parse: "'{}' is not a valid Int64 value", text))?;
                vals.push(v);
                self.nulls.push(true);
            },
            Storage::Float64(vals) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    vals.push(0.0);
                    self.nulls.push(false);
                    return Ok(());
                }
                let v: f64 = trimmed
                    .parse()
                    .map_err(|_| cp_err!(Parse: "'{}' is not a valid Float64 value", text))?;
                vals.push(v);
                self.nulls.push(true);
            },
            Storage::Text(vals) => {
                if text.is_empty() {
                    vals.push(String::new());
                    self.nulls.push(false);
                } else {
                    vals.push(text.to_string());
                    self.nulls.push(true);
                }
            },
        }
        Ok(())
    }

    /// Remove the last row — used to roll back a partially-appended row
    /// (§4.2/§7: `append_row` is atomic).
    pub fn truncate_last(&mut self) {
        match &mut self.storage {
            Storage::Int64(v) => {
                v.pop();
            },
            Storage::Float64(v) => {
                v.pop();
            },
            Storage::Text(v) => {
                v.pop();
            },
        }
        if self.nulls.len() > 0 {
            self.nulls.truncate_row();
        }
    }

    /// Gather rows by position; `None` produces a null row (used by outer/left/right joins
    /// for the unmatched side).
    pub fn take(&self, indices: &[Option<usize>]) -> Series {
        let mut out = Series::new(self.name.clone(), self.kind(), indices.len());
        for idx in indices {
            match idx {
                Some(i) => {
                    let s = self.get(*i).expect("index produced by the kernel is always in range");
                    out.push_scalar(&s).expect("scalar kind always matches this column's kind");
                },
                None => out.push_null(),
            }
        }
        out
    }

    pub fn take_indices(&self, indices: &[usize]) -> Series {
        self.take(&indices.iter().map(|&i| Some(i)).collect::<Vec<_>>())
    }

    /// Replaces every null cell with `text`, parsed under this column's kind.
    /// `text` itself must parse to a non-null value.
    pub fn fillna(&self, text: &str) -> CpResult<Series> {
        let mut fill = Series::new(self.name.clone(), self.kind(), 1);
        fill.push_parsed(text)?;
        cp_ensure!(fill.nulls.get(0), Invalid: "fillna replacement '{}' must not itself be null", text);
        let replacement = fill.get(0)?;

        let mut out = Series::new(self.name.clone(), self.kind(), self.len());
        for i in 0..self.len() {
            if self.is_null(i) {
                out.push_scalar(&replacement)?;
            } else {
                out.push_scalar(&self.get(i)?)?;
            }
        }
        Ok(out)
    }

    pub fn filter_mask(&self, mask: &[bool]) -> CpResult<Series> {
        cp_ensure!(mask.len() == self.len(), Invalid: "mask length {} does not match column length {}", mask.len(), self.len());
        let indices: Vec<Option<usize>> =
            mask.iter().enumerate().filter(|(_, &b)| b).map(|(i, _)| Some(i)).collect();
        Ok(self.take(&indices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s_i64(name: &str, vals: &[&str]) -> Series {
        let mut s = Series::new(name, Kind::Int64, vals.len());
        for v in vals {
            s.push_parsed(v).unwrap();
        }
        s
    }

    #[test]
    fn parse_int_whitespace_and_empty() {
        let s = s_i64("a", &[" 3", "-5", "", "   ", "7"]);
        assert_eq!(s.get_i64(0).unwrap(), Some(3));
        assert_eq!(s.get_i64(1).unwrap(), Some(-5));
        assert_eq!(s.get_i64(2).unwrap(), None);
        assert_eq!(s.get_i64(3).unwrap(), None);
        assert_eq!(s.get_i64(4).unwrap(), Some(7));
    }

    #[test]
    fn parse_int_rejects_decimal() {
        let mut s = Series::new("a", Kind::Int64, 1);
        assert!(s.push_parsed("3.5").is_err());
    }

    #[test]
    fn parse_float_nan_is_not_null() {
        let mut s = Series::new("a", Kind::Float64, 2);
        s.push_parsed("nan").unwrap();
        s.push_parsed("NaN").unwrap();
        assert!(s.get_f64(0).unwrap().unwrap().is_nan());
        assert!(!s.is_null(0));
        assert!(s.get_f64(1).unwrap().unwrap().is_nan());
    }

    #[test]
    fn parse_text_preserves_internal_whitespace() {
        let mut s = Series::new("a", Kind::Text, 1);
        s.push_parsed("  hello   world  ").unwrap();
        assert_eq!(s.get_text(0).unwrap(), Some("  hello   world  "));
    }

    #[test]
    fn parse_text_empty_is_null() {
        let mut s = Series::new("a", Kind::Text, 1);
        s.push_parsed("").unwrap();
        assert!(s.is_null(0));
    }

    #[test]
    fn push_raw_text_keeps_empty_non_null() {
        let mut s = Series::new("a", Kind::Text, 1);
        s.push_raw_text("").unwrap();
        assert!(!s.is_null(0));
        assert_eq!(s.get_text(0).unwrap(), Some(""));
    }

    #[test]
    fn truncate_last_rolls_back() {
        let mut s = s_i64("a", &["1", "2"]);
        s.truncate_last();
        assert_eq!(s.len(), 1);
        assert_eq!(s.get_i64(0).unwrap(), Some(1));
    }

    #[test]
    fn cmp_at_orders_null_last_nan_before_null() {
        let mut s = Series::new("a", Kind::Float64, 3);
        s.push_parsed("1.0").unwrap();
        s.push_parsed("nan").unwrap();
        s.push_null();
        // nan (idx 1) < null (idx 2)
        assert_eq!(s.cmp_at(1, 2), Ordering::Less);
        // finite (idx 0) < nan (idx 1)
        assert_eq!(s.cmp_at(0, 1), Ordering::Less);
    }

    #[test]
    fn take_with_none_produces_null() {
        let s = s_i64("a", &["1", "2", "3"]);
        let out = s.take(&[Some(2), None, Some(0)]);
        assert_eq!(out.get_i64(0).unwrap(), Some(3));
        assert_eq!(out.get_i64(1).unwrap(), None);
        assert_eq!(out.get_i64(2).unwrap(), Some(1));
    }
}
