//! [`Frame`]: an ordered, uniquely-named sequence of [`Series`] sharing a
//! row count, plus an optional row index promoted out of a data column
//! (`set_index`/`at_*`, §4.4).

mod index;

pub use index::RowSelector;
use index::RowIndex;

use hashbrown::HashMap;

use crate::error::CpResult;
use crate::series::Series;
use crate::value::{Kind, Scalar};
use crate::{cp_bail, cp_ensure};

/// A table: ordered columns, uniform row count, unique (case-sensitive) names.
///
/// Invariant: every column in `columns` has the same length; `names` maps
/// each column's name to its position and never contains a duplicate.
#[derive(Debug, Clone)]
pub struct Frame {
    columns: Vec<Series>,
    names: HashMap<String, usize>,
    row_index: Option<RowIndex>,
}

impl Frame {
    /// An empty frame with `ncols` columns of the given names/kinds, each
    /// with `capacity` rows pre-reserved.
    pub fn create(names: &[&str], kinds: &[Kind], capacity: usize) -> CpResult<Frame> {
        cp_ensure!(names.len() == kinds.len(), Invalid: "names/kinds length mismatch");
        let columns: Vec<Series> =
            names.iter().zip(kinds).map(|(&n, &k)| Series::new(n, k, capacity)).collect();
        Frame::from_series(columns)
    }

    /// Assemble a frame from already-built columns, validating the shared
    /// invariants (unique non-empty names, equal lengths).
    pub fn from_series(columns: Vec<Series>) -> CpResult<Frame> {
        let mut names = HashMap::with_capacity(columns.len());
        let nrows = columns.first().map(|s| s.len()).unwrap_or(0);
        for (i, col) in columns.iter().enumerate() {
            cp_ensure!(!col.name().is_empty(), Invalid: "column name must not be empty");
            cp_ensure!(col.len() == nrows, Invalid: "column '{}' has length {} but frame has {} rows", col.name(), col.len(), nrows);
            cp_ensure!(names.insert(col.name().to_string(), i).is_none(), Invalid: "duplicate column name '{}'", col.name());
        }
        Ok(Frame { columns, names, row_index: None })
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn nrows(&self) -> usize {
        self.columns.first().map(|s| s.len()).unwrap_or(0)
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    pub fn size(&self) -> usize {
        self.nrows() * self.ncols()
    }

    pub fn ndim(&self) -> usize {
        2
    }

    pub fn columns(&self) -> Vec<&str> {
        self.columns.iter().map(|s| s.name()).collect()
    }

    pub fn dtypes(&self) -> Vec<Kind> {
        self.columns.iter().map(|s| s.kind()).collect()
    }

    pub fn col_index(&self, name: &str) -> CpResult<usize> {
        self.names.get(name).copied().ok_or_else(|| crate::cp_err!(Invalid: "unknown column '{}'", name))
    }

    pub fn column(&self, name: &str) -> CpResult<&Series> {
        Ok(&self.columns[self.col_index(name)?])
    }

    pub fn column_at(&self, pos: usize) -> CpResult<&Series> {
        self.columns.get(pos).ok_or_else(|| crate::cp_err!(Invalid: "column position {} out of bounds (ncols {})", pos, self.ncols()))
    }

    pub fn columns_slice(&self) -> &[Series] {
        &self.columns
    }

    pub fn copy(&self) -> Frame {
        self.clone()
    }

    /// Parses `row[i]` through column `i`'s parser and appends it. On any
    /// per-cell parse failure the whole row is rejected: columns already
    /// appended to are rolled back so every column keeps the same length.
    pub fn append_row(&mut self, row: &[&str]) -> CpResult<()> {
        cp_ensure!(row.len() == self.ncols(), Invalid: "row has {} fields but frame has {} columns", row.len(), self.ncols());
        for (i, cell) in row.iter().enumerate() {
            if let Err(e) = self.columns[i].push_parsed(cell) {
                for col in &mut self.columns[..i] {
                    col.truncate_last();
                }
                return Err(e.with_col(i));
            }
        }
        Ok(())
    }

    pub fn select_cols(&self, names: &[&str]) -> CpResult<Frame> {
        let mut seen = hashbrown::HashSet::with_capacity(names.len());
        let mut columns = Vec::with_capacity(names.len());
        for &n in names {
            cp_ensure!(seen.insert(n), Invalid: "duplicate column '{}' in selection", n);
            columns.push(self.column(n)?.clone());
        }
        Frame::from_series(columns)
    }

    pub fn drop_cols(&self, names: &[&str]) -> CpResult<Frame> {
        let drop: hashbrown::HashSet<&str> = names.iter().copied().collect();
        for &n in names {
            cp_ensure!(self.names.contains_key(n), Invalid: "unknown column '{}'", n);
        }
        cp_ensure!(drop.len() < self.ncols(), Invalid: "drop_cols would remove all columns");
        let columns: Vec<Series> = self.columns.iter().filter(|s| !drop.contains(s.name())).cloned().collect();
        Frame::from_series(columns)
    }

    pub fn rename_cols(&self, old: &[&str], new: &[&str]) -> CpResult<Frame> {
        cp_ensure!(old.len() == new.len(), Invalid: "old/new name length mismatch");
        let mut seen = hashbrown::HashSet::with_capacity(old.len());
        for &n in old {
            cp_ensure!(self.names.contains_key(n), Invalid: "unknown column '{}'", n);
            cp_ensure!(seen.insert(n), Invalid: "duplicate old name '{}'", n);
        }
        let mut columns = self.columns.clone();
        for (o, n) in old.iter().zip(new) {
            let idx = self.col_index(o)?;
            columns[idx].rename(*n);
        }
        Frame::from_series(columns)
    }

    /// Fills null cells with `values[i]` (parseable under column `i`'s kind,
    /// and itself non-null).
    pub fn fillna(&self, values: &[&str]) -> CpResult<Frame> {
        cp_ensure!(values.len() == self.ncols(), Invalid: "fillna values length {} does not match ncols {}", values.len(), self.ncols());
        let mut columns = Vec::with_capacity(self.ncols());
        for (col, fill) in self.columns.iter().zip(values) {
            columns.push(col.fillna(fill)?);
        }
        Frame::from_series(columns)
    }

    pub fn filter_mask(&self, mask: &[bool]) -> CpResult<Frame> {
        cp_ensure!(mask.len() == self.nrows(), Invalid: "mask length {} does not match nrows {}", mask.len(), self.nrows());
        let columns: CpResult<Vec<Series>> = self.columns.iter().map(|c| c.filter_mask(mask)).collect();
        Frame::from_series(columns?)
    }

    /// Drops every row that has a null in any column.
    pub fn dropna(&self) -> CpResult<Frame> {
        let mask: Vec<bool> =
            (0..self.nrows()).map(|row| self.columns.iter().all(|c| !c.is_null(row))).collect();
        self.filter_mask(&mask)
    }

    pub fn head(&self, k: usize) -> Frame {
        let k = k.min(self.nrows());
        let indices: Vec<usize> = (0..k).collect();
        self.take_rows(&indices)
    }

    pub fn tail(&self, k: usize) -> Frame {
        let k = k.min(self.nrows());
        let indices: Vec<usize> = (self.nrows() - k)..self.nrows();
        self.take_rows(&indices.collect::<Vec<_>>())
    }

    fn take_rows(&self, indices: &[usize]) -> Frame {
        let columns: Vec<Series> = self.columns.iter().map(|c| c.take_indices(indices)).collect();
        Frame::from_series(columns).expect("row gather preserves frame invariants")
    }

    pub fn iloc(&self, rows: &[usize], cols: &[usize]) -> CpResult<Frame> {
        for &r in rows {
            cp_ensure!(r < self.nrows(), Invalid: "row position {} out of bounds (nrows {})", r, self.nrows());
        }
        let mut columns = Vec::with_capacity(cols.len());
        for &c in cols {
            columns.push(self.column_at(c)?.take_indices(rows));
        }
        Frame::from_series(columns)
    }

    /// Selects rows by position or (if a row index is set) by key, and
    /// columns by name.
    pub fn loc(&self, rows: &[RowSelector], cols: &[&str]) -> CpResult<Frame> {
        let positions: CpResult<Vec<usize>> = rows
            .iter()
            .map(|r| match r {
                RowSelector::Pos(p) => {
                    cp_ensure!(*p < self.nrows(), Invalid: "row position {} out of bounds (nrows {})", p, self.nrows());
                    Ok(*p)
                },
                RowSelector::Key(k) => self.resolve_row_key(k),
            })
            .collect();
        let positions = positions?;
        let mut columns = Vec::with_capacity(cols.len());
        for &name in cols {
            columns.push(self.column(name)?.take_indices(&positions));
        }
        Frame::from_series(columns)
    }

    fn resolve_row_key(&self, key: &str) -> CpResult<usize> {
        let idx = self.row_index.as_ref().ok_or_else(|| crate::cp_err!(Invalid: "loc by string key requires set_index"))?;
        idx.resolve(key)
    }

    /// Promotes an Int64 or Text column to the frame's row index, removing
    /// it from the data columns.
    pub fn set_index(&self, name: &str) -> CpResult<Frame> {
        let idx = self.col_index(name)?;
        let key_col = &self.columns[idx];
        cp_ensure!(key_col.kind() != Kind::Float64, Invalid: "set_index requires an Int64 or Text column, got {}", key_col.kind());
        let row_index = RowIndex::build(key_col)?;
        let columns: Vec<Series> = self.columns.iter().enumerate().filter(|(i, _)| *i != idx).map(|(_, c)| c.clone()).collect();
        let mut out = Frame::from_series(columns)?;
        out.row_index = Some(row_index);
        Ok(out)
    }

    /// Reinserts the row index as the first data column and clears it.
    pub fn reset_index(&self) -> CpResult<Frame> {
        let idx = self.row_index.as_ref().ok_or_else(|| crate::cp_err!(Invalid: "reset_index requires a row index"))?;
        let key_col = idx.to_series();
        let mut columns = Vec::with_capacity(self.ncols() + 1);
        columns.push(key_col);
        columns.extend(self.columns.iter().cloned());
        Frame::from_series(columns)
    }

    /// O(1) lookup via the row index, at column `col`.
    pub fn at(&self, key: &Scalar, col: &str) -> CpResult<Scalar> {
        let idx = self.row_index.as_ref().ok_or_else(|| crate::cp_err!(Invalid: "at requires set_index"))?;
        let row = idx.resolve_scalar(key)?;
        self.column(col)?.get(row)
    }

    pub fn at_int64(&self, key: i64, col: &str) -> CpResult<Scalar> {
        self.at(&Scalar::Int64(key), col)
    }

    pub fn at_float64(&self, _key: f64, _col: &str) -> CpResult<Scalar> {
        cp_bail!(Invalid: "row index is never Float64 — use at_int64 or at_string")
    }

    pub fn at_string(&self, key: &str, col: &str) -> CpResult<Scalar> {
        self.at(&Scalar::Text(key.to_string()), col)
    }

    pub fn has_index(&self) -> bool {
        self.row_index.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic() -> Frame {
        Frame::from_series(vec![
            Series::from_i64("id", vec![1, 2, 3], vec![true, true, true]).unwrap(),
            Series::from_text("name", vec!["Alice".into(), "Bob".into(), "Carol".into()], vec![true, true, true]).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn create_rejects_duplicate_names() {
        let r = Frame::from_series(vec![
            Series::new("a", Kind::Int64, 0),
            Series::new("a", Kind::Int64, 0),
        ]);
        assert!(r.is_err());
    }

    #[test]
    fn append_row_atomic_rollback() {
        let mut f = Frame::create(&["id", "score"], &[Kind::Int64, Kind::Float64], 0).unwrap();
        f.append_row(&["1", "2.5"]).unwrap();
        assert!(f.append_row(&["2", "notanumber"]).is_err());
        assert_eq!(f.nrows(), 1, "failed row must not leave a partially appended row behind");
    }

    #[test]
    fn head_tail_clamp() {
        let f = basic();
        assert_eq!(f.head(100).nrows(), 3);
        assert_eq!(f.tail(1).nrows(), 1);
    }

    #[test]
    fn drop_cols_rejects_dropping_everything() {
        let f = basic();
        assert!(f.drop_cols(&["id", "name"]).is_err());
        let dropped = f.drop_cols(&["id"]).unwrap();
        assert_eq!(dropped.ncols(), 1);
    }

    #[test]
    fn set_index_and_at() {
        let f = basic().set_index("id").unwrap();
        assert_eq!(f.ncols(), 1);
        assert_eq!(f.at_int64(2, "name").unwrap(), Scalar::Text("Bob".into()));
        assert!(f.at_int64(99, "name").is_err());
    }

    #[test]
    fn dropna_removes_rows_with_any_null() {
        let mut id = Series::new("id", Kind::Int64, 0);
        id.push_parsed("1").unwrap();
        id.push_parsed("2").unwrap();
        id.push_parsed("3").unwrap();
        let mut name = Series::new("name", Kind::Text, 0);
        name.push_parsed("Alice").unwrap();
        name.push_parsed("").unwrap();
        name.push_parsed("Carol").unwrap();
        let f = Frame::from_series(vec![id, name]).unwrap();
        let out = f.dropna().unwrap();
        assert_eq!(out.nrows(), 2);
        assert_eq!(out.column("id").unwrap().get_i64(1).unwrap(), Some(3));
    }

    #[test]
    fn loc_by_key_after_set_index() {
        let f = Frame::from_series(vec![
            Series::from_text("sym", vec!["a".into(), "b".into()], vec![true, true]).unwrap(),
            Series::from_i64("qty", vec![10, 20], vec![true, true]).unwrap(),
        ])
        .unwrap()
        .set_index("sym")
        .unwrap();
        let out = f.loc(&[RowSelector::Key("b".into())], &["qty"]).unwrap();
        assert_eq!(out.column("qty").unwrap().get_i64(0).unwrap(), Some(20));
    }
}
