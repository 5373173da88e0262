//! Relational join (§4.7): INNER/LEFT/RIGHT/OUTER × NESTED/HASH/SORTED.
//!
//! The three strategies only differ in how they *discover* matching row
//! pairs; a single assembly step turns the pair set into the canonical
//! output order the specification mandates, so strategy choice can never
//! change the result — it is a query planner's private affair, the way the
//! teacher's own join code (`polars-plan/.../join.rs`) keeps execution
//! strategy and join semantics in separate layers.

use hashbrown::HashMap;

use crate::cp_ensure;
use crate::error::CpResult;
use crate::frame::Frame;
use crate::keys::CompositeKey;
use crate::series::Series;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum How {
    Inner,
    Left,
    Right,
    Outer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Auto,
    Nested,
    Hash,
    Sorted,
}

/// Rows with at least this many on both sides make AUTO prefer HASH over NESTED.
const AUTO_HASH_THRESHOLD: usize = 128;

pub fn join(left: &Frame, right: &Frame, left_keys: &[&str], right_keys: &[&str], how: How, strategy: Strategy) -> CpResult<Frame> {
    join_suffixed(left, right, left_keys, right_keys, how, strategy, "_right")
}

pub fn join_suffixed(
    left: &Frame,
    right: &Frame,
    left_keys: &[&str],
    right_keys: &[&str],
    how: How,
    strategy: Strategy,
    right_suffix: &str,
) -> CpResult<Frame> {
    cp_ensure!(!left_keys.is_empty(), Invalid: "join key list must not be empty");
    cp_ensure!(left_keys.len() == right_keys.len(), Invalid: "left/right key count mismatch");

    let lcols: CpResult<Vec<&Series>> = left_keys.iter().map(|&n| left.column(n)).collect();
    let rcols: CpResult<Vec<&Series>> = right_keys.iter().map(|&n| right.column(n)).collect();
    let lcols = lcols?;
    let rcols = rcols?;

    let lrow_keys = row_keys(&lcols, left.nrows());
    let rrow_keys = row_keys(&rcols, right.nrows());

    let effective = resolve_strategy(strategy, left.nrows(), right.nrows());
    let matches = match effective {
        Strategy::Nested => nested_matches(&lrow_keys, &rrow_keys),
        Strategy::Hash => hash_matches(&lrow_keys, &rrow_keys),
        Strategy::Sorted => sorted_matches(&lrow_keys, &rrow_keys),
        Strategy::Auto => unreachable!("resolve_strategy never returns Auto"),
    };

    log::debug!("join: strategy={:?} resolved_to={:?} matches={}", strategy, effective, matches.len());

    let (left_rows, right_rows) = assemble(left.nrows(), right.nrows(), &matches, how);
    build_output(left, right, left_keys, right_keys, &left_rows, &right_rows, right_suffix)
}

fn resolve_strategy(requested: Strategy, nleft: usize, nright: usize) -> Strategy {
    match requested {
        Strategy::Auto => {
            if nleft >= AUTO_HASH_THRESHOLD && nright >= AUTO_HASH_THRESHOLD {
                Strategy::Hash
            } else {
                Strategy::Nested
            }
        },
        other => other,
    }
}

/// Per-row composite key, or `None` when any component is null/NaN (never matches).
fn row_keys(cols: &[&Series], nrows: usize) -> Vec<Option<CompositeKey>> {
    (0..nrows)
        .map(|row| {
            let mut parts = Vec::with_capacity(cols.len());
            for col in cols {
                parts.push(col.cell_key(row)?);
            }
            Some(CompositeKey(parts))
        })
        .collect()
}

fn nested_matches(lkeys: &[Option<CompositeKey>], rkeys: &[Option<CompositeKey>]) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    for (i, lk) in lkeys.iter().enumerate() {
        let Some(lk) = lk else { continue };
        for (j, rk) in rkeys.iter().enumerate() {
            if rk.as_ref() == Some(lk) {
                out.push((i, j));
            }
        }
    }
    out
}

fn hash_matches(lkeys: &[Option<CompositeKey>], rkeys: &[Option<CompositeKey>]) -> Vec<(usize, usize)> {
    let mut buckets: HashMap<&CompositeKey, Vec<usize>> = HashMap::new();
    for (j, rk) in rkeys.iter().enumerate() {
        if let Some(rk) = rk {
            buckets.entry(rk).or_default().push(j);
        }
    }
    let mut out = Vec::new();
    for (i, lk) in lkeys.iter().enumerate() {
        let Some(lk) = lk else { continue };
        if let Some(js) = buckets.get(lk) {
            out.extend(js.iter().map(|&j| (i, j)));
        }
    }
    out
}

fn sorted_matches(lkeys: &[Option<CompositeKey>], rkeys: &[Option<CompositeKey>]) -> Vec<(usize, usize)> {
    let key_repr = |k: &CompositeKey| -> Vec<u8> { composite_sort_bytes(k) };

    let mut lidx: Vec<usize> = (0..lkeys.len()).filter(|&i| lkeys[i].is_some()).collect();
    let mut ridx: Vec<usize> = (0..rkeys.len()).filter(|&j| rkeys[j].is_some()).collect();
    lidx.sort_by_key(|&i| key_repr(lkeys[i].as_ref().unwrap()));
    ridx.sort_by_key(|&j| key_repr(rkeys[j].as_ref().unwrap()));

    let mut out = Vec::new();
    let (mut a, mut b) = (0, 0);
    while a < lidx.len() && b < ridx.len() {
        let ka = key_repr(lkeys[lidx[a]].as_ref().unwrap());
        let kb = key_repr(rkeys[ridx[b]].as_ref().unwrap());
        match ka.cmp(&kb) {
            std::cmp::Ordering::Less => a += 1,
            std::cmp::Ordering::Greater => b += 1,
            std::cmp::Ordering::Equal => {
                let a_end = (a..lidx.len()).take_while(|&x| key_repr(lkeys[lidx[x]].as_ref().unwrap()) == ka).count() + a;
                let b_end = (b..ridx.len()).take_while(|&x| key_repr(rkeys[ridx[x]].as_ref().unwrap()) == kb).count() + b;
                for x in a..a_end {
                    for y in b..b_end {
                        out.push((lidx[x], ridx[y]));
                    }
                }
                a = a_end;
                b = b_end;
            },
        }
    }
    out
}

/// A byte representation sufficient to group equal composite keys together
/// (used only to drive the merge; not a numerically meaningful order).
fn composite_sort_bytes(key: &CompositeKey) -> Vec<u8> {
    let mut out = Vec::new();
    for part in &key.0 {
        match part {
            crate::keys::CellKey::Int64(v) => {
                out.push(0);
                out.extend_from_slice(&v.to_be_bytes());
            },
            crate::keys::CellKey::Float64Bits(b) => {
                out.push(1);
                out.extend_from_slice(&b.to_be_bytes());
            },
            crate::keys::CellKey::Text(s) => {
                out.push(2);
                out.extend_from_slice(s.as_bytes());
                out.push(0);
            },
        }
    }
    out
}

/// Turns a raw match-pair set into canonical `(left_row, right_row)` output
/// order for `how` (§4.7's ordering rules).
fn assemble(nleft: usize, nright: usize, matches: &[(usize, usize)], how: How) -> (Vec<Option<usize>>, Vec<Option<usize>>) {
    let mut by_left: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut by_right: HashMap<usize, Vec<usize>> = HashMap::new();
    for &(l, r) in matches {
        by_left.entry(l).or_default().push(r);
        by_right.entry(r).or_default().push(l);
    }
    for v in by_left.values_mut() {
        v.sort_unstable();
    }
    for v in by_right.values_mut() {
        v.sort_unstable();
    }

    let mut left_rows = Vec::new();
    let mut right_rows = Vec::new();

    if matches!(how, How::Inner | How::Left | How::Outer) {
        for l in 0..nleft {
            match by_left.get(&l) {
                Some(rs) => {
                    for &r in rs {
                        left_rows.push(Some(l));
                        right_rows.push(Some(r));
                    }
                },
                None if matches!(how, How::Left | How::Outer) => {
                    left_rows.push(Some(l));
                    right_rows.push(None);
                },
                None => {},
            }
        }
    }

    if matches!(how, How::Right) {
        for r in 0..nright {
            match by_right.get(&r) {
                Some(ls) => {
                    for &l in ls {
                        left_rows.push(Some(l));
                        right_rows.push(Some(r));
                    }
                },
                None => {
                    left_rows.push(None);
                    right_rows.push(Some(r));
                },
            }
        }
    }

    if matches!(how, How::Outer) {
        for r in 0..nright {
            if !by_right.contains_key(&r) {
                left_rows.push(None);
                right_rows.push(Some(r));
            }
        }
    }

    (left_rows, right_rows)
}

#[allow(clippy::too_many_arguments)]
fn build_output(
    left: &Frame,
    right: &Frame,
    left_keys: &[&str],
    right_keys: &[&str],
    left_rows: &[Option<usize>],
    right_rows: &[Option<usize>],
    right_suffix: &str,
) -> CpResult<Frame> {
    let mut columns = Vec::with_capacity(left.ncols() + right.ncols());

    for name in left.columns() {
        let col = left.column(name)?;
        let out = if let Some(key_pos) = left_keys.iter().position(|&k| k == name) {
            let rcol = right.column(right_keys[key_pos])?;
            let mut merged = Series::new(col.name(), col.kind(), left_rows.len());
            for (&l, &r) in left_rows.iter().zip(right_rows) {
                match (l, r) {
                    (Some(l), _) => merged.push_scalar(&col.get(l)?)?,
                    (None, Some(r)) => merged.push_scalar(&rcol.get(r)?)?,
                    (None, None) => merged.push_null(),
                }
            }
            merged
        } else {
            col.take(left_rows)
        };
        columns.push(out);
    }

    let left_names: hashbrown::HashSet<&str> = left.columns().into_iter().collect();
    let right_key_names: hashbrown::HashSet<&str> = right_keys.iter().copied().collect();
    for name in right.columns() {
        if right_key_names.contains(name) {
            continue;
        }
        let col = right.column(name)?.take(right_rows);
        if left_names.contains(name) {
            let mut renamed = col;
            renamed.rename(format!("{name}{right_suffix}"));
            columns.push(renamed);
        } else {
            columns.push(col);
        }
    }

    Frame::from_series(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Series;

    fn left_right() -> (Frame, Frame) {
        let left = Frame::from_series(vec![
            Series::from_i64("id", vec![1, 2, 2, 3, 0, 4], vec![true, true, true, true, false, true]).unwrap(),
        ])
        .unwrap();
        let right = Frame::from_series(vec![
            Series::from_i64("id", vec![1, 2, 2, 5, 0, 3], vec![true, true, true, true, false, true]).unwrap(),
        ])
        .unwrap();
        (left, right)
    }

    #[test]
    fn spec_scenario_row_counts() {
        let (left, right) = left_right();
        for (how, expect) in [(How::Inner, 6), (How::Left, 8), (How::Right, 8), (How::Outer, 10)] {
            let out = join(&left, &right, &["id"], &["id"], how, Strategy::Nested).unwrap();
            assert_eq!(out.nrows(), expect, "{how:?}");
        }
    }

    #[test]
    fn strategies_agree() {
        let (left, right) = left_right();
        for how in [How::Inner, How::Left, How::Right, How::Outer] {
            let nested = join(&left, &right, &["id"], &["id"], how, Strategy::Nested).unwrap();
            let hash = join(&left, &right, &["id"], &["id"], how, Strategy::Hash).unwrap();
            let sorted = join(&left, &right, &["id"], &["id"], how, Strategy::Sorted).unwrap();
            for other in [&hash, &sorted] {
                assert_eq!(nested.nrows(), other.nrows(), "{how:?}");
                for i in 0..nested.nrows() {
                    assert_eq!(
                        nested.column("id").unwrap().get_i64(i).unwrap(),
                        other.column("id").unwrap().get_i64(i).unwrap(),
                        "{how:?} row {i}"
                    );
                }
            }
        }
    }

    #[test]
    fn colliding_non_key_column_gets_suffixed() {
        let left = Frame::from_series(vec![
            Series::from_i64("id", vec![1], vec![true]).unwrap(),
            Series::from_text("name", vec!["a".into()], vec![true]).unwrap(),
        ])
        .unwrap();
        let right = Frame::from_series(vec![
            Series::from_i64("id", vec![1], vec![true]).unwrap(),
            Series::from_text("name", vec!["b".into()], vec![true]).unwrap(),
        ])
        .unwrap();
        let out = join(&left, &right, &["id"], &["id"], How::Inner, Strategy::Nested).unwrap();
        assert!(out.column("name").is_ok());
        assert!(out.column("name_right").is_ok());
    }
}
