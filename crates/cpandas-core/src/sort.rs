//! Stable single/multi-key sort (§4.5). Nulls sort to the end under both
//! ascending and descending order; NaN sorts greater than any finite value
//! but less than null.

use std::cmp::Ordering;

use crate::cp_ensure;
use crate::error::CpResult;
use crate::frame::Frame;

pub fn sort_values(frame: &Frame, name: &str, ascending: bool) -> CpResult<Frame> {
    sort_values_multi(frame, &[name], &[ascending])
}

pub fn sort_values_multi(frame: &Frame, names: &[&str], ascendings: &[bool]) -> CpResult<Frame> {
    cp_ensure!(!names.is_empty(), Invalid: "sort key list must not be empty");
    cp_ensure!(names.len() == ascendings.len(), Invalid: "names/ascendings length mismatch");
    let cols: CpResult<Vec<_>> = names.iter().map(|&n| frame.column(n)).collect();
    let cols = cols?;

    let mut order: Vec<usize> = (0..frame.nrows()).collect();
    order.sort_by(|&i, &j| {
        for (col, &asc) in cols.iter().zip(ascendings) {
            let ord = col.cmp_at_dir(i, j, asc);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });

    let columns: Vec<_> = frame.columns_slice().iter().map(|c| c.take_indices(&order)).collect();
    Frame::from_series(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Series;

    #[test]
    fn stable_multi_key_matches_spec_scenario() {
        // (id,name): (3,Bob) (1,Alice) (2,Charlie) (null,null) (2,Bob)
        let f = Frame::from_series(vec![
            Series::from_i64("id", vec![3, 1, 2, 0, 2], vec![true, true, true, false, true]).unwrap(),
            Series::from_text(
                "name",
                vec!["Bob".into(), "Alice".into(), "Charlie".into(), String::new(), "Bob".into()],
                vec![true, true, true, false, true],
            )
            .unwrap(),
        ])
        .unwrap();

        let sorted = sort_values_multi(&f, &["name", "id"], &[true, false]).unwrap();
        let names: Vec<Option<&str>> = (0..sorted.nrows()).map(|i| sorted.column("name").unwrap().get_text(i).unwrap()).collect();
        let ids: Vec<Option<i64>> = (0..sorted.nrows()).map(|i| sorted.column("id").unwrap().get_i64(i).unwrap()).collect();
        assert_eq!(names, vec![Some("Alice"), Some("Bob"), Some("Bob"), Some("Charlie"), None]);
        assert_eq!(ids, vec![Some(1), Some(3), Some(2), Some(2), None]);
    }

    #[test]
    fn descending_sort_still_puts_nulls_last() {
        let f = Frame::from_series(vec![Series::from_i64("x", vec![3, 1, 0, 2], vec![true, true, false, true]).unwrap()])
            .unwrap();
        let sorted = sort_values(&f, "x", false).unwrap();
        let vals: Vec<_> = (0..sorted.nrows()).map(|i| sorted.column("x").unwrap().get_i64(i).unwrap()).collect();
        assert_eq!(vals, vec![Some(3), Some(2), Some(1), None]);
    }

    #[test]
    fn sort_idempotent() {
        let f = Frame::from_series(vec![Series::from_i64("x", vec![3, 1, 2], vec![true, true, true]).unwrap()]).unwrap();
        let once = sort_values(&f, "x", true).unwrap();
        let twice = sort_values(&once, "x", true).unwrap();
        let vals_once: Vec<_> = (0..once.nrows()).map(|i| once.column("x").unwrap().get_i64(i).unwrap()).collect();
        let vals_twice: Vec<_> = (0..twice.nrows()).map(|i| twice.column("x").unwrap().get_i64(i).unwrap()).collect();
        assert_eq!(vals_once, vals_twice);
    }
}
