//! The row index promoted by [`super::Frame::set_index`]: an Int64 or Text
//! column turned into an O(1) lookup table (§4.4).

use hashbrown::HashMap;

use crate::error::CpResult;
use crate::series::Series;
use crate::value::{Kind, Scalar};

/// A row selector for [`super::Frame::loc`]: either a plain position or a
/// string key resolved through a row index.
#[derive(Debug, Clone)]
pub enum RowSelector {
    Pos(usize),
    Key(String),
}

#[derive(Debug, Clone)]
pub(super) struct RowIndex {
    name: String,
    kind: Kind,
    int_map: HashMap<i64, usize>,
    text_map: HashMap<String, usize>,
    values: Series,
}

impl RowIndex {
    pub(super) fn build(col: &Series) -> CpResult<RowIndex> {
        let mut int_map = HashMap::new();
        let mut text_map = HashMap::new();
        for i in 0..col.len() {
            match col.kind() {
                Kind::Int64 => {
                    if let Some(v) = col.get_i64(i)? {
                        int_map.insert(v, i);
                    }
                },
                Kind::Text => {
                    if let Some(v) = col.get_text(i)? {
                        text_map.insert(v.to_string(), i);
                    }
                },
                Kind::Float64 => unreachable!("Frame::set_index rejects Float64 columns"),
            }
        }
        Ok(RowIndex { name: col.name().to_string(), kind: col.kind(), int_map, text_map, values: col.clone() })
    }

    pub(super) fn resolve(&self, key: &str) -> CpResult<usize> {
        match self.kind {
            Kind::Text => {
                self.text_map.get(key).copied().ok_or_else(|| crate::cp_err!(Invalid: "unknown row key '{}'", key))
            },
            Kind::Int64 => {
                let parsed: i64 =
                    key.trim().parse().map_err(|_| crate::cp_err!(Invalid: "row key '{}' is not a valid Int64", key))?;
                self.int_map.get(&parsed).copied().ok_or_else(|| crate::cp_err!(Invalid: "unknown row key '{}'", key))
            },
            Kind::Float64 => unreachable!(),
        }
    }

    pub(super) fn resolve_scalar(&self, key: &Scalar) -> CpResult<usize> {
        match (self.kind, key) {
            (Kind::Int64, Scalar::Int64(v)) => {
                self.int_map.get(v).copied().ok_or_else(|| crate::cp_err!(Invalid: "unknown row key {}", v))
            },
            (Kind::Text, Scalar::Text(v)) => {
                self.text_map.get(v).copied().ok_or_else(|| crate::cp_err!(Invalid: "unknown row key '{}'", v))
            },
            _ => Err(crate::cp_err!(Invalid: "row key kind does not match index kind {}", self.kind)),
        }
    }

    pub(super) fn to_series(&self) -> Series {
        let mut s = self.values.clone();
        s.rename(self.name.clone());
        s
    }
}
