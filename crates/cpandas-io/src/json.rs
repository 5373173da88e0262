//! Reads the columnar JSON schema the parity harness's `expected/*.json`
//! fixtures use: `{ "columns": [ { "name", "dtype", "values" } ] }`. This is
//! the only direction needed (§6) — `cpandas` never writes this format.

use cpandas_core::cp_ensure;
use cpandas_core::error::CpResult;
use cpandas_core::frame::Frame;
use cpandas_core::series::Series;
use cpandas_core::value::Kind;
use serde::Deserialize;
use serde_json::Value as Json;

#[derive(Debug, Deserialize)]
struct JsonFrame {
    columns: Vec<JsonColumn>,
}

#[derive(Debug, Deserialize)]
struct JsonColumn {
    name: String,
    dtype: String,
    values: Vec<Json>,
}

fn parse_kind(dtype: &str) -> CpResult<Kind> {
    match dtype {
        "int64" => Ok(Kind::Int64),
        "float64" => Ok(Kind::Float64),
        "string" => Ok(Kind::Text),
        other => Err(cpandas_core::cp_err!(Invalid: "unknown dtype '{}' in JSON frame", other)),
    }
}

fn push_value(col: &mut Series, kind: Kind, value: &Json) -> CpResult<()> {
    match (kind, value) {
        (_, Json::Null) => col.push_null(),
        (Kind::Text, Json::String(s)) => col.push_raw_text(s)?,
        (Kind::Int64, Json::Number(n)) => {
            let v = n.as_i64().ok_or_else(|| cpandas_core::cp_err!(Parse: "'{}' is not a valid int64 JSON value", n))?;
            col.push_parsed(&v.to_string())?;
        },
        (Kind::Float64, Json::Number(n)) => {
            let v = n.as_f64().ok_or_else(|| cpandas_core::cp_err!(Parse: "'{}' is not a valid float64 JSON value", n))?;
            col.push_parsed(&v.to_string())?;
        },
        (Kind::Float64, Json::String(s)) if s.eq_ignore_ascii_case("nan") => col.push_parsed("nan")?,
        (kind, other) => cpandas_core::cp_bail!(Parse: "value {} is not valid for column kind {}", other, kind),
    }
    Ok(())
}

pub fn read_json_frame(text: &str) -> CpResult<Frame> {
    let parsed: JsonFrame =
        serde_json::from_str(text).map_err(|e| cpandas_core::cp_err!(Parse: "invalid JSON frame: {}", e))?;

    let mut series = Vec::with_capacity(parsed.columns.len());
    let mut nrows = None;
    for col in &parsed.columns {
        let kind = parse_kind(&col.dtype)?;
        if let Some(n) = nrows {
            cp_ensure!(col.values.len() == n, Invalid: "column '{}' has {} values but frame has {} rows", col.name, col.values.len(), n);
        } else {
            nrows = Some(col.values.len());
        }
        let mut out = Series::new(col.name.clone(), kind, col.values.len());
        for value in &col.values {
            push_value(&mut out, kind, value)?;
        }
        series.push(out);
    }
    Frame::from_series(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_mixed_columns() {
        let text = r#"{
            "columns": [
                { "name": "id", "dtype": "int64", "values": [1, 2, null] },
                { "name": "score", "dtype": "float64", "values": [1.5, "nan", null] },
                { "name": "name", "dtype": "string", "values": ["a", "", null] }
            ]
        }"#;
        let f = read_json_frame(text).unwrap();
        assert_eq!(f.shape(), (3, 3));
        assert_eq!(f.column("id").unwrap().get_i64(2).unwrap(), None);
        assert!(f.column("score").unwrap().get_f64(1).unwrap().unwrap().is_nan());
        assert_eq!(f.column("name").unwrap().get_text(1).unwrap(), Some(""));
        assert_eq!(f.column("name").unwrap().get_text(2).unwrap(), None);
    }

    #[test]
    fn mismatched_column_lengths_is_invalid() {
        let text = r#"{
            "columns": [
                { "name": "a", "dtype": "int64", "values": [1, 2] },
                { "name": "b", "dtype": "int64", "values": [1] }
            ]
        }"#;
        assert!(read_json_frame(text).is_err());
    }

    #[test]
    fn unknown_dtype_is_invalid() {
        let text = r#"{"columns": [{ "name": "a", "dtype": "blob", "values": [] }]}"#;
        assert!(read_json_frame(text).is_err());
    }
}
