//! CSV reader: single-char escape state, quoting per RFC 4180, configurable
//! delimiter. Column kinds are always supplied by the caller (§4.2) — this
//! reader never infers a schema, unlike the teacher's `polars-io` schema
//! inference pass.

use cpandas_core::cp_ensure;
use cpandas_core::error::CpResult;
use cpandas_core::frame::Frame;
use cpandas_core::series::Series;
use cpandas_core::value::Kind;

/// Bundles the reader's tunables, mirroring the teacher's `CsvReadOptions`.
#[derive(Debug, Clone)]
pub struct CsvReadOptions {
    pub delimiter: u8,
    pub has_header: bool,
    /// Literal strings (besides an empty unquoted field) that count as null.
    pub null_values: Vec<String>,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        CsvReadOptions { delimiter: b',', has_header: true, null_values: Vec::new() }
    }
}

impl CsvReadOptions {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_has_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn with_null_values(mut self, null_values: Vec<String>) -> Self {
        self.null_values = null_values;
        self
    }
}

struct Field {
    text: String,
    quoted: bool,
}

/// Splits `text` into records of quote-aware fields. A record boundary is an
/// unquoted `\n` (a preceding `\r` is dropped); `""` inside a quoted field
/// encodes one literal `"`.
fn tokenize(text: &str, delimiter: char) -> CpResult<Vec<Vec<Field>>> {
    let chars: Vec<char> = text.chars().collect();
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut cur = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut i = 0;

    let flush_field = |fields: &mut Vec<Field>, cur: &mut String, quoted: &mut bool| {
        fields.push(Field { text: std::mem::take(cur), quoted: *quoted });
        *quoted = false;
    };

    while i < chars.len() {
        let c = chars[i];
        if in_quotes {
            if c == '"' {
                if chars.get(i + 1) == Some(&'"') {
                    cur.push('"');
                    i += 2;
                } else {
                    in_quotes = false;
                    i += 1;
                }
            } else {
                cur.push(c);
                i += 1;
            }
            continue;
        }

        if c == '"' && cur.is_empty() && !quoted {
            quoted = true;
            in_quotes = true;
            i += 1;
        } else if c == delimiter {
            flush_field(&mut fields, &mut cur, &mut quoted);
            i += 1;
        } else if c == '\r' && chars.get(i + 1) == Some(&'\n') {
            i += 1;
        } else if c == '\n' {
            flush_field(&mut fields, &mut cur, &mut quoted);
            records.push(std::mem::take(&mut fields));
            i += 1;
        } else {
            cur.push(c);
            i += 1;
        }
    }

    cp_ensure!(!in_quotes, Parse: "unterminated quoted field");
    if !cur.is_empty() || quoted || !fields.is_empty() {
        flush_field(&mut fields, &mut cur, &mut quoted);
        records.push(fields);
    }
    Ok(records)
}

pub fn read_csv(text: &str, kinds: &[Kind], options: &CsvReadOptions) -> CpResult<Frame> {
    let delimiter = options.delimiter as char;
    let records = tokenize(text, delimiter)?;
    if records.is_empty() {
        let columns: Vec<Series> =
            kinds.iter().enumerate().map(|(i, &k)| Series::new(format!("col{i}"), k, 0)).collect();
        return Frame::from_series(columns);
    }

    let (names_owned, data_start): (Vec<String>, usize) = if options.has_header {
        (records[0].iter().map(|f| f.text.trim().to_string()).collect(), 1)
    } else {
        ((0..kinds.len()).map(|i| format!("col{i}")).collect(), 0)
    };
    cp_ensure!(names_owned.len() == kinds.len(), Invalid: "header has {} fields but {} kinds were supplied", names_owned.len(), kinds.len());
    let names: Vec<&str> = names_owned.iter().map(String::as_str).collect();

    let ncols = kinds.len();
    let nrows_hint = records.len().saturating_sub(data_start);
    let mut columns: Vec<Series> = names.iter().zip(kinds).map(|(&n, &k)| Series::new(n, k, nrows_hint)).collect();

    for (row_i, record) in records[data_start..].iter().enumerate() {
        cp_ensure!(record.len() == ncols, Parse: "row {} has {} fields, expected {}", row_i, record.len(), ncols);
        for (col_idx, field) in record.iter().enumerate() {
            let col = &mut columns[col_idx];
            let is_null_literal = !field.quoted && options.null_values.iter().any(|n| n == field.text.trim());
            if is_null_literal {
                col.push_null();
            } else if field.quoted && col.kind() == Kind::Text {
                col.push_raw_text(&field.text)?;
            } else if field.quoted && field.text.is_empty() {
                col.push_null();
            } else {
                col.push_parsed(&field.text).map_err(|e| e.with_row(row_i).with_col(col_idx))?;
            }
        }
    }

    Frame::from_series(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_scenario_basic_parse() {
        let text = "id,score,name\n1,98.5,Alice\n2,,Bob\n,73.25,\"Charlie, Jr.\"\n";
        let f = read_csv(text, &[Kind::Int64, Kind::Float64, Kind::Text], &CsvReadOptions::default()).unwrap();
        assert_eq!(f.nrows(), 3);
        assert_eq!(f.column("score").unwrap().get_f64(1).unwrap(), None);
        assert_eq!(f.column("id").unwrap().get_i64(2).unwrap(), None);
        assert_eq!(f.column("name").unwrap().get_text(2).unwrap(), Some("Charlie, Jr."));
    }

    #[test]
    fn quoted_empty_is_non_null_for_text_but_null_for_numeric() {
        let text = "a,b\n\"\",\"\"\n";
        let f = read_csv(text, &[Kind::Text, Kind::Float64], &CsvReadOptions::default()).unwrap();
        assert_eq!(f.column("a").unwrap().get_text(0).unwrap(), Some(""));
        assert!(!f.column("a").unwrap().is_null(0));
        assert_eq!(f.column("b").unwrap().get_f64(0).unwrap(), None);
    }

    #[test]
    fn wrong_field_count_is_parse_error_with_row() {
        let text = "a,b\n1,2\n3\n";
        let err = read_csv(text, &[Kind::Int64, Kind::Int64], &CsvReadOptions::default()).unwrap_err();
        assert!(err.is_kind(cpandas_core::error::ErrorKind::Parse));
    }

    #[test]
    fn no_header_uses_positional_names() {
        let text = "1,2\n3,4\n";
        let f = read_csv(text, &[Kind::Int64, Kind::Int64], &CsvReadOptions::default().with_has_header(false)).unwrap();
        assert_eq!(f.columns(), vec!["col0", "col1"]);
        assert_eq!(f.nrows(), 2);
    }

    #[test]
    fn crlf_terminators_are_accepted() {
        let text = "a,b\r\n1,2\r\n";
        let f = read_csv(text, &[Kind::Int64, Kind::Int64], &CsvReadOptions::default()).unwrap();
        assert_eq!(f.nrows(), 1);
    }

    #[test]
    fn custom_null_literal() {
        let text = "a\nNA\n5\n";
        let opts = CsvReadOptions::default().with_null_values(vec!["NA".to_string()]);
        let f = read_csv(text, &[Kind::Int64], &opts).unwrap();
        assert_eq!(f.column("a").unwrap().get_i64(0).unwrap(), None);
        assert_eq!(f.column("a").unwrap().get_i64(1).unwrap(), Some(5));
    }
}
