//! CSV writer: the mirror image of [`super::reader`]. Quotes a field only
//! when it contains the delimiter, a quote, or a newline; nulls become an
//! empty field. Numeric formatting goes through `itoa`/`ryu` rather than
//! `format!`, the way the teacher's CSV writer avoids the `Display` path on
//! hot columns (`polars-io/src/csv/write/write_impl.rs`).

use std::fmt::Write as _;

use cpandas_core::error::CpResult;
use cpandas_core::frame::Frame;
use cpandas_core::value::{Kind, Scalar};

#[derive(Debug, Clone)]
pub struct CsvWriteOptions {
    pub delimiter: u8,
    pub include_header: bool,
}

impl Default for CsvWriteOptions {
    fn default() -> Self {
        CsvWriteOptions { delimiter: b',', include_header: true }
    }
}

impl CsvWriteOptions {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_include_header(mut self, include_header: bool) -> Self {
        self.include_header = include_header;
        self
    }
}

fn needs_quoting(field: &str, delimiter: char) -> bool {
    field.contains(delimiter) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_field(out: &mut String, field: &str, delimiter: char) {
    if needs_quoting(field, delimiter) {
        out.push('"');
        for ch in field.chars() {
            if ch == '"' {
                out.push('"');
            }
            out.push(ch);
        }
        out.push('"');
    } else {
        out.push_str(field);
    }
}

fn scalar_text(value: &Scalar, int_buf: &mut itoa::Buffer, float_buf: &mut ryu::Buffer) -> String {
    match value {
        Scalar::Null => String::new(),
        Scalar::Int64(v) => int_buf.format(*v).to_string(),
        Scalar::Float64(v) => {
            if v.is_nan() {
                "nan".to_string()
            } else {
                float_buf.format(*v).to_string()
            }
        },
        Scalar::Text(v) => v.clone(),
    }
}

pub fn write_csv(frame: &Frame, options: &CsvWriteOptions) -> CpResult<String> {
    let delimiter = options.delimiter as char;
    let mut out = String::new();
    let kinds = frame.dtypes();

    if options.include_header {
        for (i, name) in frame.columns().iter().enumerate() {
            if i > 0 {
                out.push(delimiter);
            }
            write_field(&mut out, name, delimiter);
        }
        out.push('\n');
    }

    let mut int_buf = itoa::Buffer::new();
    let mut float_buf = ryu::Buffer::new();
    for row in 0..frame.nrows() {
        for col_idx in 0..kinds.len() {
            if col_idx > 0 {
                out.push(delimiter);
            }
            let col = frame.column_at(col_idx)?;
            let value = col.get(row)?;
            let text = scalar_text(&value, &mut int_buf, &mut float_buf);
            write_field(&mut out, &text, delimiter);
        }
        out.push('\n');
    }

    Ok(out)
}

/// Writes to any `std::fmt::Write` sink without building an intermediate
/// `String` first — used when the caller already owns a buffer.
pub fn write_csv_into(frame: &Frame, options: &CsvWriteOptions, sink: &mut impl std::fmt::Write) -> CpResult<()> {
    let rendered = write_csv(frame, options)?;
    sink.write_str(&rendered).map_err(|e| cpandas_core::cp_err!(Io: "{}", e))?;
    Ok(())
}
