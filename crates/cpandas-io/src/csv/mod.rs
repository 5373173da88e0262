//! RFC-4180-flavored CSV reader/writer (§4.3).
//!
//! Read/write options are grouped into builder structs the way the teacher
//! bundles `CsvReadOptions`/`CsvParseOptions`
//! (`polars-io/src/csv/read/schema_inference.rs`) rather than passing long
//! positional argument lists.

mod reader;
mod writer;

pub use reader::{read_csv, CsvReadOptions};
pub use writer::{write_csv, write_csv_into, CsvWriteOptions};
