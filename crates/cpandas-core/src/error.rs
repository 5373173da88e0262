//! Structured errors for the data-frame engine.
//!
//! Mirrors the teacher's `PolarsError` + `polars_err!`/`polars_bail!`/
//! `polars_ensure!` trio (see `polars-io/src/csv/read/schema_inference.rs`
//! and `polars-plan/src/plans/conversion/dsl_to_ir/join.rs`): a single error
//! type carrying a kind tag and a message, raised through small macros so
//! call sites read as a one-liner instead of constructing a struct by hand.
//!
//! `OK` from the specification's five error kinds is not a variant here —
//! success is `Result::Ok`, per the "result-carrying return" translation of
//! the source's error-out-parameter pattern.

use std::fmt;

/// The four failure kinds a `cpandas` operation can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Oom,
    Io,
    Parse,
    Invalid,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Oom => "out of memory",
            ErrorKind::Io => "I/O error",
            ErrorKind::Parse => "parse error",
            ErrorKind::Invalid => "invalid operation",
        };
        f.write_str(s)
    }
}

/// Optional 0-based row/column coordinates attached to an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Loc {
    pub row: Option<usize>,
    pub col: Option<usize>,
}

impl Loc {
    pub const NONE: Loc = Loc { row: None, col: None };

    pub fn row(row: usize) -> Self {
        Loc { row: Some(row), col: None }
    }

    pub fn row_col(row: usize, col: usize) -> Self {
        Loc { row: Some(row), col: Some(col) }
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.row, self.col) {
            (None, None) => Ok(()),
            (Some(r), None) => write!(f, " (row {r})"),
            (None, Some(c)) => write!(f, " (col {c})"),
            (Some(r), Some(c)) => write!(f, " (row {r}, col {c})"),
        }
    }
}

/// The engine's single error type: a kind, a message, and optional
/// coordinates (§7 of the specification).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}{loc}")]
pub struct CpError {
    pub kind: ErrorKind,
    pub message: String,
    pub loc: Loc,
}

impl CpError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        CpError { kind, message: message.into(), loc: Loc::NONE }
    }

    #[must_use]
    pub fn with_loc(mut self, loc: Loc) -> Self {
        self.loc = loc;
        self
    }

    #[must_use]
    pub fn with_row(self, row: usize) -> Self {
        self.with_loc(Loc::row(row))
    }

    #[must_use]
    pub fn with_col(self, col: usize) -> Self {
        self.with_loc(Loc { row: self.loc.row, col: Some(col) })
    }

    #[must_use]
    pub fn with_row_col(self, row: usize, col: usize) -> Self {
        self.with_loc(Loc::row_col(row, col))
    }

    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl From<std::io::Error> for CpError {
    fn from(err: std::io::Error) -> Self {
        CpError::new(ErrorKind::Io, err.to_string())
    }
}

pub type CpResult<T> = Result<T, CpError>;

/// Construct a [`CpError`] without returning it, e.g. `cp_err!(Invalid: "bad {}", name)`.
#[macro_export]
macro_rules! cp_err {
    ($kind:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::error::CpError::new($crate::error::ErrorKind::$kind, format!($fmt $(, $arg)*))
    };
}

/// Return early with a [`CpError`], e.g. `cp_bail!(Parse: "bad row {row}")`.
#[macro_export]
macro_rules! cp_bail {
    ($kind:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {
        return Err($crate::cp_err!($kind: $fmt $(, $arg)*))
    };
}

/// Bail with a [`CpError`] unless a condition holds, e.g.
/// `cp_ensure!(mask.len() == nrows, Invalid: "mask length mismatch")`.
#[macro_export]
macro_rules! cp_ensure {
    ($cond:expr, $kind:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {
        if !($cond) {
            $crate::cp_bail!($kind: $fmt $(, $arg)*)
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_loc() {
        let e = cp_err!(Parse: "bad literal").with_row_col(2, 0);
        assert_eq!(e.to_string(), "parse error: bad literal (row 2, col 0)");
    }

    #[test]
    fn display_without_loc() {
        let e = cp_err!(Invalid: "missing column {}", "foo");
        assert_eq!(e.to_string(), "invalid operation: missing column foo");
    }

    #[test]
    fn ensure_macro_bails() {
        fn check(ok: bool) -> CpResult<()> {
            cp_ensure!(ok, Invalid: "not ok");
            Ok(())
        }
        assert!(check(true).is_ok());
        assert!(check(false).is_err());
    }
}
