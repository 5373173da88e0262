//! The element [`Kind`]s a column can hold, and the [`Scalar`] union used by
//! row-oriented APIs (`apply`/`at`/`iterrows`).

use std::fmt;

/// The three primitive column kinds (§3 of the specification).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Int64,
    Float64,
    Text,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Kind::Int64 => "int64",
            Kind::Float64 => "float64",
            Kind::Text => "text",
        };
        f.write_str(s)
    }
}

/// A single cell value, tagged by kind, with an explicit null flag.
///
/// `Scalar::Float64(f64::NAN, false)` (a stored NaN) and `Scalar::Null` are
/// deliberately distinct — see §3's NaN-vs-null note.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int64(i64),
    Float64(f64),
    Text(String),
    Null,
}

impl Scalar {
    pub fn kind(&self) -> Option<Kind> {
        match self {
            Scalar::Int64(_) => Some(Kind::Int64),
            Scalar::Float64(_) => Some(Kind::Float64),
            Scalar::Text(_) => Some(Kind::Text),
            Scalar::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int64(v) => write!(f, "{v}"),
            Scalar::Float64(v) => {
                if v.is_nan() {
                    write!(f, "nan")
                } else {
                    write!(f, "{v}")
                }
            },
            Scalar::Text(v) => write!(f, "{v}"),
            Scalar::Null => write!(f, ""),
        }
    }
}
