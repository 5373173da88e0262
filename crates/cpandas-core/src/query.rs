//! The mini query-string compiler (§4.6):
//!
//! ```text
//! expr    := or
//! or      := and ("or"  and)*
//! and     := unary ("and" unary)*
//! unary   := "not" unary | primary
//! primary := "(" expr ")" | atom
//! atom    := column OP literal
//! literal := number | quoted-string | "null" | "nan"
//! ```
//!
//! A recursive-descent parser over a hand-rolled tokenizer, in the shape of
//! the teacher's own small expression parsers (`polars-plan`'s DSL→IR
//! conversion walks a similarly shallow grammar one token at a time).

use crate::error::CpResult;
use crate::frame::Frame;
use crate::predicate::{self, CmpOp};
use crate::value::Kind;
use crate::{cp_bail, cp_ensure};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(String),
    Str(String),
    Op(CmpOp),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

fn tokenize(src: &str) -> CpResult<Vec<Token>> {
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;
    let mut out = Vec::new();
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            '(' => {
                out.push(Token::LParen);
                i += 1;
            },
            ')' => {
                out.push(Token::RParen);
                i += 1;
            },
            '"' => {
                i += 1;
                let mut s = String::new();
                loop {
                    if i >= chars.len() {
                        cp_bail!(Invalid: "unmatched quote in query");
                    }
                    match chars[i] {
                        '\\' if i + 1 < chars.len() && chars[i + 1] == '"' => {
                            s.push('"');
                            i += 2;
                        },
                        '"' => {
                            i += 1;
                            break;
                        },
                        ch => {
                            s.push(ch);
                            i += 1;
                        },
                    }
                }
                out.push(Token::Str(s));
            },
            '=' | '!' | '<' | '>' => {
                let two: String = chars[i..(i + 2).min(chars.len())].iter().collect();
                let (op, len) = match two.as_str() {
                    "==" => (Token::Op(CmpOp::Eq), 2),
                    "!=" => (Token::Op(CmpOp::Ne), 2),
                    "<=" => (Token::Op(CmpOp::Le), 2),
                    ">=" => (Token::Op(CmpOp::Ge), 2),
                    _ => match c {
                        '<' => (Token::Op(CmpOp::Lt), 1),
                        '>' => (Token::Op(CmpOp::Gt), 1),
                        _ => cp_bail!(Invalid: "malformed operator near '{}'", two),
                    },
                };
                out.push(op);
                i += len;
            },
            _ if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.' || chars[i] == 'e' || chars[i] == 'E'
                    || ((chars[i] == '+' || chars[i] == '-') && matches!(chars.get(i - 1), Some('e') | Some('E'))))
                {
                    i += 1;
                }
                out.push(Token::Number(chars[start..i].iter().collect()));
            },
            _ if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                match word.to_ascii_lowercase().as_str() {
                    "and" => out.push(Token::And),
                    "or" => out.push(Token::Or),
                    "not" => out.push(Token::Not),
                    _ => out.push(Token::Ident(word)),
                }
            },
            _ => cp_bail!(Invalid: "unexpected character '{}' in query", c),
        }
    }
    Ok(out)
}

#[derive(Debug, Clone)]
enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Null,
    Nan,
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        self.pos += 1;
        t
    }

    fn expect(&mut self, want: &Token) -> CpResult<()> {
        match self.advance() {
            Some(t) if t == want => Ok(()),
            other => cp_bail!(Invalid: "expected {:?}, found {:?}", want, other),
        }
    }

    fn parse_expr(&mut self, frame: &Frame) -> CpResult<Vec<bool>> {
        self.parse_or(frame)
    }

    fn parse_or(&mut self, frame: &Frame) -> CpResult<Vec<bool>> {
        let mut lhs = self.parse_and(frame)?;
        while matches!(self.peek(), Some(Token::Or)) {
            self.advance();
            let rhs = self.parse_and(frame)?;
            lhs = predicate::or(&lhs, &rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self, frame: &Frame) -> CpResult<Vec<bool>> {
        let mut lhs = self.parse_unary(frame)?;
        while matches!(self.peek(), Some(Token::And)) {
            self.advance();
            let rhs = self.parse_unary(frame)?;
            lhs = predicate::and(&lhs, &rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self, frame: &Frame) -> CpResult<Vec<bool>> {
        if matches!(self.peek(), Some(Token::Not)) {
            self.advance();
            let inner = self.parse_unary(frame)?;
            return Ok(predicate::not(&inner));
        }
        self.parse_primary(frame)
    }

    fn parse_primary(&mut self, frame: &Frame) -> CpResult<Vec<bool>> {
        if matches!(self.peek(), Some(Token::LParen)) {
            self.advance();
            let inner = self.parse_expr(frame)?;
            self.expect(&Token::RParen)?;
            return Ok(inner);
        }
        self.parse_atom(frame)
    }

    fn parse_atom(&mut self, frame: &Frame) -> CpResult<Vec<bool>> {
        let col_name = match self.advance() {
            Some(Token::Ident(name)) => name.clone(),
            other => cp_bail!(Invalid: "expected column identifier, found {:?}", other),
        };
        let op = match self.advance() {
            Some(Token::Op(op)) => *op,
            other => cp_bail!(Invalid: "expected comparison operator, found {:?}", other),
        };
        let literal = match self.advance() {
            Some(Token::Number(text)) => parse_number_literal(text)?,
            Some(Token::Str(s)) => Literal::Str(s.clone()),
            Some(Token::Ident(word)) => match word.to_ascii_lowercase().as_str() {
                "null" => Literal::Null,
                "nan" => Literal::Nan,
                _ => cp_bail!(Invalid: "unexpected identifier '{}' in literal position", word),
            },
            other => cp_bail!(Invalid: "expected literal, found {:?}", other),
        };

        let col = frame.column(&col_name)?;
        eval_atom(col, op, &literal)
    }
}

fn parse_number_literal(text: &str) -> CpResult<Literal> {
    if text.contains('.') || text.contains('e') || text.contains('E') {
        let v: f64 = text.parse().map_err(|_| crate::cp_err!(Invalid: "'{}' is not a valid number literal", text))?;
        Ok(Literal::Float(v))
    } else {
        let v: i64 = text.parse().map_err(|_| crate::cp_err!(Invalid: "'{}' is not a valid number literal", text))?;
        Ok(Literal::Int(v))
    }
}

fn eval_atom(col: &crate::series::Series, op: CmpOp, literal: &Literal) -> CpResult<Vec<bool>> {
    match literal {
        Literal::Null => match op {
            CmpOp::Eq => Ok(predicate::mask_null(col)),
            CmpOp::Ne => Ok(predicate::not(&predicate::mask_null(col))),
            _ => cp_bail!(Invalid: "'null' literal only supports == and !="),
        },
        Literal::Nan => match op {
            CmpOp::Eq => predicate::mask_nan(col),
            CmpOp::Ne => predicate::mask_nan(col).map(|m| predicate::not(&m)),
            _ => cp_bail!(Invalid: "'nan' literal only supports == and !="),
        },
        Literal::Str(s) => predicate::mask_string(col, op, s),
        Literal::Int(v) => match col.kind() {
            Kind::Int64 => predicate::mask_int64(col, op, *v),
            Kind::Float64 => predicate::mask_float64(col, op, *v as f64),
            Kind::Text => cp_bail!(Invalid: "numeric literal compared against Text column '{}'", col.name()),
        },
        Literal::Float(v) => {
            cp_ensure!(col.kind() == Kind::Float64, Invalid: "float literal compared against {} column '{}'", col.kind(), col.name());
            predicate::mask_float64(col, op, *v)
        },
    }
}

/// Parses and evaluates `source` against `frame`, returning the boolean row mask.
pub fn eval_mask(frame: &Frame, source: &str) -> CpResult<Vec<bool>> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens: &tokens, pos: 0 };
    let mask = parser.parse_expr(frame)?;
    cp_ensure!(parser.pos == tokens.len(), Invalid: "unexpected trailing tokens in query");
    Ok(mask)
}

/// Parses, evaluates, and filters `frame` by `source`, returning the matching rows.
pub fn query(frame: &Frame, source: &str) -> CpResult<Frame> {
    let mask = eval_mask(frame, source)?;
    frame.filter_mask(&mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Series;

    fn scenario_frame() -> Frame {
        Frame::from_series(vec![
            Series::from_i64("id", vec![1, 2, 3, 4, 5], vec![true; 5]).unwrap(),
            Series::from_f64("score", vec![2.5, 4.0, 0.0, 1.0, f64::NAN], vec![true, true, false, true, true]).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let f = scenario_frame();
        let out = query(&f, r#"id == 1 or id == 2 and score >= 3.0"#).unwrap();
        assert_eq!(out.column("id").unwrap().get_i64(0).unwrap(), Some(1));
        assert_eq!(out.column("id").unwrap().get_i64(1).unwrap(), Some(2));
        assert_eq!(out.nrows(), 2);
    }

    #[test]
    fn parentheses_override_precedence() {
        let f = scenario_frame();
        let out = query(&f, r#"(id == 1 or id == 2) and score >= 3.0"#).unwrap();
        assert_eq!(out.nrows(), 1);
        assert_eq!(out.column("id").unwrap().get_i64(0).unwrap(), Some(2));
    }

    #[test]
    fn null_and_nan_literals() {
        let f = scenario_frame();
        let nulls = query(&f, "score == null").unwrap();
        assert_eq!(nulls.nrows(), 1);
        let nans = query(&f, "score == nan").unwrap();
        assert_eq!(nans.nrows(), 1);
        assert_eq!(nans.column("id").unwrap().get_i64(0).unwrap(), Some(5));
    }

    #[test]
    fn unknown_column_is_invalid() {
        let f = scenario_frame();
        assert!(query(&f, "nope == 1").is_err());
    }
}
