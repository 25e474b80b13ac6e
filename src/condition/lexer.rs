//! Tokenizer for when clauses.
//!
//! # Responsibilities
//! - Split a when clause into tokens, tracking byte offsets for error reports
//! - Classify bare words into keywords, reserved words and names
//! - Normalize string literals (both quote styles carry the same meaning)
//!
//! # Design Decisions
//! - Hand-written scanner, no regex: one pass, no backtracking
//! - Blanks, newlines and `#` comments are skipped
//! - Any character outside the token set is a hard error

use serde_json::Value;

use crate::condition::ast::{ArithOp, CompareOp};
use crate::condition::SyntaxError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LParen,
    RParen,
    LBracket,
    RBracket,
    /// The `JSON` keyword that starts a path.
    Json,
    /// `True`, `False` or `None`.
    Reserved(Value),
    Number(u64),
    Str(String),
    Arith(ArithOp),
    Compare(CompareOp),
    And,
    Or,
    Is,
    In,
    Not,
    Name(String),
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::LParen => "'('".into(),
            TokenKind::RParen => "')'".into(),
            TokenKind::LBracket => "'['".into(),
            TokenKind::RBracket => "']'".into(),
            TokenKind::Json => "JSON".into(),
            TokenKind::Reserved(v) => match v {
                Value::Bool(true) => "True".into(),
                Value::Bool(false) => "False".into(),
                _ => "None".into(),
            },
            TokenKind::Number(n) => format!("number {}", n),
            TokenKind::Str(s) => format!("string '{}'", s),
            TokenKind::Arith(op) => format!("'{}'", op.symbol()),
            TokenKind::Compare(op) => format!("'{}'", op.symbol()),
            TokenKind::And => "'and'".into(),
            TokenKind::Or => "'or'".into(),
            TokenKind::Is => "'is'".into(),
            TokenKind::In => "'in'".into(),
            TokenKind::Not => "'not'".into(),
            TokenKind::Name(name) => format!("name '{}'", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character in the source.
    pub offset: usize,
}

/// Tokenize a complete when clause.
pub fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        let c = bytes[pos];

        let kind = match c {
            b' ' | b'\t' | b'\r' | b'\n' => {
                pos += 1;
                continue;
            }
            b'#' => {
                while pos < bytes.len() && bytes[pos] != b'\n' {
                    pos += 1;
                }
                continue;
            }
            b'(' => single(&mut pos, TokenKind::LParen),
            b')' => single(&mut pos, TokenKind::RParen),
            b'[' => single(&mut pos, TokenKind::LBracket),
            b']' => single(&mut pos, TokenKind::RBracket),
            b'+' => single(&mut pos, TokenKind::Arith(ArithOp::Add)),
            b'-' => single(&mut pos, TokenKind::Arith(ArithOp::Sub)),
            b'*' => single(&mut pos, TokenKind::Arith(ArithOp::Mul)),
            b'/' => single(&mut pos, TokenKind::Arith(ArithOp::Div)),
            b'=' | b'!' | b'<' | b'>' => lex_compare(bytes, &mut pos)?,
            b'\'' | b'"' => lex_string(source, &mut pos)?,
            b'0'..=b'9' => lex_number(source, &mut pos)?,
            c if c == b'_' || c.is_ascii_alphabetic() => lex_word(source, &mut pos),
            _ => {
                let ch = source[start..].chars().next().unwrap_or('?');
                return Err(SyntaxError::new(start, format!("unexpected character {:?}", ch)));
            }
        };

        tokens.push(Token { kind, offset: start });
    }

    Ok(tokens)
}

fn single(pos: &mut usize, kind: TokenKind) -> TokenKind {
    *pos += 1;
    kind
}

fn lex_compare(bytes: &[u8], pos: &mut usize) -> Result<TokenKind, SyntaxError> {
    let start = *pos;
    let followed_by_eq = bytes.get(start + 1) == Some(&b'=');
    let op = match (bytes[start], followed_by_eq) {
        (b'=', true) => CompareOp::Eq,
        (b'!', true) => CompareOp::Ne,
        (b'<', true) => CompareOp::Le,
        (b'>', true) => CompareOp::Ge,
        (b'<', false) => CompareOp::Lt,
        (b'>', false) => CompareOp::Gt,
        (c, _) => {
            return Err(SyntaxError::new(
                start,
                format!("unexpected character {:?}", c as char),
            ))
        }
    };
    *pos += if followed_by_eq { 2 } else { 1 };
    Ok(TokenKind::Compare(op))
}

fn lex_string(source: &str, pos: &mut usize) -> Result<TokenKind, SyntaxError> {
    let bytes = source.as_bytes();
    let start = *pos;
    let quote = bytes[start];
    let body_start = start + 1;
    let mut end = body_start;

    while end < bytes.len() && is_string_char(bytes[end]) {
        end += 1;
    }

    if end >= bytes.len() || bytes[end] != quote {
        return Err(SyntaxError::new(
            start,
            "unterminated string or character outside [A-Za-z0-9_ ]",
        ));
    }
    if end == body_start {
        return Err(SyntaxError::new(start, "empty string literal"));
    }

    *pos = end + 1;
    Ok(TokenKind::Str(source[body_start..end].to_string()))
}

fn is_string_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b' '
}

fn lex_number(source: &str, pos: &mut usize) -> Result<TokenKind, SyntaxError> {
    let bytes = source.as_bytes();
    let start = *pos;
    while *pos < bytes.len() && bytes[*pos].is_ascii_digit() {
        *pos += 1;
    }
    source[start..*pos]
        .parse::<u64>()
        .map(TokenKind::Number)
        .map_err(|_| SyntaxError::new(start, "integer literal out of range"))
}

fn lex_word(source: &str, pos: &mut usize) -> TokenKind {
    let bytes = source.as_bytes();
    let start = *pos;
    while *pos < bytes.len() && (bytes[*pos] == b'_' || bytes[*pos].is_ascii_alphanumeric()) {
        *pos += 1;
    }

    match &source[start..*pos] {
        "JSON" => TokenKind::Json,
        "True" => TokenKind::Reserved(Value::Bool(true)),
        "False" => TokenKind::Reserved(Value::Bool(false)),
        "None" => TokenKind::Reserved(Value::Null),
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "is" => TokenKind::Is,
        "in" => TokenKind::In,
        "not" => TokenKind::Not,
        word => TokenKind::Name(word.to_string()),
    }
}
