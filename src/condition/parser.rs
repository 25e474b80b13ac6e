//! When clause parser.
//!
//! # Grammar
//! ```text
//! expr     := operand (binop operand)*
//! binop    := '+' | '-' | '*' | '/' | '==' | '!=' | '<' | '<=' | '>' | '>='
//!           | 'and' | 'or' | 'is' | 'is' 'not' | 'in' | 'not' 'in'
//! operand  := '(' expr ')' | 'not' operand | jsonpath
//!           | STRING | RESWORD | NUMBER | NAME
//! jsonpath := 'JSON' ('[' expr ']')*
//! ```
//!
//! # Design Decisions
//! - Every binary operator shares one precedence level and folds to the left;
//!   parentheses are the only grouping mechanism
//! - Prefix `not` applies to the single operand that follows it
//! - Path indices are reduced to literals while parsing, so evaluation never
//!   computes a path step

use serde_json::Value;

use crate::condition::ast::{ArithOp, CompareOp, ConditionNode, JsonPath, LogicOp, Step};
use crate::condition::eval::evaluate;
use crate::condition::lexer::{Token, TokenKind};
use crate::condition::SyntaxError;

const MAX_DEPTH: usize = 64;

/// Parse a token stream into a condition tree.
pub fn parse(tokens: &[Token], source_len: usize) -> Result<ConditionNode, SyntaxError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        source_len,
    };
    if tokens.is_empty() {
        return Err(SyntaxError::new(0, "empty condition"));
    }
    let node = parser.expr()?;
    match parser.peek() {
        None => Ok(node),
        Some(token) => Err(SyntaxError::new(
            token.offset,
            format!("unexpected {}", token.kind.describe()),
        )),
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
    source_len: usize,
}

enum BinOp {
    Arith(ArithOp),
    Compare(CompareOp),
    Logic(LogicOp),
    In { negated: bool },
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eof(&self, expected: &str) -> SyntaxError {
        SyntaxError::new(
            self.source_len,
            format!("unexpected end of input, expected {}", expected),
        )
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), SyntaxError> {
        match self.next() {
            Some(token) if token.kind == kind => Ok(()),
            Some(token) => Err(SyntaxError::new(
                token.offset,
                format!("expected {}, found {}", kind.describe(), token.kind.describe()),
            )),
            None => Err(self.eof(&kind.describe())),
        }
    }

    /// Left-folding builds a tree one level deeper per operator, so the
    /// chain length counts against the same budget as nesting.
    fn expr(&mut self) -> Result<ConditionNode, SyntaxError> {
        let mut left = self.operand()?;
        let mut height = left.height();
        loop {
            let offset = self.peek().map(|t| t.offset).unwrap_or(self.source_len);
            let Some(op) = self.binop()? else {
                break;
            };
            let right = self.operand()?;
            height = height.max(right.height()) + 1;
            if self.depth + height > MAX_DEPTH {
                return Err(SyntaxError::new(offset, "expression nested too deeply"));
            }
            left = match op {
                BinOp::Arith(op) => ConditionNode::Arith(op, Box::new(left), Box::new(right)),
                BinOp::Compare(op) => ConditionNode::Compare(op, Box::new(left), Box::new(right)),
                BinOp::Logic(op) => ConditionNode::Logic(op, Box::new(left), Box::new(right)),
                BinOp::In { negated } => ConditionNode::Membership {
                    negated,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            };
        }
        Ok(left)
    }

    /// Consume a binary operator if one follows.
    fn binop(&mut self) -> Result<Option<BinOp>, SyntaxError> {
        let Some(token) = self.peek() else {
            return Ok(None);
        };
        let op = match &token.kind {
            TokenKind::Arith(op) => BinOp::Arith(*op),
            TokenKind::Compare(op) => BinOp::Compare(*op),
            TokenKind::And => BinOp::Logic(LogicOp::And),
            TokenKind::Or => BinOp::Logic(LogicOp::Or),
            TokenKind::In => BinOp::In { negated: false },
            TokenKind::Is => {
                self.pos += 1;
                if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Not)) {
                    self.pos += 1;
                    return Ok(Some(BinOp::Logic(LogicOp::IsNot)));
                }
                return Ok(Some(BinOp::Logic(LogicOp::Is)));
            }
            TokenKind::Not => {
                self.pos += 1;
                match self.next() {
                    Some(t) if t.kind == TokenKind::In => {
                        return Ok(Some(BinOp::In { negated: true }))
                    }
                    Some(t) => {
                        return Err(SyntaxError::new(
                            t.offset,
                            format!("expected 'in' after 'not', found {}", t.kind.describe()),
                        ))
                    }
                    None => return Err(self.eof("'in'")),
                }
            }
            // Closing brackets end the current expression; anything else is left
            // for the caller to reject.
            _ => return Ok(None),
        };
        self.pos += 1;
        Ok(Some(op))
    }

    fn operand(&mut self) -> Result<ConditionNode, SyntaxError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            let offset = self.peek().map(|t| t.offset).unwrap_or(self.source_len);
            return Err(SyntaxError::new(offset, "expression nested too deeply"));
        }
        let node = self.primary();
        self.depth -= 1;
        node
    }

    fn primary(&mut self) -> Result<ConditionNode, SyntaxError> {
        let Some(token) = self.next() else {
            return Err(self.eof("an operand"));
        };
        match &token.kind {
            TokenKind::LParen => {
                let inner = self.expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Not => Ok(ConditionNode::Not(Box::new(self.operand()?))),
            TokenKind::Json => self.json_path(),
            TokenKind::Str(s) => Ok(ConditionNode::Literal(Value::String(s.clone()))),
            TokenKind::Number(n) => Ok(ConditionNode::Literal(Value::from(*n))),
            TokenKind::Reserved(v) => Ok(ConditionNode::Literal(v.clone())),
            TokenKind::Name(name) => Ok(ConditionNode::NameRef(name.clone())),
            other => Err(SyntaxError::new(
                token.offset,
                format!("unexpected {}", other.describe()),
            )),
        }
    }

    fn json_path(&mut self) -> Result<ConditionNode, SyntaxError> {
        let mut path = JsonPath::default();
        while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::LBracket)) {
            self.pos += 1;
            let index_offset = self.peek().map(|t| t.offset).unwrap_or(self.source_len);
            let index = self.expr()?;
            self.expect(TokenKind::RBracket)?;
            path.push(reduce_step(&index, index_offset)?);
        }
        Ok(ConditionNode::PathRef(path))
    }
}

/// Reduce a bracketed path index to a key or a list index.
fn reduce_step(node: &ConditionNode, offset: usize) -> Result<Step, SyntaxError> {
    if !node.is_constant() {
        return Err(SyntaxError::new(
            offset,
            format!("path index {} is not a constant", node),
        ));
    }
    match evaluate(node, &Value::Null).into_owned() {
        Value::String(key) => Ok(Step::Key(key)),
        Value::Number(n) => n
            .as_u64()
            .and_then(|i| usize::try_from(i).ok())
            .map(Step::Index)
            .ok_or_else(|| {
                SyntaxError::new(offset, format!("path index {} is not a non-negative integer", n))
            }),
        other => Err(SyntaxError::new(
            offset,
            format!("path index must be a string or an integer, got {}", other),
        )),
    }
}
