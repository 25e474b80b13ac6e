//! Condition syntax tree.
//!
//! Trees are built once when a rule is loaded and are never mutated afterwards,
//! so a single `Condition` can be evaluated from any number of tasks at once.

use std::fmt;

use serde_json::Value;

/// One step of a JSON path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Key(String),
    Index(usize),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Key(key) => write!(f, "['{}']", key),
            Step::Index(index) => write!(f, "[{}]", index),
        }
    }
}

/// Ordered sequence of steps extracting a nested value from a payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonPath {
    steps: Vec<Step>,
}

impl JsonPath {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JSON")?;
        for step in &self.steps {
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
    Is,
    IsNot,
}

impl ArithOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

impl LogicOp {
    pub fn symbol(self) -> &'static str {
        match self {
            LogicOp::And => "and",
            LogicOp::Or => "or",
            LogicOp::Is => "is",
            LogicOp::IsNot => "is not",
        }
    }
}

/// A node of a compiled when clause.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionNode {
    Literal(Value),
    PathRef(JsonPath),
    /// Bare identifier. Evaluates to its own text.
    NameRef(String),
    Not(Box<ConditionNode>),
    Arith(ArithOp, Box<ConditionNode>, Box<ConditionNode>),
    Compare(CompareOp, Box<ConditionNode>, Box<ConditionNode>),
    Logic(LogicOp, Box<ConditionNode>, Box<ConditionNode>),
    Membership {
        negated: bool,
        left: Box<ConditionNode>,
        right: Box<ConditionNode>,
    },
}

impl ConditionNode {
    /// True when the subtree reads nothing from the payload and no bare names.
    pub fn is_constant(&self) -> bool {
        match self {
            ConditionNode::Literal(_) => true,
            ConditionNode::PathRef(_) | ConditionNode::NameRef(_) => false,
            ConditionNode::Not(inner) => inner.is_constant(),
            ConditionNode::Arith(_, l, r)
            | ConditionNode::Compare(_, l, r)
            | ConditionNode::Logic(_, l, r) => l.is_constant() && r.is_constant(),
            ConditionNode::Membership { left, right, .. } => {
                left.is_constant() && right.is_constant()
            }
        }
    }

    /// Levels in the subtree; a leaf is 1.
    pub fn height(&self) -> usize {
        match self {
            ConditionNode::Literal(_) | ConditionNode::PathRef(_) | ConditionNode::NameRef(_) => 1,
            ConditionNode::Not(inner) => inner.height() + 1,
            ConditionNode::Arith(_, l, r)
            | ConditionNode::Compare(_, l, r)
            | ConditionNode::Logic(_, l, r)
            | ConditionNode::Membership {
                left: l, right: r, ..
            } => l.height().max(r.height()) + 1,
        }
    }
}

impl fmt::Display for ConditionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionNode::Literal(Value::Null) => write!(f, "None"),
            ConditionNode::Literal(Value::Bool(true)) => write!(f, "True"),
            ConditionNode::Literal(Value::Bool(false)) => write!(f, "False"),
            ConditionNode::Literal(Value::String(s)) => write!(f, "'{}'", s),
            ConditionNode::Literal(other) => write!(f, "{}", other),
            ConditionNode::PathRef(path) => write!(f, "{}", path),
            ConditionNode::NameRef(name) => write!(f, "{}", name),
            ConditionNode::Not(inner) => write!(f, "(not {})", inner),
            ConditionNode::Arith(op, l, r) => write!(f, "({} {} {})", l, op.symbol(), r),
            ConditionNode::Compare(op, l, r) => write!(f, "({} {} {})", l, op.symbol(), r),
            ConditionNode::Logic(op, l, r) => write!(f, "({} {} {})", l, op.symbol(), r),
            ConditionNode::Membership { negated, left, right } => {
                let op = if *negated { "not in" } else { "in" };
                write!(f, "({} {} {})", left, op, right)
            }
        }
    }
}

/// A compiled when clause together with the text it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    source: String,
    root: ConditionNode,
}

impl Condition {
    pub fn new(source: impl Into<String>, root: ConditionNode) -> Self {
        Self {
            source: source.into(),
            root,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &ConditionNode {
        &self.root
    }
}
