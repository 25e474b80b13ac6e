//! Condition evaluation.
//!
//! # Responsibilities
//! - Walk a compiled condition against one payload
//! - Apply the DSL's value semantics (truthiness, equality, membership)
//!
//! # Design Decisions
//! - Total: type mismatches produce `null` and a debug log, never an error
//! - Borrowing: literals and path results are returned by reference, only
//!   computed values allocate
//! - `and`/`or` return one of their operands and skip the right side when the
//!   left side already decides the result

use std::borrow::Cow;
use std::cmp::Ordering;

use serde_json::{Number, Value};

use crate::condition::ast::{ArithOp, CompareOp, ConditionNode, LogicOp};
use crate::condition::path::resolve;

/// Evaluate `node` against `doc`.
pub fn evaluate<'a>(node: &'a ConditionNode, doc: &'a Value) -> Cow<'a, Value> {
    match node {
        ConditionNode::Literal(value) => Cow::Borrowed(value),
        ConditionNode::PathRef(path) => Cow::Borrowed(resolve(doc, path)),
        ConditionNode::NameRef(name) => Cow::Owned(Value::String(name.clone())),
        ConditionNode::Not(inner) => Cow::Owned(Value::Bool(!truthy(&evaluate(inner, doc)))),
        ConditionNode::Arith(op, l, r) => {
            Cow::Owned(arith(*op, &evaluate(l, doc), &evaluate(r, doc)))
        }
        ConditionNode::Compare(op, l, r) => {
            Cow::Owned(compare(*op, &evaluate(l, doc), &evaluate(r, doc)))
        }
        ConditionNode::Logic(LogicOp::And, l, r) => {
            let left = evaluate(l, doc);
            if truthy(&left) {
                evaluate(r, doc)
            } else {
                left
            }
        }
        ConditionNode::Logic(LogicOp::Or, l, r) => {
            let left = evaluate(l, doc);
            if truthy(&left) {
                left
            } else {
                evaluate(r, doc)
            }
        }
        ConditionNode::Logic(op @ (LogicOp::Is | LogicOp::IsNot), l, r) => {
            let result = identical(&evaluate(l, doc), &evaluate(r, doc));
            Cow::Owned(match result {
                Some(same) => Value::Bool(if *op == LogicOp::IsNot { !same } else { same }),
                None => Value::Null,
            })
        }
        ConditionNode::Membership { negated, left, right } => {
            let result = contains(&evaluate(right, doc), &evaluate(left, doc));
            Cow::Owned(match result {
                Some(found) => Value::Bool(found != *negated),
                None => Value::Null,
            })
        }
    }
}

/// Truthiness: `null`, `false`, zero, empty strings and empty collections are false.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Structural equality. Numbers compare by value (`1 == 1.0`); no other
/// cross-kind coercion happens.
pub fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => num_cmp(x, y) == Some(Ordering::Equal),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_eq(x, y))
        }
        (Value::Object(xm), Value::Object(ym)) => {
            xm.len() == ym.len()
                && xm
                    .iter()
                    .all(|(k, x)| ym.get(k).map(|y| json_eq(x, y)).unwrap_or(false))
        }
        _ => a == b,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn num_cmp(x: &Number, y: &Number) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return Some(a.cmp(&b));
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return Some(a.cmp(&b));
    }
    x.as_f64()?.partial_cmp(&y.as_f64()?)
}

fn arith(op: ArithOp, left: &Value, right: &Value) -> Value {
    let (Value::Number(x), Value::Number(y)) = (left, right) else {
        tracing::debug!(
            op = op.symbol(),
            left = kind(left),
            right = kind(right),
            "Arithmetic on non-numbers, yielding null"
        );
        return Value::Null;
    };

    if op != ArithOp::Div {
        if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
            let exact = match op {
                ArithOp::Add => a.checked_add(b),
                ArithOp::Sub => a.checked_sub(b),
                ArithOp::Mul => a.checked_mul(b),
                ArithOp::Div => None,
            };
            if let Some(n) = exact {
                return Value::from(n);
            }
        }
    }

    let (Some(a), Some(b)) = (x.as_f64(), y.as_f64()) else {
        return Value::Null;
    };
    let result = match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div if b == 0.0 => {
            tracing::debug!("Division by zero, yielding null");
            return Value::Null;
        }
        ArithOp::Div => a / b,
    };
    Number::from_f64(result).map(Value::Number).unwrap_or(Value::Null)
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Value {
    let holds: fn(Ordering) -> bool = match op {
        CompareOp::Eq => return Value::Bool(json_eq(left, right)),
        CompareOp::Ne => return Value::Bool(!json_eq(left, right)),
        CompareOp::Lt => |o| o == Ordering::Less,
        CompareOp::Le => |o| o != Ordering::Greater,
        CompareOp::Gt => |o| o == Ordering::Greater,
        CompareOp::Ge => |o| o != Ordering::Less,
    };

    let ordering = match (left, right) {
        (Value::Number(x), Value::Number(y)) => num_cmp(x, y),
        _ => None,
    };
    match ordering {
        Some(ordering) => Value::Bool(holds(ordering)),
        None => {
            tracing::debug!(
                op = op.symbol(),
                left = kind(left),
                right = kind(right),
                "Ordering comparison on non-numbers, yielding null"
            );
            Value::Null
        }
    }
}

/// Identity test. Meaningful against `None`, and between booleans.
fn identical(left: &Value, right: &Value) -> Option<bool> {
    match (left, right) {
        (Value::Null, other) | (other, Value::Null) => Some(other.is_null()),
        (Value::Bool(a), Value::Bool(b)) => Some(a == b),
        _ => {
            tracing::debug!(
                left = kind(left),
                right = kind(right),
                "Identity test between non-singletons, yielding null"
            );
            None
        }
    }
}

fn contains(container: &Value, item: &Value) -> Option<bool> {
    match (container, item) {
        (Value::Array(items), _) => Some(items.iter().any(|x| json_eq(x, item))),
        (Value::String(haystack), Value::String(needle)) => Some(haystack.contains(needle.as_str())),
        _ => {
            tracing::debug!(
                container = kind(container),
                item = kind(item),
                "Membership test on unsupported kinds, yielding null"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::compile;
    use serde_json::json;

    fn eval_str(source: &str, doc: &Value) -> Value {
        let condition = compile("test", source).unwrap();
        evaluate(condition.root(), doc).into_owned()
    }

    #[test]
    fn test_truthiness() {
        for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!(""), json!([]), json!({})] {
            assert!(!truthy(&falsy), "{} should be falsy", falsy);
        }
        for t in [json!(true), json!(1), json!(-0.5), json!("a"), json!([0]), json!({"a": null})] {
            assert!(truthy(&t), "{} should be truthy", t);
        }
    }

    #[test]
    fn test_equality() {
        let doc = json!({"n": 1.0, "s": "1", "b": true, "l": [1, {"k": 2}]});
        assert_eq!(eval_str("JSON['n'] == 1", &doc), json!(true));
        assert_eq!(eval_str("JSON['s'] == 1", &doc), json!(false));
        assert_eq!(eval_str("JSON['b'] == 1", &doc), json!(false));
        assert_eq!(eval_str("JSON['b'] == True", &doc), json!(true));
        assert_eq!(eval_str("JSON['missing'] == None", &doc), json!(true));
        assert_eq!(eval_str("JSON['s'] != '1'", &doc), json!(false));
        assert!(json_eq(&doc["l"], &json!([1.0, {"k": 2}])));
        assert!(!json_eq(&doc["l"], &json!([1, {"k": 3}])));
    }

    #[test]
    fn test_ordering_requires_numbers() {
        let doc = json!({"n": 5, "s": "b"});
        assert_eq!(eval_str("JSON['n'] > 3", &doc), json!(true));
        assert_eq!(eval_str("JSON['n'] <= 5", &doc), json!(true));
        assert_eq!(eval_str("JSON['n'] < 5", &doc), json!(false));
        assert_eq!(eval_str("JSON['s'] > 'a'", &doc), Value::Null);
        assert_eq!(eval_str("JSON['missing'] >= 1", &doc), Value::Null);
    }

    #[test]
    fn test_arithmetic() {
        let doc = json!({"a": 7, "b": 2, "f": 0.5});
        assert_eq!(eval_str("JSON['a'] + JSON['b']", &doc), json!(9));
        assert_eq!(eval_str("JSON['a'] - JSON['b']", &doc), json!(5));
        assert_eq!(eval_str("JSON['a'] * JSON['b']", &doc), json!(14));
        assert_eq!(eval_str("JSON['a'] / JSON['b']", &doc), json!(3.5));
        assert_eq!(eval_str("JSON['a'] * JSON['f']", &doc), json!(3.5));
        assert_eq!(eval_str("JSON['a'] / 0", &doc), Value::Null);
        assert_eq!(eval_str("JSON['missing'] + 1", &doc), Value::Null);
        assert_eq!(eval_str("'a' + 'b'", &doc), Value::Null);
    }

    #[test]
    fn test_and_or_return_operands() {
        let doc = json!({"x": "value", "e": ""});
        assert_eq!(eval_str("JSON['x'] and 5", &doc), json!(5));
        assert_eq!(eval_str("JSON['e'] and 5", &doc), json!(""));
        assert_eq!(eval_str("JSON['e'] or JSON['x']", &doc), json!("value"));
        assert_eq!(eval_str("JSON['x'] or 5", &doc), json!("value"));
    }

    #[test]
    fn test_is_and_is_not() {
        let doc = json!({"a": null, "b": 0, "t": true});
        assert_eq!(eval_str("JSON['a'] is None", &doc), json!(true));
        assert_eq!(eval_str("JSON['missing'] is None", &doc), json!(true));
        assert_eq!(eval_str("JSON['b'] is None", &doc), json!(false));
        assert_eq!(eval_str("JSON['b'] is not None", &doc), json!(true));
        assert_eq!(eval_str("JSON['t'] is True", &doc), json!(true));
        assert_eq!(eval_str("JSON['b'] is 0", &doc), Value::Null);
    }

    #[test]
    fn test_membership() {
        let doc = json!({"tags": ["a", "b", 3], "text": "hello world", "obj": {"a": 1}});
        assert_eq!(eval_str("'a' in JSON['tags']", &doc), json!(true));
        assert_eq!(eval_str("3 in JSON['tags']", &doc), json!(true));
        assert_eq!(eval_str("'z' in JSON['tags']", &doc), json!(false));
        assert_eq!(eval_str("'z' not in JSON['tags']", &doc), json!(true));
        assert_eq!(eval_str("'lo wo' in JSON['text']", &doc), json!(true));
        assert_eq!(eval_str("'xyz' not in JSON['text']", &doc), json!(true));
        assert_eq!(eval_str("1 in JSON['text']", &doc), Value::Null);
        assert_eq!(eval_str("'a' in JSON['obj']", &doc), Value::Null);
        assert_eq!(eval_str("'a' not in JSON['missing']", &doc), Value::Null);
    }

    #[test]
    fn test_not() {
        let doc = json!({"e": [], "x": 1});
        assert_eq!(eval_str("not JSON['e']", &doc), json!(true));
        assert_eq!(eval_str("not JSON['x']", &doc), json!(false));
        assert_eq!(eval_str("not not JSON['x']", &doc), json!(true));
    }

    #[test]
    fn test_bare_name_is_its_own_text() {
        assert_eq!(eval_str("push", &json!({})), json!("push"));
        assert_eq!(eval_str("JSON['event'] == push", &json!({"event": "push"})), json!(true));
    }

    #[test]
    fn test_and_short_circuits_on_absent_element() {
        let source = "JSON['a'][0] is not None and JSON['a'][0]['b']=='x'";
        let doc = json!({"a": []});
        assert_eq!(eval_str("JSON['a'][0] is not None", &doc), json!(false));
        assert_eq!(eval_str(source, &doc), json!(false));
    }

    #[test]
    fn test_evaluation_is_repeatable() {
        let condition = compile("test", "JSON['a'][0]['b'] == 'x' or JSON['n'] + 1 > 2").unwrap();
        let doc = json!({"a": [{"b": "y"}], "n": 5});
        let first = evaluate(condition.root(), &doc).into_owned();
        for _ in 0..10 {
            assert_eq!(evaluate(condition.root(), &doc).into_owned(), first);
        }
        assert_eq!(condition, compile("test", condition.source()).unwrap());
    }
}
