//! Runtime values.
//!
//! Evaluation errors are ordinary values (`Value::Error`) so they can
//! flow through the evaluator and short-circuit it; `Value::Return` is
//! the internal carrier that bubbles a value out of nested blocks until
//! the enclosing program or call unwraps it.

use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::ptr;
use std::rc::Rc;

use crate::ast::Block;
use crate::env::Environment;

/// Host callable: receives the evaluated arguments and the evaluator's
/// output sink.
pub type BuiltinFn = fn(&[Value], &mut dyn Write) -> Value;

#[derive(Debug, PartialEq, Clone)]
pub enum Value {
    Integer(i64),
    Boolean(bool),
    Null,
    Str(String),
    Return(Box<Value>),
    Error(String),
    Function(Rc<Function>),
    Builtin(BuiltinFn),
    Array(Vec<Value>),
    Hash(HashMap<HashKey, HashPair>),
}

/// A user-defined function: parameters, body, and the environment that
/// was active at its definition site (closure capture).
#[derive(Clone)]
pub struct Function {
    pub params: Vec<String>,
    pub body: Block,
    pub env: Rc<Environment>,
}

// The captured environment can reach back to this function, so neither
// Debug nor PartialEq may walk into it.
impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("params", &self.params)
            .finish()
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self, other)
    }
}

impl Eq for Function {}

/// Key derived from a hashable value: its type tag plus a 64-bit hash.
///
/// Lookups compare keys only through this pair; colliding strings are not
/// re-verified against the original key.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct HashKey {
    kind: &'static str,
    value: u64,
}

#[derive(Debug, PartialEq, Clone)]
pub struct HashPair {
    pub key: Value,
    pub value: Value,
}

impl Value {
    /// Type tag used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "INTEGER",
            Value::Boolean(_) => "BOOLEAN",
            Value::Null => "NULL",
            Value::Str(_) => "STRING",
            Value::Return(_) => "RETURN_VALUE",
            Value::Error(_) => "ERROR",
            Value::Function(_) => "FUNCTION",
            Value::Builtin(_) => "BUILTIN",
            Value::Array(_) => "ARRAY",
            Value::Hash(_) => "HASH",
        }
    }

    /// Derive the hash key for this value, or `None` if the value's kind
    /// is not hashable. Only integers, booleans, and strings are.
    pub fn hash_key(&self) -> Option<HashKey> {
        let key = match self {
            Value::Integer(value) => HashKey {
                kind: self.type_name(),
                value: *value as u64,
            },
            Value::Boolean(value) => HashKey {
                kind: self.type_name(),
                value: u64::from(*value),
            },
            Value::Str(value) => HashKey {
                kind: self.type_name(),
                value: fnv1a(value.as_bytes()),
            },
            _ => return None,
        };
        Some(key)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Everything but the `false` and `null` singletons is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Boolean(false) | Value::Null)
    }
}

/// 64-bit FNV-1a over the value's bytes, the string hash of the hash-key
/// scheme.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = OFFSET_BASIS;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(value) => write!(f, "{}", value),
            Value::Boolean(value) => write!(f, "{}", value),
            Value::Null => f.write_str("null"),
            Value::Str(value) => f.write_str(value),
            Value::Return(value) => write!(f, "{}", value),
            Value::Error(message) => write!(f, "ERROR: {}", message),
            Value::Function(func) => {
                write!(f, "fn({}) {{\n{}\n}}", func.params.join(", "), func.body)
            }
            Value::Builtin(_) => f.write_str("builtin function"),
            Value::Array(elements) => {
                let rendered = elements
                    .iter()
                    .map(Value::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "[{}]", rendered)
            }
            Value::Hash(pairs) => {
                // Map iteration order is unspecified.
                let rendered = pairs
                    .values()
                    .map(|pair| format!("{}:{}", pair.key, pair.value))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{{{}}}", rendered)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, InfixOp, Stmt};

    #[test]
    fn string_hash_keys_follow_content() {
        let hello1 = Value::Str("Hello World".to_string());
        let hello2 = Value::Str("Hello World".to_string());
        let diff1 = Value::Str("My name is johnny".to_string());
        let diff2 = Value::Str("My name is johnny".to_string());

        assert_eq!(hello1.hash_key(), hello2.hash_key());
        assert_eq!(diff1.hash_key(), diff2.hash_key());
        assert_ne!(hello1.hash_key(), diff1.hash_key());
    }

    #[test]
    fn hash_keys_are_distinct_across_types() {
        // `1`, `true`, and `"1"` must never collide on the type tag.
        let int = Value::Integer(1).hash_key();
        let boolean = Value::Boolean(true).hash_key();
        let string = Value::Str("1".to_string()).hash_key();
        assert_ne!(int, boolean);
        assert_ne!(int, string);
        assert_ne!(boolean, string);
    }

    #[test]
    fn negative_integers_are_hashable() {
        assert_eq!(
            Value::Integer(-1).hash_key(),
            Value::Integer(-1).hash_key()
        );
        assert_ne!(Value::Integer(-1).hash_key(), Value::Integer(1).hash_key());
    }

    #[test]
    fn only_integers_booleans_and_strings_are_hashable() {
        assert!(Value::Null.hash_key().is_none());
        assert!(Value::Array(vec![]).hash_key().is_none());
        assert!(Value::Hash(HashMap::new()).hash_key().is_none());
    }

    #[test]
    fn printable_forms() {
        assert_eq!(Value::Integer(5).to_string(), "5");
        assert_eq!(Value::Boolean(true).to_string(), "true");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Str("hi".to_string()).to_string(), "hi");
        assert_eq!(
            Value::Error("type mismatch: INTEGER + BOOLEAN".to_string()).to_string(),
            "ERROR: type mismatch: INTEGER + BOOLEAN"
        );
        assert_eq!(
            Value::Array(vec![Value::Integer(1), Value::Integer(2)]).to_string(),
            "[1, 2]"
        );
        assert_eq!(
            Value::Return(Box::new(Value::Integer(7))).to_string(),
            "7"
        );
    }

    #[test]
    fn function_printable_form() {
        let func = Function {
            params: vec!["x".to_string()],
            body: Block {
                statements: vec![Stmt::Expr(Expr::Infix {
                    op: InfixOp::Plus,
                    left: Box::new(Expr::Ident("x".to_string())),
                    right: Box::new(Expr::Int(2)),
                })],
            },
            env: Environment::new_root(),
        };
        assert_eq!(
            Value::Function(Rc::new(func)).to_string(),
            "fn(x) {\n(x + 2)\n}"
        );
    }

    #[test]
    fn single_entry_hash_printable_form() {
        let key = Value::Str("one".to_string());
        let mut pairs = HashMap::new();
        pairs.insert(
            key.hash_key().expect("string keys hash"),
            HashPair {
                key,
                value: Value::Integer(1),
            },
        );
        assert_eq!(Value::Hash(pairs).to_string(), "{one:1}");
    }

    #[test]
    fn type_names() {
        assert_eq!(Value::Integer(1).type_name(), "INTEGER");
        assert_eq!(Value::Boolean(true).type_name(), "BOOLEAN");
        assert_eq!(Value::Null.type_name(), "NULL");
        assert_eq!(Value::Str(String::new()).type_name(), "STRING");
        assert_eq!(
            Value::Return(Box::new(Value::Null)).type_name(),
            "RETURN_VALUE"
        );
        assert_eq!(Value::Error(String::new()).type_name(), "ERROR");
        assert_eq!(Value::Array(vec![]).type_name(), "ARRAY");
        assert_eq!(Value::Hash(HashMap::new()).type_name(), "HASH");
    }

    #[test]
    fn truthiness() {
        assert!(Value::Integer(0).is_truthy());
        assert!(Value::Boolean(true).is_truthy());
        assert!(Value::Str(String::new()).is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
        assert!(!Value::Null.is_truthy());
    }
}
