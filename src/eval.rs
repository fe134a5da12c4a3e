//! Tree-walking evaluator.
//!
//! `Value::Error` short-circuits every surrounding operation;
//! `Value::Return` bubbles through nested blocks and is unwrapped at the
//! program and call boundaries. Statements that bind without producing a
//! value yield `None`.

use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use crate::ast::{Block, Expr, InfixOp, PrefixOp, Program, Stmt};
use crate::builtins;
use crate::env::Environment;
use crate::object::{Function, HashPair, Value};

/// Walks a program against an environment chain, writing `puts` output to
/// the sink it was constructed with.
#[derive(Debug)]
pub struct Evaluator<'a, W: Write> {
    output: &'a mut W,
}

impl<'a, W: Write> Evaluator<'a, W> {
    pub fn new(output: &'a mut W) -> Evaluator<'a, W> {
        Evaluator { output }
    }

    /// Evaluate a program. `None` means the last statement produced no
    /// value (e.g. a trailing `let`).
    pub fn eval(&mut self, program: &Program, env: &Rc<Environment>) -> Option<Value> {
        let mut result = None;
        for stmt in &program.statements {
            result = self.eval_stmt(stmt, env);
            match result {
                Some(Value::Error(_)) => return result,
                Some(Value::Return(value)) => return Some(*value),
                _ => (),
            }
        }
        result
    }

    fn eval_stmt(&mut self, stmt: &Stmt, env: &Rc<Environment>) -> Option<Value> {
        match stmt {
            Stmt::Expr(expr) => Some(self.eval_expr(expr, env)),
            Stmt::Let { name, value } => {
                let value = self.eval_expr(value, env);
                if value.is_error() {
                    return Some(value);
                }
                env.set(name, value);
                None
            }
            Stmt::Return(expr) => {
                let value = self.eval_expr(expr, env);
                if value.is_error() {
                    Some(value)
                } else {
                    Some(Value::Return(Box::new(value)))
                }
            }
            Stmt::Block(block) => self.eval_block(block, env),
        }
    }

    /// Unlike `eval`, keeps `Value::Return` wrapped so it bubbles through
    /// enclosing blocks.
    fn eval_block(&mut self, block: &Block, env: &Rc<Environment>) -> Option<Value> {
        let mut result = None;
        for stmt in &block.statements {
            result = self.eval_stmt(stmt, env);
            match result {
                Some(Value::Error(_)) | Some(Value::Return(_)) => return result,
                _ => (),
            }
        }
        result
    }

    fn eval_expr(&mut self, expr: &Expr, env: &Rc<Environment>) -> Value {
        match expr {
            Expr::Int(value) => Value::Integer(*value),
            Expr::Bool(value) => Value::Boolean(*value),
            Expr::Str(value) => Value::Str(value.clone()),
            Expr::Ident(name) => eval_identifier(name, env),
            Expr::Prefix { op, right } => {
                let right = self.eval_expr(right, env);
                if right.is_error() {
                    return right;
                }
                eval_prefix(*op, right)
            }
            Expr::Infix { op, left, right } => {
                let left = self.eval_expr(left, env);
                if left.is_error() {
                    return left;
                }
                let right = self.eval_expr(right, env);
                if right.is_error() {
                    return right;
                }
                eval_infix(*op, left, right)
            }
            Expr::If {
                condition,
                consequence,
                alternative,
            } => {
                let condition = self.eval_expr(condition, env);
                if condition.is_error() {
                    return condition;
                }
                if condition.is_truthy() {
                    self.eval_block(consequence, env).unwrap_or(Value::Null)
                } else if let Some(alt) = alternative {
                    self.eval_block(alt, env).unwrap_or(Value::Null)
                } else {
                    Value::Null
                }
            }
            Expr::Function { params, body } => Value::Function(Rc::new(Function {
                params: params.clone(),
                body: body.clone(),
                env: Rc::clone(env),
            })),
            Expr::Call { function, args } => {
                let function = self.eval_expr(function, env);
                if function.is_error() {
                    return function;
                }
                let args = match self.eval_expressions(args, env) {
                    Ok(values) => values,
                    Err(err) => return err,
                };
                self.apply_function(function, &args)
            }
            Expr::Array(elements) => match self.eval_expressions(elements, env) {
                Ok(values) => Value::Array(values),
                Err(err) => err,
            },
            Expr::Index { left, index } => {
                let left = self.eval_expr(left, env);
                if left.is_error() {
                    return left;
                }
                let index = self.eval_expr(index, env);
                if index.is_error() {
                    return index;
                }
                eval_index(left, index)
            }
            Expr::Hash(pairs) => self.eval_hash_literal(pairs, env),
        }
    }

    /// Evaluate left-to-right, stopping at the first error.
    fn eval_expressions(
        &mut self,
        exprs: &[Expr],
        env: &Rc<Environment>,
    ) -> Result<Vec<Value>, Value> {
        let mut values = Vec::with_capacity(exprs.len());
        for expr in exprs {
            let value = self.eval_expr(expr, env);
            if value.is_error() {
                return Err(value);
            }
            values.push(value);
        }
        Ok(values)
    }

    fn apply_function(&mut self, function: Value, args: &[Value]) -> Value {
        match function {
            Value::Function(func) => {
                // The call frame encloses the environment captured at the
                // function's definition site, not the call site.
                let env = Environment::new_enclosed(Rc::clone(&func.env));
                for (param, arg) in func.params.iter().zip(args) {
                    env.set(param, arg.clone());
                }
                match self.eval_block(&func.body, &env) {
                    Some(Value::Return(value)) => *value,
                    Some(value) => value,
                    None => Value::Null,
                }
            }
            Value::Builtin(func) => func(args, self.output),
            other => Value::Error(format!("not a function: {}", other.type_name())),
        }
    }

    fn eval_hash_literal(&mut self, pairs: &[(Expr, Expr)], env: &Rc<Environment>) -> Value {
        let mut map = HashMap::new();
        for (key_expr, value_expr) in pairs {
            let key = self.eval_expr(key_expr, env);
            if key.is_error() {
                return key;
            }
            let hash_key = match key.hash_key() {
                Some(hash_key) => hash_key,
                None => {
                    return Value::Error(format!("unusable as hash key: {}", key.type_name()))
                }
            };
            let value = self.eval_expr(value_expr, env);
            if value.is_error() {
                return value;
            }
            // Later duplicates overwrite earlier ones.
            map.insert(hash_key, HashPair { key, value });
        }
        Value::Hash(map)
    }
}

fn eval_identifier(name: &str, env: &Rc<Environment>) -> Value {
    if let Some(value) = env.get(name) {
        value
    } else if let Some(builtin) = builtins::lookup(name) {
        builtin
    } else {
        Value::Error(format!("identifier not found: {}", name))
    }
}

fn eval_prefix(op: PrefixOp, right: Value) -> Value {
    match op {
        PrefixOp::Bang => match right {
            Value::Boolean(value) => Value::Boolean(!value),
            Value::Null => Value::Boolean(true),
            _ => Value::Boolean(false),
        },
        PrefixOp::Minus => match right {
            Value::Integer(value) => Value::Integer(value.wrapping_neg()),
            other => Value::Error(format!("unknown operator: -{}", other.type_name())),
        },
    }
}

// Clause order is part of the semantics: integers, then strings, then the
// identity fallback for ==/!=, then the type checks.
fn eval_infix(op: InfixOp, left: Value, right: Value) -> Value {
    match (left, right) {
        (Value::Integer(left), Value::Integer(right)) => eval_integer_infix(op, left, right),
        (Value::Str(left), Value::Str(right)) => match op {
            InfixOp::Plus => Value::Str(left + &right),
            _ => Value::Error(format!("unknown operator: STRING {} STRING", op)),
        },
        (left, right) => match op {
            InfixOp::Eq => Value::Boolean(values_identical(&left, &right)),
            InfixOp::NotEq => Value::Boolean(!values_identical(&left, &right)),
            _ if left.type_name() != right.type_name() => Value::Error(format!(
                "type mismatch: {} {} {}",
                left.type_name(),
                op,
                right.type_name()
            )),
            _ => Value::Error(format!(
                "unknown operator: {} {} {}",
                left.type_name(),
                op,
                right.type_name()
            )),
        },
    }
}

/// Equality on the non-integer path: booleans and null behave like the
/// interned singletons they are; every other pairing compares unequal.
fn values_identical(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Boolean(left), Value::Boolean(right)) => left == right,
        (Value::Null, Value::Null) => true,
        _ => false,
    }
}

/// Arithmetic wraps on overflow (two's complement); division by zero is
/// trapped as an error value rather than left to the host.
fn eval_integer_infix(op: InfixOp, left: i64, right: i64) -> Value {
    match op {
        InfixOp::Plus => Value::Integer(left.wrapping_add(right)),
        InfixOp::Minus => Value::Integer(left.wrapping_sub(right)),
        InfixOp::Asterisk => Value::Integer(left.wrapping_mul(right)),
        InfixOp::Slash => {
            if right == 0 {
                Value::Error("division by zero".to_string())
            } else {
                Value::Integer(left.wrapping_div(right))
            }
        }
        InfixOp::Lt => Value::Boolean(left < right),
        InfixOp::Gt => Value::Boolean(left > right),
        InfixOp::Eq => Value::Boolean(left == right),
        InfixOp::NotEq => Value::Boolean(left != right),
    }
}

fn eval_index(left: Value, index: Value) -> Value {
    match (left, index) {
        (Value::Array(elements), Value::Integer(i)) => {
            if i < 0 {
                Value::Null
            } else {
                elements.get(i as usize).cloned().unwrap_or(Value::Null)
            }
        }
        (Value::Hash(pairs), key) => match key.hash_key() {
            Some(hash_key) => pairs
                .get(&hash_key)
                .map(|pair| pair.value.clone())
                .unwrap_or(Value::Null),
            None => Value::Error(format!("unusable as hash key: {}", key.type_name())),
        },
        (left, _) => Value::Error(format!(
            "index operator not supported: {}",
            left.type_name()
        )),
    }
}
