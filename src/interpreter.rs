//! API to control the interpreter.

use std::error::Error;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use crate::env::Environment;
use crate::eval::Evaluator;
use crate::lexer::Lexer;
use crate::object::Value;
use crate::parser::Parser;

/// Tree-walk interpreter session.
///
/// Successive `eval` calls share one root environment, so definitions
/// persist across calls:
///
/// ```
/// # use monkey::interpreter::{Interpreter, MonkeyError};
/// let mut output: Vec<u8> = Vec::new();
/// let mut interp = Interpreter::new(&mut output);
///
/// interp.eval("let max = fn(x, y) { if (x > y) { x } else { y } };")?;
///
/// let value = interp.eval("max(10, 20)")?.expect("value expected");
/// assert_eq!(value.to_string(), "20");
/// # Ok::<(), MonkeyError>(())
/// ```
#[derive(Debug)]
pub struct Interpreter<'a, W: Write> {
    env: Rc<Environment>,
    evaluator: Evaluator<'a, W>,
}

/// Errors the interpreter can raise before evaluation starts.
///
/// Runtime failures are not errors at this boundary: they are
/// `Value::Error` results, printable like any other value.
#[derive(Debug)]
pub enum MonkeyError {
    /// The parser rejected the source; one message per diagnostic.
    Parse(Vec<String>),
}

impl fmt::Display for MonkeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonkeyError::Parse(errors) => {
                write!(f, "parser errors:")?;
                for error in errors {
                    write!(f, "\n\t{}", error)?;
                }
                Ok(())
            }
        }
    }
}

impl Error for MonkeyError {}

impl<'a, W: Write> Interpreter<'a, W> {
    pub fn new(output: &'a mut W) -> Interpreter<'a, W> {
        Interpreter {
            env: Environment::new_root(),
            evaluator: Evaluator::new(output),
        }
    }

    /// Parse and evaluate `source`, returning the last statement's value
    /// (`None` when it produces no value, e.g. a trailing `let`).
    ///
    /// Nothing is evaluated when the parser reports diagnostics.
    pub fn eval(&mut self, source: &str) -> Result<Option<Value>, MonkeyError> {
        let mut parser = Parser::new(Lexer::new(source));
        let program = parser.parse_program();
        if !parser.errors().is_empty() {
            return Err(MonkeyError::Parse(parser.errors().to_vec()));
        }
        Ok(self.evaluator.eval(&program, &self.env))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interpret(input: &str) -> Result<String, MonkeyError> {
        let mut out: Vec<u8> = Vec::new();
        let mut interp = Interpreter::new(&mut out);
        let value = interp.eval(input)?;
        Ok(value.map(|v| v.to_string()).unwrap_or_default())
    }

    #[test]
    fn end_to_end_scenarios() -> Result<(), MonkeyError> {
        let cases = [
            ("5 + 5 * 2", "15"),
            (
                "let a = 5; let b = a > 3; let c = a * 99; if (b) { 10 } else { 1 };",
                "10",
            ),
            (
                "let newAdder = fn(x) { fn(y) { x + y } }; let addTwo = newAdder(2); addTwo(3);",
                "5",
            ),
            (
                "let map = fn(arr, f) { \
                     let iter = fn(a, acc) { \
                         if (len(a) == 0) { acc } else { iter(rest(a), push(acc, f(first(a)))) } \
                     }; \
                     iter(arr, []) \
                 }; \
                 map([1,2,3], fn(x){x*2});",
                "[2, 4, 6]",
            ),
            ("{\"one\": 1, \"two\": 2}[\"o\" + \"ne\"]", "1"),
            ("\"Hello\" + \" \" + \"World\"", "Hello World"),
            ("5 + true;", "ERROR: type mismatch: INTEGER + BOOLEAN"),
            ("foobar", "ERROR: identifier not found: foobar"),
            (
                "{\"name\": \"Monkey\"}[fn(x){x}];",
                "ERROR: unusable as hash key: FUNCTION",
            ),
        ];
        for (input, expected) in cases {
            assert_eq!(interpret(input)?, expected, "input: {:?}", input);
        }
        Ok(())
    }

    #[test]
    fn definitions_persist_across_eval_calls() -> Result<(), MonkeyError> {
        let mut out: Vec<u8> = Vec::new();
        let mut interp = Interpreter::new(&mut out);

        interp.eval("let double = fn(x) { x * 2 };")?;
        let value = interp.eval("double(21)")?.expect("value expected");
        assert_eq!(value, Value::Integer(42));
        Ok(())
    }

    #[test]
    fn trailing_let_produces_no_value() -> Result<(), MonkeyError> {
        let mut out: Vec<u8> = Vec::new();
        let mut interp = Interpreter::new(&mut out);
        assert_eq!(interp.eval("let a = 1;")?, None);
        Ok(())
    }

    #[test]
    fn parse_failure_is_reported_and_nothing_evaluates() {
        let mut out: Vec<u8> = Vec::new();
        let mut interp = Interpreter::new(&mut out);
        match interp.eval("let x 5; puts(1);") {
            Err(MonkeyError::Parse(errors)) => {
                assert_eq!(
                    errors,
                    vec!["expected next token to be =, got INT instead".to_string()]
                );
            }
            r => panic!("unexpected output: {:?}", r),
        }
        assert!(out.is_empty(), "evaluation ran despite parse errors");
    }

    #[test]
    fn puts_reaches_the_session_output() -> Result<(), MonkeyError> {
        let mut out: Vec<u8> = Vec::new();
        let mut interp = Interpreter::new(&mut out);
        interp.eval("puts(\"Hello\"); puts(1 + 1);")?;
        assert_eq!(out, b"Hello\n2\n");
        Ok(())
    }

    #[test]
    fn parse_error_display_lists_diagnostics() {
        let err = MonkeyError::Parse(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(err.to_string(), "parser errors:\n\ta\n\tb");
    }
}
