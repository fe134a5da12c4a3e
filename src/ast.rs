//! Abstract syntax tree produced by the parser.
//!
//! The `Display` impls render the canonical print form used by
//! diagnostics and the parser tests: fully parenthesized expressions,
//! statements concatenated without separators.

use std::fmt;

/// An ordered sequence of top-level statements.
#[derive(Debug, PartialEq, Clone)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Stmt {
    Let { name: String, value: Expr },
    Return(Expr),
    Expr(Expr),
    Block(Block),
}

/// A braced statement list, the body form of `if` and `fn`.
#[derive(Debug, PartialEq, Clone)]
pub struct Block {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Expr {
    Ident(String),
    Int(i64),
    Bool(bool),
    Str(String),
    Prefix {
        op: PrefixOp,
        right: Box<Expr>,
    },
    Infix {
        op: InfixOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    If {
        condition: Box<Expr>,
        consequence: Block,
        alternative: Option<Block>,
    },
    Function {
        params: Vec<String>,
        body: Block,
    },
    Call {
        function: Box<Expr>,
        args: Vec<Expr>,
    },
    Array(Vec<Expr>),
    Index {
        left: Box<Expr>,
        index: Box<Expr>,
    },
    /// Key/value pairs in source order; later duplicates win at evaluation.
    Hash(Vec<(Expr, Expr)>),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PrefixOp {
    Bang,
    Minus,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum InfixOp {
    Plus,
    Minus,
    Asterisk,
    Slash,
    Lt,
    Gt,
    Eq,
    NotEq,
}

impl fmt::Display for PrefixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefixOp::Bang => f.write_str("!"),
            PrefixOp::Minus => f.write_str("-"),
        }
    }
}

impl fmt::Display for InfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InfixOp::Plus => "+",
            InfixOp::Minus => "-",
            InfixOp::Asterisk => "*",
            InfixOp::Slash => "/",
            InfixOp::Lt => "<",
            InfixOp::Gt => ">",
            InfixOp::Eq => "==",
            InfixOp::NotEq => "!=",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.statements {
            write!(f, "{}", stmt)?;
        }
        Ok(())
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Let { name, value } => write!(f, "let {} = {};", name, value),
            Stmt::Return(value) => write!(f, "return {};", value),
            Stmt::Expr(expr) => write!(f, "{}", expr),
            Stmt::Block(block) => write!(f, "{}", block),
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.statements {
            write!(f, "{}", stmt)?;
        }
        Ok(())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Ident(name) => f.write_str(name),
            Expr::Int(value) => write!(f, "{}", value),
            Expr::Bool(value) => write!(f, "{}", value),
            Expr::Str(value) => f.write_str(value),
            Expr::Prefix { op, right } => write!(f, "({}{})", op, right),
            Expr::Infix { op, left, right } => write!(f, "({} {} {})", left, op, right),
            Expr::If {
                condition,
                consequence,
                alternative,
            } => {
                write!(f, "if{} {}", condition, consequence)?;
                if let Some(alt) = alternative {
                    write!(f, "else{}", alt)?;
                }
                Ok(())
            }
            Expr::Function { params, body } => {
                write!(f, "fn({}) {{\n{}\n}}", params.join(", "), body)
            }
            Expr::Call { function, args } => {
                write!(f, "{}({})", function, join(args, ", "))
            }
            Expr::Array(elements) => write!(f, "[{}]", join(elements, ", ")),
            Expr::Index { left, index } => write!(f, "({}[{}])", left, index),
            Expr::Hash(pairs) => {
                let rendered = pairs
                    .iter()
                    .map(|(k, v)| format!("{}:{}", k, v))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{{{}}}", rendered)
            }
        }
    }
}

fn join(exprs: &[Expr], sep: &str) -> String {
    exprs
        .iter()
        .map(Expr::to_string)
        .collect::<Vec<_>>()
        .join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_print_form() {
        let program = Program {
            statements: vec![Stmt::Let {
                name: "myVar".to_string(),
                value: Expr::Ident("anotherVar".to_string()),
            }],
        };
        assert_eq!(program.to_string(), "let myVar = anotherVar;");
    }

    #[test]
    fn nested_expression_print_form() {
        let expr = Expr::Infix {
            op: InfixOp::Asterisk,
            left: Box::new(Expr::Prefix {
                op: PrefixOp::Minus,
                right: Box::new(Expr::Ident("a".to_string())),
            }),
            right: Box::new(Expr::Int(2)),
        };
        assert_eq!(expr.to_string(), "((-a) * 2)");
    }

    #[test]
    fn index_and_hash_print_forms() {
        let index = Expr::Index {
            left: Box::new(Expr::Ident("xs".to_string())),
            index: Box::new(Expr::Int(0)),
        };
        assert_eq!(index.to_string(), "(xs[0])");

        let hash = Expr::Hash(vec![(Expr::Str("one".to_string()), Expr::Int(1))]);
        assert_eq!(hash.to_string(), "{one:1}");
    }
}
