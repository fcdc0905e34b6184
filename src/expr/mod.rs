//! The embedded expression language used for conditions, raw pipe
//! segments and binding values: literals, paths, calls, the usual
//! arithmetic/comparison/boolean operators, ternaries, array and map
//! literals.

pub mod eval;
pub mod lexer;
pub mod parser;

use kstring::KString;

use crate::error::{VResult, VueErrorKind};
use crate::value::Value;

pub use eval::loose_eq;
pub use parser::{BinOp, Expr, UnOp};


/// What an expression sees: variables (`.` is the current pipe
/// value), and callable functions.
pub trait Env {
    fn get(&self, name: &str) -> Option<Value>;
    fn call(&self, name: &str, args: Vec<Value>) -> VResult<Value>;
}

/// A compiled expression, immutable once built.
#[derive(Debug, Clone)]
pub struct Program {
    source: KString,
    expr: Expr,
}

impl Program {
    pub fn compile(source: &str) -> anyhow::Result<Program> {
        Ok(Program {
            source: KString::from_ref(source),
            expr: parser::parse_expr(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluate; runtime type errors are reported with the source
    /// text, errors from called functions are passed on unchanged.
    pub fn run(&self, env: &dyn Env) -> VResult<Value> {
        eval::eval(&self.expr, env).map_err(|e| match e.kind() {
            VueErrorKind::Other(inner) => VueErrorKind::Expression {
                expr: self.source.clone(),
                message: inner.to_string(),
            }.into(),
            _ => e,
        })
    }
}
