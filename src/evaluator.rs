//! Evaluation of directive values against a scope: pipes,
//! expressions and conditions, with the compiled forms cached by
//! source text.

use std::sync::Arc;

use kstring::KString;

use crate::cache::Cache;
use crate::error::{VResult, VueErrorKind};
use crate::expr::{Env, Program};
use crate::funcs::FuncMap;
use crate::pipe::{has_top_level_pipe, PipeExpr};
use crate::scope::Scope;
use crate::trace;
use crate::value::Value;


/// The scope as seen by the expression engine; `.` is the current
/// pipe value, if any.
pub struct ScopeEnv<'a> {
    scope: &'a Scope,
    funcs: &'a FuncMap,
    dot: Option<&'a Value>,
}

impl<'a> ScopeEnv<'a> {
    pub fn new(scope: &'a Scope, funcs: &'a FuncMap, dot: Option<&'a Value>) -> Self {
        ScopeEnv { scope, funcs, dot }
    }
}

impl<'a> Env for ScopeEnv<'a> {
    fn get(&self, name: &str) -> Option<Value> {
        if name == "." {
            self.dot.cloned()
        } else {
            self.scope.lookup(name)
        }
    }

    fn call(&self, name: &str, args: Vec<Value>) -> VResult<Value> {
        self.funcs.call(name, args)
    }
}


/// `===` and `!==` are equal to `==` and `!=` here.
pub fn normalize_condition(s: &str) -> String {
    s.replace("===", "==").replace("!==", "!=")
}

pub struct Evaluator {
    funcs: FuncMap,
    programs: Cache<Program>,
    pipes: Cache<PipeExpr>,
}

impl Evaluator {
    pub fn new(funcs: FuncMap) -> Self {
        Evaluator {
            funcs,
            programs: Cache::new(),
            pipes: Cache::new(),
        }
    }

    pub fn funcs(&self) -> &FuncMap {
        &self.funcs
    }

    /// The compiled program for `src`; failing to compile is an
    /// expression error.
    pub fn program(&self, src: &str) -> VResult<Arc<Program>> {
        self.programs.get_or_try_insert(src, || {
            Program::compile(src).map_err(|e| VueErrorKind::Expression {
                expr: KString::from_ref(src),
                message: e.to_string(),
            }.into())
        })
    }

    pub fn pipe(&self, src: &str) -> Arc<PipeExpr> {
        self.pipes.get_or_insert(src, || PipeExpr::parse(src))
    }

    /// Evaluate `src` as pipe expression (which includes plain paths,
    /// bare calls and expressions).
    pub fn eval_pipe(&self, scope: &Scope, src: &str) -> VResult<Value> {
        self.pipe(src).eval(scope, self)
    }

    /// Like `eval_pipe`, but an unresolved variable is `None`.
    pub fn eval_pipe_opt(&self, scope: &Scope, src: &str) -> VResult<Option<Value>> {
        match self.eval_pipe(scope, src) {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.is_variable_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn eval_expr(&self, scope: &Scope, src: &str) -> VResult<Value> {
        self.program(src)?.run(&ScopeEnv::new(scope, &self.funcs, None))
    }

    /// Evaluate a `v-if`/`v-show` style condition. Expressions the
    /// expression engine rejects (syntax or type errors) fall back to
    /// looking up `src` as a path; unknown functions, arity and
    /// filter errors are reported.
    pub fn eval_condition(&self, scope: &Scope, src: &str) -> VResult<bool> {
        let src = normalize_condition(src);
        if has_top_level_pipe(&src) {
            return Ok(self.eval_pipe_opt(scope, &src)?.map_or(false, |v| v.truthy()))
        }
        match self.eval_expr(scope, &src) {
            Ok(v) => Ok(v.truthy()),
            Err(e) => match e.kind() {
                VueErrorKind::Expression { .. } => {
                    trace!("condition {src:?} falls back to a path lookup: {e}");
                    Ok(scope.resolve(&src).map_or(false, |v| v.truthy()))
                }
                _ => Err(e)
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::warn::set_trace;
    use serde_json::json;

    fn ev() -> Evaluator {
        let mut funcs = FuncMap::new();
        crate::filters::install(&mut funcs);
        Evaluator::new(funcs)
    }

    #[test]
    fn t_conditions() -> VResult<()> {
        let ev = ev();
        let scope = Scope::with_data(Value::from(json!({
            "t": true, "f": false, "zero": 0, "fzero": 0.0, "empty": "", "nil": null,
            "one": 1, "x": "x", "n": 7, "s": "abc", "xs": [],
        })));
        for c in ["f", "zero", "fzero", "empty", "nil", "missing", "n < 3", "s === 'abd'"] {
            assert!(! ev.eval_condition(&scope, c)?, "{c}");
        }
        for c in ["t", "one", "x", "xs", "n > 3 && s !== 'x'", "s | len | . == 3", "len(s) == 3"] {
            assert!(ev.eval_condition(&scope, c)?, "{c}");
        }
        Ok(())
    }

    #[test]
    fn t_condition_fallback() -> VResult<()> {
        let ev = ev();
        let scope = Scope::with_data(Value::from(json!({"s": "abc", "a": {"b": 1}})));
        // type error, falls back to a lookup of the whole text
        assert!(! ev.eval_condition(&scope, "s < 1")?);
        // syntax the expression engine rejects
        assert!(! ev.eval_condition(&scope, "a b")?);
        assert!(ev.eval_condition(&scope, "nope(s)").is_err());
        Ok(())
    }

    #[test]
    fn t_condition_fallback_traced() -> VResult<()> {
        let ev = ev();
        let scope = Scope::with_data(Value::from(json!({"s": "abc", "and": true})));
        set_trace(true);
        let type_error = ev.eval_condition(&scope, "s < 1");
        let syntax_error = ev.eval_condition(&scope, "and or");
        let unknown = ev.eval_condition(&scope, "nope(s)");
        set_trace(false);
        assert!(! type_error?);
        assert!(! syntax_error?);
        assert!(unknown.is_err());
        assert!(matches!(ev.eval_expr(&scope, "and or").unwrap_err().kind(),
                         VueErrorKind::Expression { .. }));
        Ok(())
    }

    #[test]
    fn t_caches() -> VResult<()> {
        let ev = ev();
        let a = ev.program("1 + 2")?;
        let b = ev.program("1 + 2")?;
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&ev.pipe("x | upper"), &ev.pipe("x | upper")));
        assert!(ev.program("1 +").is_err());
        Ok(())
    }
}
