use std::sync::Arc;

use kstring::KString;
use vhtml::AId;

use crate::context::VueContext;
use crate::error::{VResult, VueErrorKind};
use crate::path::{is_ident, Path};
use crate::scope::Frame;
use crate::template::Template;
use crate::value::Value;


/// `item in items` or `(index, item) in items`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForClause<'s> {
    pub index: Option<&'s str>,
    pub var: &'s str,
    pub collection: &'s str,
}

pub fn parse_for(s: &str) -> Option<ForClause> {
    let (vars, collection) = s.split_once(" in ")?;
    let (vars, collection) = (vars.trim(), collection.trim());
    if collection.is_empty() {
        return None
    }
    let (index, var) = match vars.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        Some(inner) => {
            let (index, var) = inner.split_once(',')?;
            (Some(index.trim()), var.trim())
        }
        None => (None, vars),
    };
    if ! is_ident(var) || ! index.map_or(true, is_ident) {
        return None
    }
    Some(ForClause { index, var, collection })
}

/// The (index, value) pairs to iterate over. A positive integer `n`
/// counts from 1 to `n`.
fn iteration_entries(v: Value) -> Vec<(Value, Value)> {
    let n = match v {
        Value::Int(n) => n.max(0) as u64,
        Value::Uint(n) => n,
        v => return v.entries().unwrap_or_default(),
    };
    (0..n).map(|i| (Value::Uint(i), Value::Uint(i + 1))).collect()
}

impl<'v> VueContext<'v> {
    /// Evaluate node `id` once per entry of its `v-for` collection,
    /// each time in a fresh frame. A collection that doesn't resolve
    /// iterates zero times.
    pub(super) fn eval_for(&mut self, src: &Arc<Template>, id: AId, clause: &str) -> VResult<Vec<AId>> {
        let ForClause { index, var, collection } = parse_for(clause).ok_or_else(
            || VueErrorKind::Expression {
                expr: KString::from_ref(clause),
                message: "expected `item in items` or `(index, item) in items`".into(),
            })?;
        let value = if Path::parse(collection).is_some() {
            self.scope.resolve(collection)
        } else {
            self.ev().eval_pipe_opt(&self.scope, collection)?
        };
        let entries = value.map(iteration_entries).unwrap_or_default();

        let mut out = Vec::new();
        for (key, value) in entries {
            let mut frame = Frame::new();
            frame.insert(KString::from_ref(var), value);
            if let Some(index) = index {
                frame.insert(KString::from_ref(index), key);
            }
            self.scope.push(frame);
            let result = self.eval_node(src, id, true);
            self.scope.pop();
            out.extend(result?);
        }
        Ok(out)
    }
}
