//! Per-render evaluation state. Everything here belongs to a single
//! render call; the engine's caches are only read through `vue`.

use std::{collections::{HashMap, HashSet}, sync::Arc};

use kstring::KString;
use vhtml::{meta::is_raw_text, AId, HtmlAllocator, Print};

use crate::engine::Vue;
use crate::error::VResult;
use crate::evaluator::Evaluator;
use crate::scope::{Frame, Scope};
use crate::template::Template;
use crate::value::Value;


/// How the props of a `<slot>` reach scoped slot content.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotBinding {
    /// `v-slot="props"`: all props as one mapping
    Var(KString),
    /// `v-slot="{ a, b }"`: the listed props as variables
    Names(Vec<KString>),
    /// `v-slot` without value: all props as variables
    Spread,
}

impl SlotBinding {
    pub fn parse(s: &str) -> SlotBinding {
        let s = s.trim();
        if s.is_empty() {
            return SlotBinding::Spread
        }
        if let Some(inner) = s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            return SlotBinding::Names(
                inner.split(',')
                    .map(str::trim)
                    .filter(|n| ! n.is_empty())
                    .map(KString::from_ref)
                    .collect())
        }
        SlotBinding::Var(KString::from_ref(s))
    }

    /// The frame the slot content is evaluated in.
    pub fn frame(&self, props: Frame) -> Frame {
        match self {
            SlotBinding::Var(name) => {
                let mut frame = Frame::new();
                frame.insert(name.clone(), Value::Map(props.into_iter().collect()));
                frame
            }
            SlotBinding::Names(names) => names.iter()
                .map(|n| (n.clone(), props.get(n).cloned().unwrap_or_default()))
                .collect(),
            SlotBinding::Spread => props,
        }
    }
}

/// Content an include passes for one slot name.
#[derive(Debug, Clone)]
pub enum SlotContent {
    /// Evaluated in the including scope already, ids in `out`.
    Nodes(Vec<AId>),
    /// A `<template v-slot>` / `<template #name>`, evaluated where the
    /// component places the slot.
    Scoped { src: Arc<Template>, id: AId, binding: SlotBinding },
}

pub type SlotScope = HashMap<KString, SlotContent>;


/// Key for `v-once`: the source node, or an explicit `v-once-id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OnceKey {
    Node(AId),
    Id(KString),
}


pub struct VueContext<'v> {
    pub vue: &'v Vue,
    pub scope: Scope,
    /// Template files being evaluated, outermost first
    pub chain: Vec<KString>,
    /// Enclosing output element tags, innermost last
    pub tags: Vec<KString>,
    pub seen: HashSet<OnceKey>,
    /// Slot contents of the enclosing includes, innermost last
    pub slots: Vec<SlotScope>,
    pub out: HtmlAllocator,
}

impl<'v> VueContext<'v> {
    pub fn new(vue: &'v Vue, scope: Scope) -> Self {
        VueContext {
            vue,
            scope,
            chain: Vec::new(),
            tags: Vec::new(),
            seen: HashSet::new(),
            slots: Vec::new(),
            out: HtmlAllocator::new(),
        }
    }

    pub fn ev(&self) -> &'v Evaluator {
        self.vue.evaluator()
    }

    /// Whether text goes into a `script` or `style` element.
    pub fn in_raw_text(&self) -> bool {
        self.tags.last().map_or(false, |t| is_raw_text(t))
    }

    /// Whether a `v-once` node is seen for the first time.
    pub fn first_time(&mut self, key: OnceKey) -> bool {
        self.seen.insert(key)
    }

    /// Evaluate a whole template file: its front matter is pushed as
    /// a frame, and errors are annotated with the inclusion chain.
    pub fn eval_template(&mut self, tpl: &Arc<Template>) -> VResult<Vec<AId>> {
        self.chain.push(tpl.filename.clone());
        self.scope.push(tpl.front_matter.iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect());
        let result = self.eval_nodes(tpl, &tpl.roots);
        self.scope.pop();
        let result = result.map_err(|e| e.in_chain(&self.chain));
        self.chain.pop();
        result
    }

    pub fn to_html(&self, roots: &[AId]) -> VResult<String> {
        Ok(roots.to_html_fragment_string(&self.out)?)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_slot_binding() {
        let props: Frame = [("a", Value::Int(1)), ("b", Value::str("x"))].into_iter()
            .map(|(k, v)| (KString::from_static(k), v))
            .collect();
        assert_eq!(SlotBinding::parse(""), SlotBinding::Spread);
        assert_eq!(SlotBinding::parse(" p "), SlotBinding::Var("p".into()));
        let names = SlotBinding::parse("{ a, c }");
        assert_eq!(names, SlotBinding::Names(vec!["a".into(), "c".into()]));

        let f = names.frame(props.clone());
        assert_eq!(f.get("a"), Some(&Value::Int(1)));
        assert_eq!(f.get("c"), Some(&Value::Nil));
        assert_eq!(f.get("b"), None);

        let f = SlotBinding::Var("p".into()).frame(props.clone());
        assert_eq!(f.get("p").and_then(|p| p.child("b")).map(|v| v.into_owned()),
                   Some(Value::str("x")));
        assert_eq!(SlotBinding::Spread.frame(props.clone()), props);
    }
}
