//! The directive evaluator: walks the nodes of a template, in
//! document order, writing the evaluated nodes to the output arena.

mod conditional;
mod element;
mod include;
mod slot;
mod template;
mod vfor;

use std::sync::Arc;

use kstring::KString;
use vhtml::{AId, Element, Node};

use crate::context::{OnceKey, VueContext};
use crate::error::VResult;
use crate::interpolate::{has_interpolation, interpolate};
use crate::trace;
use crate::template::Template;

pub use vfor::{parse_for, ForClause};


fn is_whitespace_text(src: &Template, id: AId) -> bool {
    matches!(src.html.get_node(id), Some(Node::Text(s)) if s.trim().is_empty())
}

/// The index of the next element sibling after `i`, skipping
/// whitespace text.
fn next_element(src: &Template, ids: &[AId], i: usize) -> Option<usize> {
    let mut j = i + 1;
    while j < ids.len() {
        if ! is_whitespace_text(src, ids[j]) {
            return src.html.get_element(ids[j]).map(|_| j)
        }
        j += 1;
    }
    None
}

fn once_key(e: &Element, id: AId) -> Option<OnceKey> {
    if let Some(id) = e.get_attr("v-once-id") {
        Some(OnceKey::Id(KString::from_ref(id)))
    } else if e.has_attr("v-once") {
        Some(OnceKey::Node(id))
    } else {
        None
    }
}

impl<'v> VueContext<'v> {
    /// Evaluate a sibling list. Conditional chains and a `v-for`
    /// followed by `v-else` consume more than one sibling.
    pub fn eval_nodes(&mut self, src: &Arc<Template>, ids: &[AId]) -> VResult<Vec<AId>> {
        let mut out = Vec::with_capacity(ids.len());
        let mut i = 0;
        while i < ids.len() {
            let id = ids[i];
            let e = match src.html.get_element(id) {
                Some(e) => e,
                None => {
                    out.extend(self.eval_node(src, id, false)?);
                    i += 1;
                    continue;
                }
            };
            if e.has_attr("v-if") {
                i += self.eval_if_chain(src, ids, i, &mut out)?;
            } else if e.has_attr("v-else-if") || e.has_attr("v-else") {
                trace!("dropping <{}> with v-else/v-else-if but no v-if", e.tag);
                i += 1;
            } else if e.has_attr("v-for") {
                let results = self.eval_node(src, id, false)?;
                match next_element(src, ids, i) {
                    Some(j) if results.is_empty() && has_else(src, ids[j]) => {
                        out.extend(self.eval_node(src, ids[j], false)?);
                        i = j + 1;
                    }
                    _ => {
                        out.extend(results);
                        i += 1;
                    }
                }
            } else {
                out.extend(self.eval_node(src, id, false)?);
                i += 1;
            }
        }
        Ok(out)
    }

    /// Evaluate a single node into zero or more output nodes.
    /// `skip_for` is set for the iterations of its own `v-for`.
    pub fn eval_node(&mut self, src: &Arc<Template>, id: AId, skip_for: bool) -> VResult<Vec<AId>> {
        let e = match src.html.try_node(id)? {
            Node::Text(s) => {
                let text = if has_interpolation(s) {
                    let escape = ! self.in_raw_text();
                    KString::from_string(interpolate(self.ev(), &self.scope, s, escape)?)
                } else {
                    s.clone()
                };
                return Ok(vec![self.out.text(text)])
            }
            Node::Raw(s) => return Ok(vec![self.out.raw(s.clone())]),
            Node::Element(e) => e,
        };

        if ! skip_for {
            if let Some(clause) = e.get_attr("v-for") {
                return self.eval_for(src, id, clause)
            }
        }
        // Keyed by the source node, so with `v-for` only the first
        // iteration renders.
        if let Some(key) = once_key(e, id) {
            if ! self.first_time(key) {
                return Ok(Vec::new())
            }
        }
        if e.has_attr("v-pre") {
            return Ok(vec![self.out.deep_clone_from(&src.html, id)?])
        }
        match e.tag.as_str() {
            "vuego" if e.has_attr("include") => self.eval_include(src, e),
            "template" => self.eval_template_wrapper(src, e),
            "slot" => self.eval_slot(src, e),
            _ => self.eval_element(src, e),
        }
    }
}

fn has_else(src: &Template, id: AId) -> bool {
    src.html.get_element(id).map_or(false, |e| e.has_attr("v-else"))
}
