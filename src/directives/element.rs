use std::sync::Arc;

use kstring::KString;
use vhtml::{html_escape, AId, Element, Payload};

use crate::attrs::{eval_attributes, hide};
use crate::context::VueContext;
use crate::error::VResult;
use crate::template::Template;


impl<'v> VueContext<'v> {
    /// Any other element: `v-html`/`v-text` replace the children,
    /// `v-show` hides, attributes are evaluated.
    pub(super) fn eval_element(&mut self, src: &Arc<Template>, e: &Element) -> VResult<Vec<AId>> {
        let ev = self.ev();
        let mut payload = None;
        if let Some(s) = e.get_attr("v-html") {
            if let Some(v) = ev.eval_pipe_opt(&self.scope, s)? {
                payload = Some(Payload::Html(KString::from_string(v.to_string())));
            }
        }
        if let Some(s) = e.get_attr("v-text") {
            if let Some(v) = ev.eval_pipe_opt(&self.scope, s)? {
                let text = v.to_string();
                payload = Some(Payload::Text(KString::from_string(html_escape(&text).into_owned())));
            }
        }
        let mut attr = eval_attributes(ev, &self.scope, &e.attr)?;
        if let Some(s) = e.get_attr("v-show") {
            if ! ev.eval_condition(&self.scope, s)? {
                hide(&mut attr);
            }
        }
        let body = if payload.is_some() {
            Vec::new()
        } else {
            self.tags.push(e.tag.clone());
            let result = self.eval_nodes(src, &e.body);
            self.tags.pop();
            result?
        };
        let mut elt = Element::new(e.tag.clone());
        elt.attr = attr;
        elt.body = body;
        elt.payload = payload;
        Ok(vec![self.out.allocate_element(elt)])
    }
}
