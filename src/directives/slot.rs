use std::sync::Arc;

use kstring::KString;
use vhtml::{AId, Element};

use crate::attrs::binding_name;
use crate::context::{SlotContent, VueContext};
use crate::error::VResult;
use crate::scope::Frame;
use crate::template::Template;


impl<'v> VueContext<'v> {
    /// `<slot name="..">`: the content the enclosing include passed
    /// for that name, else the slot's own children.
    pub(super) fn eval_slot(&mut self, src: &Arc<Template>, e: &Element) -> VResult<Vec<AId>> {
        let name = e.get_attr("name").unwrap_or("default");
        let content = self.slots.last().and_then(|s| s.get(name)).cloned();
        match content {
            None => self.eval_nodes(src, &e.body),
            Some(SlotContent::Nodes(ids)) => Ok(ids),
            Some(SlotContent::Scoped { src: def, id, binding }) => {
                let ev = self.ev();
                let mut props = Frame::new();
                for (k, v) in &e.attr {
                    if let Some(prop) = binding_name(k) {
                        let value = ev.eval_pipe_opt(&self.scope, v)?.unwrap_or_default();
                        props.insert(KString::from_ref(prop), value);
                    }
                }
                let body = match def.html.get_element(id) {
                    Some(t) => t.body.clone(),
                    None => return Ok(Vec::new()),
                };
                // Slots inside the content refer to the includes
                // enclosing the caller.
                let own = self.slots.pop();
                self.scope.push(binding.frame(props));
                let result = self.eval_nodes(&def, &body);
                self.scope.pop();
                if let Some(own) = own {
                    self.slots.push(own);
                }
                result
            }
        }
    }
}
