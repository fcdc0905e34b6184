use std::sync::Arc;

use kstring::KString;
use vhtml::{AId, Element};

use crate::attrs::binding_name;
use crate::context::VueContext;
use crate::error::{VResult, VueErrorKind};
use crate::template::Template;


fn is_required_attribute(name: &str) -> bool {
    name == ":required" || name == ":require"
}

/// The names listed by `:required` / `:require`, comma separated,
/// possibly repeated.
fn required_names(e: &Element) -> impl Iterator<Item = &str> {
    e.attr.iter()
        .filter(|(k, _)| is_required_attribute(k))
        .flat_map(|(_, v)| v.split(','))
        .map(str::trim)
        .filter(|n| ! n.is_empty())
}

impl<'v> VueContext<'v> {
    /// `<template>`: never in the output itself. Checks required
    /// variables, sets bound attributes in the current frame, then
    /// stands for its `v-html` value or its evaluated children.
    pub(super) fn eval_template_wrapper(&mut self, src: &Arc<Template>, e: &Element) -> VResult<Vec<AId>> {
        for name in required_names(e) {
            if self.scope.resolve(name).is_none() {
                return Err(VueErrorKind::RequiredAttribute(KString::from_ref(name)).into())
            }
        }
        let ev = self.ev();
        for (k, v) in &e.attr {
            if is_required_attribute(k) {
                continue;
            }
            if let Some(name) = binding_name(k) {
                let value = ev.eval_pipe_opt(&self.scope, v)?.unwrap_or_default();
                self.scope.set(KString::from_ref(name), value);
            }
        }
        if let Some(html) = e.get_attr("v-html") {
            if let Some(value) = ev.eval_pipe_opt(&self.scope, html)? {
                return Ok(vec![self.out.raw(value.to_string())])
            }
        }
        self.eval_nodes(src, &e.body)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_required_names() -> anyhow::Result<()> {
        let t = Template::parse(
            "t.vuego",
            r#"<template :required="a, b" :require="c" :x="y" required="z"></template>"#)?;
        let e = t.html.get_element(t.roots[0]).ok_or_else(|| anyhow::anyhow!("no element"))?;
        assert_eq!(required_names(e).collect::<Vec<_>>(), ["a", "b", "c"]);
        Ok(())
    }
}
