use std::sync::Arc;

use kstring::KString;
use vhtml::{meta::is_directive_attribute, AId, Element};

use crate::attrs::binding_name;
use crate::context::{SlotBinding, SlotContent, SlotScope, VueContext};
use crate::error::VResult;
use crate::interpolate::{has_interpolation, interpolate};
use crate::scope::Frame;
use crate::template::Template;
use crate::value::Value;
use crate::warn;


/// Strings that look like JSON objects or arrays are decoded.
fn decode_json_arg(v: Value) -> Value {
    match &v {
        Value::Str(s) if s.starts_with('{') || s.starts_with('[') => {
            match serde_json::from_str::<serde_json::Value>(s) {
                Ok(j) => Value::from(j),
                Err(e) => {
                    warn!("include argument {:?} looks like JSON but isn't, passing it as string: {}",
                          s.as_str(), e);
                    v.clone()
                }
            }
        }
        _ => v
    }
}

/// The slot name and binding of a `<template v-slot:name>` /
/// `<template #name>` child of an include.
fn slot_definition(e: &Element) -> Option<(KString, SlotBinding)> {
    if e.tag.as_str() != "template" {
        return None
    }
    e.attr.iter().find_map(|(k, v)| {
        let name = if k.as_str() == "v-slot" {
            "default"
        } else {
            k.strip_prefix("v-slot:").or_else(|| k.strip_prefix('#'))?
        };
        let name = if name.is_empty() { "default" } else { name };
        Some((KString::from_ref(name), SlotBinding::parse(v)))
    })
}

impl<'v> VueContext<'v> {
    /// The arguments of an include: bound attributes evaluated,
    /// static ones interpolated.
    fn include_args(&self, e: &Element) -> VResult<Frame> {
        let ev = self.ev();
        let mut args = Frame::new();
        for (name, value) in &e.attr {
            if let Some(name) = binding_name(name) {
                let v = ev.eval_pipe_opt(&self.scope, value)?.unwrap_or_default();
                args.insert(KString::from_ref(name), decode_json_arg(v));
            } else if name.as_str() == "include" || name.as_str() == "v-keep"
                || is_directive_attribute(name)
            {
                continue;
            } else {
                let v = if has_interpolation(value) {
                    Value::from(interpolate(ev, &self.scope, value, false)?)
                } else {
                    Value::Str(value.clone())
                };
                args.insert(name.clone(), decode_json_arg(v));
            }
        }
        Ok(args)
    }

    /// Named slot definitions stay lazy; all other children are
    /// evaluated here, as the default slot.
    fn include_slots(&mut self, src: &Arc<Template>, e: &Element) -> VResult<SlotScope> {
        let mut slots = SlotScope::new();
        let mut default = Vec::new();
        for &child in &e.body {
            match src.html.get_element(child).and_then(slot_definition) {
                Some((name, binding)) => {
                    slots.insert(name, SlotContent::Scoped { src: src.clone(), id: child, binding });
                }
                None => default.push(child),
            }
        }
        if ! default.is_empty() {
            let nodes = self.eval_nodes(src, &default)?;
            slots.entry(KString::from_static("default")).or_insert(SlotContent::Nodes(nodes));
        }
        Ok(slots)
    }

    /// `<vuego include="file">`: evaluate `file` with the attributes as
    /// variables, its front matter overriding them.
    pub(super) fn eval_include(&mut self, src: &Arc<Template>, e: &Element) -> VResult<Vec<AId>> {
        let include = e.get_attr("include").unwrap_or_default();
        let filename = if has_interpolation(include) {
            interpolate(self.ev(), &self.scope, include, false)?
        } else {
            include.to_string()
        };
        let args = self.include_args(e)?;
        let slots = self.include_slots(src, e)?;
        let tpl = self.vue.load_template(&filename)
            .map_err(|err| err.in_chain(&self.chain))?;

        let mut frame = args;
        for (k, v) in &tpl.front_matter {
            frame.insert(k.clone(), v.clone());
        }
        self.chain.push(tpl.filename.clone());
        self.slots.push(slots);
        self.scope.push(frame);
        let result = self.eval_nodes(&tpl, &tpl.roots);
        self.scope.pop();
        self.slots.pop();
        let result = result.map_err(|err| err.in_chain(&self.chain));
        self.chain.pop();
        let body = result?;

        if e.has_attr("v-keep") {
            let mut keep = Element::new(e.tag.clone());
            keep.attr = e.attr.iter()
                .filter(|(k, _)| k.as_str() != "v-keep" && binding_name(k).is_none())
                .cloned()
                .collect();
            keep.body = body;
            return Ok(vec![self.out.allocate_element(keep)])
        }
        Ok(body)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn t_decode_json_arg() {
        assert_eq!(decode_json_arg(Value::str(r#"{"a": [1, 2]}"#)),
                   Value::from(json!({"a": [1, 2]})));
        assert_eq!(decode_json_arg(Value::str("[1")), Value::str("[1"));
        assert_eq!(decode_json_arg(Value::str("plain")), Value::str("plain"));
        assert_eq!(decode_json_arg(Value::Int(3)), Value::Int(3));
    }

    #[test]
    fn t_slot_definition() -> anyhow::Result<()> {
        let t = Template::parse(
            "t.vuego",
            "<template #header>h</template><template v-slot:row=\"r\">r</template>\
             <template v-slot>d</template><template>x</template><div #a>y</div>")?;
        let defs: Vec<_> = t.roots.iter()
            .map(|id| t.html.get_element(*id).and_then(slot_definition))
            .collect();
        assert_eq!(defs, vec![
            Some(("header".into(), SlotBinding::Spread)),
            Some(("row".into(), SlotBinding::Var("r".into()))),
            Some(("default".into(), SlotBinding::Spread)),
            None,
            None,
        ]);
        Ok(())
    }
}
