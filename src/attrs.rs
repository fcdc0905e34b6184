//! Attribute evaluation: bindings (`:x`, `v-bind:x`), object
//! literals for `class` and `style`, literal escapes (`\:x`, `[x]`),
//! interpolation of static values, and merging of bound with static
//! values.

use itertools::Itertools;
use kstring::KString;
use vhtml::meta::is_directive_attribute;

use crate::error::VResult;
use crate::evaluator::Evaluator;
use crate::interpolate::{has_interpolation, interpolate};
use crate::pipe::split_args;
use crate::path::unquote;
use crate::scope::Scope;
use crate::value::Value;


pub type Attrs = Vec<(KString, KString)>;

/// Attributes steering evaluation that `is_directive_attribute`
/// doesn't cover.
fn is_control_attribute(name: &str) -> bool {
    name == "v-keep"
        || name == "v-slot"
        || name.starts_with("v-slot:")
        || name.starts_with('#')
}

/// The bound attribute name of `:x` / `v-bind:x`.
pub fn binding_name(name: &str) -> Option<&str> {
    name.strip_prefix(':')
        .or_else(|| name.strip_prefix("v-bind:"))
        .filter(|n| ! n.is_empty())
}

/// The attribute name of a literal escape, `\:x` or `[x]`.
fn literal_name(name: &str) -> Option<&str> {
    if let Some(rest) = name.strip_prefix("\\:") {
        return Some(rest)
    }
    name.strip_prefix('[').and_then(|n| n.strip_suffix(']'))
}

/// `fontSize` -> `font-size`; names containing a hyphen are kept.
pub fn kebab_case(s: &str) -> String {
    if s.contains('-') {
        return s.to_string()
    }
    let mut out = String::with_capacity(s.len() + 4);
    for c in s.chars() {
        if c.is_uppercase() {
            out.push('-');
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `a: b; c: d` as ordered property list.
pub fn parse_style(s: &str) -> Vec<(String, String)> {
    s.split(';')
        .filter_map(|decl| {
            let (k, v) = decl.split_once(':')?;
            let k = k.trim();
            if k.is_empty() {
                None
            } else {
                Some((k.to_string(), v.trim().to_string()))
            }
        })
        .collect()
}

fn format_style(props: &[(String, String)]) -> String {
    props.iter().map(|(k, v)| format!("{k}:{v};")).collect()
}

/// Merge two style values by property, properties of `bound` winning.
pub fn merge_style(static_value: &str, bound: &str) -> String {
    let mut props = parse_style(static_value);
    for (k, v) in parse_style(bound) {
        match props.iter_mut().find(|(pk, _)| *pk == k) {
            Some(p) => p.1 = v,
            None => props.push((k, v)),
        }
    }
    format_style(&props)
}

fn merge(name: &str, static_value: &str, bound: &str) -> String {
    match name {
        "class" => [static_value.trim(), bound.trim()].iter()
            .filter(|s| ! s.is_empty())
            .join(" "),
        "style" => merge_style(static_value, bound),
        _ => bound.to_string(),
    }
}

/// `{a: x, 'b-c': y}`: the key/value source pairs, or `None` if `s`
/// isn't an object literal.
fn object_literal(s: &str) -> Option<Vec<(String, &str)>> {
    let inner = s.trim().strip_prefix('{')?.strip_suffix('}')?;
    let mut pairs = Vec::new();
    for item in split_args(inner) {
        if item.is_empty() {
            continue;
        }
        let colon = colon_position(item)?;
        let key = item[..colon].trim();
        let key = unquote(key).unwrap_or(key).to_string();
        pairs.push((key, item[colon + 1..].trim()));
    }
    Some(pairs)
}

/// First `:` outside of quotes.
fn colon_position(s: &str) -> Option<usize> {
    let mut quote = None;
    for (i, b) in s.bytes().enumerate() {
        match quote {
            Some(q) => if b == q { quote = None },
            None => match b {
                b'\'' | b'"' => quote = Some(b),
                b':' => return Some(i),
                _ => ()
            }
        }
    }
    None
}

/// An object literal value: full expression first, else a path.
fn object_value(ev: &Evaluator, scope: &Scope, src: &str) -> Value {
    match ev.eval_expr(scope, src) {
        Ok(v) => v,
        Err(_) => scope.resolve(src).unwrap_or_default(),
    }
}

fn eval_object_literal(
    ev: &Evaluator, scope: &Scope, name: &str, pairs: Vec<(String, &str)>
) -> String {
    let values = pairs.into_iter().map(|(k, src)| (k, object_value(ev, scope, src)));
    match name {
        "class" => values.filter(|(_, v)| v.truthy()).map(|(k, _)| k).join(" "),
        "style" => values
            .filter_map(|(k, v)| {
                let v = v.to_string();
                if v.is_empty() { None } else { Some(format!("{}:{};", kebab_case(&k), v)) }
            })
            .collect(),
        _ => values.map(|(_, v)| v.to_string()).filter(|v| ! v.is_empty()).join(" "),
    }
}

/// The value of binding `name="src"`, and whether it is truthy.
fn eval_binding(
    ev: &Evaluator, scope: &Scope, name: &str, src: &str
) -> VResult<(String, bool)> {
    if let Some(pairs) = object_literal(src) {
        let s = eval_object_literal(ev, scope, name, pairs);
        let truthy = ! s.is_empty();
        return Ok((s, truthy))
    }
    if has_interpolation(src) {
        let s = interpolate(ev, scope, src, false)?;
        let truthy = ! s.is_empty();
        return Ok((s, truthy))
    }
    let v = ev.eval_pipe_opt(scope, src)?.unwrap_or_default();
    Ok((v.to_string(), v.truthy()))
}

/// Evaluate the attributes of an element for output.
pub fn eval_attributes(ev: &Evaluator, scope: &Scope, attrs: &[(KString, KString)]) -> VResult<Attrs> {
    let mut out: Attrs = Vec::with_capacity(attrs.len());
    for (name, value) in attrs {
        if let Some(lit) = literal_name(name) {
            out.push((KString::from_ref(lit), value.clone()));
        } else if is_directive_attribute(name) || is_control_attribute(name) {
            continue;
        } else if has_interpolation(value) {
            out.push((name.clone(), KString::from_string(interpolate(ev, scope, value, false)?)));
        } else {
            out.push((name.clone(), value.clone()));
        }
    }
    for (name, src) in attrs {
        let name = match binding_name(name) {
            Some(n) => n,
            None => continue,
        };
        let (bound, truthy) = eval_binding(ev, scope, name, src)?;
        match out.iter_mut().find(|(k, _)| k.as_str() == name) {
            // a falsy class or style adds nothing to the static value
            Some(_) if ! truthy && matches!(name, "class" | "style") => (),
            Some((_, static_value)) => {
                *static_value = KString::from_string(merge(name, static_value, &bound));
            }
            None => if truthy {
                out.push((KString::from_ref(name), KString::from_string(bound)));
            }
        }
    }
    Ok(out)
}

/// Add `display:none;` to the style attribute.
pub fn hide(attrs: &mut Attrs) {
    match attrs.iter_mut().find(|(k, _)| k.as_str() == "style") {
        Some((_, v)) => *v = KString::from_string(merge_style(v, "display:none;")),
        None => attrs.push((KString::from_static("style"), KString::from_static("display:none;"))),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::funcs::FuncMap;
    use serde_json::json;

    fn eval(attrs: &[(&str, &str)]) -> VResult<Vec<(String, String)>> {
        let mut funcs = FuncMap::new();
        crate::filters::install(&mut funcs);
        let ev = Evaluator::new(funcs);
        let scope = Scope::with_data(Value::from(json!({
            "yes": true, "no": false, "url": "/x", "size": 12, "color": "red",
            "name": "Ann", "empty": ""
        })));
        let attrs: Attrs = attrs.iter().map(|(k, v)| (KString::from_ref(k), KString::from_ref(v))).collect();
        Ok(eval_attributes(&ev, &scope, &attrs)?.into_iter()
           .map(|(k, v)| (k.to_string(), v.to_string()))
           .collect())
    }

    fn pairs(v: &[(&str, &str)]) -> Vec<(String, String)> {
        v.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn t_class_merge() -> VResult<()> {
        assert_eq!(eval(&[("class", "a"), (":class", "{b: true, c: false}")])?,
                   pairs(&[("class", "a b")]));
        assert_eq!(eval(&[(":class", "{'is-on': yes, off: no}"), ("id", "i")])?,
                   pairs(&[("id", "i"), ("class", "is-on")]));
        assert_eq!(eval(&[("class", "a"), (":class", "no")])?, pairs(&[("class", "a")]));
        assert_eq!(eval(&[("style", "a:1"), (":style", "missing")])?, pairs(&[("style", "a:1")]));
        Ok(())
    }

    #[test]
    fn t_style() -> VResult<()> {
        assert_eq!(eval(&[("style", "color: blue; margin: 0"),
                          (":style", "{color: color, fontSize: size + 'px'}")])?,
                   pairs(&[("style", "color:red;margin:0;font-size:12px;")]));
        assert_eq!(merge_style("a:1", "display:none;"), "a:1;display:none;");
        Ok(())
    }

    #[test]
    fn t_bindings() -> VResult<()> {
        assert_eq!(eval(&[("href", "/old"), (":href", "url")])?, pairs(&[("href", "/x")]));
        assert_eq!(eval(&[("v-bind:title", "name | upper")])?, pairs(&[("title", "ANN")]));
        assert_eq!(eval(&[(":title", "Hi {{ name }}")])?, pairs(&[("title", "Hi Ann")]));
        // falsy without static counterpart: dropped
        assert_eq!(eval(&[(":disabled", "no"), (":x", "missing"), (":y", "empty")])?, pairs(&[]));
        assert_eq!(eval(&[(":data", "{a: name, b: empty, c: size}")])?, pairs(&[("data", "Ann 12")]));
        Ok(())
    }

    #[test]
    fn t_static_and_literal() -> VResult<()> {
        assert_eq!(eval(&[("alt", "{{ name }} & co"), ("\\:foo", "bar"), ("[x-y]", "{{ z }}"),
                          ("v-if", "yes"), ("#default", ""), ("v-keep", ""), ("@click", "go()")])?,
                   pairs(&[("alt", "Ann & co"), ("foo", "bar"), ("x-y", "{{ z }}"), ("@click", "go()")]));
        Ok(())
    }

    #[test]
    fn t_hide() {
        let mut a: Attrs = vec![("style".into(), "color:red".into())];
        hide(&mut a);
        assert_eq!(a[0].1.as_str(), "color:red;display:none;");
        let mut a: Attrs = vec![];
        hide(&mut a);
        assert_eq!(a, vec![(KString::from_static("style"), KString::from_static("display:none;"))]);
    }
}
