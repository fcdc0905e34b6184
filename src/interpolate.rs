//! `{{ expr }}` interpolation in text and attribute values.

use vhtml::html_escape;

use crate::error::VResult;
use crate::evaluator::Evaluator;
use crate::scope::Scope;
use crate::value::Value;


pub fn has_interpolation(s: &str) -> bool {
    s.contains("{{")
}

/// Byte position of the `}}` closing an interpolation whose content
/// starts at `from`, skipping quoted strings.
fn find_close(s: &str, from: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut quote = None;
    let mut i = from;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'\'' | b'"' => quote = Some(b),
                b'}' if bytes.get(i + 1) == Some(&b'}') => return Some(i),
                _ => ()
            }
        }
        i += 1;
    }
    None
}

/// How a value is written into text: nil as nothing, anything else
/// in its canonical formatting.
pub fn value_text(v: &Value) -> String {
    v.to_string()
}

/// Replace every `{{ expr }}` in `s` by the value of `expr`. Values
/// are HTML-escaped if `escape` is true. An unterminated `{{` is
/// kept as text.
pub fn interpolate(ev: &Evaluator, scope: &Scope, s: &str, escape: bool) -> VResult<String> {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("{{") {
        let close = match find_close(rest, start + 2) {
            Some(close) => close,
            None => break,
        };
        out.push_str(&rest[..start]);
        let expr = rest[start + 2..close].trim();
        let text = value_text(&ev.eval_pipe(scope, expr)?);
        if escape {
            out.push_str(&html_escape(&text));
        } else {
            out.push_str(&text);
        }
        rest = &rest[close + 2..];
    }
    out.push_str(rest);
    Ok(out)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::funcs::FuncMap;
    use serde_json::json;

    fn interp(s: &str, escape: bool) -> VResult<String> {
        let mut funcs = FuncMap::new();
        crate::filters::install(&mut funcs);
        let ev = Evaluator::new(funcs);
        let scope = Scope::with_data(Value::from(json!({
            "name": "<Ann>", "n": 3, "nil": null, "obj": {"a": 1}
        })));
        interpolate(&ev, &scope, s, escape)
    }

    #[test]
    fn t_interpolate() -> VResult<()> {
        assert_eq!(interp("Hi {{ name }}!", true)?, "Hi &lt;Ann&gt;!");
        assert_eq!(interp("Hi {{name}}!", false)?, "Hi <Ann>!");
        assert_eq!(interp("{{ n }}{{ n | string }} {{ nil }}.", true)?, "33 .");
        assert_eq!(interp("{{ 'a}}b' | upper }}", false)?, "A}}B");
        assert_eq!(interp("{{ obj }}", false)?, r#"{"a":1}"#);
        assert_eq!(interp("a {{ b", true)?, "a {{ b");
        assert_eq!(interp("no braces", true)?, "no braces");
        Ok(())
    }

    #[test]
    fn t_missing() {
        let e = interp("{{ nope }}", true).unwrap_err();
        assert_eq!(e.to_string(), "variable 'nope' not found");
    }
}
