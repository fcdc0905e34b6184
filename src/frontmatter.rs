//! YAML front matter: the block between a leading `---` line and the
//! next `---` (or `...`) line.

use std::{borrow::Cow, collections::{BTreeMap, HashMap}};

use anyhow::{anyhow, bail, Result};
use kstring::KString;
use saphyr_parser::{Event, Parser, ScalarStyle, StrInput};

use crate::value::Value;


/// Split `source` into the front matter text (if any) and the body.
pub fn split_front_matter(source: &str) -> (Option<&str>, &str) {
    let s = source.strip_prefix('\u{feff}').unwrap_or(source);
    let mut lines = s.split_inclusive('\n');
    match lines.next() {
        Some(first) if first.trim_end() == "---" => (),
        _ => return (None, source),
    }
    let start = s.find('\n').map_or(s.len(), |i| i + 1);
    let mut pos = start;
    for line in lines {
        let t = line.trim_end();
        if t == "---" || t == "..." {
            return (Some(&s[start..pos]), &s[pos + line.len()..])
        }
        pos += line.len();
    }
    // no closing fence: not front matter
    (None, source)
}

fn is_yaml_null(value: &str) -> bool {
    matches!(value, "null" | "Null" | "NULL" | "~" | "")
}

fn parse_yaml_bool(value: &str) -> Option<bool> {
    match value {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None
    }
}

fn scalar_to_value(value: Cow<str>, style: ScalarStyle) -> Value {
    if matches!(style, ScalarStyle::SingleQuoted | ScalarStyle::DoubleQuoted) {
        return Value::from(value.into_owned())
    }
    let s = value.as_ref();
    if is_yaml_null(s) {
        return Value::Nil
    }
    if let Some(b) = parse_yaml_bool(s) {
        return Value::Bool(b)
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Int(i)
    }
    if let Ok(u) = s.parse::<u64>() {
        return Value::Uint(u)
    }
    if let Ok(f) = s.parse::<f64>() {
        return Value::Float(f)
    }
    match s {
        ".inf" | ".Inf" | ".INF" => Value::Float(f64::INFINITY),
        "-.inf" | "-.Inf" | "-.INF" => Value::Float(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => Value::Float(f64::NAN),
        _ => Value::from(value.into_owned()),
    }
}

struct YamlReader<'a> {
    parser: Parser<'a, StrInput<'a>>,
    anchors: HashMap<usize, Value>,
}

impl<'a> YamlReader<'a> {
    fn next(&mut self) -> Result<Option<Event<'a>>> {
        match self.parser.next_event() {
            Some(Ok((event, _span))) => Ok(Some(event)),
            Some(Err(e)) => bail!("YAML: {e}"),
            None => Ok(None),
        }
    }

    fn next_required(&mut self) -> Result<Event<'a>> {
        self.next()?.ok_or_else(|| anyhow!("YAML: unexpected end of input"))
    }

    fn anchor(&mut self, id: usize, v: Value) -> Value {
        if id != 0 {
            self.anchors.insert(id, v.clone());
        }
        v
    }

    /// The value starting with `event`; `None` at the end of a
    /// collection.
    fn value(&mut self, event: Event<'a>) -> Result<Option<Value>> {
        Ok(Some(match event {
            Event::Scalar(value, style, anchor, _tag) => {
                let v = scalar_to_value(value, style);
                self.anchor(anchor, v)
            }
            Event::Alias(id) => self.anchors.get(&id).cloned().unwrap_or_default(),
            Event::SequenceStart(anchor, _tag) => {
                let mut items = Vec::new();
                loop {
                    let e = self.next_required()?;
                    match self.value(e)? {
                        Some(v) => items.push(v),
                        None => break,
                    }
                }
                self.anchor(anchor, Value::Seq(items))
            }
            Event::MappingStart(anchor, _tag) => {
                let mut map = BTreeMap::new();
                loop {
                    let e = self.next_required()?;
                    let key = match self.value(e)? {
                        Some(k) => KString::from_string(k.to_string()),
                        None => break,
                    };
                    let e = self.next_required()?;
                    let v = self.value(e)?.ok_or_else(
                        || anyhow!("YAML: missing value for key {:?}", key.as_str()))?;
                    map.insert(key, v);
                }
                self.anchor(anchor, Value::Map(map))
            }
            Event::SequenceEnd | Event::MappingEnd => return Ok(None),
            Event::StreamStart | Event::StreamEnd | Event::DocumentStart(..)
                | Event::DocumentEnd | Event::Nothing =>
                bail!("YAML: unexpected document structure event"),
        }))
    }

    /// The first document's value, `Nil` for an empty document.
    fn document(&mut self) -> Result<Value> {
        loop {
            let e = match self.next()? {
                Some(e) => e,
                None => return Ok(Value::Nil),
            };
            match e {
                Event::StreamStart | Event::DocumentStart(..) | Event::Nothing => continue,
                Event::StreamEnd | Event::DocumentEnd => return Ok(Value::Nil),
                e => return Ok(self.value(e)?.unwrap_or_default()),
            }
        }
    }
}

pub fn parse_yaml(s: &str) -> Result<Value> {
    YamlReader {
        parser: Parser::new_from_str(s),
        anchors: HashMap::new(),
    }.document()
}

/// Parse front matter text; it must be a mapping (or empty).
pub fn parse_front_matter(s: &str) -> Result<BTreeMap<KString, Value>> {
    match parse_yaml(s)? {
        Value::Map(m) => Ok(m),
        Value::Nil => Ok(BTreeMap::new()),
        other => bail!("front matter must be a mapping, got a {}", other.type_name()),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn t_split() {
        assert_eq!(split_front_matter("---\na: 1\n---\n<p>x</p>"), (Some("a: 1\n"), "<p>x</p>"));
        assert_eq!(split_front_matter("---\n---\nbody"), (Some(""), "body"));
        assert_eq!(split_front_matter("<p>---</p>"), (None, "<p>---</p>"));
        assert_eq!(split_front_matter("---\na: 1\n"), (None, "---\na: 1\n"));
        assert_eq!(split_front_matter("---\r\na: 1\r\n...\r\nb"), (Some("a: 1\r\n"), "b"));
    }

    #[test]
    fn t_parse() -> Result<()> {
        let m = parse_front_matter(
            "title: Hello\ncount: 3\nratio: 0.5\ndraft: false\nnone: ~\nq: '12'\n\
             tags:\n  - a\n  - b\nauthor: {name: Ann, age: 40}\n")?;
        assert_eq!(Value::Map(m), Value::from(json!({
            "title": "Hello", "count": 3, "ratio": 0.5, "draft": false, "none": null,
            "q": "12", "tags": ["a", "b"], "author": {"name": "Ann", "age": 40}
        })));
        assert!(parse_front_matter("")?.is_empty());
        Ok(())
    }

    #[test]
    fn t_anchors() -> Result<()> {
        let m = parse_front_matter("base: &b {x: 1}\nother: *b\n")?;
        assert_eq!(m.get("other"), Some(&Value::from(json!({"x": 1}))));
        Ok(())
    }

    #[test]
    fn t_not_a_mapping() {
        assert!(parse_front_matter("- a\n- b\n").is_err());
        assert!(parse_front_matter("a: [1, 2").is_err());
    }
}
