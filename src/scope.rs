//! The variable scope stack of a render call.

use std::{borrow::Cow, collections::HashMap};

use kstring::KString;

use crate::path::{Path, Segment};
use crate::value::Value;


pub type Frame = HashMap<KString, Value>;

/// Stack of frames, innermost last. Never empty.
#[derive(Debug, Clone)]
pub struct Scope {
    frames: Vec<Frame>,
    /// Fallback for top-level identifiers not found in any frame,
    /// resolved as members of this value.
    root: Option<Value>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    pub fn new() -> Self {
        Scope { frames: vec![Frame::new()], root: None }
    }

    /// A mapping becomes the bottom frame, any other value the root
    /// fallback value.
    pub fn with_data(data: Value) -> Self {
        match data {
            Value::Map(m) => Scope {
                frames: vec![m.into_iter().collect()],
                root: None,
            },
            Value::Nil => Scope::new(),
            other => Scope { frames: vec![Frame::new()], root: Some(other) },
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn push_empty(&mut self) {
        self.frames.push(Frame::new());
    }

    /// Popping the last frame leaves a fresh empty one.
    pub fn pop(&mut self) {
        self.frames.pop();
        if self.frames.is_empty() {
            self.frames.push(Frame::new());
        }
    }

    fn top_mut(&mut self) -> &mut Frame {
        if self.frames.is_empty() {
            self.frames.push(Frame::new());
        }
        let i = self.frames.len() - 1;
        &mut self.frames[i]
    }

    /// Set in the innermost frame.
    pub fn set(&mut self, key: impl Into<KString>, value: Value) {
        self.top_mut().insert(key.into(), value);
    }

    fn lookup_cow(&self, name: &str) -> Option<Cow<Value>> {
        for frame in self.frames.iter().rev() {
            if let Some(v) = frame.get(name) {
                return Some(Cow::Borrowed(v))
            }
        }
        self.root.as_ref()?.child(name)
    }

    /// Look up a top-level identifier, innermost frame first.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.lookup_cow(name).map(Cow::into_owned)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup_cow(name).is_some()
    }

    pub fn resolve_path(&self, path: &Path) -> Option<Value> {
        let mut cur = self.lookup_cow(&path.head)?;
        for seg in &path.rest {
            let var_key;
            let key: &str = match seg {
                Segment::Key(k) => k,
                Segment::Var(name) => {
                    var_key = match self.lookup_cow(name)?.as_ref() {
                        Value::Str(s) => s.clone(),
                        v @ (Value::Int(_) | Value::Uint(_)) => KString::from_string(v.to_string()),
                        _ => return None
                    };
                    &var_key
                }
            };
            cur = match cur {
                Cow::Borrowed(v) => v.child(key)?,
                Cow::Owned(v) => Cow::Owned(v.child(key)?.into_owned()),
            };
        }
        Some(cur.into_owned())
    }

    /// Resolve a dotted/bracketed path. Anything that isn't a
    /// syntactically valid path is not found, too.
    pub fn resolve(&self, path: &str) -> Option<Value> {
        self.resolve_path(&Path::parse(path)?)
    }

    /// Call `f(index_or_key, value)` for every entry of the sequence or
    /// mapping at `path`. Unresolved paths and other shapes iterate
    /// zero times. Stops at the first error.
    pub fn for_each<E>(
        &self,
        path: &str,
        mut f: impl FnMut(Value, Value) -> Result<(), E>
    ) -> Result<(), E> {
        if let Some(entries) = self.resolve(path).and_then(|v| v.entries()) {
            for (k, v) in entries {
                f(k, v)?;
            }
        }
        Ok(())
    }

    /// Merge all frames, inner frames shadowing outer ones.
    pub fn flatten(&self) -> Frame {
        let mut out = Frame::new();
        for frame in &self.frames {
            for (k, v) in frame {
                out.insert(k.clone(), v.clone());
            }
        }
        out
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Record;
    use serde_json::json;

    #[test]
    fn t_push_pop() {
        let mut s = Scope::with_data(Value::from(json!({"a": 1})));
        s.push_empty();
        s.set("a", Value::Int(2));
        s.set("b", Value::Int(3));
        assert_eq!(s.lookup("a"), Some(Value::Int(2)));
        assert_eq!(s.flatten().get("a"), Some(&Value::Int(2)));
        s.pop();
        assert_eq!(s.lookup("a"), Some(Value::Int(1)));
        assert_eq!(s.lookup("b"), None);
        s.pop();
        s.pop();
        assert_eq!(s.depth(), 1);
        assert_eq!(s.lookup("a"), None);
        s.set("c", Value::Nil);
        assert_eq!(s.lookup("c"), Some(Value::Nil));
    }

    #[test]
    fn t_resolve() {
        let s = Scope::with_data(Value::from(json!({
            "a": {"b": [{"c": "x"}, {"c": "y"}]},
            "i": 1,
            "k": "b",
        })));
        assert_eq!(s.resolve("a.b[0]['c']"), Some(Value::str("x")));
        assert_eq!(s.resolve("a.b[i].c"), Some(Value::str("y")));
        assert_eq!(s.resolve("a[k].1.c"), Some(Value::str("y")));
        assert_eq!(s.resolve("a.b.x"), None);
        assert_eq!(s.resolve("a.b[7]"), None);
        assert_eq!(s.resolve("a.b[0].c.d"), None);
        assert_eq!(s.resolve("nope"), None);
        assert_eq!(s.resolve("a +"), None);
    }

    #[test]
    fn t_root_fallback() {
        let user = Record::new("User")
            .field("Name", "Ann")
            .field("Address", Record::new("Addr").field("City", "Bern").into_value())
            .into_value();
        let s = Scope::with_data(user);
        assert_eq!(s.resolve("name"), Some(Value::str("Ann")));
        assert_eq!(s.resolve("address.city"), Some(Value::str("Bern")));
        assert_eq!(s.resolve("Address.Zip"), None);
    }

    #[test]
    fn t_for_each() {
        let s = Scope::with_data(Value::from(json!({"xs": ["a", "b"], "m": {"k": 1}, "n": 3})));
        let mut seen = Vec::new();
        s.for_each("xs", |i, v| -> Result<(), ()> {
            seen.push(format!("{i}={v}"));
            Ok(())
        }).unwrap();
        s.for_each("m", |k, v| -> Result<(), ()> {
            seen.push(format!("{k}={v}"));
            Ok(())
        }).unwrap();
        let mut count = 0;
        s.for_each("n", |_, _| -> Result<(), ()> { count += 1; Ok(()) }).unwrap();
        s.for_each("missing", |_, _| -> Result<(), ()> { count += 1; Ok(()) }).unwrap();
        assert_eq!(count, 0);
        assert_eq!(seen, ["0=a", "1=b", "k=1"]);
        let r = s.for_each("xs", |_, v| if v == Value::str("a") { Err("stop") } else { Ok(()) });
        assert_eq!(r, Err("stop"));
    }
}
