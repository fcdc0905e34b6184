//! Dynamically typed values flowing through scopes, expressions and
//! filters.

use std::{borrow::Cow, collections::BTreeMap, fmt, sync::Arc};

use anyhow::Result;
use chrono::{DateTime, FixedOffset, SecondsFormat};
use kstring::KString;
use serde::{ser::{SerializeMap, SerializeSeq}, Serialize, Serializer};


/// A value provided by the host application that isn't a plain
/// mapping, e.g. a struct. Path resolution falls back to `field`
/// for it.
pub trait HostObject: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &str;

    /// Look up a member. Implementations are expected to be
    /// forgiving with regards to the case of the first letter, and
    /// to consider serialization tags.
    fn field(&self, name: &str) -> Option<Value>;

    /// All members, for serialization and iteration.
    fn to_map(&self) -> BTreeMap<KString, Value>;
}


#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(KString),
    Time(DateTime<FixedOffset>),
    Seq(Vec<Value>),
    Map(BTreeMap<KString, Value>),
    Object(Arc<dyn HostObject>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Nil
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Nil, Nil) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Uint(a), Uint(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (Time(a), Time(b)) => a == b,
            (Seq(a), Seq(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (Object(a), Object(b)) => Arc::ptr_eq(a, b),
            _ => false
        }
    }
}

impl Value {
    pub fn str(s: impl Into<KString>) -> Value {
        Value::Str(s.into())
    }

    /// A `Map` from key/value pairs.
    pub fn map<K: Into<KString>, V: Into<Value>>(
        pairs: impl IntoIterator<Item = (K, V)>
    ) -> Value {
        Value::Map(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Convert anything serializable, going through `serde_json`.
    pub fn from_serialize<T: Serialize + ?Sized>(v: &T) -> Result<Value> {
        Ok(serde_json::to_value(v)?.into())
    }

    pub fn type_name(&self) -> &str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Uint(_) => "uint",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Time(_) => "time",
            Value::Seq(_) => "sequence",
            Value::Map(_) => "mapping",
            Value::Object(o) => o.type_name(),
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Uint(_) | Value::Float(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Uint(u) => Some(*u as f64),
            Value::Float(f) => Some(*f),
            _ => None
        }
    }

    /// Condition semantics: booleans as themselves, strings when
    /// non-empty, numbers unless formatting as "0", nil is false,
    /// everything else true.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            Value::Str(s) => ! s.is_empty(),
            Value::Int(i) => *i != 0,
            Value::Uint(u) => *u != 0,
            Value::Float(f) => *f != 0.0,
            _ => true
        }
    }

    /// Number of elements for strings (in characters), sequences and
    /// mappings.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Str(s) => Some(s.chars().count()),
            Value::Seq(v) => Some(v.len()),
            Value::Map(m) => Some(m.len()),
            Value::Object(o) => Some(o.to_map().len()),
            _ => None
        }
    }

    /// One path step: key of a mapping, index of a sequence (`key`
    /// must be a non-negative integer), or member of a host object.
    pub fn child(&self, key: &str) -> Option<Cow<Value>> {
        match self {
            Value::Map(m) => m.get(key).map(Cow::Borrowed),
            Value::Seq(v) => {
                let i: usize = key.parse().ok()?;
                v.get(i).map(Cow::Borrowed)
            }
            Value::Object(o) => o.field(key).map(Cow::Owned),
            _ => None
        }
    }

    /// Entries for iteration: (index, value) for sequences, (key,
    /// value) for mappings and host objects; `None` for other shapes.
    pub fn entries(&self) -> Option<Vec<(Value, Value)>> {
        match self {
            Value::Seq(v) => Some(
                v.iter().enumerate()
                    .map(|(i, v)| (Value::Int(i as i64), v.clone()))
                    .collect()),
            Value::Map(m) => Some(
                m.iter()
                    .map(|(k, v)| (Value::Str(k.clone()), v.clone()))
                    .collect()),
            Value::Object(o) => Some(
                o.to_map().into_iter()
                    .map(|(k, v)| (Value::Str(k), v))
                    .collect()),
            _ => None
        }
    }

    /// Compact JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}


impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Uint(u) => write!(f, "{u}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::Time(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Seq(_) | Value::Map(_) | Value::Object(_) => {
                let s = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&s)
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Nil => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Uint(u) => serializer.serialize_u64(*u),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Time(t) => serializer.serialize_str(
                &t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Seq(v) => {
                let mut seq = serializer.serialize_seq(Some(v.len()))?;
                for item in v {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(m) => serialize_map(m, serializer),
            Value::Object(o) => serialize_map(&o.to_map(), serializer),
        }
    }
}

fn serialize_map<S: Serializer>(
    m: &BTreeMap<KString, Value>, serializer: S
) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(m.len()))?;
    for (k, v) in m {
        map.serialize_entry(k.as_str(), v)?;
    }
    map.end()
}


impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Nil,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) =>
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::Uint(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                },
            serde_json::Value::String(s) => Value::Str(KString::from_string(s)),
            serde_json::Value::Array(a) => Value::Seq(a.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(m) => Value::Map(
                m.into_iter().map(|(k, v)| (KString::from_string(k), Value::from(v))).collect()),
        }
    }
}

macro_rules! from_scalar {
    ($t:ty, $variant:ident, $conv:ty) => {
        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::$variant(v as $conv)
            }
        }
    }
}

from_scalar!(i64, Int, i64);
from_scalar!(i32, Int, i64);
from_scalar!(u64, Uint, u64);
from_scalar!(u32, Uint, u64);
from_scalar!(usize, Uint, u64);
from_scalar!(f64, Float, f64);
from_scalar!(f32, Float, f64);

impl From<bool> for Value {
    fn from(b: bool) -> Self { Value::Bool(b) }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::Str(KString::from_ref(s)) }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Value::Str(KString::from_string(s)) }
}

impl From<KString> for Value {
    fn from(s: KString) -> Self { Value::Str(s) }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(t: DateTime<FixedOffset>) -> Self { Value::Time(t) }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Seq(v.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<KString, Value>> for Value {
    fn from(m: BTreeMap<KString, Value>) -> Self { Value::Map(m) }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Nil, Into::into)
    }
}

impl<T: HostObject + 'static> From<Arc<T>> for Value {
    fn from(o: Arc<T>) -> Self { Value::Object(o) }
}


/// One member of a `Record`.
#[derive(Debug, Clone)]
pub struct RecordField {
    pub name: KString,
    /// Serialization name, e.g. from a `json:"..."` style annotation
    pub tag: Option<KString>,
    pub value: Value,
}

/// A ready `HostObject` for struct-like host data.
#[derive(Debug, Clone)]
pub struct Record {
    type_name: KString,
    fields: Vec<RecordField>,
}

fn first_letter_casefold_eq(a: &str, b: &str) -> bool {
    let mut ac = a.chars();
    let mut bc = b.chars();
    match (ac.next(), bc.next()) {
        (Some(x), Some(y)) =>
            x.to_lowercase().eq(y.to_lowercase()) && ac.as_str() == bc.as_str(),
        _ => false
    }
}

impl Record {
    pub fn new(type_name: impl Into<KString>) -> Self {
        Record { type_name: type_name.into(), fields: Vec::new() }
    }

    pub fn field(mut self, name: impl Into<KString>, value: impl Into<Value>) -> Self {
        self.fields.push(RecordField { name: name.into(), tag: None, value: value.into() });
        self
    }

    pub fn tagged_field(
        mut self,
        name: impl Into<KString>,
        tag: impl Into<KString>,
        value: impl Into<Value>
    ) -> Self {
        self.fields.push(RecordField {
            name: name.into(),
            tag: Some(tag.into()),
            value: value.into()
        });
        self
    }

    pub fn into_value(self) -> Value {
        Value::Object(Arc::new(self))
    }
}

impl HostObject for Record {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn field(&self, name: &str) -> Option<Value> {
        self.fields.iter()
            .find(|f| f.tag.as_deref() == Some(name))
            .or_else(|| self.fields.iter().find(|f| f.name.as_str() == name))
            .or_else(|| self.fields.iter().find(|f| first_letter_casefold_eq(&f.name, name)))
            .map(|f| f.value.clone())
    }

    fn to_map(&self) -> BTreeMap<KString, Value> {
        self.fields.iter()
            .map(|f| (f.tag.clone().unwrap_or_else(|| f.name.clone()), f.value.clone()))
            .collect()
    }
}
