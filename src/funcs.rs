//! The function registry: filters and functions callable from pipes
//! and expressions, with declared signatures and argument coercion.

use std::{collections::HashMap, fmt, sync::Arc};

use chrono::DateTime;
use kstring::KString;
use strum_macros::{Display, EnumString};

use crate::error::{VResult, VueErrorKind};
use crate::value::Value;


/// Parameter types of a `Signature`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Kind {
    Any,
    Str,
    Int,
    Uint,
    Float,
    Bool,
    Seq,
    Map,
    Time,
}

impl Kind {
    pub fn zero(self) -> Value {
        match self {
            Kind::Any => Value::Nil,
            Kind::Str => Value::str(""),
            Kind::Int => Value::Int(0),
            Kind::Uint => Value::Uint(0),
            Kind::Float => Value::Float(0.0),
            Kind::Bool => Value::Bool(false),
            Kind::Seq => Value::Seq(Vec::new()),
            Kind::Map => Value::Map(Default::default()),
            // there is no useful zero time
            Kind::Time => Value::Nil,
        }
    }
}

fn cannot_convert(v: &Value, to: Kind) -> VueErrorKind {
    match v {
        Value::Str(s) => VueErrorKind::Coercion(format!("cannot convert {:?} to {to}", s.as_str())),
        _ => VueErrorKind::Coercion(format!("cannot convert {} {v} to {to}", v.type_name())),
    }
}

/// Accepting the same spellings as strconv.ParseBool does.
fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None
    }
}

/// Convert `v` to type `to`: strings parse to numbers and booleans,
/// scalars format to strings, numbers convert among themselves; nil
/// becomes the zero value of `to`.
pub fn coerce(v: Value, to: Kind) -> VResult<Value> {
    if v.is_nil() {
        return Ok(to.zero())
    }
    let err = |v: &Value| -> VResult<Value> { Err(cannot_convert(v, to).into()) };
    match to {
        Kind::Any => Ok(v),
        Kind::Str => match v {
            Value::Str(_) => Ok(v),
            Value::Int(_) | Value::Uint(_) | Value::Float(_) | Value::Bool(_) | Value::Time(_) =>
                Ok(Value::from(v.to_string())),
            _ => err(&v),
        },
        Kind::Int => match &v {
            Value::Int(_) => Ok(v),
            Value::Uint(u) => i64::try_from(*u).map(Value::Int).or_else(|_| err(&v)),
            Value::Float(f) if f.is_finite() => Ok(Value::Int(f.trunc() as i64)),
            Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).or_else(|_| err(&v)),
            _ => err(&v),
        },
        Kind::Uint => match &v {
            Value::Uint(_) => Ok(v),
            Value::Int(i) => u64::try_from(*i).map(Value::Uint).or_else(|_| err(&v)),
            Value::Float(f) if f.is_finite() && *f >= 0.0 => Ok(Value::Uint(f.trunc() as u64)),
            Value::Str(s) => s.trim().parse::<u64>().map(Value::Uint).or_else(|_| err(&v)),
            _ => err(&v),
        },
        Kind::Float => match &v {
            Value::Float(_) => Ok(v),
            Value::Int(_) | Value::Uint(_) => Ok(Value::Float(v.as_f64().unwrap_or_default())),
            Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).or_else(|_| err(&v)),
            _ => err(&v),
        },
        Kind::Bool => match &v {
            Value::Bool(_) => Ok(v),
            Value::Str(s) => parse_bool(s.trim()).map(Value::Bool).map_or_else(|| err(&v), Ok),
            _ => err(&v),
        },
        Kind::Seq => match v {
            Value::Seq(_) => Ok(v),
            _ => err(&v),
        },
        Kind::Map => match v {
            Value::Map(_) => Ok(v),
            Value::Object(o) => Ok(Value::Map(o.to_map())),
            _ => err(&v),
        },
        Kind::Time => match &v {
            Value::Time(_) => Ok(v),
            Value::Str(s) => DateTime::parse_from_rfc3339(s.trim()).map(Value::Time).or_else(|_| err(&v)),
            _ => err(&v),
        },
    }
}


/// Declared parameter types. When `variadic`, the last parameter
/// type applies to any number (including zero) of trailing
/// arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub params: Vec<Kind>,
    pub variadic: bool,
}

impl Signature {
    pub fn new(params: &[Kind]) -> Self {
        Signature { params: params.to_vec(), variadic: false }
    }

    pub fn variadic(params: &[Kind]) -> Self {
        Signature { params: params.to_vec(), variadic: true }
    }

    fn expected(&self) -> String {
        if self.variadic {
            format!("at least {}", self.params.len().saturating_sub(1))
        } else {
            self.params.len().to_string()
        }
    }

    pub fn accepts(&self, n: usize) -> bool {
        if self.variadic {
            n + 1 >= self.params.len()
        } else {
            n == self.params.len()
        }
    }

    /// Check arity and coerce every argument to its parameter type.
    pub fn coerce_args(&self, name: &str, args: Vec<Value>) -> VResult<Vec<Value>> {
        if ! self.accepts(args.len()) {
            return Err(VueErrorKind::Arity {
                name: KString::from_ref(name),
                expected: self.expected(),
                got: args.len(),
            }.into())
        }
        let last = self.params.last().copied().unwrap_or(Kind::Any);
        args.into_iter().enumerate()
            .map(|(i, arg)| coerce(arg, self.params.get(i).copied().unwrap_or(last)))
            .collect()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, k) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}")?;
            if self.variadic && i + 1 == self.params.len() {
                write!(f, "...")?;
            }
        }
        write!(f, ")")
    }
}


/// A callable registered under a name. Returning nothing is
/// expressed as `Ok(Value::Nil)`; an `Err` aborts the render and is
/// reported with the function name.
pub trait Filter: Send + Sync {
    fn signature(&self) -> &Signature;
    fn call(&self, args: Vec<Value>) -> anyhow::Result<Value>;
}

pub struct FnFilter<F> {
    signature: Signature,
    f: F,
}

impl<F> FnFilter<F>
where F: Fn(Vec<Value>) -> anyhow::Result<Value> + Send + Sync
{
    pub fn new(signature: Signature, f: F) -> Self {
        FnFilter { signature, f }
    }
}

impl<F> Filter for FnFilter<F>
where F: Fn(Vec<Value>) -> anyhow::Result<Value> + Send + Sync
{
    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn call(&self, args: Vec<Value>) -> anyhow::Result<Value> {
        (self.f)(args)
    }
}


/// Name -> callable. Filled when building the engine, immutable
/// afterwards.
#[derive(Clone, Default)]
pub struct FuncMap {
    map: HashMap<KString, Arc<dyn Filter>>,
}

impl fmt::Debug for FuncMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.map.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        f.debug_struct("FuncMap").field("names", &names).finish()
    }
}

impl FuncMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register, replacing an existing entry of the same name.
    pub fn insert(&mut self, name: impl Into<KString>, filter: Arc<dyn Filter>) {
        self.map.insert(name.into(), filter);
    }

    pub fn insert_fn<F>(&mut self, name: impl Into<KString>, signature: Signature, f: F)
    where F: Fn(Vec<Value>) -> anyhow::Result<Value> + Send + Sync + 'static
    {
        self.insert(name, Arc::new(FnFilter::new(signature, f)));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Filter>> {
        self.map.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn call(&self, name: &str, args: Vec<Value>) -> VResult<Value> {
        let filter = self.get(name).ok_or_else(
            || VueErrorKind::FunctionNotFound(KString::from_ref(name)))?;
        let args = filter.signature().coerce_args(name, args)?;
        filter.call(args).map_err(|source| VueErrorKind::Filter {
            name: KString::from_ref(name),
            source
        }.into())
    }
}
