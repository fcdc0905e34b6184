//! The pipe sublanguage: `value | filter(args) | . > 5`.

use kstring::KString;

use crate::error::{VResult, VueErrorKind};
use crate::evaluator::{Evaluator, ScopeEnv};
use crate::path::{is_ident, is_ident_char, is_ident_start, unquote, Path};
use crate::scope::Scope;
use crate::value::Value;


/// A filter call argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// Quoted string, integer, float or boolean
    Lit(Value),
    /// Resolved as a path at evaluation time, or if that fails,
    /// taken as the raw text.
    Token(KString),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Filter { name: KString, args: Vec<Arg> },
    /// Evaluated by the expression engine, with `.` bound to the
    /// current value.
    RawExpr(KString),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathExpr {
    pub source: KString,
    pub path: Path,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipeExpr {
    pub initial: Option<PathExpr>,
    pub segments: Vec<Segment>,
}

/// Operators that make an unpiped expression go to the expression
/// engine as a whole.
const COMPLEX_OPS: &[&str] = &["==", "!=", "<=", ">=", "<", ">", "&&", "||"];

/// Positions of top-level occurrences of `sep` in `s`, outside of
/// quotes and brackets of any kind. For `|`, `||` is skipped.
fn top_level_positions(s: &str, sep: u8) -> Vec<usize> {
    let bytes = s.as_bytes();
    let mut positions = Vec::new();
    let mut depth: i32 = 0;
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 1;
            } else if b == q {
                quote = None;
            }
        } else {
            match b {
                b'\'' | b'"' => quote = Some(b),
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth -= 1,
                _ if b == sep && depth == 0 => {
                    if sep == b'|' && bytes.get(i + 1) == Some(&b'|') {
                        i += 2;
                        continue;
                    }
                    positions.push(i);
                }
                _ => ()
            }
        }
        i += 1;
    }
    positions
}

fn split_top_level(s: &str, sep: u8) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for p in top_level_positions(s, sep) {
        pieces.push(&s[start..p]);
        start = p + 1;
    }
    pieces.push(&s[start..]);
    pieces
}

pub fn has_top_level_pipe(s: &str) -> bool {
    ! top_level_positions(s, b'|').is_empty()
}

/// Comma split respecting quotes and brackets.
pub fn split_args(s: &str) -> Vec<&str> {
    if s.trim().is_empty() {
        return Vec::new()
    }
    split_top_level(s, b',').into_iter().map(str::trim).collect()
}

/// `name(args)` covering all of `s`: the name and the text between
/// the parens.
pub fn as_call(s: &str) -> Option<(&str, &str)> {
    let s = s.trim();
    let first = s.chars().next()?;
    if ! is_ident_start(first) {
        return None
    }
    let name_end = s.find(|c: char| ! is_ident_char(c))?;
    let rest = &s[name_end..];
    if ! rest.starts_with('(') || ! rest.ends_with(')') {
        return None
    }
    // the opening paren must be closed by the last character only
    let inner = &rest[1..rest.len() - 1];
    let mut depth = 0i32;
    let mut quote = None;
    for b in inner.bytes() {
        match quote {
            Some(q) => if b == q { quote = None },
            None => match b {
                b'\'' | b'"' => quote = Some(b),
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth < 0 {
                        return None
                    }
                }
                _ => ()
            }
        }
    }
    if depth != 0 {
        return None
    }
    Some((&s[..name_end], inner))
}

pub fn parse_arg(s: &str) -> Arg {
    let s = s.trim();
    if let Some(q) = unquote(s) {
        Arg::Lit(Value::from(q))
    } else if let Ok(i) = s.parse::<i64>() {
        Arg::Lit(Value::Int(i))
    } else if let Ok(f) = s.parse::<f64>() {
        Arg::Lit(Value::Float(f))
    } else if let Ok(b) = s.parse::<bool>() {
        Arg::Lit(Value::Bool(b))
    } else {
        Arg::Token(KString::from_ref(s))
    }
}

fn filter_segment(name: &str, args: &str) -> Segment {
    Segment::Filter {
        name: KString::from_ref(name),
        args: split_args(args).into_iter().map(parse_arg).collect(),
    }
}

/// A piece after a `|`.
fn classify_segment(s: &str) -> Segment {
    let s = s.trim();
    if is_ident(s) {
        filter_segment(s, "")
    } else if let Some((name, args)) = as_call(s) {
        filter_segment(name, args)
    } else {
        Segment::RawExpr(KString::from_ref(s))
    }
}

impl PipeExpr {
    pub fn parse(s: &str) -> PipeExpr {
        let pieces = split_top_level(s, b'|');
        let (first, rest) = match pieces.split_first() {
            Some(x) => x,
            None => return PipeExpr { initial: None, segments: Vec::new() },
        };
        let first = first.trim();
        let mut segments = Vec::new();
        let mut initial = None;

        if let Some((name, args)) = as_call(first) {
            segments.push(filter_segment(name, args));
        } else if rest.is_empty() && COMPLEX_OPS.iter().any(|op| first.contains(op)) {
            segments.push(Segment::RawExpr(KString::from_ref(first)));
        } else if let Some(path) = Path::parse(first) {
            initial = Some(PathExpr { source: KString::from_ref(first), path });
        } else {
            segments.push(Segment::RawExpr(KString::from_ref(first)));
        }
        segments.extend(rest.iter().map(|s| classify_segment(s)));
        PipeExpr { initial, segments }
    }

    /// A single path without any segments.
    pub fn as_path(&self) -> Option<&PathExpr> {
        match (&self.initial, self.segments.is_empty()) {
            (Some(p), true) => Some(p),
            _ => None
        }
    }

    fn eval_arg(arg: &Arg, scope: &Scope) -> Value {
        match arg {
            Arg::Lit(v) => v.clone(),
            Arg::Token(t) => Path::parse(t)
                .and_then(|p| scope.resolve_path(&p))
                .unwrap_or_else(|| Value::Str(t.clone())),
        }
    }

    pub fn eval(&self, scope: &Scope, ev: &Evaluator) -> VResult<Value> {
        let mut cur = Value::Nil;
        if let Some(initial) = &self.initial {
            match scope.resolve_path(&initial.path) {
                Some(v) => cur = v,
                None if self.segments.is_empty() =>
                    return Err(VueErrorKind::VariableNotFound(initial.source.clone()).into()),
                // fed as nil into the first segment, for `default`
                None => (),
            }
        }
        for (i, segment) in self.segments.iter().enumerate() {
            cur = match segment {
                Segment::Filter { name, args } => {
                    if ! ev.funcs().contains(name) {
                        return Err(VueErrorKind::FunctionNotFound(name.clone()).into())
                    }
                    let mut argv = Vec::with_capacity(args.len() + 1);
                    if i > 0 || self.initial.is_some() {
                        argv.push(cur);
                    }
                    argv.extend(args.iter().map(|a| Self::eval_arg(a, scope)));
                    ev.funcs().call(name, argv)?
                }
                Segment::RawExpr(src) => {
                    let program = ev.program(src)?;
                    program.run(&ScopeEnv::new(scope, ev.funcs(), Some(&cur)))?
                }
            };
        }
        Ok(cur)
    }
}
