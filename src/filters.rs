//! Built-in filters.

use anyhow::{bail, Result};
use chrono::{format::{Item, StrftimeItems}, DateTime, FixedOffset};
use itertools::Itertools;

use crate::funcs::{coerce, FuncMap, Kind, Signature};
use crate::value::Value;


fn string_arg(args: &[Value], i: usize) -> String {
    args.get(i).map(|v| v.to_string()).unwrap_or_default()
}

/// Upper-case the first letter of every whitespace-delimited word,
/// lower-case the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_whitespace() {
            at_word_start = true;
            out.push(c);
        } else if at_word_start {
            at_word_start = false;
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// Tokens of the Go reference time layout, longest first where
/// prefixes overlap.
const GO_LAYOUT: &[(&str, &str)] = &[
    ("2006", "%Y"),
    ("January", "%B"),
    ("Jan", "%b"),
    ("Monday", "%A"),
    ("Mon", "%a"),
    ("MST", "%Z"),
    ("Z07:00", "%:z"),
    ("-07:00", "%:z"),
    ("-0700", "%z"),
    (".000000", "%.6f"),
    (".000", "%.3f"),
    ("01", "%m"),
    ("02", "%d"),
    ("03", "%I"),
    ("04", "%M"),
    ("05", "%S"),
    ("06", "%y"),
    ("15", "%H"),
    ("_2", "%e"),
    ("PM", "%p"),
    ("pm", "%P"),
    ("1", "%-m"),
    ("2", "%-d"),
    ("3", "%-I"),
    ("4", "%-M"),
    ("5", "%-S"),
];

/// Layouts containing `%` are strftime formats, anything else is
/// read as a Go style reference layout ("2006-01-02 15:04").
pub fn strftime_layout(layout: &str) -> String {
    if layout.contains('%') {
        return layout.to_string()
    }
    let mut out = String::with_capacity(layout.len() * 2);
    let mut rest = layout;
    'outer: while let Some(c) = rest.chars().next() {
        for (go, strf) in GO_LAYOUT {
            if let Some(r) = rest.strip_prefix(go) {
                out.push_str(strf);
                rest = r;
                continue 'outer;
            }
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

fn format_time(t: &DateTime<FixedOffset>, layout: &str) -> Result<String> {
    let layout = strftime_layout(layout);
    let items: Vec<Item> = StrftimeItems::new(&layout).collect();
    if items.iter().any(|i| matches!(i, Item::Error)) {
        bail!("invalid time layout {layout:?}")
    }
    Ok(t.format_with_items(items.into_iter()).to_string())
}

fn int_filter(v: Value) -> Result<Value> {
    Ok(match v {
        Value::Bool(b) => Value::Int(b as i64),
        Value::Str(s) => match s.trim().parse::<i64>() {
            Ok(i) => Value::Int(i),
            Err(_) => match s.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Value::Int(f.trunc() as i64),
                _ => coerce(Value::Str(s), Kind::Int)?,
            }
        },
        v => coerce(v, Kind::Int)?,
    })
}

/// Register the built-in filters.
pub fn install(funcs: &mut FuncMap) {
    use Kind::*;

    funcs.insert_fn("upper", Signature::new(&[Str]), |args| {
        Ok(Value::from(string_arg(&args, 0).to_uppercase()))
    });
    funcs.insert_fn("lower", Signature::new(&[Str]), |args| {
        Ok(Value::from(string_arg(&args, 0).to_lowercase()))
    });
    funcs.insert_fn("title", Signature::new(&[Str]), |args| {
        Ok(Value::from(title_case(&string_arg(&args, 0))))
    });
    funcs.insert_fn("trim", Signature::new(&[Str]), |args| {
        Ok(Value::from(string_arg(&args, 0).trim()))
    });
    funcs.insert_fn("formatTime", Signature::new(&[Any, Str]), |mut args| {
        let layout = string_arg(&args, 1);
        let value = args.swap_remove(0);
        match &value {
            Value::Time(t) => Ok(Value::from(format_time(t, &layout)?)),
            Value::Str(s) => match DateTime::parse_from_rfc3339(s.trim()) {
                Ok(t) => Ok(Value::from(format_time(&t, &layout)?)),
                Err(_) => Ok(value),
            },
            _ => Ok(value),
        }
    });
    funcs.insert_fn("default", Signature::new(&[Any, Any]), |mut args| {
        let fallback = args.pop().unwrap_or_default();
        let value = args.pop().unwrap_or_default();
        let missing = match &value {
            Value::Nil => true,
            Value::Str(s) => s.is_empty(),
            _ => false,
        };
        Ok(if missing { fallback } else { value })
    });
    funcs.insert_fn("len", Signature::new(&[Any]), |args| {
        Ok(Value::Int(args.first().and_then(|v| v.len()).unwrap_or(0) as i64))
    });
    funcs.insert_fn("escape", Signature::new(&[Any]), |args| {
        Ok(Value::from(vhtml::html_escape(&string_arg(&args, 0)).into_owned()))
    });
    funcs.insert_fn("int", Signature::new(&[Any]), |mut args| {
        int_filter(args.pop().unwrap_or_default())
    });
    funcs.insert_fn("string", Signature::new(&[Any]), |args| {
        Ok(Value::from(string_arg(&args, 0)))
    });
    funcs.insert_fn("json", Signature::new(&[Any]), |args| {
        Ok(Value::from(args.first().cloned().unwrap_or_default().to_json_pretty()?))
    });
    funcs.insert_fn("join", Signature::new(&[Seq, Str]), |args| {
        let sep = string_arg(&args, 1);
        Ok(match args.first() {
            Some(Value::Seq(items)) => Value::from(items.iter().join(&sep)),
            _ => Value::str(""),
        })
    });
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VResult;

    fn call(name: &str, args: Vec<Value>) -> VResult<Value> {
        let mut funcs = FuncMap::new();
        install(&mut funcs);
        funcs.call(name, args)
    }

    #[test]
    fn t_strings() -> VResult<()> {
        assert_eq!(call("upper", vec![Value::str("john doe")])?, Value::str("JOHN DOE"));
        assert_eq!(call("title", vec![Value::str("JOHN  doe-x")])?, Value::str("John  Doe-x"));
        assert_eq!(call("trim", vec![Value::str("  x ")])?, Value::str("x"));
        assert_eq!(call("escape", vec![Value::str("<a & b>")])?, Value::str("&lt;a &amp; b&gt;"));
        assert_eq!(call("escape", vec![Value::Int(3)])?, Value::str("3"));
        assert_eq!(call("lower", vec![Value::Int(3)])?, Value::str("3"));
        Ok(())
    }

    #[test]
    fn t_default_len() -> VResult<()> {
        assert_eq!(call("default", vec![Value::Nil, Value::str("x")])?, Value::str("x"));
        assert_eq!(call("default", vec![Value::str(""), Value::str("x")])?, Value::str("x"));
        assert_eq!(call("default", vec![Value::Int(0), Value::str("x")])?, Value::Int(0));
        assert_eq!(call("len", vec![Value::str("äbc")])?, Value::Int(3));
        assert_eq!(call("len", vec![Value::from(vec![1, 2])])?, Value::Int(2));
        assert_eq!(call("len", vec![Value::Int(5)])?, Value::Int(0));
        Ok(())
    }

    #[test]
    fn t_conversions() -> VResult<()> {
        assert_eq!(call("int", vec![Value::str("12")])?, Value::Int(12));
        assert_eq!(call("int", vec![Value::str("3.9")])?, Value::Int(3));
        assert_eq!(call("int", vec![Value::Float(-2.5)])?, Value::Int(-2));
        assert!(call("int", vec![Value::str("x")]).is_err());
        assert_eq!(call("string", vec![Value::Float(2.0)])?, Value::str("2"));
        assert_eq!(call("json", vec![Value::from(vec![1])])?, Value::str("[\n  1\n]"));
        assert_eq!(call("join", vec![Value::from(vec!["a", "b"]), Value::str(", ")])?,
                   Value::str("a, b"));
        Ok(())
    }

    #[test]
    fn t_format_time() -> VResult<()> {
        let t = Value::str("2024-03-05T14:07:09+01:00");
        assert_eq!(call("formatTime", vec![t.clone(), Value::str("2006-01-02")])?,
                   Value::str("2024-03-05"));
        assert_eq!(call("formatTime", vec![t.clone(), Value::str("Jan 2, 15:04")])?,
                   Value::str("Mar 5, 14:07"));
        assert_eq!(call("formatTime", vec![t, Value::str("%d.%m.%Y")])?,
                   Value::str("05.03.2024"));
        assert_eq!(call("formatTime", vec![Value::str("yesterday"), Value::str("2006")])?,
                   Value::str("yesterday"));
        assert_eq!(call("formatTime", vec![Value::Int(5), Value::str("2006")])?, Value::Int(5));
        Ok(())
    }

    #[test]
    fn t_layout_translation() {
        assert_eq!(strftime_layout("2006-01-02T15:04:05Z07:00"), "%Y-%m-%dT%H:%M:%S%:z");
        assert_eq!(strftime_layout("Monday, January 2"), "%A, %B %-d");
    }
}
