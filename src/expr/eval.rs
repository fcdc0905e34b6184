use std::cmp::Ordering;

use anyhow::anyhow;

use super::parser::{BinOp, Expr, UnOp};
use super::Env;
use crate::error::{VResult, VueError};
use crate::value::Value;


fn type_error(msg: String) -> VueError {
    anyhow!(msg).into()
}

#[derive(Debug, Clone, Copy)]
enum Num {
    I(i64),
    F(f64),
}

fn num(v: &Value) -> Option<Num> {
    match v {
        Value::Int(i) => Some(Num::I(*i)),
        Value::Uint(u) => Some(match i64::try_from(*u) {
            Ok(i) => Num::I(i),
            Err(_) => Num::F(*u as f64),
        }),
        Value::Float(f) => Some(Num::F(*f)),
        _ => None
    }
}

impl Num {
    fn f(self) -> f64 {
        match self {
            Num::I(i) => i as f64,
            Num::F(f) => f,
        }
    }
}

/// Equality as used by `==` and `in`: numbers compare by value
/// across int/uint/float.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (num(a), num(b)) {
        (Some(Num::I(x)), Some(Num::I(y))) => x == y,
        (Some(x), Some(y)) => x.f() == y.f(),
        _ => a == b
    }
}

fn compare(a: &Value, b: &Value) -> VResult<Ordering> {
    if let (Some(x), Some(y)) = (num(a), num(b)) {
        return match (x, y) {
            (Num::I(x), Num::I(y)) => Ok(x.cmp(&y)),
            _ => x.f().partial_cmp(&y.f())
                .ok_or_else(|| type_error(format!("cannot compare {} with {}", x.f(), y.f())))
        }
    }
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(x.as_str().cmp(y.as_str())),
        (Value::Time(x), Value::Time(y)) => Ok(x.cmp(y)),
        _ => Err(type_error(format!("cannot compare {} with {}", a.type_name(), b.type_name())))
    }
}

fn arith(op: BinOp, a: &Value, b: &Value) -> VResult<Value> {
    let (x, y) = match (num(a), num(b)) {
        (Some(x), Some(y)) => (x, y),
        _ => return Err(type_error(format!(
            "invalid operation: {} {op:?} {}", a.type_name(), b.type_name())))
    };
    if let (Num::I(x), Num::I(y)) = (x, y) {
        let exact = match op {
            BinOp::Add => x.checked_add(y),
            BinOp::Sub => x.checked_sub(y),
            BinOp::Mul => x.checked_mul(y),
            BinOp::Div | BinOp::Rem if y == 0 =>
                return Err(type_error("integer division by zero".into())),
            BinOp::Div => if x.checked_rem(y) == Some(0) { x.checked_div(y) } else { None },
            BinOp::Rem => x.checked_rem(y),
            BinOp::Pow => u32::try_from(y).ok().and_then(|y| x.checked_pow(y)),
            _ => None
        };
        if let Some(i) = exact {
            return Ok(Value::Int(i))
        }
    }
    let (x, y) = (x.f(), y.f());
    Ok(Value::Float(match op {
        BinOp::Add => x + y,
        BinOp::Sub => x - y,
        BinOp::Mul => x * y,
        BinOp::Div => x / y,
        BinOp::Rem => x % y,
        BinOp::Pow => x.powf(y),
        _ => return Err(type_error(format!("bug: {op:?} is not arithmetic")))
    }))
}

fn contains(needle: &Value, haystack: &Value) -> VResult<bool> {
    match haystack {
        Value::Seq(v) => Ok(v.iter().any(|x| loose_eq(needle, x))),
        Value::Map(m) => Ok(m.contains_key(needle.to_string().as_str())),
        Value::Object(o) => Ok(o.field(&needle.to_string()).is_some()),
        Value::Str(s) => Ok(s.contains(needle.to_string().as_str())),
        Value::Nil => Ok(false),
        _ => Err(type_error(format!("cannot search in {}", haystack.type_name())))
    }
}

fn binary(op: BinOp, a: &Expr, b: &Expr, env: &dyn Env) -> VResult<Value> {
    // short-circuiting ones first
    match op {
        BinOp::And => return Ok(Value::Bool(eval(a, env)?.truthy() && eval(b, env)?.truthy())),
        BinOp::Or => return Ok(Value::Bool(eval(a, env)?.truthy() || eval(b, env)?.truthy())),
        BinOp::Coalesce => {
            let x = eval(a, env)?;
            return if x.is_nil() { eval(b, env) } else { Ok(x) }
        }
        _ => ()
    }
    let x = eval(a, env)?;
    let y = eval(b, env)?;
    match op {
        BinOp::Eq => Ok(Value::Bool(loose_eq(&x, &y))),
        BinOp::Ne => Ok(Value::Bool(! loose_eq(&x, &y))),
        BinOp::Lt => Ok(Value::Bool(compare(&x, &y)? == Ordering::Less)),
        BinOp::Le => Ok(Value::Bool(compare(&x, &y)? != Ordering::Greater)),
        BinOp::Gt => Ok(Value::Bool(compare(&x, &y)? == Ordering::Greater)),
        BinOp::Ge => Ok(Value::Bool(compare(&x, &y)? != Ordering::Less)),
        BinOp::In => Ok(Value::Bool(contains(&x, &y)?)),
        BinOp::Add => match (&x, &y) {
            (Value::Str(_), _) | (_, Value::Str(_)) => Ok(Value::from(format!("{x}{y}"))),
            (Value::Seq(p), Value::Seq(q)) => Ok(Value::Seq(p.iter().chain(q).cloned().collect())),
            _ => arith(op, &x, &y),
        },
        _ => arith(op, &x, &y),
    }
}

fn index_key(v: &Value) -> VResult<String> {
    match v {
        Value::Str(s) => Ok(s.to_string()),
        Value::Int(_) | Value::Uint(_) => Ok(v.to_string()),
        _ => Err(type_error(format!("cannot index with {}", v.type_name())))
    }
}

pub fn eval(expr: &Expr, env: &dyn Env) -> VResult<Value> {
    match expr {
        Expr::Lit(v) => Ok(v.clone()),
        Expr::Ident(name) => Ok(env.get(name).unwrap_or_default()),
        Expr::Dot => Ok(env.get(".").unwrap_or_default()),
        Expr::Member(base, name) => {
            let base = eval(base, env)?;
            Ok(base.child(name).map(|c| c.into_owned()).unwrap_or_default())
        }
        Expr::Index(base, index) => {
            let base = eval(base, env)?;
            let key = index_key(&eval(index, env)?)?;
            Ok(base.child(&key).map(|c| c.into_owned()).unwrap_or_default())
        }
        Expr::Call(name, args) => {
            let args = args.iter().map(|a| eval(a, env)).collect::<VResult<Vec<_>>>()?;
            env.call(name, args)
        }
        Expr::Unary(UnOp::Not, e) => Ok(Value::Bool(! eval(e, env)?.truthy())),
        Expr::Unary(UnOp::Neg, e) => match eval(e, env)? {
            Value::Int(i) => Ok(i.checked_neg().map(Value::Int).unwrap_or(Value::Float(-(i as f64)))),
            Value::Uint(u) => Ok(match i64::try_from(u) {
                Ok(i) => Value::Int(-i),
                Err(_) => Value::Float(-(u as f64)),
            }),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(type_error(format!("cannot negate {}", other.type_name())))
        },
        Expr::Binary(op, a, b) => binary(*op, a, b, env),
        Expr::Ternary(c, a, b) =>
            if eval(c, env)?.truthy() { eval(a, env) } else { eval(b, env) },
        Expr::Array(items) => Ok(Value::Seq(
            items.iter().map(|e| eval(e, env)).collect::<VResult<Vec<_>>>()?)),
        Expr::MapLit(pairs) => {
            let mut m = std::collections::BTreeMap::new();
            for (k, e) in pairs {
                m.insert(k.clone(), eval(e, env)?);
            }
            Ok(Value::Map(m))
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parser::parse_expr;
    use crate::error::VueErrorKind;
    use kstring::KString;
    use serde_json::json;

    struct TestEnv(Value);

    impl Env for TestEnv {
        fn get(&self, name: &str) -> Option<Value> {
            self.0.child(name).map(|c| c.into_owned())
        }
        fn call(&self, name: &str, args: Vec<Value>) -> VResult<Value> {
            match name {
                "double" => Ok(Value::Int(args[0].as_f64().unwrap_or(0.) as i64 * 2)),
                _ => Err(VueErrorKind::FunctionNotFound(KString::from_ref(name)).into())
            }
        }
    }

    fn ev(s: &str) -> VResult<Value> {
        let env = TestEnv(Value::from(json!({
            "a": 3, "b": 2.5, "s": "abc", "xs": [1, 2, 3], "m": {"k": "v"},
            ".": 7, "t": true, "n": null
        })));
        eval(&parse_expr(s)?, &env)
    }

    #[test]
    fn t_arith() -> VResult<()> {
        assert_eq!(ev("a + 1")?, Value::Int(4));
        assert_eq!(ev("a * b")?, Value::Float(7.5));
        assert_eq!(ev("a / 2")?, Value::Float(1.5));
        assert_eq!(ev("6 / a")?, Value::Int(2));
        assert_eq!(ev("a % 2")?, Value::Int(1));
        assert_eq!(ev("2 ** 10")?, Value::Int(1024));
        assert_eq!(ev("-a")?, Value::Int(-3));
        assert_eq!(ev("s + a")?, Value::str("abc3"));
        assert!(ev("a / 0").is_err());
        assert!(ev("s - 1").is_err());
        Ok(())
    }

    #[test]
    fn t_arith_overflow() -> VResult<()> {
        let env = TestEnv(Value::from(json!({"n": i64::MIN, "m": i64::MAX})));
        let run = |s: &str| eval(&parse_expr(s)?, &env);
        // no exact integer quotient; falls back to float
        assert_eq!(run("n / -1")?, Value::Float(9223372036854775808.0));
        assert_eq!(run("n % -1")?, Value::Float(0.0));
        assert_eq!(run("m + 1")?, Value::Float(9223372036854775808.0));
        assert_eq!(run("n / 2")?, Value::Int(i64::MIN / 2));
        Ok(())
    }

    #[test]
    fn t_logic() -> VResult<()> {
        assert_eq!(ev("a > 2 && s == 'abc'")?, Value::Bool(true));
        assert_eq!(ev("a == 3.0")?, Value::Bool(true));
        assert_eq!(ev("missing == nil")?, Value::Bool(true));
        assert_eq!(ev("not t or n")?, Value::Bool(false));
        assert_eq!(ev("2 in xs")?, Value::Bool(true));
        assert_eq!(ev("'k' in m")?, Value::Bool(true));
        assert_eq!(ev("'bc' in s")?, Value::Bool(true));
        assert_eq!(ev("n ?? 'x'")?, Value::str("x"));
        assert_eq!(ev("a > 5 ? 'big' : 'small'")?, Value::str("small"));
        assert_eq!(ev(". > 5")?, Value::Bool(true));
        assert!(ev("s < 1").is_err());
        Ok(())
    }

    #[test]
    fn t_access_and_calls() -> VResult<()> {
        assert_eq!(ev("xs[1]")?, Value::Int(2));
        assert_eq!(ev("xs.2")?, Value::Int(3));
        assert_eq!(ev("m.k")?, Value::str("v"));
        assert_eq!(ev("m['k']")?, Value::str("v"));
        assert_eq!(ev("m.nope.deeper")?, Value::Nil);
        assert_eq!(ev("double(a)")?, Value::Int(6));
        let e = ev("nope(a)").unwrap_err();
        assert_eq!(e.to_string(), "function 'nope' not found");
        Ok(())
    }
}
