use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use kstring::KString;
use strum_macros::EnumString;

use super::lexer::{tokenize, Token};
use crate::value::Value;


#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
pub enum BinOp {
    #[strum(serialize = "**")]
    Pow,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "%")]
    Rem,
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = "in")]
    In,
    #[strum(serialize = "&&", serialize = "and")]
    And,
    #[strum(serialize = "||", serialize = "or")]
    Or,
    #[strum(serialize = "??")]
    Coalesce,
}

impl BinOp {
    fn precedence(self) -> u8 {
        use BinOp::*;
        match self {
            Coalesce => 1,
            Or => 2,
            And => 3,
            Eq | Ne => 4,
            Lt | Le | Gt | Ge | In => 5,
            Add | Sub => 6,
            Mul | Div | Rem => 7,
            Pow => 8,
        }
    }

    fn right_assoc(self) -> bool {
        self == BinOp::Pow
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Lit(Value),
    Ident(KString),
    /// The reserved `.` identifier: the current value of a pipe
    Dot,
    Member(Box<Expr>, KString),
    Index(Box<Expr>, Box<Expr>),
    Call(KString, Vec<Expr>),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    Array(Vec<Expr>),
    MapLit(Vec<(KString, Expr)>),
}


struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn at(&self) -> String {
        match self.tokens.get(self.pos) {
            Some((p, t)) => format!("{t:?} at byte {p}"),
            None => "end of input".into(),
        }
    }

    fn is_op(&self, op: &str) -> bool {
        matches!(self.peek(), Some(Token::Op(o)) if *o == op)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.is_op(op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: &str) -> Result<()> {
        if self.eat_op(op) {
            Ok(())
        } else {
            bail!("expected {op:?}, got {}", self.at())
        }
    }

    fn is_word(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(w)) if w.as_str() == word)
    }

    fn peek_binop(&self) -> Option<BinOp> {
        match self.peek()? {
            Token::Op(o) => BinOp::from_str(o).ok(),
            Token::Ident(w) if matches!(w.as_str(), "and" | "or" | "in") =>
                BinOp::from_str(w).ok(),
            _ => None
        }
    }

    fn expr(&mut self) -> Result<Expr> {
        let cond = self.binary(0)?;
        if self.eat_op("?") {
            let then = self.expr()?;
            self.expect_op(":")?;
            let els = self.expr()?;
            Ok(Expr::Ternary(Box::new(cond), Box::new(then), Box::new(els)))
        } else {
            Ok(cond)
        }
    }

    /// Precedence climbing over binary operators binding tighter
    /// than `min`.
    fn binary(&mut self, min: u8) -> Result<Expr> {
        let mut lhs = self.unary()?;
        while let Some(op) = self.peek_binop() {
            let prec = op.precedence();
            if prec <= min {
                break;
            }
            self.pos += 1;
            let rhs = self.binary(if op.right_assoc() { prec - 1 } else { prec })?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.eat_op("!") {
            Ok(Expr::Unary(UnOp::Not, Box::new(self.unary()?)))
        } else if self.is_word("not") {
            self.pos += 1;
            Ok(Expr::Unary(UnOp::Not, Box::new(self.unary()?)))
        } else if self.eat_op("-") {
            Ok(Expr::Unary(UnOp::Neg, Box::new(self.unary()?)))
        } else if self.eat_op("+") {
            self.unary()
        } else {
            self.postfix()
        }
    }

    fn member_name(&mut self) -> Result<KString> {
        match self.next() {
            Some(Token::Ident(name)) => Ok(name),
            Some(Token::Int(i)) if i >= 0 => Ok(KString::from_string(i.to_string())),
            _ => bail!("expected member name after '.', got {}", self.at())
        }
    }

    fn postfix(&mut self) -> Result<Expr> {
        let mut e = self.primary()?;
        loop {
            if self.eat_op(".") {
                let name = self.member_name()?;
                e = Expr::Member(Box::new(e), name);
            } else if self.eat_op("[") {
                let index = self.expr()?;
                self.expect_op("]")?;
                e = Expr::Index(Box::new(e), Box::new(index));
            } else if self.is_op("(") {
                let name = match &e {
                    Expr::Ident(name) => name.clone(),
                    _ => bail!("only named functions can be called, at {}", self.at())
                };
                self.pos += 1;
                let args = self.list(")")?;
                e = Expr::Call(name, args);
            } else {
                return Ok(e)
            }
        }
    }

    /// Comma separated expressions up to `close`, which is consumed.
    fn list(&mut self, close: &str) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        if self.eat_op(close) {
            return Ok(items)
        }
        loop {
            items.push(self.expr()?);
            if self.eat_op(close) {
                return Ok(items)
            }
            self.expect_op(",")?;
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        let at = self.at();
        match self.next().ok_or_else(|| anyhow!("unexpected end of expression"))? {
            Token::Int(i) => Ok(Expr::Lit(Value::Int(i))),
            Token::Float(f) => Ok(Expr::Lit(Value::Float(f))),
            Token::Str(s) => Ok(Expr::Lit(Value::Str(s))),
            Token::Ident(w) => Ok(match w.as_str() {
                "true" => Expr::Lit(Value::Bool(true)),
                "false" => Expr::Lit(Value::Bool(false)),
                "nil" | "null" => Expr::Lit(Value::Nil),
                _ => Expr::Ident(w),
            }),
            Token::Op(".") => {
                // `.name` is a member of the pipe value
                if let Some(Token::Ident(_)) = self.peek() {
                    let name = self.member_name()?;
                    Ok(Expr::Member(Box::new(Expr::Dot), name))
                } else {
                    Ok(Expr::Dot)
                }
            }
            Token::Op("(") => {
                let e = self.expr()?;
                self.expect_op(")")?;
                Ok(e)
            }
            Token::Op("[") => Ok(Expr::Array(self.list("]")?)),
            Token::Op("{") => {
                let mut pairs = Vec::new();
                if self.eat_op("}") {
                    return Ok(Expr::MapLit(pairs))
                }
                loop {
                    let key = match self.next() {
                        Some(Token::Ident(k)) | Some(Token::Str(k)) => k,
                        _ => bail!("expected map key, got {}", self.at())
                    };
                    self.expect_op(":")?;
                    pairs.push((key, self.expr()?));
                    if self.eat_op("}") {
                        return Ok(Expr::MapLit(pairs))
                    }
                    self.expect_op(",")?;
                }
            }
            _ => bail!("unexpected {at}")
        }
    }
}

pub fn parse_expr(s: &str) -> Result<Expr> {
    let tokens = tokenize(s)?;
    if tokens.is_empty() {
        bail!("empty expression")
    }
    let mut p = Parser { tokens, pos: 0 };
    let e = p.expr()?;
    if p.pos < p.tokens.len() {
        bail!("unexpected {}", p.at())
    }
    Ok(e)
}


#[cfg(test)]
mod tests {
    use super::*;

    fn ident(s: &'static str) -> Box<Expr> { Box::new(Expr::Ident(s.into())) }
    fn int(i: i64) -> Box<Expr> { Box::new(Expr::Lit(Value::Int(i))) }

    #[test]
    fn t_precedence() -> Result<()> {
        assert_eq!(parse_expr("a + 2 * 3")?,
                   Expr::Binary(BinOp::Add, ident("a"),
                                Box::new(Expr::Binary(BinOp::Mul, int(2), int(3)))));
        assert_eq!(parse_expr("a or b and not c")?,
                   Expr::Binary(BinOp::Or, ident("a"),
                                Box::new(Expr::Binary(BinOp::And, ident("b"),
                                                      Box::new(Expr::Unary(UnOp::Not, ident("c")))))));
        assert_eq!(parse_expr("2 ** 3 ** 2")?,
                   Expr::Binary(BinOp::Pow, int(2),
                                Box::new(Expr::Binary(BinOp::Pow, int(3), int(2)))));
        assert_eq!(parse_expr("a - 1 - 2")?,
                   Expr::Binary(BinOp::Sub,
                                Box::new(Expr::Binary(BinOp::Sub, ident("a"), int(1))),
                                int(2)));
        Ok(())
    }

    #[test]
    fn t_postfix_and_literals() -> Result<()> {
        assert_eq!(parse_expr("f(x.y[0], 'z')")?,
                   Expr::Call("f".into(), vec![
                       Expr::Index(Box::new(Expr::Member(ident("x"), "y".into())), int(0)),
                       Expr::Lit(Value::str("z"))]));
        assert_eq!(parse_expr(". > 5")?, Expr::Binary(BinOp::Gt, Box::new(Expr::Dot), int(5)));
        assert_eq!(parse_expr(".name")?, Expr::Member(Box::new(Expr::Dot), "name".into()));
        assert_eq!(parse_expr("{a: 1, 'b c': [true, nil]}")?,
                   Expr::MapLit(vec![
                       ("a".into(), Expr::Lit(Value::Int(1))),
                       ("b c".into(), Expr::Array(vec![Expr::Lit(Value::Bool(true)),
                                                       Expr::Lit(Value::Nil)]))]));
        assert!(matches!(parse_expr("c ? 1 : 2")?, Expr::Ternary(..)));
        Ok(())
    }

    #[test]
    fn t_errors() {
        for bad in ["", "a +", "(a", "a b", "1(2)", "{a 1}", "a ? b"] {
            assert!(parse_expr(bad).is_err(), "{bad:?}");
        }
    }
}
