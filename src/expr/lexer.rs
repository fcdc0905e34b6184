use anyhow::{bail, Result};
use kstring::KString;

use crate::path::{is_ident_char, is_ident_start};


#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    Str(KString),
    /// Identifiers, including the word operators `and`, `or`, `not`,
    /// `in`
    Ident(KString),
    Op(&'static str),
}

/// Longest first.
const OPS: &[&str] = &[
    "===", "!==",
    "**", "==", "!=", "<=", ">=", "&&", "||", "??",
    "+", "-", "*", "/", "%", "<", ">", "!", "?", ":", ",", ".",
    "(", ")", "[", "]", "{", "}",
];

fn normalize_op(op: &'static str) -> &'static str {
    match op {
        "===" => "==",
        "!==" => "!=",
        _ => op
    }
}

/// Tokens with their byte position.
pub fn tokenize(s: &str) -> Result<Vec<(usize, Token)>> {
    let mut tokens = Vec::new();
    let mut chars = s.char_indices().peekable();
    'outer: while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c.is_ascii_digit() {
            let rest = &s[pos..];
            let mut end = rest.find(|c: char| ! c.is_ascii_digit()).unwrap_or(rest.len());
            let mut is_float = false;
            let rb = rest.as_bytes();
            if end + 1 < rb.len() && rb[end] == b'.' && rb[end + 1].is_ascii_digit() {
                is_float = true;
                end += 1;
                end += rest[end..].find(|c: char| ! c.is_ascii_digit()).unwrap_or(rest.len() - end);
            }
            if end < rb.len() && (rb[end] == b'e' || rb[end] == b'E') {
                let mut e = end + 1;
                if e < rb.len() && (rb[e] == b'+' || rb[e] == b'-') {
                    e += 1;
                }
                if e < rb.len() && rb[e].is_ascii_digit() {
                    is_float = true;
                    end = e + rest[e..].find(|c: char| ! c.is_ascii_digit()).unwrap_or(rest.len() - e);
                }
            }
            let text = &rest[..end];
            let token =
                if is_float {
                    Token::Float(text.parse()?)
                } else {
                    match text.parse::<i64>() {
                        Ok(i) => Token::Int(i),
                        Err(_) => Token::Float(text.parse()?),
                    }
                };
            tokens.push((pos, token));
            while chars.peek().map_or(false, |(p, _)| *p < pos + end) {
                chars.next();
            }
            continue;
        }
        if is_ident_start(c) {
            let rest = &s[pos..];
            let end = rest.find(|c: char| ! is_ident_char(c)).unwrap_or(rest.len());
            tokens.push((pos, Token::Ident(KString::from_ref(&rest[..end]))));
            while chars.peek().map_or(false, |(p, _)| *p < pos + end) {
                chars.next();
            }
            continue;
        }
        if c == '"' || c == '\'' {
            chars.next();
            let mut buf = String::new();
            loop {
                match chars.next() {
                    None => bail!("unterminated string literal at byte {pos}"),
                    Some((_, '\\')) => match chars.next() {
                        None => bail!("unterminated string literal at byte {pos}"),
                        Some((_, 'n')) => buf.push('\n'),
                        Some((_, 't')) => buf.push('\t'),
                        Some((_, 'r')) => buf.push('\r'),
                        Some((_, other)) => buf.push(other),
                    },
                    Some((_, q)) if q == c => break,
                    Some((_, other)) => buf.push(other),
                }
            }
            tokens.push((pos, Token::Str(KString::from_string(buf))));
            continue;
        }
        for op in OPS {
            if s[pos..].starts_with(op) {
                tokens.push((pos, Token::Op(normalize_op(op))));
                for _ in 0..op.len() {
                    chars.next();
                }
                continue 'outer;
            }
        }
        bail!("unexpected character {c:?} at byte {pos}")
    }
    Ok(tokens)
}


#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<Token> {
        tokenize(s).unwrap().into_iter().map(|(_, t)| t).collect()
    }

    #[test]
    fn t_tokenize() {
        use Token::*;
        assert_eq!(toks("a.b[0] >= 1.5e2 && !x"),
                   [Ident("a".into()), Op("."), Ident("b".into()), Op("["), Int(0), Op("]"),
                    Op(">="), Float(150.0), Op("&&"), Op("!"), Ident("x".into())]);
        assert_eq!(toks(r#"'it\'s' === "q""#),
                   [Str("it's".into()), Op("=="), Str("q".into())]);
        assert_eq!(toks("x ?? 2 ** 3"), [Ident("x".into()), Op("??"), Int(2), Op("**"), Int(3)]);
        assert_eq!(toks("items.0"), [Ident("items".into()), Op("."), Int(0)]);
    }

    #[test]
    fn t_errors() {
        assert!(tokenize("'abc").is_err());
        assert!(tokenize("a # b").is_err());
    }
}
