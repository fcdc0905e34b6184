//! Variable paths like `a.b[0]['c']`.

use kstring::KString;


#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// `.name`, `[0]`, `['name']`
    Key(KString),
    /// `[name]`: the key is the value of variable `name`
    Var(KString),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub head: KString,
    pub rest: Vec<Segment>,
}

pub fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

pub fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Whether all of `s` is an identifier.
pub fn is_ident(s: &str) -> bool {
    let mut cs = s.chars();
    match cs.next() {
        Some(c) if is_ident_start(c) => cs.all(is_ident_char),
        _ => false
    }
}

fn take_ident(s: &str) -> Option<(&str, &str)> {
    let mut cs = s.char_indices();
    match cs.next() {
        Some((_, c)) if is_ident_start(c) => (),
        _ => return None
    }
    let end = s.find(|c: char| ! is_ident_char(c)).unwrap_or(s.len());
    Some((&s[..end], &s[end..]))
}

impl Path {
    /// Parse a complete path; `None` if `s` (trimmed) is anything
    /// else.
    pub fn parse(s: &str) -> Option<Path> {
        let s = s.trim();
        let (head, mut rest) = take_ident(s)?;
        let mut segments = Vec::new();
        while ! rest.is_empty() {
            if let Some(r) = rest.strip_prefix('.') {
                // `.0` is accepted as index, too
                let end = r.find(|c: char| ! is_ident_char(c)).unwrap_or(r.len());
                if end == 0 {
                    return None
                }
                segments.push(Segment::Key(KString::from_ref(&r[..end])));
                rest = &r[end..];
            } else if let Some(r) = rest.strip_prefix('[') {
                let close = r.find(']')?;
                let inner = r[..close].trim();
                let seg =
                    if let Some(q) = unquote(inner) {
                        Segment::Key(KString::from_ref(q))
                    } else if ! inner.is_empty() && inner.bytes().all(|b| b.is_ascii_digit()) {
                        Segment::Key(KString::from_ref(inner))
                    } else if is_ident(inner) {
                        Segment::Var(KString::from_ref(inner))
                    } else {
                        return None
                    };
                segments.push(seg);
                rest = &r[close + 1..];
            } else {
                return None
            }
        }
        Some(Path { head: KString::from_ref(head), rest: segments })
    }
}

/// The content of a single or double quoted string literal.
pub fn unquote(s: &str) -> Option<&str> {
    let b = s.as_bytes();
    if b.len() >= 2 && (b[0] == b'\'' || b[0] == b'"') && b[b.len() - 1] == b[0] {
        Some(&s[1..s.len() - 1])
    } else {
        None
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &'static str) -> Segment { Segment::Key(s.into()) }

    #[test]
    fn t_parse() {
        assert_eq!(Path::parse(" a "), Some(Path { head: "a".into(), rest: vec![] }));
        assert_eq!(Path::parse("a.b[0]['c'][\"d e\"][i].0").unwrap().rest,
                   vec![key("b"), key("0"), key("c"), key("d e"), Segment::Var("i".into()), key("0")]);
        for bad in ["", "1a", "a.", "a[", "a[b c]", "a b", "a + b", "a.b()", "x | y", "'s'"] {
            assert_eq!(Path::parse(bad), None, "{bad:?}");
        }
    }

    #[test]
    fn t_ident() {
        assert!(is_ident("_x1"));
        assert!(! is_ident("1x"));
        assert!(! is_ident("a-b"));
    }
}
