//! A forgiving HTML fragment parser. Keeps attribute order and the
//! attribute names as written (`:myProp` stays camel case), keeps
//! text as written (no entity decoding), drops comments and
//! whitespace-only text, closes unclosed elements at the end of
//! input.

use anyhow::{anyhow, bail, Result};
use kstring::KString;

use crate::allocator::{AId, HtmlAllocator};
use crate::meta::{has_closing_tag, is_raw_text};


struct ContextFrame {
    tag: KString,
    atts: Vec<(KString, KString)>,
    body: Vec<AId>,
}

impl ContextFrame {
    fn new(tag: KString, atts: Vec<(KString, KString)>) -> Self {
        ContextFrame { tag, atts, body: Vec::new() }
    }
}

struct StartTag {
    name: KString,
    atts: Vec<(KString, KString)>,
    self_closing: bool,
    /// Byte position after the closing `>`
    end: usize,
}

fn is_space(b: u8) -> bool {
    b.is_ascii_whitespace()
}

fn skip_space(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && is_space(bytes[i]) {
        i += 1;
    }
    i
}

fn parse_start_tag(s: &str, pos: usize) -> Result<StartTag> {
    let bytes = s.as_bytes();
    let len = bytes.len();
    let mut i = pos + 1;
    let name_start = i;
    while i < len && ! is_space(bytes[i]) && bytes[i] != b'>' && bytes[i] != b'/' {
        i += 1;
    }
    let name = KString::from_string(s[name_start..i].to_ascii_lowercase());
    let mut atts = Vec::new();
    loop {
        i = skip_space(bytes, i);
        if i >= len {
            bail!("unterminated start tag <{name} at byte {pos}")
        }
        match bytes[i] {
            b'>' => return Ok(StartTag { name, atts, self_closing: false, end: i + 1 }),
            b'/' => {
                if bytes.get(i + 1) == Some(&b'>') {
                    return Ok(StartTag { name, atts, self_closing: true, end: i + 2 })
                }
                i += 1;
                continue;
            }
            _ => ()
        }

        let att_start = i;
        while i < len
            && ! is_space(bytes[i])
            && bytes[i] != b'='
            && bytes[i] != b'>'
            && ! (bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'>'))
        {
            i += 1;
        }
        let att_name = KString::from_ref(&s[att_start..i]);
        i = skip_space(bytes, i);
        let value =
            if i < len && bytes[i] == b'=' {
                i = skip_space(bytes, i + 1);
                if i < len && (bytes[i] == b'"' || bytes[i] == b'\'') {
                    let quote = bytes[i] as char;
                    let value_start = i + 1;
                    let value_end = s[value_start..].find(quote)
                        .map(|p| value_start + p)
                        .ok_or_else(|| anyhow!(
                            "unterminated value of attribute {:?} in <{name}> at byte {pos}",
                            att_name.as_str()))?;
                    i = value_end + 1;
                    KString::from_ref(&s[value_start..value_end])
                } else {
                    let value_start = i;
                    while i < len && ! is_space(bytes[i]) && bytes[i] != b'>' {
                        i += 1;
                    }
                    KString::from_ref(&s[value_start..i])
                }
            } else {
                KString::from_static("")
            };
        atts.push((att_name, value));
    }
}

/// Name of an end tag starting at `pos` (pointing to `</`), if it is one.
fn end_tag_name(s: &str, pos: usize) -> Option<&str> {
    let rest = &s[pos + 2..];
    let n = rest.find(|c: char| ! (c.is_ascii_alphanumeric() || c == '-' || c == ':' || c == '_'))
        .unwrap_or(rest.len());
    if n == 0 || ! rest.as_bytes()[0].is_ascii_alphabetic() {
        None
    } else {
        Some(&rest[..n])
    }
}

fn frame_to_element(html: &mut HtmlAllocator, frame: ContextFrame) -> AId {
    html.new_element(frame.tag, frame.atts, frame.body)
}

fn parse(html: &mut HtmlAllocator, s: &str, keep_doctype: bool) -> Result<Vec<AId>> {
    let bytes = s.as_bytes();
    let len = bytes.len();
    // The base frame is a wrapper around everything
    let mut context: Vec<ContextFrame> = vec![ContextFrame::new(KString::from_static(""), Vec::new())];

    macro_rules! current_frame {
        () => {
            context.last_mut().ok_or_else(|| anyhow!("bug: base frame was dropped"))?
        }
    }
    macro_rules! flush_text {
        ($from:expr, $to:expr) => {
            if $from < $to {
                let t = &s[$from..$to];
                if ! t.trim().is_empty() {
                    let id = html.text(KString::from_ref(t));
                    current_frame!().body.push(id);
                }
            }
        }
    }

    let mut pos = 0;
    let mut text_start = 0;
    while pos < len {
        if bytes[pos] != b'<' {
            pos += 1;
            continue;
        }
        let rest = &s[pos..];
        if rest.starts_with("<!--") {
            flush_text!(text_start, pos);
            pos = rest.find("-->").map(|i| pos + i + 3).unwrap_or(len);
            text_start = pos;
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            flush_text!(text_start, pos);
            let end = rest.find('>').map(|i| pos + i + 1).ok_or_else(
                || anyhow!("unterminated declaration at byte {pos}"))?;
            if keep_doctype && context.len() == 1 {
                let id = html.raw(KString::from_ref(&s[pos..end]));
                current_frame!().body.push(id);
            }
            pos = end;
            text_start = pos;
            continue;
        }
        if rest.starts_with("</") {
            let name = match end_tag_name(s, pos) {
                Some(name) => name.to_ascii_lowercase(),
                None => {
                    pos += 1;
                    continue;
                }
            };
            flush_text!(text_start, pos);
            let end = rest.find('>').map(|i| pos + i + 1).ok_or_else(
                || anyhow!("unterminated end tag </{name} at byte {pos}"))?;
            // Stray end tags are ignored, otherwise everything opened
            // since is closed implicitly.
            if let Some(i) = context.iter().skip(1).rposition(|f| f.tag.as_str() == name.as_str()) {
                let i = i + 1;
                while context.len() > i {
                    let frame = context.pop().ok_or_else(|| anyhow!("bug: frame vanished"))?;
                    let id = frame_to_element(html, frame);
                    current_frame!().body.push(id);
                }
            }
            pos = end;
            text_start = pos;
            continue;
        }
        if ! bytes.get(pos + 1).map_or(false, |b| b.is_ascii_alphabetic()) {
            // a lone '<' is text
            pos += 1;
            continue;
        }

        flush_text!(text_start, pos);
        let tag = parse_start_tag(s, pos)?;
        pos = tag.end;
        text_start = pos;
        if tag.self_closing || ! has_closing_tag(&tag.name) {
            let id = html.new_element(tag.name, tag.atts, Vec::new());
            current_frame!().body.push(id);
        } else if is_raw_text(&tag.name) {
            let close = format!("</{}", tag.name);
            let (content_end, after) =
                match s[pos..].to_ascii_lowercase().find(&close) {
                    Some(i) => {
                        let content_end = pos + i;
                        let after = s[content_end..].find('>')
                            .map(|j| content_end + j + 1)
                            .unwrap_or(len);
                        (content_end, after)
                    }
                    None => (len, len)
                };
            let content = &s[pos..content_end];
            let body =
                if content.trim().is_empty() {
                    Vec::new()
                } else {
                    vec![html.text(KString::from_ref(content))]
                };
            let id = html.new_element(tag.name, tag.atts, body);
            current_frame!().body.push(id);
            pos = after;
            text_start = pos;
        } else {
            context.push(ContextFrame::new(tag.name, tag.atts));
        }
    }
    flush_text!(text_start, len);

    while context.len() > 1 {
        let frame = context.pop().ok_or_else(|| anyhow!("bug: frame vanished"))?;
        let id = frame_to_element(html, frame);
        current_frame!().body.push(id);
    }
    let base = context.pop().ok_or_else(|| anyhow!("bug: base frame was dropped"))?;
    Ok(base.body)
}

/// Parse `s` as a list of sibling nodes into `html`.
pub fn parse_fragment(html: &mut HtmlAllocator, s: &str) -> Result<Vec<AId>> {
    parse(html, s, false)
}

/// Like `parse_fragment`, but a leading `<!DOCTYPE ..>` is kept as
/// a raw node.
pub fn parse_document(html: &mut HtmlAllocator, s: &str) -> Result<Vec<AId>> {
    parse(html, s, true)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::Node;

    fn tags(html: &HtmlAllocator, roots: &[AId]) -> Vec<String> {
        html.walk(roots).map(|(_, n)| match n {
            Node::Element(e) => e.tag.to_string(),
            Node::Text(s) => format!("'{s}'"),
            Node::Raw(s) => format!("raw:{s}"),
        }).collect()
    }

    #[test]
    fn t_attribute_order_and_case() -> Result<()> {
        let mut html = HtmlAllocator::new();
        let roots = parse_fragment(
            &mut html,
            r#"<div z="1" :myProp='x > 1' a v-if="a && b">hi</div>"#)?;
        assert_eq!(roots.len(), 1);
        let e = html.get_element(roots[0]).unwrap();
        let names: Vec<&str> = e.attr.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, [ "z", ":myProp", "a", "v-if"]);
        assert_eq!(e.get_attr(":myProp"), Some("x > 1"));
        assert_eq!(e.get_attr("a"), Some(""));
        assert_eq!(e.get_attr("v-if"), Some("a && b"));
        Ok(())
    }

    #[test]
    fn t_structure() -> Result<()> {
        let mut html = HtmlAllocator::new();
        let roots = parse_fragment(
            &mut html,
            "<ul>\n  <li>A<br></li>\n  <!-- gone -->\n  <li>B & {{ c }}</li>\n</ul><img src=x />")?;
        assert_eq!(tags(&html, &roots),
                   ["ul", "li", "'A'", "br", "li", "'B & {{ c }}'", "img"]);
        Ok(())
    }

    #[test]
    fn t_raw_text_and_unclosed() -> Result<()> {
        let mut html = HtmlAllocator::new();
        let roots = parse_fragment(
            &mut html,
            "<script>if (a < b) { x = '</div>' }</SCRIPT><div><p>open")?;
        assert_eq!(tags(&html, &roots),
                   ["script", "'if (a < b) { x = '</div>' }'", "div", "p", "'open'"]);
        Ok(())
    }

    #[test]
    fn t_stray_end_tag_and_doctype() -> Result<()> {
        let mut html = HtmlAllocator::new();
        let roots = parse_document(&mut html, "<!DOCTYPE html></span><p>x</p>")?;
        assert_eq!(tags(&html, &roots), ["raw:<!DOCTYPE html>", "p", "'x'"]);
        let mut html = HtmlAllocator::new();
        let roots = parse_fragment(&mut html, "<!DOCTYPE html><p>x</p>")?;
        assert_eq!(tags(&html, &roots), ["p", "'x'"]);
        Ok(())
    }

    #[test]
    fn t_errors() {
        let mut html = HtmlAllocator::new();
        assert!(parse_fragment(&mut html, "<div class=\"x").is_err());
        assert!(parse_fragment(&mut html, "<div").is_err());
    }
}
