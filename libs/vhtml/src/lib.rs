//! Html node arena with index addressing, a forgiving fragment
//! parser, and the serializer for evaluated directive templates.

pub mod allocator;
pub mod meta;
pub mod parse;

use std::{borrow::Cow, io::Write};

use anyhow::Result;

pub use allocator::{AId, Element, HtmlAllocator, Node, Payload, RegionId};
pub use parse::{parse_document, parse_fragment};

use meta::{has_closing_tag, is_directive_attribute, is_preformatted, is_raw_text};

const INDENT: &[u8] = b"  ";

/// Whether `s` looks like it was escaped already (it contains both
/// `&` and `;`); such text is passed through unchanged.
pub fn looks_escaped(s: &str) -> bool {
    s.contains('&') && s.contains(';')
}

pub fn html_escape(s: &str) -> Cow<str> {
    if ! s.contains(|c| matches!(c, '&' | '<' | '>' | '"' | '\'')) {
        return Cow::Borrowed(s)
    }
    let mut buf = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '&' => buf.push_str("&amp;"),
            '<' => buf.push_str("&lt;"),
            '>' => buf.push_str("&gt;"),
            '"' => buf.push_str("&quot;"),
            '\'' => buf.push_str("&#39;"),
            _ => buf.push(c)
        }
    }
    Cow::Owned(buf)
}

/// Escape unless it looks escaped already.
fn escape_text(s: &str) -> Cow<str> {
    if looks_escaped(s) {
        Cow::Borrowed(s)
    } else {
        html_escape(s)
    }
}


#[derive(Debug, Clone, Copy, Default)]
struct Cx {
    depth: usize,
    /// Inside `script` or `style`
    raw: bool,
}

impl Cx {
    fn child(self, tag: &str) -> Cx {
        Cx {
            depth: self.depth + 1,
            raw: self.raw || is_raw_text(tag),
        }
    }
}

fn write_indent(out: &mut impl Write, depth: usize) -> Result<()> {
    for _ in 0..depth {
        out.write_all(INDENT)?;
    }
    Ok(())
}

fn write_text(out: &mut impl Write, s: &str, cx: Cx) -> Result<()> {
    if cx.raw {
        out.write_all(s.as_bytes())?;
    } else {
        out.write_all(escape_text(s).as_bytes())?;
    }
    Ok(())
}

/// Children that produce output. Whitespace-only text is layout
/// only, and dropped.
fn visible_children<'h>(e: &'h Element, html: &'h HtmlAllocator) -> Vec<&'h Node> {
    e.body.iter()
        .filter_map(|id| html.get_node(*id))
        .filter(|n| match n {
            Node::Text(s) => ! s.trim().is_empty(),
            _ => true,
        })
        .collect()
}

fn print_open_tag(e: &Element, out: &mut impl Write) -> Result<()> {
    out.write_all(b"<")?;
    out.write_all(e.tag.as_bytes())?;
    for (k, v) in &e.attr {
        if is_directive_attribute(k) {
            continue;
        }
        out.write_all(b" ")?;
        out.write_all(k.as_bytes())?;
        out.write_all(b"=\"")?;
        out.write_all(escape_text(v).as_bytes())?;
        out.write_all(b"\"")?;
    }
    out.write_all(b">")?;
    Ok(())
}

fn print_close_tag(e: &Element, out: &mut impl Write) -> Result<()> {
    out.write_all(b"</")?;
    out.write_all(e.tag.as_bytes())?;
    out.write_all(b">")?;
    Ok(())
}

/// Print a node on its own line(s), at `cx.depth`.
fn print_block(node: &Node, out: &mut impl Write, html: &HtmlAllocator, cx: Cx) -> Result<()> {
    match node {
        Node::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(())
            }
            write_indent(out, cx.depth)?;
            write_text(out, s, cx)?;
        }
        Node::Raw(s) => {
            write_indent(out, cx.depth)?;
            out.write_all(s.as_bytes())?;
        }
        Node::Element(e) => {
            write_indent(out, cx.depth)?;
            print_element(e, out, html, cx)?;
        }
    }
    out.write_all(b"\n")?;
    Ok(())
}

/// Print an element starting at the current column; the closing tag
/// of a multi-line element is indented to `cx.depth`.
fn print_element(e: &Element, out: &mut impl Write, html: &HtmlAllocator, cx: Cx) -> Result<()> {
    if let Some(payload) = &e.payload {
        // A template carrying a payload stands for the payload only
        if e.tag.as_str() == "template" {
            out.write_all(payload.as_str().as_bytes())?;
            return Ok(())
        }
        print_open_tag(e, out)?;
        out.write_all(payload.as_str().as_bytes())?;
        print_close_tag(e, out)?;
        return Ok(())
    }

    print_open_tag(e, out)?;
    if ! has_closing_tag(&e.tag) {
        return Ok(())
    }
    let inner = cx.child(&e.tag);
    let children = visible_children(e, html);
    match children.as_slice() {
        [] => (),
        [Node::Text(s)] => {
            let s = if inner.raw || is_preformatted(&e.tag) { &**s } else { s.trim() };
            write_text(out, s, inner)?;
        }
        [Node::Raw(s)] => out.write_all(s.as_bytes())?,
        _ if is_preformatted(&e.tag) => {
            for child in &e.body {
                print_inline(html.try_node(*child)?, out, html, inner)?;
            }
        }
        _ => {
            out.write_all(b"\n")?;
            for child in children {
                print_block(child, out, html, inner)?;
            }
            write_indent(out, cx.depth)?;
        }
    }
    print_close_tag(e, out)?;
    Ok(())
}

/// Print without adding any whitespace (for preformatted content).
fn print_inline(node: &Node, out: &mut impl Write, html: &HtmlAllocator, cx: Cx) -> Result<()> {
    match node {
        Node::Text(s) => write_text(out, s, cx)?,
        Node::Raw(s) => out.write_all(s.as_bytes())?,
        Node::Element(e) => {
            print_open_tag(e, out)?;
            if let Some(payload) = &e.payload {
                out.write_all(payload.as_str().as_bytes())?;
            } else {
                let inner = cx.child(&e.tag);
                for child in &e.body {
                    print_inline(html.try_node(*child)?, out, html, inner)?;
                }
            }
            if has_closing_tag(&e.tag) {
                print_close_tag(e, out)?;
            }
        }
    }
    Ok(())
}


pub trait Print {
    /// Print serialized HTML, one top-level node per line.
    fn print_html_fragment(&self, out: &mut impl Write, html: &HtmlAllocator) -> Result<()>;

    fn to_html_fragment_string(&self, html: &HtmlAllocator) -> Result<String> {
        let mut s = Vec::new();
        self.print_html_fragment(&mut s, html)?;
        Ok(String::from_utf8(s)?)
    }
}

impl Print for AId {
    fn print_html_fragment(&self, out: &mut impl Write, html: &HtmlAllocator) -> Result<()> {
        print_block(html.try_node(*self)?, out, html, Cx::default())
    }
}

impl Print for [AId] {
    fn print_html_fragment(&self, out: &mut impl Write, html: &HtmlAllocator) -> Result<()> {
        for id in self {
            id.print_html_fragment(out, html)?;
        }
        Ok(())
    }
}

impl Print for Vec<AId> {
    fn print_html_fragment(&self, out: &mut impl Write, html: &HtmlAllocator) -> Result<()> {
        self.as_slice().print_html_fragment(out, html)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn render(src: &str) -> String {
        let mut html = HtmlAllocator::new();
        let roots = parse_fragment(&mut html, src).unwrap();
        roots.to_html_fragment_string(&html).unwrap()
    }

    #[test]
    fn t_escape() {
        assert_eq!(html_escape("a < b & 'c'"), "a &lt; b &amp; &#39;c&#39;");
        assert_eq!(escape_text("&lt;b&gt;"), "&lt;b&gt;");
        assert_eq!(escape_text("Tom & Jerry"), "Tom &amp; Jerry");
    }

    #[test]
    fn t_layout() {
        assert_eq!(render("<div></div>"), "<div></div>\n");
        assert_eq!(render("<p>  Hello  </p>"), "<p>Hello</p>\n");
        assert_eq!(render("<ul><li>A</li><li><b>B</b></li></ul>"),
                   "<ul>\n  <li>A</li>\n  <li>\n    <b>B</b>\n  </li>\n</ul>\n");
        assert_eq!(render("<div>text<br><span>x</span></div>"),
                   "<div>\n  text\n  <br>\n  <span>x</span>\n</div>\n");
    }

    #[test]
    fn t_directive_attributes_dropped() {
        assert_eq!(render(r#"<p v-if="x" :title="t" v-bind:id="i" class="c" @click="go">a</p>"#),
                   "<p class=\"c\" @click=\"go\">a</p>\n");
    }

    #[test]
    fn t_script_not_escaped() {
        assert_eq!(render("<script>if (a < b && c) {}</script>"),
                   "<script>if (a < b && c) {}</script>\n");
        assert_eq!(render("<p>a < b</p>"), "<p>a &lt; b</p>\n");
    }

    #[test]
    fn t_payload() {
        let mut html = HtmlAllocator::new();
        let mut div = Element::new("div".into());
        div.payload = Some(Payload::Html("<b>x</b>\n  y".into()));
        let div = html.allocate_element(div);
        let mut tpl = Element::new("template".into());
        tpl.payload = Some(Payload::Text("&lt;i&gt;".into()));
        let tpl = html.allocate_element(tpl);
        assert_eq!(vec![div, tpl].to_html_fragment_string(&html).unwrap(),
                   "<div><b>x</b>\n  y</div>\n&lt;i&gt;\n");
    }

    #[test]
    fn t_pre() {
        assert_eq!(render("<pre>a\n  <b>b</b> c</pre>"), "<pre>a\n  <b>b</b> c</pre>\n");
    }
}
