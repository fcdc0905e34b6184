//! Parsed templates: front matter plus the node tree.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use kstring::KString;
use vhtml::{parse_document, AId, HtmlAllocator};

use crate::frontmatter::{parse_front_matter, split_front_matter};
use crate::value::Value;


/// Immutable once parsed; shared between renders via `Arc`.
#[derive(Debug)]
pub struct Template {
    pub filename: KString,
    pub front_matter: BTreeMap<KString, Value>,
    pub html: HtmlAllocator,
    pub roots: Vec<AId>,
}

impl Template {
    pub fn parse(filename: &str, source: &str) -> Result<Template> {
        let (fm, body) = split_front_matter(source);
        let front_matter = match fm {
            Some(fm) => parse_front_matter(fm).with_context(
                || format!("front matter of {filename:?}"))?,
            None => BTreeMap::new(),
        };
        let mut html = HtmlAllocator::new();
        let roots = parse_document(&mut html, body).with_context(
            || format!("parsing {filename:?}"))?;
        Ok(Template {
            filename: KString::from_ref(filename),
            front_matter,
            html,
            roots,
        })
    }

    /// A front matter entry as string, e.g. `layout`.
    pub fn front_matter_str(&self, key: &str) -> Option<&str> {
        self.front_matter.get(key).and_then(|v| v.as_str())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_parse() -> Result<()> {
        let t = Template::parse("p.vuego", "---\nlayout: base\n---\n<h1>{{ title }}</h1>\n")?;
        assert_eq!(t.front_matter_str("layout"), Some("base"));
        assert_eq!(t.roots.len(), 1);
        assert_eq!(t.html.get_element(t.roots[0]).map(|e| e.tag.as_str()), Some("h1"));

        let t = Template::parse("plain.vuego", "<p>x</p>")?;
        assert!(t.front_matter.is_empty());

        let e = Template::parse("bad.vuego", "---\n- a\n---\n<p>x</p>").unwrap_err();
        assert!(format!("{e:#}").contains("front matter of \"bad.vuego\""));
        Ok(())
    }
}
