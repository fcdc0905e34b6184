use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::{anyhow, Result};
use kstring::KString;


static NEXT_ALLOCATOR_ID: AtomicU32 = AtomicU32::new(0);

fn next_allocator_id() -> u32 {
    NEXT_ALLOCATOR_ID.fetch_add(1, Ordering::Relaxed)
}

/// Identifies the allocator an `AId` was handed out by. Every
/// `HtmlAllocator` gets a fresh one, so that ids from a cached
/// template and ids from a render output can't be mixed up silently.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct RegionId(u32);

/// Index of a node inside a `HtmlAllocator`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct AId {
    regionid: RegionId,
    id: u32,
}

impl AId {
    pub fn regionid(&self) -> RegionId {
        self.regionid
    }
}


/// Content written verbatim between the open and close tag of an
/// element, instead of its children.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// From `v-html`, unescaped markup.
    Html(KString),
    /// From `v-text`, already HTML-escaped.
    Text(KString),
}

impl Payload {
    pub fn as_str(&self) -> &str {
        match self {
            Payload::Html(s) => s,
            Payload::Text(s) => s,
        }
    }
}


#[derive(Debug, Clone)]
pub struct Element {
    pub tag: KString,
    pub attr: Vec<(KString, KString)>,
    pub body: Vec<AId>,
    pub payload: Option<Payload>,
}

impl Element {
    pub fn new(tag: KString) -> Self {
        Element {
            tag,
            attr: Vec::new(),
            body: Vec::new(),
            payload: None,
        }
    }

    pub fn tag(&self) -> &str { &self.tag }
    pub fn attr(&self) -> &[(KString, KString)] { &self.attr }
    pub fn body(&self) -> &[AId] { &self.body }

    /// The value of the first attribute named `key`.
    pub fn get_attr(&self, key: &str) -> Option<&str> {
        self.attr.iter().find(|(k, _)| k.as_str() == key).map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, key: &str) -> bool {
        self.attr.iter().any(|(k, _)| k.as_str() == key)
    }

    /// All values of attributes named `key`, in order (attributes
    /// like `:required` may be repeated).
    pub fn get_attrs<'e>(&'e self, key: &'e str) -> impl Iterator<Item = &'e str> + 'e {
        self.attr.iter().filter(move |(k, _)| k.as_str() == key).map(|(_, v)| v.as_str())
    }

    /// The first attribute whose name starts with `prefix`, returning
    /// the rest of the name and the value.
    pub fn find_attr_prefix<'e>(&'e self, prefix: &str) -> Option<(&'e str, &'e str)> {
        self.attr.iter().find_map(|(k, v)| {
            k.strip_prefix(prefix).map(|rest| (rest, v.as_str()))
        })
    }
}


#[derive(Debug, Clone)]
pub enum Node {
    Element(Element),
    Text(KString),
    /// Preserialized HTML, written out verbatim.
    Raw(KString),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
            Node::Raw(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text(s) => Some(s),
            _ => None,
        }
    }
}


/// Storage for nodes, addressed by `AId`. Child lists are vectors
/// of ids, there are no back references. Nodes are never changed
/// after their parent was built, except via `element_mut` by the
/// owner of a still unfinished tree.
#[derive(Debug)]
pub struct HtmlAllocator {
    regionid: RegionId,
    nodes: Vec<Node>,
}

impl Default for HtmlAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlAllocator {
    pub fn new() -> Self {
        HtmlAllocator {
            regionid: RegionId(next_allocator_id()),
            nodes: Vec::new(),
        }
    }

    pub fn regionid(&self) -> RegionId {
        self.regionid
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn index(&self, id: AId) -> Option<usize> {
        if id.regionid == self.regionid {
            Some(id.id as usize)
        } else {
            None
        }
    }

    pub fn get_node(&self, id: AId) -> Option<&Node> {
        self.nodes.get(self.index(id)?)
    }

    pub fn try_node(&self, id: AId) -> Result<&Node> {
        self.get_node(id).ok_or_else(
            || anyhow!("AId {:?} does not belong to allocator {:?}",
                       id, self.regionid))
    }

    pub fn get_element(&self, id: AId) -> Option<&Element> {
        self.get_node(id)?.as_element()
    }

    pub fn element_mut(&mut self, id: AId) -> Option<&mut Element> {
        let i = self.index(id)?;
        match self.nodes.get_mut(i)? {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    fn push(&mut self, node: Node) -> AId {
        let id = self.nodes.len() as u32;
        self.nodes.push(node);
        AId { regionid: self.regionid, id }
    }

    pub fn allocate_element(&mut self, elt: Element) -> AId {
        self.push(Node::Element(elt))
    }

    pub fn new_element(
        &mut self,
        tag: impl Into<KString>,
        attr: Vec<(KString, KString)>,
        body: Vec<AId>,
    ) -> AId {
        self.push(Node::Element(Element {
            tag: tag.into(),
            attr,
            body,
            payload: None,
        }))
    }

    pub fn text(&mut self, s: impl Into<KString>) -> AId {
        self.push(Node::Text(s.into()))
    }

    pub fn raw(&mut self, s: impl Into<KString>) -> AId {
        self.push(Node::Raw(s.into()))
    }

    /// Copy node `id` out of `src`: elements keep tag and attributes,
    /// but get an empty body, to be rebuilt by the caller.
    pub fn shallow_clone_from(&mut self, src: &HtmlAllocator, id: AId) -> Result<AId> {
        let node = match src.try_node(id)? {
            Node::Element(e) => Node::Element(Element {
                tag: e.tag.clone(),
                attr: e.attr.clone(),
                body: Vec::new(),
                payload: e.payload.clone(),
            }),
            other => other.clone(),
        };
        Ok(self.push(node))
    }

    /// Copy the whole subtree at `id` out of `src`.
    pub fn deep_clone_from(&mut self, src: &HtmlAllocator, id: AId) -> Result<AId> {
        let node = src.try_node(id)?;
        match node {
            Node::Element(e) => {
                let mut body = Vec::with_capacity(e.body.len());
                for child in &e.body {
                    body.push(self.deep_clone_from(src, *child)?);
                }
                Ok(self.push(Node::Element(Element {
                    tag: e.tag.clone(),
                    attr: e.attr.clone(),
                    body,
                    payload: e.payload.clone(),
                })))
            }
            other => {
                let other = other.clone();
                Ok(self.push(other))
            }
        }
    }

    /// Iterate over all nodes of the subtrees at `roots`, depth first.
    pub fn walk<'a>(&'a self, roots: &[AId]) -> Walk<'a> {
        let mut stack: Vec<AId> = roots.to_vec();
        stack.reverse();
        Walk { html: self, stack }
    }
}

pub struct Walk<'a> {
    html: &'a HtmlAllocator,
    stack: Vec<AId>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (AId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = self.stack.pop()?;
            // ids of foreign allocators are skipped
            if let Some(node) = self.html.get_node(id) {
                if let Node::Element(e) = node {
                    self.stack.extend(e.body.iter().rev());
                }
                return Some((id, node))
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_regions_are_distinct() {
        let mut a = HtmlAllocator::new();
        let b = HtmlAllocator::new();
        let id = a.text("x");
        assert!(a.get_node(id).is_some());
        assert!(b.get_node(id).is_none());
        assert!(b.try_node(id).is_err());
    }

    #[test]
    fn t_clones() -> Result<()> {
        let mut src = HtmlAllocator::new();
        let t = src.text("hi");
        let p = src.new_element("p", vec![("class".into(), "a".into())], vec![t]);
        let div = src.new_element("div", vec![], vec![p]);

        let mut dst = HtmlAllocator::new();
        let shallow = dst.shallow_clone_from(&src, div)?;
        assert!(dst.get_element(shallow).unwrap().body.is_empty());

        let deep = dst.deep_clone_from(&src, div)?;
        let tags: Vec<String> = dst.walk(&[deep]).map(|(_, n)| match n {
            Node::Element(e) => e.tag.to_string(),
            Node::Text(s) => format!("'{s}'"),
            Node::Raw(s) => s.to_string(),
        }).collect();
        assert_eq!(tags, ["div", "p", "'hi'"]);
        // the source is untouched
        assert_eq!(src.get_element(div).unwrap().body, vec![p]);
        Ok(())
    }
}
