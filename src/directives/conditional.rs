use std::sync::Arc;

use vhtml::AId;

use crate::context::VueContext;
use crate::error::VResult;
use crate::template::Template;

use super::is_whitespace_text;


/// The members of the conditional chain starting at `ids[start]`, and
/// the number of siblings the chain covers.
fn chain_members(src: &Template, ids: &[AId], start: usize) -> (Vec<AId>, usize) {
    let mut members = vec![ids[start]];
    let mut end = start + 1;
    let mut j = start + 1;
    while j < ids.len() {
        if is_whitespace_text(src, ids[j]) {
            j += 1;
            continue;
        }
        match src.html.get_element(ids[j]) {
            Some(e) if e.has_attr("v-else-if") => {
                members.push(ids[j]);
                j += 1;
                end = j;
            }
            Some(e) if e.has_attr("v-else") => {
                members.push(ids[j]);
                end = j + 1;
                break;
            }
            _ => break,
        }
    }
    (members, end - start)
}

impl<'v> VueContext<'v> {
    /// Evaluate the `v-if` / `v-else-if` / `v-else` chain at
    /// `ids[start]`: at most one branch is evaluated, all are
    /// consumed. Returns the number of siblings consumed.
    pub(super) fn eval_if_chain(
        &mut self,
        src: &Arc<Template>,
        ids: &[AId],
        start: usize,
        out: &mut Vec<AId>,
    ) -> VResult<usize> {
        let (members, consumed) = chain_members(src, ids, start);
        for id in members {
            let e = match src.html.get_element(id) {
                Some(e) => e,
                None => continue,
            };
            let hit = match e.get_attr("v-if").or_else(|| e.get_attr("v-else-if")) {
                Some(condition) => self.ev().eval_condition(&self.scope, condition)?,
                None => true,
            };
            if hit {
                out.extend(self.eval_node(src, id, false)?);
                break;
            }
        }
        Ok(consumed)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_chain_members() -> anyhow::Result<()> {
        let t = Template::parse(
            "t.vuego",
            "<p v-if=\"a\">a</p>\n<p v-else-if=\"b\">b</p>\n  <p v-else>c</p>\n<p>d</p>\
             <p v-if=\"x\">x</p><p>y</p>")?;
        let (members, consumed) = chain_members(&t, &t.roots, 0);
        assert_eq!(members, t.roots[..3]);
        assert_eq!(consumed, 3);
        let start = t.roots.len() - 2;
        assert_eq!(chain_members(&t, &t.roots, start), (vec![t.roots[start]], 1));
        Ok(())
    }
}
