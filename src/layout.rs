//! Wrapping rendered pages in layouts.

use std::sync::Arc;

use kstring::KString;

use crate::context::VueContext;
use crate::engine::Vue;
use crate::error::{format_chain, VResult, VueErrorKind};
use crate::scope::{Frame, Scope};
use crate::template::Template;
use crate::value::Value;


fn front_matter_frame(tpl: &Template) -> Frame {
    tpl.front_matter.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

fn layout_name(v: Option<&Value>) -> Option<KString> {
    match v? {
        Value::Str(s) if ! s.trim().is_empty() => Some(KString::from_ref(s.trim())),
        _ => None
    }
}

impl Vue {
    /// The file of layout `name`.
    pub fn layout_filename(&self, name: &str) -> String {
        let options = self.options();
        let file = if name.ends_with(options.extension.as_str()) {
            name.to_string()
        } else {
            format!("{name}{}", options.extension)
        };
        if options.layouts_dir.is_empty() {
            file
        } else {
            format!("{}/{file}", options.layouts_dir.trim_end_matches('/'))
        }
    }

    /// Wrap `html`, the rendered `page`, in the layout its front
    /// matter (or else `data`) names, then in the layout that
    /// layout's front matter names, and so on.
    pub(crate) fn apply_layouts(&self, page: &Template, data: Value, html: String) -> VResult<String> {
        let mut name = match layout_name(page.front_matter.get("layout")) {
            Some(name) => Some(name),
            None => layout_name(data.child("layout").as_deref()),
        };
        let limit = self.options().max_layout_depth;
        let mut chain = vec![page.filename.clone()];
        let mut scope = Scope::with_data(data);
        scope.push(front_matter_frame(page));
        let mut content = html;

        while let Some(layout) = name {
            let filename = self.layout_filename(&layout);
            chain.push(KString::from_ref(&filename));
            if chain.len() > limit + 1 {
                return Err(VueErrorKind::LayoutDepth { limit, chain: format_chain(&chain) }.into())
            }
            let tpl: Arc<Template> = self.load_template(&filename)?;

            let mut frame = Frame::new();
            frame.insert(KString::from_static("content"), Value::from(content));
            scope.push(frame);
            let mut cx = VueContext::new(self, scope);
            let roots = cx.eval_template(&tpl)?;
            content = cx.to_html(&roots)?;
            scope = cx.scope;
            scope.pop();
            scope.push(front_matter_frame(&tpl));

            name = layout_name(tpl.front_matter.get("layout"));
        }
        Ok(content)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::VueOptions;
    use crate::loader::MemLoader;
    use serde_json::json;

    #[test]
    fn t_layout_filename() {
        let vue = Vue::builder(MemLoader::new()).build();
        assert_eq!(vue.layout_filename("base"), "layouts/base.vuego");
        assert_eq!(vue.layout_filename("base.vuego"), "layouts/base.vuego");
        let vue = Vue::builder(MemLoader::new())
            .options(VueOptions { layouts_dir: "".into(), extension: ".html".into(), ..Default::default() })
            .build();
        assert_eq!(vue.layout_filename("base"), "base.html");
    }

    #[test]
    fn t_layouts() -> VResult<()> {
        let loader = MemLoader::new()
            .with("page.vuego", "---\nlayout: inner\ntitle: Page\n---\n<p>{{ title }}</p>")
            .with("layouts/inner.vuego",
                  "---\nlayout: outer\nsection: Docs\n---\n<article v-html=\"content\"></article>")
            .with("layouts/outer.vuego",
                  "<html><head><title>{{ title }} - {{ section }}</title></head>\
                   <body v-html=\"content\"></body></html>");
        let vue = Vue::builder(loader).build();
        let html = vue.render("page.vuego", Value::from(json!({"title": "Data"})))?;
        assert_eq!(html, "<html>\n  <head>\n    <title>Page - Docs</title>\n  </head>\n  \
                          <body><article><p>Page</p>\n</article>\n</body>\n</html>\n");
        Ok(())
    }

    #[test]
    fn t_layout_from_data() -> VResult<()> {
        let loader = MemLoader::new()
            .with("page.vuego", "<p>x</p>")
            .with("layouts/base.vuego", "<main v-html=\"content\"></main>");
        let vue = Vue::builder(loader).build();
        assert_eq!(vue.render("page.vuego", Value::from(json!({"layout": "base"})))?,
                   "<main><p>x</p>\n</main>\n");
        assert_eq!(vue.render("page.vuego", Value::Nil)?, "<p>x</p>\n");
        Ok(())
    }

    #[test]
    fn t_layout_cycle() {
        let loader = MemLoader::new()
            .with("page.vuego", "---\nlayout: a\n---\n<p>x</p>")
            .with("layouts/a.vuego", "---\nlayout: b\n---\n<div v-html=\"content\"></div>")
            .with("layouts/b.vuego", "---\nlayout: a\n---\n<div v-html=\"content\"></div>");
        let vue = Vue::builder(loader)
            .options(VueOptions { max_layout_depth: 5, ..Default::default() })
            .build();
        let e = vue.render("page.vuego", Value::Nil).unwrap_err();
        assert!(e.to_string().starts_with("layout chain depth exceeded (limit 5): \
                                           page.vuego -> layouts/a.vuego -> layouts/b.vuego"),
                "{e}");
        assert_eq!(e.category(), crate::error::ErrorCategory::Cycle);
    }

    #[test]
    fn t_missing_layout() {
        let loader = MemLoader::new().with("page.vuego", "---\nlayout: nope\n---\n<p>x</p>");
        let vue = Vue::builder(loader).build();
        let e = vue.render("page.vuego", Value::Nil).unwrap_err();
        assert_eq!(e.category(), crate::error::ErrorCategory::Io);
        assert!(e.to_string().contains("layouts/nope.vuego"), "{e}");
    }
}
