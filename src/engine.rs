//! The render engine: loader, filter registry and caches, shared by
//! all render calls.

use std::{io::Write, sync::Arc};

use anyhow::bail;
use kstring::KString;
use lazy_static::lazy_static;

use crate::cache::Cache;
use crate::context::VueContext;
use crate::error::{VResult, VueErrorKind};
use crate::evaluator::Evaluator;
use crate::filters;
use crate::funcs::{Filter, FuncMap, Signature};
use crate::loader::Loader;
use crate::scope::Scope;
use crate::template::Template;
use crate::value::Value;
use crate::warn::set_trace;


lazy_static! {
    static ref TRACE_FROM_ENV: bool = trace_setting(std::env::var("VUEGO_TRACE").ok().as_deref());
}

/// `VUEGO_TRACE` unset, empty or `0` is off.
fn trace_setting(v: Option<&str>) -> bool {
    match v {
        Some(v) => ! (v.is_empty() || v == "0"),
        None => false,
    }
}

#[derive(Debug, Clone)]
pub struct VueOptions {
    /// Directory (as seen by the loader) holding layouts
    pub layouts_dir: String,
    /// Appended to layout names
    pub extension: String,
    pub max_layout_depth: usize,
    /// Switch on `trace!` output
    pub trace: bool,
}

impl Default for VueOptions {
    fn default() -> Self {
        VueOptions {
            layouts_dir: "layouts".into(),
            extension: ".vuego".into(),
            max_layout_depth: 100,
            trace: *TRACE_FROM_ENV,
        }
    }
}


pub struct VueBuilder {
    loader: Box<dyn Loader>,
    options: VueOptions,
    funcs: FuncMap,
}

impl VueBuilder {
    pub fn options(mut self, options: VueOptions) -> Self {
        self.options = options;
        self
    }

    /// Register a filter function, replacing a built-in of the same
    /// name.
    pub fn filter<F>(mut self, name: &str, signature: Signature, f: F) -> Self
    where F: Fn(Vec<Value>) -> anyhow::Result<Value> + Send + Sync + 'static
    {
        self.funcs.insert_fn(KString::from_ref(name), signature, f);
        self
    }

    pub fn filter_impl(mut self, name: &str, filter: impl Filter + 'static) -> Self {
        self.funcs.insert(KString::from_ref(name), Arc::new(filter));
        self
    }

    pub fn build(self) -> Vue {
        if self.options.trace {
            set_trace(true);
        }
        Vue {
            loader: self.loader,
            ev: Evaluator::new(self.funcs),
            options: self.options,
            templates: Cache::new(),
        }
    }
}


/// Renders templates. Can be shared between threads; every render
/// call has its own scope and output.
pub struct Vue {
    loader: Box<dyn Loader>,
    ev: Evaluator,
    options: VueOptions,
    templates: Cache<Template>,
}

impl Vue {
    pub fn builder(loader: impl Loader + 'static) -> VueBuilder {
        let mut funcs = FuncMap::new();
        filters::install(&mut funcs);
        VueBuilder {
            loader: Box::new(loader),
            options: VueOptions::default(),
            funcs,
        }
    }

    pub fn new(loader: impl Loader + 'static) -> Vue {
        Self::builder(loader).build()
    }

    pub fn options(&self) -> &VueOptions {
        &self.options
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.ev
    }

    /// The parsed template `filename`, from the cache if loaded
    /// before.
    pub fn load_template(&self, filename: &str) -> VResult<Arc<Template>> {
        self.templates.get_or_try_insert(filename, || {
            if ! self.loader.stat(filename) {
                bail!("template not found")
            }
            let source = self.loader.load(filename)?;
            Template::parse(filename, &source)
        }).map_err(|source| VueErrorKind::Io {
            filename: KString::from_ref(filename),
            source,
        }.into())
    }

    /// Render a parsed template, without layouts.
    pub fn render_template(&self, tpl: &Arc<Template>, data: Value) -> VResult<String> {
        let mut cx = VueContext::new(self, Scope::with_data(data));
        let roots = cx.eval_template(tpl)?;
        cx.to_html(&roots)
    }

    /// Render `filename` and wrap it in its layouts.
    pub fn render(&self, filename: &str, data: Value) -> VResult<String> {
        let tpl = self.load_template(filename)?;
        let html = self.render_template(&tpl, data.clone())?;
        self.apply_layouts(&tpl, data, html)
    }

    /// Like `render`, writing the result to `out` only once it is
    /// complete.
    pub fn render_to(&self, out: &mut impl Write, filename: &str, data: Value) -> VResult<()> {
        let html = self.render(filename, data)?;
        out.write_all(html.as_bytes()).map_err(anyhow::Error::from)?;
        Ok(())
    }

    /// Render template source text (not cached, no layouts).
    pub fn render_fragment(&self, source: &str, data: Value) -> VResult<String> {
        let tpl = Template::parse("fragment", source).map_err(|source| VueErrorKind::Io {
            filename: KString::from_static("fragment"),
            source,
        })?;
        self.render_template(&Arc::new(tpl), data)
    }
}
