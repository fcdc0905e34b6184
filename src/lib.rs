//! Server-side evaluation of Vue-style directive templates
//! (`v-if`, `v-for`, `v-html`, slots, includes, layouts, `{{ }}`
//! interpolation with filter pipes) to static HTML.

pub mod warn;
pub mod error;
pub mod value;
pub mod path;
pub mod scope;
pub mod cache;
pub mod expr;
pub mod funcs;
pub mod filters;
pub mod pipe;
pub mod evaluator;
pub mod interpolate;
pub mod attrs;
pub mod frontmatter;
pub mod loader;
pub mod template;
pub mod context;
pub mod directives;
pub mod layout;
pub mod engine;

pub use engine::{Vue, VueBuilder, VueOptions};
pub use error::{ErrorCategory, VResult, VueError, VueErrorKind};
pub use funcs::{Filter, FuncMap, Kind, Signature};
pub use loader::{FsLoader, Loader, MemLoader};
pub use template::Template;
pub use value::{HostObject, Record, Value};
