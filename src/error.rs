//! The error type of render calls.

use kstring::KString;


/// Define an error type wrapper e.g. `Foo` around a
/// `Box<FooKind>`. Implements the `std::error::Error`,
/// `std::ops::Deref` and `From` traits on `Foo` to make the
/// underlying `FooKind` transparently accessible. Thanks to the
/// `From` forwarding, `thiserror`'s `#[from]` syntax still
/// works. `FooKind` has to be defined separately.
#[macro_export]
macro_rules! def_boxed_error {
    ($wrappername:ident, $kindname:ident) => {

        #[derive(Debug)]
        pub struct $wrappername(Box<$kindname>);

        impl $wrappername {
            pub fn kind(&self) -> &$kindname {
                &self.0
            }
        }

        impl std::ops::Deref for $wrappername {
            type Target = $kindname;

            fn deref(&self) -> &Self::Target {
                &*self.0
            }
        }

        impl<E> From<E> for $wrappername where $kindname: From<E> {
            fn from(err: E) -> Self {
                $wrappername(Box::new($kindname::from(err)))
            }
        }

        impl std::error::Error for $wrappername {
            fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
                self.0.source()
            }
        }

        impl std::fmt::Display for $wrappername {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&*self.0, f)
            }
        }
    }
}


/// Coarse classification, for hosts deciding how to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A `:required` attribute was not provided
    Validation,
    /// Unknown variable or function, wrong arity, failed coercion,
    /// failing filter
    Resolution,
    /// Template could not be loaded or parsed
    Io,
    /// Layout chain too deep
    Cycle,
    /// Expression could not be evaluated
    Expression,
    Other,
}

#[derive(thiserror::Error, Debug)]
pub enum VueErrorKind {
    #[error("required attribute '{0}' not provided")]
    RequiredAttribute(KString),

    #[error("variable '{0}' not found")]
    VariableNotFound(KString),

    #[error("function '{0}' not found")]
    FunctionNotFound(KString),

    #[error("function '{name}' expects {expected} arguments, got {got}")]
    Arity { name: KString, expected: String, got: usize },

    #[error("{0}")]
    Coercion(String),

    #[error("filter '{name}': {source}")]
    Filter { name: KString, source: anyhow::Error },

    #[error("expression \"{expr}\": {message}")]
    Expression { expr: KString, message: String },

    #[error("loading template \"{filename}\": {source}")]
    Io { filename: KString, source: anyhow::Error },

    #[error("layout chain depth exceeded (limit {limit}): {chain}")]
    LayoutDepth { limit: usize, chain: String },

    #[error("in {chain}: {source}")]
    InTemplate { chain: String, source: VueError },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

def_boxed_error!(VueError, VueErrorKind);

pub type VResult<T> = std::result::Result<T, VueError>;

impl VueError {
    pub fn category(&self) -> ErrorCategory {
        match self.kind() {
            VueErrorKind::RequiredAttribute(_) => ErrorCategory::Validation,
            VueErrorKind::VariableNotFound(_)
                | VueErrorKind::FunctionNotFound(_)
                | VueErrorKind::Arity { .. }
                | VueErrorKind::Coercion(_)
                | VueErrorKind::Filter { .. } => ErrorCategory::Resolution,
            VueErrorKind::Expression { .. } => ErrorCategory::Expression,
            VueErrorKind::Io { .. } => ErrorCategory::Io,
            VueErrorKind::LayoutDepth { .. } => ErrorCategory::Cycle,
            VueErrorKind::InTemplate { source, .. } => source.category(),
            VueErrorKind::Other(_) => ErrorCategory::Other,
        }
    }

    /// Whether this is (or wraps) an unresolved variable.
    pub fn is_variable_not_found(&self) -> bool {
        match self.kind() {
            VueErrorKind::VariableNotFound(_) => true,
            VueErrorKind::InTemplate { source, .. } => source.is_variable_not_found(),
            _ => false
        }
    }

    /// Annotate with the template inclusion chain, unless a nested
    /// include did so already.
    pub fn in_chain(self, chain: &[KString]) -> VueError {
        match self.kind() {
            VueErrorKind::InTemplate { .. } => self,
            _ if chain.is_empty() => self,
            _ => VueErrorKind::InTemplate {
                chain: format_chain(chain),
                source: self,
            }.into()
        }
    }
}

pub fn format_chain(chain: &[KString]) -> String {
    itertools::join(chain.iter().map(|s| s.as_str()), " -> ")
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_chain_annotation() {
        let e: VueError = VueErrorKind::FunctionNotFound("nope".into()).into();
        let chain = [KString::from_static("a.vuego"), KString::from_static("b.vuego")];
        let e = e.in_chain(&chain);
        assert_eq!(e.to_string(), "in a.vuego -> b.vuego: function 'nope' not found");
        assert_eq!(e.category(), ErrorCategory::Resolution);
        // Only the innermost chain is kept
        let e = e.in_chain(&chain[..1]);
        assert_eq!(e.to_string(), "in a.vuego -> b.vuego: function 'nope' not found");
    }

    #[test]
    fn t_not_found() {
        let e: VueError = VueErrorKind::VariableNotFound("x".into()).into();
        assert!(e.is_variable_not_found());
        assert_eq!(e.to_string(), "variable 'x' not found");
        let e: VueError = anyhow::anyhow!("boom").into();
        assert!(! e.is_variable_not_found());
        assert_eq!(e.category(), ErrorCategory::Other);
    }

    #[test]
    fn t_messages_quote_names() {
        let e: VueError = VueErrorKind::Io {
            filename: KString::from_ref(&String::from("gone.vuego")),
            source: anyhow::anyhow!("template not found"),
        }.into();
        assert_eq!(e.to_string(), "loading template \"gone.vuego\": template not found");
        let e: VueError = VueErrorKind::Expression {
            expr: KString::from_ref(&String::from("a +")),
            message: "unexpected end of expression".into(),
        }.into();
        assert_eq!(e.to_string(), "expression \"a +\": unexpected end of expression");
    }
}
