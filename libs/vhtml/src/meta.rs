//! The little we need to know about HTML elements.

/// Elements without a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input",
    "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose text content is not HTML: never parsed for tags,
/// and never entity-escaped on output.
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Elements where whitespace is significant, printed without
/// re-indentation.
pub const PREFORMATTED_ELEMENTS: &[&str] = &["pre", "textarea"];

fn contains_ignore_case(list: &[&str], tag: &str) -> bool {
    list.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

pub fn has_closing_tag(tag: &str) -> bool {
    ! contains_ignore_case(VOID_ELEMENTS, tag)
}

pub fn is_raw_text(tag: &str) -> bool {
    contains_ignore_case(RAW_TEXT_ELEMENTS, tag)
}

pub fn is_preformatted(tag: &str) -> bool {
    contains_ignore_case(PREFORMATTED_ELEMENTS, tag)
}

/// Attributes that only steer evaluation and never appear in output.
pub const DIRECTIVE_ATTRIBUTES: &[&str] = &[
    "v-if", "v-else-if", "v-else", "v-for", "v-pre", "v-html", "v-text",
    "v-show", "v-once", "v-once-id",
];

/// Whether the serializer drops attribute `name`: directives, and
/// binding keys (`:x`, `v-bind:x`) that evaluation should have
/// consumed already.
pub fn is_directive_attribute(name: &str) -> bool {
    DIRECTIVE_ATTRIBUTES.contains(&name)
        || name.starts_with(':')
        || name.starts_with("v-bind:")
}

#[cfg(test)]
#[test]
fn t_meta() {
    assert!(! has_closing_tag("br"));
    assert!(! has_closing_tag("BR"));
    assert!(has_closing_tag("div"));
    assert!(is_raw_text("script"));
    assert!(! is_raw_text("div"));
    assert!(is_directive_attribute(":class"));
    assert!(is_directive_attribute("v-bind:href"));
    assert!(is_directive_attribute("v-once-id"));
    assert!(! is_directive_attribute("class"));
    assert!(! is_directive_attribute("v-on:click"));
}
