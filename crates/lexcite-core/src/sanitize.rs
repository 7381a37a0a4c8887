//! Allowlist HTML sanitizer for section `html_content`.

use std::collections::{HashMap, HashSet};

/// Elements removed together with everything inside them.
const STRIPPED_ELEMENTS: &[&str] = &["script", "style", "iframe", "object", "embed", "noscript"];

const ALLOWED_TAGS: &[&str] = &[
    "p", "div", "span", "br", "hr", "h1", "h2", "h3", "h4", "h5", "h6", "b", "strong", "i",
    "em", "u", "sub", "sup", "small", "blockquote", "ol", "ul", "li", "dl", "dt", "dd", "table",
    "thead", "tbody", "tfoot", "tr", "th", "td", "caption", "colgroup", "col", "a", "section",
    "article", "header",
];

const ALLOWED_ATTRS: &[&str] = &["class", "id", "title", "href", "colspan", "rowspan", "data-eid"];

const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Strip everything but a legal-text allowlist of tags and attributes.
///
/// Disallowed tags are dropped but their text content is kept. Links survive only
/// with an http(s) or mailto scheme, checked after character references are decoded.
pub fn sanitize_html(html: &str) -> String {
    let mut builder = ammonia::Builder::default();
    builder
        .tags(ALLOWED_TAGS.iter().copied().collect::<HashSet<_>>())
        .clean_content_tags(STRIPPED_ELEMENTS.iter().copied().collect::<HashSet<_>>())
        .tag_attributes(HashMap::new())
        .generic_attributes(ALLOWED_ATTRS.iter().copied().collect::<HashSet<_>>())
        .url_schemes(ALLOWED_SCHEMES.iter().copied().collect::<HashSet<_>>())
        .link_rel(None)
        .strip_comments(true);
    builder.clean(html).to_string()
}
