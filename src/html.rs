//! HTML element classification used by the scanner and the optimizer.

/// Void elements: never take children or a closing tag.
/// https://html.spec.whatwg.org/multipage/syntax.html#void-elements
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose closing tag may be omitted: opening the same tag again
/// implicitly closes the previous one.
const LEFT_OPEN_ELEMENTS: &[&str] = &[
    "colgroup", "dd", "dt", "li", "option", "p", "td", "tfoot", "th",
    "thead", "tr", "source",
];

/// Non-phrasing (block-ish) elements. Starting one of these inside an open
/// `<p>` implicitly closes the paragraph first.
const NON_PHRASING_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "base", "blockquote", "body", "caption",
    "col", "colgroup", "dd", "details", "dialog", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3",
    "h4", "h5", "h6", "head", "header", "hgroup", "hr", "html", "legend",
    "li", "menuitem", "meta", "optgroup", "option", "param", "rp", "rt",
    "source", "style", "summary", "tbody", "td", "tfoot", "th", "thead",
    "title", "tr", "track",
];

/// Elements whose content is captured verbatim instead of being scanned
/// for markup.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea"];

/// Elements that swallow a newline immediately following their opening tag.
const IGNORE_NEWLINE_ELEMENTS: &[&str] = &["pre", "textarea"];

/// Built-in virtual tags that never map to a real platform element.
const BUILT_IN_TAGS: &[&str] = &["slot", "component"];

/// Native HTML tags recognized by the default reserved-tag predicate.
const RESERVED_HTML_TAGS: &[&str] = &[
    "html", "body", "base", "head", "link", "meta", "style", "title",
    "address", "article", "aside", "footer", "header", "h1", "h2", "h3",
    "h4", "h5", "h6", "hgroup", "nav", "section", "div", "dd", "dl", "dt",
    "figcaption", "figure", "picture", "hr", "img", "li", "main", "ol", "p",
    "pre", "ul", "a", "b", "abbr", "bdi", "bdo", "br", "cite", "code",
    "data", "dfn", "em", "i", "kbd", "mark", "q", "rp", "rt", "rtc", "ruby",
    "s", "samp", "small", "span", "strong", "sub", "sup", "time", "u",
    "var", "wbr", "area", "audio", "map", "track", "video", "embed",
    "object", "param", "source", "canvas", "script", "noscript", "del",
    "ins", "caption", "col", "colgroup", "table", "thead", "tbody", "td",
    "th", "tr", "button", "datalist", "fieldset", "form", "input", "label",
    "legend", "meter", "optgroup", "option", "output", "progress", "select",
    "textarea", "details", "dialog", "menu", "menuitem", "summary",
    "content", "element", "shadow", "template", "blockquote", "iframe",
    "tfoot",
];

/// Native SVG tags recognized by the default reserved-tag predicate.
const RESERVED_SVG_TAGS: &[&str] = &[
    "svg", "animate", "circle", "clippath", "cursor", "defs", "desc",
    "ellipse", "filter", "font-face", "foreignobject", "g", "glyph",
    "image", "line", "marker", "mask", "missing-glyph", "path", "pattern",
    "polygon", "polyline", "rect", "switch", "symbol", "text", "textpath",
    "tspan", "use", "view",
];

pub fn is_unary_tag(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
}

pub fn can_be_left_open_tag(tag: &str) -> bool {
    LEFT_OPEN_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
}

pub fn is_non_phrasing_tag(tag: &str) -> bool {
    NON_PHRASING_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
}

pub fn is_raw_text_tag(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
}

pub fn ignores_first_newline(tag: &str) -> bool {
    IGNORE_NEWLINE_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
}

pub fn is_built_in_tag(tag: &str) -> bool {
    BUILT_IN_TAGS.contains(&tag.to_ascii_lowercase().as_str())
}

/// Whether `tag` names a native platform element, as opposed to a
/// user-defined component.
pub fn is_reserved_tag(tag: &str) -> bool {
    let lower = tag.to_ascii_lowercase();
    RESERVED_HTML_TAGS.contains(&lower.as_str()) || RESERVED_SVG_TAGS.contains(&lower.as_str())
}
