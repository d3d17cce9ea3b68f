//! Streaming markup scanner.
//!
//! Walks the template once, keeping an explicit open-element stack, and
//! reports structure to a [`TagSink`](super::TagSink) as it goes. Malformed
//! input never aborts the scan: unclosed tags, stray `<` characters and
//! orphan end tags are repaired the way a browser would repair them, with a
//! warning on the sink for anything that had to be patched up.

use crate::ast::{Attribute, Span};
use crate::html;

use super::TagSink;

/// Per-parse configuration.
///
/// The tag predicates default to the tables in [`crate::html`]; callers with
/// a different platform vocabulary can swap them out.
#[derive(Debug, Clone, Copy)]
pub struct ParserOptions {
    /// Apply browser-style corrections: auto-close `<p>` before block
    /// elements and re-opened left-open tags.
    pub expect_html: bool,
    pub is_unary_tag: fn(&str) -> bool,
    pub can_be_left_open_tag: fn(&str) -> bool,
    pub is_non_phrasing_tag: fn(&str) -> bool,
    /// Decode `&#10;`/`&#9;` in attribute values.
    pub should_decode_newlines: bool,
    /// Separate legacy flag for `href` attributes on `<a>`.
    pub should_decode_newlines_for_href: bool,
    pub keep_comments: bool,
    /// Attach byte spans to individual attributes.
    pub output_source_range: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            expect_html: true,
            is_unary_tag: html::is_unary_tag,
            can_be_left_open_tag: html::can_be_left_open_tag,
            is_non_phrasing_tag: html::is_non_phrasing_tag,
            should_decode_newlines: false,
            should_decode_newlines_for_href: false,
            keep_comments: false,
            output_source_range: false,
        }
    }
}

/// Parse `source`, delivering events to `sink`. Never fails.
pub fn parse<S: TagSink>(source: &str, options: &ParserOptions, sink: &mut S) {
    Scanner {
        source,
        bytes: source.as_bytes(),
        pos: 0,
        stack: Vec::new(),
        options: *options,
        sink,
    }
    .run();
}

/// Open-element stack frame; lives only for the duration of one parse.
struct OpenElement {
    tag: String,
    lower_tag: String,
    start: usize,
    end: usize,
}

/// A successfully lexed start tag, not yet committed to the stack.
struct TagMatch {
    tag: String,
    attrs: Vec<RawAttr>,
    unary_slash: bool,
    start: usize,
    end: usize,
}

/// An attribute as lexed, value still entity-encoded.
struct RawAttr {
    name: String,
    value: String,
    dynamic_arg: bool,
    start: usize,
    end: usize,
}

struct Scanner<'s, S> {
    source: &'s str,
    bytes: &'s [u8],
    pos: usize,
    stack: Vec<OpenElement>,
    options: ParserOptions,
    sink: &'s mut S,
}

impl<S: TagSink> Scanner<'_, S> {
    fn run(&mut self) {
        while self.pos < self.bytes.len() {
            let last = self.pos;
            let raw_tag = self.stack.last().and_then(|frame| {
                html::is_raw_text_tag(&frame.lower_tag).then(|| frame.lower_tag.clone())
            });
            match raw_tag {
                Some(tag) => self.scan_raw_text(&tag),
                None => self.scan_normal(),
            }
            if self.pos == last {
                // No forward progress: give up on the remainder as one
                // final text run.
                let rest = self.source[self.pos..].to_string();
                let start = self.pos;
                self.pos = self.bytes.len();
                let stack_empty = self.stack.is_empty();
                self.sink.text(rest.clone(), Span::new(start, self.pos));
                if stack_empty {
                    self.sink.warn(
                        format!("mal-formatted tag at end of template: \"{rest}\""),
                        self.pos,
                        None,
                    );
                }
                break;
            }
        }
        // Close whatever is still open.
        self.handle_end_tag(None, self.pos, self.pos);
    }

    // === Normal mode ===

    fn scan_normal(&mut self) {
        if self.bytes[self.pos] == b'<' {
            if self.try_comment() {
                return;
            }
            if self.try_conditional_comment() {
                return;
            }
            if self.try_doctype() {
                return;
            }
            if self.try_end_tag() {
                return;
            }
            if self.try_start_tag() {
                return;
            }
        }
        self.scan_text();
    }

    fn try_comment(&mut self) -> bool {
        if !self.source[self.pos..].starts_with("<!--") {
            return false;
        }
        // Unterminated comments fall through and end up in the text path.
        let Some(end) = self.find("-->", self.pos + 4) else {
            return false;
        };
        if self.options.keep_comments {
            let text = &self.source[self.pos + 4..end];
            self.sink.comment(text, Span::new(self.pos, end + 3));
        }
        self.pos = end + 3;
        true
    }

    /// Downlevel-revealed conditional comment, `<![...]>`. Skipped silently.
    fn try_conditional_comment(&mut self) -> bool {
        if !self.source[self.pos..].starts_with("<![") {
            return false;
        }
        let Some(end) = self.find("]>", self.pos + 3) else {
            return false;
        };
        self.pos = end + 2;
        true
    }

    fn try_doctype(&mut self) -> bool {
        let rest = self.bytes.get(self.pos..).unwrap_or_default();
        if rest.len() < 10 || !rest[..9].eq_ignore_ascii_case(b"<!doctype") || rest[9] != b' ' {
            return false;
        }
        let mut i = 10;
        while i < rest.len() && rest[i] != b'>' {
            i += 1;
        }
        if i >= rest.len() || i == 10 {
            return false;
        }
        self.pos += i + 1;
        true
    }

    fn try_end_tag(&mut self) -> bool {
        let Some((name, len)) = self.match_end_tag(self.pos) else {
            return false;
        };
        let start = self.pos;
        self.pos += len;
        self.handle_end_tag(Some(&name), start, self.pos);
        true
    }

    fn try_start_tag(&mut self) -> bool {
        let Some(tag_match) = self.scan_start_tag() else {
            return false;
        };
        let tag = tag_match.tag.clone();
        self.handle_start_tag(tag_match);
        // A newline right after <pre>/<textarea> is authoring convention,
        // not content.
        if html::ignores_first_newline(&tag) && self.bytes.get(self.pos) == Some(&b'\n') {
            self.pos += 1;
        }
        true
    }

    fn scan_text(&mut self) {
        let len = self.bytes.len();
        let mut text_end = self.find_byte(b'<', self.pos).unwrap_or(len);
        if text_end < len {
            let mut i = text_end;
            // A `<` that does not open a recognizable construct is literal
            // text; keep folding until the next candidate.
            while !(self.is_end_tag_at(i)
                || self.is_start_tag_open(i)
                || self.bytes[i..].starts_with(b"<!--")
                || self.bytes[i..].starts_with(b"<!["))
            {
                match self.find_byte(b'<', i + 1) {
                    Some(next) => i = next,
                    None => break,
                }
            }
            text_end = i;
        }
        if text_end > self.pos {
            let text = self.source[self.pos..text_end].to_string();
            let span = Span::new(self.pos, text_end);
            self.pos = text_end;
            self.sink.text(text, span);
        }
    }

    // === Raw-text mode (script/style/textarea content) ===

    fn scan_raw_text(&mut self, stacked_tag: &str) {
        let Some((close_start, close_end)) = self.find_raw_close(stacked_tag, self.pos) else {
            // No closing tag: the stuck path in run() flushes the rest.
            return;
        };
        let mut text = self.source[self.pos..close_start].to_string();
        if !html::is_raw_text_tag(stacked_tag) && stacked_tag != "noscript" {
            // Content that would otherwise be parsed loses its comment and
            // CDATA delimiters.
            text = strip_delimiters(&text, "<!--", "-->");
            text = strip_delimiters(&text, "<![CDATA[", "]]>");
        }
        if html::ignores_first_newline(stacked_tag) && text.starts_with('\n') {
            text.remove(0);
        }
        let span = Span::new(self.pos, close_start);
        self.pos = close_end;
        self.sink.text(text, span);
        self.handle_end_tag(Some(stacked_tag), close_start, close_end);
    }

    /// First case-insensitive `</tag ... >` from `from`.
    fn find_raw_close(&self, tag: &str, from: usize) -> Option<(usize, usize)> {
        let tag_len = tag.len();
        let mut i = from;
        while i + 2 + tag_len <= self.bytes.len() {
            if self.bytes[i] == b'<'
                && self.bytes[i + 1] == b'/'
                && self
                    .source
                    .get(i + 2..i + 2 + tag_len)
                    .is_some_and(|name| name.eq_ignore_ascii_case(tag))
            {
                let mut j = i + 2 + tag_len;
                while j < self.bytes.len() && self.bytes[j] != b'>' {
                    j += 1;
                }
                return (j < self.bytes.len()).then_some((i, j + 1));
            }
            i += 1;
        }
        None
    }

    // === Start tags ===

    /// Speculatively lex a start tag at the cursor. On failure the cursor
    /// is untouched and the `<` falls through to the text path.
    fn scan_start_tag(&mut self) -> Option<TagMatch> {
        let start = self.pos;
        let qlen = qname_len(&self.source[start + 1..]);
        if qlen == 0 {
            return None;
        }
        let tag = self.source[start + 1..start + 1 + qlen].to_string();
        let mut attrs = Vec::new();
        let mut cur = start + 1 + qlen;
        loop {
            let at = self.skip_ws(cur);
            if self.bytes.get(at) == Some(&b'>') {
                let end = at + 1;
                self.pos = end;
                return Some(TagMatch {
                    tag,
                    attrs,
                    unary_slash: false,
                    start,
                    end,
                });
            }
            if self.bytes.get(at) == Some(&b'/') && self.bytes.get(at + 1) == Some(&b'>') {
                let end = at + 2;
                self.pos = end;
                return Some(TagMatch {
                    tag,
                    attrs,
                    unary_slash: true,
                    start,
                    end,
                });
            }
            let (attr, next) = self.scan_attribute(at)?;
            attrs.push(attr);
            cur = next;
        }
    }

    fn scan_attribute(&self, at: usize) -> Option<(RawAttr, usize)> {
        self.scan_dynamic_attribute(at)
            .or_else(|| self.scan_plain_attribute(at))
    }

    /// Attribute whose argument is a bracketed dynamic expression:
    /// `v-dir:[arg]`, `:[arg]`, `@[arg]`, `#[arg]`, optionally with
    /// trailing modifiers and a value.
    fn scan_dynamic_attribute(&self, at: usize) -> Option<(RawAttr, usize)> {
        let bytes = self.bytes;
        let mut i = at;
        match bytes.get(i)? {
            b'@' | b':' | b'#' => i += 1,
            b'v' => {
                if bytes.get(i + 1) != Some(&b'-') {
                    return None;
                }
                i += 2;
                let word_start = i;
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'-')
                {
                    i += 1;
                }
                if i == word_start || bytes.get(i) != Some(&b':') {
                    return None;
                }
                i += 1;
            }
            _ => return None,
        }
        if bytes.get(i) != Some(&b'[') {
            return None;
        }
        i += 1;
        let arg_start = i;
        while i < bytes.len() && bytes[i] != b']' && bytes[i] != b'=' {
            i += 1;
        }
        if i == arg_start || bytes.get(i) != Some(&b']') {
            return None;
        }
        i += 1;
        while i < bytes.len() && !is_attr_name_end(bytes[i]) {
            i += 1;
        }
        let name = self.source[at..i].to_string();
        let (value, end) = self.scan_attribute_value(i);
        Some((
            RawAttr {
                name,
                value,
                dynamic_arg: true,
                start: at,
                end,
            },
            end,
        ))
    }

    fn scan_plain_attribute(&self, at: usize) -> Option<(RawAttr, usize)> {
        let bytes = self.bytes;
        let mut i = at;
        while i < bytes.len() && !is_attr_name_end(bytes[i]) {
            i += 1;
        }
        if i == at {
            return None;
        }
        let name = self.source[at..i].to_string();
        let (value, end) = self.scan_attribute_value(i);
        Some((
            RawAttr {
                name,
                value,
                dynamic_arg: false,
                start: at,
                end,
            },
            end,
        ))
    }

    /// Optional `= value` after an attribute name. If the value part is
    /// malformed the attribute degrades to a bare name and the cursor stays
    /// right after the name.
    fn scan_attribute_value(&self, name_end: usize) -> (String, usize) {
        let bytes = self.bytes;
        let mut i = self.skip_ws(name_end);
        if bytes.get(i) != Some(&b'=') {
            return (String::new(), name_end);
        }
        i = self.skip_ws(i + 1);
        match bytes.get(i) {
            Some(&quote @ (b'"' | b'\'')) => {
                let start = i + 1;
                let mut j = start;
                while j < bytes.len() && bytes[j] != quote {
                    j += 1;
                }
                if j >= bytes.len() {
                    return (String::new(), name_end);
                }
                (self.source[start..j].to_string(), j + 1)
            }
            Some(_) => {
                let start = i;
                let mut j = i;
                while j < bytes.len() && !is_unquoted_value_end(bytes[j]) {
                    j += 1;
                }
                if j == start {
                    return (String::new(), name_end);
                }
                (self.source[start..j].to_string(), j)
            }
            None => (String::new(), name_end),
        }
    }

    fn handle_start_tag(&mut self, tag_match: TagMatch) {
        let TagMatch {
            tag,
            attrs: raw_attrs,
            unary_slash,
            start,
            end,
        } = tag_match;

        if self.options.expect_html {
            if self.stack.last().is_some_and(|frame| frame.tag == "p")
                && (self.options.is_non_phrasing_tag)(&tag)
            {
                self.handle_end_tag(Some("p"), self.pos, self.pos);
            }
            if (self.options.can_be_left_open_tag)(&tag)
                && self.stack.last().is_some_and(|frame| frame.tag == tag)
            {
                self.handle_end_tag(Some(&tag), self.pos, self.pos);
            }
        }

        let unary = (self.options.is_unary_tag)(&tag) || unary_slash;

        let mut attrs = Vec::with_capacity(raw_attrs.len());
        for raw in raw_attrs {
            let decode_newlines = if tag == "a" && raw.name == "href" {
                self.options.should_decode_newlines_for_href
            } else {
                self.options.should_decode_newlines
            };
            attrs.push(Attribute {
                value: decode_attr(&raw.value, decode_newlines),
                name: raw.name,
                dynamic_arg: raw.dynamic_arg,
                span: self
                    .options
                    .output_source_range
                    .then(|| Span::new(raw.start, raw.end)),
            });
        }

        if !unary {
            self.stack.push(OpenElement {
                lower_tag: tag.to_ascii_lowercase(),
                tag: tag.clone(),
                start,
                end,
            });
        }

        self.sink.start_tag(&tag, attrs, unary, Span::new(start, end));
    }

    // === End tags and error recovery ===

    /// Close the nearest matching open element, reporting everything left
    /// open above it. `None` closes the whole stack (end-of-input cleanup).
    fn handle_end_tag(&mut self, tag_name: Option<&str>, start: usize, end: usize) {
        let found = match tag_name {
            Some(name) => {
                let lower = name.to_ascii_lowercase();
                self.stack
                    .iter()
                    .rposition(|frame| frame.lower_tag == lower)
            }
            None => Some(0),
        };

        match found {
            Some(keep) => {
                for i in (keep..self.stack.len()).rev() {
                    if i > keep || tag_name.is_none() {
                        let frame = &self.stack[i];
                        self.sink.warn(
                            format!("tag <{}> has no matching end tag.", frame.tag),
                            frame.start,
                            Some(frame.end),
                        );
                    }
                    let tag = self.stack[i].tag.clone();
                    self.sink.end_tag(&tag, Span::new(start, end));
                }
                self.stack.truncate(keep);
            }
            None => {
                // Mirror the browser: a bare </br> renders a line break and
                // a bare </p> becomes an empty paragraph.
                let name = tag_name.unwrap_or_default();
                match name.to_ascii_lowercase().as_str() {
                    "br" => {
                        self.sink.start_tag(name, Vec::new(), true, Span::new(start, end));
                    }
                    "p" => {
                        self.sink.start_tag(name, Vec::new(), false, Span::new(start, end));
                        self.sink.end_tag(name, Span::new(start, end));
                    }
                    _ => {}
                }
            }
        }
    }

    // === Low-level helpers ===

    fn is_start_tag_open(&self, at: usize) -> bool {
        self.bytes.get(at) == Some(&b'<') && qname_len(&self.source[at + 1..]) > 0
    }

    fn is_end_tag_at(&self, at: usize) -> bool {
        self.match_end_tag(at).is_some()
    }

    /// `</qname ... >` at `at`; returns the tag name and matched length.
    fn match_end_tag(&self, at: usize) -> Option<(String, usize)> {
        let bytes = self.bytes;
        if bytes.get(at) != Some(&b'<') || bytes.get(at + 1) != Some(&b'/') {
            return None;
        }
        let qlen = qname_len(&self.source[at + 2..]);
        if qlen == 0 {
            return None;
        }
        let name = self.source[at + 2..at + 2 + qlen].to_string();
        let mut i = at + 2 + qlen;
        while i < bytes.len() && bytes[i] != b'>' {
            i += 1;
        }
        if i >= bytes.len() {
            return None;
        }
        Some((name, i + 1 - at))
    }

    fn skip_ws(&self, mut i: usize) -> usize {
        while i < self.bytes.len() && self.bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        i
    }

    fn find(&self, needle: &str, from: usize) -> Option<usize> {
        self.source.get(from..)?.find(needle).map(|i| from + i)
    }

    fn find_byte(&self, byte: u8, from: usize) -> Option<usize> {
        self.bytes
            .get(from..)?
            .iter()
            .position(|&b| b == byte)
            .map(|i| from + i)
    }
}

/// Length of a qualified name (`ncname` with an optional single `prefix:`)
/// at the start of `s`, in bytes.
fn qname_len(s: &str) -> usize {
    let first = ncname_len(s);
    if first == 0 {
        return 0;
    }
    if s[first..].starts_with(':') {
        let second = ncname_len(&s[first + 1..]);
        if second > 0 {
            return first + 1 + second;
        }
    }
    first
}

fn ncname_len(s: &str) -> usize {
    let mut iter = s.char_indices();
    match iter.next() {
        Some((_, c)) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return 0,
    }
    for (i, c) in iter {
        if !(c.is_alphanumeric() || matches!(c, '-' | '.' | '_')) {
            return i;
        }
    }
    s.len()
}

/// Terminators for attribute names: whitespace, quotes, `<`, `>`, `/`, `=`.
fn is_attr_name_end(byte: u8) -> bool {
    byte.is_ascii_whitespace() || matches!(byte, b'"' | b'\'' | b'<' | b'>' | b'/' | b'=')
}

/// Terminators for unquoted attribute values.
fn is_unquoted_value_end(byte: u8) -> bool {
    byte.is_ascii_whitespace() || matches!(byte, b'"' | b'\'' | b'=' | b'<' | b'>' | b'`')
}

const BASE_ENTITIES: &[(&str, char)] = &[
    ("&lt;", '<'),
    ("&gt;", '>'),
    ("&quot;", '"'),
    ("&amp;", '&'),
    ("&#39;", '\''),
];

const WHITESPACE_ENTITIES: &[(&str, char)] = &[("&#10;", '\n'), ("&#9;", '\t')];

/// Decode the fixed attribute entity table; newline/tab entities only when
/// the caller opted in for this attribute context.
fn decode_attr(value: &str, decode_newlines: bool) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    'outer: while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        for &(entity, decoded) in BASE_ENTITIES {
            if rest.starts_with(entity) {
                out.push(decoded);
                rest = &rest[entity.len()..];
                continue 'outer;
            }
        }
        if decode_newlines {
            for &(entity, decoded) in WHITESPACE_ENTITIES {
                if rest.starts_with(entity) {
                    out.push(decoded);
                    rest = &rest[entity.len()..];
                    continue 'outer;
                }
            }
        }
        out.push('&');
        rest = &rest[1..];
    }
    out.push_str(rest);
    out
}

/// Remove `open`...`close` delimiter pairs, keeping the content between.
fn strip_delimiters(text: &str, open: &str, close: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(i) = rest.find(open) {
        let Some(j) = rest[i + open.len()..].find(close) else {
            break;
        };
        out.push_str(&rest[..i]);
        out.push_str(&rest[i + open.len()..i + open.len() + j]);
        rest = &rest[i + open.len() + j + close.len()..];
    }
    out.push_str(rest);
    out
}
