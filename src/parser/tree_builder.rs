//! Default [`TagSink`] that assembles the scanner's event stream into the
//! AST of [`crate::ast`].
//!
//! The builder stays deliberately small: it materializes the data model and
//! lifts the structural directives (`v-if`/`v-else-if`/`v-else`, `v-for`,
//! `v-pre`, `v-once`) into node metadata. Everything else an attribute might
//! mean is left for later passes.

use crate::ast::{
    Ast, Attribute, ElementNode, ExpressionNode, IfCondition, Node, Span, TextNode, TextSegment,
};
use crate::error::Warning;
use crate::html;

use super::TagSink;

/// Prefixes that mark an attribute as a dynamic binding.
fn is_directive_attr(name: &str) -> bool {
    name.starts_with("v-") || name.starts_with('@') || name.starts_with(':') || name.starts_with('#')
}

struct OpenNode {
    el: ElementNode,
    /// `Some(None)` for `v-else`, `Some(Some(exp))` for `v-else-if`.
    else_branch: Option<Option<String>>,
}

pub struct TreeBuilder {
    roots: Vec<Node>,
    stack: Vec<OpenNode>,
    warnings: Vec<Warning>,
    is_reserved_tag: fn(&str) -> bool,
    /// Depth of enclosing `v-pre` subtrees; content inside is verbatim.
    v_pre_depth: usize,
    /// Depth of enclosing `<pre>` tags; whitespace inside is preserved.
    pre_tag_depth: usize,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::with_reserved_tag(html::is_reserved_tag)
    }

    pub fn with_reserved_tag(is_reserved_tag: fn(&str) -> bool) -> Self {
        Self {
            roots: Vec::new(),
            stack: Vec::new(),
            warnings: Vec::new(),
            is_reserved_tag,
            v_pre_depth: 0,
            pre_tag_depth: 0,
        }
    }

    /// Consume the builder, returning the tree and collected warnings.
    /// Any elements still open (a scanner always closes them; a custom
    /// driver might not) are folded into the tree as-is.
    pub fn finish(mut self) -> (Ast, Vec<Warning>) {
        while let Some(open) = self.stack.pop() {
            self.attach(open.el, open.else_branch);
        }
        (Ast { roots: self.roots }, self.warnings)
    }

    fn siblings(&mut self) -> &mut Vec<Node> {
        match self.stack.last_mut() {
            Some(open) => &mut open.el.children,
            None => &mut self.roots,
        }
    }

    /// Place a finished element: either as a conditional branch of the
    /// preceding sibling, or as an ordinary child.
    fn attach(&mut self, el: ElementNode, else_branch: Option<Option<String>>) {
        let Some(exp) = else_branch else {
            self.siblings().push(Node::Element(el));
            return;
        };
        let siblings = self.siblings();
        // Whitespace between conditional branches is not content.
        while matches!(siblings.last(), Some(Node::Text(t)) if t.text.trim().is_empty()) {
            siblings.pop();
        }
        let has_if_sibling = siblings
            .iter()
            .rev()
            .find_map(Node::as_element)
            .is_some_and(|prev| !prev.if_conditions.is_empty());
        if has_if_sibling {
            if let Some(prev) = siblings.iter_mut().rev().find_map(Node::as_element_mut) {
                prev.if_conditions.push(IfCondition {
                    exp,
                    block: Some(Box::new(el)),
                });
            }
            return;
        }
        self.warnings.push(
            Warning::new(
                format!("<{}> has an else branch but no preceding v-if.", el.tag),
                el.span.start,
            )
            .with_end(el.span.end),
        );
    }

    fn push_text_node(&mut self, node: Node) {
        self.siblings().push(node);
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TagSink for TreeBuilder {
    fn start_tag(&mut self, tag: &str, attrs: Vec<Attribute>, self_closing: bool, span: Span) {
        let mut el = ElementNode::new(tag, attrs, span);
        el.is_component = !(self.is_reserved_tag)(tag);
        let mut else_branch = None;

        if self.v_pre_depth > 0 {
            // Inside v-pre everything is verbatim; attributes keep their
            // literal meaning and directives are not processed.
            el.pre = true;
        } else if take_attr(&mut el, "v-pre").is_some() {
            el.pre = true;
        } else {
            el.for_clause = take_attr(&mut el, "v-for");
            if let Some(exp) = take_attr(&mut el, "v-if") {
                el.if_clause = Some(exp.clone());
                el.if_conditions.push(IfCondition {
                    exp: Some(exp),
                    block: None,
                });
            } else if let Some(exp) = take_attr(&mut el, "v-else-if") {
                else_branch = Some(Some(exp));
            } else if take_attr(&mut el, "v-else").is_some() {
                else_branch = Some(None);
            }
            if take_attr(&mut el, "v-once").is_some() {
                el.once = true;
            }
            el.has_bindings = el.attrs.iter().any(|a| is_directive_attr(&a.name));
        }
        el.plain = el.attrs.is_empty();

        if self_closing {
            self.attach(el, else_branch);
        } else {
            if el.pre {
                self.v_pre_depth += 1;
            }
            if el.tag.eq_ignore_ascii_case("pre") {
                self.pre_tag_depth += 1;
            }
            self.stack.push(OpenNode { el, else_branch });
        }
    }

    fn end_tag(&mut self, _tag: &str, span: Span) {
        let Some(OpenNode {
            mut el,
            else_branch,
        }) = self.stack.pop()
        else {
            return;
        };
        if el.pre {
            self.v_pre_depth -= 1;
        }
        let in_pre = self.pre_tag_depth > 0;
        if el.tag.eq_ignore_ascii_case("pre") {
            self.pre_tag_depth -= 1;
        }
        if !in_pre {
            // Drop the trailing space left behind by whitespace condensing.
            while matches!(el.children.last(), Some(Node::Text(t)) if t.text == " ") {
                el.children.pop();
            }
        }
        el.span.end = span.end;
        self.attach(el, else_branch);
    }

    fn text(&mut self, text: String, span: Span) {
        if self.v_pre_depth > 0 {
            self.push_text_node(Node::Text(TextNode {
                text,
                span,
                is_static: false,
            }));
            return;
        }
        let text = if text.trim().is_empty() {
            if self.pre_tag_depth > 0 {
                text
            } else if self.stack.is_empty() || self.siblings().is_empty() {
                // Whitespace at the root or ahead of any sibling carries no
                // content.
                return;
            } else {
                " ".to_string()
            }
        } else {
            text
        };
        let node = match split_interpolation(&text) {
            Some(segments) => Node::Expression(ExpressionNode {
                text,
                segments,
                span,
                is_static: false,
            }),
            None => Node::Text(TextNode {
                text,
                span,
                is_static: false,
            }),
        };
        self.push_text_node(node);
    }

    fn warn(&mut self, message: String, start: usize, end: Option<usize>) {
        let mut warning = Warning::new(message, start);
        if let Some(end) = end {
            warning = warning.with_end(end);
        }
        self.warnings.push(warning);
    }
}

fn take_attr(el: &mut ElementNode, name: &str) -> Option<String> {
    let idx = el.attrs.iter().position(|a| a.name == name)?;
    Some(el.attrs.remove(idx).value)
}

/// Split a text run on `{{ ... }}` delimiters. `None` when the run holds no
/// interpolation. An unterminated `{{` is literal text.
fn split_interpolation(text: &str) -> Option<Vec<TextSegment>> {
    let mut segments = Vec::new();
    let mut rest = text;
    let mut found = false;
    while let Some(open) = rest.find("{{") {
        let Some(close) = rest[open + 2..].find("}}") else {
            break;
        };
        if open > 0 {
            segments.push(TextSegment::Literal(rest[..open].to_string()));
        }
        let exp = rest[open + 2..open + 2 + close].trim().to_string();
        segments.push(TextSegment::Binding(exp));
        rest = &rest[open + 2 + close + 2..];
        found = true;
    }
    if !found {
        return None;
    }
    if !rest.is_empty() {
        segments.push(TextSegment::Literal(rest.to_string()));
    }
    Some(segments)
}
