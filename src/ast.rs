use std::collections::BTreeMap;

use serde::Serialize;

/// Byte range in the template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A single attribute as it appeared on a start tag.
///
/// The value has already been entity-decoded by the scanner. `span` is
/// populated only when the parser was asked for source ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    /// The name uses the bracketed dynamic-argument form, e.g. `:[key]`.
    pub dynamic_arg: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

/// A parsed template: zero or more root nodes.
#[derive(Debug, Clone, Serialize)]
pub struct Ast {
    pub roots: Vec<Node>,
}

/// AST node, discriminated by kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Element(ElementNode),
    Expression(ExpressionNode),
    Text(TextNode),
}

impl Node {
    pub fn is_static(&self) -> bool {
        match self {
            Node::Element(el) => el.is_static,
            Node::Expression(expr) => expr.is_static,
            Node::Text(text) => text.is_static,
        }
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut ElementNode> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }
}

/// An element with attributes and children.
///
/// The tree is singly owned and acyclic: every child is owned exclusively by
/// its parent's `children` (or by an `if_conditions` entry, which holds the
/// `else-if`/`else` siblings that are deliberately *not* in `children`).
#[derive(Debug, Clone, Serialize)]
pub struct ElementNode {
    pub tag: String,
    /// Remaining attributes, in source order, structural directives removed.
    pub attrs: Vec<Attribute>,
    /// Map view over *all* attributes as written, directives included.
    pub attrs_map: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub if_clause: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub if_conditions: Vec<IfCondition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub for_clause: Option<String>,
    /// Verbatim subtree: content is compiled as-is, no binding processing.
    pub pre: bool,
    /// Render-once marker.
    pub once: bool,
    /// Carries no attributes at all.
    pub plain: bool,
    /// Tag is not a platform-reserved element.
    pub is_component: bool,
    /// At least one attribute uses a dynamic binding prefix.
    pub has_bindings: bool,
    /// Annotations attached by downstream passes. The optimizer's static-key
    /// guard scans these names; passes that insert entries must run before
    /// `optimize`.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
    pub span: Span,
    /// Written by the optimizer: rendered output can never change.
    pub is_static: bool,
    /// Written by the optimizer: static and worth hoisting as a unit.
    pub static_root: bool,
    /// Written by the optimizer: the node sits inside a `v-for` scope.
    pub static_in_for: bool,
}

impl ElementNode {
    pub fn new(tag: impl Into<String>, attrs: Vec<Attribute>, span: Span) -> Self {
        let attrs_map = attrs
            .iter()
            .map(|a| (a.name.clone(), a.value.clone()))
            .collect();
        Self {
            tag: tag.into(),
            attrs,
            attrs_map,
            children: Vec::new(),
            if_clause: None,
            if_conditions: Vec::new(),
            for_clause: None,
            pre: false,
            once: false,
            plain: false,
            is_component: false,
            has_bindings: false,
            extra: BTreeMap::new(),
            span,
            is_static: false,
            static_root: false,
            static_in_for: false,
        }
    }
}

/// One branch of a conditional chain.
///
/// Entry 0 has `block: None` and refers to the element that owns the list;
/// later entries own their `else-if`/`else` blocks.
#[derive(Debug, Clone, Serialize)]
pub struct IfCondition {
    /// Condition expression; `None` for a bare `else`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<Box<ElementNode>>,
}

/// A text run containing `{{ ... }}` interpolation. Always dynamic.
#[derive(Debug, Clone, Serialize)]
pub struct ExpressionNode {
    /// The run as written, delimiters included.
    pub text: String,
    pub segments: Vec<TextSegment>,
    pub span: Span,
    pub is_static: bool,
}

/// A piece of an interpolated text run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TextSegment {
    Literal(String),
    Binding(String),
}

/// A plain text run with no interpolation.
#[derive(Debug, Clone, Serialize)]
pub struct TextNode {
    pub text: String,
    pub span: Span,
    pub is_static: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_builds_attr_map() {
        let attrs = vec![
            Attribute {
                name: "id".to_string(),
                value: "app".to_string(),
                dynamic_arg: false,
                span: None,
            },
            Attribute {
                name: "v-if".to_string(),
                value: "ok".to_string(),
                dynamic_arg: false,
                span: None,
            },
        ];
        let el = ElementNode::new("div", attrs, Span::new(0, 20));
        assert_eq!(el.attrs_map.get("id").map(String::as_str), Some("app"));
        assert_eq!(el.attrs_map.get("v-if").map(String::as_str), Some("ok"));
        assert!(!el.is_static);
    }

    #[test]
    fn nodes_serialize_with_kind_tag() {
        let node = Node::Text(TextNode {
            text: "hi".to_string(),
            span: Span::new(0, 2),
            is_static: true,
        });
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["kind"], "text");
        assert_eq!(json["text"], "hi");
    }
}
