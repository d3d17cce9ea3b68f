//! Static-subtree optimizer.
//!
//! Walks a finished template AST and marks the parts of the tree whose
//! rendered output can never change. A code generator can then hoist every
//! `static_root` subtree into a constant built once and skip it entirely
//! when patching.
//!
//! Two passes, both pre-order: the first computes `is_static` for every
//! node, the second picks the hoisting roots and records `static_in_for`.
//! Both are total over any well-formed tree and recompute every flag from
//! non-flag state, so re-running the optimizer is idempotent.

use std::collections::HashSet;

use crate::ast::{Ast, ElementNode, Node};
use crate::html;

#[derive(Debug, Clone)]
pub struct OptimizeOptions {
    /// Extra annotation keys (comma-joined) that do not disqualify an
    /// element from being static, e.g. `"staticClass,staticStyle"` from a
    /// platform's attribute pass.
    pub static_keys: String,
    pub is_reserved_tag: fn(&str) -> bool,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            static_keys: String::new(),
            is_reserved_tag: html::is_reserved_tag,
        }
    }
}

/// Annotate one root in place.
pub fn optimize(root: &mut Node, options: &OptimizeOptions) {
    let static_keys = parse_static_keys(&options.static_keys);
    mark_static(root, false, &static_keys, options.is_reserved_tag);
    mark_static_roots(root, false);
}

/// Annotate every root of a parsed template. An empty tree is a no-op.
pub fn optimize_ast(ast: &mut Ast, options: &OptimizeOptions) {
    for root in &mut ast.roots {
        optimize(root, options);
    }
}

fn parse_static_keys(keys: &str) -> HashSet<&str> {
    keys.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .collect()
}

/// First pass. `in_template_for` is true when the node hangs off an
/// unbroken chain of `<template>` ancestors one of which carries a loop
/// directive; such content is repeated and must not be hoisted.
fn mark_static(
    node: &mut Node,
    in_template_for: bool,
    static_keys: &HashSet<&str>,
    is_reserved: fn(&str) -> bool,
) {
    match node {
        Node::Text(text) => text.is_static = true,
        Node::Expression(expr) => expr.is_static = false,
        Node::Element(el) => mark_static_element(el, in_template_for, static_keys, is_reserved),
    }
}

fn mark_static_element(
    el: &mut ElementNode,
    in_template_for: bool,
    static_keys: &HashSet<&str>,
    is_reserved: fn(&str) -> bool,
) {
    let mut is_static = is_static_element(el, in_template_for, static_keys, is_reserved);

    // Do not descend into component slot content: the owner component must
    // stay free to mutate it, and hot reload of slot content depends on it
    // being rebuilt.
    let descend = is_reserved(&el.tag)
        || el.tag == "slot"
        || el.attrs_map.contains_key("inline-template");
    if descend {
        let child_in_for =
            el.tag == "template" && (el.for_clause.is_some() || in_template_for);
        for child in &mut el.children {
            mark_static(child, child_in_for, static_keys, is_reserved);
            if !child.is_static() {
                is_static = false;
            }
        }
        // Conditional branches render in this node's place; it is only
        // static if every branch is.
        for condition in el.if_conditions.iter_mut().skip(1) {
            if let Some(block) = condition.block.as_deref_mut() {
                mark_static_element(block, in_template_for, static_keys, is_reserved);
                if !block.is_static {
                    is_static = false;
                }
            }
        }
    }

    el.is_static = is_static;
}

fn is_static_element(
    el: &ElementNode,
    in_template_for: bool,
    static_keys: &HashSet<&str>,
    is_reserved: fn(&str) -> bool,
) -> bool {
    if el.pre {
        return true;
    }
    !el.has_bindings
        && el.if_clause.is_none()
        && el.for_clause.is_none()
        && !html::is_built_in_tag(&el.tag)
        && is_reserved(&el.tag)
        && !in_template_for
        && el.extra.keys().all(|key| static_keys.contains(key.as_str()))
}

/// Second pass: choose hoisting roots.
fn mark_static_roots(node: &mut Node, is_in_for: bool) {
    if let Node::Element(el) = node {
        mark_static_roots_element(el, is_in_for);
    }
}

fn mark_static_roots_element(el: &mut ElementNode, is_in_for: bool) {
    if el.is_static || el.once {
        el.static_in_for = is_in_for;
    }

    // Hoisting a lone text child costs more than rendering it fresh.
    let lone_text_child = el.children.len() == 1 && matches!(el.children[0], Node::Text(_));
    if el.is_static && !el.children.is_empty() && !lone_text_child {
        el.static_root = true;
        // The whole subtree hoists as one fragment; no roots inside it.
        return;
    }
    el.static_root = false;

    let child_in_for = is_in_for || el.for_clause.is_some();
    for child in &mut el.children {
        mark_static_roots(child, child_in_for);
    }
    for condition in el.if_conditions.iter_mut().skip(1) {
        if let Some(block) = condition.block.as_deref_mut() {
            mark_static_roots_element(block, is_in_for);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse, ParserOptions, TreeBuilder};

    fn optimized(source: &str) -> Ast {
        let mut builder = TreeBuilder::new();
        parse(source, &ParserOptions::default(), &mut builder);
        let (mut ast, _) = builder.finish();
        optimize_ast(&mut ast, &OptimizeOptions::default());
        ast
    }

    fn root(ast: &Ast) -> &ElementNode {
        ast.roots[0].as_element().expect("root should be an element")
    }

    #[test]
    fn text_only_element_is_static_but_not_a_root() {
        let ast = optimized("<div>hello</div>");
        let el = root(&ast);
        assert!(el.is_static);
        assert!(!el.static_root);
        assert!(el.children[0].is_static());
    }

    #[test]
    fn static_subtree_becomes_root() {
        let ast = optimized("<div><p>a</p><p>b</p></div>");
        let el = root(&ast);
        assert!(el.is_static);
        assert!(el.static_root);
        // Recursion stops at the root: inner elements are static but were
        // never promoted.
        assert!(!el.children[0].as_element().unwrap().static_root);
    }

    #[test]
    fn interpolation_poisons_ancestors() {
        let ast = optimized("<div><p>{{msg}}</p></div>");
        let el = root(&ast);
        assert!(!el.is_static);
        assert!(!el.children[0].as_element().unwrap().is_static);
        assert!(!el.children[0].as_element().unwrap().children[0].is_static());
    }

    #[test]
    fn dynamic_binding_disqualifies_element() {
        let ast = optimized("<div :class=\"c\"><span>x</span></div>");
        let el = root(&ast);
        assert!(!el.is_static);
        // The child is still independently static.
        assert!(el.children[0].is_static());
    }

    #[test]
    fn conditional_and_loop_directives_disqualify() {
        let ast = optimized("<div><p v-if=\"a\">x</p></div>");
        assert!(!root(&ast).is_static);
        let ast = optimized("<ul><li v-for=\"i in list\">x</li></ul>");
        assert!(!root(&ast).is_static);
    }

    #[test]
    fn built_in_tags_are_never_static() {
        let ast = optimized("<div><slot>fallback</slot></div>");
        let el = root(&ast);
        assert!(!el.is_static);
        assert!(!el.children[0].as_element().unwrap().is_static);
    }

    #[test]
    fn component_children_are_not_visited() {
        let ast = optimized("<my-widget><span>x</span></my-widget>");
        let el = root(&ast);
        assert!(!el.is_static);
        // The walk never descended, so the child keeps its unset flag even
        // though its content looks static.
        assert!(!el.children[0].as_element().unwrap().is_static);
    }

    #[test]
    fn branch_blocks_are_marked_individually() {
        let ast = optimized(
            "<div>\
             <p v-if=\"a\">x</p>\
             <p v-else-if=\"b\">y</p>\
             <p v-else>{{z}}</p>\
             </div>",
        );
        let el = root(&ast);
        assert!(!el.is_static);
        let chain = el.children[0].as_element().unwrap();
        let branch_static: Vec<bool> = chain
            .if_conditions
            .iter()
            .skip(1)
            .map(|c| c.block.as_deref().unwrap().is_static)
            .collect();
        assert_eq!(branch_static, vec![true, false]);
    }

    #[test]
    fn template_for_descendants_cannot_be_hoisted() {
        let ast = optimized("<template v-for=\"i in list\"><span>x</span></template>");
        let el = root(&ast);
        assert!(!el.is_static);
        assert!(!el.children[0].as_element().unwrap().is_static);
    }

    #[test]
    fn nested_template_chain_still_disqualifies() {
        let ast =
            optimized("<template v-for=\"i in list\"><template><b>x</b></template></template>");
        let inner = root(&ast).children[0].as_element().unwrap();
        assert!(!inner.children[0].as_element().unwrap().is_static);
    }

    #[test]
    fn div_inside_template_for_breaks_the_chain() {
        let ast = optimized("<template v-for=\"i in list\"><div><b>x</b></div></template>");
        let div = root(&ast).children[0].as_element().unwrap();
        // The div is a direct descendant and stays dynamic; its own child
        // is behind a non-template ancestor and may be static again.
        assert!(!div.is_static);
        assert!(div.children[0].as_element().unwrap().is_static);
    }

    #[test]
    fn static_in_for_recorded_inside_loops() {
        let ast = optimized("<div><div v-for=\"i in list\"><p><span>s</span></p></div></div>");
        let looped = root(&ast).children[0].as_element().unwrap();
        let p = looped.children[0].as_element().unwrap();
        assert!(p.is_static);
        assert!(p.static_root);
        assert!(p.static_in_for);
    }

    #[test]
    fn static_in_for_false_outside_loops() {
        let ast = optimized("<div><p>a</p><p>b</p></div>");
        assert!(root(&ast).static_root);
        assert!(!root(&ast).static_in_for);
    }

    #[test]
    fn v_pre_subtree_is_fully_static() {
        let ast = optimized("<div v-pre><custom-thing>{{x}}</custom-thing></div>");
        let el = root(&ast);
        assert!(el.is_static);
        assert!(el.static_root);
    }

    #[test]
    fn v_once_records_loop_position() {
        let ast = optimized("<div><span v-for=\"i in l\"><b v-once>{{i}}</b></span></div>");
        let looped = root(&ast).children[0].as_element().unwrap();
        let once = looped.children[0].as_element().unwrap();
        assert!(once.once);
        assert!(!once.is_static);
        assert!(once.static_in_for);
    }

    #[test]
    fn extra_annotations_disqualify_unless_allowed() {
        let source = "<div><p>a</p><p>b</p></div>";
        let mut builder = TreeBuilder::new();
        parse(source, &ParserOptions::default(), &mut builder);
        let (mut ast, _) = builder.finish();
        ast.roots[0]
            .as_element_mut()
            .unwrap()
            .extra
            .insert("staticClass".to_string(), serde_json::json!("big"));

        let mut annotated = ast.clone();
        optimize_ast(&mut annotated, &OptimizeOptions::default());
        assert!(!annotated.roots[0].as_element().unwrap().is_static);

        let options = OptimizeOptions {
            static_keys: "staticClass,staticStyle".to_string(),
            ..OptimizeOptions::default()
        };
        optimize_ast(&mut ast, &options);
        assert!(ast.roots[0].as_element().unwrap().is_static);
    }

    #[test]
    fn optimize_is_idempotent() {
        let source = "<div><p v-if=\"a\">{{x}}</p><p v-else>b</p><section><b>s</b></section></div>";
        let mut builder = TreeBuilder::new();
        parse(source, &ParserOptions::default(), &mut builder);
        let (mut ast, _) = builder.finish();
        let options = OptimizeOptions::default();
        optimize_ast(&mut ast, &options);
        let once = serde_json::to_value(&ast).unwrap();
        optimize_ast(&mut ast, &options);
        let twice = serde_json::to_value(&ast).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_tree_is_a_no_op() {
        let mut ast = Ast { roots: Vec::new() };
        optimize_ast(&mut ast, &OptimizeOptions::default());
        assert!(ast.roots.is_empty());
    }
}
