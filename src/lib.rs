//! Fern template compiler front-end.
//!
//! Turns a markup string into an annotated syntax tree for a downstream
//! code generator. Two pieces do the heavy lifting:
//!
//! - a forgiving streaming [`parser`] that reproduces browser-style error
//!   recovery (implicit closes, void and left-open elements, raw-text
//!   content) without building a DOM, reporting structure to a
//!   [`TagSink`]; and
//! - an [`optimizer`] that walks the finished tree twice and marks every
//!   subtree that can be hoisted out of the render path.
//!
//! Malformed markup never fails a compile: the result is always a
//! best-effort tree plus zero or more [`Warning`]s.
//!
//! ```
//! use fern_compiler::{compile, CompileOptions};
//!
//! let result = compile("<div><p>hi</p><p>there</p></div>", &CompileOptions::default());
//! assert!(result.warnings.is_empty());
//! let root = result.ast.roots[0].as_element().unwrap();
//! assert!(root.static_root);
//! ```

pub mod ast;
pub mod error;
pub mod html;
pub mod optimizer;
pub mod parser;

use serde::Serialize;

pub use ast::{Ast, Attribute, ElementNode, ExpressionNode, Node, Span, TextNode, TextSegment};
pub use error::Warning;
pub use optimizer::{optimize, optimize_ast, OptimizeOptions};
pub use parser::{parse, ParserOptions, TagSink, TreeBuilder};

/// Options for a full compile: scan, build, optimize.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub parser: ParserOptions,
    /// Run the static-subtree optimizer after building the tree.
    pub optimize: bool,
    /// Forwarded to [`OptimizeOptions::static_keys`].
    pub static_keys: String,
    pub is_reserved_tag: fn(&str) -> bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            parser: ParserOptions::default(),
            optimize: true,
            static_keys: String::new(),
            is_reserved_tag: html::is_reserved_tag,
        }
    }
}

/// A compiled template: the annotated tree plus everything the scanner had
/// to repair along the way.
#[derive(Debug, Clone, Serialize)]
pub struct CompileResult {
    pub ast: Ast,
    pub warnings: Vec<Warning>,
}

/// Compile `source` into an annotated AST. Never fails; malformed markup
/// degrades to warnings.
pub fn compile(source: &str, options: &CompileOptions) -> CompileResult {
    let mut builder = TreeBuilder::with_reserved_tag(options.is_reserved_tag);
    parser::parse(source, &options.parser, &mut builder);
    let (mut ast, warnings) = builder.finish();
    if options.optimize {
        let optimize_options = OptimizeOptions {
            static_keys: options.static_keys.clone(),
            is_reserved_tag: options.is_reserved_tag,
        };
        optimizer::optimize_ast(&mut ast, &optimize_options);
    }
    CompileResult { ast, warnings }
}
