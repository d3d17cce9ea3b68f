pub mod scanner;
mod tree_builder;

pub use scanner::{parse, ParserOptions};
pub use tree_builder::TreeBuilder;

use crate::ast::{Attribute, Span};

/// Event sink driven by the scanner.
///
/// The scanner owns no tree: it reports structure as an ordered event
/// stream and the sink decides what to build. All methods default to
/// no-ops so a sink only implements what it cares about.
pub trait TagSink {
    /// An opening tag, attribute values already decoded. Fires for
    /// self-closing tags too, with `self_closing` set.
    fn start_tag(&mut self, _tag: &str, _attrs: Vec<Attribute>, _self_closing: bool, _span: Span) {}

    /// A closing tag, explicit or implied by error recovery.
    fn end_tag(&mut self, _tag: &str, _span: Span) {}

    /// A text run. In raw-text elements this is the entire verbatim content.
    fn text(&mut self, _text: String, _span: Span) {}

    /// A comment body. Only fired when the parser is keeping comments.
    fn comment(&mut self, _text: &str, _span: Span) {}

    /// A recoverable structural anomaly. Never fatal.
    fn warn(&mut self, _message: String, _start: usize, _end: Option<usize>) {}
}
