//! Fixture-driven invariant checks.
//!
//! Every `tests/fixtures/*.fern` file is run through the parser and the
//! optimizer, and a set of structural invariants is asserted for each:
//! the event stream balances, all reported spans index cleanly into the
//! source, and optimizing twice is the same as optimizing once.
//!
//! Run with: cargo test --test invariants

use libtest_mimic::{Arguments, Failed, Trial};

use fern_compiler::ast::{Attribute, Span};
use fern_compiler::{
    compile, optimize_ast, parse, CompileOptions, OptimizeOptions, ParserOptions, TagSink,
};

fn main() {
    let args = Arguments::from_args();

    let pattern = format!("{}/tests/fixtures/*.fern", env!("CARGO_MANIFEST_DIR"));
    let mut trials = Vec::new();

    for entry in glob::glob(&pattern).expect("fixture glob pattern is valid") {
        let path = entry.expect("fixture path is readable");
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("fixture")
            .to_string();
        let source = std::fs::read_to_string(&path).expect("fixture is readable");

        for (check, runner) in [
            ("balanced_events", check_balanced_events as fn(&str) -> Result<(), Failed>),
            ("spans_in_bounds", check_spans_in_bounds),
            ("optimize_idempotent", check_optimize_idempotent),
        ] {
            let source = source.clone();
            trials.push(Trial::test(format!("{name}::{check}"), move || {
                runner(&source)
            }));
        }
    }

    assert!(!trials.is_empty(), "no fixtures found under tests/fixtures");
    libtest_mimic::run(&args, trials).exit();
}

/// Start/end events nest and balance, whatever the input looked like.
fn check_balanced_events(source: &str) -> Result<(), Failed> {
    #[derive(Default)]
    struct Balance {
        stack: Vec<String>,
        errors: Vec<String>,
    }
    impl TagSink for Balance {
        fn start_tag(&mut self, tag: &str, _attrs: Vec<Attribute>, self_closing: bool, _span: Span) {
            if !self_closing {
                self.stack.push(tag.to_string());
            }
        }
        fn end_tag(&mut self, tag: &str, _span: Span) {
            match self.stack.pop() {
                Some(open) if open.eq_ignore_ascii_case(tag) => {}
                Some(open) => self.errors.push(format!("</{tag}> closed <{open}>")),
                None => self.errors.push(format!("</{tag}> without an open tag")),
            }
        }
    }

    let mut sink = Balance::default();
    parse(source, &ParserOptions::default(), &mut sink);
    if !sink.errors.is_empty() {
        return Err(format!("unbalanced events: {:?}", sink.errors).into());
    }
    if !sink.stack.is_empty() {
        return Err(format!("tags left open after cleanup: {:?}", sink.stack).into());
    }
    Ok(())
}

/// Every span lies within the source and on a character boundary.
fn check_spans_in_bounds(source: &str) -> Result<(), Failed> {
    #[derive(Default)]
    struct Bounds {
        spans: Vec<Span>,
        warning_offsets: Vec<(usize, Option<usize>)>,
    }
    impl TagSink for Bounds {
        fn start_tag(&mut self, _tag: &str, attrs: Vec<Attribute>, _sc: bool, span: Span) {
            self.spans.push(span);
            self.spans.extend(attrs.into_iter().filter_map(|a| a.span));
        }
        fn end_tag(&mut self, _tag: &str, span: Span) {
            self.spans.push(span);
        }
        fn text(&mut self, _text: String, span: Span) {
            self.spans.push(span);
        }
        fn comment(&mut self, _text: &str, span: Span) {
            self.spans.push(span);
        }
        fn warn(&mut self, _message: String, start: usize, end: Option<usize>) {
            self.warning_offsets.push((start, end));
        }
    }

    let options = ParserOptions {
        keep_comments: true,
        output_source_range: true,
        ..ParserOptions::default()
    };
    let mut sink = Bounds::default();
    parse(source, &options, &mut sink);

    for span in &sink.spans {
        if span.start > span.end || span.end > source.len() {
            return Err(format!("span out of bounds: {span:?}").into());
        }
        if !source.is_char_boundary(span.start) || !source.is_char_boundary(span.end) {
            return Err(format!("span splits a character: {span:?}").into());
        }
    }
    for (start, end) in &sink.warning_offsets {
        if *start > source.len() || end.is_some_and(|e| e > source.len() || e < *start) {
            return Err(format!("warning offsets out of bounds: {start}..{end:?}").into());
        }
    }
    Ok(())
}

/// Optimizer flags are a fixed point after one run.
fn check_optimize_idempotent(source: &str) -> Result<(), Failed> {
    let mut result = compile(source, &CompileOptions::default());
    let once = serde_json::to_value(&result.ast).map_err(|e| e.to_string())?;
    optimize_ast(&mut result.ast, &OptimizeOptions::default());
    let twice = serde_json::to_value(&result.ast).map_err(|e| e.to_string())?;
    if once != twice {
        return Err("optimizer output changed on second run".into());
    }
    Ok(())
}
