use std::fmt;

use serde::Serialize;

/// A non-fatal diagnostic produced while parsing.
///
/// The scanner never aborts on malformed input; it degrades gracefully and
/// reports what it had to repair. Offsets are byte positions into the
/// template source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub message: String,
    pub start: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

impl Warning {
    pub fn new(message: impl Into<String>, start: usize) -> Self {
        Self {
            message: message.into(),
            start,
            end: None,
        }
    }

    pub fn with_end(mut self, end: usize) -> Self {
        self.end = Some(end);
        self
    }

    /// Render the warning with source context (no color).
    pub fn render(&self, source: &str, filename: &str) -> String {
        self.render_inner(source, filename, false)
    }

    /// Render the warning with ANSI color codes.
    pub fn render_color(&self, source: &str, filename: &str) -> String {
        self.render_inner(source, filename, true)
    }

    fn render_inner(&self, source: &str, filename: &str, color: bool) -> String {
        let yellow = if color { "\x1b[1;33m" } else { "" };
        let dim = if color { "\x1b[2m" } else { "" };
        let reset = if color { "\x1b[0m" } else { "" };

        let (line, col) = line_col(source, self.start);
        let mut output = String::new();
        output.push_str(&format!(
            " {}file:{} {}:{}:{}\n",
            dim,
            reset,
            filename,
            line + 1,
            col + 1
        ));
        output.push_str(&format!("{}warning:{} {}\n", yellow, reset, self.message));

        if let Some(source_line) = source.lines().nth(line) {
            let line_num = line + 1;
            let width = line_num.to_string().len().max(2);
            output.push_str(&format!("{}{:>width$} |{}\n", dim, "", reset));
            output.push_str(&format!(
                "{}{:>width$} |{} {}\n",
                dim, line_num, reset, source_line
            ));

            let line_chars = source_line.chars().count();
            let underline_start = col.min(line_chars);
            let underline_len = match self.end {
                Some(end) if end > self.start => {
                    let (end_line, end_col) = line_col(source, end);
                    if end_line == line {
                        end_col.saturating_sub(col).max(1)
                    } else {
                        line_chars.saturating_sub(underline_start).max(1)
                    }
                }
                _ => 1,
            };
            output.push_str(&format!(
                "{}{:>width$} |{} {}{}{}{}\n",
                dim,
                "",
                reset,
                " ".repeat(underline_start),
                yellow,
                "^".repeat(underline_len),
                reset
            ));
        }

        output
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// 0-indexed line and column (in characters) of a byte offset.
fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let mut line = 0;
    let mut col = 0;
    for (i, c) in source.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
    }
    (line, col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_counts_newlines() {
        let source = "ab\ncde\nf";
        assert_eq!(line_col(source, 0), (0, 0));
        assert_eq!(line_col(source, 4), (1, 1));
        assert_eq!(line_col(source, 7), (2, 0));
        assert_eq!(line_col(source, 100), (2, 1));
    }

    #[test]
    fn render_points_at_offending_line() {
        let source = "<div>\n<span>x\n</div>";
        let warning = Warning::new("tag <span> has no matching end tag.", 6).with_end(12);
        let rendered = warning.render(source, "test.fern");
        assert!(rendered.contains("test.fern:2:1"));
        assert!(rendered.contains("<span>x"));
        assert!(rendered.contains("^^^^^^"));
    }
}
