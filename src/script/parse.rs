//! Script parsing and parse-failure diagnostics.
//!
//! Parsing is delegated to the swc ECMAScript parser in script (non-module) mode.
//! A failure is converted into a [`ParseFailure`] that carries the parser message,
//! the 1-based source location and a [`SourceExcerpt`] of the lines around it, so
//! callers can show the offending line without keeping the source around.

use std::fmt;

use swc_core::{
    common::{sync::Lrc, FileName, SourceMap, Spanned},
    ecma::{
        ast::Script,
        parser::{error::Error as SyntaxFailure, Parser, StringInput, Syntax},
    },
};

use crate::{Error, Result};

/// Number of source lines shown on each side of the failing line.
const EXCERPT_RADIUS: usize = 2;

/// A structured parse failure.
#[derive(Debug, Clone)]
pub struct ParseFailure {
    message: String,
    line: usize,
    column: usize,
    excerpt: SourceExcerpt,
}

impl ParseFailure {
    /// Creates a new parse failure.
    ///
    /// # Arguments
    ///
    /// * `message` - The parser's description of the problem.
    /// * `line` - 1-based line of the failure.
    /// * `column` - 1-based column of the failure.
    /// * `source` - The full source text, used to build the excerpt.
    #[must_use]
    pub fn new(message: impl Into<String>, line: usize, column: usize, source: &str) -> Self {
        Self {
            message: message.into(),
            line,
            column,
            excerpt: SourceExcerpt::around(source, line),
        }
    }

    /// The parser message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 1-based line of the failure.
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// 1-based column of the failure.
    #[must_use]
    pub fn column(&self) -> usize {
        self.column
    }

    /// The source lines surrounding the failure.
    #[must_use]
    pub fn excerpt(&self) -> &SourceExcerpt {
        &self.excerpt
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parse error at line {}, column {}: {}",
            self.line, self.column, self.message
        )
    }
}

/// One line of a [`SourceExcerpt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcerptLine {
    /// 1-based line number
    pub number: usize,
    /// The line text without its terminator
    pub text: String,
    /// Whether this is the line the failure points at
    pub is_failure: bool,
}

/// A window of source lines around a failure location.
///
/// Renders as one line per source line, prefixed with its number; the failing
/// line is marked with `>>`:
///
/// ```text
///    3: var a = [
///    4:   "x",
/// >> 5:   "y" "z"
///    6: ];
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceExcerpt {
    lines: Vec<ExcerptLine>,
}

impl SourceExcerpt {
    /// Builds an excerpt of up to two lines either side of `line`.
    ///
    /// # Arguments
    ///
    /// * `source` - The complete source text.
    /// * `line` - 1-based failing line. `0` yields an empty excerpt.
    #[must_use]
    pub fn around(source: &str, line: usize) -> Self {
        if line == 0 {
            return Self::default();
        }

        let first = line.saturating_sub(EXCERPT_RADIUS).max(1);
        let last = line + EXCERPT_RADIUS;
        let lines = source
            .lines()
            .enumerate()
            .map(|(idx, text)| (idx + 1, text))
            .filter(|(number, _)| (first..=last).contains(number))
            .map(|(number, text)| ExcerptLine {
                number,
                text: text.to_string(),
                is_failure: number == line,
            })
            .collect();

        Self { lines }
    }

    /// The lines in this excerpt.
    #[must_use]
    pub fn lines(&self) -> &[ExcerptLine] {
        &self.lines
    }

    /// Returns `true` if the excerpt holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl fmt::Display for SourceExcerpt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            let prefix = if line.is_failure { ">> " } else { "   " };
            writeln!(f, "{prefix}{}: {}", line.number, line.text)?;
        }
        Ok(())
    }
}

/// Parses `source` as a classic script.
///
/// Errors the parser recovered from are treated as failures as well; no partial
/// tree is ever returned.
///
/// # Errors
///
/// Returns [`Error::Parse`] describing the first syntax error.
pub(crate) fn parse_script(source_map: &Lrc<SourceMap>, source: &str) -> Result<Script> {
    let file = source_map.new_source_file(FileName::Anon.into(), source.to_string());
    let mut parser = Parser::new(
        Syntax::Es(Default::default()),
        StringInput::from(&*file),
        None,
    );

    let script = parser
        .parse_script()
        .map_err(|err| to_failure(source_map, source, &err))?;

    if let Some(err) = parser.take_errors().first() {
        return Err(to_failure(source_map, source, err));
    }

    Ok(script)
}

fn to_failure(source_map: &Lrc<SourceMap>, source: &str, err: &SyntaxFailure) -> Error {
    let loc = source_map.lookup_char_pos(err.span().lo);
    let message = err.kind().msg().into_owned();
    Error::Parse(ParseFailure::new(message, loc.line, loc.col.0 + 1, source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_marks_failing_line() {
        let source = "a\nb\nc\nd\ne\nf\ng";
        let excerpt = SourceExcerpt::around(source, 4);
        let numbers: Vec<usize> = excerpt.lines().iter().map(|l| l.number).collect();
        assert_eq!(numbers, vec![2, 3, 4, 5, 6]);

        let rendered = excerpt.to_string();
        assert!(rendered.contains(">> 4: d"));
        assert!(rendered.contains("   2: b"));
    }

    #[test]
    fn excerpt_clamps_at_file_edges() {
        let excerpt = SourceExcerpt::around("only\nsecond", 1);
        let numbers: Vec<usize> = excerpt.lines().iter().map(|l| l.number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert!(SourceExcerpt::around("x", 0).is_empty());
    }

    #[test]
    fn reports_location_of_syntax_error() {
        let source_map: Lrc<SourceMap> = Lrc::default();
        let source = "var a = 1;\nvar b = ;\nvar c = 3;";
        let err = parse_script(&source_map, source).unwrap_err();

        let failure = err.as_parse_failure().expect("parse failure");
        assert_eq!(failure.line(), 2);
        assert!(failure.excerpt().to_string().contains(">> 2: var b = ;"));
    }

    #[test]
    fn parses_valid_script() {
        let source_map: Lrc<SourceMap> = Lrc::default();
        let script = parse_script(&source_map, "function f() { return 1; }").unwrap();
        assert_eq!(script.body.len(), 1);
    }
}
