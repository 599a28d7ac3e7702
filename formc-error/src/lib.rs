//! Contains the common [`ErrorKind`] trait used by all errors raised while lowering a form, and
//! the [`Error`] type that pairs an error kind with the expression it originated from.
//!
//! Form expressions have no source file. Instead, every [`Error`] carries a rendering of the
//! offending expression (see [`Error::source`]), and the spans of the error point into that
//! rendering. This lets [`ariadne`] highlight the node that caused the failure the same way it
//! would highlight a region of source code.

use ariadne::{Color, Report, Source};
use std::{any::Any, fmt::{self, Debug, Display}, io::{self, Write}, ops::Range};

extern crate self as formc_error;

/// The color to use to highlight expressions.
pub const EXPR: Color = Color::RGB(52, 235, 152);

/// Represents any kind of error that can occur while building the IR of a form.
pub trait ErrorKind: Debug + Send + Sync {
    /// Returns this error kind as [`Any`], so that it can be downcast to its concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Returns the message displayed at the top of the report.
    fn message(&self) -> String;

    /// Builds the report for this error.
    fn build_report<'a>(
        &self,
        src_id: &'a str,
        spans: &[Range<usize>],
    ) -> Report<(&'a str, Range<usize>)>;
}

/// An error associated with the rendering of the expression it originated from.
#[derive(Debug)]
pub struct Error {
    /// The rendering of the expression (or edge) this error originated from.
    pub source: String,

    /// The regions of [`Error::source`] to highlight.
    pub spans: Vec<Range<usize>>,

    /// The kind of error that occurred.
    pub kind: Box<dyn ErrorKind>,
}

impl Error {
    /// Creates a new error that highlights the whole rendering of the given source.
    pub fn new(source: impl Display, kind: impl ErrorKind + 'static) -> Self {
        let source = source.to_string();
        let spans = vec![0..source.len()];
        Self { source, spans, kind: Box::new(kind) }
    }

    /// Creates a new error with the given source and spans.
    pub fn with_spans(
        source: impl Display,
        spans: Vec<Range<usize>>,
        kind: impl ErrorKind + 'static,
    ) -> Self {
        Self { source: source.to_string(), spans, kind: Box::new(kind) }
    }

    /// Returns a reference to the error kind if it is of type `K`.
    pub fn downcast_ref<K: ErrorKind + 'static>(&self) -> Option<&K> {
        self.kind.as_any().downcast_ref::<K>()
    }

    /// Returns true if the error kind is of type `K`.
    pub fn is<K: ErrorKind + 'static>(&self) -> bool {
        self.downcast_ref::<K>().is_some()
    }

    /// Build a report from this error kind.
    pub fn build_report<'a>(&self, src_id: &'a str) -> Report<(&'a str, Range<usize>)> {
        self.kind.build_report(src_id, &self.spans)
    }

    /// Writes the report of this error to the given writer.
    pub fn write_report(&self, src_id: &str, w: impl Write) -> io::Result<()> {
        self.build_report(src_id)
            .write((src_id, Source::from(&self.source)), w)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.message())?;
        if !self.source.is_empty() {
            write!(f, ": `{}`", self.source)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use formc_attrs::ErrorKind;
    use super::*;

    #[derive(Debug, ErrorKind)]
    #[error(
        message = format!("operand has rank {}", self.rank),
        labels = ["this operand"],
        help = "index the operand down to a scalar first",
    )]
    struct BadRank {
        rank: usize,
    }

    #[derive(Debug, ErrorKind)]
    #[error(message = "unit error", labels = [""])]
    struct Unit;

    fn render(err: &Error) -> String {
        let mut buf = Vec::new();
        err.write_report("form", &mut buf).unwrap();
        String::from_utf8(strip_ansi_escapes::strip(buf)).unwrap()
    }

    #[test]
    fn display_includes_source() {
        let err = Error::new("grad(u)", BadRank { rank: 1 });
        assert_eq!(err.to_string(), "operand has rank 1: `grad(u)`");
    }

    #[test]
    fn downcast() {
        let err = Error::new("u", BadRank { rank: 2 });
        assert!(err.is::<BadRank>());
        assert!(!err.is::<Unit>());
        assert_eq!(err.downcast_ref::<BadRank>().unwrap().rank, 2);
    }

    #[test]
    fn report_contains_message_label_and_help() {
        let err = Error::new("T[0, 1]", BadRank { rank: 2 });
        let report = render(&err);
        assert!(report.contains("operand has rank 2"));
        assert!(report.contains("this operand"));
        assert!(report.contains("index the operand down to a scalar first"));
        assert!(report.contains("T[0, 1]"));
    }

    #[test]
    fn empty_source_renders() {
        let err = Error::with_spans("", vec![], Unit);
        assert_eq!(err.to_string(), "unit error");
        assert!(render(&err).contains("unit error"));
    }
}
