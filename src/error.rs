use ariadne::{Color, Fmt, Label, Report, ReportKind, Source};
use std::fmt;
use std::io;

/// Half-open range of character offsets into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn single(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos + 1,
        }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// A lexing or parsing failure.
///
/// Carries the full source text so a caller can render a pointer
/// diagnostic without keeping the input around.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub message: String,
    pub source: String,
    pub offset: usize,
    pub span: Span,
    pub help: Option<String>,
}

impl SyntaxError {
    pub fn new(source: &str, span: Span, message: String) -> Self {
        Self {
            message,
            source: source.to_string(),
            offset: span.start,
            span,
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Plain-text diagnostic with a `^` under the offending character.
    pub fn caret(&self) -> String {
        let column = self.offset.min(self.source.chars().count());
        format!(
            "{}\n    {}\n    {}^",
            self.message,
            self.source,
            " ".repeat(column)
        )
    }

    pub fn report(&self, filename: Option<&str>) -> io::Result<()> {
        emit_report(
            &self.source,
            filename,
            self.span,
            "Syntax Error",
            Color::Yellow,
            &self.message,
            self.help.as_deref(),
        )
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (at offset {})", self.message, self.offset)
    }
}

impl std::error::Error for SyntaxError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorKind {
    UndefinedIdentifier,
    Attribute,
    NotCallable,
    NotSubscriptable,
    IndexOrKey,
    Type,
    /// Division by zero and integer overflow.
    Arithmetic,
    /// Failure raised by a host capability that fits no other kind.
    Host,
}

impl EvalErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            EvalErrorKind::UndefinedIdentifier => "UndefinedIdentifier",
            EvalErrorKind::Attribute => "AttributeError",
            EvalErrorKind::NotCallable => "NotCallableError",
            EvalErrorKind::NotSubscriptable => "NotSubscriptableError",
            EvalErrorKind::IndexOrKey => "IndexOrKeyError",
            EvalErrorKind::Type => "TypeError",
            EvalErrorKind::Arithmetic => "ArithmeticError",
            EvalErrorKind::Host => "HostError",
        }
    }
}

impl fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A failure raised while walking the AST.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub message: String,
    pub span: Span,
    pub help: Option<String>,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind, span: Span, message: String) -> Self {
        Self {
            kind,
            message,
            span,
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn undefined(span: Span, name: &str) -> Self {
        Self::new(
            EvalErrorKind::UndefinedIdentifier,
            span,
            format!("Undefined identifier '{}'", name),
        )
    }

    pub fn type_error(span: Span, message: String) -> Self {
        Self::new(EvalErrorKind::Type, span, message)
    }

    pub fn arithmetic(span: Span, message: String) -> Self {
        Self::new(EvalErrorKind::Arithmetic, span, message)
    }

    pub fn report(&self, source: &str, filename: Option<&str>) -> io::Result<()> {
        emit_report(
            source,
            filename,
            self.span,
            self.kind.name(),
            Color::Magenta,
            &self.message,
            self.help.as_deref(),
        )
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for EvalError {}

/// Either phase's failure, for callers that run both back to back.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl Error {
    pub fn report(&self, source: &str, filename: Option<&str>) -> io::Result<()> {
        match self {
            Error::Syntax(error) => error.report(filename),
            Error::Eval(error) => error.report(source, filename),
        }
    }
}

fn emit_report(
    source: &str,
    filename: Option<&str>,
    span: Span,
    kind_str: &str,
    color: Color,
    message: &str,
    help: Option<&str>,
) -> io::Result<()> {
    let filename = filename.unwrap_or("<expr>");

    let mut report_builder = Report::build(ReportKind::Error, filename, span.start)
        .with_message(format!("{}: {}", kind_str.fg(color), message))
        .with_label(
            Label::new((filename, span.start..span.end))
                .with_message(message)
                .with_color(color),
        );

    if let Some(help_text) = help {
        report_builder = report_builder.with_note(format!("{}: {}", "help".fg(Color::Cyan), help_text));
    }

    report_builder
        .finish()
        .eprint((filename, Source::from(source)))
}
