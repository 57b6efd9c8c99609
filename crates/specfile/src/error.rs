use thiserror::Error;

/// Errors produced while compiling a spec file.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A fatal syntax or range error on a specific line.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Two lines request the same explicit ordinal.
    #[error("found duplicate ordinal: {0}")]
    DuplicateOrdinal(u16),

    /// Every ordinal is taken and an export still needs one.
    #[error("too many exports: no free ordinal left to assign")]
    OrdinalsExhausted,
}

/// Fatal parse error carrying source position information.
///
/// The first fatal condition stops parsing immediately; there is no error
/// batching.
#[derive(Debug, Clone, Error)]
pub struct ParseError {
    /// 1-based line where the error occured.
    line: u32,

    /// 0-based column of the offending token.
    column: usize,

    /// Source line text, without the terminator.
    fragment: String,

    /// Length of the implicated span, at least 1.
    span: usize,

    /// Error kind.
    kind: ErrorKind,
}

impl ParseError {
    pub(crate) fn new(
        line: u32,
        column: usize,
        fragment: &str,
        span: usize,
        kind: ErrorKind,
    ) -> ParseError {
        ParseError {
            line,
            column,
            fragment: fragment.to_string(),
            span: span.max(1),
            kind,
        }
    }

    /// Returns the 1-based line number where the error occured.
    #[inline]
    pub fn line_number(&self) -> u32 {
        self.line
    }

    /// Returns the 0-based column of the offending token.
    #[inline]
    pub fn column_number(&self) -> usize {
        self.column
    }

    /// Returns the source line where the error occured.
    #[inline]
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Returns the error kind.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "at {line}:{column}: {msg}\n\
            {line: >5} | {fragment}\n\
            {pad: >5} | {space:indent$}{underline}",
            msg = self.kind,
            line = self.line,
            column = self.column,
            fragment = self.fragment,
            pad = ' ',
            space = "",
            indent = self.column,
            underline = "~".repeat(self.span),
        )
    }
}

/// The individual fatal parse conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorKind {
    #[error("unexpected end of line")]
    UnexpectedEol,

    #[error("expected '@' or ordinal")]
    ExpectedOrdinal,

    #[error("unexpected character(s) after ordinal")]
    OrdinalTrailer,

    #[error("invalid value for ordinal")]
    OrdinalRange,

    #[error("invalid calling convention")]
    InvalidCallConv,

    #[error("invalid version range")]
    InvalidVersionRange,

    #[error("expected '('")]
    ExpectedOpenParen,

    #[error("expected ')'")]
    ExpectedCloseParen,

    #[error("unrecognized type")]
    UnknownArgType,

    #[error("too many arguments")]
    TooManyArgs,

    #[error("unexpected @")]
    UnexpectedAt,

    #[error("excess token(s) at end of definition")]
    ExcessTokens,

    #[error("ordinal export without ordinal")]
    MissingOrdinal,
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, ParseError};

    #[test]
    fn display_underlines_span() {
        let err = ParseError::new(3, 10, "@ stdcall Func(long qword)", 5, ErrorKind::UnknownArgType);
        let rendered = err.to_string();

        assert!(rendered.starts_with("at 3:10: unrecognized type"));
        assert!(rendered.contains("    3 | @ stdcall Func(long qword)"));
        assert!(rendered.ends_with("      |           ~~~~~"));
    }

    #[test]
    fn zero_span_renders_single_tilde() {
        let err = ParseError::new(1, 0, "x", 0, ErrorKind::ExpectedOrdinal);
        assert!(err.to_string().ends_with("| ~"));
    }
}
