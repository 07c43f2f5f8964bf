//! Parse diagnostics and engine errors.
//!
//! Malformed markup never fails a parse; it is recorded as [`ParseError`] payloads on
//! `Error` nodes. [`EngineInvariantError`] is reserved for builder misuse.

use crate::span::Span;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParseErrorCode {
    TagNameExpected,
    /// Subject: the tag name as written.
    ElementNotClosed,
    TagStartNotClosed,
    ClosingTagMatchesNothing,
    ClosingTagNameMissing,
    ClosingTagNotDone,
    UnexpectedToken,
    UnexpectedTokens,
    UnescapedAmpersand,
    UnclosedAttributeValue,
    EqExpected,
    UnterminatedProcessingInstruction,
    UnexpectedEof,
    DoctypeNotClosed,
}

impl ParseErrorCode {
    /// Stable identifier used in snapshots and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            ParseErrorCode::TagNameExpected => "tag-name-expected",
            ParseErrorCode::ElementNotClosed => "element-not-closed",
            ParseErrorCode::TagStartNotClosed => "tag-start-not-closed",
            ParseErrorCode::ClosingTagMatchesNothing => "closing-tag-matches-nothing",
            ParseErrorCode::ClosingTagNameMissing => "closing-tag-name-missing",
            ParseErrorCode::ClosingTagNotDone => "closing-tag-not-done",
            ParseErrorCode::UnexpectedToken => "unexpected-token",
            ParseErrorCode::UnexpectedTokens => "unexpected-tokens",
            ParseErrorCode::UnescapedAmpersand => "unescaped-ampersand",
            ParseErrorCode::UnclosedAttributeValue => "unclosed-attribute-value",
            ParseErrorCode::EqExpected => "eq-expected",
            ParseErrorCode::UnterminatedProcessingInstruction => {
                "unterminated-processing-instruction"
            }
            ParseErrorCode::UnexpectedEof => "unexpected-eof",
            ParseErrorCode::DoctypeNotClosed => "doctype-not-closed",
        }
    }
}

/// Diagnostic payload attached to an `Error` node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParseError {
    pub code: ParseErrorCode,
    pub subject: Option<String>,
}

impl ParseError {
    pub fn new(code: ParseErrorCode) -> Self {
        Self {
            code,
            subject: None,
        }
    }

    pub fn element_not_closed(name: impl Into<String>) -> Self {
        Self {
            code: ParseErrorCode::ElementNotClosed,
            subject: Some(name.into()),
        }
    }
}

impl From<ParseErrorCode> for ParseError {
    fn from(code: ParseErrorCode) -> Self {
        Self::new(code)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            ParseErrorCode::TagNameExpected => f.write_str("Tag name expected"),
            ParseErrorCode::ElementNotClosed => write!(
                f,
                "Element {} is not closed",
                self.subject.as_deref().unwrap_or_default()
            ),
            ParseErrorCode::TagStartNotClosed => f.write_str("Tag start is not closed"),
            ParseErrorCode::ClosingTagMatchesNothing => f.write_str("Closing tag matches nothing"),
            ParseErrorCode::ClosingTagNameMissing => f.write_str("Closing tag name missing"),
            ParseErrorCode::ClosingTagNotDone => f.write_str("Closing tag is not done"),
            ParseErrorCode::UnexpectedToken => f.write_str("Unexpected token"),
            ParseErrorCode::UnexpectedTokens => f.write_str("Unexpected tokens"),
            ParseErrorCode::UnescapedAmpersand => {
                f.write_str("Unescaped & or nonterminated character/entity reference")
            }
            ParseErrorCode::UnclosedAttributeValue => f.write_str("Unclosed attribute value"),
            ParseErrorCode::EqExpected => f.write_str("'=' expected"),
            ParseErrorCode::UnterminatedProcessingInstruction => {
                f.write_str("Unterminated processing instruction")
            }
            ParseErrorCode::UnexpectedEof => f.write_str("Unexpected end of file"),
            ParseErrorCode::DoctypeNotClosed => f.write_str("Doctype is not closed"),
        }
    }
}

/// A diagnostic flattened out of the tree, in document order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub error: ParseError,
    pub span: Span,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}: {}", self.span.start, self.span.end, self.error)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Engine invariant violation (bug/corruption), not a recoverable HTML error.
pub struct EngineInvariantError {
    pub detail: &'static str,
}

impl EngineInvariantError {
    pub(crate) fn new(detail: &'static str) -> Self {
        Self { detail }
    }
}

impl fmt::Display for EngineInvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "engine invariant violated: {}", self.detail)
    }
}

impl std::error::Error for EngineInvariantError {}
