//! Markup token model.

use crate::span::Span;

/// Lexical token kinds.
///
/// Every byte of the source belongs to exactly one token. Only [`TokenKind::Whitespace`]
/// is trivia; all other kinds are significant to the parser.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `<` opening a start tag.
    StartTagStart,
    /// `</` opening an end tag.
    EndTagStart,
    /// `>` closing a tag header or footer.
    TagEnd,
    /// `/>` closing a self-closing tag.
    EmptyElementEnd,
    /// Tag, attribute, or PI attribute name.
    Name,
    Eq,
    AttrValueStartDelimiter,
    AttrValueToken,
    AttrValueEndDelimiter,
    /// Whitespace inside markup (tag headers, footers, doctype, PI).
    Whitespace,
    /// Whitespace in content.
    RealWhitespace,
    DataCharacters,
    CommentStart,
    CommentCharacters,
    CommentEnd,
    /// `[if IE]` style condition opening a conditional comment.
    ConditionalCommentStart,
    /// `>` terminating a conditional comment condition.
    ConditionalCommentStartEnd,
    /// `<![` opening a conditional comment terminator.
    ConditionalCommentEndStart,
    /// `endif]` inside a conditional comment terminator.
    ConditionalCommentEnd,
    CdataStart,
    CdataEnd,
    PiStart,
    PiTarget,
    PiEnd,
    DoctypeStart,
    DoctypePublic,
    DoctypeSystem,
    DoctypeEnd,
    /// `&name;`
    EntityRef,
    /// `&#123;` or `&#x7B;`
    CharEntityRef,
    /// Unescaped `&` or a character that cannot appear where it was found.
    BadCharacter,
    /// Embedded-language island, e.g. `{{ expr }}`.
    Interpolation,
}

impl TokenKind {
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Whitespace)
    }

    pub fn is_reference(self) -> bool {
        matches!(self, TokenKind::EntityRef | TokenKind::CharEntityRef)
    }

    /// Content tokens that may appear verbatim between tags.
    pub fn is_text_content(self) -> bool {
        matches!(self, TokenKind::RealWhitespace | TokenKind::DataCharacters)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, start: usize, end: usize) -> Self {
        Self {
            kind,
            span: Span::new(start, end),
        }
    }

    pub fn text(self, source: &str) -> &str {
        self.span.slice(source)
    }
}
