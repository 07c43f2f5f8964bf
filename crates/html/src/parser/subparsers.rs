//! Consume-until-terminator helpers for the constructs nested in tags and prolog.

use super::HtmlParser;
use crate::builder::TreeBuilder;
use crate::dialect::ContentSite;
use crate::error::ParseErrorCode;
use crate::token::TokenKind;
use crate::tree::NodeKind;

impl HtmlParser<'_> {
    /// Processing instructions, at most one doctype, comments and whitespace.
    pub(super) fn parse_prolog(&mut self, b: &mut TreeBuilder<'_>) {
        let prolog = b.mark();
        let mut seen_doctype = false;
        loop {
            match b.current() {
                Some(TokenKind::PiStart) => self.parse_processing_instruction(b),
                Some(TokenKind::DoctypeStart) if !seen_doctype => {
                    seen_doctype = true;
                    self.parse_doctype(b);
                }
                Some(TokenKind::CommentStart) => self.parse_comment(b),
                Some(TokenKind::RealWhitespace) => b.advance(),
                _ => break,
            }
        }
        b.done(prolog, NodeKind::Prolog);
    }

    fn parse_doctype(&mut self, b: &mut TreeBuilder<'_>) {
        let doctype = b.mark();
        b.advance();
        while matches!(
            b.current(),
            Some(
                TokenKind::Name
                    | TokenKind::DoctypePublic
                    | TokenKind::DoctypeSystem
                    | TokenKind::AttrValueStartDelimiter
                    | TokenKind::AttrValueToken
                    | TokenKind::AttrValueEndDelimiter
                    | TokenKind::EntityRef
                    | TokenKind::CharEntityRef
                    | TokenKind::BadCharacter
            )
        ) {
            b.advance();
        }
        match b.current() {
            Some(TokenKind::DoctypeEnd) => b.advance(),
            None => b.error_here(ParseErrorCode::UnexpectedEof),
            Some(_) => b.error_here(ParseErrorCode::DoctypeNotClosed),
        }
        b.done(doctype, NodeKind::Doctype);
    }

    /// Comment body is opaque; a missing `-->` is not reported.
    pub(super) fn parse_comment(&mut self, b: &mut TreeBuilder<'_>) {
        let comment = b.mark();
        b.advance();
        while let Some(kind) = b.current() {
            match kind {
                TokenKind::CommentEnd => {
                    b.advance();
                    break;
                }
                TokenKind::CommentCharacters
                | TokenKind::ConditionalCommentStart
                | TokenKind::ConditionalCommentStartEnd
                | TokenKind::ConditionalCommentEndStart
                | TokenKind::ConditionalCommentEnd => b.advance(),
                _ => break,
            }
        }
        b.done(comment, NodeKind::Comment);
    }

    pub(super) fn parse_cdata(&mut self, b: &mut TreeBuilder<'_>) {
        let cdata = b.mark();
        b.advance();
        while b.current() == Some(TokenKind::DataCharacters) {
            b.advance();
        }
        if b.current() == Some(TokenKind::CdataEnd) {
            b.advance();
        }
        b.done(cdata, NodeKind::Cdata);
    }

    /// `<?target name="value" ...?>`
    pub(super) fn parse_processing_instruction(&mut self, b: &mut TreeBuilder<'_>) {
        let pi = b.mark();
        b.advance();
        if b.current() == Some(TokenKind::PiTarget) {
            b.advance();
        }
        loop {
            match b.current() {
                Some(TokenKind::Name) => {
                    b.advance();
                    if b.current() == Some(TokenKind::Eq) {
                        b.advance();
                    } else {
                        b.error_here(ParseErrorCode::EqExpected);
                    }
                    self.parse_attribute_value(b);
                }
                Some(TokenKind::BadCharacter) => {
                    let stray = b.mark();
                    b.advance();
                    b.error(stray, ParseErrorCode::UnexpectedToken);
                }
                _ => break,
            }
        }
        if b.current() == Some(TokenKind::PiEnd) {
            b.advance();
        } else {
            b.error_here(ParseErrorCode::UnterminatedProcessingInstruction);
        }
        b.done(pi, NodeKind::ProcessingInstruction);
    }

    pub(super) fn parse_reference(&mut self, b: &mut TreeBuilder<'_>) {
        let reference = b.mark();
        b.advance();
        b.done(reference, NodeKind::Reference);
    }

    /// Attributes and references up to the first token that is neither.
    pub(super) fn parse_tag_header(&mut self, b: &mut TreeBuilder<'_>) {
        while let Some(kind) = b.current() {
            match kind {
                TokenKind::Name => self.parse_attribute(b),
                TokenKind::EntityRef | TokenKind::CharEntityRef => self.parse_reference(b),
                TokenKind::BadCharacter => {
                    let code = if b.current_text() == "&" {
                        ParseErrorCode::UnescapedAmpersand
                    } else {
                        ParseErrorCode::UnexpectedToken
                    };
                    let stray = b.mark();
                    b.advance();
                    b.error(stray, code);
                }
                _ if self.dialect.custom_content(kind, ContentSite::TagHeader) => {
                    self.parse_custom_content(b, ContentSite::TagHeader);
                }
                _ => break,
            }
        }
    }

    fn parse_attribute(&mut self, b: &mut TreeBuilder<'_>) {
        debug_assert_eq!(b.current(), Some(TokenKind::Name));
        let attribute = b.mark();
        b.advance();
        if b.current() == Some(TokenKind::Eq) {
            b.advance();
            self.parse_attribute_value(b);
        }
        b.done(attribute, NodeKind::Attribute);
    }

    /// A quoted value, a single unquoted token, or a dialect island. Nothing is
    /// recorded when no value follows `=`.
    fn parse_attribute_value(&mut self, b: &mut TreeBuilder<'_>) {
        let value = b.mark();
        match b.current() {
            Some(TokenKind::AttrValueStartDelimiter) => {
                b.advance();
                let mut closed = false;
                while let Some(kind) = b.current() {
                    match kind {
                        TokenKind::AttrValueEndDelimiter => {
                            b.advance();
                            closed = true;
                            break;
                        }
                        TokenKind::EndTagStart
                        | TokenKind::EmptyElementEnd
                        | TokenKind::StartTagStart => break,
                        TokenKind::BadCharacter => {
                            let bad = b.mark();
                            b.advance();
                            b.error(bad, ParseErrorCode::UnescapedAmpersand);
                        }
                        TokenKind::EntityRef | TokenKind::CharEntityRef => self.parse_reference(b),
                        _ if self.dialect.custom_content(kind, ContentSite::AttributeValue) => {
                            self.parse_custom_content(b, ContentSite::AttributeValue);
                        }
                        _ => b.advance(),
                    }
                }
                if !closed {
                    b.error_here(ParseErrorCode::UnclosedAttributeValue);
                }
            }
            Some(kind) if self.dialect.custom_content(kind, ContentSite::AttributeValue) => {
                self.parse_custom_content(b, ContentSite::AttributeValue);
            }
            Some(TokenKind::AttrValueToken) => b.advance(),
            _ => {
                b.drop_marker(value);
                return;
            }
        }
        b.done(value, NodeKind::AttributeValue);
    }
}
