//! Stack-based, error-tolerant markup parser.
//!
//! Drives a [`TreeBuilder`] over the token stream, keeping an explicit stack of
//! open tags. Every input token ends up in the tree; malformed markup produces
//! `Error` nodes and never stops the parse.
//!
//! Closing decisions:
//! - An opening tag may implicitly close open tags (dialect auto-close, walked
//!   innermost first). Closed tags end right before the new tag.
//! - An end tag matching an outer open tag closes the inner tags one layer per
//!   pass; the end tag tokens are re-read until they match the top.
//! - An end tag matching nothing becomes an error node.
//! - Tags still open at the end of input are flushed as incomplete.

use crate::builder::{Marker, TreeBuilder};
use crate::dialect::{AutoClose, ContentSite, MarkupDialect};
use crate::error::{ParseError, ParseErrorCode};
use crate::token::TokenKind;
use crate::tree::NodeKind;
use stack::{StackItem, TagStack};

mod stack;
mod subparsers;

#[cfg(test)]
mod tests;

/// Tag name normalization applied before matching and dialect queries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NameCase {
    #[default]
    AsciiLowercase,
    Preserve,
}

impl NameCase {
    pub fn normalize(self, name: &str) -> String {
        match self {
            NameCase::AsciiLowercase => name.to_ascii_lowercase(),
            NameCase::Preserve => name.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParserConfig {
    pub name_case: NameCase,
}

impl ParserConfig {
    /// Case-sensitive names, as XHTML and XML-like dialects need.
    pub fn case_sensitive() -> Self {
        Self {
            name_case: NameCase::Preserve,
        }
    }
}

/// Parser instrumentation, reset per document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParserStats {
    pub tags: u64,
    pub max_stack_depth: usize,
    /// Tags closed by an opening tag or by an outer end tag.
    pub auto_closed: u64,
    pub unmatched_end_tags: u64,
    /// Tokens skipped because a custom content hook consumed nothing.
    pub forced_progress: u64,
}

pub struct HtmlParser<'d> {
    config: ParserConfig,
    dialect: &'d dyn MarkupDialect,
    stack: TagStack,
    stats: ParserStats,
}

impl<'d> HtmlParser<'d> {
    pub fn new(config: ParserConfig, dialect: &'d dyn MarkupDialect) -> Self {
        Self {
            config,
            dialect,
            stack: TagStack::default(),
            stats: ParserStats::default(),
        }
    }

    pub fn stats(&self) -> ParserStats {
        ParserStats {
            max_stack_depth: self.stack.max_depth(),
            ..self.stats
        }
    }

    /// Parse the whole token stream into a `Document` node.
    pub fn parse_document(&mut self, b: &mut TreeBuilder<'_>) {
        self.stack = TagStack::default();
        self.stats = ParserStats::default();

        let document = b.mark();
        while b.current() == Some(TokenKind::CommentStart) {
            self.parse_comment(b);
        }
        self.parse_prolog(b);

        let mut unexpected: Option<Marker> = None;
        while !b.eof() && self.dialect.should_continue_main_loop(b) {
            let Some(kind) = b.current() else {
                break;
            };
            match kind {
                TokenKind::StartTagStart => {
                    flush_unexpected(b, &mut unexpected);
                    self.parse_tag(b);
                }
                TokenKind::CommentStart => {
                    flush_unexpected(b, &mut unexpected);
                    self.parse_comment(b);
                }
                TokenKind::PiStart => {
                    flush_unexpected(b, &mut unexpected);
                    self.parse_processing_instruction(b);
                }
                TokenKind::EntityRef | TokenKind::CharEntityRef => {
                    flush_unexpected(b, &mut unexpected);
                    self.parse_reference(b);
                }
                TokenKind::RealWhitespace | TokenKind::DataCharacters => {
                    flush_unexpected(b, &mut unexpected);
                    b.advance();
                }
                TokenKind::EndTagStart => {
                    flush_unexpected(b, &mut unexpected);
                    let footer = b.mark();
                    b.advance();
                    if b.current() == Some(TokenKind::Name) {
                        b.advance();
                    }
                    if b.current() == Some(TokenKind::TagEnd) {
                        b.advance();
                    }
                    self.stats.unmatched_end_tags += 1;
                    b.error(footer, ParseErrorCode::ClosingTagMatchesNothing);
                }
                _ if self.dialect.custom_content(kind, ContentSite::TopLevel) => {
                    flush_unexpected(b, &mut unexpected);
                    self.parse_custom_content(b, ContentSite::TopLevel);
                }
                _ => {
                    if unexpected.is_none() {
                        unexpected = Some(b.mark());
                    }
                    b.advance();
                }
            }
        }
        flush_unexpected(b, &mut unexpected);
        self.flush_incomplete(b);
        b.done(document, NodeKind::Document);
    }

    fn normalize(&self, name: &str) -> String {
        self.config.name_case.normalize(name)
    }

    /// Parse a tag and everything nested in it. Returns once the stack is empty
    /// and the next token is not part of another tag's subtree.
    fn parse_tag(&mut self, b: &mut TreeBuilder<'_>) {
        debug_assert_eq!(b.current(), Some(TokenKind::StartTagStart));
        let mut text: Option<Marker> = None;
        while !b.eof() && self.dialect.should_continue_tag_parsing(b) {
            let Some(kind) = b.current() else {
                break;
            };
            if self.stack.is_empty()
                && !matches!(
                    kind,
                    TokenKind::StartTagStart | TokenKind::RealWhitespace | TokenKind::DataCharacters
                )
            {
                break;
            }
            match kind {
                TokenKind::StartTagStart => {
                    terminate_text(b, &mut text);
                    self.parse_start_tag(b);
                }
                TokenKind::PiStart => {
                    terminate_text(b, &mut text);
                    self.parse_processing_instruction(b);
                }
                TokenKind::CommentStart => {
                    terminate_text(b, &mut text);
                    self.parse_comment(b);
                }
                TokenKind::CdataStart => {
                    terminate_text(b, &mut text);
                    self.parse_cdata(b);
                }
                TokenKind::EntityRef | TokenKind::CharEntityRef => {
                    start_text(b, &mut text);
                    self.parse_reference(b);
                }
                TokenKind::BadCharacter => {
                    start_text(b, &mut text);
                    let bad = b.mark();
                    b.advance();
                    b.error(bad, ParseErrorCode::UnescapedAmpersand);
                }
                TokenKind::EndTagStart => {
                    terminate_text(b, &mut text);
                    self.parse_end_tag(b);
                }
                TokenKind::RealWhitespace | TokenKind::DataCharacters if self.stack.is_empty() => {
                    terminate_text(b, &mut text);
                    b.advance();
                }
                _ if self.dialect.custom_content(kind, ContentSite::TagBody) => {
                    terminate_text(b, &mut text);
                    self.parse_custom_content(b, ContentSite::TagBody);
                }
                _ => {
                    start_text(b, &mut text);
                    b.advance();
                }
            }
            #[cfg(any(test, feature = "parser-invariants"))]
            self.check_invariants(b);
        }
        terminate_text(b, &mut text);
    }

    fn parse_start_tag(&mut self, b: &mut TreeBuilder<'_>) {
        let tag = b.mark();
        b.advance();
        let original_name = if b.current() == Some(TokenKind::Name) {
            let name = b.current_text().to_string();
            b.advance();
            name
        } else {
            b.error_here(ParseErrorCode::TagNameExpected);
            String::new()
        };
        let name = self.normalize(&original_name);
        self.stats.tags += 1;

        self.auto_close_before(b, &tag, &name);
        self.stack.push(StackItem {
            name,
            original_name,
            marker: tag,
        });

        self.parse_tag_header(b);
        match b.current() {
            Some(TokenKind::EmptyElementEnd) => {
                b.advance();
                self.done_top(b);
            }
            Some(TokenKind::TagEnd) => {
                b.advance();
                let single = self
                    .stack
                    .top()
                    .is_some_and(|top| self.dialect.is_single_tag(&top.name));
                if single {
                    self.consume_single_tag_end(b);
                    self.done_top(b);
                }
            }
            _ => {
                b.error_here(ParseErrorCode::TagStartNotClosed);
                self.done_top(b);
            }
        }
    }

    /// Close open tags that the opening tag `name` (started at `tag`) terminates.
    fn auto_close_before(&mut self, b: &mut TreeBuilder<'_>, tag: &Marker, name: &str) {
        while let Some(verdict) = self.stack.auto_close_verdict(self.dialect, name) {
            if verdict.effective != AutoClose::Yes {
                break;
            }
            let Some(item) = self.stack.pop() else {
                break;
            };
            #[cfg(any(test, feature = "debug-stats"))]
            log::trace!(
                target: "html.parser",
                "<{name}> auto-closes <{}> (direct: {:?})",
                item.name,
                verdict.direct
            );
            // Closed only because an ancestor is: the tag itself is unterminated.
            if verdict.direct != AutoClose::Yes && self.dialect.is_end_tag_required(&item.name) {
                let error = b.precede(tag);
                b.error_before(error, ParseError::element_not_closed(&item.original_name), tag);
            }
            b.done_before(item.marker, NodeKind::Tag, tag);
            self.stats.auto_closed += 1;
        }
    }

    /// After `>` of a single tag, swallow an explicit matching end tag if one follows.
    fn consume_single_tag_end(&mut self, b: &mut TreeBuilder<'_>) {
        let Some(name) = self.stack.top().map(|top| top.name.clone()) else {
            return;
        };
        let footer = b.mark();
        while b.current() == Some(TokenKind::RealWhitespace) {
            b.advance();
        }
        if b.current() == Some(TokenKind::EndTagStart) {
            b.advance();
            if b.current() == Some(TokenKind::Name) && self.normalize(b.current_text()) == name {
                b.advance();
                b.drop_marker(footer);
                if b.current() == Some(TokenKind::TagEnd) {
                    b.advance();
                } else {
                    b.error_here(ParseErrorCode::ClosingTagNotDone);
                }
                return;
            }
        }
        b.rollback_to(footer);
    }

    fn parse_end_tag(&mut self, b: &mut TreeBuilder<'_>) {
        let footer = b.mark();
        b.advance();
        if b.current() != Some(TokenKind::Name) {
            // `</>` names nothing to close.
            if b.current() == Some(TokenKind::TagEnd) {
                b.advance();
            }
            b.error(footer, ParseErrorCode::ClosingTagNameMissing);
            return;
        }

        let end_name = self.normalize(b.current_text());
        let top_matches = self.stack.top().is_some_and(|top| top.name == end_name);
        if !top_matches {
            if self.stack.contains(&end_name) {
                b.rollback_to(footer);
                let Some(item) = self.stack.pop() else {
                    return;
                };
                if !self.dialect.can_closing_tag_auto_close(&item.name, &end_name) {
                    b.error_here(ParseError::element_not_closed(&item.original_name));
                }
                b.done(item.marker, NodeKind::Tag);
                self.stats.auto_closed += 1;
                return;
            }
            b.advance();
            if b.current() == Some(TokenKind::TagEnd) {
                b.advance();
            }
            self.stats.unmatched_end_tags += 1;
            b.error(footer, ParseErrorCode::ClosingTagMatchesNothing);
            return;
        }

        b.advance();
        while let Some(kind) = b.current() {
            if matches!(
                kind,
                TokenKind::TagEnd | TokenKind::StartTagStart | TokenKind::EndTagStart
            ) {
                break;
            }
            let stray = b.mark();
            b.advance();
            b.error(stray, ParseErrorCode::UnexpectedToken);
        }
        b.drop_marker(footer);
        if b.current() == Some(TokenKind::TagEnd) {
            b.advance();
        } else {
            b.error_here(ParseErrorCode::ClosingTagNotDone);
        }
        self.done_top(b);
    }

    fn done_top(&mut self, b: &mut TreeBuilder<'_>) {
        if let Some(item) = self.stack.pop() {
            b.done(item.marker, NodeKind::Tag);
        }
    }

    /// Close every tag left open, innermost first.
    fn flush_incomplete(&mut self, b: &mut TreeBuilder<'_>) {
        while let Some(item) = self.stack.pop() {
            if self.dialect.is_end_tag_required(&item.name) {
                b.error_here(ParseError::element_not_closed(&item.original_name));
            }
            b.done(item.marker, NodeKind::Tag);
        }
    }

    /// Run a dialect hook; skip one token if the hook consumed nothing.
    fn parse_custom_content(&mut self, b: &mut TreeBuilder<'_>, site: ContentSite) {
        let before = b.token_index();
        self.dialect.parse_custom_content(b, site);
        if b.token_index() == before && !b.eof() {
            log::warn!(
                target: "html.parser",
                "custom content hook at {site:?} consumed nothing; skipping {:?}",
                b.current()
            );
            let stray = b.mark();
            b.advance();
            b.error(stray, ParseErrorCode::UnexpectedToken);
            self.stats.forced_progress += 1;
        }
    }

    #[cfg(any(test, feature = "parser-invariants"))]
    fn check_invariants(&self, b: &TreeBuilder<'_>) {
        for item in self.stack.iter() {
            assert!(
                b.is_open(&item.marker),
                "open tag <{}> lost its marker (depth {})",
                item.name,
                self.stack.len()
            );
        }
    }
}

fn start_text(b: &mut TreeBuilder<'_>, text: &mut Option<Marker>) {
    if text.is_none() {
        *text = Some(b.mark());
    }
}

fn terminate_text(b: &mut TreeBuilder<'_>, text: &mut Option<Marker>) {
    if let Some(marker) = text.take() {
        b.done(marker, NodeKind::Text);
    }
}

fn flush_unexpected(b: &mut TreeBuilder<'_>, unexpected: &mut Option<Marker>) {
    if let Some(marker) = unexpected.take() {
        b.error(marker, ParseErrorCode::UnexpectedTokens);
    }
}
