//! Markup lexer.
//!
//! Produces the ordered token stream consumed by the tree builder. The lexer is an
//! explicit state machine that makes progress on every step and never fails:
//! malformed markup is expressed as `BadCharacter` tokens or as tokens the parser
//! later reports on.
//!
//! Invariants:
//! - Lossless: token spans are contiguous, start at 0 and end at `source.len()`.
//! - Token boundaries are only cut at ASCII structural bytes (or at the ends of
//!   whole UTF-8 scalars), so every span lies on UTF-8 boundaries.

use crate::token::{Token, TokenKind};
use memchr::memmem;
use states::{LexerState, QuoteReturn};

mod states;


/// Configuration for the lexer.
#[derive(Clone, Debug)]
pub struct LexerConfig {
    /// Elements whose body is lexed as opaque data up to the matching end tag.
    /// Names are matched ASCII case-insensitively.
    pub raw_text_elements: Vec<String>,
    /// Open/close delimiters of embedded-language islands (`{{`/`}}` for most
    /// template dialects). Disabled when `None`.
    pub interpolation: Option<(String, String)>,
}

impl Default for LexerConfig {
    fn default() -> Self {
        Self {
            raw_text_elements: vec!["script".to_string(), "style".to_string()],
            interpolation: None,
        }
    }
}

/// Minimal lexer instrumentation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LexerStats {
    pub steps: u64,
    pub state_transitions: u64,
    pub tokens_emitted: u64,
}

/// Tokenize `source` into a lossless token stream.
pub fn tokenize(source: &str, config: &LexerConfig) -> Vec<Token> {
    let mut lexer = Lexer::new(source, config);
    lexer.run();
    log::debug!(
        target: "html.lexer",
        "tokenized {} bytes into {} tokens ({} steps, {} transitions)",
        source.len(),
        lexer.tokens.len(),
        lexer.stats.steps,
        lexer.stats.state_transitions
    );
    lexer.tokens
}

pub struct Lexer<'s> {
    config: &'s LexerConfig,
    source: &'s str,
    bytes: &'s [u8],
    cursor: usize,
    state: LexerState,
    tokens: Vec<Token>,
    /// Lowercased name of a raw-text element whose start tag is being lexed.
    pending_raw_text: Option<String>,
    /// Lowercased name of the raw-text element whose body is being lexed.
    raw_text_close: Option<String>,
    stats: LexerStats,
}

impl<'s> Lexer<'s> {
    pub fn new(source: &'s str, config: &'s LexerConfig) -> Self {
        Self {
            config,
            source,
            bytes: source.as_bytes(),
            cursor: 0,
            state: LexerState::Content,
            tokens: Vec::with_capacity(source.len() / 4 + 1),
            pending_raw_text: None,
            raw_text_close: None,
            stats: LexerStats::default(),
        }
    }

    pub fn run(&mut self) {
        while self.cursor < self.bytes.len() {
            self.stats.steps = self.stats.steps.saturating_add(1);
            let before = (self.cursor, self.state);
            self.step();
            assert!(
                self.cursor > before.0 || self.state != before.1,
                "lexer step made no progress: state={:?} cursor={}",
                self.state,
                self.cursor
            );
        }
        debug_assert_eq!(
            self.tokens.last().map_or(0, |t| t.span.end),
            self.source.len(),
            "token stream must cover the whole source"
        );
    }

    pub fn stats(&self) -> LexerStats {
        self.stats
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    fn step(&mut self) {
        match self.state {
            LexerState::Content => self.step_content(),
            LexerState::TagHeader => self.step_tag_header(),
            LexerState::BeforeAttributeValue { resume } => self.step_before_attribute_value(resume),
            LexerState::QuotedValue { quote, resume } => self.step_quoted_value(quote, resume),
            LexerState::EndTag => self.step_end_tag(),
            LexerState::Comment { fresh } => self.step_comment(fresh),
            LexerState::Cdata => self.step_cdata(),
            LexerState::Doctype => self.step_doctype(),
            LexerState::ProcessingInstruction { target_pending } => {
                self.step_processing_instruction(target_pending)
            }
            LexerState::RawText => self.step_raw_text(),
        }
    }

    fn transition_to(&mut self, next: LexerState) {
        if self.state == next {
            return;
        }
        #[cfg(any(test, feature = "debug-stats"))]
        log::trace!(
            target: "html.lexer",
            "state {:?} -> {:?} @{}",
            self.state,
            next,
            self.cursor
        );
        self.state = next;
        self.stats.state_transitions = self.stats.state_transitions.saturating_add(1);
    }

    fn emit(&mut self, kind: TokenKind, len: usize) {
        debug_assert!(len > 0, "tokens are never empty");
        let start = self.cursor;
        let end = start + len;
        debug_assert!(
            self.source.is_char_boundary(start) && self.source.is_char_boundary(end),
            "token span must be on UTF-8 boundaries"
        );
        let token = Token::new(kind, start, end);
        #[cfg(any(test, feature = "debug-stats"))]
        log::trace!(target: "html.lexer", "emit token: {token:?}");
        self.tokens.push(token);
        self.cursor = end;
        self.stats.tokens_emitted = self.stats.tokens_emitted.saturating_add(1);
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.cursor).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.cursor + offset).copied()
    }

    fn rest(&self) -> &'s [u8] {
        &self.bytes[self.cursor..]
    }

    fn starts_with(&self, needle: &[u8]) -> bool {
        self.rest().starts_with(needle)
    }

    fn starts_with_ignore_ascii_case(&self, needle: &[u8]) -> bool {
        let rest = self.rest();
        rest.len() >= needle.len() && rest[..needle.len()].eq_ignore_ascii_case(needle)
    }

    /// Length in bytes of the run starting at the cursor for which `keep` holds.
    fn run_len(&self, keep: impl Fn(u8) -> bool) -> usize {
        self.rest().iter().take_while(|&&b| keep(b)).count()
    }

    /// Byte length of the scalar at the cursor.
    fn char_len(&self) -> usize {
        self.source[self.cursor..]
            .chars()
            .next()
            .map_or(1, char::len_utf8)
    }

    fn interpolation_open(&self) -> Option<&'s str> {
        let config: &'s LexerConfig = self.config;
        config
            .interpolation
            .as_ref()
            .map(|(open, _)| open.as_str())
            .filter(|open| !open.is_empty())
    }

    fn at_interpolation(&self) -> bool {
        self.interpolation_open()
            .is_some_and(|open| self.starts_with(open.as_bytes()))
    }

    fn emit_interpolation(&mut self) {
        let config: &'s LexerConfig = self.config;
        let Some((open, close)) = config.interpolation.as_ref() else {
            return;
        };
        let body_start = self.cursor + open.len();
        let len = match memmem::find(&self.bytes[body_start..], close.as_bytes()) {
            Some(rel) if !close.is_empty() => open.len() + rel + close.len(),
            _ => self.bytes.len() - self.cursor,
        };
        self.emit(TokenKind::Interpolation, len);
    }

    /// Whether the `<` at `at` opens markup (rather than being literal data).
    fn markup_opener_at(&self, at: usize) -> bool {
        let rest = &self.bytes[at..];
        debug_assert_eq!(rest.first(), Some(&b'<'));
        match rest.get(1) {
            Some(b'/') | Some(b'?') | Some(b'>') => true,
            Some(b) if b.is_ascii_alphabetic() => true,
            Some(b'!') => {
                rest.starts_with(b"<!--")
                    || rest.starts_with(b"<![CDATA[")
                    || (rest.len() >= 9 && rest[..9].eq_ignore_ascii_case(b"<!DOCTYPE"))
            }
            _ => false,
        }
    }

    fn step_content(&mut self) {
        if self.at_interpolation() {
            self.emit_interpolation();
            return;
        }
        match self.peek() {
            Some(b'<') if self.markup_opener_at(self.cursor) => self.lex_markup_open(),
            Some(b'&') => self.lex_reference(),
            Some(b) if b.is_ascii_whitespace() => {
                let len = self.run_len(|b| b.is_ascii_whitespace());
                self.emit(TokenKind::RealWhitespace, len);
            }
            Some(_) => {
                let len = self.data_run_len();
                self.emit(TokenKind::DataCharacters, len);
            }
            None => {}
        }
    }

    fn data_run_len(&self) -> usize {
        let start = self.cursor;
        let open = self.interpolation_open().map(str::as_bytes);
        let mut i = start;
        while i < self.bytes.len() {
            let b = self.bytes[i];
            if b == b'&' || b.is_ascii_whitespace() {
                break;
            }
            if b == b'<' && self.markup_opener_at(i) {
                break;
            }
            if i > start
                && let Some(open) = open
                && self.bytes[i..].starts_with(open)
            {
                break;
            }
            i += 1;
        }
        // A data run always consumes at least the byte that started it.
        (i - start).max(self.char_len())
    }

    fn lex_markup_open(&mut self) {
        if self.starts_with(b"<!--") {
            self.emit(TokenKind::CommentStart, 4);
            self.transition_to(LexerState::Comment { fresh: true });
        } else if self.starts_with(b"<![CDATA[") {
            self.emit(TokenKind::CdataStart, 9);
            self.transition_to(LexerState::Cdata);
        } else if self.starts_with_ignore_ascii_case(b"<!DOCTYPE") {
            self.emit(TokenKind::DoctypeStart, 9);
            self.transition_to(LexerState::Doctype);
        } else if self.starts_with(b"<?") {
            self.emit(TokenKind::PiStart, 2);
            self.transition_to(LexerState::ProcessingInstruction {
                target_pending: true,
            });
        } else if self.starts_with(b"</") {
            self.emit(TokenKind::EndTagStart, 2);
            self.transition_to(LexerState::EndTag);
        } else {
            self.emit(TokenKind::StartTagStart, 1);
            let name_len = self.run_len(|b| !is_tag_name_stop(b));
            if name_len > 0 {
                let name = self.source[self.cursor..self.cursor + name_len].to_ascii_lowercase();
                self.pending_raw_text = self
                    .config
                    .raw_text_elements
                    .iter()
                    .any(|raw| raw.eq_ignore_ascii_case(&name))
                    .then_some(name);
                self.emit(TokenKind::Name, name_len);
            } else {
                self.pending_raw_text = None;
            }
            self.transition_to(LexerState::TagHeader);
        }
    }

    /// `&name;`, `&#123;`, `&#x7B;`, or a lone `&` as a bad character.
    fn lex_reference(&mut self) {
        debug_assert_eq!(self.peek(), Some(b'&'));
        let rest = self.rest();
        if let Some(len) = scan_char_reference(rest) {
            self.emit(TokenKind::CharEntityRef, len);
        } else if let Some(len) = scan_entity_reference(rest) {
            self.emit(TokenKind::EntityRef, len);
        } else {
            self.emit(TokenKind::BadCharacter, 1);
        }
    }

    fn step_tag_header(&mut self) {
        if self.at_interpolation() {
            self.emit_interpolation();
            return;
        }
        let Some(b) = self.peek() else {
            return;
        };
        match b {
            b if b.is_ascii_whitespace() => {
                let len = self.run_len(|b| b.is_ascii_whitespace());
                self.emit(TokenKind::Whitespace, len);
            }
            b'>' => {
                self.emit(TokenKind::TagEnd, 1);
                if let Some(name) = self.pending_raw_text.take() {
                    self.raw_text_close = Some(name);
                    self.transition_to(LexerState::RawText);
                } else {
                    self.transition_to(LexerState::Content);
                }
            }
            b'/' if self.peek_at(1) == Some(b'>') => {
                self.emit(TokenKind::EmptyElementEnd, 2);
                self.pending_raw_text = None;
                self.transition_to(LexerState::Content);
            }
            b'<' => {
                // Unterminated header: the next markup starts here.
                self.pending_raw_text = None;
                self.transition_to(LexerState::Content);
            }
            b'=' => {
                self.emit(TokenKind::Eq, 1);
                self.transition_to(LexerState::BeforeAttributeValue {
                    resume: QuoteReturn::TagHeader,
                });
            }
            b'&' => self.lex_reference(),
            b'"' | b'\'' | b'/' => self.emit(TokenKind::BadCharacter, 1),
            _ => {
                let len = self.run_len(|b| !is_attribute_name_stop(b));
                self.emit(TokenKind::Name, len.max(self.char_len()));
            }
        }
    }

    fn step_before_attribute_value(&mut self, resume: QuoteReturn) {
        let resume_state = resume_state(resume);
        if resume == QuoteReturn::TagHeader && self.at_interpolation() {
            self.emit_interpolation();
            self.transition_to(resume_state);
            return;
        }
        let Some(b) = self.peek() else {
            return;
        };
        match b {
            b if b.is_ascii_whitespace() => {
                let len = self.run_len(|b| b.is_ascii_whitespace());
                self.emit(TokenKind::Whitespace, len);
            }
            b'"' | b'\'' => {
                self.emit(TokenKind::AttrValueStartDelimiter, 1);
                self.transition_to(LexerState::QuotedValue { quote: b, resume });
            }
            b'>' | b'<' => self.transition_to(resume_state),
            b'/' if self.peek_at(1) == Some(b'>') => self.transition_to(resume_state),
            b'?' if resume == QuoteReturn::ProcessingInstruction
                && self.peek_at(1) == Some(b'>') =>
            {
                self.transition_to(resume_state)
            }
            _ => {
                let in_pi = resume == QuoteReturn::ProcessingInstruction;
                let len = self.run_len(|b| {
                    !(b.is_ascii_whitespace() || b == b'>' || b == b'<' || (in_pi && b == b'?'))
                });
                self.emit(TokenKind::AttrValueToken, len.max(self.char_len()));
                self.transition_to(resume_state);
            }
        }
    }

    fn step_quoted_value(&mut self, quote: u8, resume: QuoteReturn) {
        let Some(b) = self.peek() else {
            return;
        };
        if b == quote {
            self.emit(TokenKind::AttrValueEndDelimiter, 1);
            self.transition_to(resume_state(resume));
        } else if b == b'&' {
            self.lex_reference();
        } else {
            let len = self.run_len(|b| b != quote && b != b'&');
            self.emit(TokenKind::AttrValueToken, len);
        }
    }

    fn step_end_tag(&mut self) {
        let Some(b) = self.peek() else {
            return;
        };
        match b {
            b if b.is_ascii_whitespace() => {
                let len = self.run_len(|b| b.is_ascii_whitespace());
                self.emit(TokenKind::Whitespace, len);
            }
            b'>' => {
                self.emit(TokenKind::TagEnd, 1);
                self.transition_to(LexerState::Content);
            }
            b'<' => self.transition_to(LexerState::Content),
            b'"' | b'\'' | b'/' | b'=' | b'&' => self.emit(TokenKind::BadCharacter, 1),
            _ => {
                let len = self.run_len(|b| !is_attribute_name_stop(b));
                self.emit(TokenKind::Name, len.max(self.char_len()));
            }
        }
    }

    fn step_comment(&mut self, fresh: bool) {
        let rest = self.rest();
        let end = memmem::find(rest, b"-->");
        if fresh {
            self.transition_to(LexerState::Comment { fresh: false });
            if rest.starts_with(b"[if")
                && let Some(cond_end) = memmem::find(rest, b"]>")
                && end.is_none_or(|end| cond_end < end)
            {
                self.emit(TokenKind::ConditionalCommentStart, cond_end + 1);
                self.emit(TokenKind::ConditionalCommentStartEnd, 1);
                return;
            }
        }
        let endif = memmem::find(rest, b"<![endif]");
        match (end, endif) {
            (_, Some(endif)) if end.is_none_or(|end| endif < end) => {
                if endif > 0 {
                    self.emit(TokenKind::CommentCharacters, endif);
                } else {
                    self.emit(TokenKind::ConditionalCommentEndStart, 3);
                    self.emit(TokenKind::ConditionalCommentEnd, 6);
                }
            }
            (Some(0), _) => {
                self.emit(TokenKind::CommentEnd, 3);
                self.transition_to(LexerState::Content);
            }
            (Some(end), _) => self.emit(TokenKind::CommentCharacters, end),
            (None, _) => self.emit(TokenKind::CommentCharacters, rest.len()),
        }
    }

    fn step_cdata(&mut self) {
        let rest = self.rest();
        match memmem::find(rest, b"]]>") {
            Some(0) => {
                self.emit(TokenKind::CdataEnd, 3);
                self.transition_to(LexerState::Content);
            }
            Some(end) => self.emit(TokenKind::DataCharacters, end),
            None => self.emit(TokenKind::DataCharacters, rest.len()),
        }
    }

    fn step_doctype(&mut self) {
        let Some(b) = self.peek() else {
            return;
        };
        match b {
            b if b.is_ascii_whitespace() => {
                let len = self.run_len(|b| b.is_ascii_whitespace());
                self.emit(TokenKind::Whitespace, len);
            }
            b'>' => {
                self.emit(TokenKind::DoctypeEnd, 1);
                self.transition_to(LexerState::Content);
            }
            b'<' => self.transition_to(LexerState::Content),
            b'"' | b'\'' => {
                self.emit(TokenKind::AttrValueStartDelimiter, 1);
                self.transition_to(LexerState::QuotedValue {
                    quote: b,
                    resume: QuoteReturn::Doctype,
                });
            }
            _ if is_name_start(b) => {
                let len = self.run_len(|b| !is_attribute_name_stop(b));
                let word = &self.rest()[..len];
                let kind = if word.eq_ignore_ascii_case(b"PUBLIC") {
                    TokenKind::DoctypePublic
                } else if word.eq_ignore_ascii_case(b"SYSTEM") {
                    TokenKind::DoctypeSystem
                } else {
                    TokenKind::Name
                };
                self.emit(kind, len);
            }
            _ => {
                let len = self.char_len();
                self.emit(TokenKind::BadCharacter, len);
            }
        }
    }

    fn step_processing_instruction(&mut self, target_pending: bool) {
        if target_pending {
            self.transition_to(LexerState::ProcessingInstruction {
                target_pending: false,
            });
            if self.peek().is_some_and(is_name_start) {
                let len = self.run_len(|b| !is_pi_name_stop(b));
                self.emit(TokenKind::PiTarget, len);
            }
            return;
        }
        let Some(b) = self.peek() else {
            return;
        };
        match b {
            b if b.is_ascii_whitespace() => {
                let len = self.run_len(|b| b.is_ascii_whitespace());
                self.emit(TokenKind::Whitespace, len);
            }
            b'?' if self.peek_at(1) == Some(b'>') => {
                self.emit(TokenKind::PiEnd, 2);
                self.transition_to(LexerState::Content);
            }
            b'>' => {
                self.emit(TokenKind::PiEnd, 1);
                self.transition_to(LexerState::Content);
            }
            b'<' => self.transition_to(LexerState::Content),
            b'=' => {
                self.emit(TokenKind::Eq, 1);
                self.transition_to(LexerState::BeforeAttributeValue {
                    resume: QuoteReturn::ProcessingInstruction,
                });
            }
            b'"' | b'\'' => {
                self.emit(TokenKind::AttrValueStartDelimiter, 1);
                self.transition_to(LexerState::QuotedValue {
                    quote: b,
                    resume: QuoteReturn::ProcessingInstruction,
                });
            }
            _ if is_name_start(b) => {
                let len = self.run_len(|b| !is_pi_name_stop(b));
                self.emit(TokenKind::Name, len);
            }
            _ => {
                let len = self.char_len();
                self.emit(TokenKind::BadCharacter, len);
            }
        }
    }

    fn step_raw_text(&mut self) {
        let close = self.raw_text_close.take().unwrap_or_default();
        let rest = &self.source[self.cursor..];
        let body_len = find_raw_text_close_tag(rest, close.as_bytes()).unwrap_or(rest.len());
        if body_len > 0 {
            self.emit(TokenKind::DataCharacters, body_len);
        }
        self.transition_to(LexerState::Content);
    }
}

fn resume_state(resume: QuoteReturn) -> LexerState {
    match resume {
        QuoteReturn::TagHeader => LexerState::TagHeader,
        QuoteReturn::Doctype => LexerState::Doctype,
        QuoteReturn::ProcessingInstruction => LexerState::ProcessingInstruction {
            target_pending: false,
        },
    }
}

fn is_tag_name_stop(b: u8) -> bool {
    b == b'>' || b == b'/' || b == b'<' || b.is_ascii_whitespace()
}

fn is_attribute_name_stop(b: u8) -> bool {
    is_tag_name_stop(b) || matches!(b, b'=' | b'"' | b'\'' | b'&')
}

fn is_pi_name_stop(b: u8) -> bool {
    is_attribute_name_stop(b) || b == b'?'
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b':' | b'-' | b'.') || !b.is_ascii()
}

const MAX_HEX_DIGITS: usize = 6; // 0x10FFFF
const MAX_DEC_DIGITS: usize = 7; // 1114111
const MAX_ENTITY_NAME: usize = 32;

/// Length of a well-formed `&#...;` reference at the start of `bytes`.
fn scan_char_reference(bytes: &[u8]) -> Option<usize> {
    if !bytes.starts_with(b"&#") {
        return None;
    }
    let (digits_start, is_hex) = match bytes.get(2) {
        Some(b'x') | Some(b'X') => (3, true),
        _ => (2, false),
    };
    let max_digits = if is_hex { MAX_HEX_DIGITS } else { MAX_DEC_DIGITS };
    let mut j = digits_start;
    while j < bytes.len() && j - digits_start <= max_digits {
        let b = bytes[j];
        if b == b';' {
            return (j > digits_start).then_some(j + 1);
        }
        let ok = if is_hex {
            b.is_ascii_hexdigit()
        } else {
            b.is_ascii_digit()
        };
        if !ok {
            return None;
        }
        j += 1;
    }
    None
}

/// Length of a well-formed `&name;` reference at the start of `bytes`.
fn scan_entity_reference(bytes: &[u8]) -> Option<usize> {
    if bytes.len() < 3 || !bytes[1].is_ascii_alphabetic() {
        return None;
    }
    let mut j = 2;
    while j < bytes.len() && j <= MAX_ENTITY_NAME {
        match bytes[j] {
            b';' => return Some(j + 1),
            b if b.is_ascii_alphanumeric() => j += 1,
            _ => return None,
        }
    }
    None
}

/// Offset of `</name` (ASCII case-insensitive) followed by optional ASCII
/// whitespace and `>`.
fn find_raw_text_close_tag(haystack: &str, name: &[u8]) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let len = bytes.len();
    let n = name.len() + 2;
    let mut i = 0;
    while i + n <= len {
        // `<` cannot appear in UTF-8 continuation bytes.
        let rel = memchr::memchr(b'<', &bytes[i..])?;
        i += rel;
        if i + n > len {
            return None;
        }
        if bytes[i + 1] == b'/' && bytes[i + 2..i + n].eq_ignore_ascii_case(name) {
            let mut k = i + n;
            while k < len && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k < len && bytes[k] == b'>' {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}
