//! Lexer state machine definitions.

/// Where a quoted value returns once its closing delimiter is seen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum QuoteReturn {
    TagHeader,
    Doctype,
    ProcessingInstruction,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LexerState {
    Content,
    TagHeader,
    /// After `=` in a tag header or PI.
    BeforeAttributeValue {
        resume: QuoteReturn,
    },
    QuotedValue {
        quote: u8,
        resume: QuoteReturn,
    },
    EndTag,
    Comment {
        /// No comment body consumed yet; a conditional `[if ...]>` may follow.
        fresh: bool,
    },
    Cdata,
    Doctype,
    ProcessingInstruction {
        target_pending: bool,
    },
    /// Body of a raw-text element such as `script`.
    RawText,
}
