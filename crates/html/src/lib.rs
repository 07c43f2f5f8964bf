//! Error-tolerant HTML/XHTML parsing into a lossless syntax tree.
//!
//! The pipeline is `lexer` (lossless token stream) -> `parser` (stack-based tag
//! parser driving the marker `builder`) -> `tree`. Malformed markup is never an
//! error at this API: it is recorded as diagnostics on `Error` nodes. The `Err`
//! path is reserved for engine invariant violations.

pub mod builder;
pub mod dialect;
pub mod entities;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod perf_fixtures;
#[cfg(any(test, feature = "tree-snapshot"))]
pub mod snapshot;
pub mod span;
pub mod token;
pub mod tree;

pub use crate::builder::{Marker, TreeBuilder};
pub use crate::dialect::{AutoClose, ContentSite, HtmlDialect, MarkupDialect, XhtmlDialect};
pub use crate::error::{Diagnostic, EngineInvariantError, ParseError, ParseErrorCode};
pub use crate::lexer::{LexerConfig, tokenize};
pub use crate::parser::{HtmlParser, NameCase, ParserConfig, ParserStats};
pub use crate::span::Span;
pub use crate::token::{Token, TokenKind};
pub use crate::tree::{ChildRef, NodeId, NodeKind, NodeRef, SyntaxTree, TreeStats};

/// Parse `source` as HTML with default configuration.
pub fn parse_html(source: &str) -> Result<SyntaxTree, EngineInvariantError> {
    parse_with(
        source,
        &LexerConfig::default(),
        &ParserConfig::default(),
        &HtmlDialect,
    )
}

/// Parse `source` as XHTML: case-sensitive names, every element explicit.
pub fn parse_xhtml(source: &str) -> Result<SyntaxTree, EngineInvariantError> {
    let lexer = LexerConfig {
        raw_text_elements: Vec::new(),
        ..LexerConfig::default()
    };
    parse_with(
        source,
        &lexer,
        &ParserConfig::case_sensitive(),
        &XhtmlDialect,
    )
}

pub fn parse_with(
    source: &str,
    lexer: &LexerConfig,
    config: &ParserConfig,
    dialect: &dyn MarkupDialect,
) -> Result<SyntaxTree, EngineInvariantError> {
    let tokens = tokenize(source, lexer);
    let mut builder = TreeBuilder::new(source, tokens);
    let mut parser = HtmlParser::new(*config, dialect);
    parser.parse_document(&mut builder);
    let tree = builder.finish()?;
    if log::log_enabled!(target: "html.parser", log::Level::Debug) {
        let stats = parser.stats();
        log::debug!(
            target: "html.parser",
            "parsed {} bytes: {} tokens, {} nodes, {} diagnostics, max stack depth {}",
            source.len(),
            tree.tokens().len(),
            tree.node_count(),
            tree.stats().errors,
            stats.max_stack_depth
        );
    }
    Ok(tree)
}
