use super::TreeBuilder;
use crate::error::{ParseError, ParseErrorCode};
use crate::lexer::{LexerConfig, tokenize};
use crate::span::Span;
use crate::tree::{NodeKind, SyntaxTree};

fn builder(source: &str) -> TreeBuilder<'_> {
    TreeBuilder::new(source, tokenize(source, &LexerConfig::default()))
}

fn outline(tree: &SyntaxTree) -> Vec<(NodeKind, Span)> {
    tree.descendants().map(|n| (n.kind(), n.span())).collect()
}

#[test]
fn nested_markers_become_nested_nodes() {
    let mut b = builder("x<y>");
    let outer = b.mark();
    b.advance();
    let inner = b.mark();
    while !b.eof() {
        b.advance();
    }
    b.done(inner, NodeKind::Tag);
    b.done(outer, NodeKind::Text);
    let tree = b.finish().expect("balanced markers");
    assert_eq!(
        outline(&tree),
        vec![
            (NodeKind::File, Span::new(0, 4)),
            (NodeKind::Text, Span::new(0, 4)),
            (NodeKind::Tag, Span::new(1, 4)),
        ]
    );
    assert_eq!(tree.text(), "x<y>");
}

#[test]
fn completion_points_exclude_trailing_trivia() {
    let mut b = builder("<a  b>");
    let tag = b.mark();
    b.advance();
    let name = b.mark();
    b.advance();
    assert_eq!(b.current(), Some(crate::token::TokenKind::Name));
    b.done(name, NodeKind::Text);
    let attribute = b.mark();
    b.advance();
    b.done(attribute, NodeKind::Attribute);
    b.advance();
    assert!(b.eof());
    b.done(tag, NodeKind::Tag);

    let tree = b.finish().expect("balanced markers");
    let tag = tree.root().child_nodes().next().expect("tag");
    let texts: Vec<_> = tag.child_nodes().map(|n| (n.kind(), n.text())).collect();
    assert_eq!(
        texts,
        vec![(NodeKind::Text, "a"), (NodeKind::Attribute, "b")]
    );
    assert_eq!(tag.span(), Span::new(0, 6));
    assert_eq!(tree.text(), "<a  b>");
}

#[test]
fn done_before_ends_a_marker_where_a_later_one_starts() {
    let mut b = builder("x<y>");
    let text = b.mark();
    b.advance();
    let tag = b.mark();
    while !b.eof() {
        b.advance();
    }
    b.done_before(text, NodeKind::Text, &tag);
    b.done(tag, NodeKind::Tag);
    assert_eq!(b.stats().done_before, 1);

    let tree = b.finish().expect("balanced markers");
    let children: Vec<_> = tree
        .root()
        .child_nodes()
        .map(|n| (n.kind(), n.text()))
        .collect();
    assert_eq!(
        children,
        vec![(NodeKind::Text, "x"), (NodeKind::Tag, "<y>")]
    );
}

#[test]
fn precede_places_error_at_the_end_of_the_closed_node() {
    let mut b = builder("x<y>");
    let text = b.mark();
    b.advance();
    let tag = b.mark();
    while !b.eof() {
        b.advance();
    }
    let error = b.precede(&tag);
    b.error_before(error, ParseError::element_not_closed("x"), &tag);
    b.done_before(text, NodeKind::Text, &tag);
    b.done(tag, NodeKind::Tag);

    let tree = b.finish().expect("balanced markers");
    assert_eq!(
        outline(&tree),
        vec![
            (NodeKind::File, Span::new(0, 4)),
            (NodeKind::Text, Span::new(0, 1)),
            (NodeKind::Error, Span::new(1, 1)),
            (NodeKind::Tag, Span::new(1, 4)),
        ]
    );
    let diagnostics = tree.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].error.to_string(), "Element x is not closed");
}

#[test]
fn rollback_discards_speculative_nodes_and_rewinds() {
    let mut b = builder("<a></b>");
    let tag = b.mark();
    for _ in 0..3 {
        b.advance();
    }
    let footer = b.mark();
    b.advance();
    let stray = b.mark();
    b.advance();
    b.error(stray, ParseErrorCode::UnexpectedToken);
    b.rollback_to(footer);
    assert_eq!(b.token_index(), 3);
    assert_eq!(b.current_text(), "</");
    while !b.eof() {
        b.advance();
    }
    b.done(tag, NodeKind::Tag);
    assert_eq!(b.stats().rollbacks, 1);

    let tree = b.finish().expect("balanced markers");
    assert_eq!(tree.node_count(), 2);
    assert!(!tree.has_errors());
    assert_eq!(tree.text(), "<a></b>");
}

#[test]
fn dropped_marker_leaves_tokens_in_place() {
    let mut b = builder("a b");
    let marker = b.mark();
    assert!(b.is_open(&marker));
    b.advance();
    b.drop_marker(marker);
    let tree = b.finish().expect("nothing open");
    assert_eq!(tree.node_count(), 1);
    assert_eq!(tree.root().child_tokens().count(), 3);
}

#[test]
fn error_here_at_end_of_input_sits_before_trivia() {
    let mut b = builder("<a ");
    let tag = b.mark();
    b.advance();
    b.advance();
    assert!(b.eof());
    b.error_here(ParseErrorCode::TagStartNotClosed);
    b.done(tag, NodeKind::Tag);

    let tree = b.finish().expect("balanced markers");
    let diagnostics = tree.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].span, Span::new(2, 2));
    let tag = tree.root().child_nodes().next().expect("tag");
    assert_eq!(tag.span(), Span::new(0, 2));
    assert_eq!(tree.text(), "<a ");
}

#[test]
fn completing_a_rolled_back_marker_is_reported() {
    let mut b = builder("ab");
    let outer = b.mark();
    let inner = b.mark();
    b.rollback_to(outer);
    b.done(inner, NodeKind::Text);
    let err = b.finish().expect_err("misuse must surface");
    assert_eq!(err.detail, "completion of a closed marker");
}

#[test]
fn done_before_a_marker_that_starts_earlier_is_reported() {
    let mut b = builder("ab");
    let first = b.mark();
    let second = b.mark();
    b.done_before(second, NodeKind::Text, &first);
    b.done(first, NodeKind::Text);
    let err = b.finish().expect_err("misuse must surface");
    assert_eq!(err.detail, "done_before against a marker that starts first");
}

#[test]
fn open_marker_fails_finish() {
    let mut b = builder("ab");
    let marker = b.mark();
    drop(marker);
    let err = b.finish().expect_err("open marker");
    assert_eq!(err.detail, "marker left open");
    assert!(err.to_string().starts_with("engine invariant violated"));
}
