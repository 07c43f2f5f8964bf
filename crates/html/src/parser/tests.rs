use super::{HtmlParser, ParserConfig};
use crate::builder::TreeBuilder;
use crate::dialect::{AutoClose, ContentSite, HtmlDialect, MarkupDialect};
use crate::error::ParseErrorCode;
use crate::lexer::{LexerConfig, tokenize};
use crate::snapshot::snapshot;
use crate::token::TokenKind;
use crate::tree::{NodeKind, SyntaxTree};
use crate::{parse_html, parse_with, parse_xhtml};

fn html(source: &str) -> SyntaxTree {
    let tree = parse_html(source).expect("parser must not break builder invariants");
    assert_eq!(tree.text(), source, "tree must be lossless");
    tree
}

/// Snapshot lines below `DOCUMENT`, re-indented to start at column 0.
fn body(tree: &SyntaxTree) -> Vec<String> {
    snapshot(tree)
        .as_lines()
        .iter()
        .skip(2)
        .filter(|line| line.trim_start() != "PROLOG")
        .map(|line| line[4..].to_string())
        .collect()
}

fn codes(tree: &SyntaxTree) -> Vec<ParseErrorCode> {
    tree.diagnostics().into_iter().map(|d| d.error.code).collect()
}

#[test]
fn paragraph_closes_paragraph() {
    let tree = html("<p>a<p>b");
    assert_eq!(body(&tree), ["TAG <p>", "  TEXT \"a\"", "TAG <p>", "  TEXT \"b\""]);
    assert!(tree.diagnostics().is_empty());
}

#[test]
fn unmatched_end_tag_becomes_error_inside_open_tag() {
    let tree = html("<div></span></div>");
    assert_eq!(
        body(&tree),
        [
            "TAG <div>",
            "  ERROR \"Closing tag matches nothing\" at \"</span>\"",
        ]
    );
}

#[test]
fn void_element_has_no_children() {
    let tree = html("<br>");
    let document = tree.root().child_nodes().next().expect("document");
    let br = document
        .child_nodes()
        .find(|n| n.kind() == NodeKind::Tag)
        .expect("br");
    assert_eq!(br.tag_name(), Some("br"));
    assert_eq!(br.child_nodes().count(), 0);
    assert!(!tree.has_errors());
}

#[test]
fn void_element_swallows_explicit_end_tag() {
    let tree = html("<br></br><hr> </hr>");
    assert!(!tree.has_errors(), "{:?}", tree.diagnostics());
    let tags: Vec<_> = tree
        .descendants()
        .filter(|n| n.kind() == NodeKind::Tag)
        .map(|n| n.text())
        .collect();
    assert_eq!(tags, ["<br></br>", "<hr> </hr>"]);
}

#[test]
fn void_element_end_tag_without_gt_is_reported() {
    let tree = html("<br></br");
    assert_eq!(codes(&tree), [ParseErrorCode::ClosingTagNotDone]);
    let br = tree
        .descendants()
        .find(|n| n.kind() == NodeKind::Tag)
        .expect("br");
    assert_eq!(br.text(), "<br></br");
    assert!(br.child_nodes().any(|n| n.kind() == NodeKind::Error));
}

#[test]
fn unclosed_tags_are_reported_at_end_of_input() {
    let tree = html("<div><span>text");
    assert_eq!(
        body(&tree),
        [
            "TAG <div>",
            "  TAG <span>",
            "    TEXT \"text\"",
            "    ERROR \"Element span is not closed\"",
            "  ERROR \"Element div is not closed\"",
        ]
    );
}

#[test]
fn well_formed_document_has_no_diagnostics() {
    let source = "<!DOCTYPE html>\n<html><head><title>T</title></head>\
                  <body><p class=\"x\">Hi &amp; bye</p><img src=a.png></body></html>\n";
    let tree = html(source);
    assert!(tree.diagnostics().is_empty(), "{:?}", tree.diagnostics());
    let doctype = tree
        .descendants()
        .find(|n| n.kind() == NodeKind::Doctype)
        .expect("doctype");
    assert_eq!(doctype.parent().map(|p| p.kind()), Some(NodeKind::Prolog));
    let text = tree
        .descendants()
        .find(|n| n.kind() == NodeKind::Text && n.text().starts_with("Hi"))
        .expect("text");
    assert_eq!(text.decoded_text(), "Hi & bye");
}

#[test]
fn ancestor_decides_when_top_is_unsure() {
    let tree = html("<p><span>x<div>");
    assert_eq!(
        body(&tree),
        [
            "TAG <p>",
            "  TAG <span>",
            "    TEXT \"x\"",
            "    ERROR \"Element span is not closed\"",
            "TAG <div>",
            "  ERROR \"Element div is not closed\"",
        ]
    );
}

#[test]
fn table_cells_and_rows_close_implicitly() {
    let tree = html("<table><tr><td>a<td>b<tr><td>c</table>");
    assert_eq!(
        body(&tree),
        [
            "TAG <table>",
            "  TAG <tr>",
            "    TAG <td>",
            "      TEXT \"a\"",
            "    TAG <td>",
            "      TEXT \"b\"",
            "  TAG <tr>",
            "    TAG <td>",
            "      TEXT \"c\"",
        ]
    );
    assert!(!tree.has_errors());
}

#[test]
fn list_items_close_siblings_but_not_across_lists() {
    let tree = html("<ul><li>a<ul><li>b</ul><li>c</ul>");
    assert_eq!(
        body(&tree),
        [
            "TAG <ul>",
            "  TAG <li>",
            "    TEXT \"a\"",
            "    TAG <ul>",
            "      TAG <li>",
            "        TEXT \"b\"",
            "  TAG <li>",
            "    TEXT \"c\"",
        ]
    );
    assert!(!tree.has_errors());
}

#[test]
fn outer_end_tag_closes_inner_tags_layer_by_layer() {
    let tree = html("<div><span>x</div>");
    assert_eq!(
        body(&tree),
        [
            "TAG <div>",
            "  TAG <span>",
            "    TEXT \"x\"",
            "    ERROR \"Element span is not closed\"",
        ]
    );

    let tree = html("<div><p>x</div>");
    assert!(!tree.has_errors(), "optional end tags close silently");
}

#[test]
fn html_names_match_case_insensitively() {
    let tree = html("<DIV Class=x></div>");
    assert!(!tree.has_errors());
    let div = tree
        .descendants()
        .find(|n| n.kind() == NodeKind::Tag)
        .expect("div");
    assert_eq!(div.tag_name(), Some("DIV"));
    assert_eq!(div.attribute_value("class").as_deref(), Some("x"));
}

#[test]
fn xhtml_is_case_sensitive_and_explicit() {
    let tree = parse_xhtml("<P><br></P>").expect("parse");
    assert_eq!(
        tree.diagnostics()
            .iter()
            .map(|d| d.error.to_string())
            .collect::<Vec<_>>(),
        ["Element br is not closed"]
    );

    let tree = parse_xhtml("<a></A>").expect("parse");
    assert_eq!(
        codes(&tree),
        [
            ParseErrorCode::ClosingTagMatchesNothing,
            ParseErrorCode::ElementNotClosed,
        ]
    );
}

#[test]
fn attributes_expose_decoded_values() {
    let tree = html("<a href=\"x&amp;y\" id=main checked></a>");
    let a = tree
        .descendants()
        .find(|n| n.kind() == NodeKind::Tag)
        .expect("a");
    let names: Vec<_> = a.attributes().filter_map(|attr| attr.name()).collect();
    assert_eq!(names, ["href", "id", "checked"]);
    assert_eq!(a.attribute_value("href").as_deref(), Some("x&y"));
    assert_eq!(a.attribute_value("ID").as_deref(), Some("main"));
    assert_eq!(a.attribute_value("checked").as_deref(), Some(""));
    assert_eq!(a.attribute_value("title"), None);
    assert!(!tree.has_errors());
}

#[test]
fn header_and_value_errors() {
    assert_eq!(
        codes(&html("<a title=\"oops>text")),
        [
            ParseErrorCode::UnclosedAttributeValue,
            ParseErrorCode::TagStartNotClosed,
        ]
    );
    assert_eq!(
        codes(&html("<div <span></span>")),
        [ParseErrorCode::TagStartNotClosed]
    );
    assert_eq!(
        codes(&html("<></>")),
        [
            ParseErrorCode::TagNameExpected,
            ParseErrorCode::ClosingTagNameMissing,
            ParseErrorCode::ElementNotClosed,
        ]
    );
}

#[test]
fn nameless_end_tag_closes_nothing() {
    let tree = html("<div></></div>");
    assert_eq!(
        body(&tree),
        [
            "TAG <div>",
            "  ERROR \"Closing tag name missing\" at \"</>\"",
        ]
    );
}

#[test]
fn stray_tokens_in_end_tag() {
    let tree = html("<div></div foo=>");
    assert_eq!(
        codes(&tree),
        [ParseErrorCode::UnexpectedToken, ParseErrorCode::UnexpectedToken]
    );
    let tree = html("<div></div");
    assert_eq!(codes(&tree), [ParseErrorCode::ClosingTagNotDone]);
}

#[test]
fn unescaped_ampersand_in_content() {
    let tree = html("<p>a & b</p>");
    assert_eq!(
        body(&tree),
        [
            "TAG <p>",
            "  TEXT \"a & b\"",
            "    ERROR \"Unescaped & or nonterminated character/entity reference\" at \"&\"",
        ]
    );
}

#[test]
fn prolog_constructs() {
    let tree = html("<?xml version=\"1.0\"?><!-- c --><!DOCTYPE html><p>x</p>");
    assert!(!tree.has_errors(), "{:?}", tree.diagnostics());
    let prolog: Vec<_> = tree
        .descendants()
        .find(|n| n.kind() == NodeKind::Prolog)
        .expect("prolog")
        .child_nodes()
        .map(|n| n.kind())
        .collect();
    assert_eq!(
        prolog,
        [
            NodeKind::ProcessingInstruction,
            NodeKind::Comment,
            NodeKind::Doctype,
        ]
    );

    assert_eq!(codes(&html("<?xml a?>")), [ParseErrorCode::EqExpected]);
    assert_eq!(
        codes(&html("<?xml")),
        [ParseErrorCode::UnterminatedProcessingInstruction]
    );
    assert_eq!(
        codes(&html("<!DOCTYPE html")),
        [ParseErrorCode::UnexpectedEof]
    );
}

#[test]
fn script_body_stays_text() {
    let tree = html("<script>if (a<b) x();</script>");
    assert_eq!(
        body(&tree),
        ["TAG <script>", "  TEXT \"if (a<b) x();\""]
    );
}

#[test]
fn comments_and_cdata_inside_tags() {
    let tree = html("<div><!-- c --><![CDATA[<x>]]></div>");
    assert_eq!(
        body(&tree),
        [
            "TAG <div>",
            "  COMMENT \"<!-- c -->\"",
            "  CDATA \"<![CDATA[<x>]]>\"",
        ]
    );
    assert!(!html("<!-- open").has_errors());
}

#[test]
fn interpolation_islands_become_nodes() {
    let lexer = LexerConfig {
        interpolation: Some(("{{".to_string(), "}}".to_string())),
        ..LexerConfig::default()
    };
    let source = "<p>a{{ b < c }}d</p>";
    let tree = parse_with(source, &lexer, &ParserConfig::default(), &HtmlDialect).expect("parse");
    assert_eq!(
        body(&tree),
        [
            "TAG <p>",
            "  TEXT \"a\"",
            "  INTERPOLATION \"{{ b < c }}\"",
            "  TEXT \"d\"",
        ]
    );
}

/// Claims data in tag bodies but never consumes it.
struct SilentHook;

impl MarkupDialect for SilentHook {
    fn is_single_tag(&self, name: &str) -> bool {
        HtmlDialect.is_single_tag(name)
    }

    fn is_end_tag_required(&self, name: &str) -> bool {
        HtmlDialect.is_end_tag_required(name)
    }

    fn can_opening_tag_auto_close(&self, tag_to_close: &str, opening_tag: &str) -> AutoClose {
        HtmlDialect.can_opening_tag_auto_close(tag_to_close, opening_tag)
    }

    fn can_closing_tag_auto_close(&self, tag_to_close: &str, closing_tag: &str) -> bool {
        HtmlDialect.can_closing_tag_auto_close(tag_to_close, closing_tag)
    }

    fn custom_content(&self, kind: TokenKind, site: ContentSite) -> bool {
        site == ContentSite::TagBody && kind == TokenKind::DataCharacters
    }

    fn parse_custom_content(&self, _builder: &mut TreeBuilder<'_>, _site: ContentSite) {}
}

#[test]
fn hook_that_consumes_nothing_cannot_stall_the_parser() {
    let source = "<p>ab</p>";
    let mut builder = TreeBuilder::new(source, tokenize(source, &LexerConfig::default()));
    let mut parser = HtmlParser::new(ParserConfig::default(), &SilentHook);
    parser.parse_document(&mut builder);
    assert_eq!(parser.stats().forced_progress, 1);
    let tree = builder.finish().expect("balanced markers");
    assert_eq!(
        body(&tree),
        ["TAG <p>", "  ERROR \"Unexpected token\" at \"ab\""]
    );
}

#[test]
fn stats_count_auto_closes_and_depth() {
    let source = "<ul><li>a<li>b</ul></x>";
    let mut builder = TreeBuilder::new(source, tokenize(source, &LexerConfig::default()));
    let mut parser = HtmlParser::new(ParserConfig::default(), &HtmlDialect);
    parser.parse_document(&mut builder);
    let stats = parser.stats();
    assert_eq!(stats.tags, 3);
    assert_eq!(stats.auto_closed, 2);
    assert_eq!(stats.unmatched_end_tags, 1);
    assert_eq!(stats.max_stack_depth, 2);
    assert!(builder.finish().is_ok());
}

#[test]
fn malformed_inputs_stay_lossless() {
    for source in [
        "",
        "<",
        "</",
        "<a",
        "<a b=",
        "<a b='",
        "&",
        "</p>",
        "<<>>",
        "<a/>text</a>",
        "<div/ / =>",
        "<!-",
        "<![CDATA[",
        "<!doctype",
        "<?",
        "<?xml a=b c ? >",
        "<style>body{}</sty",
        "<table><td><tr></table></td>",
        "<é attr=ü>日本語</é>",
        "a</b>c<d>e</f></d>",
        "<p>\r\n<b>x</i></b>",
    ] {
        let tree = html(source);
        for diagnostic in tree.diagnostics() {
            assert!(diagnostic.span.end <= source.len());
        }
    }
}
