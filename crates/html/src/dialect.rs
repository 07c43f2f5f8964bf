//! Tag semantics per markup dialect.
//!
//! The parser consults a [`MarkupDialect`] for every decision that differs between
//! HTML flavours: void elements, optional end tags, implicit closing, and embedded
//! content islands. Names passed to the predicates are already normalized according
//! to the parser's [`NameCase`](crate::parser::NameCase).

use crate::builder::TreeBuilder;
use crate::token::TokenKind;
use crate::tree::NodeKind;

/// Answer of the opening-tag auto-close predicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AutoClose {
    Yes,
    No,
    /// Ask the next enclosing open tag.
    Unsure,
}

/// Where the parser is when it offers a token to the dialect's custom hooks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentSite {
    TopLevel,
    TagBody,
    TagHeader,
    AttributeValue,
}

pub trait MarkupDialect {
    /// Void tags never have content and need no end tag.
    fn is_single_tag(&self, name: &str) -> bool;

    /// Whether a missing end tag for `name` is reported.
    fn is_end_tag_required(&self, name: &str) -> bool;

    /// Whether opening `opening_tag` implicitly closes the open `tag_to_close`.
    fn can_opening_tag_auto_close(&self, tag_to_close: &str, opening_tag: &str) -> AutoClose;

    /// Whether an end tag for an enclosing element may silently close `tag_to_close`.
    fn can_closing_tag_auto_close(&self, tag_to_close: &str, closing_tag: &str) -> bool;

    /// Whether the custom hook claims the current token at `site`.
    fn custom_content(&self, kind: TokenKind, site: ContentSite) -> bool {
        let _ = site;
        kind == TokenKind::Interpolation
    }

    /// Parse claimed content. The parser forces progress if this consumes nothing.
    fn parse_custom_content(&self, builder: &mut TreeBuilder<'_>, site: ContentSite) {
        let _ = site;
        let island = builder.mark();
        builder.advance();
        builder.done(island, NodeKind::Interpolation);
    }

    /// Extra bound on the top-level loop; the parser always stops at end of input.
    fn should_continue_main_loop(&self, builder: &TreeBuilder<'_>) -> bool {
        let _ = builder;
        true
    }

    /// Extra bound on tag-body parsing, for dialects embedded in a larger document.
    fn should_continue_tag_parsing(&self, builder: &TreeBuilder<'_>) -> bool {
        let _ = builder;
        true
    }
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const OPTIONAL_END_ELEMENTS: &[&str] = &[
    "body", "caption", "colgroup", "dd", "dt", "head", "html", "li", "optgroup", "option", "p",
    "rp", "rt", "tbody", "td", "tfoot", "th", "thead", "tr",
];

/// Elements whose start tag closes an open `p`.
const CLOSES_PARAGRAPH: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "details",
    "div",
    "dl",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hgroup",
    "hr",
    "main",
    "menu",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "ul",
];

const ROW_GROUPS: &[&str] = &["tbody", "tfoot", "thead"];
const CELLS: &[&str] = &["td", "th"];
const TABLE_PARTS: &[&str] = &[
    "caption", "colgroup", "tbody", "td", "tfoot", "th", "thead", "tr",
];

fn one_of(name: &str, set: &[&str]) -> bool {
    set.contains(&name)
}

/// HTML: void elements, optional end tags and the implicit-close rules of the
/// common block/list/table structures. Names are expected in lowercase.
#[derive(Clone, Copy, Debug, Default)]
pub struct HtmlDialect;

impl MarkupDialect for HtmlDialect {
    fn is_single_tag(&self, name: &str) -> bool {
        one_of(name, VOID_ELEMENTS)
    }

    fn is_end_tag_required(&self, name: &str) -> bool {
        !one_of(name, OPTIONAL_END_ELEMENTS)
    }

    fn can_opening_tag_auto_close(&self, tag_to_close: &str, opening_tag: &str) -> AutoClose {
        let yes_if = |closes: bool| if closes { AutoClose::Yes } else { AutoClose::Unsure };
        match tag_to_close {
            "p" => yes_if(one_of(opening_tag, CLOSES_PARAGRAPH)),
            "li" => yes_if(opening_tag == "li"),
            "dt" | "dd" => yes_if(matches!(opening_tag, "dt" | "dd")),
            "option" => yes_if(matches!(opening_tag, "option" | "optgroup")),
            "optgroup" => yes_if(opening_tag == "optgroup"),
            "rt" | "rp" => yes_if(matches!(opening_tag, "rt" | "rp")),
            "head" => yes_if(opening_tag == "body"),
            "caption" | "colgroup" => yes_if(
                matches!(opening_tag, "tr" | "colgroup") || one_of(opening_tag, ROW_GROUPS),
            ),
            "td" | "th" => yes_if(
                one_of(opening_tag, CELLS) || opening_tag == "tr" || one_of(opening_tag, ROW_GROUPS),
            ),
            "tr" if one_of(opening_tag, CELLS) => AutoClose::No,
            "tr" => yes_if(opening_tag == "tr" || one_of(opening_tag, ROW_GROUPS)),
            "tbody" | "thead" | "tfoot" if opening_tag == "tr" || one_of(opening_tag, CELLS) => {
                AutoClose::No
            }
            "tbody" | "thead" | "tfoot" => yes_if(matches!(opening_tag, "tbody" | "tfoot")),
            "table" if one_of(opening_tag, TABLE_PARTS) => AutoClose::No,
            "ul" | "ol" if opening_tag == "li" => AutoClose::No,
            "dl" if matches!(opening_tag, "dt" | "dd") => AutoClose::No,
            _ => AutoClose::Unsure,
        }
    }

    fn can_closing_tag_auto_close(&self, tag_to_close: &str, _closing_tag: &str) -> bool {
        !self.is_end_tag_required(tag_to_close)
    }
}

/// XHTML: every element is explicit. Nothing is void and nothing closes implicitly.
#[derive(Clone, Copy, Debug, Default)]
pub struct XhtmlDialect;

impl MarkupDialect for XhtmlDialect {
    fn is_single_tag(&self, _name: &str) -> bool {
        false
    }

    fn is_end_tag_required(&self, _name: &str) -> bool {
        true
    }

    fn can_opening_tag_auto_close(&self, _tag_to_close: &str, _opening_tag: &str) -> AutoClose {
        AutoClose::No
    }

    fn can_closing_tag_auto_close(&self, _tag_to_close: &str, _closing_tag: &str) -> bool {
        false
    }
}
