//! Deterministic syntax tree dump for golden tests, fixtures and the CLI.
//! Not a stable interchange format.
//!
//! One node per line, indented two spaces per level:
//! - `TAG <name>` with the name as written; `ATTRIBUTE name`.
//! - `ERROR "message"`, followed by the covered text when not zero-width.
//! - Leaf-like nodes (`TEXT`, `COMMENT`, `REFERENCE`, ...) carry their escaped text.
//! - Structural nodes (`FILE`, `DOCUMENT`, `PROLOG`) carry nothing.

use crate::token::Token;
use crate::tree::{ChildRef, NodeKind, NodeRef, SyntaxTree};
use std::fmt::{self, Write};

#[derive(Clone, Copy, Debug, Default)]
pub struct SnapshotOptions {
    /// Append `@start..end` byte spans.
    pub spans: bool,
    /// Emit token leaves (including trivia) as their own lines.
    pub tokens: bool,
}

#[derive(Debug)]
pub struct TreeSnapshot {
    lines: Vec<String>,
}

enum Entry<'t> {
    Node(NodeRef<'t>),
    Token(Token),
}

impl TreeSnapshot {
    pub fn new(tree: &SyntaxTree, options: SnapshotOptions) -> Self {
        const INDENT_STEP: usize = 2;
        let mut lines = Vec::with_capacity(tree.node_count());
        let mut stack = vec![(Entry::Node(tree.root()), 0usize)];
        while let Some((entry, depth)) = stack.pop() {
            let mut line = " ".repeat(depth * INDENT_STEP);
            match entry {
                Entry::Node(node) => {
                    write_node_line(&mut line, node, options);
                    let children: Vec<_> = node.children().collect();
                    for child in children.into_iter().rev() {
                        match child {
                            ChildRef::Node(child) => stack.push((Entry::Node(child), depth + 1)),
                            ChildRef::Token(token) if options.tokens => {
                                stack.push((Entry::Token(token), depth + 1));
                            }
                            ChildRef::Token(_) => {}
                        }
                    }
                }
                Entry::Token(token) => {
                    let _ = write!(line, "{:?} \"", token.kind);
                    write_escaped(&mut line, token.text(tree.source()));
                    line.push('"');
                    if options.spans {
                        let _ = write!(line, " @{}..{}", token.span.start, token.span.end);
                    }
                }
            }
            lines.push(line);
        }
        Self { lines }
    }

    pub fn as_lines(&self) -> &[String] {
        &self.lines
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

impl fmt::Display for TreeSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.lines.iter().enumerate() {
            if i != 0 {
                f.write_str("\n")?;
            }
            f.write_str(line)?;
        }
        Ok(())
    }
}

/// Snapshot with default options.
pub fn snapshot(tree: &SyntaxTree) -> TreeSnapshot {
    TreeSnapshot::new(tree, SnapshotOptions::default())
}

fn write_node_line(out: &mut String, node: NodeRef<'_>, options: SnapshotOptions) {
    out.push_str(node.kind().as_str());
    match node.kind() {
        NodeKind::File | NodeKind::Document | NodeKind::Prolog => {}
        NodeKind::Tag => {
            out.push_str(" <");
            write_escaped(out, node.tag_name().unwrap_or_default());
            out.push('>');
        }
        NodeKind::Attribute => {
            out.push(' ');
            write_escaped(out, node.name().unwrap_or_default());
        }
        NodeKind::Error => {
            out.push_str(" \"");
            if let Some(error) = node.error() {
                write_escaped(out, &error.to_string());
            }
            out.push('"');
            if !node.span().is_empty() {
                out.push_str(" at \"");
                write_escaped(out, node.text());
                out.push('"');
            }
        }
        NodeKind::AttributeValue
        | NodeKind::Text
        | NodeKind::Comment
        | NodeKind::ProcessingInstruction
        | NodeKind::Doctype
        | NodeKind::Cdata
        | NodeKind::Reference
        | NodeKind::Interpolation => {
            out.push_str(" \"");
            write_escaped(out, node.text());
            out.push('"');
        }
    }
    if options.spans {
        let span = node.span();
        let _ = write!(out, " @{}..{}", span.start, span.end);
    }
}

fn write_escaped(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ if ch.is_ascii_control() => {
                let _ = write!(out, "\\u{{{:X}}}", ch as u32);
            }
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SnapshotOptions, TreeSnapshot, snapshot};
    use crate::parse_html;

    #[test]
    fn renders_nested_tags_and_text() {
        let tree = parse_html("<div class=\"a\">hi<br></div>").expect("parse");
        assert_eq!(
            snapshot(&tree).as_lines(),
            [
                "FILE",
                "  DOCUMENT",
                "    PROLOG",
                "    TAG <div>",
                "      ATTRIBUTE class",
                "        ATTRIBUTE_VALUE \"\\\"a\\\"\"",
                "      TEXT \"hi\"",
                "      TAG <br>",
            ]
        );
    }

    #[test]
    fn renders_errors_with_covered_text() {
        let tree = parse_html("</p>").expect("parse");
        assert_eq!(
            snapshot(&tree).render(),
            "FILE\n  DOCUMENT\n    PROLOG\n    ERROR \"Closing tag matches nothing\" at \"</p>\""
        );
    }

    #[test]
    fn tokens_and_spans_on_request() {
        let tree = parse_html("<b >x</b>").expect("parse");
        let options = SnapshotOptions {
            spans: true,
            tokens: true,
        };
        let lines = TreeSnapshot::new(&tree, options).as_lines().to_vec();
        assert!(lines.contains(&"    TAG <b> @0..9".to_string()), "{lines:#?}");
        assert!(lines.contains(&"      Whitespace \" \" @2..3".to_string()), "{lines:#?}");
        assert!(lines.contains(&"        DataCharacters \"x\" @4..5".to_string()), "{lines:#?}");
    }
}
