//! Materialized syntax tree.
//!
//! Nodes live in an arena addressed by [`NodeId`]; leaves are indices into the
//! token stream, so the tree is lossless: concatenating the leaves in order
//! reproduces the parsed source byte for byte.

use crate::entities::{decode_entities, decode_reference};
use crate::error::{Diagnostic, ParseError};
use crate::span::Span;
use crate::token::{Token, TokenKind};
use std::borrow::Cow;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Root wrapping every token of the input.
    File,
    Document,
    Prolog,
    Doctype,
    Tag,
    Attribute,
    AttributeValue,
    Text,
    Comment,
    ProcessingInstruction,
    Cdata,
    /// Entity or character reference.
    Reference,
    /// Diagnostic; may be zero-width.
    Error,
    /// Embedded-language island claimed by a dialect hook.
    Interpolation,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::File => "FILE",
            NodeKind::Document => "DOCUMENT",
            NodeKind::Prolog => "PROLOG",
            NodeKind::Doctype => "DOCTYPE",
            NodeKind::Tag => "TAG",
            NodeKind::Attribute => "ATTRIBUTE",
            NodeKind::AttributeValue => "ATTRIBUTE_VALUE",
            NodeKind::Text => "TEXT",
            NodeKind::Comment => "COMMENT",
            NodeKind::ProcessingInstruction => "PI",
            NodeKind::Cdata => "CDATA",
            NodeKind::Reference => "REFERENCE",
            NodeKind::Error => "ERROR",
            NodeKind::Interpolation => "INTERPOLATION",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Child {
    Node(NodeId),
    /// Index into the token stream.
    Token(usize),
}

#[derive(Clone, Debug)]
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) span: Span,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<Child>,
    pub(crate) error: Option<ParseError>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub nodes: usize,
    pub tokens: usize,
    pub errors: usize,
    /// Deepest nesting of nodes below the root.
    pub max_depth: usize,
}

#[derive(Clone, Debug)]
pub struct SyntaxTree {
    source: String,
    tokens: Vec<Token>,
    nodes: Vec<NodeData>,
}

impl SyntaxTree {
    pub(crate) fn from_parts(source: String, tokens: Vec<Token>, nodes: Vec<NodeData>) -> Self {
        debug_assert!(!nodes.is_empty(), "tree always has a root");
        Self {
            source,
            tokens,
            nodes,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn root(&self) -> NodeRef<'_> {
        self.node(NodeId(0))
    }

    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        debug_assert!(id.index() < self.nodes.len(), "node id out of range");
        NodeRef { tree: self, id }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All nodes in pre-order, root first.
    pub fn descendants(&self) -> Descendants<'_> {
        self.root().descendants()
    }

    /// Source reconstructed from the tree's leaves.
    pub fn text(&self) -> String {
        let mut out = String::with_capacity(self.source.len());
        for token in self.root().leaf_tokens() {
            out.push_str(token.text(&self.source));
        }
        out
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.descendants()
            .filter_map(|node| {
                node.error().map(|error| Diagnostic {
                    error: error.clone(),
                    span: node.span(),
                })
            })
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        self.nodes.iter().any(|n| n.error.is_some())
    }

    pub fn stats(&self) -> TreeStats {
        let mut max_depth = 0;
        let mut stack = vec![(NodeId(0), 0usize)];
        while let Some((id, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            for child in &self.nodes[id.index()].children {
                if let Child::Node(child) = child {
                    stack.push((*child, depth + 1));
                }
            }
        }
        TreeStats {
            nodes: self.nodes.len(),
            tokens: self.tokens.len(),
            errors: self.nodes.iter().filter(|n| n.error.is_some()).count(),
            max_depth,
        }
    }

    /// 1-based line and column (in chars) of a byte offset.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.source.len());
        let before = &self.source[..offset];
        let line = memchr::memchr_iter(b'\n', before.as_bytes()).count() + 1;
        let line_start = memchr::memrchr(b'\n', before.as_bytes()).map_or(0, |i| i + 1);
        (line, before[line_start..].chars().count() + 1)
    }
}

/// A child of a node: either a nested node or a token leaf.
#[derive(Clone, Copy, Debug)]
pub enum ChildRef<'t> {
    Node(NodeRef<'t>),
    Token(Token),
}

#[derive(Clone, Copy)]
pub struct NodeRef<'t> {
    tree: &'t SyntaxTree,
    id: NodeId,
}

impl std::fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{:?}", self.kind().as_str(), self.span())
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl<'t> NodeRef<'t> {
    fn data(self) -> &'t NodeData {
        &self.tree.nodes[self.id.index()]
    }

    pub fn id(self) -> NodeId {
        self.id
    }

    pub fn kind(self) -> NodeKind {
        self.data().kind
    }

    pub fn span(self) -> Span {
        self.data().span
    }

    /// Source text covered by the node.
    pub fn text(self) -> &'t str {
        self.span().slice(&self.tree.source)
    }

    pub fn error(self) -> Option<&'t ParseError> {
        self.data().error.as_ref()
    }

    pub fn parent(self) -> Option<NodeRef<'t>> {
        self.data().parent.map(|id| self.tree.node(id))
    }

    pub fn children(self) -> impl Iterator<Item = ChildRef<'t>> + 't {
        let tree = self.tree;
        self.data().children.iter().map(move |child| match *child {
            Child::Node(id) => ChildRef::Node(tree.node(id)),
            Child::Token(index) => ChildRef::Token(tree.tokens[index]),
        })
    }

    pub fn child_nodes(self) -> impl Iterator<Item = NodeRef<'t>> + 't {
        self.children().filter_map(|child| match child {
            ChildRef::Node(node) => Some(node),
            ChildRef::Token(_) => None,
        })
    }

    /// Direct token children.
    pub fn child_tokens(self) -> impl Iterator<Item = Token> + 't {
        self.children().filter_map(|child| match child {
            ChildRef::Token(token) => Some(token),
            ChildRef::Node(_) => None,
        })
    }

    pub fn descendants(self) -> Descendants<'t> {
        Descendants {
            tree: self.tree,
            stack: vec![self.id],
        }
    }

    /// Every token under this node, in source order.
    pub fn leaf_tokens(self) -> LeafTokens<'t> {
        LeafTokens {
            tree: self.tree,
            stack: vec![(self.id, 0)],
        }
    }

    /// Name of a tag, attribute or processing instruction as written.
    pub fn name(self) -> Option<&'t str> {
        let source = &self.tree.source;
        self.child_tokens()
            .find(|t| matches!(t.kind, TokenKind::Name | TokenKind::PiTarget))
            .map(|t| t.text(source))
    }

    /// Tag name as written, for `Tag` nodes.
    pub fn tag_name(self) -> Option<&'t str> {
        (self.kind() == NodeKind::Tag)
            .then(|| self.name())
            .flatten()
    }

    pub fn attributes(self) -> impl Iterator<Item = NodeRef<'t>> + 't {
        self.child_nodes()
            .filter(|n| n.kind() == NodeKind::Attribute)
    }

    /// Decoded value of the first attribute named `name` (ASCII case-insensitive).
    ///
    /// `Some("")` for an attribute written without a value.
    pub fn attribute_value(self, name: &str) -> Option<Cow<'t, str>> {
        let attribute = self
            .attributes()
            .find(|a| a.name().is_some_and(|n| n.eq_ignore_ascii_case(name)))?;
        Some(
            attribute
                .child_nodes()
                .find(|n| n.kind() == NodeKind::AttributeValue)
                .map_or(Cow::Borrowed(""), |value| value.decoded_text()),
        )
    }

    /// Node text with references decoded; attribute values lose their quotes.
    pub fn decoded_text(self) -> Cow<'t, str> {
        match self.kind() {
            NodeKind::Reference => {
                let text = self.text();
                match decode_reference(text) {
                    Some(ch) => Cow::Owned(ch.to_string()),
                    None => Cow::Borrowed(text),
                }
            }
            NodeKind::AttributeValue => {
                let mut span = self.span();
                let mut leaves = self.leaf_tokens().peekable();
                if let Some(first) = leaves.peek()
                    && first.kind == TokenKind::AttrValueStartDelimiter
                {
                    span.start = first.span.end;
                }
                if let Some(last) = leaves.last()
                    && last.kind == TokenKind::AttrValueEndDelimiter
                    && last.span.start >= span.start
                {
                    span.end = last.span.start;
                }
                decode_entities(span.slice(&self.tree.source))
            }
            _ => decode_entities(self.text()),
        }
    }
}

/// Pre-order node iterator.
pub struct Descendants<'t> {
    tree: &'t SyntaxTree,
    stack: Vec<NodeId>,
}

impl<'t> Iterator for Descendants<'t> {
    type Item = NodeRef<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let data = &self.tree.nodes[id.index()];
        // Reverse so children come off the stack in source order.
        for child in data.children.iter().rev() {
            if let Child::Node(child) = child {
                self.stack.push(*child);
            }
        }
        Some(self.tree.node(id))
    }
}

/// Token leaves under a node, in source order.
pub struct LeafTokens<'t> {
    tree: &'t SyntaxTree,
    /// (node, next child position)
    stack: Vec<(NodeId, usize)>,
}

impl Iterator for LeafTokens<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (id, pos) = self.stack.last_mut()?;
            let children = &self.tree.nodes[id.index()].children;
            let Some(child) = children.get(*pos).copied() else {
                self.stack.pop();
                continue;
            };
            *pos += 1;
            match child {
                Child::Token(index) => return Some(self.tree.tokens[index]),
                Child::Node(child) => self.stack.push((child, 0)),
            }
        }
    }
}
