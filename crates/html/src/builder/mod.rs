//! Marker-based tree builder.
//!
//! The builder owns the token cursor and an append-only production log of
//! marker start/done events. Nodes are only materialized in [`TreeBuilder::finish`],
//! which lets the parser complete markers out of order (`done_before`), wrap
//! existing markers (`precede`) and discard speculative work (`rollback_to`).
//!
//! Invariants:
//! - The cursor never rests on trivia; `advance` skips it.
//! - Markers start at the cursor, so they never include leading trivia. Completion
//!   points are backed over trailing trivia.
//! - Production positions (token indices) are non-decreasing in log order.
//!
//! Misuse (completing a marker twice, completing a rolled-back marker, `done_before`
//! against a marker that starts later) does not panic: the first violation is
//! recorded and `finish` reports it as an [`EngineInvariantError`].

use crate::error::{EngineInvariantError, ParseError};
use crate::span::Span;
use crate::token::{Token, TokenKind};
use crate::tree::{Child, NodeData, NodeId, NodeKind, SyntaxTree};

#[cfg(test)]
mod tests;

/// Handle to a node start recorded in the builder.
///
/// Markers are consumed by exactly one of `done`, `done_before`, `error`,
/// `error_before`, `drop_marker` or `rollback_to`.
#[must_use = "markers must be completed, dropped or rolled back"]
#[derive(Debug, PartialEq, Eq)]
pub struct Marker {
    id: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MarkerStatus {
    Open,
    Done,
    Dropped,
    RolledBack,
}

#[derive(Clone, Debug)]
struct MarkerRecord {
    /// Token index of the first token covered.
    start: usize,
    kind: Option<NodeKind>,
    error: Option<ParseError>,
    status: MarkerStatus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Event {
    Start,
    Done,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Production {
    event: Event,
    marker: u32,
    /// Token index the event sits before.
    at: usize,
}

/// Builder instrumentation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuilderStats {
    pub markers: u64,
    pub rollbacks: u64,
    pub done_before: u64,
    pub precedes: u64,
}

pub struct TreeBuilder<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    cursor: usize,
    markers: Vec<MarkerRecord>,
    productions: Vec<Production>,
    violation: Option<EngineInvariantError>,
    stats: BuilderStats,
}

impl<'s> TreeBuilder<'s> {
    pub fn new(source: &'s str, tokens: Vec<Token>) -> Self {
        debug_assert_eq!(
            tokens.last().map_or(0, |t| t.span.end),
            source.len(),
            "token stream must cover the source"
        );
        let mut builder = Self {
            source,
            productions: Vec::with_capacity(tokens.len()),
            tokens,
            cursor: 0,
            markers: Vec::new(),
            violation: None,
            stats: BuilderStats::default(),
        };
        builder.skip_trivia();
        builder
    }

    pub fn source(&self) -> &'s str {
        self.source
    }

    pub fn stats(&self) -> BuilderStats {
        self.stats
    }

    // ---- token cursor ----

    /// Kind of the current significant token, `None` at end of input.
    pub fn current(&self) -> Option<TokenKind> {
        self.tokens.get(self.cursor).map(|t| t.kind)
    }

    /// Source text of the current token (empty at end of input).
    pub fn current_text(&self) -> &'s str {
        let source = self.source;
        self.tokens
            .get(self.cursor)
            .map_or("", |t| t.span.slice(source))
    }

    pub fn current_span(&self) -> Span {
        self.tokens
            .get(self.cursor)
            .map_or(Span::empty(self.source.len()), |t| t.span)
    }

    pub fn eof(&self) -> bool {
        self.cursor >= self.tokens.len()
    }

    /// Index of the current token in the stream.
    pub fn token_index(&self) -> usize {
        self.cursor
    }

    pub fn advance(&mut self) {
        if self.eof() {
            return;
        }
        #[cfg(any(test, feature = "debug-stats"))]
        log::trace!(
            target: "html.builder",
            "advance past {:?} @{}",
            self.tokens[self.cursor].kind,
            self.cursor
        );
        self.cursor += 1;
        self.skip_trivia();
    }

    fn skip_trivia(&mut self) {
        while self
            .tokens
            .get(self.cursor)
            .is_some_and(|t| t.kind.is_trivia())
        {
            self.cursor += 1;
        }
    }

    // ---- markers ----

    pub fn mark(&mut self) -> Marker {
        let id = self.new_marker(self.cursor);
        self.productions.push(Production {
            event: Event::Start,
            marker: id,
            at: self.cursor,
        });
        Marker { id }
    }

    fn new_marker(&mut self, start: usize) -> u32 {
        let id = self.markers.len() as u32;
        self.markers.push(MarkerRecord {
            start,
            kind: None,
            error: None,
            status: MarkerStatus::Open,
        });
        self.stats.markers = self.stats.markers.saturating_add(1);
        id
    }

    /// Whether `marker` is still awaiting completion.
    pub fn is_open(&self, marker: &Marker) -> bool {
        self.markers
            .get(marker.id as usize)
            .is_some_and(|m| m.status == MarkerStatus::Open)
    }

    /// Complete `marker` as a node of `kind` ending at the cursor.
    pub fn done(&mut self, marker: Marker, kind: NodeKind) {
        self.complete(marker, kind, None);
    }

    /// Complete `marker` as an error node ending at the cursor.
    pub fn error(&mut self, marker: Marker, error: impl Into<ParseError>) {
        self.complete(marker, NodeKind::Error, Some(error.into()));
    }

    /// Complete `marker` so that it ends right before `before` starts.
    pub fn done_before(&mut self, marker: Marker, kind: NodeKind, before: &Marker) {
        self.complete_before(marker, kind, None, before);
    }

    pub fn error_before(&mut self, marker: Marker, error: impl Into<ParseError>, before: &Marker) {
        self.complete_before(marker, NodeKind::Error, Some(error.into()), before);
    }

    /// Zero-width error node at the current position.
    pub fn error_here(&mut self, error: impl Into<ParseError>) {
        let at = self.back_over_trivia(self.cursor);
        let id = self.new_marker(at);
        self.productions.push(Production {
            event: Event::Start,
            marker: id,
            at,
        });
        self.complete(Marker { id }, NodeKind::Error, Some(error.into()));
    }

    /// New marker starting where `marker` starts, enclosing it.
    pub fn precede(&mut self, marker: &Marker) -> Marker {
        let Some(index) = self.start_index(marker.id) else {
            self.violate("precede on a marker without a start");
            return self.mark();
        };
        let at = self.productions[index].at;
        let id = self.new_marker(at);
        self.productions.insert(
            index,
            Production {
                event: Event::Start,
                marker: id,
                at,
            },
        );
        self.stats.precedes = self.stats.precedes.saturating_add(1);
        Marker { id }
    }

    /// Forget `marker` without creating a node; its contents stay in place.
    pub fn drop_marker(&mut self, marker: Marker) {
        if !self.ensure_open(&marker, "drop of a completed marker") {
            return;
        }
        match self.start_index(marker.id) {
            Some(index) => {
                self.productions.remove(index);
                self.markers[marker.id as usize].status = MarkerStatus::Dropped;
            }
            None => self.violate("drop of a marker without a start"),
        }
    }

    /// Discard everything produced since `marker` and rewind the cursor to it.
    pub fn rollback_to(&mut self, marker: Marker) {
        if !self.ensure_open(&marker, "rollback of a completed marker") {
            return;
        }
        match self.start_index(marker.id) {
            Some(index) => {
                for production in self.productions.drain(index..) {
                    self.markers[production.marker as usize].status = MarkerStatus::RolledBack;
                }
                let record = &mut self.markers[marker.id as usize];
                record.status = MarkerStatus::RolledBack;
                self.cursor = record.start;
                self.stats.rollbacks = self.stats.rollbacks.saturating_add(1);
                #[cfg(any(test, feature = "debug-stats"))]
                log::trace!(target: "html.builder", "rollback to token {}", self.cursor);
            }
            None => self.violate("rollback of a marker without a start"),
        }
    }

    fn complete(&mut self, marker: Marker, kind: NodeKind, error: Option<ParseError>) {
        if !self.ensure_open(&marker, "completion of a closed marker") {
            return;
        }
        let at = self.back_over_trivia(self.cursor);
        self.finish_record(marker.id, kind, error);
        self.productions.push(Production {
            event: Event::Done,
            marker: marker.id,
            at,
        });
    }

    fn complete_before(
        &mut self,
        marker: Marker,
        kind: NodeKind,
        error: Option<ParseError>,
        before: &Marker,
    ) {
        if !self.ensure_open(&marker, "completion of a closed marker") {
            return;
        }
        let Some(index) = self.start_index(before.id) else {
            self.violate("done_before against a marker without a start");
            return;
        };
        // Searched backwards: the marker usually starts just before `before`.
        let starts_first = self.productions[..index]
            .iter()
            .rposition(|p| p.event == Event::Start && p.marker == marker.id)
            .is_some();
        if !starts_first {
            self.violate("done_before against a marker that starts first");
            return;
        }
        let floor = self.productions[index - 1].at;
        let mut at = self.productions[index].at;
        while at > floor && self.tokens[at - 1].kind.is_trivia() {
            at -= 1;
        }
        self.finish_record(marker.id, kind, error);
        self.productions.insert(
            index,
            Production {
                event: Event::Done,
                marker: marker.id,
                at,
            },
        );
        self.stats.done_before = self.stats.done_before.saturating_add(1);
    }

    fn finish_record(&mut self, id: u32, kind: NodeKind, error: Option<ParseError>) {
        #[cfg(any(test, feature = "debug-stats"))]
        log::trace!(target: "html.builder", "done {kind:?} (marker {id})");
        let record = &mut self.markers[id as usize];
        record.kind = Some(kind);
        record.error = error;
        record.status = MarkerStatus::Done;
    }

    /// `at` moved back over trivia, but never before the last recorded event.
    fn back_over_trivia(&self, mut at: usize) -> usize {
        let floor = self.productions.last().map_or(0, |p| p.at);
        while at > floor && self.tokens[at - 1].kind.is_trivia() {
            at -= 1;
        }
        at
    }

    fn start_index(&self, id: u32) -> Option<usize> {
        self.productions
            .iter()
            .rposition(|p| p.event == Event::Start && p.marker == id)
    }

    fn ensure_open(&mut self, marker: &Marker, detail: &'static str) -> bool {
        if self.is_open(marker) {
            true
        } else {
            self.violate(detail);
            false
        }
    }

    fn violate(&mut self, detail: &'static str) {
        log::error!(target: "html.builder", "engine invariant violated: {detail}");
        if self.violation.is_none() {
            self.violation = Some(EngineInvariantError::new(detail));
        }
    }

    /// Materialize the syntax tree under a `File` root.
    pub fn finish(self) -> Result<SyntaxTree, EngineInvariantError> {
        if let Some(violation) = self.violation {
            return Err(violation);
        }
        let source_len = self.source.len();
        let tokens = self.tokens;
        let offset_of = |at: usize| tokens.get(at).map_or(source_len, |t| t.span.start);

        let mut nodes = vec![NodeData {
            kind: NodeKind::File,
            span: Span::new(0, source_len),
            parent: None,
            children: Vec::new(),
            error: None,
        }];
        let mut node_of_marker: Vec<Option<NodeId>> = vec![None; self.markers.len()];
        let mut open = vec![NodeId(0)];
        let mut next_token = 0;

        for production in &self.productions {
            if production.at < next_token {
                return Err(EngineInvariantError::new("production log out of order"));
            }
            let top = open.last().copied().unwrap_or(NodeId(0));
            while next_token < production.at {
                nodes[top.index()].children.push(Child::Token(next_token));
                next_token += 1;
            }
            let record = &self.markers[production.marker as usize];
            match production.event {
                Event::Start => {
                    let Some(kind) = record.kind.filter(|_| record.status == MarkerStatus::Done)
                    else {
                        return Err(EngineInvariantError::new("marker left open"));
                    };
                    let id = NodeId(nodes.len() as u32);
                    let offset = offset_of(production.at);
                    nodes.push(NodeData {
                        kind,
                        span: Span::empty(offset),
                        parent: Some(top),
                        children: Vec::new(),
                        error: record.error.clone(),
                    });
                    nodes[top.index()].children.push(Child::Node(id));
                    node_of_marker[production.marker as usize] = Some(id);
                    open.push(id);
                }
                Event::Done => {
                    let expected = node_of_marker[production.marker as usize];
                    if open.len() < 2 || expected != open.last().copied() {
                        return Err(EngineInvariantError::new("unbalanced marker completion"));
                    }
                    open.pop();
                    if let Some(id) = expected {
                        let node = &mut nodes[id.index()];
                        node.span = Span::new(node.span.start, offset_of(production.at));
                    }
                }
            }
        }
        if open.len() != 1 {
            return Err(EngineInvariantError::new("marker left open"));
        }
        while next_token < tokens.len() {
            nodes[0].children.push(Child::Token(next_token));
            next_token += 1;
        }

        log::debug!(
            target: "html.builder",
            "built {} nodes from {} tokens ({} markers, {} rollbacks)",
            nodes.len(),
            tokens.len(),
            self.stats.markers,
            self.stats.rollbacks
        );
        Ok(SyntaxTree::from_parts(self.source.to_string(), tokens, nodes))
    }
}
