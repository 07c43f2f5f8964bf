//! Stack of open tags.

use crate::builder::Marker;
use crate::dialect::{AutoClose, MarkupDialect};

/// A tag whose start has been parsed and whose end is still pending.
#[derive(Debug)]
pub(crate) struct StackItem {
    /// Normalized name used for matching and dialect queries.
    pub(crate) name: String,
    /// Name as written, used in diagnostics.
    pub(crate) original_name: String,
    pub(crate) marker: Marker,
}

/// Open tags, outermost first. Items are values, not references into the tree.
#[derive(Debug, Default)]
pub(crate) struct TagStack {
    items: Vec<StackItem>,
    max_depth: usize,
}

/// Result of asking the dialect whether an opening tag closes the top of the stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct AutoCloseVerdict {
    /// Answer for the top item itself.
    pub(crate) direct: AutoClose,
    /// First definitive answer walking outwards from the top.
    pub(crate) effective: AutoClose,
}

impl TagStack {
    pub(crate) fn push(&mut self, item: StackItem) {
        self.items.push(item);
        self.max_depth = self.max_depth.max(self.items.len());
    }

    pub(crate) fn pop(&mut self) -> Option<StackItem> {
        self.items.pop()
    }

    pub(crate) fn top(&self) -> Option<&StackItem> {
        self.items.last()
    }

    #[cfg(any(test, feature = "parser-invariants"))]
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Whether any open tag has the normalized `name`.
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.items.iter().rev().any(|item| item.name == name)
    }

    /// Items innermost first.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &StackItem> + '_ {
        self.items.iter().rev()
    }

    /// Innermost-first walk: the top item closes when the first non-`Unsure`
    /// answer from it or any ancestor is `Yes`.
    pub(crate) fn auto_close_verdict(
        &self,
        dialect: &dyn MarkupDialect,
        opening: &str,
    ) -> Option<AutoCloseVerdict> {
        let mut answers = self
            .iter()
            .map(|item| dialect.can_opening_tag_auto_close(&item.name, opening));
        let direct = answers.next()?;
        let effective = if direct == AutoClose::Unsure {
            answers
                .find(|answer| *answer != AutoClose::Unsure)
                .unwrap_or(AutoClose::Unsure)
        } else {
            direct
        };
        Some(AutoCloseVerdict { direct, effective })
    }
}
