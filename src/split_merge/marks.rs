//! Split mark discovery.
//!
//! Marks are found in document order. Once a mark is found its whole
//! subtree belongs to it, so marks nested inside another mark are
//! bypassed. Nodes without an XML element cannot carry the bookkeeping
//! attributes and are never used as marks.

use crate::model::{Document, NodeId};

/// Decides which nodes are split boundaries.
pub trait MarkQuery {
    fn is_mark(&self, doc: &Document, node: NodeId) -> bool;
}

/// Nodes carrying the user mark flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct Marked;

impl MarkQuery for Marked {
    fn is_mark(&self, doc: &Document, node: NodeId) -> bool {
        doc.node(node).is_some_and(|n| n.marked)
    }
}

impl<F> MarkQuery for F
where
    F: Fn(&Document, NodeId) -> bool,
{
    fn is_mark(&self, doc: &Document, node: NodeId) -> bool {
        self(doc, node)
    }
}

/// One part of a split: a mark and the content up to the next mark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Partition {
    pub mark: NodeId,
    /// Content before the next mark that lies outside `mark`.
    pub sub_marks: Vec<NodeId>,
}

/// Walks marks in document order.
///
/// When the first significant text of the document comes before the first
/// mark, that text node is promoted to an implicit first mark so the
/// leading content gets its own partition.
pub(crate) struct MarkWalker<'q, Q: ?Sized> {
    query: &'q Q,
    preamble: Option<NodeId>,
}

impl<'q, Q: MarkQuery + ?Sized> MarkWalker<'q, Q> {
    pub fn new(doc: &Document, query: &'q Q) -> Self {
        let mut walker = Self {
            query,
            preamble: None,
        };
        if let Some(first) = walker.next_mark(doc, NodeId::ROOT)
            && let Some(text) = doc.first_significant_text()
            && doc.has_xml(text)
            && doc.is_before(text, first)
        {
            walker.preamble = Some(text);
        }
        walker
    }

    fn is_mark(&self, doc: &Document, node: NodeId) -> bool {
        self.preamble == Some(node) || self.query.is_mark(doc, node)
    }

    /// Next mark after `context`: the first mark below the root when
    /// `context` is the root, otherwise the first mark following
    /// `context`'s subtree.
    pub fn next_mark(&self, doc: &Document, context: NodeId) -> Option<NodeId> {
        let mut found = if context == NodeId::ROOT {
            doc.descendants(context).find(|&n| self.is_mark(doc, n))
        } else {
            doc.following(context).find(|&n| self.is_mark(doc, n))
        };
        // A text-only mark claims nothing, so its own subtree is still searched.
        while let Some(mark) = found
            && !doc.has_xml(mark)
        {
            found = doc
                .descendants(mark)
                .chain(doc.following(mark))
                .find(|&n| self.is_mark(doc, n));
        }
        found
    }

    /// All partitions, in mark order.
    pub fn partitions(&self, doc: &Document) -> Vec<Partition> {
        let mut partitions = Vec::new();
        let mut mark = self.next_mark(doc, NodeId::ROOT);
        while let Some(current) = mark {
            let next = self.next_mark(doc, current);
            partitions.push(Partition {
                mark: current,
                sub_marks: sub_marks(doc, current, next),
            });
            mark = next;
        }
        partitions
    }
}

/// Element nodes between `mark` and `next` that lie outside `mark`.
///
/// First the following siblings of `mark` and of each of its ancestors,
/// climbing until the level whose next sibling contains `next`; then the
/// preceding siblings of each node on `next`'s ancestor path inside that
/// sibling, deepest level first. The order defines the sub-mark ordinals
/// and must be identical wherever it is computed.
pub(crate) fn sub_marks(doc: &Document, mark: NodeId, next: Option<NodeId>) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut anchor = Some(mark);

    while let Some(current) = anchor {
        let Some(candidate) = doc.next_sibling(current) else {
            anchor = doc.parent(current);
            continue;
        };
        match next {
            Some(n) if n == candidate => break,
            Some(n) if doc.is_descendant_of(n, candidate) => {
                out.extend(preceding_on_path(doc, n, candidate));
                break;
            }
            // Text-only nodes cannot carry an anchor; they stay in the master.
            _ if !doc.has_xml(candidate) => anchor = Some(candidate),
            _ => {
                out.push(candidate);
                anchor = Some(candidate);
            }
        }
    }
    out
}

/// Preceding element siblings along the path from `stop` down to `node`,
/// deepest level first.
fn preceding_on_path(doc: &Document, node: NodeId, stop: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut top = node;
    while top != stop
        && let Some(parent) = doc.parent(top)
    {
        out.extend(
            doc.children(parent)
                .take_while(|&c| c != top)
                .filter(|&c| doc.has_xml(c)),
        );
        top = parent;
    }
    out
}
