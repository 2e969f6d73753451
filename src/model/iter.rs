//! Tree iteration.

use super::document::Document;
use super::node::NodeId;

/// Iterator over the children of a node.
pub struct ChildIter<'a> {
    pub(crate) doc: &'a Document,
    pub(crate) current: Option<NodeId>,
}

impl Iterator for ChildIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.doc.node(id).and_then(|n| n.next_sibling);
        Some(id)
    }
}

/// Pre-order iterator over the strict descendants of a node.
pub struct DfsIter<'a> {
    pub(crate) doc: &'a Document,
    pub(crate) scope: NodeId,
    pub(crate) current: Option<NodeId>,
}

impl Iterator for DfsIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = match self.doc.node(id).and_then(|n| n.first_child) {
            Some(child) => Some(child),
            None => self.doc.next_outside(id, Some(self.scope)),
        };
        Some(id)
    }
}

/// Pre-order iterator over the nodes that follow a node's subtree.
///
/// Descendants of the starting node are bypassed; everything after it in
/// document order is visited.
pub struct FollowingIter<'a> {
    pub(crate) doc: &'a Document,
    pub(crate) current: Option<NodeId>,
}

impl Iterator for FollowingIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.doc.preorder_next(id);
        Some(id)
    }
}

/// Iterator over the strict ancestors of a node, nearest first.
pub struct AncestorIter<'a> {
    pub(crate) doc: &'a Document,
    pub(crate) current: Option<NodeId>,
}

impl Iterator for AncestorIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.doc.node(id).and_then(|n| n.parent);
        Some(id)
    }
}
