//! Arena-allocated document tree.
//!
//! All nodes live in a single vector owned by the [`Document`]. Parent,
//! child and sibling links are [`NodeId`] indices into that vector, so the
//! tree has no ownership cycles and ancestor queries cost O(depth).
//!
//! Removing a node only unlinks it. The slot stays allocated and the id
//! is never reused, so a stale id can never alias a different node.

use std::cmp::Ordering;
use std::fmt::Write as _;

use super::iter::{AncestorIter, ChildIter, DfsIter, FollowingIter};
use super::node::{Node, NodeId};
use super::xml::{QualName, XmlProperty};

/// A hierarchical document: the tree of one presentation.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    /// Create a document whose root is an element with the given name.
    pub fn new(root_name: impl Into<QualName>) -> Self {
        Self::with_root(Node::element(root_name))
    }

    /// Create a document from an explicit root node.
    pub fn with_root(root: Node) -> Self {
        let mut root = root.detached_clone();
        root.parent = None;
        Self { nodes: vec![root] }
    }

    /// Get the root node ID.
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Allocate a detached node.
    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node.detached_clone());
        id
    }

    /// Allocate a detached element node.
    pub fn create_element(&mut self, name: impl Into<QualName>) -> NodeId {
        self.alloc(Node::element(name))
    }

    /// Allocate a detached text-only node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(Node::text(text))
    }

    /// Get a node by ID.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by ID.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Number of allocated slots, including detached nodes.
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Number of nodes reachable from the root.
    pub fn len(&self) -> usize {
        1 + self.descendants(NodeId::ROOT).count()
    }

    /// A document always has a root.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether `id` is allocated and attached to this document's tree.
    pub fn contains(&self, id: NodeId) -> bool {
        if self.node(id).is_none() {
            return false;
        }
        id == NodeId::ROOT || self.ancestors(id).any(|a| a == NodeId::ROOT)
    }

    // ------------------------------------------------------------------
    // Structure mutation
    // ------------------------------------------------------------------

    /// Append a detached node as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(self.node(child).is_some_and(|n| n.parent.is_none()));
        let last = self.node(parent).and_then(|n| n.last_child);

        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
            node.prev_sibling = last;
            node.next_sibling = None;
        }
        match last {
            Some(last) => {
                if let Some(node) = self.node_mut(last) {
                    node.next_sibling = Some(child);
                }
            }
            None => {
                if let Some(node) = self.node_mut(parent) {
                    node.first_child = Some(child);
                }
            }
        }
        if let Some(node) = self.node_mut(parent) {
            node.last_child = Some(child);
        }
    }

    /// Insert a detached node before `sibling`.
    pub fn insert_before(&mut self, sibling: NodeId, new_node: NodeId) {
        debug_assert!(self.node(new_node).is_some_and(|n| n.parent.is_none()));
        let Some((parent, prev)) = self.node(sibling).map(|n| (n.parent, n.prev_sibling)) else {
            return;
        };

        if let Some(node) = self.node_mut(new_node) {
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = Some(sibling);
        }
        if let Some(node) = self.node_mut(sibling) {
            node.prev_sibling = Some(new_node);
        }
        match prev {
            Some(prev) => {
                if let Some(node) = self.node_mut(prev) {
                    node.next_sibling = Some(new_node);
                }
            }
            None => {
                if let Some(node) = parent.and_then(|p| self.node_mut(p)) {
                    node.first_child = Some(new_node);
                }
            }
        }
    }

    /// Insert a detached node at `index` among the children of `parent`.
    ///
    /// An index past the end appends.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        match self.children(parent).nth(index) {
            Some(sibling) => self.insert_before(sibling, child),
            None => self.append_child(parent, child),
        }
    }

    /// Unlink a node (and its subtree) from its parent.
    ///
    /// The root cannot be detached.
    pub fn detach(&mut self, id: NodeId) {
        let Some((parent, prev, next)) = self
            .node(id)
            .map(|n| (n.parent, n.prev_sibling, n.next_sibling))
        else {
            return;
        };
        let Some(parent) = parent else {
            return;
        };

        match prev {
            Some(prev) => {
                if let Some(node) = self.node_mut(prev) {
                    node.next_sibling = next;
                }
            }
            None => {
                if let Some(node) = self.node_mut(parent) {
                    node.first_child = next;
                }
            }
        }
        match next {
            Some(next) => {
                if let Some(node) = self.node_mut(next) {
                    node.prev_sibling = prev;
                }
            }
            None => {
                if let Some(node) = self.node_mut(parent) {
                    node.last_child = prev;
                }
            }
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
            node.prev_sibling = None;
            node.next_sibling = None;
        }
    }

    /// Replace an attached node with a detached one, at the same child index.
    ///
    /// Returns `false`, leaving `new` detached, when `old` is not attached.
    #[must_use]
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> bool {
        if self.node(old).is_none_or(|n| n.parent.is_none()) {
            return false;
        }
        self.insert_before(old, new);
        self.detach(old);
        true
    }

    /// Deep-copy a subtree of `source` into this arena.
    ///
    /// Returns the detached root of the copy. The source is left untouched.
    pub fn import_subtree(&mut self, source: &Document, node: NodeId) -> NodeId {
        let Some(src) = source.node(node) else {
            return self.alloc(Node::default());
        };
        let copy = self.alloc(src.detached_clone());
        let children: Vec<_> = source.children(node).collect();
        for child in children {
            let imported = self.import_subtree(source, child);
            self.append_child(copy, imported);
        }
        copy
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.first_child)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.next_sibling)
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.prev_sibling)
    }

    /// Iterate over children of a node.
    pub fn children(&self, parent: NodeId) -> ChildIter<'_> {
        ChildIter {
            doc: self,
            current: self.first_child(parent),
        }
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        self.first_child(id).is_some()
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).count()
    }

    /// Position of a node among its parent's children.
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).position(|c| c == id)
    }

    /// Strict descendants in pre-order.
    pub fn descendants(&self, id: NodeId) -> DfsIter<'_> {
        DfsIter {
            doc: self,
            scope: id,
            current: self.first_child(id),
        }
    }

    /// Nodes after the subtree of `id`, in document order.
    pub fn following(&self, id: NodeId) -> FollowingIter<'_> {
        FollowingIter {
            doc: self,
            current: self.next_outside(id, None),
        }
    }

    /// Strict ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> AncestorIter<'_> {
        AncestorIter {
            doc: self,
            current: self.parent(id),
        }
    }

    /// Next node in document order.
    pub(crate) fn preorder_next(&self, id: NodeId) -> Option<NodeId> {
        self.first_child(id).or_else(|| self.next_outside(id, None))
    }

    /// First node after the subtree of `id`, without leaving `scope`.
    pub(crate) fn next_outside(&self, id: NodeId, scope: Option<NodeId>) -> Option<NodeId> {
        let mut cur = id;
        loop {
            if Some(cur) == scope {
                return None;
            }
            let node = self.node(cur)?;
            if let Some(next) = node.next_sibling {
                return Some(next);
            }
            cur = node.parent?;
        }
    }

    /// Whether `ancestor` is a strict ancestor of `id`.
    pub fn is_ancestor_of(&self, ancestor: NodeId, id: NodeId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// Whether `id` is a strict descendant of `ancestor`.
    pub fn is_descendant_of(&self, id: NodeId, ancestor: NodeId) -> bool {
        self.is_ancestor_of(ancestor, id)
    }

    /// Whether `a` comes strictly before `b` in document order.
    ///
    /// An ancestor comes before its descendants.
    pub fn is_before(&self, a: NodeId, b: NodeId) -> bool {
        self.document_order(a, b) == Ordering::Less
    }

    fn document_order(&self, a: NodeId, b: NodeId) -> Ordering {
        self.index_path(a).cmp(&self.index_path(b))
    }

    fn index_path(&self, id: NodeId) -> Vec<usize> {
        let mut path: Vec<usize> = std::iter::once(id)
            .chain(self.ancestors(id))
            .filter_map(|n| self.index_of(n))
            .collect();
        path.reverse();
        path
    }

    // ------------------------------------------------------------------
    // Audio queries
    // ------------------------------------------------------------------

    pub fn has_direct_audio(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(Node::has_audio)
    }

    /// First strict descendant carrying audio, in pre-order.
    ///
    /// Pre-order means the topmost audio node on any path is found first.
    pub fn first_descendant_with_audio(&self, id: NodeId) -> Option<NodeId> {
        self.descendants(id).find(|&d| self.has_direct_audio(d))
    }

    /// Nearest strict ancestor carrying audio.
    pub fn first_ancestor_with_audio(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id).find(|&a| self.has_direct_audio(a))
    }

    /// Whether the node or anything below it carries audio.
    pub fn subtree_has_audio(&self, id: NodeId) -> bool {
        self.has_direct_audio(id) || self.first_descendant_with_audio(id).is_some()
    }

    // ------------------------------------------------------------------
    // XML property bag
    // ------------------------------------------------------------------

    pub fn xml(&self, id: NodeId) -> Option<&XmlProperty> {
        self.node(id).and_then(|n| n.xml.as_ref())
    }

    pub fn xml_mut(&mut self, id: NodeId) -> Option<&mut XmlProperty> {
        self.node_mut(id).and_then(|n| n.xml.as_mut())
    }

    pub fn has_xml(&self, id: NodeId) -> bool {
        self.xml(id).is_some()
    }

    /// Element qualified name.
    pub fn qname(&self, id: NodeId) -> Option<&QualName> {
        self.xml(id).map(|x| &x.name)
    }

    /// Set the element name, creating the XML property if needed.
    pub fn set_qname(&mut self, id: NodeId, name: impl Into<QualName>) {
        let name = name.into();
        if let Some(node) = self.node_mut(id) {
            match node.xml.as_mut() {
                Some(xml) => xml.name = name,
                None => node.xml = Some(XmlProperty::new(name)),
            }
        }
    }

    /// Get a non-namespaced attribute value.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.xml(id).and_then(|x| x.attribute(name))
    }

    /// Set a non-namespaced attribute.
    ///
    /// Returns `false` if the node has no XML property.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) -> bool {
        match self.xml_mut(id) {
            Some(xml) => {
                xml.set_attribute(name, value);
                true
            }
            None => false,
        }
    }

    /// Remove a non-namespaced attribute, returning its value.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.xml_mut(id).and_then(|x| x.remove_attribute(name))
    }

    /// First strict descendant carrying the attribute, in pre-order.
    pub fn first_descendant_with_attribute(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.descendants(id)
            .find(|&d| self.attribute(d, name).is_some())
    }

    /// Next node carrying the attribute after the subtree of `id`.
    pub fn next_with_attribute(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.following(id)
            .find(|&d| self.attribute(d, name).is_some())
    }

    // ------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.node(id).and_then(|n| n.text.as_deref())
    }

    /// First node (in document order) whose text is not blank.
    pub fn first_significant_text(&self) -> Option<NodeId> {
        self.descendants(NodeId::ROOT)
            .find(|&d| self.text(d).is_some_and(|t| !t.trim().is_empty()))
    }

    /// Concatenated text of a subtree.
    pub fn collect_text(&self, id: NodeId) -> String {
        std::iter::once(id)
            .chain(self.descendants(id))
            .filter_map(|n| self.text(n))
            .collect()
    }

    // ------------------------------------------------------------------
    // Comparison and display
    // ------------------------------------------------------------------

    /// Whether the subtree at `a` equals the subtree at `b` in `other`.
    ///
    /// Compares payload (XML property, text, audio, mark) and child order;
    /// node ids are irrelevant.
    pub fn subtree_eq(&self, a: NodeId, other: &Document, b: NodeId) -> bool {
        let (Some(na), Some(nb)) = (self.node(a), other.node(b)) else {
            return false;
        };
        if !na.same_content(nb) {
            return false;
        }
        let mut ca = self.children(a);
        let mut cb = other.children(b);
        loop {
            match (ca.next(), cb.next()) {
                (None, None) => return true,
                (Some(x), Some(y)) => {
                    if !self.subtree_eq(x, other, y) {
                        return false;
                    }
                }
                _ => return false,
            }
        }
    }

    /// Indented one-line-per-node rendering, for diagnostics.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(NodeId::ROOT, 0, &mut out);
        out
    }

    fn write_outline(&self, id: NodeId, depth: usize, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        let _ = write!(out, "{}", "  ".repeat(depth));
        match &node.xml {
            Some(xml) => {
                let _ = write!(out, "<{}", xml.name);
                for attr in &xml.attributes {
                    let _ = write!(out, " {}=\"{}\"", attr.name, attr.value);
                }
                out.push('>');
            }
            None => out.push('#'),
        }
        if let Some(text) = &node.text {
            let _ = write!(out, " {text:?}");
        }
        if let Some(audio) = &node.audio {
            let _ = write!(out, " [audio {}]", audio.src);
        }
        if node.marked {
            out.push_str(" *");
        }
        out.push('\n');
        let children: Vec<_> = self.children(id).collect();
        for child in children {
            self.write_outline(child, depth + 1, out);
        }
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.subtree_eq(NodeId::ROOT, other, NodeId::ROOT)
    }
}
