//! Tree node types.

use super::xml::{QualName, XmlProperty};

/// Unique identifier for a node within a [`Document`](super::Document).
///
/// Ids are indices into the document arena. They stay valid for the whole
/// lifetime of the document, including after the node is detached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The root node ID (always 0).
    pub const ROOT: NodeId = NodeId(0);

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Reference to a managed audio clip attached to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    /// Audio file, relative to the project data directory.
    pub src: String,
    /// Clip start in milliseconds.
    pub clip_begin_ms: u64,
    /// Clip end in milliseconds (`None` = end of file).
    pub clip_end_ms: Option<u64>,
}

impl AudioClip {
    /// Create a clip covering the whole file.
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            clip_begin_ms: 0,
            clip_end_ms: None,
        }
    }

    /// Restrict the clip to a time range.
    pub fn with_range(mut self, begin_ms: u64, end_ms: u64) -> Self {
        self.clip_begin_ms = begin_ms;
        self.clip_end_ms = Some(end_ms);
        self
    }
}

/// A node in the document tree.
///
/// A node carries any combination of an XML element property, text media,
/// managed audio and a user mark. Structural links are owned by the
/// document and only change through [`Document`](super::Document) methods.
#[derive(Debug, Clone, Default)]
pub struct Node {
    /// XML element name and attributes (`None` for text-only nodes).
    pub xml: Option<XmlProperty>,
    /// Text media.
    pub text: Option<String>,
    /// Managed audio media.
    pub audio: Option<AudioClip>,
    /// User mark, used as a split boundary.
    pub marked: bool,
    pub(crate) parent: Option<NodeId>,
    pub(crate) first_child: Option<NodeId>,
    pub(crate) last_child: Option<NodeId>,
    pub(crate) prev_sibling: Option<NodeId>,
    pub(crate) next_sibling: Option<NodeId>,
}

impl Node {
    /// Create an element node.
    pub fn element(name: impl Into<QualName>) -> Self {
        Self {
            xml: Some(XmlProperty::new(name)),
            ..Self::default()
        }
    }

    /// Create a text-only node (no XML property).
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Set the text media.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Attach managed audio.
    pub fn with_audio(mut self, audio: AudioClip) -> Self {
        self.audio = Some(audio);
        self
    }

    /// Add an attribute. Ignored on text-only nodes.
    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        if let Some(xml) = self.xml.as_mut() {
            xml.set_attribute(name, value);
        }
        self
    }

    /// Set the user mark.
    pub fn with_mark(mut self) -> Self {
        self.marked = true;
        self
    }

    /// Whether this node has an XML element property.
    pub fn has_xml(&self) -> bool {
        self.xml.is_some()
    }

    /// Whether this node carries audio directly.
    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn first_child(&self) -> Option<NodeId> {
        self.first_child
    }

    pub fn last_child(&self) -> Option<NodeId> {
        self.last_child
    }

    pub fn prev_sibling(&self) -> Option<NodeId> {
        self.prev_sibling
    }

    pub fn next_sibling(&self) -> Option<NodeId> {
        self.next_sibling
    }

    /// Copy of the payload with all structural links cleared.
    pub(crate) fn detached_clone(&self) -> Self {
        Self {
            xml: self.xml.clone(),
            text: self.text.clone(),
            audio: self.audio.clone(),
            marked: self.marked,
            ..Self::default()
        }
    }

    /// Payload equality, ignoring structural links.
    pub(crate) fn same_content(&self, other: &Node) -> bool {
        self.xml == other.xml
            && self.text == other.text
            && self.audio == other.audio
            && self.marked == other.marked
    }
}
