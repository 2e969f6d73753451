//! Core data model for talking-book documents.
//!
//! This module contains:
//! - Node handles and payload (XML property, text, audio, mark)
//! - The arena-allocated [`Document`] tree with navigation and audio queries
//! - XML qualified names and attribute bags
//! - Tree iterators

mod document;
mod iter;
mod node;
mod xml;

// Re-export document and iteration
pub use document::Document;
pub use iter::{AncestorIter, ChildIter, DfsIter, FollowingIter};

// Re-export node types
pub use node::{AudioClip, Node, NodeId};

// Re-export XML property types
pub use xml::{QualName, XmlAttribute, XmlProperty};
