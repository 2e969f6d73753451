//! # tobi
//!
//! Document tree core for talking-book authoring.
//!
//! ## Features
//!
//! - Arena document tree with XML element properties, text and audio media
//! - Audio-aware tree node selection (primary node plus audio sub node)
//! - Split a document into independently edited parts at marked nodes
//! - Merge the parts back into one document
//! - XML persistence of whole documents
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use tobi::{NoProgress, SplitMergeOptions, merge_document, split_document};
//!
//! let options = SplitMergeOptions::default();
//! let report = split_document(Path::new("book.xuk"), &options, &NoProgress).unwrap();
//!
//! // ... edit the parts under _SPLIT/ ...
//!
//! merge_document(&report.layout.master_path(), &options, &NoProgress).unwrap();
//! ```
//!
//! ## Selecting Nodes
//!
//! ```
//! use tobi::{AudioClip, Document, Node, NodeId, Selection, TreeNodeSelection};
//!
//! let mut doc = Document::new("book");
//! let h2 = doc.alloc(Node::element("h2").with_text("Chapter"));
//! let h3 = doc.alloc(Node::element("h3").with_audio(AudioClip::new("h3.wav")));
//! doc.append_child(NodeId::ROOT, h2);
//! doc.append_child(h2, h3);
//!
//! let selection = TreeNodeSelection::new();
//! let change = selection.perform_selection(&doc, h2).unwrap();
//! assert_eq!(change.new, Selection::pair(h2, h3));
//! ```

pub mod error;
pub mod model;
pub mod progress;
pub mod selection;
pub mod split_merge;
pub mod store;
pub(crate) mod util;

pub use error::{Error, Result};
pub use model::{AudioClip, Document, Node, NodeId, QualName, XmlAttribute, XmlProperty};
pub use progress::{CancellationToken, NoProgress, ProgressLog, ProgressReporter};
pub use selection::{
    InvariantViolation, Selection, SelectionChange, SelectionRequest, TreeNodeSelection,
};
pub use split_merge::{
    MarkQuery, Marked, MergeAction, MergeReport, Outcome, SplitAction, SplitLayout,
    SplitMergeOptions, SplitReport, SplitRole, document_role, merge_document, split_document,
};
pub use store::{DocumentStore, XmlStore, open_document, save_document};
