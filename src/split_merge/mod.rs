//! Splitting a document into independently edited parts and merging them
//! back.
//!
//! A split walks the user's marks in document order. Each mark, together
//! with the content up to the next mark, becomes a part document. The
//! master keeps everything else, with a placeholder anchor where each
//! piece was taken out. Bookkeeping lives in three XML attributes:
//!
//! - `splitMerge` on the root: `MASTER` in the master, the part ordinal
//!   in each part.
//! - `splitMergeId` on a mark (or its anchor): the part ordinal.
//! - `splitMergeSubId` on the remaining content of a part: `"{i}~{j}"`.
//!
//! Merging opens every part, strips the attributes and splices the
//! subtrees back over the anchors.

mod layout;
mod marks;
mod merge;
mod split;

use crate::model::{Document, NodeId};

pub use layout::{PartEntry, SplitLayout};
pub use marks::{MarkQuery, Marked};
pub use merge::{MergeAction, MergeReport, merge_document, merge_with};
pub use split::{SplitAction, SplitReport, split_document, split_with};

/// Root attribute identifying the master or a part.
pub const SPLIT_MERGE: &str = "splitMerge";
/// Part ordinal carried by a mark and by its anchor in the master.
pub const SPLIT_MERGE_ID: &str = "splitMergeId";
/// `"{part}~{index}"` identity of content between two marks.
pub const SPLIT_MERGE_SUB_ID: &str = "splitMergeSubId";
/// Element name of the placeholders left in the master.
pub const SPLIT_MERGE_ANCHOR: &str = "splitMergeAnchor";
/// Root `splitMerge` value of a master document.
pub const MASTER: &str = "MASTER";

/// Naming and overwrite policy for split and merge output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitMergeOptions {
    pub split_dir_name: String,
    pub merge_dir_name: String,
    pub master_suffix: String,
    pub master_file_stem: String,
    /// Indent saved documents.
    pub pretty: bool,
    /// Replace an existing output directory instead of failing.
    pub overwrite: bool,
}

impl Default for SplitMergeOptions {
    fn default() -> Self {
        Self {
            split_dir_name: "_SPLIT".to_string(),
            merge_dir_name: "_MERGE".to_string(),
            master_suffix: "__MASTER".to_string(),
            master_file_stem: "master".to_string(),
            pretty: true,
            overwrite: false,
        }
    }
}

/// How a long-running action ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// Cancelled before `completed` iterations had all run.
    Cancelled { completed: usize },
}

impl Outcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled { .. })
    }
}

/// Position of a document within a split project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitRole {
    Plain,
    Master,
    Sub(usize),
}

/// Classify a document by its root `splitMerge` attribute.
pub fn document_role(doc: &Document) -> SplitRole {
    match doc.attribute(NodeId::ROOT, SPLIT_MERGE) {
        Some(value) if value.eq_ignore_ascii_case(MASTER) => SplitRole::Master,
        Some(value) => value.parse().map_or(SplitRole::Plain, SplitRole::Sub),
        None => SplitRole::Plain,
    }
}

/// Number of marks a split of `doc` would produce, including an implicit
/// leading part for text before the first mark.
pub fn count_parts<Q: MarkQuery + ?Sized>(doc: &Document, query: &Q) -> usize {
    marks::MarkWalker::new(doc, query).partitions(doc).len()
}
