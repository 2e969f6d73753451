//! Error types for tobi operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while editing, splitting, merging or persisting a document.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Nothing to split: the document has no split marks")]
    NothingToSplit,

    #[error("Document is already part of a split project")]
    AlreadySplit,

    #[error("Split/merge is not allowed when marked branches contain audio")]
    SplitNotAllowedWithAudio,

    #[error("Document is not a split master")]
    NotSplitMaster,

    #[error("Split ordinal mismatch: expected {expected}, found {found}")]
    OrdinalMismatch { expected: usize, found: String },

    #[error("Unresolved split anchor: {0}")]
    UnresolvedAnchor(String),

    #[error("Output already exists: {}", .0.display())]
    OutputExists(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;
