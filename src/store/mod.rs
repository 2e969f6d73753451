//! Document persistence.
//!
//! The split/merge engine only needs to open and save whole documents.
//! [`DocumentStore`] is that contract; [`XmlStore`] implements it with a
//! XUK-shaped XML serialization of the tree:
//!
//! ```xml
//! <Document version="1">
//!   <TreeNode>
//!     <XmlProperty localName="book" namespaceUri="">
//!       <XmlAttribute localName="splitMerge" namespaceUri="" value="MASTER"/>
//!     </XmlProperty>
//!     <Children>
//!       <TreeNode marked="true">
//!         <XmlProperty localName="h1" namespaceUri=""/>
//!         <TextMedia>Chapter 1</TextMedia>
//!         <ManagedAudioMedia src="h1.wav" clipBegin="0" clipEnd="1500"/>
//!       </TreeNode>
//!     </Children>
//!   </TreeNode>
//! </Document>
//! ```

mod reader;
mod writer;

use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::model::Document;

pub use reader::read_document;
pub use writer::write_document;

/// Opens and saves whole documents.
pub trait DocumentStore {
    /// Load a document from `path`.
    fn open(&self, path: &Path) -> Result<Document>;

    /// Save `doc` to `path`, creating parent directories as needed.
    fn save(&self, doc: &Document, path: &Path) -> Result<()>;
}

/// XML file store.
#[derive(Debug, Clone, Copy)]
pub struct XmlStore {
    /// Indent the output.
    pub pretty: bool,
}

impl Default for XmlStore {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl DocumentStore for XmlStore {
    fn open(&self, path: &Path) -> Result<Document> {
        let bytes = fs::read(path)?;
        read_document(&bytes)
    }

    fn save(&self, doc: &Document, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, write_document(doc, self.pretty))?;
        Ok(())
    }
}

/// Open a document with the default [`XmlStore`].
pub fn open_document<P: AsRef<Path>>(path: P) -> Result<Document> {
    XmlStore::default().open(path.as_ref())
}

/// Save a document with the default [`XmlStore`].
pub fn save_document<P: AsRef<Path>>(doc: &Document, path: P) -> Result<()> {
    XmlStore::default().save(doc, path.as_ref())
}

pub(crate) const DOCUMENT: &[u8] = b"Document";
pub(crate) const TREE_NODE: &[u8] = b"TreeNode";
pub(crate) const XML_PROPERTY: &[u8] = b"XmlProperty";
pub(crate) const XML_ATTRIBUTE: &[u8] = b"XmlAttribute";
pub(crate) const TEXT_MEDIA: &[u8] = b"TextMedia";
pub(crate) const AUDIO_MEDIA: &[u8] = b"ManagedAudioMedia";
pub(crate) const CHILDREN: &[u8] = b"Children";
pub(crate) const FORMAT_VERSION: &str = "1";
