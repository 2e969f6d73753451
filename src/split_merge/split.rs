//! Split: master pass and per-part extraction.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use super::marks::{MarkWalker, Partition};
use super::{
    MASTER, MarkQuery, Marked, Outcome, SPLIT_MERGE, SPLIT_MERGE_ANCHOR, SPLIT_MERGE_ID,
    SPLIT_MERGE_SUB_ID, SplitLayout, SplitMergeOptions,
};
use crate::error::{Error, Result};
use crate::model::{Document, Node, NodeId};
use crate::progress::{ProgressReporter, percent, step_label};
use crate::store::{DocumentStore, XmlStore};

/// Result of [`split_document`].
#[derive(Debug, Clone)]
pub struct SplitReport {
    pub layout: SplitLayout,
    /// Number of parts the document splits into.
    pub total: usize,
    pub outcome: Outcome,
}

/// Split the XML document at `source` on its marked nodes.
pub fn split_document(
    source: &Path,
    options: &SplitMergeOptions,
    reporter: &dyn ProgressReporter,
) -> Result<SplitReport> {
    let store = XmlStore {
        pretty: options.pretty,
    };
    split_with(&store, &Marked, source, options, reporter)
}

/// Split with an explicit store and mark query.
///
/// Validates the document, writes the master, then runs a [`SplitAction`]
/// for the parts. The source file is only ever read.
pub fn split_with<S, Q>(
    store: &S,
    query: &Q,
    source: &Path,
    options: &SplitMergeOptions,
    reporter: &dyn ProgressReporter,
) -> Result<SplitReport>
where
    S: DocumentStore + ?Sized,
    Q: MarkQuery + ?Sized,
{
    let mut doc = store.open(source)?;
    let partitions = validate(&doc, query)?;
    let total = partitions.len();

    build_master(&mut doc, &partitions)?;

    let layout = SplitLayout::for_source(source, options)?;
    prepare_output_dir(&layout.split_dir, options.overwrite)?;
    let master = layout.master_path();
    store.save(&doc, &master)?;
    info!("wrote split master {} ({} parts)", master.display(), total);

    let outcome = SplitAction::new(store, query, source, layout.clone(), total).do_work(reporter)?;
    Ok(SplitReport {
        layout,
        total,
        outcome,
    })
}

/// Writes one part document per mark.
///
/// Every iteration re-opens the source so nothing stamped for one part
/// leaks into the next.
pub struct SplitAction<'a, S: ?Sized, Q: ?Sized> {
    store: &'a S,
    query: &'a Q,
    source: PathBuf,
    layout: SplitLayout,
    total: usize,
}

impl<'a, S, Q> SplitAction<'a, S, Q>
where
    S: DocumentStore + ?Sized,
    Q: MarkQuery + ?Sized,
{
    pub fn new(store: &'a S, query: &'a Q, source: &Path, layout: SplitLayout, total: usize) -> Self {
        Self {
            store,
            query,
            source: source.to_path_buf(),
            layout,
            total,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn do_work(&self, reporter: &dyn ProgressReporter) -> Result<Outcome> {
        for part in self.layout.parts(self.total) {
            if reporter.is_cancellation_requested() {
                info!("split cancelled after {} of {} parts", part.index, self.total);
                return Ok(Outcome::Cancelled {
                    completed: part.index,
                });
            }
            reporter.report_progress(
                percent(part.index, self.total),
                &step_label(part.index, self.total),
            );

            let mut doc = self.store.open(&self.source)?;
            extract_part(&mut doc, self.query, part.index)?;
            self.store.save(&doc, &part.path)?;
            debug!("wrote part {} to {}", part.index, part.path.display());
        }
        info!("split {} into {} parts", self.source.display(), self.total);
        Ok(Outcome::Completed)
    }
}

/// Check that `doc` can be split and return its partitions.
pub(crate) fn validate<Q: MarkQuery + ?Sized>(doc: &Document, query: &Q) -> Result<Vec<Partition>> {
    let Some(root) = doc.xml(NodeId::ROOT) else {
        return Err(Error::InvalidDocument(
            "root node has no XML element".to_string(),
        ));
    };
    if root.attribute(SPLIT_MERGE).is_some() {
        return Err(Error::AlreadySplit);
    }

    let partitions = MarkWalker::new(doc, query).partitions(doc);
    if partitions.is_empty() {
        return Err(Error::NothingToSplit);
    }

    for partition in &partitions {
        if doc.first_ancestor_with_audio(partition.mark).is_some()
            || doc.subtree_has_audio(partition.mark)
            || partition
                .sub_marks
                .iter()
                .any(|&sub| doc.subtree_has_audio(sub))
        {
            return Err(Error::SplitNotAllowedWithAudio);
        }
    }
    Ok(partitions)
}

fn prepare_output_dir(dir: &Path, overwrite: bool) -> Result<()> {
    if dir.exists() {
        if !overwrite {
            return Err(Error::OutputExists(dir.to_path_buf()));
        }
        debug!("removing previous split output {}", dir.display());
        fs::remove_dir_all(dir)?;
    }
    Ok(())
}

/// Turn `doc` into the master: every mark and sub-mark is replaced by an
/// anchor carrying its identity.
///
/// Fails when a node belongs to more than one partition, since its second
/// anchor could never be written.
pub(crate) fn build_master(doc: &mut Document, partitions: &[Partition]) -> Result<()> {
    doc.set_attribute(NodeId::ROOT, SPLIT_MERGE, MASTER);

    for (i, partition) in partitions.iter().enumerate() {
        let anchor = doc.alloc(
            Node::element(SPLIT_MERGE_ANCHOR)
                .with_attribute(SPLIT_MERGE_ID, i.to_string())
                .with_text(format!("PART {i}")),
        );
        if !doc.replace(partition.mark, anchor) {
            return Err(claimed_twice(i, partition.mark));
        }

        for (j, &sub) in partition.sub_marks.iter().enumerate() {
            let anchor = doc.alloc(
                Node::element(SPLIT_MERGE_ANCHOR)
                    .with_attribute(SPLIT_MERGE_SUB_ID, format!("{i}~{j}"))
                    .with_text(format!("PART {i} - {j}")),
            );
            if !doc.replace(sub, anchor) {
                return Err(claimed_twice(i, sub));
            }
        }
    }
    Ok(())
}

fn claimed_twice(part: usize, node: NodeId) -> Error {
    Error::InvalidDocument(format!(
        "node {node:?} of part {part} already belongs to an earlier part"
    ))
}

/// Reduce a fresh copy of the source to part `index`.
pub(crate) fn extract_part<Q: MarkQuery + ?Sized>(
    doc: &mut Document,
    query: &Q,
    index: usize,
) -> Result<()> {
    doc.set_attribute(NodeId::ROOT, SPLIT_MERGE, index.to_string());

    let walker = MarkWalker::new(doc, query);
    let mut counter = 0;
    let mut mark = walker.next_mark(doc, NodeId::ROOT);
    while let Some(current) = mark {
        let next = walker.next_mark(doc, current);
        if counter == index {
            doc.set_attribute(current, SPLIT_MERGE_ID, index.to_string());
            prune_before(doc, current);
            for (j, sub) in super::marks::sub_marks(doc, current, next).into_iter().enumerate() {
                doc.set_attribute(sub, SPLIT_MERGE_SUB_ID, format!("{index}~{j}"));
            }
            if let Some(next) = next {
                prune_from(doc, next);
            }
            return Ok(());
        }
        counter += 1;
        mark = next;
    }

    Err(Error::OrdinalMismatch {
        expected: index,
        found: format!("only {counter} marks"),
    })
}

/// Remove every preceding sibling of `mark` and of each of its ancestors.
fn prune_before(doc: &mut Document, mark: NodeId) {
    let mut top = mark;
    while let Some(parent) = doc.parent(top) {
        let preceding: Vec<_> = doc.children(parent).take_while(|&c| c != top).collect();
        for node in preceding {
            doc.detach(node);
        }
        top = parent;
    }
}

/// Remove `next`, everything after it, and ancestors left empty.
fn prune_from(doc: &mut Document, next: NodeId) {
    let mut top = next;
    let mut remove_top = true;
    while let Some(parent) = doc.parent(top) {
        let following: Vec<_> =
            std::iter::successors(doc.next_sibling(top), |&s| doc.next_sibling(s)).collect();
        for node in following {
            doc.detach(node);
        }
        if remove_top || !doc.has_children(top) {
            doc.detach(top);
        }
        remove_top = false;
        top = parent;
    }
}
