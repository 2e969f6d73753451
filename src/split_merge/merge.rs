//! Merge: splice every part back over its anchors in the master.

use std::path::{Path, PathBuf};

use log::{debug, info};

use super::{
    SPLIT_MERGE, SPLIT_MERGE_ID, SPLIT_MERGE_SUB_ID, Outcome, SplitLayout, SplitMergeOptions,
    SplitRole, document_role,
};
use crate::error::{Error, Result};
use crate::model::{Document, NodeId};
use crate::progress::{ProgressReporter, percent, step_label};
use crate::store::{DocumentStore, XmlStore};

/// Result of [`merge_document`].
#[derive(Debug, Clone)]
pub struct MergeReport {
    pub layout: SplitLayout,
    /// Number of parts in the project.
    pub total: usize,
    pub outcome: Outcome,
    /// Where the merged document was written; `None` when cancelled.
    pub merged_path: Option<PathBuf>,
}

/// Merge the split project whose master XML document is at `master`.
pub fn merge_document(
    master: &Path,
    options: &SplitMergeOptions,
    reporter: &dyn ProgressReporter,
) -> Result<MergeReport> {
    let store = XmlStore {
        pretty: options.pretty,
    };
    merge_with(&store, master, options, reporter)
}

/// Merge with an explicit store.
pub fn merge_with<S: DocumentStore + ?Sized>(
    store: &S,
    master: &Path,
    options: &SplitMergeOptions,
    reporter: &dyn ProgressReporter,
) -> Result<MergeReport> {
    let layout = SplitLayout::for_master(master, options)?;
    let merged = layout.merged_path();
    if merged.exists() && !options.overwrite {
        return Err(Error::OutputExists(merged));
    }

    let action = MergeAction::open(store, master, layout)?;
    let outcome = action.do_work(reporter)?;
    Ok(MergeReport {
        total: action.total(),
        merged_path: (!outcome.is_cancelled()).then_some(merged),
        layout: action.layout,
        outcome,
    })
}

/// Re-imports every part into a copy of the master.
///
/// The master is validated up front. The merged document is saved only
/// after every part has been spliced in, so a failure or a cancellation
/// leaves nothing behind.
pub struct MergeAction<'a, S: ?Sized> {
    store: &'a S,
    layout: SplitLayout,
    master: Document,
    /// `splitMergeId` anchors in document order.
    anchors: Vec<NodeId>,
}

impl<'a, S: DocumentStore + ?Sized> MergeAction<'a, S> {
    /// Load and validate the master document.
    pub fn open(store: &'a S, master_path: &Path, layout: SplitLayout) -> Result<Self> {
        let master = store.open(master_path)?;
        let anchors = validate(&master)?;
        Ok(Self {
            store,
            layout,
            master,
            anchors,
        })
    }

    pub fn total(&self) -> usize {
        self.anchors.len()
    }

    pub fn do_work(&self, reporter: &dyn ProgressReporter) -> Result<Outcome> {
        let total = self.total();
        let mut doc = self.master.clone();

        for (index, &anchor) in self.anchors.iter().enumerate() {
            if reporter.is_cancellation_requested() {
                info!("merge cancelled after {index} of {total} parts");
                return Ok(Outcome::Cancelled { completed: index });
            }
            reporter.report_progress(percent(index, total), &step_label(index, total));

            let path = self.layout.part_path(index);
            let mut part = self.store.open(&path)?;
            let identity = part
                .attribute(NodeId::ROOT, SPLIT_MERGE)
                .unwrap_or_default()
                .to_string();
            if identity != index.to_string() {
                return Err(Error::OrdinalMismatch {
                    expected: index,
                    found: identity,
                });
            }
            splice_part(&mut doc, anchor, &mut part, index)?;
            debug!("merged part {index} from {}", path.display());
        }

        if let Some(left) = doc.descendants(NodeId::ROOT).find(|&n| is_bookkeeping(&doc, n)) {
            let id = doc
                .attribute(left, SPLIT_MERGE_ID)
                .or_else(|| doc.attribute(left, SPLIT_MERGE_SUB_ID))
                .unwrap_or_default();
            return Err(Error::UnresolvedAnchor(id.to_string()));
        }

        doc.remove_attribute(NodeId::ROOT, SPLIT_MERGE);
        let merged = self.layout.merged_path();
        self.store.save(&doc, &merged)?;
        info!("merged {total} parts into {}", merged.display());
        Ok(Outcome::Completed)
    }
}

fn is_bookkeeping(doc: &Document, node: NodeId) -> bool {
    doc.attribute(node, SPLIT_MERGE_ID).is_some() || doc.attribute(node, SPLIT_MERGE_SUB_ID).is_some()
}

/// Check that `doc` is a mergeable master and return its part anchors.
pub(crate) fn validate(doc: &Document) -> Result<Vec<NodeId>> {
    if document_role(doc) != SplitRole::Master {
        return Err(Error::NotSplitMaster);
    }

    let mut anchors = Vec::new();
    let mut next = doc.first_descendant_with_attribute(NodeId::ROOT, SPLIT_MERGE_ID);
    while let Some(anchor) = next {
        let found = doc.attribute(anchor, SPLIT_MERGE_ID).unwrap_or_default();
        if found != anchors.len().to_string() {
            return Err(Error::OrdinalMismatch {
                expected: anchors.len(),
                found: found.to_string(),
            });
        }
        anchors.push(anchor);
        next = doc.next_with_attribute(anchor, SPLIT_MERGE_ID);
    }

    let under_audio = doc
        .descendants(NodeId::ROOT)
        .filter(|&n| is_bookkeeping(doc, n))
        .any(|n| doc.first_ancestor_with_audio(n).is_some());
    if under_audio {
        return Err(Error::SplitNotAllowedWithAudio);
    }
    Ok(anchors)
}

/// Replace `anchor` and the part's sub-mark anchors in `master` with the
/// corresponding subtrees of `part`.
fn splice_part(master: &mut Document, anchor: NodeId, part: &mut Document, index: usize) -> Result<()> {
    let expected = index.to_string();

    let mark = part
        .first_descendant_with_attribute(NodeId::ROOT, SPLIT_MERGE_ID)
        .ok_or_else(|| Error::UnresolvedAnchor(expected.clone()))?;
    let id = part.remove_attribute(mark, SPLIT_MERGE_ID).unwrap_or_default();
    if id != expected {
        return Err(Error::OrdinalMismatch {
            expected: index,
            found: id,
        });
    }
    let imported = master.import_subtree(part, mark);
    if !master.replace(anchor, imported) {
        return Err(Error::UnresolvedAnchor(expected));
    }

    let subs: Vec<_> = part
        .descendants(NodeId::ROOT)
        .filter(|&n| part.attribute(n, SPLIT_MERGE_SUB_ID).is_some())
        .collect();
    for sub in subs {
        let sub_id = part.remove_attribute(sub, SPLIT_MERGE_SUB_ID).unwrap_or_default();
        if sub_id.split('~').next() != Some(expected.as_str()) {
            return Err(Error::OrdinalMismatch {
                expected: index,
                found: sub_id,
            });
        }
        let target = master
            .descendants(NodeId::ROOT)
            .find(|&n| master.attribute(n, SPLIT_MERGE_SUB_ID) == Some(sub_id.as_str()))
            .ok_or_else(|| Error::UnresolvedAnchor(sub_id.clone()))?;
        let imported = master.import_subtree(part, sub);
        if !master.replace(target, imported) {
            return Err(Error::UnresolvedAnchor(sub_id));
        }
    }
    Ok(())
}
