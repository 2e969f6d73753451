//! Audio-aware tree node selection.
//!
//! The editing focus is a pair of nodes: a *primary* node and an optional
//! *sub* node inside it. Navigation panels ask for a node to be selected;
//! the state machine moves the request to the node where audio actually
//! lives, so that recording and playback always address a whole audio
//! clip:
//!
//! - a node under audio is promoted to its audio-bearing ancestor;
//! - a node with audio somewhere below keeps that audio as its sub node;
//! - re-selecting the current primary or sub node toggles between the two
//!   granularities.
//!
//! The pair is the only state shared with the UI thread and sits behind a
//! single lock. Documents are expected to never nest audio (no audio below
//! a node that carries audio itself).

mod verify;

use log::{debug, warn};
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::model::{Document, NodeId};

pub use verify::InvariantViolation;

/// The current editing focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub primary: Option<NodeId>,
    pub sub: Option<NodeId>,
}

impl Selection {
    /// Primary node only.
    pub fn single(primary: NodeId) -> Self {
        Self {
            primary: Some(primary),
            sub: None,
        }
    }

    /// Primary node with a sub node.
    pub fn pair(primary: NodeId, sub: NodeId) -> Self {
        Self {
            primary: Some(primary),
            sub: Some(sub),
        }
    }

    fn with_sub(primary: NodeId, sub: Option<NodeId>) -> Self {
        Self {
            primary: Some(primary),
            sub,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_none()
    }
}

/// Result of a selection request: the pair before and after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionChange {
    pub old: Selection,
    pub new: Selection,
}

impl SelectionChange {
    /// Whether listeners should be notified.
    pub fn is_changed(&self) -> bool {
        self.old != self.new
    }
}

/// Options for a selection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRequest {
    /// Let the state machine pick a sub node and toggle on re-selection.
    pub allow_auto_sub_node_and_toggle: bool,
    /// Explicit sub node. Ignored unless it is a strict descendant of the
    /// requested node with no audio above or below it.
    pub sub_node: Option<NodeId>,
}

impl Default for SelectionRequest {
    fn default() -> Self {
        Self {
            allow_auto_sub_node_and_toggle: true,
            sub_node: None,
        }
    }
}

/// Thread-safe holder of the current [`Selection`].
#[derive(Debug, Default)]
pub struct TreeNodeSelection {
    state: Mutex<Selection>,
}

impl TreeNodeSelection {
    /// Empty selection, as at document open.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current selection.
    pub fn selection(&self) -> Selection {
        *self.state.lock()
    }

    /// Reset to the empty selection, as at document close.
    pub fn clear(&self) -> SelectionChange {
        let mut state = self.state.lock();
        let old = std::mem::take(&mut *state);
        SelectionChange { old, new: *state }
    }

    /// Select `node` with automatic sub node selection and toggling.
    pub fn perform_selection(&self, doc: &Document, node: NodeId) -> Result<SelectionChange> {
        self.perform_selection_with(doc, node, SelectionRequest::default())
    }

    /// Select `node`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `node` is not attached to `doc`.
    pub fn perform_selection_with(
        &self,
        doc: &Document,
        node: NodeId,
        request: SelectionRequest,
    ) -> Result<SelectionChange> {
        if !doc.contains(node) {
            return Err(Error::InvalidArgument(format!(
                "node {} is not part of the document",
                node.0
            )));
        }

        let mut state = self.state.lock();
        let old = *state;
        let new = resolve(doc, old, node, request);

        debug_assert_eq!(new.verify(doc), Ok(()), "selection {new:?} for {node:?}");

        *state = new;
        let change = SelectionChange { old, new };
        if change.is_changed() {
            debug!("selection {:?} -> {:?}", old, new);
        }
        Ok(change)
    }
}

/// Audio layout around one node.
struct AudioContext {
    direct: bool,
    ancestor: Option<NodeId>,
    descendant: Option<NodeId>,
}

impl AudioContext {
    fn of(doc: &Document, id: NodeId) -> Self {
        Self {
            direct: doc.has_direct_audio(id),
            ancestor: doc.first_ancestor_with_audio(id),
            descendant: doc.first_descendant_with_audio(id),
        }
    }
}

fn is_valid_sub(doc: &Document, node: NodeId, sub: NodeId) -> bool {
    doc.is_descendant_of(sub, node)
        && doc.first_ancestor_with_audio(sub).is_none()
        && doc.first_descendant_with_audio(sub).is_none()
}

/// Compute the selection that results from clicking `clicked`.
///
/// A stored pair that no longer verifies against `doc` (after audio edits)
/// is dropped first instead of being carried into the decision.
fn resolve(
    doc: &Document,
    current: Selection,
    clicked: NodeId,
    request: SelectionRequest,
) -> Selection {
    let sub_clicked = request.sub_node.filter(|&s| {
        let valid = is_valid_sub(doc, clicked, s);
        if !valid {
            warn!("ignoring sub node {s:?}: not a valid sub node of {clicked:?}");
        }
        valid
    });
    let auto = request.allow_auto_sub_node_and_toggle && sub_clicked.is_none();
    let c = AudioContext::of(doc, clicked);

    // After audio edits the previous pair may no longer line up with the
    // audio; in that case start over as if nothing was selected.
    let current = match current.verify(doc) {
        Ok(()) => current,
        Err(violation) => {
            debug!("discarding stale selection {current:?}: {violation}");
            Selection::default()
        }
    };

    let Some(primary) = current.primary else {
        return if c.direct {
            Selection::single(clicked)
        } else if let Some(ancestor) = c.ancestor {
            Selection::single(ancestor)
        } else if let Some(descendant) = c.descendant {
            Selection::with_sub(clicked, sub_clicked.or(Some(descendant)))
        } else {
            Selection::with_sub(clicked, sub_clicked)
        };
    };
    let sub = current.sub;

    let is_primary = clicked == primary;
    let is_primary_ancestor = doc.is_ancestor_of(clicked, primary);
    let is_primary_descendant = doc.is_descendant_of(clicked, primary);
    let is_sub = sub == Some(clicked);

    if c.direct {
        if auto && is_primary_descendant && !is_sub {
            Selection::pair(primary, clicked)
        } else {
            Selection::single(clicked)
        }
    } else if let Some(ancestor) = c.ancestor {
        if auto && doc.is_descendant_of(ancestor, primary) {
            Selection::pair(primary, ancestor)
        } else {
            Selection::single(ancestor)
        }
    } else if let Some(descendant) = c.descendant {
        let audio_sub_below = sub.filter(|&s| doc.has_direct_audio(s) && doc.is_ancestor_of(clicked, s));

        if let Some(s) = audio_sub_below {
            if auto && is_primary {
                // toggle down onto the audio sub node
                Selection::single(s)
            } else {
                Selection::with_sub(clicked, sub_clicked.or(Some(s)))
            }
        } else if doc.has_direct_audio(primary) && is_primary_ancestor {
            // toggle back up: the old audio primary becomes the sub node
            Selection::with_sub(clicked, sub_clicked.or(Some(primary)))
        } else {
            let kept = sub.filter(|&s| doc.is_descendant_of(s, clicked));
            Selection::with_sub(clicked, sub_clicked.or(kept).or(Some(descendant)))
        }
    } else if is_sub {
        // no audio on the path or below: toggle the sub node off
        if auto {
            Selection::with_sub(primary, doc.first_descendant_with_audio(primary))
        } else {
            Selection::with_sub(clicked, sub_clicked)
        }
    } else if is_primary {
        if auto {
            match sub {
                Some(s) => Selection::single(s),
                None => current,
            }
        } else {
            Selection::with_sub(clicked, sub_clicked)
        }
    } else if is_primary_descendant && auto {
        Selection::pair(primary, clicked)
    } else if is_primary_ancestor && auto {
        Selection::with_sub(clicked, sub.or(Some(primary)))
    } else {
        Selection::with_sub(clicked, sub_clicked)
    }
}
