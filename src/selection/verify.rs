//! Selection invariants.

use thiserror::Error;

use super::Selection;
use crate::model::Document;

/// A selection that breaks the audio-alignment rules.
///
/// Produced only by [`Selection::verify`]. Seeing one after a
/// `perform_selection` call means the state machine itself is wrong.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("sub node is set without a primary node")]
    SubWithoutPrimary,

    #[error("selected node is not attached to the document")]
    Detached,

    #[error("primary node has an audio-bearing ancestor")]
    PrimaryUnderAudio,

    #[error("primary node has direct audio and audio below it")]
    NestedAudio,

    #[error("primary node has direct audio but a sub node is set")]
    SubUnderDirectAudio,

    #[error("primary node has audio below it but no sub node is set")]
    MissingSub,

    #[error("sub node is not a strict descendant of the primary node")]
    SubOutsidePrimary,

    #[error("sub node has an audio-bearing ancestor")]
    SubUnderAudio,

    #[error("sub node has an audio-bearing descendant")]
    SubAboveAudio,
}

impl Selection {
    /// Check the selection against the document's audio layout.
    pub fn verify(&self, doc: &Document) -> Result<(), InvariantViolation> {
        let Some(primary) = self.primary else {
            return match self.sub {
                Some(_) => Err(InvariantViolation::SubWithoutPrimary),
                None => Ok(()),
            };
        };
        if !doc.contains(primary) || self.sub.is_some_and(|s| !doc.contains(s)) {
            return Err(InvariantViolation::Detached);
        }

        if doc.first_ancestor_with_audio(primary).is_some() {
            return Err(InvariantViolation::PrimaryUnderAudio);
        }

        let direct = doc.has_direct_audio(primary);
        let below = doc.first_descendant_with_audio(primary);
        if direct && below.is_some() {
            return Err(InvariantViolation::NestedAudio);
        }

        let Some(sub) = self.sub else {
            return match below {
                Some(_) => Err(InvariantViolation::MissingSub),
                None => Ok(()),
            };
        };

        if direct {
            return Err(InvariantViolation::SubUnderDirectAudio);
        }
        if !doc.is_ancestor_of(primary, sub) {
            return Err(InvariantViolation::SubOutsidePrimary);
        }
        if doc.first_ancestor_with_audio(sub).is_some() {
            return Err(InvariantViolation::SubUnderAudio);
        }
        if doc.first_descendant_with_audio(sub).is_some() {
            return Err(InvariantViolation::SubAboveAudio);
        }
        Ok(())
    }
}
