//! 180° ordering ambiguity between two detections of the same board.
//!
//! A rectangular chessboard looks the same after a half turn, so a detector
//! may return either winding. Comparing the first-to-last displacement of
//! both detections tells whether the secondary sequence runs the other way.
//! This assumes the two cameras are not rolled ~180° against each other.

use rig_calib_core::CornerObservation;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("detections disagree (reference has {reference} corners, secondary has {secondary})")]
    DetectionMismatch { reference: usize, secondary: usize },
}

/// Reorder `secondary` so index `i` names the same physical corner as
/// `reference[i]`.
///
/// The secondary sequence is reversed when the dot product of both
/// first-to-last displacements is `<= 0`, and returned unchanged otherwise.
pub fn resolve(
    reference: &CornerObservation,
    mut secondary: CornerObservation,
) -> Result<CornerObservation, ResolveError> {
    let mismatch = ResolveError::DetectionMismatch {
        reference: reference.len(),
        secondary: secondary.len(),
    };
    if reference.len() != secondary.len() {
        return Err(mismatch);
    }
    let (Some(r), Some(s)) = (reference.span(), secondary.span()) else {
        return Err(mismatch);
    };

    if r.dot(&s) <= 0.0 {
        secondary.reverse();
    }
    Ok(secondary)
}
