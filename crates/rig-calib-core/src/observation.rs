use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Ordered chessboard corners detected in one image, in pixels.
///
/// The order follows the detector's raster convention: columns fastest
/// within each row, up to a 180° reversal of the whole sequence.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CornerObservation {
    pub points: Vec<Point2<f32>>,
}

impl CornerObservation {
    pub fn new(points: Vec<Point2<f32>>) -> Self {
        Self { points }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Displacement from the first to the last corner.
    ///
    /// These two corners sit at opposite ends of the board, so the vector
    /// tells which way the sequence winds.
    pub fn span(&self) -> Option<Vector2<f32>> {
        let first = self.points.first()?;
        let last = self.points.last()?;
        Some(last - first)
    }

    /// Reverse the corner order in place.
    pub fn reverse(&mut self) {
        self.points.reverse();
    }
}

impl From<Vec<Point2<f32>>> for CornerObservation {
    fn from(points: Vec<Point2<f32>>) -> Self {
        Self { points }
    }
}

/// Reference and secondary observations of the same board placement.
///
/// After correspondence resolution, index `i` in both observations refers
/// to the same physical corner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorrespondencePair {
    pub reference: CornerObservation,
    pub secondary: CornerObservation,
}

impl CorrespondencePair {
    /// Number of matched corners.
    #[inline]
    pub fn len(&self) -> usize {
        self.reference.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.reference.is_empty()
    }
}
