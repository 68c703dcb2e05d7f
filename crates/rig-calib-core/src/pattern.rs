//! Chessboard pattern specification and its canonical world points.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Static chessboard specification.
///
/// `rows`/`cols` are **inner corner counts** (the pattern size a corner
/// detector is asked for), `square_size` is the physical side length of one
/// square. Translations estimated from this pattern come out in the unit of
/// `square_size`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChessboardPattern {
    pub rows: u32,
    pub cols: u32,
    pub square_size: f64,
}

/// Pattern specification validation errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PatternError {
    #[error("pattern rows must be > 0")]
    InvalidRows,
    #[error("pattern cols must be > 0")]
    InvalidCols,
    #[error("square_size must be finite and > 0 (got {0})")]
    InvalidSquareSize(f64),
}

impl ChessboardPattern {
    /// Validate and create a pattern.
    pub fn new(rows: u32, cols: u32, square_size: f64) -> Result<Self, PatternError> {
        let pattern = Self {
            rows,
            cols,
            square_size,
        };
        pattern.validate()?;
        Ok(pattern)
    }

    /// Build a pattern from signed host-side values.
    pub fn from_signed(rows: i32, cols: i32, square_size: f64) -> Result<Self, PatternError> {
        let rows = u32::try_from(rows).map_err(|_| PatternError::InvalidRows)?;
        let cols = u32::try_from(cols).map_err(|_| PatternError::InvalidCols)?;
        Self::new(rows, cols, square_size)
    }

    pub fn validate(&self) -> Result<(), PatternError> {
        if self.rows == 0 {
            return Err(PatternError::InvalidRows);
        }
        if self.cols == 0 {
            return Err(PatternError::InvalidCols);
        }
        if !self.square_size.is_finite() || self.square_size <= 0.0 {
            return Err(PatternError::InvalidSquareSize(self.square_size));
        }
        Ok(())
    }

    /// Number of corners a complete detection contains.
    #[inline]
    pub fn corner_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Canonical corner positions on the board plane (`z = 0`).
    ///
    /// Row-major with columns fastest, so index `i` matches index `i` of
    /// every detection of this pattern.
    pub fn world_points(&self) -> Vec<Point3<f64>> {
        let s = self.square_size;
        (0..self.rows)
            .flat_map(|j| (0..self.cols).map(move |i| Point3::new(i as f64 * s, j as f64 * s, 0.0)))
            .collect()
    }
}

/// Validate `rows`/`cols`/`square_size` and generate the world points.
pub fn generate_world_points(
    rows: u32,
    cols: u32,
    square_size: f64,
) -> Result<Vec<Point3<f64>>, PatternError> {
    Ok(ChessboardPattern::new(rows, cols, square_size)?.world_points())
}
