use rig_calib_core::ChessboardPattern;
use serde::{Deserialize, Serialize};

fn default_required_samples() -> usize {
    10
}

/// Static configuration of an accumulation session.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Board seen by every camera.
    pub pattern: ChessboardPattern,
    /// A pair is solved once it holds strictly more samples than this.
    #[serde(default = "default_required_samples")]
    pub required_samples: usize,
}

impl SessionConfig {
    pub fn new(pattern: ChessboardPattern, required_samples: usize) -> Self {
        Self {
            pattern,
            required_samples,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pattern: ChessboardPattern {
                rows: 6,
                cols: 9,
                square_size: 1.0,
            },
            required_samples: default_required_samples(),
        }
    }
}
