//! Incremental accumulation of stereo samples across frame batches.
//!
//! Every secondary camera owns an accumulator keyed by its camera index.
//! Once an accumulator holds strictly more samples than required, its pair
//! is solved; when every pair solves in the same submit the session reports
//! completion and starts over from empty accumulators.

mod accumulator;
mod error;
mod params;
mod pipeline;
mod result;

pub use accumulator::PairAccumulator;
pub use error::SessionError;
pub use params::SessionConfig;
pub use pipeline::AccumulationSession;
pub use result::{CameraOutcome, DetectionStatus, PairStatus, SessionResult};
