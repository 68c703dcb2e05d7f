use rig_calib_core::CorrespondencePair;

use super::PairStatus;

/// Samples collected for one secondary camera.
///
/// Grows by one pair per accepted batch and is only emptied when the whole
/// session completes or is reset.
#[derive(Clone, Debug)]
pub struct PairAccumulator {
    camera: usize,
    pairs: Vec<CorrespondencePair>,
    /// Outcome of the last solve and the sample count it used.
    last_solve: Option<(usize, PairStatus)>,
}

impl PairAccumulator {
    pub(crate) fn new(camera: usize) -> Self {
        Self {
            camera,
            pairs: Vec::new(),
            last_solve: None,
        }
    }

    #[inline]
    pub fn camera(&self) -> usize {
        self.camera
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[CorrespondencePair] {
        &self.pairs
    }

    pub(crate) fn push(&mut self, pair: CorrespondencePair) {
        self.pairs.push(pair);
    }

    pub(crate) fn clear(&mut self) {
        self.pairs.clear();
        self.last_solve = None;
    }

    /// Solve outcome for the current samples, if it was already computed.
    pub(crate) fn cached(&self) -> Option<&PairStatus> {
        match &self.last_solve {
            Some((n, status)) if *n == self.pairs.len() => Some(status),
            _ => None,
        }
    }

    pub(crate) fn remember(&mut self, status: PairStatus) {
        self.last_solve = Some((self.pairs.len(), status));
    }
}
