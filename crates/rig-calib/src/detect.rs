//! Frame batches and the corner detector capability.

use rig_calib_core::{ChessboardPattern, CornerObservation, FrameView, ImageSize};

/// Capability: find the inner corners of `pattern` in one frame.
///
/// Implementations return the corners in raster order (columns fastest
/// within each row), possibly reversed as a whole, or `None` when the
/// board is not visible.
pub trait PatternDetector {
    fn detect(
        &self,
        frame: &FrameView<'_>,
        pattern: &ChessboardPattern,
    ) -> Option<CornerObservation>;
}

impl<D: PatternDetector + ?Sized> PatternDetector for &D {
    fn detect(
        &self,
        frame: &FrameView<'_>,
        pattern: &ChessboardPattern,
    ) -> Option<CornerObservation> {
        (**self).detect(frame, pattern)
    }
}

impl<D: PatternDetector + ?Sized> PatternDetector for Box<D> {
    fn detect(
        &self,
        frame: &FrameView<'_>,
        pattern: &ChessboardPattern,
    ) -> Option<CornerObservation> {
        (**self).detect(frame, pattern)
    }
}

/// Errors describing a malformed frame batch.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("a batch needs the reference frame and at least one secondary frame (got {0})")]
    TooFewFrames(usize),
    #[error("invalid frame geometry (width={width}, height={height}, pixel_size={pixel_size})")]
    InvalidGeometry {
        width: usize,
        height: usize,
        pixel_size: usize,
    },
    #[error("frame buffer holds {got} bytes, expected {expected}")]
    BufferLength { expected: usize, got: usize },
    #[error("frame {camera} is {got:?}, expected {expected:?}")]
    SizeMismatch {
        camera: usize,
        expected: ImageSize,
        got: ImageSize,
    },
    #[error("frame {camera} holds {got} bytes, expected {expected}")]
    FrameLength {
        camera: usize,
        expected: usize,
        got: usize,
    },
}

/// One synchronized capture: frame 0 from the reference camera, then one
/// frame per secondary camera. All frames share the same geometry.
#[derive(Clone, Debug)]
pub struct FrameBatch<'a> {
    frames: Vec<FrameView<'a>>,
    size: ImageSize,
}

impl<'a> FrameBatch<'a> {
    /// Split a buffer of `camera_count` frames stored back to back.
    pub fn from_interleaved(
        buffer: &'a [u8],
        camera_count: usize,
        width: u32,
        height: u32,
        pixel_size: usize,
    ) -> Result<Self, FrameError> {
        if camera_count < 2 {
            return Err(FrameError::TooFewFrames(camera_count));
        }
        let (w, h) = (width as usize, height as usize);
        let frame_len = frame_len(w, h, pixel_size)?;
        let expected = frame_len
            .checked_mul(camera_count)
            .ok_or(FrameError::InvalidGeometry {
                width: w,
                height: h,
                pixel_size,
            })?;
        if buffer.len() != expected {
            return Err(FrameError::BufferLength {
                expected,
                got: buffer.len(),
            });
        }

        let frames = buffer
            .chunks_exact(frame_len)
            .map(|data| FrameView {
                width: w,
                height: h,
                pixel_size,
                data,
            })
            .collect();
        Ok(Self {
            frames,
            size: ImageSize::new(width, height),
        })
    }

    /// Wrap already separated frames, reference first.
    pub fn from_frames(frames: Vec<FrameView<'a>>) -> Result<Self, FrameError> {
        if frames.len() < 2 {
            return Err(FrameError::TooFewFrames(frames.len()));
        }
        let size = frame_size(&frames[0])?;
        for (camera, frame) in frames.iter().enumerate() {
            let got = frame_size(frame)?;
            if got != size {
                return Err(FrameError::SizeMismatch {
                    camera,
                    expected: size,
                    got,
                });
            }
            let expected = frame_len(frame.width, frame.height, frame.pixel_size)?;
            if frame.data.len() != expected {
                return Err(FrameError::FrameLength {
                    camera,
                    expected,
                    got: frame.data.len(),
                });
            }
        }
        Ok(Self { frames, size })
    }

    #[inline]
    pub fn camera_count(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn image_size(&self) -> ImageSize {
        self.size
    }

    #[inline]
    pub fn reference(&self) -> &FrameView<'a> {
        &self.frames[rig_calib_core::REFERENCE_CAMERA]
    }

    /// Frame of camera `camera` (0 is the reference).
    #[inline]
    pub fn frame(&self, camera: usize) -> Option<&FrameView<'a>> {
        self.frames.get(camera)
    }

    pub fn frames(&self) -> &[FrameView<'a>] {
        &self.frames
    }
}

fn frame_size(frame: &FrameView<'_>) -> Result<ImageSize, FrameError> {
    frame.size().ok_or(FrameError::InvalidGeometry {
        width: frame.width,
        height: frame.height,
        pixel_size: frame.pixel_size,
    })
}

fn frame_len(width: usize, height: usize, pixel_size: usize) -> Result<usize, FrameError> {
    let invalid = FrameError::InvalidGeometry {
        width,
        height,
        pixel_size,
    };
    if width == 0 || height == 0 || pixel_size == 0 {
        return Err(invalid);
    }
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(pixel_size))
        .ok_or(invalid)
}
