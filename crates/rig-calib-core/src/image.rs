use serde::{Deserialize, Serialize};

/// Image dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Borrowed, caller-owned frame buffer.
///
/// Row-major, `pixel_size` bytes per pixel (4 for BGRA). The core never
/// keeps a view past the call it was handed to.
#[derive(Clone, Copy, Debug)]
pub struct FrameView<'a> {
    pub width: usize,
    pub height: usize,
    pub pixel_size: usize,
    pub data: &'a [u8], // len = w*h*pixel_size
}

impl FrameView<'_> {
    /// Dimensions as an [`ImageSize`], or `None` if either does not fit `u32`.
    #[inline]
    pub fn size(&self) -> Option<ImageSize> {
        let width = u32::try_from(self.width).ok()?;
        let height = u32::try_from(self.height).ok()?;
        Some(ImageSize::new(width, height))
    }

    /// Bytes of pixel `(x, y)`, or `None` outside the frame.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y * self.width + x) * self.pixel_size;
        self.data.get(start..start + self.pixel_size)
    }
}
