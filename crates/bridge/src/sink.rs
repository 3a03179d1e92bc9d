use std::path::Path;

use crate::error::SinkError;

/// Pixel formats accepted by a [`RasterSink`].
///
/// Each variant has the same memory layout as the matching decoded format:
/// `Bgr24` is B, G, R; `Bgra32` is B, G, R, A; the 16-bit variants are packed
/// little-endian words.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SinkFormat {
    Bgr24,
    Bgra32,
    Rgb555,
    Rgb565,
    Argb1555,
}

impl SinkFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb555 | Self::Rgb565 | Self::Argb1555 => 2,
            Self::Bgr24 => 3,
            Self::Bgra32 => 4,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, Self::Bgra32 | Self::Argb1555)
    }
}

/// Borrowed raster handed to a sink. Never owns the pixel bytes.
#[derive(Copy, Clone, Debug)]
pub struct SinkImage<'a> {
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub format: SinkFormat,
    pub pixels: &'a [u8],
}

pub trait RasterSink {
    /// Writes `image` to `path`, replacing any existing file.
    fn save(&self, image: &SinkImage<'_>, path: &Path) -> Result<(), SinkError>;
}

impl<T: RasterSink + ?Sized> RasterSink for &T {
    fn save(&self, image: &SinkImage<'_>, path: &Path) -> Result<(), SinkError> {
        (**self).save(image, path)
    }
}
