use std::path::Path;

use image::{ExtendedColorType, ImageFormat};

use crate::error::SinkError;
use crate::sink::{RasterSink, SinkFormat, SinkImage};

/// Writes rasters as PNG through the `image` crate.
#[derive(Copy, Clone, Debug, Default)]
pub struct PngSink;

impl RasterSink for PngSink {
    fn save(&self, image: &SinkImage<'_>, path: &Path) -> Result<(), SinkError> {
        let (buffer, color) = unpack(image)?;
        image::save_buffer_with_format(
            path,
            &buffer,
            image.width,
            image.height,
            color,
            ImageFormat::Png,
        )?;
        log::debug!(
            "wrote {}x{} {:?} PNG to {}",
            image.width,
            image.height,
            color,
            path.display()
        );
        Ok(())
    }
}

/// Expands a sink raster into tightly packed 8-bit RGB or RGBA rows.
pub fn unpack(image: &SinkImage<'_>) -> Result<(Vec<u8>, ExtendedColorType), SinkError> {
    let width = image.width as usize;
    let height = image.height as usize;
    let row = width.saturating_mul(image.format.bytes_per_pixel());
    if image.stride < row {
        return Err(SinkError::StrideTooSmall {
            stride: image.stride,
            row,
        });
    }
    let needed = match height {
        0 => 0,
        h => image.stride.saturating_mul(h - 1).saturating_add(row),
    };
    if image.pixels.len() < needed {
        return Err(SinkError::BufferTooSmall {
            needed,
            actual: image.pixels.len(),
        });
    }

    let (channels, color) = if image.format.has_alpha() {
        (4, ExtendedColorType::Rgba8)
    } else {
        (3, ExtendedColorType::Rgb8)
    };
    let mut out = Vec::with_capacity(width * height * channels);

    for y in 0..height {
        let start = y * image.stride;
        let src = &image.pixels[start..start + row];
        match image.format {
            SinkFormat::Bgr24 => {
                for px in src.chunks_exact(3) {
                    out.extend_from_slice(&[px[2], px[1], px[0]]);
                }
            }
            SinkFormat::Bgra32 => {
                for px in src.chunks_exact(4) {
                    out.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
                }
            }
            SinkFormat::Rgb555 => {
                for word in words(src) {
                    out.extend_from_slice(&rgb555(word));
                }
            }
            SinkFormat::Rgb565 => {
                for word in words(src) {
                    let r = expand5((word >> 11) & 0x1F);
                    let g = expand6((word >> 5) & 0x3F);
                    let b = expand5(word & 0x1F);
                    out.extend_from_slice(&[r, g, b]);
                }
            }
            SinkFormat::Argb1555 => {
                for word in words(src) {
                    let [r, g, b] = rgb555(word);
                    let a = if word & 0x8000 != 0 { 255 } else { 0 };
                    out.extend_from_slice(&[r, g, b, a]);
                }
            }
        }
    }

    Ok((out, color))
}

fn words(row: &[u8]) -> impl Iterator<Item = u16> + '_ {
    row.chunks_exact(2).map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn rgb555(word: u16) -> [u8; 3] {
    [
        expand5((word >> 10) & 0x1F),
        expand5((word >> 5) & 0x1F),
        expand5(word & 0x1F),
    ]
}

fn expand5(v: u16) -> u8 {
    ((u32::from(v) * 255 + 15) / 31) as u8
}

fn expand6(v: u16) -> u8 {
    ((u32::from(v) * 255 + 31) / 63) as u8
}
