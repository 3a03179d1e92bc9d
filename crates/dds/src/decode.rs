use crate::error::Error;
use crate::{bc, ImageDescriptor, MipLevel, RawLayout, Result, SourceFormat, Storage, Texture};

/// Decodes one mip level of a parsed texture.
///
/// Uncompressed levels keep their packed layout (32-bit layouts are
/// normalized to B, G, R, A); block-compressed levels are expanded to
/// [`SourceFormat::Rgba32`].
pub fn decode_level(texture: &Texture, payload: &[u8], mip_index: usize) -> Result<ImageDescriptor> {
    let Some(level) = texture.mip_levels.get(mip_index).copied() else {
        return Err(Error::MipIndexOutOfRange {
            requested: mip_index,
            mip_count: texture.mip_levels.len(),
        });
    };

    let end = level
        .offset
        .checked_add(level.size)
        .ok_or(Error::IntegerOverflow)?;
    let Some(level_data) = payload.get(level.offset..end) else {
        return Err(Error::DataOutOfBounds {
            offset: level.offset,
            size: level.size,
            payload_size: payload.len(),
        });
    };

    let format = texture.storage.source_format();
    let mut image = allocate(level, format)?;
    match texture.storage {
        Storage::Uncompressed(layout) => unpack_rows(layout, level_data, &mut image),
        Storage::Bc1 => bc::decode_bc1(level_data, &mut image),
        Storage::Bc2 => bc::decode_bc2(level_data, &mut image),
        Storage::Bc3 => bc::decode_bc3(level_data, &mut image),
    }
    log::debug!(
        "decoded mip {mip_index}: {}x{} {:?}, stride={}",
        image.width,
        image.height,
        image.format,
        image.stride
    );
    Ok(image)
}

fn allocate(level: MipLevel, format: SourceFormat) -> Result<ImageDescriptor> {
    let stride = format.stride(level.width)?;
    let rows = usize::try_from(level.height).map_err(|_| Error::IntegerOverflow)?;
    let size = stride.checked_mul(rows).ok_or(Error::IntegerOverflow)?;
    Ok(ImageDescriptor {
        width: level.width,
        height: level.height,
        stride,
        format,
        pixels: vec![0u8; size],
    })
}

fn unpack_rows(layout: RawLayout, data: &[u8], image: &mut ImageDescriptor) {
    let width = image.width as usize;
    let src_pitch = width * layout.bytes_per_pixel();
    let dst_pitch = width * image.format.bytes_per_pixel();

    for (src, dst) in data
        .chunks_exact(src_pitch)
        .zip(image.pixels.chunks_exact_mut(image.stride))
    {
        let dst = &mut dst[..dst_pitch];
        match layout {
            RawLayout::Bgrx8888 => {
                for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
                    d.copy_from_slice(&[s[0], s[1], s[2], 0xFF]);
                }
            }
            RawLayout::Rgba8888 => {
                for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
                    d.copy_from_slice(&[s[2], s[1], s[0], s[3]]);
                }
            }
            RawLayout::Rgbx8888 => {
                for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
                    d.copy_from_slice(&[s[2], s[1], s[0], 0xFF]);
                }
            }
            RawLayout::Xrgb4444 => {
                for (s, d) in src.chunks_exact(2).zip(dst.chunks_exact_mut(2)) {
                    let word = u16::from_le_bytes([s[0], s[1]]) | 0xF000;
                    d.copy_from_slice(&word.to_le_bytes());
                }
            }
            RawLayout::Bgra8888
            | RawLayout::Bgr888
            | RawLayout::Xrgb1555
            | RawLayout::Argb1555
            | RawLayout::Rgb565
            | RawLayout::Argb4444
            | RawLayout::L8
            | RawLayout::P8 => dst.copy_from_slice(src),
        }
    }
}
