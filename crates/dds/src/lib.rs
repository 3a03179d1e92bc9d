pub mod error;

mod bc;
mod decode;
mod limits;

use std::io::Cursor;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::Error;

pub use crate::decode::decode_level;
pub use crate::limits::Limits;

pub type Result<T> = core::result::Result<T, Error>;

pub const DDS_MAGIC: u32 = 0x2053_4444;
pub const HEADER_SIZE: u32 = 124;
pub const PIXEL_FORMAT_SIZE: u32 = 32;
pub const DX10_HEADER_SIZE: usize = 20;
pub const PALETTE_SIZE: usize = 1024;

pub const DDSD_MIPMAPCOUNT: u32 = 0x0002_0000;
pub const DDSD_DEPTH: u32 = 0x0080_0000;

pub const DDPF_ALPHAPIXELS: u32 = 0x0000_0001;
pub const DDPF_FOURCC: u32 = 0x0000_0004;
pub const DDPF_PALETTEINDEXED8: u32 = 0x0000_0020;
pub const DDPF_RGB: u32 = 0x0000_0040;
pub const DDPF_LUMINANCE: u32 = 0x0002_0000;

pub const DDSCAPS2_CUBEMAP: u32 = 0x0000_0200;
pub const DDSCAPS2_VOLUME: u32 = 0x0020_0000;

const D3D10_RESOURCE_DIMENSION_TEXTURE2D: u32 = 3;
const D3D10_RESOURCE_MISC_TEXTURECUBE: u32 = 0x4;

pub const fn four_cc(code: &[u8; 4]) -> u32 {
    u32::from_le_bytes(*code)
}

/// Pixel layout of a decoded level, as laid out in memory.
///
/// Multi-byte layouts follow the little-endian word order used by DIB-style
/// raster APIs: `Rgba32` is stored as B, G, R, A and the 16-bit layouts are
/// packed little-endian words with blue in the low bits.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Rgb24,
    Rgba32,
    Rgb555,
    Rgb565,
    Argb1555,
    Argb4444,
    Gray8,
    Indexed8,
}

impl SourceFormat {
    pub const ALL: [SourceFormat; 8] = [
        Self::Rgb24,
        Self::Rgba32,
        Self::Rgb555,
        Self::Rgb565,
        Self::Argb1555,
        Self::Argb4444,
        Self::Gray8,
        Self::Indexed8,
    ];

    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Gray8 | Self::Indexed8 => 1,
            Self::Rgb555 | Self::Rgb565 | Self::Argb1555 | Self::Argb4444 => 2,
            Self::Rgb24 => 3,
            Self::Rgba32 => 4,
        }
    }

    /// Row stride for `width` pixels, padded to a 4-byte boundary.
    pub fn stride(self, width: u32) -> Result<usize> {
        let bits = usize::try_from(width)
            .ok()
            .and_then(|w| w.checked_mul(self.bytes_per_pixel() * 8))
            .and_then(|b| b.checked_add(31))
            .ok_or(Error::IntegerOverflow)?;
        Ok(bits / 32 * 4)
    }
}

/// Byte layout of uncompressed pixels as stored in the file.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RawLayout {
    Bgra8888,
    Bgrx8888,
    Rgba8888,
    Rgbx8888,
    Bgr888,
    Xrgb1555,
    Argb1555,
    Rgb565,
    Argb4444,
    Xrgb4444,
    L8,
    P8,
}

impl RawLayout {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Bgra8888 | Self::Bgrx8888 | Self::Rgba8888 | Self::Rgbx8888 => 4,
            Self::Bgr888 => 3,
            Self::Xrgb1555 | Self::Argb1555 | Self::Rgb565 | Self::Argb4444 | Self::Xrgb4444 => 2,
            Self::L8 | Self::P8 => 1,
        }
    }

    pub fn source_format(self) -> SourceFormat {
        match self {
            Self::Bgra8888 | Self::Bgrx8888 | Self::Rgba8888 | Self::Rgbx8888 => {
                SourceFormat::Rgba32
            }
            Self::Bgr888 => SourceFormat::Rgb24,
            Self::Xrgb1555 => SourceFormat::Rgb555,
            Self::Argb1555 => SourceFormat::Argb1555,
            Self::Rgb565 => SourceFormat::Rgb565,
            Self::Argb4444 | Self::Xrgb4444 => SourceFormat::Argb4444,
            Self::L8 => SourceFormat::Gray8,
            Self::P8 => SourceFormat::Indexed8,
        }
    }
}

/// How mip level bytes are encoded in the file.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Storage {
    Uncompressed(RawLayout),
    Bc1,
    Bc2,
    Bc3,
}

impl Storage {
    pub fn source_format(self) -> SourceFormat {
        match self {
            Self::Uncompressed(layout) => layout.source_format(),
            Self::Bc1 | Self::Bc2 | Self::Bc3 => SourceFormat::Rgba32,
        }
    }

    /// Size in bytes of one stored level of `width` x `height` pixels.
    pub fn level_size(self, width: u32, height: u32) -> Option<usize> {
        let w = usize::try_from(width).ok()?;
        let h = usize::try_from(height).ok()?;
        match self {
            Self::Uncompressed(layout) => w.checked_mul(h)?.checked_mul(layout.bytes_per_pixel()),
            Self::Bc1 => blocks(w)?.checked_mul(blocks(h)?)?.checked_mul(8),
            Self::Bc2 | Self::Bc3 => blocks(w)?.checked_mul(blocks(h)?)?.checked_mul(16),
        }
    }
}

fn blocks(extent: usize) -> Option<usize> {
    Some(extent.checked_add(3)? / 4)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PixelFormatBlock {
    pub size: u32,
    pub flags: u32,
    pub four_cc: u32,
    pub rgb_bit_count: u32,
    pub r_mask: u32,
    pub g_mask: u32,
    pub b_mask: u32,
    pub a_mask: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Dx10Header {
    pub dxgi_format: u32,
    pub resource_dimension: u32,
    pub misc_flag: u32,
    pub array_size: u32,
    pub misc_flags2: u32,
}

#[derive(Clone, Debug)]
pub struct Header {
    pub flags: u32,
    pub height: u32,
    pub width: u32,
    pub pitch_or_linear_size: u32,
    pub depth: u32,
    pub mip_map_count: u32,
    pub pixel_format: PixelFormatBlock,
    pub caps: u32,
    pub caps2: u32,
    pub dx10: Option<Dx10Header>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub offset: usize,
    pub size: usize,
}

#[derive(Clone, Debug)]
pub struct Texture {
    pub header: Header,
    pub storage: Storage,
    pub mip_levels: Vec<MipLevel>,
}

impl Texture {
    pub fn format(&self) -> SourceFormat {
        self.storage.source_format()
    }
}

/// One decoded mip level.
///
/// `pixels` holds `stride * height` bytes; rows are padded to a 4-byte
/// boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub format: SourceFormat,
    pub pixels: Vec<u8>,
}

#[derive(Clone, Debug, Default)]
pub struct DecodeOptions {
    pub mip_level: usize,
    pub limits: Limits,
}

pub fn decode_file(path: impl AsRef<Path>, opts: &DecodeOptions) -> Result<ImageDescriptor> {
    let bytes = std::fs::read(path.as_ref())?;
    decode_bytes(&bytes, opts)
}

pub fn decode_bytes(payload: &[u8], opts: &DecodeOptions) -> Result<ImageDescriptor> {
    let texture = parse_dds(payload)?;
    opts.limits
        .check(texture.header.width, texture.header.height)?;
    decode_level(&texture, payload, opts.mip_level)
}

pub fn parse_dds(payload: &[u8]) -> Result<Texture> {
    let base_size = 4 + HEADER_SIZE as usize;
    if payload.len() < base_size {
        return Err(Error::HeaderTooSmall {
            size: payload.len(),
        });
    }

    let mut cursor = Cursor::new(payload);
    let magic = cursor.read_u32::<LittleEndian>()?;
    if magic != DDS_MAGIC {
        return Err(Error::InvalidMagic { got: magic });
    }

    let header_size = cursor.read_u32::<LittleEndian>()?;
    if header_size != HEADER_SIZE {
        return Err(Error::InvalidHeaderSize { got: header_size });
    }
    let flags = cursor.read_u32::<LittleEndian>()?;
    let height = cursor.read_u32::<LittleEndian>()?;
    let width = cursor.read_u32::<LittleEndian>()?;
    let pitch_or_linear_size = cursor.read_u32::<LittleEndian>()?;
    let depth = cursor.read_u32::<LittleEndian>()?;
    let mip_map_count = cursor.read_u32::<LittleEndian>()?;
    // reserved1[11]
    cursor.set_position(cursor.position() + 44);

    let pixel_format = read_pixel_format(&mut cursor)?;
    let caps = cursor.read_u32::<LittleEndian>()?;
    let caps2 = cursor.read_u32::<LittleEndian>()?;

    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions { width, height });
    }
    if caps2 & DDSCAPS2_CUBEMAP != 0 {
        return Err(Error::UnsupportedDimension("cube map"));
    }
    if caps2 & DDSCAPS2_VOLUME != 0 || (flags & DDSD_DEPTH != 0 && depth > 1) {
        return Err(Error::UnsupportedDimension("volume texture"));
    }

    let mut offset = base_size;
    let dx10 = if pixel_format.flags & DDPF_FOURCC != 0 && pixel_format.four_cc == four_cc(b"DX10")
    {
        let end = offset
            .checked_add(DX10_HEADER_SIZE)
            .ok_or(Error::IntegerOverflow)?;
        if end > payload.len() {
            return Err(Error::HeaderTooSmall {
                size: payload.len(),
            });
        }
        cursor.set_position(offset as u64);
        let dx10 = Dx10Header {
            dxgi_format: cursor.read_u32::<LittleEndian>()?,
            resource_dimension: cursor.read_u32::<LittleEndian>()?,
            misc_flag: cursor.read_u32::<LittleEndian>()?,
            array_size: cursor.read_u32::<LittleEndian>()?,
            misc_flags2: cursor.read_u32::<LittleEndian>()?,
        };
        if dx10.resource_dimension != D3D10_RESOURCE_DIMENSION_TEXTURE2D {
            return Err(Error::UnsupportedDimension("non-2D resource"));
        }
        if dx10.misc_flag & D3D10_RESOURCE_MISC_TEXTURECUBE != 0 {
            return Err(Error::UnsupportedDimension("cube map"));
        }
        if dx10.array_size > 1 {
            return Err(Error::UnsupportedDimension("texture array"));
        }
        offset = end;
        Some(dx10)
    } else {
        None
    };

    let storage = classify(&pixel_format, dx10.as_ref())?;
    if storage == Storage::Uncompressed(RawLayout::P8) {
        // The palette is not carried into the decoded image.
        offset = offset
            .checked_add(PALETTE_SIZE)
            .ok_or(Error::IntegerOverflow)?;
    }

    let declared_mips = if flags & DDSD_MIPMAPCOUNT != 0 && mip_map_count > 0 {
        mip_map_count
    } else {
        1
    };
    // Levels past 1x1 do not exist; extra declared levels are ignored.
    let mip_count = declared_mips.min(full_mip_chain(width, height)) as usize;
    if mip_count < declared_mips as usize {
        log::debug!("clamping {declared_mips} declared mips to {mip_count}");
    }
    log::debug!(
        "DDS header: {width}x{height}, storage={storage:?}, mips={mip_count}, dx10={}",
        dx10.is_some()
    );

    let mut mip_levels = Vec::with_capacity(mip_count);
    let mut w = width;
    let mut h = height;
    for _ in 0..mip_count {
        let size = storage.level_size(w, h).ok_or(Error::IntegerOverflow)?;
        let end = offset.checked_add(size).ok_or(Error::IntegerOverflow)?;
        if end > payload.len() {
            return Err(Error::DataOutOfBounds {
                offset,
                size,
                payload_size: payload.len(),
            });
        }
        mip_levels.push(MipLevel {
            width: w,
            height: h,
            offset,
            size,
        });
        offset = end;
        w = (w >> 1).max(1);
        h = (h >> 1).max(1);
    }

    Ok(Texture {
        header: Header {
            flags,
            height,
            width,
            pitch_or_linear_size,
            depth,
            mip_map_count,
            pixel_format,
            caps,
            caps2,
            dx10,
        },
        storage,
        mip_levels,
    })
}

/// Number of levels from `width` x `height` down to 1x1.
fn full_mip_chain(width: u32, height: u32) -> u32 {
    u32::BITS - width.max(height).leading_zeros()
}

fn read_pixel_format(cursor: &mut Cursor<&[u8]>) -> Result<PixelFormatBlock> {
    let size = cursor.read_u32::<LittleEndian>()?;
    if size != PIXEL_FORMAT_SIZE {
        return Err(Error::InvalidPixelFormatSize { got: size });
    }
    Ok(PixelFormatBlock {
        size,
        flags: cursor.read_u32::<LittleEndian>()?,
        four_cc: cursor.read_u32::<LittleEndian>()?,
        rgb_bit_count: cursor.read_u32::<LittleEndian>()?,
        r_mask: cursor.read_u32::<LittleEndian>()?,
        g_mask: cursor.read_u32::<LittleEndian>()?,
        b_mask: cursor.read_u32::<LittleEndian>()?,
        a_mask: cursor.read_u32::<LittleEndian>()?,
    })
}

fn classify(pf: &PixelFormatBlock, dx10: Option<&Dx10Header>) -> Result<Storage> {
    if let Some(dx10) = dx10 {
        return classify_dxgi(dx10.dxgi_format);
    }
    if pf.flags & DDPF_FOURCC != 0 {
        return match &pf.four_cc.to_le_bytes() {
            b"DXT1" => Ok(Storage::Bc1),
            // Premultiplied variants decode the same way.
            b"DXT2" | b"DXT3" => Ok(Storage::Bc2),
            b"DXT4" | b"DXT5" => Ok(Storage::Bc3),
            _ => Err(Error::UnsupportedFourCc {
                four_cc: pf.four_cc,
            }),
        };
    }

    let has_alpha = pf.flags & DDPF_ALPHAPIXELS != 0 && pf.a_mask != 0;
    let layout = if pf.flags & DDPF_PALETTEINDEXED8 != 0 && pf.rgb_bit_count == 8 {
        Some(RawLayout::P8)
    } else if pf.flags & DDPF_LUMINANCE != 0 && pf.rgb_bit_count == 8 {
        Some(RawLayout::L8)
    } else if pf.flags & DDPF_RGB != 0 {
        match (pf.rgb_bit_count, pf.r_mask, pf.g_mask, pf.b_mask) {
            (32, 0x00FF_0000, 0x0000_FF00, 0x0000_00FF) if has_alpha => Some(RawLayout::Bgra8888),
            (32, 0x00FF_0000, 0x0000_FF00, 0x0000_00FF) => Some(RawLayout::Bgrx8888),
            (32, 0x0000_00FF, 0x0000_FF00, 0x00FF_0000) if has_alpha => Some(RawLayout::Rgba8888),
            (32, 0x0000_00FF, 0x0000_FF00, 0x00FF_0000) => Some(RawLayout::Rgbx8888),
            (24, 0x00FF_0000, 0x0000_FF00, 0x0000_00FF) => Some(RawLayout::Bgr888),
            (16, 0x7C00, 0x03E0, 0x001F) if has_alpha => Some(RawLayout::Argb1555),
            (16, 0x7C00, 0x03E0, 0x001F) => Some(RawLayout::Xrgb1555),
            (16, 0xF800, 0x07E0, 0x001F) => Some(RawLayout::Rgb565),
            (16, 0x0F00, 0x00F0, 0x000F) if has_alpha => Some(RawLayout::Argb4444),
            (16, 0x0F00, 0x00F0, 0x000F) => Some(RawLayout::Xrgb4444),
            _ => None,
        }
    } else {
        None
    };

    layout.map(Storage::Uncompressed).ok_or(Error::UnsupportedMasks {
        bit_count: pf.rgb_bit_count,
        r_mask: pf.r_mask,
        g_mask: pf.g_mask,
        b_mask: pf.b_mask,
        a_mask: pf.a_mask,
    })
}

fn classify_dxgi(dxgi_format: u32) -> Result<Storage> {
    let storage = match dxgi_format {
        27..=29 => Storage::Uncompressed(RawLayout::Rgba8888),
        70..=72 => Storage::Bc1,
        73..=75 => Storage::Bc2,
        76..=78 => Storage::Bc3,
        85 => Storage::Uncompressed(RawLayout::Rgb565),
        86 => Storage::Uncompressed(RawLayout::Argb1555),
        87 | 90 | 91 => Storage::Uncompressed(RawLayout::Bgra8888),
        88 | 92 | 93 => Storage::Uncompressed(RawLayout::Bgrx8888),
        115 => Storage::Uncompressed(RawLayout::Argb4444),
        _ => return Err(Error::UnsupportedDxgiFormat { dxgi_format }),
    };
    Ok(storage)
}
