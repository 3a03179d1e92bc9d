use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("texture file reading error")]
    #[diagnostic(code(dds::io_error))]
    Io(#[from] std::io::Error),

    #[error("DDS payload too small for header: {size} bytes")]
    #[diagnostic(code(dds::header_too_small))]
    HeaderTooSmall { size: usize },

    #[error("invalid DDS magic: 0x{got:08X}")]
    #[diagnostic(code(dds::invalid_magic), help("the file is not a DirectDraw Surface"))]
    InvalidMagic { got: u32 },

    #[error("invalid DDS header size: {got} (expected 124)")]
    #[diagnostic(code(dds::invalid_header_size))]
    InvalidHeaderSize { got: u32 },

    #[error("invalid DDS pixel format size: {got} (expected 32)")]
    #[diagnostic(code(dds::invalid_pixel_format_size))]
    InvalidPixelFormatSize { got: u32 },

    #[error("invalid DDS dimensions: {width}x{height}")]
    #[diagnostic(code(dds::invalid_dimensions))]
    InvalidDimensions { width: u32, height: u32 },

    #[error("unsupported FourCC code 0x{four_cc:08X}")]
    #[diagnostic(code(dds::unsupported_four_cc))]
    UnsupportedFourCc { four_cc: u32 },

    #[error("unsupported DXGI format {dxgi_format}")]
    #[diagnostic(code(dds::unsupported_dxgi_format))]
    UnsupportedDxgiFormat { dxgi_format: u32 },

    #[error(
        "unsupported pixel masks: bits={bit_count}, r=0x{r_mask:08X}, g=0x{g_mask:08X}, b=0x{b_mask:08X}, a=0x{a_mask:08X}"
    )]
    #[diagnostic(code(dds::unsupported_masks))]
    UnsupportedMasks {
        bit_count: u32,
        r_mask: u32,
        g_mask: u32,
        b_mask: u32,
        a_mask: u32,
    },

    #[error("unsupported texture dimension: {0}")]
    #[diagnostic(
        code(dds::unsupported_dimension),
        help("only single 2D textures can be converted")
    )]
    UnsupportedDimension(&'static str),

    #[error("DDS data out of bounds: offset={offset}, size={size}, payload_size={payload_size}")]
    #[diagnostic(code(dds::data_out_of_bounds), help("the file is probably truncated"))]
    DataOutOfBounds {
        offset: usize,
        size: usize,
        payload_size: usize,
    },

    #[error("mip index out of range: requested={requested}, mip_count={mip_count}")]
    #[diagnostic(code(dds::mip_index_out_of_range))]
    MipIndexOutOfRange { requested: usize, mip_count: usize },

    #[error("limit exceeded: {0}")]
    #[diagnostic(code(dds::limit_exceeded))]
    LimitExceeded(String),

    #[error("integer overflow")]
    #[diagnostic(code(dds::integer_overflow))]
    IntegerOverflow,
}
