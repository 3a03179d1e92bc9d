use std::path::PathBuf;

use dds::SourceFormat;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("failed to decode {path:?}")]
    #[diagnostic(code(bridge::decode_error))]
    Decode {
        path: PathBuf,
        #[source]
        #[diagnostic_source]
        source: dds::error::Error,
    },

    #[error("unsupported pixel format: {0:?}")]
    #[diagnostic(
        code(bridge::unsupported_format),
        help("only 24-bit RGB, 32-bit RGBA and 16-bit 555/565/1555 images can be saved")
    )]
    UnsupportedFormat(SourceFormat),

    #[error("failed to save {path:?}")]
    #[diagnostic(code(bridge::encode_error))]
    Encode {
        path: PathBuf,
        #[source]
        #[diagnostic_source]
        source: SinkError,
    },
}

#[derive(Error, Diagnostic, Debug)]
#[non_exhaustive]
pub enum SinkError {
    #[error("image encoding error")]
    #[diagnostic(code(bridge::image_error))]
    Image(#[from] image::ImageError),

    #[error("output file writing error")]
    #[diagnostic(code(bridge::io_error))]
    Io(#[from] std::io::Error),

    #[error("stride {stride} is smaller than a row of {row} bytes")]
    #[diagnostic(code(bridge::stride_too_small))]
    StrideTooSmall { stride: usize, row: usize },

    #[error("buffer too small: need {needed} bytes, got {actual}")]
    #[diagnostic(code(bridge::buffer_too_small))]
    BufferTooSmall { needed: usize, actual: usize },
}
