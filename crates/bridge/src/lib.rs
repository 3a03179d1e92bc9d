//! Hands decoded DDS pixels to a raster sink without copying them.
//!
//! `convert` decodes the input, maps its pixel format through a fixed table,
//! leases the pixel buffer for the duration of the sink's save call and
//! releases it on every exit path.

pub mod error;

mod lease;
mod png;
mod sink;

use std::path::Path;

use dds::{DecodeOptions, ImageDescriptor, SourceFormat};

use crate::error::Error;

pub use crate::error::SinkError;
pub use crate::lease::{LeaseObserver, LogObserver, PixelLease};
pub use crate::png::{unpack, PngSink};
pub use crate::sink::{RasterSink, SinkFormat, SinkImage};

pub type Result<T> = core::result::Result<T, Error>;

/// Source formats the sink can take as-is. Everything else is unsupported.
pub const FORMAT_TABLE: [(SourceFormat, SinkFormat); 5] = [
    (SourceFormat::Rgb24, SinkFormat::Bgr24),
    (SourceFormat::Rgba32, SinkFormat::Bgra32),
    (SourceFormat::Rgb555, SinkFormat::Rgb555),
    (SourceFormat::Rgb565, SinkFormat::Rgb565),
    (SourceFormat::Argb1555, SinkFormat::Argb1555),
];

pub fn map_format(source: SourceFormat) -> Result<SinkFormat> {
    FORMAT_TABLE
        .iter()
        .find(|(from, _)| *from == source)
        .map(|(_, to)| *to)
        .ok_or(Error::UnsupportedFormat(source))
}

pub trait Decode {
    fn decode(&self, path: &Path) -> dds::Result<ImageDescriptor>;
}

/// Reads and decodes DDS files from disk.
#[derive(Clone, Debug, Default)]
pub struct DdsDecoder {
    pub options: DecodeOptions,
}

impl Decode for DdsDecoder {
    fn decode(&self, path: &Path) -> dds::Result<ImageDescriptor> {
        dds::decode_file(path, &self.options)
    }
}

pub struct FormatBridge<D = DdsDecoder, S = PngSink, O = LogObserver> {
    decoder: D,
    sink: S,
    observer: O,
}

impl FormatBridge {
    pub fn new() -> Self {
        Self::with_parts(DdsDecoder::default(), PngSink, LogObserver)
    }

    pub fn with_options(options: DecodeOptions) -> Self {
        Self::with_parts(DdsDecoder { options }, PngSink, LogObserver)
    }
}

impl Default for FormatBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Decode, S: RasterSink, O: LeaseObserver> FormatBridge<D, S, O> {
    pub fn with_parts(decoder: D, sink: S, observer: O) -> Self {
        Self {
            decoder,
            sink,
            observer,
        }
    }

    /// Decodes `path` and saves it to `new_path` as PNG.
    ///
    /// Nothing is written when decoding fails or the pixel format is not in
    /// [`FORMAT_TABLE`]. A save failure is reported after the lease is
    /// released.
    pub fn convert(&self, path: impl AsRef<Path>, new_path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let new_path = new_path.as_ref();

        let descriptor = self
            .decoder
            .decode(path)
            .map_err(|source| Error::Decode {
                path: path.to_path_buf(),
                source,
            })?;
        let format = map_format(descriptor.format)?;
        log::debug!(
            "{}: {}x{} {:?} -> {:?}",
            path.display(),
            descriptor.width,
            descriptor.height,
            descriptor.format,
            format
        );

        let lease = PixelLease::acquire(&descriptor.pixels, &self.observer);
        let image = SinkImage {
            width: descriptor.width,
            height: descriptor.height,
            stride: descriptor.stride,
            format,
            pixels: lease.pixels(),
        };
        let saved = self.sink.save(&image, new_path);
        drop(lease);

        saved.map_err(|source| Error::Encode {
            path: new_path.to_path_buf(),
            source,
        })?;
        log::info!("converted {} -> {}", path.display(), new_path.display());
        Ok(())
    }
}

/// Converts one DDS file to PNG with default options.
pub fn convert(path: impl AsRef<Path>, new_path: impl AsRef<Path>) -> Result<()> {
    FormatBridge::new().convert(path, new_path)
}

#[cfg(test)]
mod tests;
