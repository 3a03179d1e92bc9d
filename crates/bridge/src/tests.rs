use super::*;
use std::cell::{Cell, RefCell};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;

const DDPF_ALPHAPIXELS: u32 = 0x1;
const DDPF_PALETTEINDEXED8: u32 = 0x20;
const DDPF_RGB: u32 = 0x40;
const DDPF_LUMINANCE: u32 = 0x0002_0000;

/// Uncompressed DDS file: `masks` is `[r, g, b, a]`.
fn dds_bytes(width: u32, height: u32, flags: u32, bits: u32, masks: [u32; 4], data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"DDS ");
    for field in [124u32, 0x1007, height, width, 0, 0, 0] {
        out.extend_from_slice(&field.to_le_bytes());
    }
    out.extend_from_slice(&[0u8; 44]);
    for field in [32u32, flags, 0, bits, masks[0], masks[1], masks[2], masks[3]] {
        out.extend_from_slice(&field.to_le_bytes());
    }
    out.extend_from_slice(&0x1000u32.to_le_bytes());
    out.extend_from_slice(&[0u8; 16]);
    out.extend_from_slice(data);
    out
}

fn argb8888_dds(width: u32, height: u32, bgra: &[u8]) -> Vec<u8> {
    dds_bytes(
        width,
        height,
        DDPF_RGB | DDPF_ALPHAPIXELS,
        32,
        [0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0xFF00_0000],
        bgra,
    )
}

fn write_input(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("failed to write input");
    path
}

fn descriptor(format: SourceFormat, width: u32, height: u32, stride: usize) -> ImageDescriptor {
    ImageDescriptor {
        width,
        height,
        stride,
        format,
        pixels: vec![0x5A; stride * height as usize],
    }
}

struct StubDecoder(ImageDescriptor);

impl Decode for StubDecoder {
    fn decode(&self, _path: &Path) -> dds::Result<ImageDescriptor> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
struct CountingObserver {
    acquired: Cell<usize>,
    released: Cell<usize>,
}

impl LeaseObserver for CountingObserver {
    fn acquired(&self, _len: usize) {
        self.acquired.set(self.acquired.get() + 1);
    }

    fn released(&self, _len: usize) {
        self.released.set(self.released.get() + 1);
    }
}

#[derive(Default)]
struct RecordingSink {
    seen: RefCell<Vec<(u32, u32, usize, SinkFormat, usize)>>,
}

impl RasterSink for RecordingSink {
    fn save(&self, image: &SinkImage<'_>, _path: &Path) -> core::result::Result<(), SinkError> {
        self.seen.borrow_mut().push((
            image.width,
            image.height,
            image.stride,
            image.format,
            image.pixels.len(),
        ));
        Ok(())
    }
}

struct FailingSink;

impl RasterSink for FailingSink {
    fn save(&self, _image: &SinkImage<'_>, _path: &Path) -> core::result::Result<(), SinkError> {
        Err(SinkError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only",
        )))
    }
}

struct PanickingSink;

impl RasterSink for PanickingSink {
    fn save(&self, _image: &SinkImage<'_>, _path: &Path) -> core::result::Result<(), SinkError> {
        panic!("sink exploded");
    }
}

#[test]
fn map_format_returns_table_entries() {
    assert_eq!(map_format(SourceFormat::Rgb24).ok(), Some(SinkFormat::Bgr24));
    assert_eq!(map_format(SourceFormat::Rgba32).ok(), Some(SinkFormat::Bgra32));
    assert_eq!(map_format(SourceFormat::Rgb555).ok(), Some(SinkFormat::Rgb555));
    assert_eq!(map_format(SourceFormat::Rgb565).ok(), Some(SinkFormat::Rgb565));
    assert_eq!(
        map_format(SourceFormat::Argb1555).ok(),
        Some(SinkFormat::Argb1555)
    );
}

#[test]
fn map_format_rejects_every_unmapped_format() {
    let unmapped: Vec<SourceFormat> = SourceFormat::ALL
        .into_iter()
        .filter(|f| FORMAT_TABLE.iter().all(|(from, _)| from != f))
        .collect();
    assert_eq!(
        unmapped,
        vec![
            SourceFormat::Argb4444,
            SourceFormat::Gray8,
            SourceFormat::Indexed8
        ]
    );
    for format in unmapped {
        assert!(matches!(
            map_format(format),
            Err(Error::UnsupportedFormat(f)) if f == format
        ));
    }
}

#[test]
fn mapped_formats_keep_bytes_per_pixel() {
    for (from, to) in FORMAT_TABLE {
        assert_eq!(from.bytes_per_pixel(), to.bytes_per_pixel(), "{from:?}");
    }
}

#[test]
fn convert_rgba32_round_trips_pixels() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let bgra = [
        0x00, 0x00, 0xFF, 0xFF, 0x00, 0xFF, 0x00, 0x80, //
        0xFF, 0x00, 0x00, 0x40, 0x10, 0x20, 0x30, 0x00,
    ];
    let input = write_input(dir.path(), "in.dds", &argb8888_dds(2, 2, &bgra));
    let output = dir.path().join("out.png");

    convert(&input, &output).expect("conversion failed");

    let source = dds::decode_file(&input, &DecodeOptions::default()).expect("decode failed");
    let png = image::open(&output).expect("failed to open png");
    assert_eq!(png.color(), image::ColorType::Rgba8);
    let png = png.to_rgba8();
    assert_eq!((png.width(), png.height()), (source.width, source.height));

    let expected: Vec<u8> = source
        .pixels
        .chunks_exact(4)
        .flat_map(|px| [px[2], px[1], px[0], px[3]])
        .collect();
    assert_eq!(png.into_raw(), expected);
}

#[test]
fn convert_each_table_entry_end_to_end() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let cases: [(&str, Vec<u8>, image::ColorType, [u8; 4]); 5] = [
        (
            "rgb24",
            dds_bytes(1, 1, DDPF_RGB, 24, [0xFF_0000, 0xFF00, 0xFF, 0], &[1, 2, 3]),
            image::ColorType::Rgb8,
            [3, 2, 1, 255],
        ),
        (
            "rgba32",
            argb8888_dds(1, 1, &[1, 2, 3, 4]),
            image::ColorType::Rgba8,
            [3, 2, 1, 4],
        ),
        (
            "rgb555",
            dds_bytes(1, 1, DDPF_RGB, 16, [0x7C00, 0x03E0, 0x001F, 0], &0x7C00u16.to_le_bytes()),
            image::ColorType::Rgb8,
            [255, 0, 0, 255],
        ),
        (
            "rgb565",
            dds_bytes(1, 1, DDPF_RGB, 16, [0xF800, 0x07E0, 0x001F, 0], &0x07E0u16.to_le_bytes()),
            image::ColorType::Rgb8,
            [0, 255, 0, 255],
        ),
        (
            "argb1555",
            dds_bytes(
                1,
                1,
                DDPF_RGB | DDPF_ALPHAPIXELS,
                16,
                [0x7C00, 0x03E0, 0x001F, 0x8000],
                &0x001Fu16.to_le_bytes(),
            ),
            image::ColorType::Rgba8,
            [0, 0, 255, 0],
        ),
    ];

    for (name, bytes, color, rgba) in cases {
        let input = write_input(dir.path(), &format!("{name}.dds"), &bytes);
        let output = dir.path().join(format!("{name}.png"));
        convert(&input, &output).unwrap_or_else(|err| panic!("{name}: {err}"));

        let png = image::open(&output).unwrap_or_else(|err| panic!("{name}: {err}"));
        assert_eq!(png.color(), color, "{name}");
        assert_eq!(png.to_rgba8().get_pixel(0, 0).0, rgba, "{name}");
    }
}

#[test]
fn convert_unmapped_formats_write_nothing() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let mut indexed = vec![0u8; 1024];
    indexed.extend_from_slice(&[0, 1, 2, 3]);
    let cases = [
        (
            "indexed8",
            dds_bytes(4, 1, DDPF_PALETTEINDEXED8, 8, [0; 4], &indexed),
            SourceFormat::Indexed8,
        ),
        (
            "gray8",
            dds_bytes(4, 1, DDPF_LUMINANCE, 8, [0xFF, 0, 0, 0], &[1, 2, 3, 4]),
            SourceFormat::Gray8,
        ),
        (
            "argb4444",
            dds_bytes(
                1,
                1,
                DDPF_RGB | DDPF_ALPHAPIXELS,
                16,
                [0x0F00, 0x00F0, 0x000F, 0xF000],
                &[0, 0],
            ),
            SourceFormat::Argb4444,
        ),
    ];

    for (name, bytes, format) in cases {
        let input = write_input(dir.path(), &format!("{name}.dds"), &bytes);
        let output = dir.path().join(format!("{name}.png"));
        let result = convert(&input, &output);
        assert!(
            matches!(result, Err(Error::UnsupportedFormat(f)) if f == format),
            "{name}: {result:?}"
        );
        assert!(!output.exists(), "{name}: output must not be created");
    }
}

#[test]
fn convert_missing_input_is_decode_error() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let input = dir.path().join("missing.dds");
    let output = dir.path().join("out.png");

    let result = convert(&input, &output);
    assert!(matches!(
        result,
        Err(Error::Decode {
            source: dds::error::Error::Io(_),
            ..
        })
    ));
    assert!(!output.exists());
}

#[test]
fn convert_malformed_input_is_decode_error() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let input = write_input(dir.path(), "garbage.dds", b"definitely not a texture");
    let output = dir.path().join("out.png");

    assert!(matches!(convert(&input, &output), Err(Error::Decode { .. })));
    assert!(!output.exists());
}

#[test]
fn convert_passes_geometry_through_verbatim() {
    let sink = RecordingSink::default();
    let bridge = FormatBridge::with_parts(
        StubDecoder(descriptor(SourceFormat::Rgba32, 2, 3, 12)),
        &sink,
        LogObserver,
    );
    bridge.convert("in.dds", "out.png").expect("conversion failed");
    assert_eq!(
        *sink.seen.borrow(),
        vec![(2, 3, 12, SinkFormat::Bgra32, 36)]
    );
}

#[test]
fn unsupported_format_never_reaches_sink_or_lease() {
    let sink = RecordingSink::default();
    let observer = CountingObserver::default();
    let bridge = FormatBridge::with_parts(
        StubDecoder(descriptor(SourceFormat::Indexed8, 4, 1, 4)),
        &sink,
        &observer,
    );
    assert!(matches!(
        bridge.convert("in.dds", "out.png"),
        Err(Error::UnsupportedFormat(SourceFormat::Indexed8))
    ));
    assert!(sink.seen.borrow().is_empty());
    assert_eq!(observer.acquired.get(), 0);
    assert_eq!(observer.released.get(), 0);
}

#[test]
fn lease_released_once_on_success() {
    let observer = CountingObserver::default();
    let bridge = FormatBridge::with_parts(
        StubDecoder(descriptor(SourceFormat::Rgb565, 2, 2, 4)),
        RecordingSink::default(),
        &observer,
    );
    bridge.convert("in.dds", "out.png").expect("conversion failed");
    assert_eq!(observer.acquired.get(), 1);
    assert_eq!(observer.released.get(), 1);
}

#[test]
fn lease_released_once_on_sink_error() {
    let observer = CountingObserver::default();
    let bridge = FormatBridge::with_parts(
        StubDecoder(descriptor(SourceFormat::Rgb24, 1, 1, 4)),
        FailingSink,
        &observer,
    );
    let result = bridge.convert("in.dds", "out.png");
    assert!(matches!(
        result,
        Err(Error::Encode {
            source: SinkError::Io(_),
            ..
        })
    ));
    assert_eq!(observer.acquired.get(), 1);
    assert_eq!(observer.released.get(), 1);
}

#[test]
fn lease_released_once_when_sink_panics() {
    let observer = CountingObserver::default();
    let bridge = FormatBridge::with_parts(
        StubDecoder(descriptor(SourceFormat::Rgba32, 1, 1, 4)),
        PanickingSink,
        &observer,
    );
    let outcome = catch_unwind(AssertUnwindSafe(|| bridge.convert("in.dds", "out.png")));
    assert!(outcome.is_err());
    assert_eq!(observer.acquired.get(), 1);
    assert_eq!(observer.released.get(), 1);
}

#[test]
fn unpack_skips_row_padding() {
    let pixels = [
        1, 2, 3, 4, 5, 6, 0xEE, 0xEE, //
        7, 8, 9, 10, 11, 12, 0xEE, 0xEE,
    ];
    let image = SinkImage {
        width: 2,
        height: 2,
        stride: 8,
        format: SinkFormat::Bgr24,
        pixels: &pixels,
    };
    let (rgb, color) = unpack(&image).expect("unpack failed");
    assert_eq!(color, image::ExtendedColorType::Rgb8);
    assert_eq!(rgb, vec![3, 2, 1, 6, 5, 4, 9, 8, 7, 12, 11, 10]);
}

#[test]
fn unpack_expands_sixteen_bit_words() {
    // 565 mid-grey, 1555 opaque white
    let rgb565 = 0x8410u16.to_le_bytes();
    let image = SinkImage {
        width: 1,
        height: 1,
        stride: 2,
        format: SinkFormat::Rgb565,
        pixels: &rgb565,
    };
    assert_eq!(unpack(&image).expect("unpack failed").0, vec![132, 130, 132]);

    let argb1555 = 0xFFFFu16.to_le_bytes();
    let image = SinkImage {
        format: SinkFormat::Argb1555,
        pixels: &argb1555,
        ..image
    };
    let (rgba, color) = unpack(&image).expect("unpack failed");
    assert_eq!(color, image::ExtendedColorType::Rgba8);
    assert_eq!(rgba, vec![255, 255, 255, 255]);
}

#[test]
fn unpack_rejects_short_buffers() {
    let pixels = [0u8; 7];
    let image = SinkImage {
        width: 1,
        height: 2,
        stride: 4,
        format: SinkFormat::Bgra32,
        pixels: &pixels,
    };
    assert!(matches!(
        unpack(&image),
        Err(SinkError::BufferTooSmall {
            needed: 8,
            actual: 7
        })
    ));

    let image = SinkImage {
        stride: 3,
        ..image
    };
    assert!(matches!(
        unpack(&image),
        Err(SinkError::StrideTooSmall { stride: 3, row: 4 })
    ));
}

#[test]
fn png_sink_overwrites_existing_output() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let output = dir.path().join("out.png");
    std::fs::write(&output, b"stale").expect("failed to write stale output");

    let pixels = [10, 20, 30, 40];
    let image = SinkImage {
        width: 1,
        height: 1,
        stride: 4,
        format: SinkFormat::Bgra32,
        pixels: &pixels,
    };
    PngSink.save(&image, &output).expect("save failed");

    let png = image::open(&output).expect("failed to open png").to_rgba8();
    assert_eq!(png.get_pixel(0, 0).0, [30, 20, 10, 40]);
}
