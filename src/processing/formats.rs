//! Codec adapter: format detection, decoding and encoding
//!
//! Every supported [`ImageFormat`] maps to a [`FormatHandler`] holding its
//! decode and encode routines. Adding a format means adding an enum variant
//! and a table entry.

use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageOutputFormat, ImageResult};

use crate::config::ImageFormat;
use crate::error::{Result, ResizerError};

type DecodeFn = fn(&[u8]) -> ImageResult<DynamicImage>;
type EncodeFn = fn(&DynamicImage, u8, &mut Cursor<Vec<u8>>) -> ImageResult<()>;

/// Decode/encode routines of one format
pub struct FormatHandler {
    pub format: ImageFormat,
    decode: DecodeFn,
    encode: EncodeFn,
}

static HANDLERS: [FormatHandler; 5] = [
    FormatHandler {
        format: ImageFormat::Jpeg,
        decode: decode_jpeg,
        encode: encode_jpeg,
    },
    FormatHandler {
        format: ImageFormat::Png,
        decode: decode_png,
        encode: encode_png,
    },
    FormatHandler {
        format: ImageFormat::Gif,
        decode: decode_gif,
        encode: encode_gif,
    },
    FormatHandler {
        format: ImageFormat::Tiff,
        decode: decode_tiff,
        encode: encode_tiff,
    },
    FormatHandler {
        format: ImageFormat::Bmp,
        decode: decode_bmp,
        encode: encode_bmp,
    },
];

/// Look up the handler registered for `format`
pub fn handler(format: ImageFormat) -> &'static FormatHandler {
    match format {
        ImageFormat::Jpeg => &HANDLERS[0],
        ImageFormat::Png => &HANDLERS[1],
        ImageFormat::Gif => &HANDLERS[2],
        ImageFormat::Tiff => &HANDLERS[3],
        ImageFormat::Bmp => &HANDLERS[4],
    }
}

/// Formats with a registered handler
pub fn supported_formats() -> impl Iterator<Item = ImageFormat> {
    HANDLERS.iter().map(|handler| handler.format)
}

impl ImageFormat {
    /// Map an `image` crate format onto a supported format
    pub fn from_codec(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::Gif => Some(Self::Gif),
            image::ImageFormat::Tiff => Some(Self::Tiff),
            image::ImageFormat::Bmp => Some(Self::Bmp),
            _ => None,
        }
    }
}

/// Convert our ImageFormat to image crate format
impl From<ImageFormat> for image::ImageFormat {
    fn from(format: ImageFormat) -> Self {
        match format {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Gif => image::ImageFormat::Gif,
            ImageFormat::Tiff => image::ImageFormat::Tiff,
            ImageFormat::Bmp => image::ImageFormat::Bmp,
        }
    }
}

/// Decode an in-memory image, detecting its format from the magic bytes.
///
/// `source` only labels errors.
pub fn decode(bytes: &[u8], source: &Path) -> Result<(DynamicImage, ImageFormat)> {
    let codec = image::guess_format(bytes).map_err(|_| {
        ResizerError::unsupported_format("unknown", Some(source.to_path_buf()))
    })?;
    let format = ImageFormat::from_codec(codec).ok_or_else(|| {
        ResizerError::unsupported_format(format!("{:?}", codec), Some(source.to_path_buf()))
    })?;

    let image = (handler(format).decode)(bytes)
        .map_err(|e| ResizerError::decode(source, e.to_string()))?;

    Ok((image, format))
}

/// Read and decode a file
pub fn decode_file(path: &Path) -> Result<(DynamicImage, ImageFormat)> {
    let bytes = std::fs::read(path)
        .map_err(|e| ResizerError::decode(path, format!("read failed: {}", e)))?;
    decode(&bytes, path)
}

/// Encode `image` as `format` into `sink`.
///
/// `target` only labels errors.
pub fn encode(
    image: &DynamicImage,
    format: ImageFormat,
    quality: u8,
    sink: &mut Cursor<Vec<u8>>,
    target: &Path,
) -> Result<()> {
    (handler(format).encode)(image, quality, sink)
        .map_err(|e| ResizerError::encode(target, e.to_string()))
}

fn decode_jpeg(bytes: &[u8]) -> ImageResult<DynamicImage> {
    image::load_from_memory_with_format(bytes, image::ImageFormat::Jpeg)
}

fn decode_png(bytes: &[u8]) -> ImageResult<DynamicImage> {
    image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
}

fn decode_gif(bytes: &[u8]) -> ImageResult<DynamicImage> {
    image::load_from_memory_with_format(bytes, image::ImageFormat::Gif)
}

fn decode_tiff(bytes: &[u8]) -> ImageResult<DynamicImage> {
    image::load_from_memory_with_format(bytes, image::ImageFormat::Tiff)
}

fn decode_bmp(bytes: &[u8]) -> ImageResult<DynamicImage> {
    image::load_from_memory_with_format(bytes, image::ImageFormat::Bmp)
}

// JPEG has no alpha channel and no 16-bit mode
fn encode_jpeg(image: &DynamicImage, quality: u8, sink: &mut Cursor<Vec<u8>>) -> ImageResult<()> {
    let mut encoder = JpegEncoder::new_with_quality(sink, quality.clamp(1, 100));
    match image {
        DynamicImage::ImageLuma8(gray) => encoder.encode_image(gray),
        DynamicImage::ImageRgb8(rgb) => encoder.encode_image(rgb),
        other => encoder.encode_image(&other.to_rgb8()),
    }
}

fn encode_png(image: &DynamicImage, _quality: u8, sink: &mut Cursor<Vec<u8>>) -> ImageResult<()> {
    image.write_to(sink, ImageOutputFormat::Png)
}

fn encode_gif(image: &DynamicImage, _quality: u8, sink: &mut Cursor<Vec<u8>>) -> ImageResult<()> {
    image.write_to(sink, ImageOutputFormat::Gif)
}

fn encode_tiff(image: &DynamicImage, _quality: u8, sink: &mut Cursor<Vec<u8>>) -> ImageResult<()> {
    image.write_to(sink, ImageOutputFormat::Tiff)
}

fn encode_bmp(image: &DynamicImage, _quality: u8, sink: &mut Cursor<Vec<u8>>) -> ImageResult<()> {
    image.write_to(sink, ImageOutputFormat::Bmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    fn rgba_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x * 7) as u8, (y * 5) as u8, 128, 255])
        }))
    }

    fn encode_to_vec(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut sink = Cursor::new(Vec::new());
        encode(image, format, 90, &mut sink, Path::new("out")).unwrap();
        sink.into_inner()
    }

    #[test]
    fn test_every_format_has_a_handler() {
        for format in supported_formats() {
            assert_eq!(handler(format).format, format);
        }
        assert_eq!(supported_formats().count(), 5);
    }

    #[test]
    fn test_decode_detects_format_from_content() {
        let image = rgba_image(8, 6);
        for format in [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::Gif, ImageFormat::Bmp] {
            let bytes = encode_to_vec(&image, format);
            // The name is irrelevant to detection
            let (decoded, detected) = decode(&bytes, Path::new("misnamed.txt")).unwrap();
            assert_eq!(detected, format);
            assert_eq!((decoded.width(), decoded.height()), (8, 6));
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode(b"this is not an image at all", Path::new("notes.png")).unwrap_err();
        assert!(matches!(err, ResizerError::UnsupportedFormat { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_decode_reports_corrupt_data() {
        // Valid PNG signature, truncated body
        let bytes = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00];
        let err = decode(&bytes, Path::new("broken.png")).unwrap_err();
        assert!(matches!(err, ResizerError::DecodeError { .. }));
    }

    #[test]
    fn test_jpeg_drops_alpha() {
        let bytes = encode_to_vec(&rgba_image(4, 4), ImageFormat::Jpeg);
        assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Jpeg);
    }

    #[test]
    fn test_codec_mapping() {
        assert_eq!(ImageFormat::from_codec(image::ImageFormat::Png), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_codec(image::ImageFormat::Ico), None);
        assert_eq!(image::ImageFormat::from(ImageFormat::Gif), image::ImageFormat::Gif);
    }
}
