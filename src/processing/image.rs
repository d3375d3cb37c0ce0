//! Decoded image flowing through the pipeline

use std::fmt;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::config::{ImageFormat, NamingConfig};
use crate::error::{Result, ResizerError};
use crate::processing::formats;
use crate::processing::resize::ImageResizer;

/// Decoded pixels plus the identity of the file they came from.
///
/// Name and format never change. Resizing consumes the value and returns
/// one with new pixels.
pub struct Image {
    pixels: DynamicImage,
    relative_name: PathBuf,
    format: ImageFormat,
}

impl Image {
    pub fn new(pixels: DynamicImage, relative_name: impl Into<PathBuf>, format: ImageFormat) -> Self {
        Self {
            pixels,
            relative_name: relative_name.into(),
            format,
        }
    }

    /// Decode the file at `path`, naming it `relative_name`
    pub fn decode_file(path: &Path, relative_name: impl Into<PathBuf>) -> Result<Self> {
        let (pixels, format) = formats::decode_file(path)?;
        Ok(Self::new(pixels, relative_name, format))
    }

    /// Decode an image from any reader
    pub fn decode_reader<R: Read>(mut reader: R, name: impl Into<PathBuf>) -> Result<Self> {
        let name = name.into();
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| ResizerError::decode(&name, format!("read failed: {}", e)))?;

        let (pixels, format) = formats::decode(&bytes, &name)?;
        Ok(Self::new(pixels, name, format))
    }

    /// Path relative to the scanned root
    pub fn relative_name(&self) -> &Path {
        &self.relative_name
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.pixels.width(), self.pixels.height())
    }

    /// Replace the pixels with a resized copy
    pub fn resized(self, resizer: &ImageResizer, width: u32, height: u32) -> Self {
        let pixels = resizer.resize(&self.pixels, width, height);
        Self { pixels, ..self }
    }

    /// Where this image is written under `output_root`
    pub fn output_path(&self, output_root: &Path, naming: &NamingConfig) -> PathBuf {
        output_root.join(naming.output_name(&self.relative_name, self.dimensions()))
    }

    /// Encode in the source format; `target` labels errors
    pub fn encode(&self, quality: u8, target: &Path) -> Result<Vec<u8>> {
        let mut sink = Cursor::new(Vec::new());
        formats::encode(&self.pixels, self.format, quality, &mut sink, target)?;
        Ok(sink.into_inner())
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (width, height) = self.dimensions();
        f.debug_struct("Image")
            .field("relative_name", &self.relative_name)
            .field("format", &self.format)
            .field("width", &width)
            .field("height", &height)
            .finish()
    }
}
