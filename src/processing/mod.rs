//! Core image processing: decode, resize, encode, persist

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs;
use tracing::debug;

use crate::config::{NamingConfig, ResizeConfig};
use crate::error::{Result, ResizerError};

pub mod formats;
pub mod image;
pub mod resize;

pub use self::image::Image;
pub use formats::{decode, encode, FormatHandler};
pub use resize::{target_dimensions, FilterType, ImageResizer};

/// Resizes images and writes them under an output root.
///
/// Shared by every worker of a run; holds no mutable state.
#[derive(Debug, Clone)]
pub struct ImageProcessor {
    resizer: ImageResizer,
    resize: ResizeConfig,
    naming: NamingConfig,
    output_root: PathBuf,
}

impl ImageProcessor {
    /// Create a processor writing to `output_root`
    pub fn new(resize: ResizeConfig, naming: NamingConfig, output_root: impl Into<PathBuf>) -> Self {
        Self {
            resizer: ImageResizer::new(resize.filter),
            resize,
            naming,
            output_root: output_root.into(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Resize, encode and write a decoded image
    pub async fn process(&self, image: Image) -> Result<ProcessedImage> {
        let start_time = Instant::now();
        let name = image.relative_name().to_path_buf();

        debug!("Processing image: {:?} {:?}", name, image.dimensions());

        let resizer = self.resizer;
        let resize = self.resize;
        let naming = self.naming;
        let output_root = self.output_root.clone();

        // Resampling and encoding are CPU bound
        let (output_path, bytes, (width, height)) = tokio::task::spawn_blocking(move || {
            let resized = image.resized(&resizer, resize.width, resize.height);
            let output_path = resized.output_path(&output_root, &naming);
            let bytes = resized.encode(resize.quality, &output_path)?;
            Ok::<_, ResizerError>((output_path, bytes, resized.dimensions()))
        })
        .await
        .map_err(|e| ResizerError::task(format!("Resize task for {:?} failed: {}", name, e)))??;

        save_image(&output_path, &bytes).await?;

        debug!("Saved image: {:?} ({}x{}, {} bytes)", output_path, width, height, bytes.len());

        Ok(ProcessedImage {
            input_name: name,
            output_path,
            width,
            height,
            bytes_written: bytes.len() as u64,
            processing_time: start_time.elapsed(),
        })
    }

    /// Decode and process a single file; the output keeps only its file name
    pub async fn process_file(&self, path: &Path) -> Result<ProcessedImage> {
        let file_name = path
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| ResizerError::decode(path, "path has no file name"))?;

        let source = path.to_path_buf();
        let image = tokio::task::spawn_blocking(move || Image::decode_file(&source, file_name))
            .await
            .map_err(|e| ResizerError::task(format!("Decode task for {:?} failed: {}", path, e)))??;

        self.process(image).await
    }

    /// Decode and process an image read from `reader`, naming it `name`
    pub async fn process_reader<R>(&self, reader: R, name: impl Into<PathBuf>) -> Result<ProcessedImage>
    where
        R: Read + Send + 'static,
    {
        let name = name.into();
        let label = name.clone();
        let image = tokio::task::spawn_blocking(move || Image::decode_reader(reader, name))
            .await
            .map_err(|e| ResizerError::task(format!("Decode task for {:?} failed: {}", label, e)))??;

        self.process(image).await
    }
}

/// Write encoded bytes, creating parent directories first.
///
/// Concurrent creation of the same directory by several workers is fine:
/// `create_dir_all` treats an existing directory as success.
async fn save_image(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|source| ResizerError::WriteError {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(path, bytes).await.map_err(|source| ResizerError::WriteError {
        path: path.to_path_buf(),
        source,
    })
}

/// Result of processing one image
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub input_name: PathBuf,
    pub output_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub bytes_written: u64,
    pub processing_time: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::{DynamicImage, ImageBuffer, Rgb};
    use crate::config::ImageFormat;
    use tempfile::TempDir;

    fn test_image(name: &str, width: u32, height: u32) -> Image {
        let pixels = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb([200, 100, 0])));
        Image::new(pixels, name, ImageFormat::Png)
    }

    #[tokio::test]
    async fn test_process_writes_resized_file() {
        let dir = TempDir::new().unwrap();
        let processor = ImageProcessor::new(
            ResizeConfig::new().resolution(16, 12),
            NamingConfig::default(),
            dir.path(),
        );

        let result = processor.process(test_image("deep/nested/a.png", 64, 48)).await.unwrap();

        assert_eq!(result.output_path, dir.path().join("deep/nested/a.png"));
        assert_eq!((result.width, result.height), (16, 12));
        assert!(result.bytes_written > 0);

        let written = ::image::open(&result.output_path).unwrap();
        assert_eq!((written.width(), written.height()), (16, 12));
    }

    #[tokio::test]
    async fn test_process_file_uses_file_name() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let source = input.path().join("sub").join("photo.png");
        std::fs::create_dir_all(source.parent().unwrap()).unwrap();
        test_image("unused", 30, 30).pixels().save(&source).unwrap();

        let processor = ImageProcessor::new(
            ResizeConfig::new().resolution(10, 0),
            NamingConfig::default().postfix(true),
            output.path(),
        );
        let result = processor.process_file(&source).await.unwrap();

        assert_eq!(result.output_path, output.path().join("photo_10x10.png"));
        assert!(result.output_path.exists());
    }

    #[tokio::test]
    async fn test_process_reader_rejects_garbage() {
        let output = TempDir::new().unwrap();
        let processor = ImageProcessor::new(ResizeConfig::new(), NamingConfig::default(), output.path());

        let err = processor
            .process_reader(std::io::Cursor::new(b"plain text".to_vec()), "fake.jpg")
            .await
            .unwrap_err();
        assert!(err.is_recoverable());
        assert!(std::fs::read_dir(output.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        // A regular file where the output root should be
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();

        let processor = ImageProcessor::new(
            ResizeConfig::new().resolution(4, 4),
            NamingConfig::default(),
            &blocker,
        );
        let err = processor.process(test_image("sub/a.png", 8, 8)).await.unwrap_err();
        assert!(matches!(err, ResizerError::WriteError { .. }));
    }
}
