//! Run coordination: scanner -> bounded channel -> resize workers

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use futures::future::join_all;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{error, info};

use crate::config::ResizerConfig;
use crate::error::{Result, ResizerError};
use crate::processing::{ImageProcessor, ProcessedImage};

pub mod cancel;
pub mod progress;
pub mod scanner;
pub mod worker;

pub use cancel::CancellationToken;
pub use progress::*;
pub use scanner::DirectoryScanner;
pub use worker::{run_worker, SharedReceiver, WorkerExit};

/// Batch resizer for one input tree.
///
/// Construction validates the configuration and prepares the output root;
/// nothing is scanned until [`Resizer::run`].
pub struct Resizer {
    config: ResizerConfig,
    processor: Arc<ImageProcessor>,
    progress: Arc<ProgressTracker>,
}

impl Resizer {
    /// Validate `config`, check the input root and create the output root
    pub fn new(config: ResizerConfig) -> Result<Self> {
        // No I/O before the configuration itself is known to be valid
        config.validate()?;
        let scanner = DirectoryScanner::open(&config.input)?;

        let output_dir = absolute(&config.output)?;
        let output_root = config
            .naming
            .output_root(&output_dir, config.resize.width, config.resize.height);
        // Results would be written over the very files being scanned
        if output_root == scanner.root() {
            return Err(ResizerError::config(format!(
                "Output directory {:?} must differ from the input directory",
                output_root
            )));
        }
        std::fs::create_dir_all(&output_root).map_err(|source| ResizerError::OutputDirectory {
            path: output_root.clone(),
            source,
        })?;

        info!(
            "Resizing {:?} -> {:?} at {}x{} with {} workers",
            config.input, output_root, config.resize.width, config.resize.height, config.workers
        );

        let processor = ImageProcessor::new(config.resize, config.naming, output_root);

        Ok(Self {
            config,
            processor: Arc::new(processor),
            progress: Arc::new(ProgressTracker::new()),
        })
    }

    pub fn config(&self) -> &ResizerConfig {
        &self.config
    }

    /// Absolute directory receiving resized images
    pub fn output_root(&self) -> &Path {
        self.processor.output_root()
    }

    /// Subscribe to progress events of subsequent runs
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressUpdate> {
        self.progress.subscribe()
    }

    /// Resize every image under the input root.
    ///
    /// Returns once all workers have stopped, either because the input was
    /// drained or because `cancel` fired. Per-image failures are counted in
    /// the returned stats; only startup failures are errors.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunStats> {
        let start_time = Instant::now();

        let scanner = DirectoryScanner::open(&self.config.input)?.exclude(self.output_root());
        self.progress.start(self.config.workers);

        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let scan = scanner.spawn(tx, cancel.clone(), self.progress.clone());

        let images: SharedReceiver = Arc::new(Mutex::new(rx));
        let workers: Vec<_> = (0..self.config.workers)
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    images.clone(),
                    self.processor.clone(),
                    self.progress.clone(),
                    cancel.clone(),
                ))
            })
            .collect();
        // The scanner stops once the last worker releases the receiver
        drop(images);

        let mut cancelled = false;
        for result in join_all(workers).await {
            match result {
                Ok(WorkerExit::Cancelled) => cancelled = true,
                Ok(WorkerExit::Drained) => {}
                Err(e) => error!("Worker task failed: {}", e),
            }
        }
        if let Err(e) = scan.await {
            error!("Scanner task failed: {}", e);
        }

        let outcome = if cancelled {
            RunOutcome::Cancelled
        } else {
            RunOutcome::Completed
        };
        let stats = self.progress.snapshot(outcome, start_time.elapsed());
        self.progress.finish(&stats);

        Ok(stats)
    }

    /// Resize a single file into the output root, outside of any run
    pub async fn resize_file(&self, path: impl AsRef<Path>) -> Result<ProcessedImage> {
        self.processor.process_file(path.as_ref()).await
    }

    /// Resize an image read from `reader`, written as `name` under the output root
    pub async fn resize_reader<R>(&self, reader: R, name: impl Into<PathBuf>) -> Result<ProcessedImage>
    where
        R: Read + Send + 'static,
    {
        self.processor.process_reader(reader, name).await
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|source| ResizerError::OutputDirectory {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use tempfile::TempDir;

    fn write_png(path: &Path, width: u32, height: u32) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        ImageBuffer::from_pixel(width, height, Rgb([50u8, 60, 70]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_new_rejects_zero_workers_before_io() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out");
        let config = ResizerConfig::new(dir.path().join("missing"), &output).with_workers(0);

        let err = Resizer::new(config).err().unwrap();
        assert!(matches!(err, ResizerError::ConfigError { .. }));
        assert!(!output.exists());
    }

    #[test]
    fn test_new_creates_resolution_folder() {
        let dir = TempDir::new().unwrap();
        let config = ResizerConfig::new(dir.path(), dir.path().join("out"))
            .with_resolution(64, 32)
            .with_naming(crate::config::NamingConfig::default().resolution_folder(true));

        let resizer = Resizer::new(config).unwrap();
        assert_eq!(resizer.output_root(), dir.path().join("out/64x32"));
        assert!(resizer.output_root().is_dir());
    }

    #[test]
    fn test_new_reports_uncreatable_output() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let config = ResizerConfig::new(dir.path(), blocker.join("out"));
        let err = Resizer::new(config).err().unwrap();
        assert!(matches!(err, ResizerError::OutputDirectory { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_skips_output_nested_in_input() {
        let dir = TempDir::new().unwrap();
        write_png(&dir.path().join("a.png"), 8, 8);
        write_png(&dir.path().join("out/stale.png"), 8, 8);

        let config = ResizerConfig::new(dir.path(), dir.path().join("out"))
            .with_resolution(4, 4)
            .with_workers(2);
        let resizer = Resizer::new(config).unwrap();

        let stats = resizer.run(&CancellationToken::new()).await.unwrap();
        assert_eq!(stats.resized, 1);
        assert_eq!(stats.outcome, RunOutcome::Completed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_single_image_operations_leave_counter_alone() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let source = input.path().join("nested/single.png");
        write_png(&source, 40, 20);

        let config = ResizerConfig::new(input.path(), output.path()).with_resolution(20, 0);
        let resizer = Resizer::new(config).unwrap();

        let processed = resizer.resize_file(&source).await.unwrap();
        assert_eq!(processed.output_path, output.path().join("single.png"));
        assert_eq!((processed.width, processed.height), (20, 10));

        let bytes = std::fs::read(&source).unwrap();
        let processed = resizer
            .resize_reader(std::io::Cursor::new(bytes), "from_reader.png")
            .await
            .unwrap();
        assert!(processed.output_path.ends_with("from_reader.png"));

        assert_eq!(resizer.progress.resized(), 0);
    }
}
