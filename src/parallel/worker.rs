//! Resize workers draining the shared image channel

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::parallel::{CancellationToken, ProgressTracker};
use crate::processing::{Image, ImageProcessor};

/// Receiving end shared by every worker of a run
pub type SharedReceiver = Arc<Mutex<mpsc::Receiver<Image>>>;

/// Why a worker stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// The channel closed and was drained
    Drained,
    Cancelled,
}

/// Process images until the channel closes or `cancel` fires.
///
/// Failed images are reported to `progress` and never stop the worker.
/// Cancellation does not drain the channel; files already written stay.
pub async fn run_worker(
    id: usize,
    images: SharedReceiver,
    processor: Arc<ImageProcessor>,
    progress: Arc<ProgressTracker>,
    cancel: CancellationToken,
) -> WorkerExit {
    debug!("Worker {} started", id);

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Worker {} cancelled", id);
                return WorkerExit::Cancelled;
            }
            image = recv(&images) => image,
        };

        let Some(image) = next else {
            debug!("Worker {} finished, channel closed", id);
            return WorkerExit::Drained;
        };

        let name = image.relative_name().to_path_buf();
        match processor.process(image).await {
            Ok(processed) => {
                debug!("Worker {} resized {:?} in {:?}", id, name, processed.processing_time);
                progress.record_resized(name, processed.output_path, processed.width, processed.height);
            }
            Err(e) => progress.record_failed(name, e.to_string()),
        }
    }
}

async fn recv(images: &SharedReceiver) -> Option<Image> {
    images.lock().await.recv().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ImageFormat, NamingConfig, ResizeConfig};
    use image::{DynamicImage, ImageBuffer, Rgb};
    use std::time::Duration;
    use tempfile::TempDir;

    fn test_image(name: &str) -> Image {
        let pixels = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(20, 10, Rgb([9, 9, 9])));
        Image::new(pixels, name, ImageFormat::Png)
    }

    fn setup(output: &TempDir) -> (Arc<ImageProcessor>, Arc<ProgressTracker>) {
        let processor = ImageProcessor::new(
            ResizeConfig::new().resolution(10, 0),
            NamingConfig::default(),
            output.path(),
        );
        (Arc::new(processor), Arc::new(ProgressTracker::new()))
    }

    #[tokio::test]
    async fn test_worker_drains_channel() {
        let output = TempDir::new().unwrap();
        let (processor, progress) = setup(&output);
        let (tx, rx) = mpsc::channel(4);

        for name in ["a.png", "b.png", "c/d.png"] {
            tx.send(test_image(name)).await.unwrap();
        }
        drop(tx);

        let exit = run_worker(
            0,
            Arc::new(Mutex::new(rx)),
            processor,
            progress.clone(),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(exit, WorkerExit::Drained);
        assert_eq!(progress.resized(), 3);
        assert!(output.path().join("c/d.png").exists());
    }

    #[tokio::test]
    async fn test_worker_counts_failures_and_continues() {
        let output = TempDir::new().unwrap();
        let (processor, progress) = setup(&output);
        // A file where a directory is needed makes the first write fail
        std::fs::write(output.path().join("blocked"), b"x").unwrap();

        let (tx, rx) = mpsc::channel(4);
        tx.send(test_image("blocked/a.png")).await.unwrap();
        tx.send(test_image("ok.png")).await.unwrap();
        drop(tx);

        run_worker(1, Arc::new(Mutex::new(rx)), processor, progress.clone(), CancellationToken::new()).await;

        let stats = progress.snapshot(crate::parallel::RunOutcome::Completed, Duration::ZERO);
        assert_eq!(stats.resized, 1);
        assert_eq!(stats.failed, 1);
    }

    #[tokio::test]
    async fn test_worker_stops_on_cancel_without_draining() {
        let output = TempDir::new().unwrap();
        let (processor, progress) = setup(&output);
        let (tx, rx) = mpsc::channel(4);
        tx.send(test_image("a.png")).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let exit = tokio::time::timeout(
            Duration::from_secs(5),
            run_worker(2, Arc::new(Mutex::new(rx)), processor, progress.clone(), cancel),
        )
        .await
        .unwrap();

        assert_eq!(exit, WorkerExit::Cancelled);
        assert_eq!(progress.resized(), 0);
        drop(tx);
    }

    #[tokio::test]
    async fn test_worker_wakes_on_cancel_while_idle() {
        let output = TempDir::new().unwrap();
        let (processor, progress) = setup(&output);
        // Sender kept alive so the channel never closes
        let (_tx, rx) = mpsc::channel::<Image>(1);

        let cancel = CancellationToken::new();
        let worker = tokio::spawn(run_worker(3, Arc::new(Mutex::new(rx)), processor, progress, cancel.clone()));

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let exit = tokio::time::timeout(Duration::from_secs(5), worker).await.unwrap().unwrap();
        assert_eq!(exit, WorkerExit::Cancelled);
    }
}
