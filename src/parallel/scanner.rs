//! Directory scanner feeding decoded images to the workers

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{Result, ResizerError};
use crate::parallel::{CancellationToken, ProgressTracker};
use crate::processing::Image;

/// Recursive walk of an input tree.
///
/// Every regular file is decoded on the scanner's thread. Files that fail to
/// decode are reported as skipped and never reach the channel.
#[derive(Debug)]
pub struct DirectoryScanner {
    root: PathBuf,
    exclude: Option<PathBuf>,
}

impl DirectoryScanner {
    /// Check that `root` is a readable directory
    pub fn open(root: &Path) -> Result<Self> {
        let scan_failure = |source| ResizerError::ScanFailure {
            path: root.to_path_buf(),
            source,
        };

        std::fs::read_dir(root).map_err(scan_failure)?;
        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir().map_err(scan_failure)?.join(root)
        };

        Ok(Self { root, exclude: None })
    }

    /// Never descend into `path`, e.g. an output root nested in the input.
    ///
    /// The root itself is always scanned, even when it equals `path`.
    pub fn exclude(mut self, path: impl Into<PathBuf>) -> Self {
        self.exclude = Some(path.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start the walk on a blocking thread.
    ///
    /// `images` is dropped when the walk ends, which closes the channel once
    /// the workers have drained it. The walk stops early when `cancel` fires
    /// or when every receiver is gone.
    pub fn spawn(
        self,
        images: mpsc::Sender<Image>,
        cancel: CancellationToken,
        progress: Arc<ProgressTracker>,
    ) -> JoinHandle<()> {
        tokio::task::spawn_blocking(move || self.scan(images, cancel, &progress))
    }

    fn scan(self, images: mpsc::Sender<Image>, cancel: CancellationToken, progress: &ProgressTracker) {
        info!("Scanning {:?}", self.root);

        let exclude = self.exclude.clone();
        let walker = WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || exclude.as_deref() != Some(entry.path()));

        for entry in walker {
            if cancel.is_cancelled() {
                debug!("Scan cancelled");
                return;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(&self.root).to_path_buf();
                    progress.record_skipped(path, e.to_string());
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative_name = path.strip_prefix(&self.root).unwrap_or(path).to_path_buf();

            let image = match Image::decode_file(path, relative_name.clone()) {
                Ok(image) => image,
                Err(e) => {
                    progress.record_skipped(path.to_path_buf(), e.to_string());
                    continue;
                }
            };

            // Blocks while the channel is full
            if images.blocking_send(image).is_err() {
                debug!("All workers stopped, ending scan");
                return;
            }
            progress.record_queued(relative_name);
        }

        debug!("Scan of {:?} complete", self.root);
    }
}
