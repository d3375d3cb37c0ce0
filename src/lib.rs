//! Batch Resizer - concurrent image resizing pipeline
//!
//! Scans a directory tree, decodes every image it finds and resizes the
//! images on a pool of workers fed through a bounded channel. Files that
//! cannot be decoded, resized or written are skipped; the run reports how
//! many images were written.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use batch_resizer::{CancellationToken, Resizer, ResizerConfig};
//!
//! # async fn example() -> batch_resizer::Result<()> {
//! let config = ResizerConfig::new("images", "resized_images")
//!     .with_resolution(1024, 0)
//!     .with_workers(4);
//!
//! let resizer = Resizer::new(config)?;
//! let stats = resizer.run(&CancellationToken::new()).await?;
//!
//! println!("Resized images: {}", stats.resized);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod processing;
pub mod parallel;

// Re-export commonly used types
pub use config::{Config, ImageFormat, LoggingConfig, NamingConfig, ResizeConfig, ResizerConfig};
pub use error::{Result, ResizerError};
pub use parallel::{CancellationToken, ProgressUpdate, Resizer, RunOutcome, RunStats};
pub use processing::{FilterType, Image, ImageProcessor, ImageResizer, ProcessedImage};

use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the configured level. Logs go to stderr unless a
/// log file is configured, leaving stdout for results. Calling this again
/// after a subscriber is installed is a no-op.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| {
            ResizerError::config(format!("Invalid log level '{}': {}", config.level, e))
        })?,
    };

    let installed = match (&config.file, config.json_format) {
        (Some(path), json) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let layer = fmt::layer().with_writer(Mutex::new(file)).with_ansi(false);
            if json {
                tracing_subscriber::registry().with(filter).with(layer.json()).try_init()
            } else {
                tracing_subscriber::registry().with(filter).with(layer).try_init()
            }
        }
        (None, true) => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        (None, false) => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    if installed.is_ok() {
        info!("Batch Resizer v{} initialized", VERSION);
    }

    Ok(())
}
