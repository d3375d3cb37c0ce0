//! Configuration management for the batch resizer

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::{Result, ResizerError};
use crate::processing::FilterType;

pub mod naming;
pub use naming::*;

/// File-level configuration, loadable from TOML or YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target resolution and encoding settings
    pub resize: ResizeConfig,

    /// Input/output locations and worker pool sizing
    pub pipeline: PipelineConfig,

    /// Output file naming
    pub naming: NamingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Target resolution for a run.
///
/// A zero width or height is valid and means "derive from the source aspect
/// ratio"; both zero keeps the source dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizeConfig {
    pub width: u32,
    pub height: u32,

    /// Encoder quality (1-100), used by lossy formats
    pub quality: u8,

    /// Resampling filter
    pub filter: FilterType,
}

impl ResizeConfig {
    /// Create a new resize configuration with default resolution
    pub fn new() -> Self {
        Self {
            width: 1024,
            height: 0,
            quality: 90,
            filter: FilterType::Lanczos3,
        }
    }

    /// Set both target dimensions
    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set quality
    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Set resampling filter
    pub fn filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.quality == 0 || self.quality > 100 {
            return Err(ResizerError::config(format!(
                "Quality must be between 1-100, got {}",
                self.quality
            )));
        }
        Ok(())
    }
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Pipeline locations and sizing as they appear in a config file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory scanned for images
    pub input: PathBuf,

    /// Directory receiving resized images
    pub output: PathBuf,

    /// Number of resize workers (None = logical CPUs)
    pub workers: Option<i64>,

    /// Capacity of the scanner -> worker channel
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("images"),
            output: PathBuf::from("resized_images"),
            workers: None,
            channel_capacity: 1,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON logging
    pub json_format: bool,

    /// Log file path (None = stderr)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            file: None,
        }
    }
}

/// Supported image formats.
///
/// Output always keeps the source format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Tiff,
    Bmp,
}

impl ImageFormat {
    /// Default file extension for this format
    pub fn extension(self) -> &'static str {
        self.extensions()[0]
    }

    /// Every extension recognised for this format, default first
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Jpeg => &["jpg", "jpeg", "jpe"],
            Self::Png => &["png"],
            Self::Gif => &["gif"],
            Self::Tiff => &["tiff", "tif"],
            Self::Bmp => &["bmp"],
        }
    }

    /// Get MIME type for this format
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Tiff => "image/tiff",
            Self::Bmp => "image/bmp",
        }
    }
}

/// Convert a worker count from user input, rejecting zero and negatives
pub fn worker_count(value: i64) -> Result<usize> {
    if value <= 0 {
        return Err(ResizerError::config(format!(
            "Number of workers should be > 0, got {}",
            value
        )));
    }
    usize::try_from(value)
        .map_err(|_| ResizerError::config(format!("Number of workers too large: {}", value)))
}

/// Immutable configuration of a single run
#[derive(Debug, Clone)]
pub struct ResizerConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub resize: ResizeConfig,
    pub naming: NamingConfig,
    pub workers: usize,
    pub channel_capacity: usize,
}

impl ResizerConfig {
    /// Create a run configuration with defaults for everything but paths
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            resize: ResizeConfig::default(),
            naming: NamingConfig::default(),
            workers: num_cpus::get(),
            channel_capacity: 1,
        }
    }

    /// Set the target resolution
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.resize = self.resize.resolution(width, height);
        self
    }

    pub fn with_resize(mut self, resize: ResizeConfig) -> Self {
        self.resize = resize;
        self
    }

    /// Set the number of resize workers
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_naming(mut self, naming: NamingConfig) -> Self {
        self.naming = naming;
        self
    }

    /// Set the scanner -> worker channel capacity
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Validate everything that can be checked without touching the filesystem
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(ResizerError::config("Number of workers should be > 0"));
        }
        if self.channel_capacity == 0 {
            return Err(ResizerError::config("Channel capacity must be greater than 0"));
        }
        self.resize.validate()
    }

    /// Output directory, including the resolution folder when enabled
    pub fn output_root(&self) -> PathBuf {
        self.naming
            .output_root(&self.output, self.resize.width, self.resize.height)
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ResizerError::config(format!(
                "Failed to read config file {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;

        match config_extension(path.as_ref()).as_str() {
            "toml" => toml::from_str(&content).map_err(Into::into),
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(Into::into),
            _ => Err(ResizerError::config(
                "Unsupported config file format. Use .toml or .yaml",
            )),
        }
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = match config_extension(path.as_ref()).as_str() {
            "toml" => toml::to_string_pretty(self)
                .map_err(|e| ResizerError::config(format!("TOML serialization failed: {}", e)))?,
            "yaml" | "yml" => serde_yaml::to_string(self)
                .map_err(|e| ResizerError::config(format!("YAML serialization failed: {}", e)))?,
            _ => {
                return Err(ResizerError::config(
                    "Unsupported config file format. Use .toml or .yaml",
                ))
            }
        };

        std::fs::write(&path, content).map_err(|e| {
            ResizerError::config(format!(
                "Failed to write config file {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.resizer_config()?.validate()
    }

    /// Build the run configuration described by this file
    pub fn resizer_config(&self) -> Result<ResizerConfig> {
        let workers = match self.pipeline.workers {
            Some(workers) => worker_count(workers)?,
            None => num_cpus::get(),
        };

        Ok(ResizerConfig {
            input: self.pipeline.input.clone(),
            output: self.pipeline.output.clone(),
            resize: self.resize,
            naming: self.naming,
            workers,
            channel_capacity: self.pipeline.channel_capacity,
        })
    }
}

fn config_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase()
}
