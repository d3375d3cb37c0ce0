//! Error types and handling for the batch resizer

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for resizer operations
pub type Result<T> = std::result::Result<T, ResizerError>;

/// Main error type for resizer operations
#[derive(Debug, Error)]
pub enum ResizerError {
    /// I/O errors outside the pipeline, e.g. opening the log file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid run configuration
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Input root is missing or unreadable
    #[error("Cannot scan input directory {path:?}: {source}")]
    ScanFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Output root cannot be created
    #[error("Cannot create output directory {path:?}: {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single file could not be decoded
    #[error("Cannot decode {path:?}: {message}")]
    DecodeError { path: PathBuf, message: String },

    /// Decoded format has no registered codec
    #[error("Unsupported image format: {format} (file: {file:?})")]
    UnsupportedFormat {
        format: String,
        file: Option<PathBuf>,
    },

    /// A resized image could not be encoded
    #[error("Cannot encode {path:?}: {message}")]
    EncodeError { path: PathBuf, message: String },

    /// A resized image could not be written
    #[error("Cannot write {path:?}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A blocking resize/encode task died
    #[error("Task error: {message}")]
    TaskError { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    SerdeError(String),
}

impl ResizerError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new decode error
    pub fn decode<S: Into<String>>(path: impl Into<PathBuf>, message: S) -> Self {
        Self::DecodeError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new encode error
    pub fn encode<S: Into<String>>(path: impl Into<PathBuf>, message: S) -> Self {
        Self::EncodeError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new unsupported format error
    pub fn unsupported_format<S: Into<String>>(format: S, file: Option<PathBuf>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
            file,
        }
    }

    pub fn task<S: Into<String>>(message: S) -> Self {
        Self::TaskError {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (the run skips the item and continues)
    pub fn is_recoverable(&self) -> bool {
        match self {
            // These errors affect a single image
            Self::DecodeError { .. }
            | Self::UnsupportedFormat { .. }
            | Self::EncodeError { .. }
            | Self::WriteError { .. }
            | Self::TaskError { .. } => true,

            // Startup errors abort the run before any worker starts
            Self::IoError(_)
            | Self::ConfigError { .. }
            | Self::ScanFailure { .. }
            | Self::OutputDirectory { .. }
            | Self::SerdeError(_) => false,
        }
    }

    /// Get the associated file path if available
    pub fn file_path(&self) -> Option<&PathBuf> {
        match self {
            Self::UnsupportedFormat { file, .. } => file.as_ref(),

            Self::ScanFailure { path, .. }
            | Self::OutputDirectory { path, .. }
            | Self::DecodeError { path, .. }
            | Self::EncodeError { path, .. }
            | Self::WriteError { path, .. } => Some(path),

            _ => None,
        }
    }

    /// Attach a file path to errors that were raised without one
    pub fn with_file(self, file: impl Into<PathBuf>) -> Self {
        match self {
            Self::UnsupportedFormat { format, file: None } => Self::UnsupportedFormat {
                format,
                file: Some(file.into()),
            },
            other => other,
        }
    }
}

impl From<toml::de::Error> for ResizerError {
    fn from(err: toml::de::Error) -> Self {
        Self::SerdeError(format!("TOML parsing error: {}", err))
    }
}

impl From<serde_yaml::Error> for ResizerError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::SerdeError(format!("YAML parsing error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let err = ResizerError::config("test message");
        assert!(matches!(err, ResizerError::ConfigError { .. }));
        assert_eq!(err.to_string(), "Configuration error: test message");
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(ResizerError::decode("a.png", "bad header").is_recoverable());
        assert!(ResizerError::encode("a.png", "no space").is_recoverable());
        assert!(!ResizerError::config("workers").is_recoverable());

        let scan = ResizerError::ScanFailure {
            path: PathBuf::from("missing"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(!scan.is_recoverable());

        let io = ResizerError::from(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert!(!io.is_recoverable());
    }

    #[test]
    fn test_file_context() {
        let err = ResizerError::unsupported_format("webp", None).with_file("pic.webp");
        assert_eq!(err.file_path().map(PathBuf::as_path), Some(Path::new("pic.webp")));

        // An existing path is kept
        let err = ResizerError::unsupported_format("webp", Some(PathBuf::from("a.webp")))
            .with_file("b.webp");
        assert_eq!(err.file_path().map(PathBuf::as_path), Some(Path::new("a.webp")));
    }
}
