//! Error types for pipeline operations

use std::path::Path;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, FogStripperError>;

/// Error types surfaced by the job pipeline
#[derive(Error, Debug)]
pub enum FogStripperError {
    /// Input/output errors (file not found, permission denied, disk full, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Tool configuration missing or unreadable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Job parameters violate an invariant
    #[error("Invalid job: {0}")]
    InvalidJob(String),

    /// Unsupported input or output format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// An external stage exited non-zero, timed out or could not be started
    #[error("Stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },

    /// The pipeline finished without producing its final artifact
    #[error("Final artifact was not produced: {0}")]
    MissingArtifact(String),

    /// Backup creation or restore failed
    #[error("Backup error: {0}")]
    Backup(String),

    /// Animated container decoding or encoding failed
    #[error("Animation error: {0}")]
    Animation(String),

    /// Processing errors that do not fit another category
    #[error("Processing error: {0}")]
    Processing(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FogStripperError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new invalid job error
    pub fn invalid_job<S: Into<String>>(msg: S) -> Self {
        Self::InvalidJob(msg.into())
    }

    /// Create a new unsupported format error
    pub fn unsupported_format<S: Into<String>>(format: S) -> Self {
        Self::UnsupportedFormat(format.into())
    }

    /// Create a new backup error
    pub fn backup<S: Into<String>>(msg: S) -> Self {
        Self::Backup(msg.into())
    }

    /// Create a new animation error
    pub fn animation<S: Into<String>>(msg: S) -> Self {
        Self::Animation(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a stage failure error for the given stage name
    pub fn stage_failure<S: Into<String>>(stage: &str, details: S) -> Self {
        Self::Stage {
            stage: stage.to_string(),
            message: details.into(),
        }
    }

    /// Create a missing artifact error naming the path that was expected
    pub fn missing_artifact<P: AsRef<Path>>(path: P) -> Self {
        Self::MissingArtifact(path.as_ref().display().to_string())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<Path>>(operation: &str, path: P, error: &std::io::Error) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create image loading error with format context
    pub fn image_load_error<P: AsRef<Path>>(path: P, error: &image::ImageError) -> Self {
        let path_display = path.as_ref().display();
        let extension = path
            .as_ref()
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown");

        Self::Image(image::ImageError::IoError(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "Failed to load image '{}' (format: {}): {}",
                path_display, extension, error
            ),
        )))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
    ) -> Self {
        Self::InvalidJob(format!(
            "Invalid {}: {} (valid: {})",
            parameter, value, valid_range
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let err = FogStripperError::invalid_job("bad factor");
        assert!(matches!(err, FogStripperError::InvalidJob(_)));

        let err = FogStripperError::unsupported_format("xcf");
        assert!(matches!(err, FogStripperError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_stage_failure_display() {
        let err = FogStripperError::stage_failure("background-removal", "exit code 1");
        assert_eq!(
            err.to_string(),
            "Stage 'background-removal' failed: exit code 1"
        );
    }

    #[test]
    fn test_enhanced_error_context() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = FogStripperError::file_io_error(
            "move original",
            Path::new("/photos/cat.png"),
            &io_error,
        );
        let error_string = err.to_string();
        assert!(error_string.contains("move original"));
        assert!(error_string.contains("/photos/cat.png"));

        let err = FogStripperError::config_value_error("upscale factor", 5, "0, 2, 3, 4");
        let error_string = err.to_string();
        assert!(error_string.contains("upscale factor"));
        assert!(error_string.contains('5'));
        assert!(error_string.contains("0, 2, 3, 4"));

        let err = FogStripperError::missing_artifact("/tmp/out.png");
        assert!(err.to_string().contains("/tmp/out.png"));
    }
}
