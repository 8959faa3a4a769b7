//! Error types for sitepilot-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for sitepilot-core
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for sitepilot-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidConfig(String),

    /// The bucket exists and already belongs to the caller
    #[error("Bucket already owned by you: {0}")]
    BucketAlreadyOwned(String),

    /// AWS SDK error
    #[error("AWS SDK error: {0}")]
    AwsSdk(String),

    /// A request could not be built from the given inputs
    #[error("Invalid request: {0}")]
    Build(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory walk error
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// No issued certificate covers the domain
    #[error("No matching cert found for {0}")]
    MissingCertificate(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Timeout
    #[error("Operation timed out")]
    Timeout,

    /// Cancelled by user
    #[error("Operation cancelled")]
    Cancelled,
}

// Every aws-sdk-* crate re-exports the same smithy SdkError, so one impl covers
// S3, Route 53, ACM and CloudFront.
impl<E, R> From<aws_sdk_s3::error::SdkError<E, R>> for Error
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    fn from(err: aws_sdk_s3::error::SdkError<E, R>) -> Self {
        Error::AwsSdk(aws_sdk_s3::error::DisplayErrorContext(&err).to_string())
    }
}

impl From<aws_smithy_types::error::operation::BuildError> for Error {
    fn from(err: aws_smithy_types::error::operation::BuildError) -> Self {
        Error::Build(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(Error::Timeout.to_string(), "Operation timed out");
        assert_eq!(Error::Cancelled.to_string(), "Operation cancelled");
        assert_eq!(
            Error::BucketAlreadyOwned("site".to_string()).to_string(),
            "Bucket already owned by you: site"
        );
    }

    #[test]
    fn test_build_error_conversion() {
        let err: Error =
            aws_smithy_types::error::operation::BuildError::missing_field("name", "required")
                .into();
        assert!(matches!(err, Error::Build(_)));
    }
}
