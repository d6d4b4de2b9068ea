//! Error types for the library

use thiserror::Error;

/// Error types for the rotating sphere demo
#[derive(Error, Debug)]
pub enum SphereError {
    #[error("No compute platform or device found: {0}")]
    Enumeration(String),

    #[error("Kernel program failed to build:\n{log}")]
    Compile { log: String },

    #[error("Accelerator resource allocation failed: {0}")]
    Resource(String),

    #[error("Kernel dispatch failed: {0}")]
    Dispatch(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where in the run an error can happen.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Accelerator setup; recovered by running the whole session on the host.
    Initialization,
    /// A single tick on the accelerator; recovered by the host for that tick.
    Dispatch,
    /// Caller mistakes and output failures.
    Other,
}

impl SphereError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SphereError::Enumeration(_)
            | SphereError::Compile { .. }
            | SphereError::Resource(_) => ErrorCategory::Initialization,
            SphereError::Dispatch(_) => ErrorCategory::Dispatch,
            _ => ErrorCategory::Other,
        }
    }
}

/// Convenience type alias for Results with [`SphereError`]
pub type CrateResult<T> = std::result::Result<T, SphereError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_taxonomy() {
        assert_eq!(
            SphereError::Enumeration("none".into()).category(),
            ErrorCategory::Initialization
        );
        assert_eq!(
            SphereError::Compile { log: "x".into() }.category(),
            ErrorCategory::Initialization
        );
        assert_eq!(
            SphereError::Resource("queue".into()).category(),
            ErrorCategory::Initialization
        );
        assert_eq!(
            SphereError::Dispatch("lost".into()).category(),
            ErrorCategory::Dispatch
        );
        assert_eq!(
            SphereError::InvalidArgument("0".into()).category(),
            ErrorCategory::Other
        );
    }

    #[test]
    fn compile_error_carries_log() {
        let err = SphereError::Compile {
            log: "1:5 expected ';'".into(),
        };
        assert!(err.to_string().contains("expected ';'"));
    }
}
