//! Errors raised while realizing a resource graph.

use std::path::PathBuf;

/// Provisioning result type
pub type ProvisionResult<T> = Result<T, ProvisionError>;

/// Error raised by a provisioning engine
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// Reading or writing engine state failed
    #[error("I/O error at {path}: {source}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A manifest could not be encoded or decoded
    #[error("Manifest encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// A stored manifest belongs to a different stack
    #[error("Manifest {path} belongs to stack '{found}', expected '{expected}'")]
    StackMismatch {
        /// Manifest location
        path: PathBuf,
        /// Stack being applied
        expected: String,
        /// Stack recorded in the manifest
        found: String,
    },

    /// The engine refused the graph
    #[error("Graph rejected: {reason}")]
    Rejected {
        /// Why the graph was refused
        reason: String,
    },
}

impl ProvisionError {
    /// Wrap an I/O error with the path it concerns
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_display_includes_path() {
        let err = ProvisionError::io(
            "/tmp/out/s.manifest.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let text = err.to_string();
        assert!(text.contains("/tmp/out/s.manifest.json"));
        assert!(text.contains("denied"));
    }

    #[test]
    fn test_encoding_from_serde() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ProvisionError = source.into();
        assert!(matches!(err, ProvisionError::Encoding(_)));
    }
}
