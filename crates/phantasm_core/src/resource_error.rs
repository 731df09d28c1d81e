//! Resource error types
//!
//! Provides error handling for resource loading, release, and disposal.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Boxed error returned by loader strategies and dispose hooks
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type for resource cache operations
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The requested path cannot name a resource (empty, or only a separator)
    #[error("Invalid resource path: '{0}'")]
    InvalidPath(String),

    /// The loader strategy failed; the cache was left unchanged
    #[error("Failed to load resource {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// The key is cached, but holds a different resource type
    #[error("Resource {} is cached as a different type than {expected}", .path.display())]
    TypeMismatch {
        path: PathBuf,
        expected: &'static str,
    },

    /// Released a key that has no live entry
    #[error("Resource not loaded: {}", .0.display())]
    NotLoaded(PathBuf),

    /// IO error outside a loader (directory creation, raw reads)
    #[error("Resource IO error: {0}")]
    Io(#[from] io::Error),

    /// A resource's dispose hook failed during eviction
    #[error("Failed to dispose resource {}: {source}", .path.display())]
    Dispose {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
}

impl ResourceError {
    /// Whether this error came from the loader (as opposed to cache bookkeeping)
    pub fn is_load_failure(&self) -> bool {
        matches!(self, ResourceError::Load { .. } | ResourceError::InvalidPath(_))
    }
}
