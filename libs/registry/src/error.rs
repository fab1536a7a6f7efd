//! Registry error types.

use thiserror::Error;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Registry operation errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The key is not an absolute node path.
    #[error("invalid node path '{0}': must start with '/' and contain no empty segments")]
    InvalidPath(String),

    /// The registry connection has been closed.
    #[error("registry is closed")]
    Closed,
}
