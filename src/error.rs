//! Error handler for directory operations.

use thiserror::Error;
use validator::ValidationErrors;

pub type Result<T> = std::result::Result<T, DirectoryError>;

/// Boxed error coming from a directory backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Enum representing directory-side errors.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("unable to reach directory server {address}: {source}")]
    Connection { address: String, source: BoxError },

    #[error("directory search with filter `{filter}` failed: {source}")]
    Search { filter: String, source: BoxError },

    #[error("bind rejected for `{dn}`: {reason}")]
    Authentication { dn: String, reason: String },

    #[error("no directory entry matches `{filter}`")]
    NotFound { filter: String },

    #[error("{count} directory entries match `{filter}`, expected exactly one")]
    Ambiguous { filter: String, count: usize },

    #[error("attribute mapping `{0}` is not configured")]
    MissingAttribute(&'static str),

    #[error("invalid directory configuration: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("invalid directory address: {0}")]
    Address(#[from] url::ParseError),

    #[error("directory session is closed")]
    Closed,
}

impl DirectoryError {
    /// Create a [`DirectoryError::Connection`] error.
    pub fn connection<E>(address: impl Into<String>, err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Connection {
            address: address.into(),
            source: err.into(),
        }
    }

    /// Create a [`DirectoryError::Search`] error.
    pub fn search<E>(filter: impl Into<String>, err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Search {
            filter: filter.into(),
            source: err.into(),
        }
    }

    /// Whether the error is a rejected bind, i.e. wrong credentials.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}
