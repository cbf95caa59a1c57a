//! Error types for the legislation cache

use std::fmt;
use std::time::Duration;

/// Failure to persist or remove a cache entry
#[derive(Debug)]
pub enum CacheError {
    Io(std::io::Error),
    Serialize(serde_json::Error),
    /// TTL too large to represent as a timestamp offset
    InvalidTtl(Duration),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "Cache IO error: {}", e),
            Self::Serialize(e) => write!(f, "Cache serialization error: {}", e),
            Self::InvalidTtl(ttl) => write!(f, "Invalid cache TTL: {:?}", ttl),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Serialize(e) => Some(e),
            Self::InvalidTtl(_) => None,
        }
    }
}

impl From<std::io::Error> for CacheError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialize(e)
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let err = CacheError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only filesystem",
        ));
        assert_eq!(err.to_string(), "Cache IO error: read-only filesystem");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_invalid_ttl_display() {
        let err = CacheError::InvalidTtl(Duration::MAX);
        assert!(err.to_string().starts_with("Invalid cache TTL"));
    }
}
