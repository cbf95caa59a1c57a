use std::fmt;

/// No usable context could be produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    Configuration(String),
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ContextError {}

impl From<legislation_client::ClientError> for ContextError {
    fn from(e: legislation_client::ClientError) -> Self {
        match e {
            legislation_client::ClientError::Config(msg) => Self::Configuration(msg),
            other => Self::Configuration(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ContextError>;
