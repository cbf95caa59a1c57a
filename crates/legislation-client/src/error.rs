use std::fmt;

/// Errors from the legislation API client
#[derive(Debug)]
pub enum ClientError {
    /// Missing or invalid client configuration
    Config(String),
    InvalidUrl(url::ParseError),
    Http(reqwest::Error),
    /// Non-success HTTP status
    Status(u16),
    /// The API rejected the `OC` key
    Authentication,
    /// HTML page where JSON was expected
    UnexpectedHtml { target: String },
    EmptyResponse { target: String },
    Json(serde_json::Error),
    InvalidResponse(String),
    /// `resultCode` other than `00`
    Api { code: String, message: String },
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::InvalidUrl(e) => write!(f, "Invalid API URL: {e}"),
            Self::Http(e) => write!(f, "HTTP error: {e}"),
            Self::Status(status) => write!(f, "API returned status {status}"),
            Self::Authentication => {
                write!(f, "API authentication failed, check the OC key")
            }
            Self::UnexpectedHtml { target } => {
                write!(f, "API returned HTML instead of JSON for target {target}")
            }
            Self::EmptyResponse { target } => {
                write!(f, "API returned an empty response for target {target}")
            }
            Self::Json(e) => write!(f, "Failed to parse API response: {e}"),
            Self::InvalidResponse(msg) => write!(f, "Invalid API response: {msg}"),
            Self::Api { code, message } => write!(f, "API error: {message} (code: {code})"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidUrl(e) => Some(e),
            Self::Http(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err)
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
