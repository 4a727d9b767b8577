use thiserror::Error;

/// Errors raised by the Lyra core library
#[derive(Error, Debug)]
pub enum LyraError {
    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("API error: {status} from {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown timezone '{0}'")]
    UnknownTimezone(String),

    #[error("Could not determine config directory")]
    NoConfigDir,
}

impl LyraError {
    pub(crate) fn http(url: &str, source: reqwest::Error) -> Self {
        Self::Http {
            url: url.to_string(),
            source,
        }
    }

    /// True when the remote end answered but with a non-success status
    pub fn is_status(&self) -> bool {
        matches!(self, Self::Status { .. })
    }
}

pub type Result<T> = std::result::Result<T, LyraError>;
