use thiserror::Error;

/// Message recorded on a failed upload when the failure carries none
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Dump Hub client errors
#[derive(Debug, Error)]
pub enum DumpHubError {
    /// Malformed size or chunk-size inputs, raised before any request is sent
    #[error("Planning error: {0}")]
    Planning(String),

    /// A single chunk request failed
    #[error("Chunk upload error: {0}")]
    ChunkUpload(String),

    /// Remote API rejected a request
    #[error("Remote API error: {0}")]
    Api(String),

    /// Validation errors (missing columns, bad input, etc.)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Local preview could not be produced
    #[error("Preview error: {0}")]
    Preview(String),

    /// Pattern string could not be parsed
    #[error("Pattern error: {0}")]
    Pattern(String),

    /// Configuration file errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Mutex poison error
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, DumpHubError>;

impl DumpHubError {
    /// The message stored on a failed file.
    ///
    /// Remote failures keep their bare message so the user sees what the
    /// server said; everything else uses the display form.
    pub fn failure_message(&self) -> String {
        let message = match self {
            DumpHubError::ChunkUpload(s) | DumpHubError::Api(s) | DumpHubError::Other(s) => {
                s.clone()
            }
            other => other.to_string(),
        };

        if message.trim().is_empty() {
            UNKNOWN_ERROR.to_string()
        } else {
            message
        }
    }
}

impl From<DumpHubError> for String {
    fn from(err: DumpHubError) -> String {
        err.to_string()
    }
}

impl From<url::ParseError> for DumpHubError {
    fn from(err: url::ParseError) -> Self {
        DumpHubError::Config(format!("invalid server URL: {}", err))
    }
}

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    fn context(self, msg: &str) -> Result<T>;
}

impl<T, E: Into<DumpHubError>> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| match e.into() {
            DumpHubError::Planning(s) => DumpHubError::Planning(format!("{}: {}", msg, s)),
            DumpHubError::ChunkUpload(s) => DumpHubError::ChunkUpload(format!("{}: {}", msg, s)),
            DumpHubError::Api(s) => DumpHubError::Api(format!("{}: {}", msg, s)),
            DumpHubError::Validation(s) => DumpHubError::Validation(format!("{}: {}", msg, s)),
            DumpHubError::Preview(s) => DumpHubError::Preview(format!("{}: {}", msg, s)),
            DumpHubError::Pattern(s) => DumpHubError::Pattern(format!("{}: {}", msg, s)),
            DumpHubError::Config(s) => DumpHubError::Config(format!("{}: {}", msg, s)),
            DumpHubError::LockPoisoned(s) => {
                DumpHubError::LockPoisoned(format!("{}: {}", msg, s))
            }
            DumpHubError::Other(s) => DumpHubError::Other(format!("{}: {}", msg, s)),
            // Wrapped library errors keep their source
            err @ (DumpHubError::Io(_) | DumpHubError::Json(_) | DumpHubError::Http(_)) => err,
        })
    }
}
