use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] rendition::ParseError),

    #[error("Selection error: {0}")]
    Selection(#[from] rendition::SelectionError),

    #[cfg(feature = "interactive")]
    #[error("Prompt error: {0}")]
    Prompt(#[from] inquire::InquireError),

    #[error("TLS setup error: {0}")]
    Tls(String),

    #[error("HTTP {status} while fetching {url}")]
    HttpStatus { status: u16, url: String },

    #[error("{tool} not found, install it or set its path in the configuration")]
    ToolNotFound { tool: String },

    #[error("{tool} exited with {status}: {message}")]
    ToolFailed {
        tool: String,
        status: String,
        message: String,
    },

    #[error("{failed} of {total} fetches failed")]
    FetchFailed { failed: usize, total: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Selection cancelled by user")]
    SelectionCancelled,

    #[error("Timeout error: Operation timed out after {seconds} seconds")]
    Timeout { seconds: u64 },
}

impl CliError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn timeout(seconds: u64) -> Self {
        Self::Timeout { seconds }
    }

    pub fn user_cancelled() -> Self {
        Self::SelectionCancelled
    }

    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout { .. } => true,
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
