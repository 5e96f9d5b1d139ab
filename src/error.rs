use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubweaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Required external executable could not be located at its configured path
    #[error("{tool} not found at '{path}'. Check the [tools] section of the configuration")]
    ToolNotFound { tool: String, path: String },

    #[error("{tool} failed (exit code {code}): {stderr}")]
    ToolFailed {
        tool: String,
        code: String,
        stderr: String,
    },

    #[error("Translation service quota exceeded (HTTP {status})")]
    Quota { status: u16 },

    #[error("Translation service unavailable (HTTP {status})")]
    ServiceUnavailable { status: u16 },

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Subtitle error: {0}")]
    Subtitle(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Cache error: {0}")]
    Cache(String),
}

impl SubweaveError {
    /// Errors that stop the whole step instead of a single file
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ToolNotFound { .. } | Self::Config(_) | Self::UnknownLanguage(_)
        )
    }

    /// Transient service conditions worth another request
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Quota { .. } | Self::ServiceUnavailable { .. } => true,
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SubweaveError>;
