use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("config not found: create .theme-preview.yaml or pass --config")]
    ConfigNotFound,

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("missing environment variable {0}")]
    MissingEnv(String),

    #[error("invalid repository '{0}': expected OWNER/NAME")]
    InvalidRepo(String),

    #[error("theme CLI '{0}' not found on PATH")]
    CliNotFound(String),

    #[error("event payload is not a pull_request event: {0}")]
    InvalidEvent(String),

    #[error("store theme limit ({limit}) reached and no preview theme can be evicted")]
    NoEvictionCandidate { limit: usize },

    #[error("{operation} failed with status {status}: {body}")]
    Api {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("{operation} request failed: {source}")]
    Http {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Theme(#[from] shopify_theme::ThemeCliError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl PreviewError {
    /// True for a 404 from the review API.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PreviewError::Api { status: 404, .. })
    }
}

pub type Result<T> = std::result::Result<T, PreviewError>;
