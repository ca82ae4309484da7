use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("user is not authenticated")]
    AuthenticationRequired,

    #[error("{message}")]
    Transport { status: u16, message: String },

    #[error("invalid response body: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("subscription failed: {0}")]
    Subscription(String),

    #[error("{0}")]
    Application(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("not found")]
    NotFound,

    #[error("server returned an empty response")]
    EmptyResponse,
}

impl Error {
    /// HTTP status of a transport failure, if this is one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
