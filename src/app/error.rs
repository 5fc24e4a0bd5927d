use thiserror::Error;

#[derive(Error, Debug)]
pub enum EddyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Response decoding error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to fetch {source_name}: {message}")]
    SourceFetch {
        source_name: &'static str,
        message: String,
    },

    #[error("Content unavailable: {}", .0.join("; "))]
    ContentUnavailable(Vec<String>),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, EddyError>;
