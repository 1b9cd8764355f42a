use std::str::Utf8Error;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FiledockError>;

#[derive(Error, Debug)]
pub enum FiledockError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Invalid option: {0}")]
    InvalidOption(String),
    #[error("Security error: {0}")]
    Security(String),
    #[error("Upload cancelled")]
    Cancelled,
    #[error("Parsing error")]
    Parse,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<Utf8Error> for FiledockError {
    fn from(_: Utf8Error) -> Self {
        Self::Parse
    }
}

impl From<serde_json::Error> for FiledockError {
    fn from(_: serde_json::Error) -> Self {
        Self::Parse
    }
}

impl From<url::ParseError> for FiledockError {
    fn from(_: url::ParseError) -> Self {
        Self::Parse
    }
}

impl From<toml::de::Error> for FiledockError {
    fn from(_: toml::de::Error) -> Self {
        Self::Parse
    }
}

impl From<toml::ser::Error> for FiledockError {
    fn from(_: toml::ser::Error) -> Self {
        Self::Parse
    }
}
