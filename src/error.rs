use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("{0}")]
    Validation(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("unsupported backend: {0:?}")]
    UnsupportedBackend(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<imap::error::Error> for Error {
    fn from(e: imap::error::Error) -> Self {
        Error::Protocol(e.to_string())
    }
}

impl From<mailparse::MailParseError> for Error {
    fn from(e: mailparse::MailParseError) -> Self {
        Error::Protocol(format!("malformed message: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
