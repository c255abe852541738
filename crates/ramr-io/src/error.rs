use thiserror::Error;

/// Result type local to ramr-io.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record codec error: {0}")]
    Codec(String),

    #[error("storage config error: {0}")]
    Config(String),
}

impl From<ramr_core::Error> for Error {
    fn from(e: ramr_core::Error) -> Self {
        match e {
            ramr_core::Error::Config(msg) => Error::Config(msg),
            other => Error::Codec(other.to_string()),
        }
    }
}
