use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("File not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
