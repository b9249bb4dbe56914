use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Image decode error: {0}")]
    Decode(String),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Session error: {0}")]
    Session(String),
}

impl Error {
    /// Whether the error was caused by the uploaded file rather than the model.
    pub fn is_upload_error(&self) -> bool {
        matches!(self, Error::Decode(_) | Error::UnsupportedFormat(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
