//! Error types for lasttalk.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("no speakers found in transcript")]
    NoSpeakers,

    #[error("no messages for speaker: {0}")]
    SpeakerEmpty(String),

    #[error("unknown speaker: {0}")]
    UnknownSpeaker(String),

    #[error("generation provider is not configured")]
    ProviderUnavailable,

    #[error("provider error: {0}")]
    Provider(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
