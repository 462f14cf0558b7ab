use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Query is empty")]
    EmptyQuery,

    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
