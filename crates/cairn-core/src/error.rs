use thiserror::Error;

pub type CairnResult<T> = Result<T, CairnError>;

#[derive(Debug, Error)]
pub enum CairnError {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid project id '{id}': {reason}")]
    InvalidProject { id: String, reason: &'static str },

    #[error("{what} exceeds limit: {actual} > {limit}")]
    LimitExceeded {
        what: &'static str,
        limit: u64,
        actual: u64,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
