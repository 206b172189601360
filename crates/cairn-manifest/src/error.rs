use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("manifest too short: {len} bytes (header is {header})")]
    Truncated { len: usize, header: usize },

    #[error("manifest body of {body} bytes is not a whole number of {entry}-byte records")]
    RaggedBody { body: usize, entry: usize },

    #[error("manifest records out of order at index {index}")]
    Unsorted { index: usize },

    #[error("invalid content hash '{input}': {reason}")]
    InvalidHash { input: String, reason: &'static str },
}
