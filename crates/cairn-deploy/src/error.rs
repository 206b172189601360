use cairn_core::CairnError;
use cairn_manifest::ManifestError;
use cairn_storage::StoreError;
use thiserror::Error;

use crate::session::SessionError;
use crate::token::TokenError;

pub type DeployResult<T> = Result<T, DeployError>;

#[derive(Debug, Error)]
pub enum DeployError {
    /// Malformed input or a limit violation; nothing was created or written
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unauthorized: {0}")]
    Unauthorized(#[from] TokenError),

    #[error("upload session not found or expired")]
    SessionNotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    /// Backend failure; the same call may be retried
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DeployError {
    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            DeployError::Validation(_) => "validation_error",
            DeployError::Unauthorized(_) => "unauthorized",
            DeployError::SessionNotFound => "session_not_found",
            DeployError::Conflict(_) => "conflict",
            DeployError::Store(_) => "store_unavailable",
            DeployError::Internal(_) => "internal_error",
        }
    }
}

impl From<CairnError> for DeployError {
    fn from(e: CairnError) -> Self {
        DeployError::Validation(e.to_string())
    }
}

impl From<ManifestError> for DeployError {
    fn from(e: ManifestError) -> Self {
        DeployError::Validation(e.to_string())
    }
}

impl From<SessionError> for DeployError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound => DeployError::SessionNotFound,
            SessionError::Unexpected(hash) => {
                DeployError::Validation(format!("hash {hash} is not part of this upload session"))
            }
            SessionError::Busy => {
                DeployError::Conflict("session is already being finalized".into())
            }
        }
    }
}
