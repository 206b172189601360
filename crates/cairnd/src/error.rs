//! API error type and its JSON response body.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cairn_core::CairnError;
use cairn_deploy::DeployError;
use cairn_resolver::ResolveError;

/// Errors returned by protocol handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Malformed request outside the deploy core (path, JSON shape)
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Deploy(e) => match e {
                DeployError::Validation(_) => StatusCode::BAD_REQUEST,
                DeployError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                DeployError::SessionNotFound => StatusCode::NOT_FOUND,
                DeployError::Conflict(_) => StatusCode::CONFLICT,
                DeployError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
                DeployError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Resolve(e) => match e {
                ResolveError::ManifestMissing(_) => StatusCode::NOT_FOUND,
                ResolveError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
                ResolveError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Machine-readable error code placed in the `error` field
    pub fn code(&self) -> &'static str {
        match self {
            Self::Deploy(e) => e.code(),
            Self::Resolve(e) => match e {
                ResolveError::ManifestMissing(_) => "not_found",
                ResolveError::Decode(_) => "corrupt_manifest",
                ResolveError::Store(_) => "store_unavailable",
            },
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::NotFound(_) => "not_found",
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<CairnError> for ApiError {
    fn from(e: CairnError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "request failed: {self}");
        } else {
            tracing::debug!(code = self.code(), "request rejected: {self}");
        }

        let body = serde_json::json!({
            "success": false,
            "error": self.code(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::ProjectId;
    use cairn_deploy::TokenError;

    #[test]
    fn deploy_errors_map_to_statuses() {
        let cases = [
            (DeployError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (DeployError::Unauthorized(TokenError::Expired), StatusCode::UNAUTHORIZED),
            (DeployError::SessionNotFound, StatusCode::NOT_FOUND),
            (DeployError::Conflict("busy".into()), StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn missing_manifest_is_not_found() {
        let err = ApiError::from(ResolveError::ManifestMissing(ProjectId::parse("p").unwrap()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "not_found");
    }
}
