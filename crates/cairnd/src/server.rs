//! HTTP routes for the deploy protocol and raw resolution.
//!
//! ```text
//! POST /projects/{id}/assets-upload-session   phase 1
//! POST /projects/{id}/assets/upload           phase 2 (Authorization: Bearer)
//! POST /projects/{id}/deploy                  phase 3, or legacy single-phase
//! GET  /projects/{id}/files/{*path}           resolve through the manifest
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use cairn_core::ProjectId;
use cairn_deploy::{
    BatchReceipt, DeployOutcome, Deployer, DeploymentMetadata, LegacyAsset, SessionGrant,
    SubmittedAsset,
};
use cairn_resolver::ResolverPool;
use prometheus_client::registry::Registry;
use serde::Deserialize;

use crate::error::ApiError;
use crate::metrics::{self, Metrics};

static X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub deployer: Arc<Deployer>,
    pub resolvers: Arc<ResolverPool>,
    pub metrics: Metrics,
    pub registry: Arc<Registry>,
}

#[derive(Debug, Deserialize)]
struct CreateSessionRequest {
    manifest: BTreeMap<String, SubmittedAsset>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeployRequest {
    completion_jwt: Option<String>,
    assets: Option<Vec<LegacyAsset>>,
    #[serde(flatten)]
    metadata: DeploymentMetadata,
}

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route(
            "/projects/{id}/assets-upload-session",
            post(create_session_handler),
        )
        .route("/projects/{id}/assets/upload", post(upload_handler))
        .route("/projects/{id}/deploy", post(deploy_handler))
        .route("/projects/{id}/files/{*path}", get(file_handler))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/healthz", get(metrics::healthz_handler))
        .route("/readyz", get(metrics::readyz_handler))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

fn parse_project(id: &str) -> Result<ProjectId, ApiError> {
    Ok(ProjectId::parse(id)?)
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".into()))
}

async fn create_session_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<Json<SessionGrant>, ApiError> {
    let project = parse_project(&id)?;
    let Json(req) = body?;

    let grant = state.deployer.create_session(&project, req.manifest).await?;
    state.metrics.sessions_created.inc();
    Ok(Json(grant))
}

async fn upload_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<BTreeMap<String, String>>, JsonRejection>,
) -> Result<Json<BatchReceipt>, ApiError> {
    let project = parse_project(&id)?;
    let token = bearer_token(&headers)?;
    let Json(payload) = body?;

    let count = payload.len() as u64;
    let receipt = state.deployer.accept_batch(token, &project, payload).await?;
    state.metrics.batches_accepted.inc();
    state.metrics.assets_uploaded.inc_by(count);
    Ok(Json(receipt))
}

async fn deploy_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<DeployRequest>, JsonRejection>,
) -> Result<Json<DeployOutcome>, ApiError> {
    let project = parse_project(&id)?;
    let Json(req) = body?;

    let outcome = match (req.completion_jwt, req.assets) {
        (Some(jwt), None) => state.deployer.finalize(&jwt, &project, req.metadata).await?,
        (None, Some(assets)) => {
            state
                .deployer
                .deploy_legacy(&project, assets, req.metadata)
                .await?
        }
        (Some(_), Some(_)) => {
            return Err(ApiError::BadRequest(
                "send either completionJwt or assets, not both".into(),
            ))
        }
        (None, None) => {
            return Err(ApiError::BadRequest(
                "completionJwt or assets is required".into(),
            ))
        }
    };

    state.resolvers.invalidate(&project).await;
    state.metrics.deployments_finalized.inc();
    state.metrics.assets_new.inc_by(outcome.new_assets as u64);
    state
        .metrics
        .assets_skipped
        .inc_by(outcome.skipped_assets as u64);
    Ok(Json(outcome))
}

async fn file_handler(
    State(state): State<AppState>,
    Path((id, path)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let project = parse_project(&id)?;
    let path = format!("/{}", path.trim_start_matches('/'));

    let Some(asset) = state.resolvers.fetch_by_path(&project, &path).await? else {
        return Err(ApiError::NotFound(format!("{path} is not deployed")));
    };

    let status = asset.cache_status.as_str();
    state.metrics.record_resolve(status);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, asset.content_type.clone()),
            (header::ETAG, format!("\"{}\"", asset.etag())),
            (X_CACHE.clone(), status.to_string()),
        ],
        asset.data,
    )
        .into_response())
}
