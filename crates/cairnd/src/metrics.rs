//! Prometheus /metrics + health check HTTP endpoints
//!
//! Endpoints:
//!   GET /metrics  Prometheus text format
//!   GET /healthz  Liveness probe (always 200 if process is running)
//!   GET /readyz   Readiness probe (200 if storage is reachable)

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use prometheus_client::{
    encoding::text::encode,
    metrics::{counter::Counter, family::Family, gauge::Gauge},
    registry::Registry,
};

use crate::server::AppState;

type Labels = Vec<(String, String)>;

/// Protocol counters, registered once at startup
#[derive(Clone, Default)]
pub struct Metrics {
    pub sessions_created: Counter,
    pub batches_accepted: Counter,
    pub assets_uploaded: Counter,
    pub deployments_finalized: Counter,
    pub assets_new: Counter,
    pub assets_skipped: Counter,
    pub open_sessions: Gauge,
    resolves: Family<Labels, Counter>,
}

impl Metrics {
    pub fn new(registry: &mut Registry) -> Self {
        let metrics = Metrics::default();

        registry.register(
            "cairn_sessions_created",
            "Upload sessions opened",
            metrics.sessions_created.clone(),
        );
        registry.register(
            "cairn_batches_accepted",
            "Upload batches stored",
            metrics.batches_accepted.clone(),
        );
        registry.register(
            "cairn_assets_uploaded",
            "Assets received through upload batches",
            metrics.assets_uploaded.clone(),
        );
        registry.register(
            "cairn_deployments_finalized",
            "Manifests committed",
            metrics.deployments_finalized.clone(),
        );
        registry.register(
            "cairn_assets_new",
            "Committed manifest entries whose content was newly uploaded",
            metrics.assets_new.clone(),
        );
        registry.register(
            "cairn_assets_skipped",
            "Committed manifest entries whose content was already stored",
            metrics.assets_skipped.clone(),
        );
        registry.register(
            "cairn_open_sessions",
            "Upload sessions held in memory",
            metrics.open_sessions.clone(),
        );
        registry.register(
            "cairn_resolves",
            "Raw path resolutions by cache status",
            metrics.resolves.clone(),
        );

        metrics
    }

    /// Count one resolution labelled `HIT` or `MISS`.
    pub fn record_resolve(&self, status: &str) {
        self.resolves
            .get_or_create(&vec![("status".to_string(), status.to_string())])
            .inc();
    }
}

pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    state
        .metrics
        .open_sessions
        .set(state.deployer.sessions().len() as i64);

    let mut body = String::new();
    match encode(&mut body, &state.registry) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            body,
        ),
        Err(e) => {
            tracing::error!("metrics encode failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                e.to_string(),
            )
        }
    }
}

/// Liveness probe: returns 200 if the process is running.
pub async fn healthz_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Readiness probe: returns 200 if storage is reachable, 503 otherwise.
pub async fn readyz_handler(State(state): State<AppState>) -> impl IntoResponse {
    match cairn_storage::check_health(state.deployer.store().operator()).await {
        Ok(()) => (StatusCode::OK, "ready"),
        Err(e) => {
            tracing::warn!("readiness check failed: {e}");
            (StatusCode::SERVICE_UNAVAILABLE, "storage unreachable")
        }
    }
}
