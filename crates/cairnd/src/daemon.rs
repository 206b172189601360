//! Daemon lifecycle: storage, signer, session sweeper, HTTP server

use anyhow::{Context, Result};
use cairn_core::config::{CairnConfig, StorageBackend};
use cairn_deploy::{Deployer, TokenSigner};
use cairn_resolver::ResolverPool;
use cairn_storage::AssetStore;
use prometheus_client::registry::Registry;
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::metrics::Metrics;
use crate::server::{router, AppState};

pub async fn run(config: CairnConfig) -> Result<()> {
    info!("daemon starting");

    // Build storage operator and verify connectivity
    let (access_key, secret_key) = match config.storage.backend {
        StorageBackend::S3 => (
            std::env::var("CAIRN_S3_ACCESS_KEY_ID")
                .context("S3 credentials not set: export CAIRN_S3_ACCESS_KEY_ID")?,
            std::env::var("CAIRN_S3_SECRET_ACCESS_KEY")
                .context("CAIRN_S3_SECRET_ACCESS_KEY not set")?,
        ),
        _ => (String::new(), String::new()),
    };
    let op = cairn_storage::build_from_core_config(&config.storage, &access_key, &secret_key)
        .context("building storage operator")?;
    match cairn_storage::check_health(&op).await {
        Ok(()) => info!(backend = ?config.storage.backend, "storage: connected"),
        Err(e) => warn!(backend = ?config.storage.backend, "storage: {e}  (serving anyway, /readyz reports 503)"),
    }
    let store = AssetStore::new(op);

    // Token signing secret: env wins over config
    let secret = std::env::var("CAIRN_TOKEN_SECRET")
        .ok()
        .or_else(|| config.auth.token_secret.clone())
        .context("no token secret: set CAIRN_TOKEN_SECRET or [auth].token_secret")?;
    let signer = TokenSigner::new(SecretString::from(secret)).context("loading token secret")?;

    let deployer = Arc::new(Deployer::new(store.clone(), signer, config.deploy.clone()));
    let resolvers = Arc::new(ResolverPool::new(store, config.resolver.clone()));

    let mut registry = Registry::default();
    let metrics = Metrics::new(&mut registry);

    spawn_session_sweeper(
        Arc::clone(&deployer),
        Duration::from_secs(config.deploy.sweep_interval_secs.max(1)),
    );

    let state = AppState {
        deployer,
        resolvers,
        metrics,
        registry: Arc::new(registry),
    };
    let app = router(state, config.server.max_body_bytes);

    let addr = config.server.listen.clone();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    info!(addr = %addr, "http: listening (protocol, /metrics, /healthz, /readyz)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;

    info!("daemon stopped");
    Ok(())
}

/// Periodically drop expired upload sessions.
fn spawn_session_sweeper(deployer: Arc<Deployer>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let removed = deployer.sweep_sessions();
            if removed > 0 {
                info!(removed, open = deployer.sessions().len(), "swept expired upload sessions");
            } else {
                debug!(open = deployer.sessions().len(), "session sweep");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
