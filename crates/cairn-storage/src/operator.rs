//! OpenDAL Operator factory for cairn storage backends

use anyhow::{Context, Result};
use cairn_core::config::{StorageBackend, StorageConfig as CoreStorageConfig};
use opendal::Operator;

/// Minimal S3 config needed to build an operator
/// (full config lives in cairn-core's StorageConfig)
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Build an OpenDAL Operator for any S3-compatible endpoint.
///
/// Uses path-style addressing (default in opendal 0.55), which SeaweedFS and
/// MinIO require.
pub fn build_operator(cfg: &StorageConfig) -> Result<Operator> {
    let builder = opendal::services::S3::default()
        .endpoint(&cfg.endpoint)
        .region(&cfg.region)
        .bucket(&cfg.bucket)
        .access_key_id(&cfg.access_key_id)
        .secret_access_key(&cfg.secret_access_key);

    let op = Operator::new(builder)
        .context("creating OpenDAL S3 operator")?
        .layer(opendal::layers::LoggingLayer::default())
        .layer(
            opendal::layers::RetryLayer::new()
                .with_max_times(5)
                .with_jitter(),
        )
        .finish();

    Ok(op)
}

/// In-process operator; content is lost when the process exits.
pub fn memory_operator() -> Result<Operator> {
    Ok(Operator::new(opendal::services::Memory::default())
        .context("creating OpenDAL memory operator")?
        .finish())
}

fn fs_operator(root: &std::path::Path) -> Result<Operator> {
    let root = root
        .to_str()
        .with_context(|| format!("fs root is not UTF-8: {}", root.display()))?;
    Ok(Operator::new(opendal::services::Fs::default().root(root))
        .context("creating OpenDAL fs operator")?
        .layer(opendal::layers::LoggingLayer::default())
        .finish())
}

/// Build an operator from cairn-core config + credentials.
///
/// Credentials are only consulted for the S3 backend. If `enforce_tls` is true
/// and the S3 endpoint uses HTTP, this returns an error; otherwise a warning is
/// logged for non-HTTPS endpoints.
pub fn build_from_core_config(
    storage: &CoreStorageConfig,
    access_key_id: &str,
    secret_access_key: &str,
) -> Result<Operator> {
    match storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage: deployments do not survive restart");
            memory_operator()
        }
        StorageBackend::Fs => fs_operator(&storage.root),
        StorageBackend::S3 => {
            if storage.endpoint.starts_with("http://") {
                if storage.enforce_tls {
                    anyhow::bail!(
                        "S3 endpoint uses plaintext HTTP ({}), but enforce_tls is enabled. \
                         Use an HTTPS endpoint or set storage.enforce_tls = false for local development.",
                        storage.endpoint
                    );
                }
                tracing::warn!(
                    endpoint = %storage.endpoint,
                    "S3 endpoint uses plaintext HTTP; credentials are transmitted unencrypted"
                );
            }

            build_operator(&StorageConfig {
                endpoint: storage.endpoint.clone(),
                region: storage.region.clone(),
                bucket: storage.bucket.clone(),
                access_key_id: access_key_id.to_string(),
                secret_access_key: secret_access_key.to_string(),
            })
        }
    }
}
