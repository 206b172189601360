use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CairnError, CairnResult};

/// Top-level daemon configuration (loaded from cairn.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CairnConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub deploy: DeployConfig,
    pub resolver: ResolverConfig,
}

impl CairnConfig {
    /// Parse a TOML document into a config, filling unspecified fields with defaults.
    pub fn from_toml(text: &str) -> CairnResult<Self> {
        toml::from_str(text).map_err(|e| CairnError::Config(e.to_string()))
    }

    /// Load a config file, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> CairnResult<Self> {
        if !path.exists() {
            tracing::warn!("config file not found: {}  (using defaults)", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
            .map_err(|e| CairnError::Config(format!("parsing {}: {e}", path.display())))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP listen address for the deploy API (default: 0.0.0.0:8787)
    pub listen: String,
    /// Log level (default: info)
    pub log_level: String,
    /// Log format: "json" or "text"
    pub log_format: String,
    /// Maximum request body size in bytes (batches carry base64 content)
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Fs,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend kind (default: s3)
    pub backend: StorageBackend,
    /// S3 endpoint
    pub endpoint: String,
    /// S3 region (default: us-east-1)
    pub region: String,
    /// Bucket name
    pub bucket: String,
    /// Root directory for the fs backend
    pub root: PathBuf,
    /// Enforce HTTPS for S3 connections (warn/error on HTTP endpoints)
    pub enforce_tls: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for session tokens. Prefer CAIRN_TOKEN_SECRET over storing it here.
    pub token_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Maximum number of content hashes per upload batch (default: 10)
    pub batch_size: usize,
    /// Upload session lifetime in seconds (default: 3600)
    pub session_ttl_secs: u64,
    /// Re-hash uploaded content and reject mismatches (default: true)
    pub verify_uploads: bool,
    /// Concurrent existence checks during session creation (default: 16)
    pub exists_concurrency: usize,
    /// Interval between expired-session sweeps in seconds (default: 60)
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// How long a loaded manifest is served before reloading (default: 30)
    pub manifest_ttl_secs: u64,
    /// Fetch latency at or below which a read counts as a cache HIT (default: 100)
    pub hit_threshold_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8787".into(),
            log_level: "info".into(),
            log_format: "json".into(),
            max_body_bytes: 512 * 1024 * 1024,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::S3,
            endpoint: "http://localhost:8333".into(),
            region: "us-east-1".into(),
            bucket: "cairn".into(),
            root: PathBuf::from("/var/lib/cairn"),
            enforce_tls: false,
        }
    }
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            session_ttl_secs: 3600,
            verify_uploads: true,
            exists_concurrency: 16,
            sweep_interval_secs: 60,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            manifest_ttl_secs: 30,
            hit_threshold_ms: 100,
        }
    }
}
