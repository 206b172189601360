//! Phases 1 and 2: session creation with store diffing, and batch upload.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use cairn_core::limits;
use cairn_core::types::Phase;
use cairn_core::ProjectId;
use cairn_manifest::{hash_content, ContentHash};
use cairn_storage::content_type;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info};
use uuid::Uuid;

use crate::deployer::Deployer;
use crate::error::{DeployError, DeployResult};
use crate::session::SessionState;
use crate::token::{manifest_digest, SessionClaims};
use crate::types::{BatchReceipt, SessionGrant, SessionManifest, SubmittedAsset};
use crate::unix_now;
use crate::validate::{decode_base64, validate_manifest};

impl Deployer {
    /// Phase 1: validate the submission, find content missing from the store
    /// and open a session.
    ///
    /// When nothing is missing the returned token is already a completion
    /// token and `buckets` is empty.
    pub async fn create_session(
        &self,
        project: &ProjectId,
        submitted: BTreeMap<String, SubmittedAsset>,
    ) -> DeployResult<SessionGrant> {
        let manifest = validate_manifest(submitted)?;

        // Distinct hashes, first seen over path order; the first path also
        // decides the content type the bytes are stored under.
        let mut seen = HashSet::new();
        let distinct: Vec<(ContentHash, &'static str)> = manifest
            .iter()
            .filter(|(_, asset)| seen.insert(asset.hash))
            .map(|(path, asset)| (asset.hash, content_type::for_path(path)))
            .collect();

        let present = self.present_in_store(distinct.iter().map(|(hash, _)| hash)).await?;
        let missing: Vec<(ContentHash, &'static str)> = distinct
            .into_iter()
            .zip(present)
            .filter(|(_, present)| !present)
            .map(|(entry, _)| entry)
            .collect();

        let buckets: Vec<Vec<ContentHash>> = missing
            .chunks(self.batch_size())
            .map(|chunk| chunk.iter().map(|(hash, _)| *hash).collect())
            .collect();

        let now = unix_now();
        let expires_at = now + self.config.session_ttl_secs;
        let sid = Uuid::new_v4().to_string();
        let manifest = Arc::new(manifest);
        let phase = if missing.is_empty() {
            Phase::Complete
        } else {
            Phase::Upload
        };

        let missing_count = missing.len();
        self.sessions.insert(
            sid.clone(),
            SessionState::new(
                project.clone(),
                Arc::clone(&manifest),
                missing.into_iter().collect(),
                expires_at,
            ),
        );

        let jwt = self.issue(project, &sid, phase, &manifest, now, expires_at);

        info!(
            project = %project,
            session = %sid,
            assets = manifest.len(),
            missing = missing_count,
            batches = buckets.len(),
            phase = %phase,
            "upload session created"
        );

        Ok(SessionGrant { jwt, buckets })
    }

    /// Phase 2: store one batch of `hex hash → base64 content`.
    ///
    /// Batches may arrive in any order and may repeat. The whole batch is
    /// validated before anything is written. Once no missing content remains
    /// the receipt carries the completion token.
    pub async fn accept_batch(
        &self,
        token: &str,
        project: &ProjectId,
        payload: BTreeMap<String, String>,
    ) -> DeployResult<BatchReceipt> {
        let now = unix_now();
        let claims = self.signer.verify(token, Phase::Upload, project, now)?;

        let mut uploads = Vec::with_capacity(payload.len());
        for (hex, encoded) in &payload {
            let hash = ContentHash::from_hex(hex)?;
            let data = decode_base64(hex, encoded)?;
            limits::check_asset_size(data.len() as u64)?;
            if self.config.verify_uploads {
                let actual = hash_content(&data);
                if actual != hash {
                    return Err(DeployError::Validation(format!(
                        "content does not match hash {hash} (hashes to {actual})"
                    )));
                }
            }
            uploads.push((hash, data));
        }

        let content_types =
            self.sessions
                .batch_targets(&claims.sid, project, now, uploads.iter().map(|(hash, _)| hash))?;

        let hashes: Vec<ContentHash> = uploads.iter().map(|(hash, _)| *hash).collect();
        let mut bytes = 0usize;
        for ((hash, data), content_type) in uploads.into_iter().zip(content_types) {
            bytes += data.len();
            self.store.put_asset(&hash, data, content_type).await?;
        }

        let remaining = self.sessions.mark_present(&claims.sid, &hashes)?;
        info!(
            project = %project,
            session = %claims.sid,
            assets = hashes.len(),
            bytes,
            remaining,
            "batch accepted"
        );

        if remaining > 0 {
            return Ok(BatchReceipt { jwt: None });
        }

        let expires_at = now + self.config.session_ttl_secs;
        let manifest = self.sessions.touch(&claims.sid, expires_at)?;
        if manifest_digest(&manifest) != claims.mdg {
            return Err(DeployError::SessionNotFound);
        }
        let jwt = self.issue(project, &claims.sid, Phase::Complete, &manifest, now, expires_at);
        debug!(session = %claims.sid, "all content present, completion token issued");

        Ok(BatchReceipt { jwt: Some(jwt) })
    }

    /// Existence of each hash in the store, in input order.
    pub(crate) async fn present_in_store<'a>(
        &self,
        hashes: impl Iterator<Item = &'a ContentHash>,
    ) -> DeployResult<Vec<bool>> {
        let hashes: Vec<ContentHash> = hashes.copied().collect();
        let store = &self.store;
        let present: Vec<bool> = stream::iter(hashes)
            .map(|hash| async move { store.exists(&hash).await })
            .buffered(self.exists_concurrency())
            .try_collect()
            .await?;
        debug!(
            checked = present.len(),
            present = present.iter().filter(|p| **p).count(),
            "dedup: existence check"
        );
        Ok(present)
    }

    fn issue(
        &self,
        project: &ProjectId,
        sid: &str,
        phase: Phase,
        manifest: &SessionManifest,
        iat: u64,
        exp: u64,
    ) -> String {
        let claims = SessionClaims {
            sub: project.clone(),
            sid: sid.to_string(),
            phase,
            mdg: manifest_digest(manifest),
            // Upload tokens travel in a header, so they carry only the digest
            manifest: (phase == Phase::Complete).then(|| manifest.clone()),
            iat,
            exp,
        };
        self.signer.sign(&claims)
    }
}
