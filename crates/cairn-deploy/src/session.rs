//! In-memory registry of open upload sessions.
//!
//! Tracks, per session id, which content hashes are still missing. Batches may
//! arrive in any order, concurrently, or more than once: marking a hash present
//! is a set removal, so repeats are no-ops and nothing is double-counted.
//!
//! The map has no native expiry. Every lookup treats an expired session as
//! absent, and the daemon calls [`SessionRegistry::sweep_expired`] periodically
//! to drop them.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use cairn_core::ProjectId;
use cairn_manifest::ContentHash;
use thiserror::Error;

use crate::types::SessionManifest;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session not found or expired")]
    NotFound,

    #[error("hash {0} is not part of this session")]
    Unexpected(ContentHash),

    #[error("session is already being finalized")]
    Busy,
}

/// Server-side state of one upload session
#[derive(Debug)]
pub struct SessionState {
    pub project: ProjectId,
    pub manifest: Arc<SessionManifest>,
    /// Hashes absent from the store at creation, with the content type to store them under
    pub expected: HashMap<ContentHash, &'static str>,
    /// Subset of `expected` not yet uploaded
    pub pending: HashSet<ContentHash>,
    /// Unix seconds; the session is gone once `now >= expires_at`
    pub expires_at: u64,
    pub finalizing: bool,
}

impl SessionState {
    pub fn new(
        project: ProjectId,
        manifest: Arc<SessionManifest>,
        expected: HashMap<ContentHash, &'static str>,
        expires_at: u64,
    ) -> Self {
        let pending = expected.keys().copied().collect();
        SessionState {
            project,
            manifest,
            expected,
            pending,
            expires_at,
            finalizing: false,
        }
    }

    fn is_live(&self, now: u64) -> bool {
        now < self.expires_at
    }
}

/// What finalization needs from a claimed session
#[derive(Debug, Clone)]
pub struct ClaimedSession {
    pub manifest: Arc<SessionManifest>,
    /// Hashes that were missing before this deployment
    pub new_assets: HashSet<ContentHash>,
    /// Hashes still not uploaded (non-empty means the client skipped a batch)
    pub pending: usize,
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionState>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionState>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert(&self, sid: String, state: SessionState) {
        self.lock().insert(sid, state);
    }

    /// Content types for a batch of hashes, in the order given.
    ///
    /// Fails as a whole if any hash was not missing at session creation, so a
    /// rejected batch writes nothing.
    pub fn batch_targets<'a>(
        &self,
        sid: &str,
        project: &ProjectId,
        now: u64,
        hashes: impl IntoIterator<Item = &'a ContentHash>,
    ) -> Result<Vec<&'static str>, SessionError> {
        let map = self.lock();
        let state = live(&map, sid, project, now)?;
        hashes
            .into_iter()
            .map(|hash| {
                state
                    .expected
                    .get(hash)
                    .copied()
                    .ok_or(SessionError::Unexpected(*hash))
            })
            .collect()
    }

    /// Remove stored hashes from the pending set; returns how many remain.
    pub fn mark_present<'a>(
        &self,
        sid: &str,
        hashes: impl IntoIterator<Item = &'a ContentHash>,
    ) -> Result<usize, SessionError> {
        let mut map = self.lock();
        let state = map.get_mut(sid).ok_or(SessionError::NotFound)?;
        for hash in hashes {
            state.pending.remove(hash);
        }
        Ok(state.pending.len())
    }

    /// Move the session's expiry (used when the completion token is issued).
    pub fn touch(&self, sid: &str, expires_at: u64) -> Result<Arc<SessionManifest>, SessionError> {
        let mut map = self.lock();
        let state = map.get_mut(sid).ok_or(SessionError::NotFound)?;
        state.expires_at = expires_at;
        Ok(Arc::clone(&state.manifest))
    }

    /// Mark the session as being finalized. A second claim fails with `Busy`
    /// until the first is released or removed.
    pub fn claim(
        &self,
        sid: &str,
        project: &ProjectId,
        now: u64,
    ) -> Result<ClaimedSession, SessionError> {
        let mut map = self.lock();
        live(&map, sid, project, now)?;
        let state = map.get_mut(sid).ok_or(SessionError::NotFound)?;
        if state.finalizing {
            return Err(SessionError::Busy);
        }
        state.finalizing = true;

        Ok(ClaimedSession {
            manifest: Arc::clone(&state.manifest),
            new_assets: state.expected.keys().copied().collect(),
            pending: state.pending.len(),
        })
    }

    /// Undo a claim after a failed commit so the client can retry.
    pub fn release(&self, sid: &str) {
        if let Some(state) = self.lock().get_mut(sid) {
            state.finalizing = false;
        }
    }

    pub fn remove(&self, sid: &str) {
        self.lock().remove(sid);
    }

    /// Drop every expired session; returns how many were removed.
    pub fn sweep_expired(&self, now: u64) -> usize {
        let mut map = self.lock();
        let before = map.len();
        map.retain(|_, state| state.is_live(now) || state.finalizing);
        before - map.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn live<'m>(
    map: &'m HashMap<String, SessionState>,
    sid: &str,
    project: &ProjectId,
    now: u64,
) -> Result<&'m SessionState, SessionError> {
    match map.get(sid) {
        Some(state) if state.is_live(now) && &state.project == project => Ok(state),
        _ => Err(SessionError::NotFound),
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_manifest::hash_content;

    fn project() -> ProjectId {
        ProjectId::parse("site").unwrap()
    }

    fn state(missing: &[ContentHash], expires_at: u64) -> SessionState {
        let expected = missing.iter().map(|h| (*h, "text/plain")).collect();
        SessionState::new(project(), Arc::new(SessionManifest::new()), expected, expires_at)
    }

    #[test]
    fn pending_shrinks_idempotently_in_any_order() {
        let (a, b, c) = (hash_content(b"a"), hash_content(b"b"), hash_content(b"c"));
        let reg = SessionRegistry::new();
        reg.insert("s".into(), state(&[a, b, c], 100));

        assert_eq!(reg.mark_present("s", [&c]).unwrap(), 2);
        assert_eq!(reg.mark_present("s", [&c]).unwrap(), 2);
        assert_eq!(reg.mark_present("s", [&a, &c]).unwrap(), 1);
        assert_eq!(reg.mark_present("s", [&b]).unwrap(), 0);
    }

    #[test]
    fn batch_with_foreign_hash_is_rejected_whole() {
        let (a, stray) = (hash_content(b"a"), hash_content(b"stray"));
        let reg = SessionRegistry::new();
        reg.insert("s".into(), state(&[a], 100));

        assert_eq!(
            reg.batch_targets("s", &project(), 10, [&a, &stray]),
            Err(SessionError::Unexpected(stray))
        );
        assert_eq!(reg.batch_targets("s", &project(), 10, [&a]).unwrap(), vec!["text/plain"]);
    }

    #[test]
    fn expired_or_foreign_session_is_absent() {
        let a = hash_content(b"a");
        let reg = SessionRegistry::new();
        reg.insert("s".into(), state(&[a], 100));

        assert_eq!(
            reg.batch_targets("s", &project(), 100, [&a]),
            Err(SessionError::NotFound)
        );
        let other = ProjectId::parse("other").unwrap();
        assert_eq!(reg.batch_targets("s", &other, 10, [&a]), Err(SessionError::NotFound));
        assert_eq!(reg.batch_targets("nope", &project(), 10, [&a]), Err(SessionError::NotFound));
    }

    #[test]
    fn claim_is_exclusive_until_released() {
        let reg = SessionRegistry::new();
        reg.insert("s".into(), state(&[hash_content(b"a")], 100));

        let claimed = reg.claim("s", &project(), 10).unwrap();
        assert_eq!(claimed.new_assets.len(), 1);
        assert_eq!(reg.claim("s", &project(), 10).unwrap_err(), SessionError::Busy);

        reg.release("s");
        assert!(reg.claim("s", &project(), 10).is_ok());

        reg.remove("s");
        assert_eq!(reg.claim("s", &project(), 10).unwrap_err(), SessionError::NotFound);
    }

    #[test]
    fn sweep_drops_expired_but_not_finalizing() {
        let reg = SessionRegistry::new();
        reg.insert("old".into(), state(&[], 50));
        reg.insert("busy".into(), state(&[], 60));
        reg.insert("fresh".into(), state(&[], 500));
        reg.claim("busy", &project(), 55).unwrap();

        assert_eq!(reg.sweep_expired(100), 1);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn touch_extends_expiry() {
        let reg = SessionRegistry::new();
        reg.insert("s".into(), state(&[], 50));
        reg.touch("s", 200).unwrap();
        assert!(reg.claim("s", &project(), 100).is_ok());
    }
}
