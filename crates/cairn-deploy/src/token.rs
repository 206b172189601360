//! Phase-scoped session tokens (compact JWS, HS256).
//!
//! `header.claims.signature`, each part base64url without padding. Only HS256
//! is accepted; the signing secret is loaded once at startup and passed in
//! explicitly.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use cairn_core::types::Phase;
use cairn_core::ProjectId;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::types::SessionManifest;

type HmacSha256 = Hmac<Sha256>;

/// Minimum accepted secret length in bytes
pub const MIN_SECRET_LEN: usize = 32;

const ALG: &str = "HS256";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("signing secret must be at least {MIN_SECRET_LEN} bytes")]
    WeakSecret,

    #[error("malformed token")]
    Malformed,

    #[error("unsupported token algorithm")]
    UnsupportedAlgorithm,

    #[error("invalid token signature")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("token is for phase '{actual}', expected '{expected}'")]
    WrongPhase { expected: Phase, actual: Phase },

    #[error("token was issued for a different project")]
    WrongProject,
}

#[derive(Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Claims carried by a session token.
///
/// Upload tokens bind the manifest by digest (they travel in a header);
/// completion tokens embed the full path → hash mapping for the commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Project id
    pub sub: ProjectId,
    /// Session id
    pub sid: String,
    pub phase: Phase,
    /// SHA-256 (hex) of the canonical JSON manifest
    pub mdg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<SessionManifest>,
    pub iat: u64,
    pub exp: u64,
}

/// Digest binding a token to a manifest without embedding it.
pub fn manifest_digest(manifest: &SessionManifest) -> String {
    // BTreeMap serialises in key order, so this is canonical
    let json = serde_json::to_vec(manifest).unwrap_or_default();
    hex::encode(Sha256::digest(&json))
}

/// Issues and verifies session tokens with one process-wide secret
#[derive(Clone)]
pub struct TokenSigner {
    /// Keyed HMAC state, cloned per token
    mac: HmacSha256,
}

impl TokenSigner {
    pub fn new(secret: SecretString) -> Result<Self, TokenError> {
        let key = secret.expose_secret().as_bytes();
        if key.len() < MIN_SECRET_LEN {
            return Err(TokenError::WeakSecret);
        }
        let mac = HmacSha256::new_from_slice(key).map_err(|_| TokenError::WeakSecret)?;
        Ok(TokenSigner { mac })
    }

    pub fn sign(&self, claims: &SessionClaims) -> String {
        let header = Header {
            alg: ALG.into(),
            typ: "JWT".into(),
        };
        let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap_or_default());
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap_or_default());
        let signing_input = format!("{header}.{payload}");

        let mut mac = self.mac.clone();
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{signing_input}.{signature}")
    }

    /// Verify signature, expiry, phase and project, in that order.
    ///
    /// A token is expired once `now >= exp`.
    pub fn verify(
        &self,
        token: &str,
        phase: Phase,
        project: &ProjectId,
        now: u64,
    ) -> Result<SessionClaims, TokenError> {
        let (signing_input, signature) = token.trim().rsplit_once('.').ok_or(TokenError::Malformed)?;
        let (header, payload) = signing_input
            .split_once('.')
            .ok_or(TokenError::Malformed)?;

        let header: Header = decode_part(header)?;
        if header.alg != ALG {
            return Err(TokenError::UnsupportedAlgorithm);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;
        let mut mac = self.mac.clone();
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims: SessionClaims = decode_part(payload)?;

        if now >= claims.exp {
            return Err(TokenError::Expired);
        }
        if claims.phase != phase {
            return Err(TokenError::WrongPhase {
                expected: phase,
                actual: claims.phase,
            });
        }
        if &claims.sub != project {
            return Err(TokenError::WrongProject);
        }

        Ok(claims)
    }
}

fn decode_part<T: for<'de> Deserialize<'de>>(part: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
