//! cairn-manifest: fingerprints and the binary path → content index
//!
//! # Overview
//! - `hash`: SHA-256 path fingerprints (truncated to 16 bytes) and content
//!   fingerprints (full 32 bytes)
//! - `codec`: the sorted fixed-record manifest, encode + binary-search lookup
//!
//! Wire layout:
//! ```text
//! [0, 16)            header (reserved, zero-filled)
//! [16, 16 + 48·k)    k records: [0,16) path hash | [16,48) content hash
//! ```
//! Records are sorted ascending by path hash (unsigned byte-wise).

pub mod codec;
pub mod error;
pub mod hash;

pub use codec::{encode, lookup, Manifest, ENTRY_SIZE, HEADER_SIZE};
pub use error::ManifestError;
pub use hash::{hash_content, hash_path, ContentHash, PathHash};
