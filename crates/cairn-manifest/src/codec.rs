//! Sorted binary manifest: encode and binary-search lookup.
//!
//! The buffer is a 16-byte reserved header followed by fixed 48-byte records,
//! back to back. Records are ordered by path hash so a lookup is a binary
//! search over the record region; nothing is ever scanned linearly.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::debug;

use crate::error::ManifestError;
use crate::hash::{hash_path, ContentHash, PathHash, CONTENT_HASH_SIZE, PATH_HASH_SIZE};

/// Size of the fixed header in bytes (reserved for format/version metadata).
pub const HEADER_SIZE: usize = 16;

/// Size of each record: 16-byte path hash + 32-byte content hash.
pub const ENTRY_SIZE: usize = PATH_HASH_SIZE + CONTENT_HASH_SIZE;

/// Encode `(path, content hash)` pairs into manifest bytes.
///
/// Input order does not matter. When a path appears more than once the last
/// occurrence wins.
pub fn encode<'a, I>(entries: I) -> Vec<u8>
where
    I: IntoIterator<Item = (&'a str, ContentHash)>,
{
    let sorted: BTreeMap<PathHash, ContentHash> = entries
        .into_iter()
        .map(|(path, hash)| (hash_path(path), hash))
        .collect();

    let mut out = Vec::with_capacity(HEADER_SIZE + sorted.len() * ENTRY_SIZE);
    out.extend_from_slice(&[0u8; HEADER_SIZE]);
    for (path_hash, content_hash) in &sorted {
        out.extend_from_slice(path_hash.as_bytes());
        out.extend_from_slice(content_hash.as_bytes());
    }

    debug!(entries = sorted.len(), bytes = out.len(), "encoded manifest");
    out
}

/// Look up `path` directly in encoded manifest bytes.
///
/// Only the buffer length is validated here; use [`Manifest::from_bytes`] when
/// the manifest will serve more than one lookup.
pub fn lookup(bytes: &[u8], path: &str) -> Result<Option<ContentHash>, ManifestError> {
    let count = record_count(bytes.len())?;
    Ok(search(&bytes[HEADER_SIZE..], count, &hash_path(path)))
}

/// Number of records in a buffer of `len` bytes, or a decode error.
fn record_count(len: usize) -> Result<usize, ManifestError> {
    if len < HEADER_SIZE {
        return Err(ManifestError::Truncated {
            len,
            header: HEADER_SIZE,
        });
    }
    let body = len - HEADER_SIZE;
    if body % ENTRY_SIZE != 0 {
        return Err(ManifestError::RaggedBody {
            body,
            entry: ENTRY_SIZE,
        });
    }
    Ok(body / ENTRY_SIZE)
}

fn search(records: &[u8], count: usize, target: &PathHash) -> Option<ContentHash> {
    let target = target.as_bytes().as_slice();
    let mut lo = 0usize;
    let mut hi = count;

    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let offset = mid * ENTRY_SIZE;
        let key = &records[offset..offset + PATH_HASH_SIZE];

        match key.cmp(target) {
            Ordering::Equal => {
                let mut hash = [0u8; CONTENT_HASH_SIZE];
                hash.copy_from_slice(&records[offset + PATH_HASH_SIZE..offset + ENTRY_SIZE]);
                return Some(ContentHash(hash));
            }
            Ordering::Less => lo = mid + 1,
            Ordering::Greater => hi = mid,
        }
    }

    None
}

/// A decoded, validated manifest.
///
/// Decoding checks the record framing and that path hashes are strictly
/// ascending, so a corrupt buffer fails here instead of producing a wrong match.
#[derive(Clone, PartialEq, Eq)]
pub struct Manifest {
    bytes: Vec<u8>,
    count: usize,
}

impl Manifest {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ManifestError> {
        let count = record_count(bytes.len())?;
        let records = &bytes[HEADER_SIZE..];

        for index in 1..count {
            let prev = &records[(index - 1) * ENTRY_SIZE..][..PATH_HASH_SIZE];
            let cur = &records[index * ENTRY_SIZE..][..PATH_HASH_SIZE];
            if prev >= cur {
                return Err(ManifestError::Unsorted { index });
            }
        }

        Ok(Manifest { bytes, count })
    }

    /// Build a manifest from `(path, content hash)` pairs.
    pub fn build<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, ContentHash)>,
    {
        let bytes = encode(entries);
        let count = (bytes.len() - HEADER_SIZE) / ENTRY_SIZE;
        Manifest { bytes, count }
    }

    pub fn lookup(&self, path: &str) -> Option<ContentHash> {
        self.lookup_hash(&hash_path(path))
    }

    pub fn lookup_hash(&self, path_hash: &PathHash) -> Option<ContentHash> {
        search(&self.bytes[HEADER_SIZE..], self.count, path_hash)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Records in stored (ascending path hash) order
    pub fn entries(&self) -> impl Iterator<Item = (PathHash, ContentHash)> + '_ {
        self.bytes[HEADER_SIZE..]
            .chunks_exact(ENTRY_SIZE)
            .map(|record| {
                let mut path = [0u8; PATH_HASH_SIZE];
                let mut content = [0u8; CONTENT_HASH_SIZE];
                path.copy_from_slice(&record[..PATH_HASH_SIZE]);
                content.copy_from_slice(&record[PATH_HASH_SIZE..]);
                (PathHash(path), ContentHash(content))
            })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl std::fmt::Debug for Manifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manifest")
            .field("entries", &self.count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_content;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn h(s: &str) -> ContentHash {
        hash_content(s.as_bytes())
    }

    #[test]
    fn three_paths_any_order() {
        let (h1, h2, h3) = (h("one"), h("two"), h("three"));
        let forward = encode([("/path1", h1), ("/path2", h2), ("/path3", h3)]);
        let reversed = encode([("/path3", h3), ("/path1", h1), ("/path2", h2)]);
        assert_eq!(forward, reversed, "encoding must not depend on input order");

        let m = Manifest::from_bytes(forward).unwrap();
        assert_eq!(m.len(), 3);
        assert_eq!(m.lookup("/path1"), Some(h1));
        assert_eq!(m.lookup("/path2"), Some(h2));
        assert_eq!(m.lookup("/path3"), Some(h3));
        assert_eq!(m.lookup("/path4"), None);
    }

    #[test]
    fn exact_length() {
        let bytes = encode([("/a", h("a")), ("/b", h("b"))]);
        assert_eq!(bytes.len(), HEADER_SIZE + 2 * ENTRY_SIZE);
        assert_eq!(&bytes[..HEADER_SIZE], &[0u8; HEADER_SIZE]);
    }

    #[test]
    fn record_layout() {
        let content = h("body");
        let bytes = encode([("/index.html", content)]);
        assert_eq!(&bytes[16..32], hash_path("/index.html").as_bytes());
        assert_eq!(&bytes[32..64], content.as_bytes());
    }

    #[test]
    fn empty_manifest_is_header_only() {
        let bytes = encode(std::iter::empty::<(&str, ContentHash)>());
        assert_eq!(bytes.len(), HEADER_SIZE);

        let m = Manifest::from_bytes(bytes.clone()).unwrap();
        assert!(m.is_empty());
        assert_eq!(m.lookup("/"), None);
        assert_eq!(lookup(&bytes, "/index.html"), Ok(None));
    }

    #[test]
    fn duplicate_path_last_wins() {
        let bytes = encode([("/x", h("old")), ("/y", h("y")), ("/x", h("new"))]);
        let m = Manifest::from_bytes(bytes).unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m.lookup("/x"), Some(h("new")));
    }

    #[test]
    fn malformed_lengths_rejected() {
        assert_eq!(
            Manifest::from_bytes(vec![0u8; 10]).unwrap_err(),
            ManifestError::Truncated { len: 10, header: HEADER_SIZE }
        );
        assert!(matches!(
            Manifest::from_bytes(vec![0u8; HEADER_SIZE + ENTRY_SIZE + 1]),
            Err(ManifestError::RaggedBody { .. })
        ));
        assert!(lookup(&[0u8; HEADER_SIZE + 47], "/a").is_err());
    }

    #[test]
    fn unsorted_records_rejected() {
        let mut bytes = encode([("/a", h("a")), ("/b", h("b"))]);
        let (first, second) = bytes[HEADER_SIZE..].split_at_mut(ENTRY_SIZE);
        first.swap_with_slice(second);
        assert_eq!(
            Manifest::from_bytes(bytes).unwrap_err(),
            ManifestError::Unsorted { index: 1 }
        );
    }

    #[test]
    fn duplicate_records_rejected() {
        let mut bytes = encode([("/a", h("a"))]);
        let record = bytes[HEADER_SIZE..].to_vec();
        bytes.extend_from_slice(&record);
        assert!(matches!(
            Manifest::from_bytes(bytes),
            Err(ManifestError::Unsorted { .. })
        ));
    }

    #[test]
    fn build_matches_encode() {
        let pairs = [("/a", h("a")), ("/b", h("b"))];
        let built = Manifest::build(pairs);
        assert_eq!(built.as_bytes(), encode(pairs).as_slice());
        assert_eq!(built.len(), 2);
    }

    proptest! {
        #[test]
        fn roundtrip_every_path(
            paths in proptest::collection::hash_set("/[a-z0-9/._-]{0,24}", 0..64),
            probe in "/[A-Z]{1,8}",
        ) {
            let table: HashMap<String, ContentHash> = paths
                .iter()
                .map(|p| (p.clone(), hash_content(p.as_bytes())))
                .collect();
            let m = Manifest::from_bytes(encode(table.iter().map(|(p, c)| (p.as_str(), *c)))).unwrap();

            prop_assert_eq!(m.len(), table.len());
            for (path, content) in &table {
                prop_assert_eq!(m.lookup(path), Some(*content));
            }
            // uppercase probes never collide with the lowercase generator
            prop_assert_eq!(m.lookup(&probe), None);
        }

        #[test]
        fn records_strictly_ascending(paths in proptest::collection::vec("/[a-z]{1,12}", 0..64)) {
            let m = Manifest::build(paths.iter().map(|p| (p.as_str(), hash_content(p.as_bytes()))));
            let keys: Vec<PathHash> = m.entries().map(|(p, _)| p).collect();
            for pair in keys.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
        }
    }
}
