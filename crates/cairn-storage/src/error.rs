use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store {op} failed for '{key}': {source}")]
    Backend {
        op: &'static str,
        key: String,
        #[source]
        source: opendal::Error,
    },
}

impl StoreError {
    pub(crate) fn backend(op: &'static str, key: &str, source: opendal::Error) -> Self {
        StoreError::Backend {
            op,
            key: key.to_string(),
            source,
        }
    }

    /// True when retrying the same call may succeed
    pub fn is_temporary(&self) -> bool {
        match self {
            StoreError::Backend { source, .. } => source.is_temporary(),
        }
    }
}
