use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CairnError, CairnResult};

/// Maximum length of a project identifier (fits a DNS label)
pub const MAX_PROJECT_ID_LEN: usize = 63;

/// Identifier of a tenant project sharing the deployment target.
///
/// Lowercase ASCII letters, digits, `-` and `_`; must start with a letter or
/// digit. The id is embedded in storage keys, so anything that could escape a
/// key segment is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectId(String);

impl ProjectId {
    pub fn parse(id: &str) -> CairnResult<Self> {
        let invalid = |reason| CairnError::InvalidProject {
            id: id.to_string(),
            reason,
        };

        if id.is_empty() {
            return Err(invalid("empty"));
        }
        if id.len() > MAX_PROJECT_ID_LEN {
            return Err(invalid("longer than 63 characters"));
        }
        if !id
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
        {
            return Err(invalid("only lowercase letters, digits, '-' and '_' are allowed"));
        }
        if !id.as_bytes()[0].is_ascii_alphanumeric() {
            return Err(invalid("must start with a letter or digit"));
        }

        Ok(ProjectId(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ProjectId {
    type Error = CairnError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ProjectId::parse(&value)
    }
}

impl From<ProjectId> for String {
    fn from(id: ProjectId) -> Self {
        id.0
    }
}

/// Upload session phase carried inside a session token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Content is still missing from the store
    Upload,
    /// All content present; the token authorizes the manifest commit
    Complete,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Upload => f.write_str("upload"),
            Phase::Complete => f.write_str("complete"),
        }
    }
}

/// Heuristic classification of a content fetch by its latency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}
