//! Deployment size and count limits.
//!
//! These are enforced before any session or store state is created.

use crate::error::{CairnError, CairnResult};

/// Maximum size of a single asset's content (25 MiB)
pub const MAX_ASSET_SIZE: u64 = 25 * 1024 * 1024;

/// Maximum number of assets in one deployment
pub const MAX_ASSET_COUNT: usize = 20_000;

/// Maximum total size of uploaded server code (10 MB)
pub const MAX_SERVER_CODE_SIZE: u64 = 10_000_000;

/// Maximum number of static (redirect/header) rules
pub const MAX_STATIC_RULES: usize = 2_000;

/// Maximum number of dynamic rules
pub const MAX_DYNAMIC_RULES: usize = 100;

/// Maximum number of environment entries
pub const MAX_ENV_ENTRIES: usize = 64;

/// Maximum size of one environment entry, key plus value (5 KB)
pub const MAX_ENV_ENTRY_SIZE: u64 = 5 * 1024;

/// Fail with `LimitExceeded` when `actual > limit`.
pub fn check(what: &'static str, actual: u64, limit: u64) -> CairnResult<()> {
    if actual > limit {
        return Err(CairnError::LimitExceeded {
            what,
            limit,
            actual,
        });
    }
    Ok(())
}

pub fn check_asset_size(size: u64) -> CairnResult<()> {
    check("asset size", size, MAX_ASSET_SIZE)
}

pub fn check_asset_count(count: usize) -> CairnResult<()> {
    check("asset count", count as u64, MAX_ASSET_COUNT as u64)
}

pub fn check_server_code_size(total: u64) -> CairnResult<()> {
    check("server code size", total, MAX_SERVER_CODE_SIZE)
}

pub fn check_rule_counts(static_rules: usize, dynamic_rules: usize) -> CairnResult<()> {
    check("static rule count", static_rules as u64, MAX_STATIC_RULES as u64)?;
    check("dynamic rule count", dynamic_rules as u64, MAX_DYNAMIC_RULES as u64)
}

/// Validate environment entries: count cap and per-entry (key + value) size cap.
pub fn check_env<'a>(entries: impl ExactSizeIterator<Item = (&'a str, &'a str)>) -> CairnResult<()> {
    check("environment entry count", entries.len() as u64, MAX_ENV_ENTRIES as u64)?;
    for (key, value) in entries {
        check(
            "environment entry size",
            (key.len() + value.len()) as u64,
            MAX_ENV_ENTRY_SIZE,
        )?;
    }
    Ok(())
}
