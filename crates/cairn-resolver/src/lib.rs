//! cairn-resolver: answer request paths from a project's committed manifest
//!
//! A [`Resolver`] keeps the decoded manifest in memory for a bounded time
//! (`manifest_ttl_secs`) and reloads it afterwards or when told to via
//! [`Resolver::invalidate`]. [`ResolverPool`] hands out one resolver per
//! project.

pub mod error;
pub mod pool;
pub mod resolver;

pub use error::ResolveError;
pub use pool::ResolverPool;
pub use resolver::{ResolvedAsset, Resolver};
