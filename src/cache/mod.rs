//! In-memory response caching for API listings.
//!
//! This module provides a resource-agnostic caching mechanism that:
//! - Memoizes async producer results under a string key with a TTL
//! - Shares a single producer run between concurrent callers of one key
//! - Never caches failures, so the next call retries immediately
//! - Supports eviction of one key or every key with a given prefix

mod entry;
mod key;
mod layer;

pub use entry::{CacheStats, ProduceResult};
pub use key::CacheKey;
pub use layer::CacheLayer;
