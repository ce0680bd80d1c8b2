//! Deterministic cache key construction.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// A cache key for a listing or lookup against a named resource.
///
/// Parameters are kept sorted by name, so two keys built from the same
/// logical query always render identically regardless of the order the
/// parameters were added in. Values are normalized (trimmed) before hashing.
///
/// The rendered form is `<resource>:<sha256 of params>`, which keeps the
/// resource name usable as a prefix for bulk eviction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
  resource: String,
  params: BTreeMap<String, String>,
}

impl CacheKey {
  pub fn new(resource: impl Into<String>) -> Self {
    Self {
      resource: resource.into(),
      params: BTreeMap::new(),
    }
  }

  /// Add a query parameter. Empty values are dropped so that "no filter"
  /// and "empty filter" map to the same key.
  pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
    let value = normalize(&value.to_string());
    if !value.is_empty() {
      self.params.insert(name.into(), value);
    }
    self
  }

  /// Prefix shared by every key of this resource, for `evict_by_prefix`.
  pub fn resource_prefix(resource: &str) -> String {
    format!("{}:", resource)
  }

  /// Human-readable description for logs.
  pub fn description(&self) -> String {
    if self.params.is_empty() {
      return self.resource.clone();
    }
    let params: Vec<String> = self
      .params
      .iter()
      .map(|(k, v)| format!("{}={}", k, v))
      .collect();
    format!("{}?{}", self.resource, params.join("&"))
  }

  /// Stable string form used as the cache map key.
  pub fn render(&self) -> String {
    let mut hasher = Sha256::new();
    // Length-prefixed, so no name or value can forge a separator
    for part in self.params.iter().flat_map(|(name, value)| [name, value]) {
      hasher.update((part.len() as u64).to_le_bytes());
      hasher.update(part.as_bytes());
    }
    format!("{}{}", Self::resource_prefix(&self.resource), hex::encode(hasher.finalize()))
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.render())
  }
}

/// Trims surrounding whitespace. Case is preserved: filter values such as
/// names are case sensitive on the server.
fn normalize(value: &str) -> String {
  value.trim().to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_param_order_does_not_matter() {
    let a = CacheKey::new("employees")
      .param("status", "active")
      .param("page", 2);
    let b = CacheKey::new("employees")
      .param("page", 2)
      .param("status", "active");
    assert_eq!(a.render(), b.render());
  }

  #[test]
  fn test_different_values_differ() {
    let a = CacheKey::new("employees").param("status", "active");
    let b = CacheKey::new("employees").param("status", "inactive");
    assert_ne!(a.render(), b.render());
  }

  #[test]
  fn test_separators_in_values_cannot_collide() {
    let joined = CacheKey::new("employees").param("dept", "hr\nsearch=ada");
    let split = CacheKey::new("employees")
      .param("dept", "hr")
      .param("search", "ada");
    assert_ne!(joined.render(), split.render());

    let a = CacheKey::new("employees").param("a", "b=c");
    let b = CacheKey::new("employees").param("a=b", "c");
    assert_ne!(a.render(), b.render());
  }

  #[test]
  fn test_empty_param_is_dropped() {
    let a = CacheKey::new("employees").param("search", "  ");
    let b = CacheKey::new("employees");
    assert_eq!(a.render(), b.render());
    assert_eq!(a.description(), "employees");
  }

  #[test]
  fn test_whitespace_is_trimmed() {
    let a = CacheKey::new("employees").param("search", " ada ");
    let b = CacheKey::new("employees").param("search", "ada");
    assert_eq!(a, b);
  }

  #[test]
  fn test_prefix_is_resource_name() {
    let key = CacheKey::new("orders").param("page", 1);
    assert!(key.render().starts_with(&CacheKey::resource_prefix("orders")));
    assert!(!key.render().starts_with("orders-archive"));
  }

  #[test]
  fn test_description_lists_sorted_params() {
    let key = CacheKey::new("employees")
      .param("status", "active")
      .param("q", "ada");
    assert_eq!(key.description(), "employees?q=ada&status=active");
    assert_eq!(key.to_string(), key.render());
  }
}
