//! HR client that wraps HrClient with transparent response caching.

use color_eyre::Result;
use std::time::Duration;
use tracing::{debug, info};

use crate::cache::{CacheKey, CacheLayer};
use crate::config::Config;

use super::client::HrClient;
use super::types::{Employee, EmployeeQuery, EmployeeStatus, Page, EMPLOYEES};

/// HR client with transparent caching support.
///
/// Listings are cached per query; concurrent identical listings share one
/// request. Writes evict every cached listing of the affected resource.
/// Errors are returned as messages, ready for a [`crate::query::Query`].
#[derive(Clone)]
pub struct CachedHrClient {
  inner: HrClient,
  employees: CacheLayer<Page<Employee>>,
  ttl: Duration,
}

impl CachedHrClient {
  /// Create a new cached client.
  pub fn new(config: &Config) -> Result<Self> {
    let inner = HrClient::new(config)?;
    Ok(Self::with_cache(inner, CacheLayer::new(), config.cache.ttl()))
  }

  pub fn with_cache(inner: HrClient, employees: CacheLayer<Page<Employee>>, ttl: Duration) -> Self {
    Self {
      inner,
      employees,
      ttl,
    }
  }

  /// List employees, served from cache while fresh.
  pub async fn list_employees(&self, query: EmployeeQuery) -> Result<Page<Employee>, String> {
    let key = query.cache_key();
    debug!("listing {}", key.description());

    let inner = self.inner.clone();
    self
      .employees
      .get_or_produce(
        &key.render(),
        move || async move {
          inner
            .list_employees(&query)
            .await
            .map_err(|e| e.to_string())
        },
        self.ttl,
      )
      .await
  }

  /// Drop the cached listing for `query` so the next listing goes to the
  /// server. Returns whether anything was cached.
  pub fn invalidate_listing(&self, query: &EmployeeQuery) -> bool {
    self.employees.evict(&query.cache_key().render())
  }

  /// Update status (not cached - write operation). Cached listings are
  /// dropped so the next listing reflects the change.
  pub async fn update_employee_status(
    &self,
    id: u64,
    status: EmployeeStatus,
  ) -> Result<Employee, String> {
    let updated = self
      .inner
      .update_employee_status(id, status)
      .await
      .map_err(|e| e.to_string())?;

    let evicted = self
      .employees
      .evict_by_prefix(&CacheKey::resource_prefix(EMPLOYEES));
    info!(
      "employee {} is now {}, evicted {} cached listings",
      id,
      status.as_str(),
      evicted
    );

    Ok(updated)
  }

  /// One-line cache summary for the status bar.
  pub fn cache_status(&self) -> String {
    let stats = self.employees.stats();
    format!(
      "{} cached · {} hits · {} fetched",
      self.employees.len(),
      stats.hits + stats.deduplicated,
      stats.misses
    )
  }

  /// Drop expired listings; called periodically from the UI tick.
  pub fn purge_expired(&self) {
    let purged = self.employees.purge_expired();
    if purged > 0 {
      debug!(
        "purged {} expired listings, {} left, {:?}",
        purged,
        self.employees.len(),
        self.employees.stats()
      );
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::ListPrefs;

  fn page(names: &[&str]) -> Page<Employee> {
    Page {
      items: names
        .iter()
        .zip(1..)
        .map(|(name, id)| Employee {
          id,
          name: name.to_string(),
          email: format!("{}@example.com", name.to_lowercase()),
          department: None,
          title: None,
          status: EmployeeStatus::Active,
          hired_on: None,
        })
        .collect(),
      total: names.len() as u64,
    }
  }

  #[tokio::test]
  async fn test_invalidate_listing_drops_only_that_query() {
    let config = Config::for_url("http://127.0.0.1:9".to_string());
    let cache = CacheLayer::new();
    let client = CachedHrClient::with_cache(
      HrClient::new(&config).unwrap(),
      cache.clone(),
      Duration::from_secs(60),
    );

    let ada = EmployeeQuery::new("ada", &ListPrefs::default(), 50);
    let bob = EmployeeQuery::new("bob", &ListPrefs::default(), 50);
    for (query, names) in [(&ada, ["Ada"]), (&bob, ["Bob"])] {
      let cached = page(&names);
      cache
        .get_or_produce(
          &query.cache_key().render(),
          move || async move { Ok(cached) },
          Duration::from_secs(60),
        )
        .await
        .unwrap();
    }

    assert!(client.invalidate_listing(&ada));
    assert!(!client.invalidate_listing(&ada));
    assert_eq!(cache.len(), 1);
    assert_eq!(client.cache_status(), "1 cached · 0 hits · 2 fetched");
  }
}
