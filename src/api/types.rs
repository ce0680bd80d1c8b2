use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cache::CacheKey;

/// Resource name for employee listings; also the cache key prefix.
pub const EMPLOYEES: &str = "employees";

/// Employment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
  Active,
  OnLeave,
  Terminated,
}

impl EmployeeStatus {
  /// Wire value, as used in query strings
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Active => "active",
      Self::OnLeave => "on_leave",
      Self::Terminated => "terminated",
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      Self::Active => "Active",
      Self::OnLeave => "On leave",
      Self::Terminated => "Terminated",
    }
  }

  /// Next status in display order, wrapping around
  pub fn cycle(&self) -> Self {
    match self {
      Self::Active => Self::OnLeave,
      Self::OnLeave => Self::Terminated,
      Self::Terminated => Self::Active,
    }
  }
}

/// Employee record as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
  pub id: u64,
  pub name: String,
  pub email: String,
  #[serde(default)]
  pub department: Option<String>,
  #[serde(default)]
  pub title: Option<String>,
  pub status: EmployeeStatus,
  #[serde(default)]
  pub hired_on: Option<NaiveDate>,
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
  pub items: Vec<T>,
  /// Total matching records on the server, which may exceed `items.len()`
  pub total: u64,
}

/// Sort order for employee listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
  #[default]
  NameAsc,
  NameDesc,
  HiredNewest,
  HiredOldest,
}

impl SortOrder {
  pub fn as_param(&self) -> &'static str {
    match self {
      Self::NameAsc => "name",
      Self::NameDesc => "-name",
      Self::HiredNewest => "-hired_on",
      Self::HiredOldest => "hired_on",
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      Self::NameAsc => "name ↑",
      Self::NameDesc => "name ↓",
      Self::HiredNewest => "newest",
      Self::HiredOldest => "oldest",
    }
  }

  pub fn cycle(&self) -> Self {
    match self {
      Self::NameAsc => Self::NameDesc,
      Self::NameDesc => Self::HiredNewest,
      Self::HiredNewest => Self::HiredOldest,
      Self::HiredOldest => Self::NameAsc,
    }
  }
}

/// List preferences kept between runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPrefs {
  /// `None` shows every status
  #[serde(default)]
  pub status: Option<EmployeeStatus>,
  #[serde(default)]
  pub sort: SortOrder,
}

impl ListPrefs {
  /// Step the status filter: all → active → on leave → terminated → all
  pub fn cycle_status(&mut self) {
    self.status = match self.status {
      None => Some(EmployeeStatus::Active),
      Some(EmployeeStatus::Terminated) => None,
      Some(s) => Some(s.cycle()),
    };
  }
}

/// Parameters of one employee listing request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployeeQuery {
  pub search: String,
  pub status: Option<EmployeeStatus>,
  pub sort: SortOrder,
  pub limit: u32,
}

impl EmployeeQuery {
  pub fn new(search: &str, prefs: &ListPrefs, limit: u32) -> Self {
    Self {
      search: search.trim().to_string(),
      status: prefs.status,
      sort: prefs.sort,
      limit,
    }
  }

  /// Query string pairs, omitting empty filters.
  pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if !self.search.is_empty() {
      pairs.push(("q", self.search.clone()));
    }
    if let Some(status) = self.status {
      pairs.push(("status", status.as_str().to_string()));
    }
    pairs.push(("sort", self.sort.as_param().to_string()));
    pairs.push(("limit", self.limit.to_string()));
    pairs
  }

  pub fn cache_key(&self) -> CacheKey {
    self
      .query_pairs()
      .into_iter()
      .fold(CacheKey::new(EMPLOYEES), |key, (name, value)| {
        key.param(name, value)
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_employee_deserialize() {
    let json = r#"{
      "id": 7,
      "name": "Ada Lovelace",
      "email": "ada@example.com",
      "department": "Engineering",
      "status": "on_leave",
      "hired_on": "2021-03-01"
    }"#;
    let employee: Employee = serde_json::from_str(json).unwrap();
    assert_eq!(employee.status, EmployeeStatus::OnLeave);
    assert_eq!(employee.title, None);
    assert_eq!(
      employee.hired_on,
      Some(NaiveDate::from_ymd_opt(2021, 3, 1).unwrap())
    );
  }

  #[test]
  fn test_prefs_default_when_fields_missing() {
    let prefs: ListPrefs = serde_json::from_str("{}").unwrap();
    assert_eq!(prefs, ListPrefs::default());
  }

  #[test]
  fn test_cycle_status() {
    let mut prefs = ListPrefs::default();
    let mut seen = Vec::new();
    for _ in 0..4 {
      prefs.cycle_status();
      seen.push(prefs.status);
    }
    assert_eq!(
      seen,
      vec![
        Some(EmployeeStatus::Active),
        Some(EmployeeStatus::OnLeave),
        Some(EmployeeStatus::Terminated),
        None
      ]
    );
  }

  #[test]
  fn test_query_pairs_skip_empty_filters() {
    let query = EmployeeQuery::new("  ", &ListPrefs::default(), 100);
    assert_eq!(
      query.query_pairs(),
      vec![("sort", "name".to_string()), ("limit", "100".to_string())]
    );
  }

  #[test]
  fn test_equivalent_queries_share_cache_key() {
    let prefs = ListPrefs {
      status: Some(EmployeeStatus::Active),
      sort: SortOrder::HiredNewest,
    };
    let a = EmployeeQuery::new("ada", &prefs, 50);
    let b = EmployeeQuery::new(" ada ", &prefs, 50);
    assert_eq!(a.cache_key().render(), b.cache_key().render());

    let c = EmployeeQuery::new("ada", &ListPrefs::default(), 50);
    assert_ne!(a.cache_key().render(), c.cache_key().render());
    assert!(a.cache_key().render().starts_with("employees:"));
  }
}
