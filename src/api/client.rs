use crate::api::types::{Employee, EmployeeQuery, EmployeeStatus, Page, EMPLOYEES};
use crate::config::Config;
use color_eyre::{eyre::eyre, Result};
use reqwest::{Method, RequestBuilder};
use serde_json::json;
use url::Url;

/// HR API client
#[derive(Clone)]
pub struct HrClient {
  http: reqwest::Client,
  base: Url,
  token: Option<String>,
}

impl HrClient {
  pub fn new(config: &Config) -> Result<Self> {
    let base = parse_base_url(&config.api.url)?;

    let http = reqwest::Client::builder()
      .timeout(config.api.timeout())
      .gzip(true)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base,
      token: Config::get_api_token(),
    })
  }

  fn endpoint(&self, path: &str) -> Result<Url> {
    self
      .base
      .join(path)
      .map_err(|e| eyre!("Invalid endpoint {}: {}", path, e))
  }

  fn request(&self, method: Method, url: Url) -> RequestBuilder {
    let builder = self.http.request(method, url);
    match &self.token {
      Some(token) => builder.bearer_auth(token),
      None => builder,
    }
  }

  /// List employees matching `query`
  pub async fn list_employees(&self, query: &EmployeeQuery) -> Result<Page<Employee>> {
    let mut url = self.endpoint(EMPLOYEES)?;
    url.query_pairs_mut().extend_pairs(query.query_pairs());

    let response = self
      .request(Method::GET, url)
      .send()
      .await
      .map_err(|e| eyre!("Failed to list employees: {}", e))?
      .error_for_status()
      .map_err(|e| eyre!("Failed to list employees: {}", e))?;

    response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse employee list: {}", e))
  }

  /// Change an employee's status, returning the updated record
  pub async fn update_employee_status(
    &self,
    id: u64,
    status: EmployeeStatus,
  ) -> Result<Employee> {
    let url = self.endpoint(&format!("{}/{}", EMPLOYEES, id))?;

    let response = self
      .request(Method::PATCH, url)
      .json(&json!({ "status": status }))
      .send()
      .await
      .map_err(|e| eyre!("Failed to update employee {}: {}", id, e))?
      .error_for_status()
      .map_err(|e| eyre!("Failed to update employee {}: {}", id, e))?;

    response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse employee {}: {}", id, e))
  }
}

/// Parse the configured API root. A trailing slash is added so relative
/// endpoints join below it instead of replacing its last segment.
fn parse_base_url(raw: &str) -> Result<Url> {
  let mut url = Url::parse(raw).map_err(|e| eyre!("Invalid API url '{}': {}", raw, e))?;
  if url.cannot_be_a_base() {
    return Err(eyre!("Invalid API url '{}': not a base url", raw));
  }
  if !url.path().ends_with('/') {
    let path = format!("{}/", url.path());
    url.set_path(&path);
  }
  Ok(url)
}
