use color_eyre::{eyre::eyre, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::api_types::ApiError;
use super::auth::AuthContext;
use super::resource::Resource;
use crate::config::Config;
use crate::list::{normalize, ListParams, PageResult};

/// Page size used when pulling a whole lookup list in one request.
const LOOKUP_LIMIT: u32 = 500;

/// Thin REST client. Adds the bearer token and normalizes failures.
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base_url: Url,
  auth: AuthContext,
}

impl ApiClient {
  pub fn new(config: &Config, auth: AuthContext) -> Result<Self> {
    let base_url = parse_base_url(&config.api.url)?;

    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.api.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url,
      auth,
    })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  pub fn auth(&self) -> &AuthContext {
    &self.auth
  }

  /// GET a JSON document.
  pub async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, ApiError> {
    let mut url = self.base_url.join(path).map_err(|e| {
      warn!(path, error = %e, "Invalid request path");
      ApiError::transport()
    })?;
    if !query.is_empty() {
      url.query_pairs_mut().extend_pairs(query);
    }

    let mut request = self.http.get(url.clone());
    if let Some(token) = self.auth.token() {
      request = request.bearer_auth(token);
    }

    debug!(url = %url, "GET");
    let response = request.send().await.map_err(|e| {
      warn!(url = %url, error = %e, "Request failed");
      ApiError::transport()
    })?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
      self.auth.handle_unauthorized();
    }

    if !status.is_success() {
      let body = response.json::<Value>().await.ok();
      let error = ApiError::from_body(status.as_u16(), body.as_ref());
      warn!(url = %url, status = status.as_u16(), message = %error, "API error");
      return Err(error);
    }

    response.json::<Value>().await.map_err(|e| {
      warn!(url = %url, error = %e, "Response was not JSON");
      ApiError::transport()
    })
  }

  /// Fetch one page of a resource, in whatever shape the endpoint answers.
  pub async fn list<T: DeserializeOwned>(
    &self,
    resource: Resource,
    params: &ListParams,
  ) -> Result<PageResult<T>, ApiError> {
    let value = self
      .get_json(resource.path(), &params.query_pairs())
      .await?;
    Ok(normalize(value, resource.item_fields()))
  }

  /// Fetch a whole lookup list (shops, products) in one request.
  pub async fn lookup<T: DeserializeOwned>(&self, resource: Resource) -> Result<Vec<T>, ApiError> {
    let params = ListParams {
      page: 1,
      limit: LOOKUP_LIMIT,
      filters: Default::default(),
    };
    let page = self.list(resource, &params).await?;
    Ok(page.items)
  }
}

/// Base URLs get a trailing slash so relative paths join under them.
fn parse_base_url(raw: &str) -> Result<Url> {
  let with_slash = if raw.ends_with('/') {
    raw.to_string()
  } else {
    format!("{}/", raw)
  };
  Url::parse(&with_slash).map_err(|e| eyre!("Invalid API url '{}': {}", raw, e))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_base_url_keeps_path_prefix() {
    let base = parse_base_url("https://api.example.com/v1").unwrap();
    assert_eq!(
      base.join("retailer/shops").unwrap().as_str(),
      "https://api.example.com/v1/retailer/shops"
    );
  }

  #[test]
  fn test_invalid_base_url() {
    assert!(parse_base_url("not a url").is_err());
  }
}
