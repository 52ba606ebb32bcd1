//! Serde types for API payloads and the normalized API error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Shown when a failure carries no usable message.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// A failed API call, reduced to what the UI shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
  /// HTTP status, when a response was received at all
  pub status: Option<u16>,
  pub message: String,
}

impl ApiError {
  /// Build from an error response body.
  pub fn from_body(status: u16, body: Option<&Value>) -> Self {
    Self {
      status: Some(status),
      message: error_message(body),
    }
  }

  /// A failure before any response arrived (connect, timeout, decode).
  pub fn transport() -> Self {
    Self {
      status: None,
      message: GENERIC_ERROR_MESSAGE.to_string(),
    }
  }

  pub fn is_unauthorized(&self) -> bool {
    self.status == Some(401)
  }
}

impl fmt::Display for ApiError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.message)
  }
}

impl std::error::Error for ApiError {}

/// Pull a readable message out of an error body.
///
/// Looks at `message`, then `error` (a string, or an object with its own
/// `message`), and falls back to a generic message.
pub fn error_message(body: Option<&Value>) -> String {
  let Some(body) = body else {
    return GENERIC_ERROR_MESSAGE.to_string();
  };

  let non_empty = |v: Option<&Value>| {
    v.and_then(Value::as_str)
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(String::from)
  };

  non_empty(body.get("message"))
    .or_else(|| non_empty(body.get("error")))
    .or_else(|| non_empty(body.get("error").and_then(|e| e.get("message"))))
    .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string())
}

// ============================================================================
// Lookup lists used by creation forms
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopOption {
  #[serde(alias = "_id")]
  pub id: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub city: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductOption {
  #[serde(alias = "_id")]
  pub id: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sku: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub price: Option<f64>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_message_field_wins() {
    let body = json!({"message": "Shop not found", "error": "NOT_FOUND"});
    assert_eq!(error_message(Some(&body)), "Shop not found");
  }

  #[test]
  fn test_error_field_fallback() {
    let body = json!({"error": "Invalid date range"});
    assert_eq!(error_message(Some(&body)), "Invalid date range");

    let nested = json!({"error": {"message": "Token expired"}});
    assert_eq!(error_message(Some(&nested)), "Token expired");
  }

  #[test]
  fn test_generic_fallback() {
    assert_eq!(error_message(None), GENERIC_ERROR_MESSAGE);
    assert_eq!(error_message(Some(&json!({"message": "  "}))), GENERIC_ERROR_MESSAGE);
    assert_eq!(error_message(Some(&json!([1, 2]))), GENERIC_ERROR_MESSAGE);
  }

  #[test]
  fn test_shop_option_accepts_mongo_id() {
    let shop: ShopOption = serde_json::from_value(json!({"_id": "s1", "name": "Central"})).unwrap();
    assert_eq!(shop.id, "s1");
    assert_eq!(shop.city, None);
  }
}
