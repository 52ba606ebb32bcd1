//! Normalization of list endpoint responses.
//!
//! List endpoints answer either with a bare JSON array or with an envelope
//! object that names its item list per resource (`items`, `products`,
//! `distributions`, ...) and reports pagination either as a `pagination`
//! object or a top-level `total`. Everything downstream sees [`PageResult`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Pagination metadata reported by an envelope response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
  #[serde(default)]
  pub page: u32,
  #[serde(default)]
  pub limit: u32,
  /// Absent when the server only reports `total` at the top level.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub total: Option<u64>,
  #[serde(default)]
  pub pages: u32,
}

/// One page of a resource, as list views consume it.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult<T> {
  pub items: Vec<T>,
  pub total: u64,
  pub pagination: Option<Pagination>,
}

impl<T> PageResult<T> {
  pub fn empty() -> Self {
    Self {
      items: Vec::new(),
      total: 0,
      pagination: None,
    }
  }

  /// Number of pages, when the server reported it.
  pub fn pages(&self) -> Option<u32> {
    self.pagination.map(|p| p.pages).filter(|p| *p > 0)
  }
}

impl<T> Default for PageResult<T> {
  fn default() -> Self {
    Self::empty()
  }
}

/// The shapes a list endpoint may answer with.
#[derive(Debug, Clone, PartialEq)]
pub enum ListResponse<T> {
  /// A plain JSON array; its length is the total.
  Bare { items: Vec<T>, len: usize },
  /// An object wrapping the items in a named field.
  Envelope {
    items: Vec<T>,
    pagination: Option<Pagination>,
    total: Option<u64>,
  },
  /// Anything else.
  Unrecognized,
}

impl<T: DeserializeOwned> ListResponse<T> {
  /// Classify a raw response. `item_fields` are tried in order; the first
  /// one holding an array is the item list.
  pub fn from_value(value: Value, item_fields: &[&str]) -> Self {
    match value {
      Value::Array(raw) => {
        let len = raw.len();
        Self::Bare {
          items: parse_items(raw),
          len,
        }
      }
      Value::Object(mut map) => {
        let raw = item_fields
          .iter()
          .find_map(|field| match map.remove(*field) {
            Some(Value::Array(raw)) => Some(raw),
            _ => None,
          });

        let Some(raw) = raw else {
          warn!(fields = ?item_fields, "Envelope response without an item list");
          return Self::Unrecognized;
        };

        let pagination = map
          .remove("pagination")
          .and_then(|p| serde_json::from_value::<Pagination>(p).ok());
        let total = map.get("total").and_then(Value::as_u64);

        Self::Envelope {
          items: parse_items(raw),
          pagination,
          total,
        }
      }
      other => {
        warn!(kind = %json_kind(&other), "Unexpected list response");
        Self::Unrecognized
      }
    }
  }
}

impl<T> ListResponse<T> {
  pub fn into_page(self) -> PageResult<T> {
    match self {
      Self::Bare { items, len } => PageResult {
        items,
        total: len as u64,
        pagination: None,
      },
      Self::Envelope {
        items,
        pagination,
        total,
      } => {
        let total = pagination
          .and_then(|p| p.total)
          .or(total)
          .unwrap_or(items.len() as u64);
        PageResult {
          items,
          total,
          pagination,
        }
      }
      Self::Unrecognized => PageResult::empty(),
    }
  }
}

/// Classify and flatten a raw list response in one step.
pub fn normalize<T: DeserializeOwned>(value: Value, item_fields: &[&str]) -> PageResult<T> {
  ListResponse::from_value(value, item_fields).into_page()
}

fn parse_items<T: DeserializeOwned>(raw: Vec<Value>) -> Vec<T> {
  let count = raw.len();
  let items: Vec<T> = raw
    .into_iter()
    .filter_map(|v| serde_json::from_value(v).ok())
    .collect();
  if items.len() != count {
    warn!(
      skipped = count - items.len(),
      "Dropped list items that did not match the expected shape"
    );
  }
  items
}

fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "bool",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[derive(Debug, Clone, PartialEq, Deserialize)]
  struct Row {
    id: u32,
  }

  #[test]
  fn test_bare_array_total_is_length() {
    let page: PageResult<Row> = normalize(json!([{"id": 1}, {"id": 2}, {"id": 3}]), &["items"]);
    assert_eq!(page.items.len(), 3);
    assert_eq!(page.total, 3);
    assert!(page.pagination.is_none());
  }

  #[test]
  fn test_envelope_total_comes_from_pagination() {
    let value = json!({
      "items": [{"id": 1}, {"id": 2}],
      "pagination": {"page": 1, "limit": 2, "total": 57, "pages": 29}
    });
    let page: PageResult<Row> = normalize(value, &["items"]);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total, 57);
    assert_eq!(page.pages(), Some(29));
  }

  #[test]
  fn test_pagination_without_total_falls_back_to_top_level() {
    let value = json!({
      "items": [{"id": 1}, {"id": 2}],
      "pagination": {"page": 1, "limit": 20},
      "total": 57
    });
    let page: PageResult<Row> = normalize(value, &["items"]);
    assert_eq!(page.total, 57);
    assert_eq!(page.pagination.map(|p| p.limit), Some(20));

    let value = json!({
      "items": [{"id": 1}, {"id": 2}],
      "pagination": {"page": 1, "limit": 20}
    });
    let page: PageResult<Row> = normalize(value, &["items"]);
    assert_eq!(page.total, 2);
  }

  #[test]
  fn test_item_fields_tried_in_order() {
    let value = json!({
      "distributions": [{"id": 4}],
      "total": 12
    });
    let page: PageResult<Row> = normalize(value, &["items", "distributions"]);
    assert_eq!(page.items, vec![Row { id: 4 }]);
    assert_eq!(page.total, 12);
  }

  #[test]
  fn test_field_holding_non_array_is_skipped() {
    let value = json!({
      "items": "not a list",
      "products": [{"id": 8}]
    });
    let page: PageResult<Row> = normalize(value, &["items", "products"]);
    assert_eq!(page.items, vec![Row { id: 8 }]);
    assert_eq!(page.total, 1);
  }

  #[test]
  fn test_unknown_shapes_become_empty() {
    let page: PageResult<Row> = normalize(json!({"message": "ok"}), &["items"]);
    assert_eq!(page, PageResult::empty());

    let page: PageResult<Row> = normalize(json!("surprise"), &["items"]);
    assert_eq!(page, PageResult::empty());
  }

  #[test]
  fn test_malformed_items_are_skipped_but_counted_in_bare_total() {
    let page: PageResult<Row> = normalize(json!([{"id": 1}, {"name": "no id"}]), &["items"]);
    assert_eq!(page.items, vec![Row { id: 1 }]);
    assert_eq!(page.total, 2);
  }
}
