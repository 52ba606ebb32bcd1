use color_eyre::{eyre::eyre, Result};
use std::collections::BTreeMap;

/// Filter values for one list view.
///
/// The set of keys is fixed when the view is created. Only keys with a
/// non-empty value are active; setting a key to `""` or `None` removes it.
/// Equality is structural over the declared keys and active values, so two
/// states built in a different order still compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
  keys: Vec<String>,
  values: BTreeMap<String, String>,
}

impl FilterState {
  pub fn new<I, S>(keys: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let mut declared: Vec<String> = Vec::new();
    for key in keys {
      let key = key.into();
      if !declared.contains(&key) {
        declared.push(key);
      }
    }

    Self {
      keys: declared,
      values: BTreeMap::new(),
    }
  }

  /// Declared keys, in declaration order.
  pub fn keys(&self) -> &[String] {
    &self.keys
  }

  pub fn owns(&self, key: &str) -> bool {
    self.keys.iter().any(|k| k == key)
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.values.get(key).map(String::as_str)
  }

  /// Active values only.
  pub fn values(&self) -> &BTreeMap<String, String> {
    &self.values
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// Set a filter value. Returns whether the state changed.
  pub fn set(&mut self, key: &str, value: Option<&str>) -> Result<bool> {
    if !self.owns(key) {
      return Err(eyre!("Unknown filter key '{}'", key));
    }

    match value {
      Some(v) if !v.is_empty() => {
        if self.values.get(key).map(String::as_str) == Some(v) {
          return Ok(false);
        }
        self.values.insert(key.to_string(), v.to_string());
        Ok(true)
      }
      _ => Ok(self.values.remove(key).is_some()),
    }
  }

  pub fn clear(&mut self, key: &str) -> Result<bool> {
    self.set(key, None)
  }

  /// Drop every active value, keeping the declared keys.
  pub fn reset(&mut self) -> bool {
    let changed = !self.values.is_empty();
    self.values.clear();
    changed
  }

  /// Active `(key, value)` pairs in declaration order.
  pub fn active(&self) -> impl Iterator<Item = (&str, &str)> {
    self
      .keys
      .iter()
      .filter_map(|k| self.values.get(k).map(|v| (k.as_str(), v.as_str())))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_value_removes_key() {
    let mut filters = FilterState::new(["shopId", "deliveryStatus"]);
    assert!(filters.set("shopId", Some("42")).unwrap());
    assert_eq!(filters.get("shopId"), Some("42"));

    assert!(filters.set("shopId", Some("")).unwrap());
    assert_eq!(filters.get("shopId"), None);
    assert!(filters.is_empty());
  }

  #[test]
  fn test_set_same_value_is_not_a_change() {
    let mut filters = FilterState::new(["status"]);
    assert!(filters.set("status", Some("PAID")).unwrap());
    assert!(!filters.set("status", Some("PAID")).unwrap());
    assert!(filters.clear("search").is_err());
  }

  #[test]
  fn test_unknown_key_is_rejected() {
    let mut filters = FilterState::new(["status"]);
    assert!(filters.set("page", Some("2")).is_err());
  }

  #[test]
  fn test_equality_ignores_insertion_order() {
    let mut a = FilterState::new(["shopId", "deliveryStatus"]);
    a.set("shopId", Some("1")).unwrap();
    a.set("deliveryStatus", Some("DELIVERED")).unwrap();

    let mut b = FilterState::new(["shopId", "deliveryStatus"]);
    b.set("deliveryStatus", Some("DELIVERED")).unwrap();
    b.set("shopId", Some("1")).unwrap();

    assert_eq!(a, b);
  }

  #[test]
  fn test_active_follows_declaration_order() {
    let mut filters = FilterState::new(["dateFrom", "dateTo", "status"]);
    filters.set("status", Some("OPEN")).unwrap();
    filters.set("dateFrom", Some("2024-01-01")).unwrap();

    let active: Vec<_> = filters.active().collect();
    assert_eq!(active, vec![("dateFrom", "2024-01-01"), ("status", "OPEN")]);
  }
}
