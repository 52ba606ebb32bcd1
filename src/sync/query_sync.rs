//! Two-way binding between a view's [`FilterState`] and the location's query string.
//!
//! Local edits are written with a history *replace* so tweaking filters never
//! adds history entries. Navigation that changes owned keys behind the view's
//! back (back/forward) is detected by comparing the location against the
//! owned values last read or written by this binding.

use std::collections::BTreeMap;
use tracing::debug;
use url::Url;

use super::filters::FilterState;
use super::history::History;

/// Extract the owned keys from a URL's query string.
///
/// The first occurrence of a key wins. Empty values count as absent.
pub fn parse_owned(url: &Url, owned: &[String]) -> BTreeMap<String, String> {
  let mut values = BTreeMap::new();
  for (key, value) in url.query_pairs() {
    if value.is_empty() || !owned.iter().any(|k| *k == key) {
      continue;
    }
    values
      .entry(key.into_owned())
      .or_insert_with(|| value.into_owned());
  }
  values
}

/// Whether any owned key appears more than once or with an empty value.
/// [`parse_owned`] hides both, so only a rewrite removes them.
fn has_stray_owned(url: &Url, owned: &[String]) -> bool {
  let mut seen = Vec::new();
  for (key, value) in url.query_pairs() {
    if !owned.iter().any(|k| *k == key) {
      continue;
    }
    if value.is_empty() || seen.contains(&key) {
      return true;
    }
    seen.push(key);
  }
  false
}

/// Write the state's owned keys into `url`.
///
/// Keys the view does not own are kept, in their original order. Owned keys
/// follow in declaration order; inactive ones are omitted entirely.
pub fn serialize_owned(url: &Url, state: &FilterState) -> Url {
  let owned = state.keys();
  let foreign: Vec<(String, String)> = url
    .query_pairs()
    .filter(|(k, _)| !owned.iter().any(|o| o == k))
    .map(|(k, v)| (k.into_owned(), v.into_owned()))
    .collect();

  let mut next = url.clone();
  if foreign.is_empty() && state.is_empty() {
    next.set_query(None);
    return next;
  }

  next
    .query_pairs_mut()
    .clear()
    .extend_pairs(foreign.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    .extend_pairs(state.active());
  next
}

/// Keeps one view's filters and the location query in step.
#[derive(Debug, Clone)]
pub struct QuerySync {
  owned: Vec<String>,
  /// Owned values as of the last read or write.
  last_seen: Option<BTreeMap<String, String>>,
}

impl QuerySync {
  pub fn new<I, S>(owned: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      owned: owned.into_iter().map(Into::into).collect(),
      last_seen: None,
    }
  }

  /// Bind to the keys a filter state declares.
  pub fn for_state(state: &FilterState) -> Self {
    Self::new(state.keys().iter().cloned())
  }

  pub fn owned(&self) -> &[String] {
    &self.owned
  }

  /// Seed `state` from the location.
  ///
  /// Owned keys present in the URL override the current state; keys absent
  /// from the URL keep their current (default) value. Returns whether the
  /// state changed.
  pub fn mount<H: History + ?Sized>(&mut self, history: &H, state: &mut FilterState) -> bool {
    let from_url = parse_owned(history.location(), &self.owned);
    let mut changed = false;
    for (key, value) in &from_url {
      if state.get(key) != Some(value.as_str()) {
        match state.set(key, Some(value.as_str())) {
          Ok(set) => changed |= set,
          Err(e) => debug!(key, error = %e, "Skipped location key"),
        }
      }
    }
    self.last_seen = Some(from_url);
    if changed {
      debug!(keys = ?self.owned, "Seeded filters from location");
    }
    changed
  }

  /// Write local state into the location with a history replace.
  ///
  /// Returns whether the location was replaced. Writing the same state twice
  /// is a no-op the second time.
  pub fn push_state<H: History + ?Sized>(&mut self, history: &mut H, state: &FilterState) -> bool {
    let current = history.location();
    let in_url = parse_owned(current, &self.owned);
    let wanted = self.owned_values(state);
    self.last_seen = Some(wanted.clone());

    if in_url == wanted && !has_stray_owned(current, &self.owned) {
      return false;
    }

    let next = serialize_owned(current, state);
    history.replace(next);
    true
  }

  /// Detect a location change that did not come from [`Self::push_state`].
  ///
  /// When the owned values in the URL differ from the last ones this binding
  /// saw, `state` is updated to match and `on_external_change` is invoked
  /// once. Returns whether that happened.
  pub fn sync_external<H, F>(
    &mut self,
    history: &H,
    state: &mut FilterState,
    on_external_change: F,
  ) -> bool
  where
    H: History + ?Sized,
    F: FnOnce(&FilterState),
  {
    let current = parse_owned(history.location(), &self.owned);
    if self.last_seen.as_ref() == Some(&current) {
      return false;
    }
    self.last_seen = Some(current.clone());

    if self.owned_values(state) == current {
      return false;
    }

    for key in &self.owned {
      if let Err(e) = state.set(key, current.get(key).map(String::as_str)) {
        debug!(key, error = %e, "Skipped location key");
      }
    }
    debug!(values = ?current, "Location changed externally");
    on_external_change(&*state);
    true
  }

  fn owned_values(&self, state: &FilterState) -> BTreeMap<String, String> {
    state
      .values()
      .iter()
      .filter(|(k, _)| self.owned.contains(*k))
      .map(|(k, v)| (k.clone(), v.clone()))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sync::history::MemoryHistory;

  const KEYS: [&str; 3] = ["shopId", "deliveryStatus", "dateFrom"];

  fn history(s: &str) -> MemoryHistory {
    MemoryHistory::new(Url::parse(s).unwrap())
  }

  fn state() -> FilterState {
    FilterState::new(KEYS)
  }

  #[test]
  fn test_round_trip_is_identity() {
    let mut s = state();
    s.set("shopId", Some("7")).unwrap();
    s.set("deliveryStatus", Some("IN TRANSIT & HELD")).unwrap();

    let base = Url::parse("app://lensdesk/distributions").unwrap();
    let url = serialize_owned(&base, &s);
    let parsed = parse_owned(&url, s.keys());

    assert_eq!(&parsed, s.values());
  }

  #[test]
  fn test_empty_values_are_omitted() {
    let mut h = history("app://lensdesk/distributions?shopId=3");
    let mut s = state();
    let mut sync = QuerySync::for_state(&s);
    sync.mount(&h, &mut s);

    s.set("shopId", Some("")).unwrap();
    assert!(sync.push_state(&mut h, &s));
    assert_eq!(h.location().query(), None);
  }

  #[test]
  fn test_foreign_keys_are_preserved() {
    let mut h = history("app://lensdesk/distributions?tab=open&shopId=1");
    let mut s = state();
    let mut sync = QuerySync::for_state(&s);
    sync.mount(&h, &mut s);
    assert_eq!(s.get("shopId"), Some("1"));

    s.set("deliveryStatus", Some("DELIVERED")).unwrap();
    sync.push_state(&mut h, &s);

    assert_eq!(
      h.location().query(),
      Some("tab=open&shopId=1&deliveryStatus=DELIVERED")
    );
  }

  #[test]
  fn test_push_state_is_idempotent() {
    let mut h = history("app://lensdesk/distributions");
    let mut s = state();
    let mut sync = QuerySync::for_state(&s);
    sync.mount(&h, &mut s);

    s.set("dateFrom", Some("2024-03-01")).unwrap();
    assert!(sync.push_state(&mut h, &s));
    let first = h.location().clone();

    assert!(!sync.push_state(&mut h, &s));
    assert_eq!(h.location(), &first);
    assert_eq!(h.len(), 1);
  }

  #[test]
  fn test_mount_keeps_defaults_for_absent_keys() {
    let h = history("app://lensdesk/distributions?shopId=9");
    let mut s = state();
    s.set("deliveryStatus", Some("PENDING")).unwrap();
    let mut sync = QuerySync::for_state(&s);

    assert!(sync.mount(&h, &mut s));
    assert_eq!(s.get("shopId"), Some("9"));
    assert_eq!(s.get("deliveryStatus"), Some("PENDING"));
  }

  #[test]
  fn test_mount_without_differences_reports_no_change() {
    let h = history("app://lensdesk/distributions?shopId=9");
    let mut s = state();
    s.set("shopId", Some("9")).unwrap();
    let mut sync = QuerySync::for_state(&s);

    assert!(!sync.mount(&h, &mut s));
  }

  #[test]
  fn test_local_edit_is_not_external() {
    let h = history("app://lensdesk/distributions");
    let mut s = state();
    let mut sync = QuerySync::for_state(&s);
    sync.mount(&h, &mut s);

    s.set("shopId", Some("5")).unwrap();
    let mut calls = 0;
    assert!(!sync.sync_external(&h, &mut s, |_| calls += 1));
    assert_eq!(calls, 0);
    assert_eq!(s.get("shopId"), Some("5"));
  }

  #[test]
  fn test_back_navigation_triggers_exactly_one_callback() {
    let mut h = history("app://lensdesk/distributions");
    let mut s = state();
    let mut sync = QuerySync::for_state(&s);
    sync.mount(&h, &mut s);

    // A second entry carrying a filter, then the user goes back and forward.
    h.push(Url::parse("app://lensdesk/distributions?deliveryStatus=DELIVERED").unwrap());

    let mut calls = 0;
    assert!(sync.sync_external(&h, &mut s, |f| {
      assert_eq!(f.get("deliveryStatus"), Some("DELIVERED"));
      calls += 1;
    }));
    assert_eq!(calls, 1);

    // Writing the synced state back must not look like another change.
    assert!(!sync.push_state(&mut h, &s));
    assert!(!sync.sync_external(&h, &mut s, |_| calls += 1));
    assert_eq!(calls, 1);

    h.back();
    assert!(sync.sync_external(&h, &mut s, |_| calls += 1));
    assert_eq!(calls, 2);
    assert!(s.is_empty());
  }

  #[test]
  fn test_push_state_drops_empty_owned_params() {
    let mut h = history("app://lensdesk/distributions?shopId=&tab=open");
    let mut s = state();
    let mut sync = QuerySync::for_state(&s);
    sync.mount(&h, &mut s);
    assert!(s.is_empty());

    assert!(sync.push_state(&mut h, &s));
    assert_eq!(h.location().query(), Some("tab=open"));
    assert!(!sync.push_state(&mut h, &s));
  }

  #[test]
  fn test_push_state_collapses_duplicate_owned_params() {
    let mut h = history("app://lensdesk/distributions?shopId=1&shopId=2");
    let mut s = state();
    let mut sync = QuerySync::for_state(&s);
    sync.mount(&h, &mut s);
    assert_eq!(s.get("shopId"), Some("1"));

    assert!(sync.push_state(&mut h, &s));
    assert_eq!(h.location().query(), Some("shopId=1"));
  }

  #[test]
  fn test_keys_outside_the_state_are_skipped() {
    let mut h = history("app://lensdesk/distributions");
    let mut s = state();
    let mut sync = QuerySync::new(["shopId", "unknownKey"]);
    sync.mount(&h, &mut s);

    h.push(Url::parse("app://lensdesk/distributions?shopId=4&unknownKey=x").unwrap());
    let mut calls = 0;
    assert!(sync.sync_external(&h, &mut s, |_| calls += 1));
    assert_eq!(calls, 1);
    assert_eq!(s.get("shopId"), Some("4"));
    assert_eq!(s.get("unknownKey"), None);

    let mut fresh = state();
    let mut sync = QuerySync::new(["shopId", "unknownKey"]);
    assert!(sync.mount(&h, &mut fresh));
    assert_eq!(fresh.get("shopId"), Some("4"));
  }
}
