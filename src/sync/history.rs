use url::Url;

/// Navigation history as seen by a list view.
///
/// Views only ever read the current location and replace it; pushing and
/// moving through entries is done by whoever owns the history (the user).
pub trait History {
  fn location(&self) -> &Url;

  /// Replace the current entry without adding a new one.
  fn replace(&mut self, url: Url);
}

/// In-process history stack with browser-like back/forward.
#[derive(Debug, Clone)]
pub struct MemoryHistory {
  entries: Vec<Url>,
  index: usize,
}

impl MemoryHistory {
  pub fn new(start: Url) -> Self {
    Self {
      entries: vec![start],
      index: 0,
    }
  }

  /// Navigate to a new entry, discarding any forward entries.
  pub fn push(&mut self, url: Url) {
    self.entries.truncate(self.index + 1);
    self.entries.push(url);
    self.index = self.entries.len() - 1;
  }

  /// Returns false when already at the oldest entry.
  pub fn back(&mut self) -> bool {
    if self.index == 0 {
      return false;
    }
    self.index -= 1;
    true
  }

  pub fn forward(&mut self) -> bool {
    if self.index + 1 >= self.entries.len() {
      return false;
    }
    self.index += 1;
    true
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl History for MemoryHistory {
  fn location(&self) -> &Url {
    &self.entries[self.index]
  }

  fn replace(&mut self, url: Url) {
    self.entries[self.index] = url;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
  }

  #[test]
  fn test_back_and_forward() {
    let mut history = MemoryHistory::new(url("app://lensdesk/distributions"));
    history.push(url("app://lensdesk/distributions?shopId=1"));

    assert!(history.back());
    assert_eq!(history.location().query(), None);
    assert!(!history.back());

    assert!(history.forward());
    assert_eq!(history.location().query(), Some("shopId=1"));
    assert!(!history.forward());
  }

  #[test]
  fn test_replace_does_not_grow_history() {
    let mut history = MemoryHistory::new(url("app://lensdesk/shops"));
    history.replace(url("app://lensdesk/shops?search=north"));
    history.replace(url("app://lensdesk/shops?search=south"));

    assert_eq!(history.len(), 1);
    assert_eq!(history.location().query(), Some("search=south"));
  }

  #[test]
  fn test_push_drops_forward_entries() {
    let mut history = MemoryHistory::new(url("app://lensdesk/a"));
    history.push(url("app://lensdesk/b"));
    history.push(url("app://lensdesk/c"));
    history.back();
    history.back();
    history.push(url("app://lensdesk/d"));

    assert_eq!(history.len(), 2);
    assert!(!history.forward());
    assert_eq!(history.location().path(), "/d");
  }
}
