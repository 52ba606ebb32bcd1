//! Core types for the reference-data cache.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

/// A timestamped snapshot of reference data.
///
/// Serialized as `{ "data": ..., "ts": <unix millis> }` in session storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
  pub data: T,
  pub ts: i64,
}

impl<T> CacheEntry<T> {
  pub fn new(data: T, ts: i64) -> Self {
    Self { data, ts }
  }

  /// An entry is usable strictly before `ts + ttl`.
  pub fn is_fresh(&self, now: i64, ttl_millis: i64) -> bool {
    now - self.ts < ttl_millis
  }
}

/// Source of "now" in unix milliseconds.
pub trait Clock: Send + Sync {
  fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now_millis(&self) -> i64 {
    Utc::now().timestamp_millis()
  }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
  now: AtomicI64,
}

impl ManualClock {
  pub fn new(start: i64) -> Self {
    Self {
      now: AtomicI64::new(start),
    }
  }

  pub fn set(&self, millis: i64) {
    self.now.store(millis, Ordering::SeqCst);
  }

  pub fn advance(&self, millis: i64) {
    self.now.fetch_add(millis, Ordering::SeqCst);
  }
}

impl Clock for ManualClock {
  fn now_millis(&self) -> i64 {
    self.now.load(Ordering::SeqCst)
  }
}

/// Where a cached value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// In-process memory tier
  Memory,
  /// Session storage, promoted to memory on read
  Session,
  /// Fetched from the API
  Network,
}

/// A value together with the tier that produced it.
#[derive(Debug, Clone)]
pub struct Cached<T> {
  pub data: T,
  pub source: CacheSource,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_freshness_boundary() {
    let entry = CacheEntry::new((), 1_000);
    assert!(entry.is_fresh(1_000 + 299_999, 300_000));
    assert!(!entry.is_fresh(1_000 + 300_000, 300_000));
  }

  #[test]
  fn test_entry_wire_shape() {
    let entry = CacheEntry::new(vec!["a"], 42);
    let json = serde_json::to_string(&entry).unwrap();
    assert_eq!(json, r#"{"data":["a"],"ts":42}"#);
  }

  #[test]
  fn test_manual_clock() {
    let clock = ManualClock::new(10);
    clock.advance(5);
    assert_eq!(clock.now_millis(), 15);
    clock.set(3);
    assert_eq!(clock.now_millis(), 3);
  }
}
