//! Short-lived cache for reference lists (shops, products).
//!
//! Two tiers: process memory first, then session storage. Entries expire
//! five minutes after they were written; staleness is discovered on read and
//! a stale entry is replaced wholesale by the next write.

use color_eyre::{eyre::eyre, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use super::storage::SessionStore;
use super::traits::{CacheEntry, CacheSource, Cached, Clock, SystemClock};

/// Time-to-live for every entry.
pub const META_TTL_MILLIS: i64 = 5 * 60 * 1000;

/// Cache key for the shop lookup list.
pub const SHOPS_META_KEY: &str = "meta:shops";
/// Cache key for the product lookup list.
pub const PRODUCTS_META_KEY: &str = "meta:products";

const SESSION_PREFIX: &str = "lensdesk:";

type InFlight = Shared<BoxFuture<'static, Result<Value, String>>>;

struct Inner<S> {
  memory: Mutex<HashMap<String, CacheEntry<Value>>>,
  session: S,
  clock: Arc<dyn Clock>,
  in_flight: Mutex<HashMap<String, InFlight>>,
}

/// Memory + session storage cache for rarely-changing lookup lists.
pub struct MetaCache<S: SessionStore> {
  inner: Arc<Inner<S>>,
}

impl<S: SessionStore + 'static> MetaCache<S> {
  pub fn new(session: S) -> Self {
    Self::with_clock(session, Arc::new(SystemClock))
  }

  pub fn with_clock(session: S, clock: Arc<dyn Clock>) -> Self {
    Self {
      inner: Arc::new(Inner {
        memory: Mutex::new(HashMap::new()),
        session,
        clock,
        in_flight: Mutex::new(HashMap::new()),
      }),
    }
  }

  /// Look up a fresh entry, memory first, then session storage.
  pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<Cached<T>> {
    let (value, source) = self.get_value(key)?;
    match serde_json::from_value(value) {
      Ok(data) => Some(Cached { data, source }),
      Err(e) => {
        warn!(key, error = %e, "Cached value has an unexpected shape");
        None
      }
    }
  }

  /// Write to memory, then best-effort to session storage.
  pub fn put<T: Serialize>(&self, key: &str, data: &T) {
    match serde_json::to_value(data) {
      Ok(value) => self.put_value(key, value),
      Err(e) => warn!(key, error = %e, "Could not serialize cache value"),
    }
  }

  /// Return a fresh cached value or run `fetcher` and cache its result.
  ///
  /// Concurrent callers missing on the same key share one fetch.
  pub async fn get_or_fetch<T, F, Fut>(&self, key: &str, fetcher: F) -> Result<Cached<T>>
  where
    T: Serialize + DeserializeOwned + Send + 'static,
    F: FnOnce() -> Fut + Send,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    if let Some(hit) = self.get::<T>(key) {
      return Ok(hit);
    }

    let (shared, leader) = {
      let mut in_flight = self
        .inner
        .in_flight
        .lock()
        .unwrap_or_else(|e| e.into_inner());
      match in_flight.get(key) {
        Some(pending) => (pending.clone(), false),
        None => {
          let shared = self.spawn_fetch(key, fetcher());
          in_flight.insert(key.to_string(), shared.clone());
          (shared, true)
        }
      }
    };

    if !leader {
      debug!(key, "Joining in-flight fetch");
    }

    let outcome = shared.await;
    let value = outcome.map_err(|e| eyre!(e))?;
    let data = serde_json::from_value(value)
      .map_err(|e| eyre!("Failed to decode {} lookup: {}", key, e))?;
    Ok(Cached {
      data,
      source: CacheSource::Network,
    })
  }

  /// Run the fetch on its own task. The task writes the cache and clears
  /// the in-flight slot, so a caller dropping its future cannot leave the
  /// key stuck.
  fn spawn_fetch<T, Fut>(&self, key: &str, future: Fut) -> InFlight
  where
    T: Serialize + Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    let cache = self.clone();
    let key = key.to_string();
    let handle = tokio::spawn(async move {
      let outcome = match future.await {
        Ok(data) => serde_json::to_value(data).map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
      };
      if let Ok(value) = &outcome {
        cache.put_value(&key, value.clone());
      }
      cache
        .inner
        .in_flight
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .remove(&key);
      outcome
    });

    async move {
      handle
        .await
        .unwrap_or_else(|e| Err(format!("Lookup fetch aborted: {}", e)))
    }
    .boxed()
    .shared()
  }

  fn get_value(&self, key: &str) -> Option<(Value, CacheSource)> {
    let now = self.inner.clock.now_millis();

    {
      let memory = self
        .inner
        .memory
        .lock()
        .unwrap_or_else(|e| e.into_inner());
      if let Some(entry) = memory.get(key) {
        if entry.is_fresh(now, META_TTL_MILLIS) {
          debug!(key, "Memory cache hit");
          return Some((entry.data.clone(), CacheSource::Memory));
        }
      }
    }

    let raw = match self.inner.session.get_item(&session_key(key)) {
      Ok(Some(raw)) => raw,
      Ok(None) => return None,
      Err(e) => {
        debug!(key, error = %e, "Session storage read failed");
        return None;
      }
    };

    let entry: CacheEntry<Value> = match serde_json::from_str(&raw) {
      Ok(entry) => entry,
      Err(e) => {
        debug!(key, error = %e, "Ignoring unreadable session entry");
        return None;
      }
    };

    if !entry.is_fresh(now, META_TTL_MILLIS) {
      debug!(key, "Cache entry expired");
      return None;
    }

    debug!(key, "Session cache hit, promoting to memory");
    let data = entry.data.clone();
    self
      .inner
      .memory
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .insert(key.to_string(), entry);
    Some((data, CacheSource::Session))
  }

  fn put_value(&self, key: &str, value: Value) {
    let entry = CacheEntry::new(value, self.inner.clock.now_millis());

    match serde_json::to_string(&entry) {
      Ok(raw) => {
        if let Err(e) = self.inner.session.set_item(&session_key(key), &raw) {
          // Memory stays authoritative for this session
          debug!(key, error = %e, "Session storage write failed");
        }
      }
      Err(e) => debug!(key, error = %e, "Could not encode session entry"),
    }

    self
      .inner
      .memory
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .insert(key.to_string(), entry);
  }
}

impl<S: SessionStore> Clone for MetaCache<S> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

fn session_key(key: &str) -> String {
  format!("{}{}", SESSION_PREFIX, key)
}
