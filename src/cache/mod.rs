//! Two-tier cache for reference data that rarely changes.
//!
//! - Entries live in process memory and, best-effort, in session storage
//! - Every entry expires five minutes after it was written
//! - Session storage failures never surface; memory stays authoritative
//! - Concurrent misses on one key share a single fetch

mod meta;
mod storage;
mod traits;

pub use meta::{MetaCache, META_TTL_MILLIS, PRODUCTS_META_KEY, SHOPS_META_KEY};
pub use storage::{MemorySessionStore, NoopStorage, SessionStore, SqliteSessionStore};
pub use traits::{CacheEntry, CacheSource, Cached, Clock, ManualClock, SystemClock};
