//! Filter state and its reflection in the location query string.

mod filters;
mod history;
mod query_sync;

pub use filters::FilterState;
pub use history::{History, MemoryHistory};
pub use query_sync::{parse_owned, serialize_owned, QuerySync};
