//! List-state plumbing for an optical-retail management client.
//!
//! - [`sync`]: filter state mirrored into the location query string
//! - [`list`]: paginated fetching where the last-issued request wins
//! - [`cache`]: short-TTL memory + session cache for lookup lists
//! - [`api`]: the REST collaborator these sit on

pub mod api;
pub mod cache;
pub mod config;
pub mod list;
pub mod logging;
pub mod sync;
