//! Paginated list state for views backed by the REST API.

mod controller;
mod response;

pub use controller::{ListFetchController, ListParams, ListStatus};
pub use response::{normalize, ListResponse, PageResult, Pagination};
