//! REST collaborator for the list views.

mod api_types;
mod auth;
mod cached_client;
mod client;
mod resource;

pub use api_types::{error_message, ApiError, ProductOption, ShopOption, GENERIC_ERROR_MESSAGE};
pub use auth::{AuthContext, AuthEvent, AuthSession, AuthUser, Role};
pub use cached_client::CachedApiClient;
pub use client::ApiClient;
pub use resource::Resource;
