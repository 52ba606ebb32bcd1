//! API client with cached lookup lists.

use color_eyre::Result;

use super::api_types::{ProductOption, ShopOption};
use super::client::ApiClient;
use super::resource::Resource;
use crate::cache::{Cached, MetaCache, SessionStore, PRODUCTS_META_KEY, SHOPS_META_KEY};

/// Wraps [`ApiClient`] so opening a creation form repeatedly does not
/// refetch the shop and product lists every time.
pub struct CachedApiClient<S: SessionStore> {
  inner: ApiClient,
  meta: MetaCache<S>,
}

impl<S: SessionStore + 'static> CachedApiClient<S> {
  pub fn new(inner: ApiClient, meta: MetaCache<S>) -> Self {
    Self { inner, meta }
  }

  pub fn api(&self) -> &ApiClient {
    &self.inner
  }

  /// Shop lookup list.
  pub async fn shops(&self) -> Result<Cached<Vec<ShopOption>>> {
    let inner = self.inner.clone();
    self
      .meta
      .get_or_fetch(SHOPS_META_KEY, move || async move {
        Ok::<_, color_eyre::Report>(inner.lookup::<ShopOption>(Resource::Shops).await?)
      })
      .await
  }

  /// Product lookup list.
  pub async fn products(&self) -> Result<Cached<Vec<ProductOption>>> {
    let inner = self.inner.clone();
    self
      .meta
      .get_or_fetch(PRODUCTS_META_KEY, move || async move {
        Ok::<_, color_eyre::Report>(inner.lookup::<ProductOption>(Resource::Products).await?)
      })
      .await
  }
}

impl<S: SessionStore> Clone for CachedApiClient<S> {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
      meta: self.meta.clone(),
    }
  }
}
