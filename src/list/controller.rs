//! Paginated list fetching with last-issued-wins semantics.
//!
//! A [`ListFetchController`] owns the loading/error/data state of one list
//! view. Every fetch is tagged with a generation number; results come back
//! through a channel and are only applied when they belong to the latest
//! generation and the controller is still mounted. Call [`ListFetchController::poll`]
//! from the event loop tick.
//!
//! ```ignore
//! let api = client.clone();
//! let mut list = ListFetchController::new(20, move |params| {
//!     let api = api.clone();
//!     async move { api.list(Resource::Distributions, &params).await.map_err(|e| e.to_string()) }
//! });
//!
//! list.mount(&filters);
//! // later, in tick
//! if list.poll() {
//!     // re-render
//! }
//! ```

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;
use tracing::debug;

use super::response::PageResult;
use crate::sync::FilterState;

/// Request parameters handed to the fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
  pub page: u32,
  pub limit: u32,
  pub filters: BTreeMap<String, String>,
}

impl ListParams {
  /// `page`, `limit`, then every active filter.
  pub fn query_pairs(&self) -> Vec<(String, String)> {
    let mut pairs = vec![
      ("page".to_string(), self.page.to_string()),
      ("limit".to_string(), self.limit.to_string()),
    ];
    pairs.extend(self.filters.iter().map(|(k, v)| (k.clone(), v.clone())));
    pairs
  }
}

/// What a list view should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStatus<'a> {
  Loading,
  /// Inline error with retry; previous data stays available.
  Error(&'a str),
  Empty,
  Ready,
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send>>;

type FetcherFn<T> = Box<dyn Fn(ListParams) -> BoxFuture<PageResult<T>> + Send + Sync>;

struct Completion<T> {
  generation: u64,
  page: u32,
  result: Result<PageResult<T>, String>,
}

pub struct ListFetchController<T> {
  /// Current handler. Read at the moment a fetch is issued.
  fetcher: FetcherFn<T>,
  limit: u32,
  /// Last successfully loaded page.
  page: u32,
  filters: BTreeMap<String, String>,
  data: Option<PageResult<T>>,
  loading: bool,
  error: Option<String>,
  generation: u64,
  mounted: bool,
  initial_fetch_done: bool,
  sender: mpsc::UnboundedSender<Completion<T>>,
  receiver: Option<mpsc::UnboundedReceiver<Completion<T>>>,
}

impl<T: Send + 'static> ListFetchController<T> {
  pub fn new<F, Fut>(limit: u32, fetcher: F) -> Self
  where
    F: Fn(ListParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<PageResult<T>, String>> + Send + 'static,
  {
    let (sender, receiver) = mpsc::unbounded_channel();
    Self {
      fetcher: Box::new(move |params| Box::pin(fetcher(params))),
      limit: limit.max(1),
      page: 1,
      filters: BTreeMap::new(),
      data: None,
      loading: false,
      error: None,
      generation: 0,
      mounted: false,
      initial_fetch_done: false,
      sender,
      receiver: Some(receiver),
    }
  }

  /// Swap the handler used by subsequent fetches. In-flight fetches keep
  /// running and are still subject to the generation check.
  pub fn replace_fetcher<F, Fut>(&mut self, fetcher: F)
  where
    F: Fn(ListParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<PageResult<T>, String>> + Send + 'static,
  {
    self.fetcher = Box::new(move |params| Box::pin(fetcher(params)));
  }

  /// Issue the initial fetch. Only the first call has an effect.
  pub fn mount(&mut self, filters: &FilterState) -> bool {
    if self.initial_fetch_done {
      return false;
    }
    self.mounted = true;
    self.initial_fetch_done = true;
    self.filters = filters.values().clone();
    self.start_fetch(1);
    true
  }

  /// Stop applying results. Anything still in flight is dropped on arrival.
  pub fn unmount(&mut self) {
    self.mounted = false;
    self.loading = false;
    self.receiver = None;
  }

  pub fn is_mounted(&self) -> bool {
    self.mounted
  }

  /// Adopt a new filter set. When it differs structurally from the current
  /// one, page resets to 1 and a fetch is issued. Returns whether a fetch
  /// was issued.
  pub fn set_filters(&mut self, filters: &FilterState) -> bool {
    if self.filters == *filters.values() {
      return false;
    }
    self.filters = filters.values().clone();
    if !self.mounted {
      return false;
    }
    self.start_fetch(1);
    true
  }

  /// Refetch the current page with the current filters.
  pub fn refresh(&mut self) {
    self.start_fetch(self.page);
  }

  pub fn go_to_page(&mut self, page: u32) {
    self.start_fetch(page.max(1));
  }

  /// Returns false when already on the last known page.
  pub fn next_page(&mut self) -> bool {
    if let Some(pages) = self.data.as_ref().and_then(PageResult::pages) {
      if self.page >= pages {
        return false;
      }
    }
    self.start_fetch(self.page + 1);
    true
  }

  pub fn prev_page(&mut self) -> bool {
    if self.page <= 1 {
      return false;
    }
    self.start_fetch(self.page - 1);
    true
  }

  /// Apply any results that have arrived. Returns `true` if state changed.
  pub fn poll(&mut self) -> bool {
    let Some(receiver) = self.receiver.as_mut() else {
      return false;
    };

    let mut ready = Vec::new();
    while let Ok(completion) = receiver.try_recv() {
      ready.push(completion);
    }

    let mut changed = false;
    for completion in ready {
      changed |= self.apply(completion);
    }
    changed
  }

  pub fn is_loading(&self) -> bool {
    self.loading
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  pub fn data(&self) -> Option<&PageResult<T>> {
    self.data.as_ref()
  }

  pub fn items(&self) -> &[T] {
    self.data.as_ref().map(|d| d.items.as_slice()).unwrap_or(&[])
  }

  pub fn total(&self) -> u64 {
    self.data.as_ref().map(|d| d.total).unwrap_or(0)
  }

  pub fn page(&self) -> u32 {
    self.page
  }

  pub fn limit(&self) -> u32 {
    self.limit
  }

  pub fn status(&self) -> ListStatus<'_> {
    if self.loading {
      ListStatus::Loading
    } else if let Some(error) = &self.error {
      ListStatus::Error(error)
    } else if self.items().is_empty() {
      ListStatus::Empty
    } else {
      ListStatus::Ready
    }
  }

  fn start_fetch(&mut self, page: u32) {
    if !self.mounted {
      return;
    }

    self.generation += 1;
    let generation = self.generation;
    self.loading = true;
    self.error = None;

    let params = ListParams {
      page,
      limit: self.limit,
      filters: self.filters.clone(),
    };
    debug!(generation, page, filters = ?params.filters, "Fetching list page");

    let future = (self.fetcher)(params);
    let sender = self.sender.clone();
    tokio::spawn(async move {
      let result = future.await;
      // Receiver is gone once the view unmounts
      let _ = sender.send(Completion {
        generation,
        page,
        result,
      });
    });
  }

  fn apply(&mut self, completion: Completion<T>) -> bool {
    if !self.mounted {
      return false;
    }
    if completion.generation != self.generation {
      debug!(
        stale = completion.generation,
        current = self.generation,
        "Discarding superseded list result"
      );
      return false;
    }

    self.loading = false;
    match completion.result {
      Ok(page) => {
        self.data = Some(page);
        self.page = completion.page;
        self.error = None;
      }
      Err(message) => {
        self.error = Some(message);
      }
    }
    true
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ListFetchController<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ListFetchController")
      .field("page", &self.page)
      .field("limit", &self.limit)
      .field("filters", &self.filters)
      .field("loading", &self.loading)
      .field("error", &self.error)
      .field("generation", &self.generation)
      .field("mounted", &self.mounted)
      .finish_non_exhaustive()
  }
}
