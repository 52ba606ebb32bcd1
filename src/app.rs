use crate::commands::{self, PromptCommand};
use crate::event::{Event, EventHandler};
use crate::ui::{self, KeyResult, ListView, Prompt, PromptEvent};
use color_eyre::{eyre::eyre, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use lensdesk::api::{ApiClient, AuthContext, AuthEvent, CachedApiClient, Resource};
use lensdesk::cache::{
  CacheSource, MemorySessionStore, MetaCache, SessionStore, SqliteSessionStore,
};
use lensdesk::config::Config;
use lensdesk::sync::{History, MemoryHistory};
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};
use url::Url;

/// Locations live under this base; the first path segment names the resource.
const LOCATION_BASE: &str = "app://lensdesk/";

/// One-line message under the list
#[derive(Debug, Clone)]
pub struct StatusLine {
  pub message: String,
  pub is_error: bool,
}

/// Main application state
pub struct App {
  config: Config,
  title: String,

  /// Navigation history; filter edits replace the current entry
  history: MemoryHistory,

  view: ListView,
  prompt: Prompt,

  api: CachedApiClient<Box<dyn SessionStore>>,
  auth_events: broadcast::Receiver<AuthEvent>,

  /// Event sender for async tasks
  event_tx: mpsc::UnboundedSender<Event>,

  status: Option<StatusLine>,
  should_quit: bool,
}

impl App {
  pub fn new(config: Config, start: Option<&str>) -> Result<Self> {
    let auth = Config::api_token()
      .map(AuthContext::with_token)
      .unwrap_or_default();
    let auth_events = auth.subscribe();
    let api = ApiClient::new(&config, auth)?;
    let meta = MetaCache::new(session_store(config.cache.persist_session));
    let cached = CachedApiClient::new(api.clone(), meta);

    let resource = config.default_resource;
    let start = start.or(config.start_url.as_deref());
    let history = MemoryHistory::new(start_location(resource, start)?);
    let resource = resource_from_location(history.location()).unwrap_or(resource);

    let title = config
      .title
      .clone()
      .unwrap_or_else(|| ui::extract_domain(&config.api.url).to_string());
    let (tx, _rx) = mpsc::unbounded_channel();

    Ok(Self {
      view: ListView::new(resource, api, config.page_size),
      config,
      title,
      history,
      prompt: Prompt::new(),
      api: cached,
      auth_events,
      event_tx: tx,
      status: None,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let result = self.event_loop().await;

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(&mut self) -> Result<()> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(100));
    self.event_tx = events.sender();

    info!(location = %self.history.location(), "Starting");
    self.view.mount(&self.history);

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => return Err(eyre!("Event stream closed")),
      }
    }

    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => self.tick(),
      Event::Resize => {}
      Event::Lookups(Ok(message)) => self.set_status(message, false),
      Event::Lookups(Err(message)) => self.set_status(message, true),
    }
  }

  fn tick(&mut self) {
    loop {
      match self.auth_events.try_recv() {
        Ok(AuthEvent::Unauthorized) => {
          self.set_status(
            "Session expired. Set LENSDESK_API_TOKEN and restart to sign in again.".to_string(),
            true,
          );
        }
        Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => {}
        Err(_) => break,
      }
    }

    // Back/forward may have crossed into another resource
    if let Some(resource) = resource_from_location(self.history.location()) {
      if resource != self.view.resource() {
        self.switch_resource(resource, false);
      }
    }

    self.view.tick(&self.history);
  }

  fn handle_key(&mut self, key: KeyEvent) {
    match self.prompt.handle_key(key) {
      KeyResult::Handled => return,
      KeyResult::Event(PromptEvent::Submitted(line)) => {
        self.execute(&line);
        return;
      }
      KeyResult::Event(PromptEvent::Cancelled) => return,
      KeyResult::NotHandled => {}
    }

    if self.view.handle_key(key) {
      return;
    }

    match key.code {
      KeyCode::Char('q') => self.should_quit = true,
      KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.should_quit = true;
      }
      KeyCode::Char('[') => {
        if !self.history.back() {
          self.set_status("Already at the oldest location".to_string(), false);
        }
      }
      KeyCode::Char(']') => {
        if !self.history.forward() {
          self.set_status("Already at the newest location".to_string(), false);
        }
      }
      KeyCode::Esc => self.status = None,
      _ => {}
    }
  }

  fn execute(&mut self, line: &str) {
    let command = match commands::parse_command(line) {
      Ok(command) => command,
      Err(message) => {
        self.set_status(message, true);
        return;
      }
    };

    match command {
      PromptCommand::Set { key, value } => self.apply_filter(&key, Some(&value)),
      PromptCommand::Clear(key) => self.apply_filter(&key, None),
      PromptCommand::Reset => {
        self.view.reset_filters(&mut self.history);
      }
      PromptCommand::Page(page) => self.view.go_to_page(page),
      PromptCommand::Open(resource) => self.switch_resource(resource, true),
      PromptCommand::Lookups => self.load_lookups(),
      PromptCommand::Quit => self.should_quit = true,
    }
  }

  fn apply_filter(&mut self, key: &str, value: Option<&str>) {
    if let Err(e) = self.view.apply_filter(&mut self.history, key, value) {
      let keys = self.view.filters().keys().join(", ");
      self.set_status(format!("{} (filters: {})", e, keys), true);
    }
  }

  /// Replace the list view. `push` adds a history entry; otherwise the
  /// location already names the new resource.
  fn switch_resource(&mut self, resource: Resource, push: bool) {
    if push {
      if resource == self.view.resource() {
        return;
      }
      let next = resource_location(
        self.history.location(),
        resource,
        self.view.filters().keys(),
      );
      self.history.push(next);
    }

    self.view.unmount();
    self.view = ListView::new(resource, self.api.api().clone(), self.config.page_size);
    self.view.mount(&self.history);
    self.status = None;
  }

  fn load_lookups(&mut self) {
    let api = self.api.clone();
    let tx = self.event_tx.clone();
    self.set_status("Loading lookup lists...".to_string(), false);

    tokio::spawn(async move {
      let result = async {
        let shops = api.shops().await?;
        let products = api.products().await?;
        Ok::<_, color_eyre::Report>(format!(
          "{} shops ({}), {} products ({})",
          shops.data.len(),
          source_label(shops.source),
          products.data.len(),
          source_label(products.source),
        ))
      }
      .await
      .map_err(|e| format!("Failed to load lookups: {}", e));

      let _ = tx.send(Event::Lookups(result));
    });
  }

  fn set_status(&mut self, message: String, is_error: bool) {
    if is_error {
      warn!(%message, "Status error");
    }
    self.status = Some(StatusLine { message, is_error });
  }

  // Accessors for UI rendering
  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn location(&self) -> &Url {
    self.history.location()
  }

  pub fn view_mut(&mut self) -> &mut ListView {
    &mut self.view
  }

  pub fn prompt(&self) -> &Prompt {
    &self.prompt
  }

  pub fn status(&self) -> Option<&StatusLine> {
    self.status.as_ref()
  }
}

fn session_store(persist: bool) -> Box<dyn SessionStore> {
  if !persist {
    return Box::new(MemorySessionStore::new());
  }
  match SqliteSessionStore::open() {
    Ok(store) => Box::new(store),
    Err(e) => {
      warn!(error = %e, "Session store unavailable, keeping lookups in memory only");
      Box::new(MemorySessionStore::new())
    }
  }
}

fn source_label(source: CacheSource) -> &'static str {
  match source {
    CacheSource::Memory => "memory",
    CacheSource::Session => "session",
    CacheSource::Network => "network",
  }
}

/// Build the initial location. `start` is a query (`?a=b` or `a=b`) or a
/// path with optional query (`invoices?status=PAID`).
fn start_location(resource: Resource, start: Option<&str>) -> Result<Url> {
  let base = Url::parse(LOCATION_BASE).map_err(|e| eyre!("Invalid location base: {}", e))?;
  let start = start.map(str::trim).unwrap_or("");

  let relative = if start.is_empty() {
    resource.name().to_string()
  } else if let Some(query) = start.strip_prefix('?') {
    format!("{}?{}", resource.name(), query)
  } else if start.contains('=') && !start.contains('?') {
    format!("{}?{}", resource.name(), start)
  } else {
    start.trim_start_matches('/').to_string()
  };

  base
    .join(&relative)
    .map_err(|e| eyre!("Invalid start location '{}': {}", start, e))
}

/// Location of `resource`, keeping only the query keys the previous view
/// did not own.
fn resource_location(current: &Url, resource: Resource, previous_keys: &[String]) -> Url {
  let kept: Vec<(String, String)> = current
    .query_pairs()
    .filter(|(k, _)| !previous_keys.iter().any(|p| p == k))
    .map(|(k, v)| (k.into_owned(), v.into_owned()))
    .collect();

  let mut next = current.clone();
  next.set_path(resource.name());
  if kept.is_empty() {
    next.set_query(None);
  } else {
    next.query_pairs_mut().clear().extend_pairs(kept);
  }
  next
}

fn resource_from_location(url: &Url) -> Option<Resource> {
  url.path_segments()?.next()?.parse().ok()
}
