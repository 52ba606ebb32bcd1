use crate::ui::ensure_valid_selection;
use crate::ui::render::{cell_text, status_color, truncate};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use lensdesk::api::{ApiClient, Resource};
use lensdesk::list::{ListFetchController, ListParams, ListStatus};
use lensdesk::sync::{FilterState, History, QuerySync};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};
use serde_json::Value;

/// One paginated resource, its filters bound to the location query.
pub struct ListView {
  resource: Resource,
  filters: FilterState,
  sync: QuerySync,
  list: ListFetchController<Value>,
  table_state: TableState,
}

impl ListView {
  pub fn new(resource: Resource, api: ApiClient, page_size: u32) -> Self {
    let list = ListFetchController::new(page_size, move |params: ListParams| {
      let api = api.clone();
      async move {
        api
          .list::<Value>(resource, &params)
          .await
          .map_err(|e| e.to_string())
      }
    });
    Self::from_parts(resource, list)
  }

  fn from_parts(resource: Resource, list: ListFetchController<Value>) -> Self {
    let filters = FilterState::new(resource.filter_keys().iter().copied());
    let sync = QuerySync::for_state(&filters);
    Self {
      resource,
      filters,
      sync,
      list,
      table_state: TableState::default(),
    }
  }

  pub fn resource(&self) -> Resource {
    self.resource
  }

  pub fn filters(&self) -> &FilterState {
    &self.filters
  }

  /// Seed filters from the location and issue the first fetch.
  pub fn mount<H: History>(&mut self, history: &H) {
    self.sync.mount(history, &mut self.filters);
    self.list.mount(&self.filters);
  }

  pub fn unmount(&mut self) {
    self.list.unmount();
  }

  /// Pick up back/forward navigation and apply finished fetches.
  /// Returns whether anything visible changed.
  pub fn tick<H: History>(&mut self, history: &H) -> bool {
    let list = &mut self.list;
    let external = self
      .sync
      .sync_external(history, &mut self.filters, |filters| {
        list.set_filters(filters);
      });
    let polled = self.list.poll();
    external || polled
  }

  /// Set or clear (`None`) one filter. Errors on keys this list does not own.
  pub fn apply_filter<H: History>(
    &mut self,
    history: &mut H,
    key: &str,
    value: Option<&str>,
  ) -> Result<bool> {
    if !self.filters.set(key, value)? {
      return Ok(false);
    }
    self.commit_filters(history);
    Ok(true)
  }

  pub fn reset_filters<H: History>(&mut self, history: &mut H) -> bool {
    if !self.filters.reset() {
      return false;
    }
    self.commit_filters(history);
    true
  }

  fn commit_filters<H: History>(&mut self, history: &mut H) {
    self.sync.push_state(history, &self.filters);
    self.list.set_filters(&self.filters);
    self.table_state.select(None);
  }

  pub fn go_to_page(&mut self, page: u32) {
    self.list.go_to_page(page);
  }

  /// Returns true if the key was consumed
  pub fn handle_key(&mut self, key: KeyEvent) -> bool {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Char('n') | KeyCode::Right => {
        self.list.next_page();
      }
      KeyCode::Char('p') | KeyCode::Left => {
        self.list.prev_page();
      }
      KeyCode::Char('r') => self.list.refresh(),
      _ => return false,
    }
    true
  }

  fn title(&self) -> String {
    let page = match self.list.data().and_then(|d| d.pages()) {
      Some(pages) => format!("page {}/{}", self.list.page(), pages.max(1)),
      None => format!("page {}", self.list.page()),
    };
    let suffix = match self.list.status() {
      ListStatus::Loading => " (loading...)".to_string(),
      ListStatus::Error(_) => " (error, r to retry)".to_string(),
      _ => String::new(),
    };
    format!(
      " {} · {} · {} total{} ",
      self.resource.title(),
      page,
      self.list.total(),
      suffix
    )
  }

  pub fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(1), Constraint::Min(1)])
      .split(area);

    self.render_filters(frame, chunks[0]);
    self.render_table(frame, chunks[1]);
  }

  fn render_filters(&self, frame: &mut Frame, area: Rect) {
    let mut spans = vec![Span::styled(" filters ", Style::default().fg(Color::DarkGray))];
    for key in self.filters.keys() {
      match self.filters.get(key) {
        Some(value) => spans.push(Span::styled(
          format!("{}={} ", key, value),
          Style::default().fg(Color::Cyan),
        )),
        None => spans.push(Span::styled(
          format!("{} ", key),
          Style::default().fg(Color::DarkGray),
        )),
      }
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.list.items().len();
    ensure_valid_selection(&mut self.table_state, len);

    let status = self.list.status();
    let border = match status {
      ListStatus::Error(_) => Color::Red,
      _ => Color::Blue,
    };
    let block = Block::default()
      .title(self.title())
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(border));

    if len == 0 {
      let (content, color) = match status {
        ListStatus::Loading => (format!("Loading {}...", self.resource.name()), Color::DarkGray),
        ListStatus::Error(message) => (format!("{}\n\nPress r to retry.", message), Color::Red),
        _ => (
          format!("No {} match the current filters.", self.resource.name()),
          Color::DarkGray,
        ),
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(color));
      frame.render_widget(paragraph, area);
      return;
    }

    let columns = self.resource.columns();
    let header = Row::new(columns.iter().map(|(field, _)| Cell::from(*field)))
      .style(Style::default().fg(Color::Yellow).bold());

    let rows: Vec<Row> = self
      .list
      .items()
      .iter()
      .map(|item| {
        Row::new(columns.iter().map(|(field, width)| {
          let text = cell_text(item, field);
          let style = if field.eq_ignore_ascii_case("status") || field.ends_with("Status") {
            Style::default().fg(status_color(&text))
          } else {
            Style::default()
          };
          Cell::from(truncate(&text, *width)).style(style)
        }))
      })
      .collect();

    let widths: Vec<Constraint> = columns
      .iter()
      .map(|(_, width)| Constraint::Length(*width as u16))
      .collect();

    let table = Table::new(rows, widths)
      .header(header)
      .block(block)
      .row_highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut self.table_state);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use lensdesk::list::PageResult;
  use lensdesk::sync::MemoryHistory;
  use std::sync::{Arc, Mutex};
  use url::Url;

  fn recording_view(resource: Resource) -> (ListView, Arc<Mutex<Vec<ListParams>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let list = ListFetchController::new(10, move |params: ListParams| {
      log.lock().unwrap().push(params);
      async move { Ok::<_, String>(PageResult::empty()) }
    });
    (ListView::from_parts(resource, list), seen)
  }

  fn history(url: &str) -> MemoryHistory {
    MemoryHistory::new(Url::parse(url).unwrap())
  }

  #[tokio::test]
  async fn test_mount_seeds_filters_from_location() {
    let (mut view, seen) = recording_view(Resource::Distributions);
    let history = history("app://lensdesk/distributions?shopId=7&tab=open");

    view.mount(&history);

    assert_eq!(view.filters().get("shopId"), Some("7"));
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].page, 1);
    assert_eq!(seen[0].filters.get("shopId").map(String::as_str), Some("7"));
    assert!(!seen[0].filters.contains_key("tab"));
  }

  #[tokio::test]
  async fn test_apply_filter_replaces_location_and_refetches() {
    let (mut view, seen) = recording_view(Resource::Distributions);
    let mut history = history("app://lensdesk/distributions?shopId=7&tab=open");
    view.mount(&history);

    assert!(view
      .apply_filter(&mut history, "deliveryStatus", Some("DELIVERED"))
      .unwrap());

    assert_eq!(history.len(), 1);
    assert_eq!(
      history.location().query(),
      Some("tab=open&shopId=7&deliveryStatus=DELIVERED")
    );
    assert_eq!(seen.lock().unwrap().len(), 2);

    // Our own write is not an external change
    view.tick(&history);
    assert_eq!(seen.lock().unwrap().len(), 2);

    assert!(view
      .apply_filter(&mut history, "colour", Some("red"))
      .is_err());
  }

  #[tokio::test]
  async fn test_external_location_change_refetches_once() {
    let (mut view, seen) = recording_view(Resource::Invoices);
    let mut history = history("app://lensdesk/invoices");
    view.mount(&history);

    history.push(Url::parse("app://lensdesk/invoices?status=PAID").unwrap());
    assert!(view.tick(&history));
    view.tick(&history);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].page, 1);
    assert_eq!(seen[1].filters.get("status").map(String::as_str), Some("PAID"));
    assert_eq!(view.filters().get("status"), Some("PAID"));
  }

  #[tokio::test]
  async fn test_reset_clears_location_keys() {
    let (mut view, seen) = recording_view(Resource::Shops);
    let mut history = history("app://lensdesk/shops?search=centro&status=ACTIVE");
    view.mount(&history);

    assert!(view.reset_filters(&mut history));
    assert!(!view.reset_filters(&mut history));
    assert_eq!(history.location().query(), None);
    assert_eq!(seen.lock().unwrap().len(), 2);
  }
}
