mod list_view;
mod prompt;
mod render;

pub use list_view::ListView;
pub use prompt::{Prompt, PromptEvent};
pub use render::extract_domain;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::{Paragraph, TableState};

/// Generic result type for component key handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Key was consumed, no event for parent to handle
  Handled,
  /// Key was consumed, here's an event for parent to process
  Event(T),
  /// Key was not consumed, parent should try next handler
  NotHandled,
}

/// Keep the selection inside the current rows.
pub fn ensure_valid_selection(state: &mut TableState, len: usize) {
  if len == 0 {
    state.select(None);
    return;
  }
  match state.selected() {
    None => state.select(Some(0)),
    Some(i) if i >= len => state.select(Some(len - 1)),
    Some(_) => {}
  }
}

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(3),    // List
      Constraint::Length(1), // Status line
      Constraint::Length(1), // Key hints
    ])
    .split(frame.area());

  let location = app.location().to_string();
  render::draw_header(frame, chunks[0], app.title(), &location);

  app.view_mut().render(frame, chunks[1]);
  app.prompt().render_overlay(frame, chunks[1]);

  if let Some(status) = app.status() {
    let color = if status.is_error {
      Color::Red
    } else {
      Color::Green
    };
    let paragraph =
      Paragraph::new(format!(" {}", status.message)).style(Style::default().fg(color));
    frame.render_widget(paragraph, chunks[2]);
  }

  render::draw_footer(frame, chunks[3]);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_selection_clamped_to_rows() {
    let mut state = TableState::default();
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(0));

    state.select(Some(7));
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(2));

    ensure_valid_selection(&mut state, 0);
    assert_eq!(state.selected(), None);
  }
}
