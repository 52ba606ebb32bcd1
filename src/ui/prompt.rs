use super::KeyResult;
use crate::commands::{self, Command};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

/// Events emitted by the prompt that the app needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptEvent {
  /// Line submitted, command word already resolved against suggestions
  Submitted(String),
  Cancelled,
}

/// `:` command prompt with autocomplete on the command word
#[derive(Debug, Clone, Default)]
pub struct Prompt {
  buffer: String,
  /// Byte offset, always on a char boundary
  cursor: usize,
  active: bool,
  selected_suggestion: usize,
}

impl Prompt {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn value(&self) -> &str {
    &self.buffer
  }

  pub fn activate(&mut self) {
    self.active = true;
    self.clear();
  }

  fn clear(&mut self) {
    self.buffer.clear();
    self.cursor = 0;
    self.selected_suggestion = 0;
  }

  pub fn suggestions(&self) -> Vec<&'static Command> {
    commands::get_suggestions(&self.buffer)
  }

  /// Handle a key event.
  /// Call this regardless of active state; it handles activation too.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<PromptEvent> {
    if !self.active {
      if key.code == KeyCode::Char(':') {
        self.activate();
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc => {
        self.active = false;
        self.clear();
        return KeyResult::Event(PromptEvent::Cancelled);
      }
      KeyCode::Enter => {
        let line = commands::resolve(&self.buffer, self.selected_suggestion);
        self.active = false;
        self.clear();
        return KeyResult::Event(PromptEvent::Submitted(line));
      }
      KeyCode::Tab | KeyCode::Down => {
        let count = self.suggestions().len();
        if count > 0 {
          self.selected_suggestion = (self.selected_suggestion + 1) % count;
        }
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        let count = self.suggestions().len();
        if count > 0 {
          self.selected_suggestion = if self.selected_suggestion == 0 {
            count - 1
          } else {
            self.selected_suggestion - 1
          };
        }
        return KeyResult::Handled;
      }
      KeyCode::Left => {
        if let Some(c) = self.buffer[..self.cursor].chars().next_back() {
          self.cursor -= c.len_utf8();
        }
        return KeyResult::Handled;
      }
      KeyCode::Right => {
        if let Some(c) = self.buffer[self.cursor..].chars().next() {
          self.cursor += c.len_utf8();
        }
        return KeyResult::Handled;
      }
      _ => {}
    }

    // Everything below edits the text
    match key.code {
      KeyCode::Backspace => {
        if let Some(c) = self.buffer[..self.cursor].chars().next_back() {
          self.cursor -= c.len_utf8();
          self.buffer.remove(self.cursor);
        }
      }
      KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.buffer = self.buffer[self.cursor..].to_string();
        self.cursor = 0;
      }
      KeyCode::Char(c) => {
        self.buffer.insert(self.cursor, c);
        self.cursor += c.len_utf8();
      }
      _ => return KeyResult::Handled,
    }
    self.selected_suggestion = 0;
    KeyResult::Handled
  }

  /// Render the prompt overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let suggestions = self.suggestions();

    let width = (area.width * 60 / 100).clamp(30, 64).min(area.width);
    let suggestion_count = suggestions.len().min(8);
    let height = (3 + suggestion_count as u16).min(area.height);

    let overlay_area = Rect::new(area.x + 1, area.y + 1, width, height).intersection(area);
    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Command ");

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(1), Constraint::Min(0)])
      .split(inner);

    let (before, after) = self.buffer.split_at(self.cursor);
    let mut rest = after.chars();
    let under_cursor = rest.next().map(String::from).unwrap_or_else(|| " ".to_string());
    let input_line = Line::from(vec![
      Span::styled(":", Style::default().fg(Color::Yellow)),
      Span::raw(before),
      Span::styled(under_cursor, Style::default().add_modifier(Modifier::REVERSED)),
      Span::raw(rest.as_str()),
    ]);
    frame.render_widget(Paragraph::new(input_line), chunks[0]);

    if !suggestions.is_empty() && chunks[1].height > 0 {
      let items: Vec<ListItem> = suggestions
        .iter()
        .take(8)
        .map(|cmd| {
          ListItem::new(Line::from(vec![
            Span::styled(format!("{:<22}", cmd.usage), Style::default().fg(Color::Cyan)),
            Span::styled(cmd.description, Style::default().fg(Color::DarkGray)),
          ]))
        })
        .collect();

      let list =
        List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

      let mut state = ListState::default();
      state.select(Some(self.selected_suggestion));

      frame.render_stateful_widget(list, chunks[1], &mut state);
    }
  }
}
