use chrono::DateTime;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use serde_json::Value;

/// Truncate to `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Display text for one field of a list row.
pub fn cell_text(item: &Value, field: &str) -> String {
  match item.get(field) {
    None | Some(Value::Null) => "-".to_string(),
    Some(Value::String(s)) => match DateTime::parse_from_rfc3339(s) {
      Ok(ts) => ts.format("%Y-%m-%d %H:%M").to_string(),
      Err(_) => s.clone(),
    },
    Some(Value::Bool(b)) => (if *b { "yes" } else { "no" }).to_string(),
    Some(Value::Number(n)) => n.to_string(),
    Some(Value::Array(items)) => format!("[{}]", items.len()),
    // Populated references ({ _id, name, ... })
    Some(obj @ Value::Object(_)) => obj
      .get("name")
      .and_then(Value::as_str)
      .map(str::to_string)
      .unwrap_or_else(|| obj.to_string()),
  }
}

/// Colour for status-like cell values
pub fn status_color(value: &str) -> Color {
  match value {
    "DELIVERED" | "PAID" | "ACTIVE" => Color::Green,
    "PENDING" | "IN_TRANSIT" | "PARTIALLY_PAID" => Color::Yellow,
    "CANCELLED" | "OVERDUE" | "INACTIVE" => Color::Red,
    _ => Color::White,
  }
}

/// Draw the header bar with name, API host, and current location
pub fn draw_header(frame: &mut Frame, area: Rect, title: &str, location: &str) {
  let header = Line::from(vec![
    Span::styled(" lensdesk ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", title), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", location), Style::default().fg(Color::Yellow)),
  ]);

  let paragraph = Paragraph::new(header).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

/// Draw the key hints line
pub fn draw_footer(frame: &mut Frame, area: Rect) {
  let hints = [
    (":", "command"),
    ("j/k", "move"),
    ("n/p", "page"),
    ("r", "refresh"),
    ("[/]", "back/forward"),
    ("q", "quit"),
  ];

  let mut spans = vec![Span::raw(" ")];
  for (key, label) in hints {
    spans.push(Span::styled(format!("<{}>", key), Style::default().fg(Color::Cyan)));
    spans.push(Span::styled(format!(" {}   ", label), Style::default().fg(Color::DarkGray)));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

/// Extract host from an API URL
pub fn extract_domain(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_truncate() {
    assert_eq!(truncate("hello", 5), "hello");
    assert_eq!(truncate("hello world", 8), "hello...");
    assert_eq!(truncate("lentes ópticas", 9), "lentes...");
  }

  #[test]
  fn test_cell_text_scalars() {
    let item = json!({
      "name": "Centro",
      "quantity": 12,
      "active": true,
      "notes": null,
    });
    assert_eq!(cell_text(&item, "name"), "Centro");
    assert_eq!(cell_text(&item, "quantity"), "12");
    assert_eq!(cell_text(&item, "active"), "yes");
    assert_eq!(cell_text(&item, "notes"), "-");
    assert_eq!(cell_text(&item, "missing"), "-");
  }

  #[test]
  fn test_cell_text_dates_and_references() {
    let item = json!({
      "createdAt": "2024-05-01T10:30:00.000Z",
      "shop": { "_id": "s1", "name": "Main Street" },
      "lines": [1, 2, 3],
    });
    assert_eq!(cell_text(&item, "createdAt"), "2024-05-01 10:30");
    assert_eq!(cell_text(&item, "shop"), "Main Street");
    assert_eq!(cell_text(&item, "lines"), "[3]");
  }

  #[test]
  fn test_status_color() {
    assert_eq!(status_color("DELIVERED"), Color::Green);
    assert_eq!(status_color("PENDING"), Color::Yellow);
    assert_eq!(status_color("CANCELLED"), Color::Red);
    assert_eq!(status_color("Centro"), Color::White);
  }

  #[test]
  fn test_extract_domain() {
    assert_eq!(
      extract_domain("https://api.lensdesk.example/v1"),
      "api.lensdesk.example"
    );
    assert_eq!(extract_domain("http://localhost:4000/api"), "localhost:4000");
  }
}
