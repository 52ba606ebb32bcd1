/// Prompt commands and autocomplete logic
use lensdesk::api::Resource;

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub usage: &'static str,
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "set",
    aliases: &["s", "filter"],
    usage: "set <key> <value>",
    description: "Set a filter",
  },
  Command {
    name: "clear",
    aliases: &["c", "unset"],
    usage: "clear <key>",
    description: "Remove a filter",
  },
  Command {
    name: "reset",
    aliases: &["x"],
    usage: "reset",
    description: "Remove all filters",
  },
  Command {
    name: "page",
    aliases: &["pg", "goto"],
    usage: "page <n>",
    description: "Jump to a page",
  },
  Command {
    name: "distributions",
    aliases: &["d", "dist"],
    usage: "distributions",
    description: "Browse distributions",
  },
  Command {
    name: "invoices",
    aliases: &["i", "inv"],
    usage: "invoices",
    description: "Browse invoices",
  },
  Command {
    name: "shops",
    aliases: &["shop"],
    usage: "shops",
    description: "Browse shops",
  },
  Command {
    name: "products",
    aliases: &["prod", "product"],
    usage: "products",
    description: "Browse products",
  },
  Command {
    name: "lookups",
    aliases: &["l", "meta"],
    usage: "lookups",
    description: "Load shop and product lookup lists",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    usage: "quit",
    description: "Exit lensdesk",
  },
];

/// A parsed prompt line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptCommand {
  Set { key: String, value: String },
  Clear(String),
  Reset,
  Page(u32),
  Open(Resource),
  Lookups,
  Quit,
}

/// Split a prompt line into the command word and its (trimmed) arguments.
fn split_head(line: &str) -> (&str, &str) {
  let line = line.trim_start();
  match line.split_once(char::is_whitespace) {
    Some((head, rest)) => (head, rest.trim()),
    None => (line.trim_end(), ""),
  }
}

/// Get autocomplete suggestions for the command word of the input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let (head, _) = split_head(input);
  let input_lower = head.to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    if cmd.name == input_lower {
      matches.push((cmd, 0));
      continue;
    }

    if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
      continue;
    }

    if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
      continue;
    }

    if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
      continue;
    }

    // Fuzzy (contains)
    if cmd.name.contains(&input_lower) {
      matches.push((cmd, 4));
      continue;
    }

    if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      matches.push((cmd, 5));
    }
  }

  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Replace the command word with the selected suggestion, keeping arguments.
pub fn resolve(input: &str, selected: usize) -> String {
  let (head, args) = split_head(input);
  if head.is_empty() {
    return String::new();
  }
  let name = match get_suggestions(input).get(selected) {
    Some(cmd) => cmd.name.to_string(),
    None => head.to_lowercase(),
  };

  if args.is_empty() {
    name
  } else {
    format!("{} {}", name, args)
  }
}

fn find_command(word: &str) -> Option<&'static Command> {
  let word = word.to_lowercase();
  COMMANDS
    .iter()
    .find(|c| c.name == word || c.aliases.contains(&word.as_str()))
}

/// Parse a prompt line. The error is a message for the status line.
pub fn parse_command(line: &str) -> Result<PromptCommand, String> {
  let (head, args) = split_head(line);
  if head.is_empty() {
    return Err("Empty command".to_string());
  }
  let cmd = find_command(head).ok_or_else(|| format!("Unknown command '{}'", head))?;
  let usage = || format!("Usage: {}", cmd.usage);

  match cmd.name {
    "set" => {
      let (key, value) = args.split_once(char::is_whitespace).ok_or_else(usage)?;
      let value = value.trim();
      if value.is_empty() {
        return Err(usage());
      }
      Ok(PromptCommand::Set {
        key: key.to_string(),
        value: value.to_string(),
      })
    }
    "clear" => {
      if args.is_empty() || args.contains(char::is_whitespace) {
        return Err(usage());
      }
      Ok(PromptCommand::Clear(args.to_string()))
    }
    "reset" => Ok(PromptCommand::Reset),
    "page" => {
      let page: u32 = args.parse().map_err(|_| usage())?;
      if page == 0 {
        return Err("Pages start at 1".to_string());
      }
      Ok(PromptCommand::Page(page))
    }
    "lookups" => Ok(PromptCommand::Lookups),
    "quit" => Ok(PromptCommand::Quit),
    name => name
      .parse::<Resource>()
      .map(PromptCommand::Open)
      .map_err(|e| e.to_string()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("invoices");
    assert_eq!(suggestions[0].name, "invoices");
  }

  #[test]
  fn test_alias_beats_prefix() {
    // "s" is an alias of set and a prefix of shops
    let suggestions = get_suggestions("s");
    assert_eq!(suggestions[0].name, "set");
    assert!(suggestions.iter().any(|c| c.name == "shops"));
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("distr");
    assert_eq!(suggestions[0].name, "distributions");
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("ookup");
    assert_eq!(suggestions[0].name, "lookups");
  }

  #[test]
  fn test_suggestions_ignore_arguments() {
    let suggestions = get_suggestions("set search blue frames");
    assert_eq!(suggestions[0].name, "set");
  }

  #[test]
  fn test_resolve_keeps_arguments() {
    assert_eq!(resolve("se search  blue", 0), "set search  blue");
    assert_eq!(resolve("inv", 0), "invoices");
    assert_eq!(resolve("zzz 3", 0), "zzz 3");
  }

  #[test]
  fn test_parse_set_keeps_spaces_in_value() {
    assert_eq!(
      parse_command("set search blue frames"),
      Ok(PromptCommand::Set {
        key: "search".to_string(),
        value: "blue frames".to_string()
      })
    );
  }

  #[test]
  fn test_parse_set_requires_value() {
    assert!(parse_command("set search").is_err());
    assert!(parse_command("set").is_err());
  }

  #[test]
  fn test_parse_simple_commands() {
    assert_eq!(
      parse_command("clear shopId"),
      Ok(PromptCommand::Clear("shopId".to_string()))
    );
    assert_eq!(parse_command("reset"), Ok(PromptCommand::Reset));
    assert_eq!(parse_command("page 3"), Ok(PromptCommand::Page(3)));
    assert_eq!(parse_command("l"), Ok(PromptCommand::Lookups));
    assert_eq!(parse_command("q"), Ok(PromptCommand::Quit));
  }

  #[test]
  fn test_parse_resource() {
    assert_eq!(
      parse_command("dist"),
      Ok(PromptCommand::Open(Resource::Distributions))
    );
    assert_eq!(
      parse_command("shops"),
      Ok(PromptCommand::Open(Resource::Shops))
    );
  }

  #[test]
  fn test_parse_rejects_bad_input() {
    assert!(parse_command("page 0").is_err());
    assert!(parse_command("page two").is_err());
    assert!(parse_command("launch").is_err());
    assert!(parse_command("   ").is_err());
  }
}
