/// Available commands and autocomplete logic

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
  /// Reset the stack to the record list and reload it
  Records,
  /// Open the editor on a blank record
  New,
  Quit,
}

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  pub kind: CommandKind,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "records",
    aliases: &["r", "list", "ls"],
    description: "Back to the record list",
    kind: CommandKind::Records,
  },
  Command {
    name: "new",
    aliases: &["n", "create"],
    description: "Create a record",
    kind: CommandKind::New,
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit oatrack",
    kind: CommandKind::Quit,
  },
];

/// Resolve typed input to a command by exact name or alias.
pub fn lookup(input: &str) -> Option<&'static Command> {
  let input = input.trim().to_lowercase();
  COMMANDS
    .iter()
    .find(|cmd| cmd.name == input || cmd.aliases.contains(&input.as_str()))
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.trim().to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| {
      let priority = if cmd.name == input_lower {
        0
      } else if cmd.aliases.contains(&input_lower.as_str()) {
        1
      } else if cmd.name.starts_with(&input_lower) {
        2
      } else if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
        3
      } else if cmd.name.contains(&input_lower) {
        4
      } else if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
        5
      } else {
        return None;
      };
      Some((cmd, priority))
    })
    .collect();

  // Stable: ties keep declaration order
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
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
    let suggestions = get_suggestions("new");
    assert_eq!(suggestions[0].kind, CommandKind::New);
  }

  #[test]
  fn test_alias_match() {
    let suggestions = get_suggestions("q");
    assert_eq!(suggestions[0].kind, CommandKind::Quit);
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("rec");
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].kind, CommandKind::Records);
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("cord");
    assert_eq!(suggestions[0].kind, CommandKind::Records);
  }

  #[test]
  fn test_no_match() {
    assert!(get_suggestions("zzz").is_empty());
  }

  #[test]
  fn test_lookup() {
    assert_eq!(lookup(" LS ").map(|c| c.kind), Some(CommandKind::Records));
    assert_eq!(lookup("create").map(|c| c.kind), Some(CommandKind::New));
    assert!(lookup("rec").is_none());
  }
}
