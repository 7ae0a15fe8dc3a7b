use std::str::FromStr;

use crate::persistence::AUTOSAVE_NAME;
use crate::world::Direction;

/// Save slot used by `save` and `load` when no name is given.
pub const DEFAULT_SLOT: &str = "quicksave";

/// One line of player input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Move(Direction),
    Sow(Direction),
    Reap(Direction),
    NextTurn,
    Undo,
    Redo,
    Debug,
    Save(String),
    Load(String),
    Help,
    Quit,
}

impl Command {
    /// Commands still accepted once the game has been won.
    pub fn allowed_after_victory(&self) -> bool {
        matches!(
            self,
            Command::Debug | Command::Save(_) | Command::Load(_) | Command::Help | Command::Quit
        )
    }

    /// Commands that change the game state and trigger an autosave on success.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Command::Move(_)
                | Command::Sow(_)
                | Command::Reap(_)
                | Command::NextTurn
                | Command::Undo
                | Command::Redo
        )
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err("Empty command. Type 'help' for a list of commands".to_string());
        };
        let arg = words.next();
        if words.next().is_some() {
            return Err(format!("Too many arguments in '{}'", line.trim()));
        }

        let head = head.to_ascii_lowercase();
        let command = match (head.as_str(), arg) {
            ("w", None) => Command::Move(Direction::Up),
            ("s", None) => Command::Move(Direction::Down),
            ("a", None) => Command::Move(Direction::Left),
            ("d", None) => Command::Move(Direction::Right),
            ("sow", Some(dir)) => Command::Sow(dir.parse()?),
            ("reap", Some(dir)) => Command::Reap(dir.parse()?),
            ("sow" | "reap", None) => {
                return Err(format!(
                    "'{}' needs a direction. Example: {} up",
                    head, head
                ));
            }
            ("n" | "next", None) => Command::NextTurn,
            ("undo", None) => Command::Undo,
            ("redo", None) => Command::Redo,
            ("debug", None) => Command::Debug,
            ("save", name) => Command::Save(slot_name(name)?),
            ("load", name) => Command::Load(name.unwrap_or(DEFAULT_SLOT).to_string()),
            ("help" | "h" | "?", None) => Command::Help,
            ("q" | "quit" | "exit", None) => Command::Quit,
            _ => {
                return Err(format!(
                    "Unknown command '{}'. Type 'help' for a list of commands",
                    line.trim()
                ));
            }
        };
        Ok(command)
    }
}

fn slot_name(name: Option<&str>) -> Result<String, String> {
    match name {
        Some(n) if n.eq_ignore_ascii_case(AUTOSAVE_NAME) => {
            Err(format!("'{}' is reserved for the automatic save", AUTOSAVE_NAME))
        }
        Some(n) => Ok(n.to_string()),
        None => Ok(DEFAULT_SLOT.to_string()),
    }
}

pub const HELP: &str = "\
Commands:
  w / a / s / d       move up / left / down / right
  sow <direction>     plant a random available crop next to you
  reap <direction>    harvest the plant next to you
  n                   advance to the next turn
  undo / redo         step through history
  debug               toggle growth, sun and moisture display
  save [name]         save the game (default: quicksave)
  load [name]         load a saved game (default: quicksave)
  help                show this list
  q                   quit
Directions: up, down, left, right
Legend: W wheat, C corn, R rice, P player, . empty";

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Result<Command, String> {
        s.parse()
    }

    #[test]
    fn movement_keys() {
        assert_eq!(parse("w"), Ok(Command::Move(Direction::Up)));
        assert_eq!(parse("A"), Ok(Command::Move(Direction::Left)));
        assert_eq!(parse(" s "), Ok(Command::Move(Direction::Down)));
        assert_eq!(parse("d"), Ok(Command::Move(Direction::Right)));
    }

    #[test]
    fn sow_and_reap_take_a_direction() {
        assert_eq!(parse("sow up"), Ok(Command::Sow(Direction::Up)));
        assert_eq!(parse("REAP Left"), Ok(Command::Reap(Direction::Left)));
        assert!(parse("sow").unwrap_err().contains("needs a direction"));
        assert!(parse("reap sideways").unwrap_err().contains("Invalid direction"));
        assert!(parse("sow up now").unwrap_err().contains("Too many"));
    }

    #[test]
    fn simple_commands() {
        assert_eq!(parse("n"), Ok(Command::NextTurn));
        assert_eq!(parse("undo"), Ok(Command::Undo));
        assert_eq!(parse("redo"), Ok(Command::Redo));
        assert_eq!(parse("debug"), Ok(Command::Debug));
        assert_eq!(parse("help"), Ok(Command::Help));
        assert_eq!(parse("q"), Ok(Command::Quit));
        assert!(parse("undo 2").is_err());
    }

    #[test]
    fn save_and_load_slots() {
        assert_eq!(parse("save"), Ok(Command::Save(DEFAULT_SLOT.to_string())));
        assert_eq!(parse("save farm1"), Ok(Command::Save("farm1".to_string())));
        assert!(parse("save autosave").is_err());
        assert_eq!(parse("load autosave"), Ok(Command::Load("autosave".to_string())));
        assert_eq!(parse("load"), Ok(Command::Load(DEFAULT_SLOT.to_string())));
    }

    #[test]
    fn unknown_and_empty_input() {
        assert!(parse("").unwrap_err().contains("Empty"));
        assert!(parse("plough").unwrap_err().contains("Unknown command 'plough'"));
    }

    #[test]
    fn victory_gate() {
        assert!(Command::Debug.allowed_after_victory());
        assert!(Command::Save("x".into()).allowed_after_victory());
        assert!(!Command::Undo.allowed_after_victory());
        assert!(!Command::Move(Direction::Up).allowed_after_victory());
        assert!(Command::Redo.is_mutating());
        assert!(!Command::Debug.is_mutating());
    }
}
