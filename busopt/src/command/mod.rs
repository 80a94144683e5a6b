//! Command sequences and their decomposition into transitions.
//!
//! A sequence is written as dash-separated tokens (`R-W-R-W`). Tokens are
//! trimmed and normalized to uppercase, so `r - w` and `R-W` are the same
//! sequence.
//!
//! # Example
//!
//! ```
//! use busopt::command::CommandSequence;
//!
//! let sequence: CommandSequence = "R-W-R".parse().unwrap();
//! let labels: Vec<String> = sequence.transitions().iter().map(|t| t.label()).collect();
//! assert_eq!(labels, vec!["R→W", "W→R"]);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{BusError, BusResult};

/// Separator between tokens in the textual form of a sequence.
pub const SEQUENCE_SEPARATOR: char = '-';

/// Arrow used when rendering a transition as `PREV→CURR`.
pub const TRANSITION_ARROW: &str = "→";

/// A single bus command token, stored in uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Command(String);

impl Command {
    /// Read command.
    pub const READ: &'static str = "R";
    /// Write command.
    pub const WRITE: &'static str = "W";

    /// Create a command from a raw token.
    ///
    /// Surrounding whitespace is trimmed and the token is uppercased.
    /// Fails with [`BusError::InvalidSequence`] when nothing is left.
    pub fn new(token: &str) -> BusResult<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(BusError::InvalidSequence(
                "command tokens must not be empty".to_string(),
            ));
        }
        Ok(Self(token.to_uppercase()))
    }

    /// The normalized token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An adjacent pair of commands and its position in the sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    /// 0-based position; transition `i` joins commands `i` and `i + 1`.
    pub index: usize,
    pub previous: Command,
    pub current: Command,
}

impl Transition {
    /// Human-readable `PREV→CURR` label.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&transition_label(&self.previous, &self.current))
    }
}

/// `PREV→CURR` label for a pair of commands.
pub fn transition_label(previous: &Command, current: &Command) -> String {
    format!("{}{}{}", previous, TRANSITION_ARROW, current)
}

/// Split an ordered list of commands into adjacent transitions.
///
/// Produces exactly `commands.len() - 1` transitions in sequence order.
/// Fails with [`BusError::InvalidSequence`] for fewer than two commands.
pub fn decompose(commands: &[Command]) -> BusResult<Vec<Transition>> {
    if commands.len() < 2 {
        return Err(BusError::InvalidSequence(format!(
            "sequence must contain at least two commands (e.g. R-W), got {}",
            commands.len()
        )));
    }

    Ok(commands
        .windows(2)
        .enumerate()
        .map(|(index, pair)| Transition {
            index,
            previous: pair[0].clone(),
            current: pair[1].clone(),
        })
        .collect())
}

/// A validated command sequence of at least two commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CommandSequence {
    commands: Vec<Command>,
}

impl CommandSequence {
    /// Build a sequence from raw tokens.
    pub fn from_tokens<I, S>(tokens: I) -> BusResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let commands = tokens
            .into_iter()
            .map(|token| Command::new(token.as_ref()))
            .collect::<BusResult<Vec<_>>>()?;

        if commands.len() < 2 {
            return Err(BusError::InvalidSequence(format!(
                "sequence must contain at least two commands (e.g. R-W), got {}",
                commands.len()
            )));
        }

        Ok(Self { commands })
    }

    /// The normalized commands in order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the sequence has no commands.
    ///
    /// Construction requires at least two commands, so this is false for
    /// every `CommandSequence`.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Adjacent transitions in sequence order.
    pub fn transitions(&self) -> Vec<Transition> {
        // Construction guarantees at least two commands.
        decompose(&self.commands).unwrap_or_default()
    }
}

impl FromStr for CommandSequence {
    type Err = BusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(BusError::InvalidSequence(
                "sequence is empty".to_string(),
            ));
        }
        Self::from_tokens(s.split(SEQUENCE_SEPARATOR))
    }
}

impl fmt::Display for CommandSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, command) in self.commands.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", SEQUENCE_SEPARATOR)?;
            }
            write!(f, "{}", command)?;
        }
        Ok(())
    }
}
