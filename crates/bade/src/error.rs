use thiserror::Error;

use crate::tokenize::UnknownFlag;

/// Mistakes in how a program's command tree is declared.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("Command already exists: {0}")]
    DuplicateCommand(String),

    #[error("Cannot call `alias()` before defining a command")]
    AliasWithoutCommand,

    #[error("Cannot call `alias()` in \"single\" mode")]
    AliasInSingleMode,

    #[error("Disable \"single\" mode to add commands")]
    CommandInSingleMode,
}

/// Problems with the arguments a user typed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// No command (or default command) matches the positional words.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("No command specified.")]
    NoCommandSpecified,

    #[error(transparent)]
    UnknownFlag(#[from] UnknownFlag),

    /// Fewer positionals than the command's `<required>` placeholders.
    #[error("Insufficient arguments!")]
    InsufficientArguments { command: String },
}

impl ParseError {
    /// The `--help` invocation suggested alongside this error.
    pub fn help_target(&self, bin: &str) -> String {
        match self {
            Self::InsufficientArguments { command } if !command.is_empty() => {
                format!("{bin} {command}")
            }
            _ => bin.to_string(),
        }
    }
}
