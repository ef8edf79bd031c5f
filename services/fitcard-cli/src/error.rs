//! Command-line usage errors

use thiserror::Error;

pub const USAGE: &str = "\
usage: fitcard [--config <path>] <command>

commands:
  login <email> <password>
  register <name> <surname> <email> <password>
  logout
  status
  get <path>";

/// Errors from parsing the command line. Runtime failures go through anyhow.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("no command given\n\n{USAGE}")]
    MissingCommand,

    #[error("unknown command: {0}\n\n{USAGE}")]
    UnknownCommand(String),

    #[error("{command} takes {expected} argument(s), got {got}\n\n{USAGE}")]
    WrongArity {
        command: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("--config requires a path")]
    MissingConfigPath,

    #[error("unknown option: {0}")]
    UnknownOption(String),
}

/// Result alias using service Error
pub type Result<T> = std::result::Result<T, Error>;
