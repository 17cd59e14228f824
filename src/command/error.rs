//! Error types of the command interpreter

use thiserror::Error;

/// Failure of a single directive
///
/// These are reported to the operator and never abort the rest of a command line.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Value of side must be \"l\", \"left\" or \"r\", \"right\", got \"{0}\"")]
    InvalidSide(String),

    #[error("Unexpected argument \"{0}\"")]
    InvalidDirection(String),

    #[error("Missing value")]
    MissingValue,

    #[error("Unexpected stick value \"{0}\"")]
    InvalidValue(String),

    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),
}

/// Wiring-time failure of the sub-command registry
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Command {0} already registered.")]
    AlreadyRegistered(String),

    #[error("Command name \"{0}\" is reserved")]
    ReservedName(String),
}
