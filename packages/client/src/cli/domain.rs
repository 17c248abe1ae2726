//! Pure decisions of the CLI: reconnection policy and command parsing.

use std::path::PathBuf;

use crate::error::{RestError, SessionError};

/// Errors a reconnect cannot fix
pub fn should_exit_immediately(error: &SessionError) -> bool {
    matches!(
        error,
        SessionError::NotMember(_) | SessionError::Rest(RestError::InvalidUrl(_))
    )
}

pub fn should_attempt_reconnect(
    error: &SessionError,
    current_attempt: u32,
    max_attempts: u32,
) -> bool {
    if should_exit_immediately(error) {
        return false;
    }
    current_attempt < max_attempts
}

/// One line typed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Text(String),
    Voice(PathBuf),
    Call,
    HangUp,
    LeaveServer,
    Help,
    Quit,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Self::Text(line.to_string());
        };
        let (name, argument) = match rest.split_once(char::is_whitespace) {
            Some((name, argument)) => (name, argument.trim()),
            None => (rest, ""),
        };
        match name {
            "voice" if !argument.is_empty() => Self::Voice(PathBuf::from(argument)),
            "call" => Self::Call,
            "hangup" => Self::HangUp,
            "leave-server" => Self::LeaveServer,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        }
    }
}
