use std::io;
use std::path::PathBuf;

use nix::errno::Errno;
use rustyline::error::ReadlineError;
use thiserror::Error;

/// A command line that cannot be turned into a runnable command.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("syntax error: expected a file name after `{operator}`")]
    MissingOperand { operator: String },
    #[error("syntax error: redirection without a command")]
    MissingCommand,
    #[error("argument contains a NUL byte: {0:?}")]
    InteriorNul(String),
    #[error("command line is not valid UTF-8: {0:?}")]
    InvalidUtf8(String),
}

#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("cd: HOME not set")]
    HomeNotSet,
    #[error("cd: {}: {source}", path.display())]
    ChangeDir { path: PathBuf, source: io::Error },
    #[error("fork: {0}")]
    Fork(Errno),
    #[error("wait: {0}")]
    Wait(Errno),
    #[error("input: {0}")]
    Readline(#[from] ReadlineError),
    #[error("input: {0}")]
    Read(#[from] io::Error),
}

impl ShellError {
    /// Fatal errors end the interpreter; everything else is reported and the loop goes on.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ShellError::Fork(_) | ShellError::Wait(_) | ShellError::Readline(_) | ShellError::Read(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(ShellError::Fork(Errno::EAGAIN).is_fatal());
        assert!(ShellError::Wait(Errno::ECHILD).is_fatal());
        assert!(!ShellError::HomeNotSet.is_fatal());
        assert!(!ShellError::from(ParseError::MissingCommand).is_fatal());
        assert!(!ShellError::from(ParseError::InvalidUtf8("caf\u{fffd}".into())).is_fatal());
    }

    #[test]
    fn test_missing_operand_message() {
        let err = ParseError::MissingOperand { operator: ">>".to_string() };
        assert_eq!(err.to_string(), "syntax error: expected a file name after `>>`");
    }
}
