use std::borrow::Cow;
use std::path::PathBuf;

use crate::error::ParseError;

/// How an output target is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// `>`: create, or truncate an existing file.
    Truncate,
    /// `>>`: create, or append to an existing file.
    Append,
}

/// Represents an output redirection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub file: PathBuf,
    pub mode: WriteMode,
}

/// Where the child's standard streams come from. `None` means "not redirected".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectionPlan {
    pub input: Option<PathBuf>,
    pub output: Option<Redirection>,
}

/// A parsed command with arguments and redirections.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedCommand {
    pub args: Vec<String>,
    pub plan: RedirectionPlan,
}

impl ParsedCommand {
    pub fn program(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

/// Parses tokens into a ParsedCommand, extracting redirection operators.
///
/// Operators may appear anywhere on the line. When one direction is redirected more than
/// once, the last operator wins.
pub fn parse_command(tokens: Vec<Cow<'_, str>>) -> Result<ParsedCommand, ParseError> {
    let mut args = Vec::with_capacity(tokens.len());
    let mut plan = RedirectionPlan::default();
    let mut tokens = tokens.into_iter();

    while let Some(token) = tokens.next() {
        let mode = match &*token {
            "<" => None,
            ">" => Some(WriteMode::Truncate),
            ">>" => Some(WriteMode::Append),
            _ => {
                args.push(token.into_owned());
                continue;
            }
        };

        let file = tokens.next().ok_or_else(|| ParseError::MissingOperand {
            operator: token.to_string(),
        })?;
        let file = PathBuf::from(file.into_owned());

        match mode {
            None => plan.input = Some(file),
            Some(mode) => plan.output = Some(Redirection { file, mode }),
        }
    }

    Ok(ParsedCommand { args, plan })
}
