//! Parent-side control flow: built-in dispatch, spawning, and waiting.

use std::env;
use std::path::PathBuf;

use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{fork, ForkResult, Pid};
use tracing::{debug, error, trace, warn};

use crate::commands::{self, Builtin};
use crate::config::ShellConfig;
use crate::error::ShellError;
use crate::input::LineSource;
use crate::launcher::PreparedCommand;
use crate::prompt;
use crate::redirection::parse_command;
use crate::tokenize::tokenize;

/// What the prompt loop does after a line has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Supervisor {
    config: ShellConfig,
}

impl Supervisor {
    pub fn new(config: ShellConfig) -> Self {
        Self { config }
    }

    /// Moves to the home directory if configured to; failure is reported, not fatal.
    pub fn enter_start_dir(&self) {
        if !self.config.start_in_home {
            return;
        }
        if let Err(err) = commands::change_dir(None, self.config.home.as_deref()) {
            warn!(%err, "staying in the current directory");
        }
    }

    /// Runs the prompt loop until `exit`, end of input, or a fatal error.
    pub fn run(&mut self, source: &mut dyn LineSource) -> Result<(), ShellError> {
        loop {
            let line = match source.next_line(&self.prompt()) {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("end of input");
                    return Ok(());
                }
                Err(err) if err.is_fatal() => {
                    error!(%err, "giving up");
                    return Err(err);
                }
                Err(err) => {
                    debug!(%err, "line rejected");
                    eprintln!("minish: {}", err);
                    continue;
                }
            };
            match self.execute_line(&line) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => return Ok(()),
                Err(err) if err.is_fatal() => {
                    error!(%err, "giving up");
                    return Err(err);
                }
                Err(err) => {
                    debug!(%err, line = %line, "command rejected");
                    eprintln!("minish: {}", err);
                }
            }
        }
    }

    /// Handles one command line: a built-in runs here, anything else in a child process.
    pub fn execute_line(&mut self, line: &str) -> Result<Flow, ShellError> {
        let tokens = tokenize(line, self.config.home_str());
        if tokens.is_empty() {
            return Ok(Flow::Continue);
        }
        let parsed = parse_command(tokens)?;

        match parsed.program().and_then(Builtin::lookup) {
            Some(Builtin::Exit) => {
                debug!("exit requested");
                Ok(Flow::Exit)
            }
            Some(Builtin::Cd) => {
                let target = parsed.args.get(1).map(String::as_str);
                let dir = commands::change_dir(target, self.config.home.as_deref())?;
                debug!(dir = %dir.display(), "changed directory");
                Ok(Flow::Continue)
            }
            None => {
                let command = PreparedCommand::new(&parsed, self.config.stdio)?;
                let status = spawn_and_wait(&command)?;
                debug!(?status, "child finished");
                Ok(Flow::Continue)
            }
        }
    }

    fn prompt(&self) -> String {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("?"));
        prompt::render(&self.config.prompt_label, &cwd, self.config.home.as_deref())
    }
}

/// Forks, runs `command` in the child, and blocks until that child terminates.
///
/// The exit status is returned for logging only; a failing program is not an error here.
pub fn spawn_and_wait(command: &PreparedCommand) -> Result<WaitStatus, ShellError> {
    // SAFETY: the child only opens, duplicates and closes descriptors before exec or _exit.
    match unsafe { fork() }.map_err(ShellError::Fork)? {
        ForkResult::Child => command.exec(),
        ForkResult::Parent { child } => {
            debug!(pid = %child, program = ?command.program(), "spawned");
            wait_for(child)
        }
    }
}

fn wait_for(child: Pid) -> Result<WaitStatus, ShellError> {
    loop {
        match waitpid(child, None) {
            Ok(status @ (WaitStatus::Exited(..) | WaitStatus::Signaled(..))) => return Ok(status),
            Ok(status) => trace!(?status, "child not finished yet"),
            Err(Errno::EINTR) => continue,
            Err(errno) => return Err(ShellError::Wait(errno)),
        }
    }
}
