mod commands;
mod completion;
mod config;
mod error;
mod input;
mod launcher;
mod prompt;
mod redirection;
mod supervisor;
mod tokenize;

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use anyhow::Context;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::ShellConfig;
use crate::input::{Interactive, LineSource, Piped};
use crate::supervisor::Supervisor;

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = ShellConfig::from_args(argh::from_env());
    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("minish: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(mut config: ShellConfig) -> anyhow::Result<()> {
    let mut source: Box<dyn LineSource> = if io::stdin().is_terminal() {
        Box::new(
            Interactive::new(config.history_file.clone())
                .context("could not start the line editor")?,
        )
    } else {
        config = config.for_piped_input();
        Box::new(Piped::new(io::stdin(), true))
    };
    debug!(?config, "starting");

    let mut supervisor = Supervisor::new(config);
    supervisor.enter_start_dir();
    supervisor.run(source.as_mut())?;
    Ok(())
}
