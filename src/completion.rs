use rustyline::completion::{Completer, FilenameCompleter, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::Helper;
use std::env;
use std::os::unix::fs::PermissionsExt;

use crate::commands::BUILTINS;

/// Shell completer for tab completion.
pub struct ShellCompleter {
    filename_completer: FilenameCompleter,
}

impl ShellCompleter {
    pub fn new() -> Self {
        Self {
            filename_completer: FilenameCompleter::new(),
        }
    }
}

impl Completer for ShellCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &rustyline::Context<'_>,
    ) -> Result<(usize, Vec<Self::Candidate>), ReadlineError> {
        let (start, word) = extract_word(line, pos);
        if line[..start].trim_matches(' ').is_empty() {
            Ok((start, program_candidates(word)))
        } else {
            self.filename_completer.complete(line, pos, ctx)
        }
    }
}

/// Builtins and executables on PATH that start with `word`.
fn program_candidates(word: &str) -> Vec<Pair> {
    let mut names: Vec<String> = BUILTINS
        .iter()
        .filter(|builtin| builtin.starts_with(word))
        .map(|builtin| builtin.to_string())
        .collect();

    if let Some(path) = env::var_os("PATH") {
        for dir in env::split_paths(&path) {
            let Ok(entries) = std::fs::read_dir(dir) else {
                continue;
            };
            names.extend(
                entries
                    .flatten()
                    .filter(|entry| {
                        std::fs::metadata(entry.path())
                            .is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
                    })
                    .filter_map(|entry| entry.file_name().into_string().ok())
                    .filter(|name| name.starts_with(word)),
            );
        }
    }

    names.sort();
    names.dedup();
    names
        .into_iter()
        .map(|name| Pair {
            replacement: format!("{} ", name),
            display: name,
        })
        .collect()
}

fn extract_word(line: &str, pos: usize) -> (usize, &str) {
    let before = &line[..pos];
    let start = before.rfind(' ').map_or(0, |i| i + 1);
    (start, &line[start..pos])
}

impl Helper for ShellCompleter {}
impl Hinter for ShellCompleter {
    type Hint = String;
}
impl Highlighter for ShellCompleter {}
impl Validator for ShellCompleter {}
