use std::io::{self, ErrorKind, Read, Write};
use std::path::PathBuf;

use bytes::BytesMut;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use tracing::{debug, warn};

use crate::completion::ShellCompleter;
use crate::error::{ParseError, ShellError};

const READ_CHUNK: usize = 4096;

/// Where command lines come from.
pub trait LineSource {
    /// Shows `prompt` and returns the next line without its terminator, or `None` at end of input.
    ///
    /// A recoverable error consumes the offending line; the caller may ask for the next one.
    fn next_line(&mut self, prompt: &str) -> Result<Option<String>, ShellError>;
}

/// Terminal front end with history and tab completion.
pub struct Interactive {
    editor: Editor<ShellCompleter, DefaultHistory>,
    history_file: Option<PathBuf>,
}

impl Interactive {
    pub fn new(history_file: Option<PathBuf>) -> Result<Self, ShellError> {
        let mut editor = Editor::new()?;
        editor.set_helper(Some(ShellCompleter::new()));
        if let Some(path) = &history_file {
            // A missing file on first use is normal.
            if let Err(err) = editor.load_history(path) {
                debug!(path = %path.display(), %err, "history not loaded");
            }
        }
        Ok(Self {
            editor,
            history_file,
        })
    }
}

impl LineSource for Interactive {
    fn next_line(&mut self, prompt: &str) -> Result<Option<String>, ShellError> {
        loop {
            match self.editor.readline(prompt) {
                Ok(line) => {
                    if !line.trim_matches(' ').is_empty() {
                        let _ = self.editor.add_history_entry(line.as_str());
                    }
                    return Ok(Some(line));
                }
                // Ctrl-C drops the line being edited.
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => return Ok(None),
                Err(err) => return Err(err.into()),
            }
        }
    }
}

impl Drop for Interactive {
    fn drop(&mut self) {
        if let Some(path) = &self.history_file {
            if let Err(err) = self.editor.save_history(path) {
                warn!(path = %path.display(), %err, "could not save history");
            }
        }
    }
}

/// Line reader for non-terminal input such as scripts piped into the shell.
///
/// Lines may be arbitrarily long; the buffer grows as needed.
pub struct Piped<R> {
    reader: R,
    buffer: BytesMut,
    scanned: usize,
    show_prompt: bool,
    eof: bool,
}

impl<R: Read> Piped<R> {
    pub fn new(reader: R, show_prompt: bool) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            scanned: 0,
            show_prompt,
            eof: false,
        }
    }

    fn fill(&mut self) -> io::Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.reader.read(&mut chunk) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(());
                }
                Ok(n) => {
                    self.buffer.extend_from_slice(&chunk[..n]);
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }
}

impl<R: Read> LineSource for Piped<R> {
    fn next_line(&mut self, prompt: &str) -> Result<Option<String>, ShellError> {
        if self.show_prompt {
            let mut stdout = io::stdout().lock();
            stdout.write_all(prompt.as_bytes())?;
            stdout.flush()?;
        }

        loop {
            if let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') {
                let end = self.scanned + offset;
                let line = self.buffer.split_to(end + 1);
                self.scanned = 0;
                return decode(&line[..end]).map(Some);
            }
            self.scanned = self.buffer.len();

            if self.eof {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let line = self.buffer.split();
                self.scanned = 0;
                return decode(&line).map(Some);
            }
            self.fill()?;
        }
    }
}

/// Lines are rejected rather than repaired: a replaced byte would name a different file.
fn decode(line: &[u8]) -> Result<String, ShellError> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8(line.to_vec()).map_err(|err| {
        ParseError::InvalidUtf8(String::from_utf8_lossy(err.as_bytes()).into_owned()).into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn lines(input: &[u8]) -> Vec<String> {
        let mut source = Piped::new(Cursor::new(input.to_vec()), false);
        let mut out = Vec::new();
        while let Some(line) = source.next_line("$ ").unwrap() {
            out.push(line);
        }
        out
    }

    #[test]
    fn test_splits_lines() {
        assert_eq!(lines(b"ls -l\ncd /tmp\n"), vec!["ls -l", "cd /tmp"]);
    }

    #[test]
    fn test_final_line_without_newline() {
        assert_eq!(lines(b"echo a\nexit"), vec!["echo a", "exit"]);
    }

    #[test]
    fn test_empty_lines_and_crlf() {
        assert_eq!(lines(b"\n\r\nexit\r\n"), vec!["", "", "exit"]);
        assert!(lines(b"").is_empty());
    }

    #[test]
    fn test_invalid_utf8_line_is_rejected_and_skipped() {
        let mut source = Piped::new(Cursor::new(b"echo hi > caf\xe9.txt\nexit\n".to_vec()), false);
        let err = source.next_line("$ ").unwrap_err();
        assert!(matches!(
            err,
            ShellError::Parse(ParseError::InvalidUtf8(ref line)) if line == "echo hi > caf\u{fffd}.txt"
        ));
        assert!(!err.is_fatal());
        assert_eq!(source.next_line("$ ").unwrap().as_deref(), Some("exit"));
        assert_eq!(source.next_line("$ ").unwrap(), None);
    }

    #[test]
    fn test_line_longer_than_a_chunk() {
        let long = "x".repeat(READ_CHUNK * 3 + 17);
        let input = format!("echo {}\nexit\n", long);
        let got = lines(input.as_bytes());
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].len(), long.len() + 5);
    }
}
