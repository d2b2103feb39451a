//! Child-side half of command execution.
//!
//! Everything the child needs is converted to C strings by [`PreparedCommand::new`] in the
//! parent, including the null-terminated pointer array `execvp` takes. Between `fork` and
//! `exec` the child only opens, duplicates and closes descriptors, so it never allocates and
//! never takes a lock.

use std::convert::Infallible;
use std::ffi::{CStr, CString};
use std::fs::File;
use std::io::Write;
use std::mem::ManuallyDrop;
use std::os::fd::{FromRawFd, RawFd};
use std::ptr;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use nix::errno::Errno;
use nix::fcntl::{self, OFlag};
use nix::libc;
use nix::sys::stat::Mode;
use nix::unistd;

use crate::config::StdioDefault;
use crate::error::ParseError;
use crate::redirection::{ParsedCommand, WriteMode};

const NULL_DEVICE: &CStr = c"/dev/null";
const STDIN: RawFd = 0;
const STDOUT: RawFd = 1;
const STDERR: RawFd = 2;

/// A command ready to be handed to `execvp` in a freshly forked child.
#[derive(Debug)]
pub struct PreparedCommand {
    argv: Vec<CString>,
    /// Points into `argv`, followed by a null terminator.
    argv_ptrs: Vec<*const libc::c_char>,
    input: Option<CString>,
    output: Option<(CString, WriteMode)>,
    stdio: StdioDefault,
}

impl PreparedCommand {
    pub fn new(parsed: &ParsedCommand, stdio: StdioDefault) -> Result<Self, ParseError> {
        if parsed.args.is_empty() {
            return Err(ParseError::MissingCommand);
        }
        let argv = parsed
            .args
            .iter()
            .map(|arg| c_string(arg.as_bytes()))
            .collect::<Result<Vec<_>, _>>()?;
        let input = parsed.plan.input.as_deref().map(path_c_string).transpose()?;
        let output = parsed
            .plan
            .output
            .as_ref()
            .map(|redirection| {
                path_c_string(&redirection.file).map(|path| (path, redirection.mode))
            })
            .transpose()?;
        // The CString buffers live on the heap, so moving `argv` into Self keeps these valid.
        let argv_ptrs = argv
            .iter()
            .map(|arg| arg.as_ptr())
            .chain(std::iter::once(ptr::null()))
            .collect();

        Ok(Self {
            argv,
            argv_ptrs,
            input,
            output,
            stdio,
        })
    }

    pub fn program(&self) -> &CStr {
        &self.argv[0]
    }

    /// Binds the standard streams and replaces the process image. Only call this in the child.
    ///
    /// On failure the reason is written to stderr and the process exits with status 1.
    pub fn exec(&self) -> ! {
        let failure = match self.redirect_and_exec() {
            Ok(never) => match never {},
            Err(failure) => failure,
        };
        failure.report();
        // SAFETY: `_exit` skips atexit handlers and stdio flushing, which belong to the parent.
        unsafe { libc::_exit(1) }
    }

    fn redirect_and_exec(&self) -> Result<Infallible, ChildFailure<'_>> {
        match &self.input {
            Some(path) => bind(path, OFlag::O_RDONLY, STDIN)?,
            None if self.stdio.input_is_null() => bind(NULL_DEVICE, OFlag::O_RDONLY, STDIN)?,
            None => {}
        }
        match &self.output {
            Some((path, mode)) => bind(path, open_flags(*mode), STDOUT)?,
            None if self.stdio.output_is_null() => bind(NULL_DEVICE, OFlag::O_WRONLY, STDOUT)?,
            None => {}
        }

        // SAFETY: both pointers refer to NUL-terminated strings owned by `self`, and
        // `argv_ptrs` ends with a null pointer.
        unsafe { libc::execvp(self.program().as_ptr(), self.argv_ptrs.as_ptr()) };
        Err(ChildFailure {
            action: "exec",
            subject: self.program(),
            errno: Errno::last(),
        })
    }
}

fn open_flags(mode: WriteMode) -> OFlag {
    match mode {
        WriteMode::Truncate => OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
        WriteMode::Append => OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND,
    }
}

/// Opens `path` and moves the descriptor onto `target`.
fn bind(path: &CStr, flags: OFlag, target: RawFd) -> Result<(), ChildFailure<'_>> {
    let failure = move |errno| ChildFailure {
        action: "open",
        subject: path,
        errno,
    };
    let fd = fcntl::open(path, flags, Mode::from_bits_truncate(0o666)).map_err(failure)?;
    // open() returns the lowest free descriptor, which is already `target` if it was closed.
    if fd != target {
        let duplicated = unistd::dup2(fd, target);
        let _ = unistd::close(fd);
        duplicated.map_err(failure)?;
    }
    Ok(())
}

fn c_string(bytes: &[u8]) -> Result<CString, ParseError> {
    CString::new(bytes)
        .map_err(|_| ParseError::InteriorNul(String::from_utf8_lossy(bytes).into_owned()))
}

fn path_c_string(path: &Path) -> Result<CString, ParseError> {
    c_string(path.as_os_str().as_bytes())
}

struct ChildFailure<'a> {
    action: &'static str,
    subject: &'a CStr,
    errno: Errno,
}

impl ChildFailure<'_> {
    fn report(&self) {
        // SAFETY: fd 2 stays open; ManuallyDrop keeps the File from closing it.
        let mut stderr = ManuallyDrop::new(unsafe { File::from_raw_fd(STDERR) });
        let _ = stderr.write_all(b"minish: ");
        let _ = stderr.write_all(self.action.as_bytes());
        let _ = stderr.write_all(b" ");
        let _ = stderr.write_all(self.subject.to_bytes());
        let _ = stderr.write_all(b": ");
        let _ = stderr.write_all(self.errno.desc().as_bytes());
        let _ = stderr.write_all(b"\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redirection::parse_command;
    use crate::tokenize::tokenize;

    fn prepare(line: &str) -> Result<PreparedCommand, ParseError> {
        let parsed = parse_command(tokenize(line, None))?;
        PreparedCommand::new(&parsed, StdioDefault::Null)
    }

    #[test]
    fn test_prepare_argv() {
        let cmd = prepare("head -n 1 < in.txt >> out.txt").unwrap();
        assert_eq!(cmd.program(), c"head");
        assert_eq!(cmd.argv, vec![c"head".to_owned(), c"-n".to_owned(), c"1".to_owned()]);
        assert_eq!(cmd.input.as_deref(), Some(c"in.txt"));
        assert_eq!(cmd.output, Some((c"out.txt".to_owned(), WriteMode::Append)));
    }

    #[test]
    fn test_exec_pointer_array_is_prebuilt() {
        let cmd = prepare("sort -r < in.txt").unwrap();
        assert_eq!(cmd.argv_ptrs.len(), cmd.argv.len() + 1);
        for (arg, ptr) in cmd.argv.iter().zip(&cmd.argv_ptrs) {
            assert_eq!(*ptr, arg.as_ptr());
        }
        assert!(cmd.argv_ptrs.last().unwrap().is_null());
    }

    #[test]
    fn test_redirect_only_line_is_rejected() {
        assert_eq!(prepare("< in.txt").unwrap_err(), ParseError::MissingCommand);
        assert_eq!(prepare("> out.txt").unwrap_err(), ParseError::MissingCommand);
    }

    #[test]
    fn test_nul_byte_is_rejected() {
        let err = prepare("echo a\0b").unwrap_err();
        assert_eq!(err, ParseError::InteriorNul("a\0b".to_string()));
    }

    #[test]
    fn test_open_flags() {
        assert!(open_flags(WriteMode::Truncate).contains(OFlag::O_TRUNC | OFlag::O_CREAT));
        assert!(!open_flags(WriteMode::Truncate).contains(OFlag::O_APPEND));
        assert!(open_flags(WriteMode::Append).contains(OFlag::O_APPEND | OFlag::O_CREAT));
        assert!(!open_flags(WriteMode::Append).contains(OFlag::O_TRUNC));
    }
}
