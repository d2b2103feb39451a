use std::env;
use std::path::{Path, PathBuf};

use crate::error::ShellError;

/// List of builtin commands
pub const BUILTINS: &[&str] = &["cd", "exit"];

/// Commands the interpreter handles itself, without spawning a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Cd,
    Exit,
}

impl Builtin {
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "cd" => Some(Builtin::Cd),
            "exit" => Some(Builtin::Exit),
            _ => None,
        }
    }
}

/// Changes the interpreter's own working directory.
///
/// `target` has already been tilde-expanded; with no target the home directory is used.
pub fn change_dir(target: Option<&str>, home: Option<&Path>) -> Result<PathBuf, ShellError> {
    let dir = match target {
        Some(dir) => PathBuf::from(dir),
        None => home.ok_or(ShellError::HomeNotSet)?.to_path_buf(),
    };
    env::set_current_dir(&dir).map_err(|source| ShellError::ChangeDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}

/// Serialises tests that touch the process-wide working directory.
#[cfg(test)]
pub(crate) static CWD_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_lookup() {
        assert_eq!(Builtin::lookup("cd"), Some(Builtin::Cd));
        assert_eq!(Builtin::lookup("exit"), Some(Builtin::Exit));
        assert_eq!(Builtin::lookup("ls"), None);
        assert_eq!(Builtin::lookup("EXIT"), None);
    }

    #[test]
    fn test_cd_and_back_home() {
        let _guard = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let original = env::current_dir().unwrap();
        let home = tempfile::tempdir().unwrap();
        let home = fs::canonicalize(home.path()).unwrap();
        fs::create_dir(home.join("sub")).unwrap();

        let sub = home.join("sub");
        change_dir(sub.to_str(), Some(home.as_path())).unwrap();
        assert_eq!(env::current_dir().unwrap(), sub);

        change_dir(None, Some(home.as_path())).unwrap();
        assert_eq!(env::current_dir().unwrap(), home);

        env::set_current_dir(original).unwrap();
    }

    #[test]
    fn test_cd_missing_dir() {
        let _guard = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let before = env::current_dir().unwrap();
        let err = change_dir(Some("/definitely/not/here"), None).unwrap_err();
        assert!(matches!(err, ShellError::ChangeDir { .. }));
        assert!(err.to_string().starts_with("cd: /definitely/not/here: "));
        assert_eq!(env::current_dir().unwrap(), before);
    }

    #[test]
    fn test_cd_without_home() {
        let err = change_dir(None, None).unwrap_err();
        assert!(matches!(err, ShellError::HomeNotSet));
    }
}
