use std::path::Path;

/// Renders `<label>:<cwd>$ `, abbreviating the home directory to `~`.
pub fn render(label: &str, cwd: &Path, home: Option<&Path>) -> String {
    let shown = match home.and_then(|home| cwd.strip_prefix(home).ok()) {
        Some(rest) if rest.as_os_str().is_empty() => "~".to_string(),
        Some(rest) => format!("~/{}", rest.display()),
        None => cwd.display().to_string(),
    };
    format!("{}:{}$ ", label, shown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_abbreviation() {
        let home = Some(Path::new("/home/u"));
        assert_eq!(render("minish", Path::new("/home/u"), home), "minish:~$ ");
        assert_eq!(render("minish", Path::new("/home/u/src/x"), home), "minish:~/src/x$ ");
    }

    #[test]
    fn test_outside_home() {
        let home = Some(Path::new("/home/u"));
        assert_eq!(render("1730sh", Path::new("/tmp"), home), "1730sh:/tmp$ ");
        assert_eq!(render("1730sh", Path::new("/home/u2"), home), "1730sh:/home/u2$ ");
        assert_eq!(render("1730sh", Path::new("/tmp"), None), "1730sh:/tmp$ ");
    }
}
