use std::borrow::Cow;

/// Splits a command line on spaces and tilde-expands each token.
///
/// Runs of spaces never produce empty tokens. Tokens that need no expansion borrow from `line`.
pub fn tokenize<'a>(line: &'a str, home: Option<&str>) -> Vec<Cow<'a, str>> {
    line.split(' ')
        .filter(|token| !token.is_empty())
        .map(|token| expand_tilde(token, home))
        .collect()
}

/// Replaces a leading `~` with `home`.
///
/// Best effort: without a home directory the token comes back unchanged.
pub fn expand_tilde<'a>(token: &'a str, home: Option<&str>) -> Cow<'a, str> {
    match (token.strip_prefix('~'), home) {
        (Some(rest), Some(home)) => {
            let mut expanded = String::new();
            if expanded.try_reserve(home.len() + rest.len()).is_err() {
                return Cow::Borrowed(token);
            }
            expanded.push_str(home);
            expanded.push_str(rest);
            Cow::Owned(expanded)
        }
        _ => Cow::Borrowed(token),
    }
}
