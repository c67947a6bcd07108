//! Argument expansion (C8), applied once substitution has already
//! reduced every fragment to a plain string: `$VAR`/`${VAR}`
//! interpolation, then wildcard globbing.

use crate::error::{ShellError, ShellResult};
use crate::shell::Shell;

/// Interpolation only — used for the command-name word, which is
/// never glob-expanded into multiple words.
pub fn expand_word(word: &str, shell: &Shell) -> String {
    interpolate(word, shell)
}

/// Interpolation followed by wildcard expansion for a full argument
/// list. A word that glob-expands to nothing is a hard error; a word
/// with no special characters passes through untouched.
pub fn expand_args(words: &[String], shell: &Shell) -> ShellResult<Vec<String>> {
    let mut out = Vec::with_capacity(words.len());
    for word in words {
        let interpolated = interpolate(word, shell);
        if has_glob_chars(&interpolated) {
            out.extend(glob_expand(&interpolated, shell)?);
        } else {
            out.push(interpolated);
        }
    }
    Ok(out)
}

fn has_glob_chars(s: &str) -> bool {
    s.contains('*') || s.contains('?') || s.contains('[')
}

fn glob_expand(pattern: &str, shell: &Shell) -> ShellResult<Vec<String>> {
    let is_absolute = std::path::Path::new(pattern).is_absolute();
    let full_pattern = shell.expand_path(pattern);
    let full_pattern_str = full_pattern.to_string_lossy().into_owned();

    let mut matches: Vec<String> = glob::glob(&full_pattern_str)
        .map_err(|e| ShellError::Syntax(format!("bad glob pattern {pattern}: {e}")))?
        .filter_map(Result::ok)
        .map(|p| {
            if is_absolute {
                p.to_string_lossy().into_owned()
            } else {
                p.strip_prefix(&shell.cwd)
                    .unwrap_or(&p)
                    .to_string_lossy()
                    .into_owned()
            }
        })
        .collect();

    if matches.is_empty() {
        return Err(ShellError::WildcardNoMatch(pattern.to_string()));
    }
    matches.sort();
    Ok(matches)
}

/// Expands `$NAME` and `${NAME}` against the shell's environment.
/// An unknown name expands to the empty string, matching the
/// original's `os.Expand` behavior.
fn interpolate(word: &str, shell: &Shell) -> String {
    let mut out = String::new();
    let mut chars = word.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'{') {
            chars.next();
            let mut name = String::new();
            for nc in chars.by_ref() {
                if nc == '}' {
                    break;
                }
                name.push(nc);
            }
            out.push_str(shell.get_env(&name).map(String::as_str).unwrap_or(""));
        } else {
            let mut name = String::new();
            while let Some(&nc) = chars.peek() {
                if nc.is_alphanumeric() || nc == '_' {
                    name.push(nc);
                    chars.next();
                } else {
                    break;
                }
            }
            if name.is_empty() {
                out.push('$');
            } else {
                out.push_str(shell.get_env(&name).map(String::as_str).unwrap_or(""));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_both_forms() {
        let mut shell = Shell::new();
        shell.set_env("FOO", "bar");
        assert_eq!(expand_word("$FOO/baz", &shell), "bar/baz");
        assert_eq!(expand_word("${FOO}baz", &shell), "barbaz");
        assert_eq!(expand_word("$UNKNOWN_VAR", &shell), "");
    }

    #[test]
    fn passthrough_without_specials() {
        let shell = Shell::new();
        let args = expand_args(&["hello".to_string(), "world".to_string()], &shell).unwrap();
        assert_eq!(args, vec!["hello".to_string(), "world".to_string()]);
    }

    #[test]
    fn glob_expands_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::File::create(dir.path().join("b.txt")).unwrap();
        std::fs::File::create(dir.path().join("a.txt")).unwrap();
        let mut shell = Shell::new();
        shell.cwd = dir.path().to_path_buf();
        let args = expand_args(&["*.txt".to_string()], &shell).unwrap();
        assert_eq!(args, vec!["a.txt".to_string(), "b.txt".to_string()]);
    }

    #[test]
    fn glob_with_no_matches_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = Shell::new();
        shell.cwd = dir.path().to_path_buf();
        assert!(matches!(
            expand_args(&["*.xyz".to_string()], &shell),
            Err(ShellError::WildcardNoMatch(_))
        ));
    }
}
