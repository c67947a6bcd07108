//! Prompt string builder (C9): a pure function contract so the REPL
//! and tests can both render a prompt without touching global state.

use std::path::Path;

#[allow(clippy::too_many_arguments)]
pub fn build_prompt(
    user: &str,
    host: &str,
    wd: &Path,
    home: Option<&Path>,
    now: &str,
    last_status: i32,
    plain_text: bool,
) -> String {
    let display_wd = match home {
        Some(h) => match wd.strip_prefix(h) {
            Ok(rest) if rest.as_os_str().is_empty() => "~".to_string(),
            Ok(rest) => format!("~/{}", rest.display()),
            Err(_) => wd.display().to_string(),
        },
        None => wd.display().to_string(),
    };
    let status_marker = if last_status == 0 { "" } else { " !" };

    if plain_text {
        format!("[{now}] {user}@{host} {display_wd}{status_marker}$ ")
    } else {
        format!(
            "\x1b[32m{user}@{host}\x1b[0m:\x1b[34m{display_wd}\x1b[0m{status_marker}$ "
        )
    }
}
