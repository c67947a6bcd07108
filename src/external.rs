use crate::command::{ExecutableCommand, ExitCode};
use crate::shell::Shell;
use crate::streams::{InStream, OutStream};
use anyhow::Result;
use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::{Arc, Mutex};

/// Command that is not a builtin: located on `PATH` and run as a
/// child process.
pub struct ExternalCommand {
    path: PathBuf,
    args: Vec<String>,
}

impl ExternalCommand {
    pub fn new(path: PathBuf, args: Vec<String>) -> Self {
        Self { path, args }
    }
}

/// Looks up `name` the same way the builtin registry does, but as a
/// free function rather than a `CommandFactory`: this fallback has no
/// fixed name to compare against, so it does not fit the one-name-per-
/// factory shape the rest of the registry uses.
pub fn try_create(shell: &Shell, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
    let search_paths = shell.get_env("PATH").cloned().unwrap_or_default();
    find_command_path(OsStr::new(&search_paths), Path::new(name)).map(|found| {
        Box::new(ExternalCommand::new(
            found.into_owned(),
            args.iter().map(|s| s.to_string()).collect(),
        )) as Box<dyn ExecutableCommand>
    })
}

impl ExecutableCommand for ExternalCommand {
    fn execute(
        self: Box<Self>,
        stdin: InStream,
        stdout: OutStream,
        stderr: OutStream,
        shell: &Arc<Mutex<Shell>>,
    ) -> Result<ExitCode> {
        let (cwd, env) = {
            let guard = shell.lock().expect("shell mutex poisoned");
            (guard.cwd.clone(), guard.env.clone())
        };
        let mut child = std::process::Command::new(&self.path)
            .args(&self.args)
            .current_dir(&cwd)
            .env_clear()
            .envs(env)
            .stdin(stdin.into_stdio()?)
            .stdout(stdout.into_stdio()?)
            .stderr(stderr.into_stdio()?)
            .spawn()?;
        let exit_status = child.wait()?;
        match exit_status.code() {
            Some(x) => Ok(x),
            None => Ok(terminated_by_signal(exit_status)),
        }
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it exists.
/// - Relative with multiple components (e.g., `bin/sh`): returns it if it exists.
/// - `./foo` on Unix or any `./`-prefixed path on other platforms: returns it if it exists.
/// - Single path component (no separators): search each directory in `search_paths` (PATH)
///   and return the first existing match.
/// - Empty path: returns `None`.
///
/// Returns either a borrowed reference to the provided `path` or an owned `PathBuf`
/// when the result is discovered via PATH lookup.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let search_in_current_dir = cfg!(not(unix)) || path.starts_with("./");
    if search_in_current_dir && path.exists() {
        return Some(Cow::Borrowed(path));
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        (None, None) => {
            // Empty path -> not found
            None
        }
        (Some(x), None) => {
            // Single component -> search in PATH
            find_in_path(search_paths, x.as_os_str()).map(Cow::Owned)
        }
        _ => {
            // Multiple components -> search in current dir
            find_by_path(path).map(Cow::Borrowed)
        }
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    for dir in std::env::split_paths(search_paths) {
        let path = dir.join(cmd);
        if let Some(path) = find_by_path(&path) {
            return Some(path.to_owned());
        }
    }
    None
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}
