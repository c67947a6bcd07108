//! Per-shell mutable context (C4): working directory, environment,
//! directory stack and the pid counter. One `Shell` is created per
//! interactive session and lives behind an `Arc<Mutex<_>>` so the
//! concurrent pipeline stages started by the executor can reach it.

use std::collections::HashMap;
use std::env as stdenv;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{ShellError, ShellResult};

pub struct Shell {
    pub cwd: PathBuf,
    pub env: HashMap<String, String>,
    pub dir_stack: Vec<PathBuf>,
    /// Set by the `exit` builtin; the REPL checks this after every
    /// group and stops reading further input when it is `Some`.
    pub exit_requested: Option<i32>,
    next_pid: u64,
}

impl Shell {
    pub fn new() -> Self {
        let env = stdenv::vars().collect();
        let cwd = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Shell {
            cwd,
            env,
            dir_stack: Vec::new(),
            exit_requested: None,
            next_pid: 0,
        }
    }

    /// Allocates the next pid. Called with the `Shell` mutex already
    /// held by the executor, which is the one piece of synchronization
    /// this counter needs.
    pub fn next_pid(&mut self) -> u64 {
        self.next_pid += 1;
        self.next_pid
    }

    /// Platform-aware home resolution, mirroring the three tiers spec
    /// §4.4 calls for: prefer the platform's own env var (`HOME`,
    /// `USERPROFILE` on Windows, `home` on Plan 9), then fall back to
    /// a canonical per-platform default where one exists (Android's
    /// `/sdcard`, iOS's `/`), then give up.
    pub fn home_dir(&self) -> Option<PathBuf> {
        let env_key = if cfg!(windows) {
            "USERPROFILE"
        } else if cfg!(target_os = "plan9") {
            "home"
        } else {
            "HOME"
        };
        if let Some(h) = self.env.get(env_key) {
            if !h.is_empty() {
                return Some(PathBuf::from(h));
            }
        }
        if cfg!(target_os = "android") {
            return Some(PathBuf::from("/sdcard"));
        }
        if cfg!(target_os = "ios") {
            return Some(PathBuf::from("/"));
        }
        None
    }

    pub fn expand_path(&self, p: &str) -> PathBuf {
        let path = Path::new(p);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    /// Mirrors the original `setWorkingDir`: an empty target means
    /// home; a nonexistent target writes a one-line diagnostic to
    /// `stderr` and fails instead of panicking the shell.
    pub fn set_working_dir(
        &mut self,
        command: &str,
        target: &str,
        stderr: &mut dyn Write,
    ) -> ShellResult<()> {
        let resolved = if target.is_empty() {
            self.home_dir()
                .ok_or_else(|| ShellError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "HOME is not set",
                )))?
        } else {
            self.expand_path(target)
        };
        if !resolved.exists() {
            let _ = writeln!(stderr, "{command}: no such file or directory: {target}");
            return Err(ShellError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                target.to_string(),
            )));
        }
        self.cwd = resolved;
        Ok(())
    }

    pub fn set_env(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.env.insert(key.into(), val.into());
    }

    pub fn del_env(&mut self, key: &str) {
        self.env.remove(key);
    }

    pub fn get_env(&self, key: &str) -> Option<&String> {
        self.env.get(key)
    }

    /// `~`-relative rendering of a path, used by the prompt and by
    /// `dirs`/`pushd`/`popd`.
    pub fn display_path(&self, p: &Path) -> String {
        if let Some(home) = self.home_dir() {
            if let Ok(rest) = p.strip_prefix(&home) {
                return if rest.as_os_str().is_empty() {
                    "~".to_string()
                } else {
                    format!("~/{}", rest.display())
                };
            }
        }
        p.display().to_string()
    }
}

impl Default for Shell {
    fn default() -> Self {
        Self::new()
    }
}
