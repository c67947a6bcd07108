//! One runnable command instance (C5): a name, post-substitution
//! arguments, three stream ends, and the timing record produced once
//! it finishes.

use std::time::{Duration, Instant};

use crate::shell::Shell;
use crate::streams::{InStream, OutStream};

pub struct Process {
    pub parent_pid: u64,
    pub pid: u64,
    pub cmd: String,
    pub args: Vec<String>,
    pub stdin: InStream,
    pub stdout: OutStream,
    pub stderr: OutStream,
}

impl Process {
    pub fn new(parent_pid: u64, pid: u64, cmd: String, args: Vec<String>) -> Self {
        Process {
            parent_pid,
            pid,
            cmd,
            args,
            stdin: InStream::Inherit,
            stdout: OutStream::InheritStdout,
            stderr: OutStream::InheritStderr,
        }
    }

    pub fn redirect_stdin(&mut self, shell: &Shell, path: &str) -> std::io::Result<()> {
        let f = std::fs::File::open(shell.expand_path(path))?;
        self.stdin = InStream::File(f);
        Ok(())
    }

    pub fn redirect_stdout(&mut self, shell: &Shell, path: &str, append: bool) -> std::io::Result<()> {
        self.stdout = OutStream::File(open_redirect_target(shell, path, append)?);
        Ok(())
    }

    pub fn redirect_stderr(&mut self, shell: &Shell, path: &str, append: bool) -> std::io::Result<()> {
        self.stderr = OutStream::File(open_redirect_target(shell, path, append)?);
        Ok(())
    }

    /// `&>`/`&>>`: stdout and stderr share one open file description so
    /// writes from both interleave at a single offset instead of each
    /// stream truncating the other's.
    pub fn redirect_stdout_and_stderr(&mut self, shell: &Shell, path: &str, append: bool) -> std::io::Result<()> {
        self.redirect_stdout(shell, path, append)?;
        self.stderr = self.stdout.try_clone()?;
        Ok(())
    }
}

fn open_redirect_target(shell: &Shell, path: &str, append: bool) -> std::io::Result<std::fs::File> {
    let mut opts = std::fs::OpenOptions::new();
    opts.create(true).write(true).append(append).truncate(!append);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o777);
    }
    opts.open(shell.expand_path(path))
}

/// Start timestamp, wall duration, and the winning exit code of one
/// finished `Process`.
pub struct ExecResult {
    start: Instant,
    wall: Duration,
    exit_code: i32,
}

impl ExecResult {
    pub fn new() -> Self {
        ExecResult {
            start: Instant::now(),
            wall: Duration::default(),
            exit_code: 0,
        }
    }

    pub fn finish(&mut self, exit_code: i32) {
        self.wall = self.start.elapsed();
        self.exit_code = exit_code;
    }

    pub fn wall_time(&self) -> Duration {
        self.wall
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }
}

impl Default for ExecResult {
    fn default() -> Self {
        Self::new()
    }
}
