//! `sleep`, `time`, and `exit`. `time` is the one builtin that is not
//! a plain [`BuiltinCommand`]: it needs to dispatch a child command
//! through the very registry it is itself registered in, so it
//! implements [`CommandFactory`]/[`ExecutableCommand`] directly and
//! holds a `Weak` back-reference built by `registry::default_registry`
//! via `Arc::new_cyclic`.

use std::io::{Read, Write};
use std::sync::{Arc, Mutex, Weak};
use std::time::Instant;

use anyhow::{anyhow, Result};
use argh::FromArgs;
use regex::Regex;

use crate::command::{BuiltinCommand, CommandFactory, ExecutableCommand, ExitCode};
use crate::error::ShellError;
use crate::shell::Shell;
use crate::streams::{InStream, OutStream};

#[derive(FromArgs)]
/// pause for the given number of seconds (fractional seconds allowed).
pub struct Sleep {
    #[argh(positional)]
    pub seconds: Option<String>,
}

impl BuiltinCommand for Sleep {
    fn name() -> &'static str {
        "sleep"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        _shell: &Arc<Mutex<Shell>>,
    ) -> Result<ExitCode> {
        let Some(raw) = self.seconds else {
            writeln!(stderr, "usage: sleep seconds")?;
            return Ok(1);
        };
        let re = Regex::new(r"[\d.]+").unwrap();
        let secs: f64 = re
            .find(&raw)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0.0);
        std::thread::sleep(std::time::Duration::from_secs_f64(secs));
        Ok(0)
    }
}

#[derive(FromArgs)]
/// terminate the shell, optionally with a status code.
pub struct Exit {
    #[argh(positional)]
    pub status: Option<i32>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        shell: &Arc<Mutex<Shell>>,
    ) -> Result<ExitCode> {
        let status = self.status.unwrap_or(0);
        shell.lock().expect("shell mutex poisoned").exit_requested = Some(status);
        Ok(status)
    }
}

/// Runs `self.args[0]` with `self.args[1..]` through the shared
/// registry and appends a one-line timing report to stdout, printed
/// unconditionally — including when the child fails — per the
/// intended UX decided in DESIGN.md (the original only printed on
/// success).
struct TimeCommand {
    args: Vec<String>,
    registry: Weak<Vec<Box<dyn CommandFactory>>>,
}

impl ExecutableCommand for TimeCommand {
    fn execute(
        self: Box<Self>,
        stdin: InStream,
        stdout: OutStream,
        stderr: OutStream,
        shell: &Arc<Mutex<Shell>>,
    ) -> Result<ExitCode> {
        if self.args.is_empty() {
            return Ok(0);
        }
        let child_name = &self.args[0];
        let child_args = &self.args[1..];

        let registry = self
            .registry
            .upgrade()
            .ok_or_else(|| anyhow!("time: command registry is gone"))?;
        let resolved = {
            let guard = shell.lock().expect("shell mutex poisoned");
            crate::registry::resolve(registry.as_slice(), &guard, child_name, child_args)
        }
        .ok_or_else(|| ShellError::CommandNotFound(child_name.clone()))?;

        let mut report_to = stdout.try_clone()?;
        let start = Instant::now();
        let outcome = resolved.execute(stdin, stdout, stderr, shell);
        let wall = start.elapsed();

        writeln!(report_to, "{}  {:.3}s total", self.args.join(" "), wall.as_secs_f64())?;
        outcome
    }
}

pub struct TimeFactory {
    registry: Weak<Vec<Box<dyn CommandFactory>>>,
}

impl TimeFactory {
    pub fn new(registry: Weak<Vec<Box<dyn CommandFactory>>>) -> Self {
        Self { registry }
    }
}

impl CommandFactory for TimeFactory {
    fn name(&self) -> &str {
        "time"
    }

    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        if name != "time" {
            return None;
        }
        Some(Box::new(TimeCommand {
            args: args.iter().map(|s| s.to_string()).collect(),
            registry: self.registry.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn sleep_with_no_argument_is_a_usage_error() {
        let sh = Arc::new(Mutex::new(Shell::new()));
        let mut err = Vec::new();
        let cmd = Sleep { seconds: None };
        let code = cmd.execute(&mut Cursor::new(Vec::new()), &mut Vec::new(), &mut err, &sh).unwrap();
        assert_eq!(code, 1);
    }

    #[test]
    fn sleep_parses_fractional_seconds() {
        let sh = Arc::new(Mutex::new(Shell::new()));
        let cmd = Sleep { seconds: Some("0.001".to_string()) };
        let code = cmd.execute(&mut Cursor::new(Vec::new()), &mut Vec::new(), &mut Vec::new(), &sh).unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    fn exit_sets_shell_flag() {
        let sh = Arc::new(Mutex::new(Shell::new()));
        let cmd = Exit { status: Some(7) };
        let code = cmd.execute(&mut Cursor::new(Vec::new()), &mut Vec::new(), &mut Vec::new(), &sh).unwrap();
        assert_eq!(code, 7);
        assert_eq!(sh.lock().unwrap().exit_requested, Some(7));
    }
}
