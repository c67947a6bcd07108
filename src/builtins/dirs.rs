//! Directory-stack applets: `pushd`, `popd`, `dirs`. All three share
//! the same "print the stack, most recent first" rendering.

use std::io::{Read, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use argh::FromArgs;

use crate::command::{BuiltinCommand, ExitCode};
use crate::error::ShellError;
use crate::shell::Shell;

fn normalize(shell: &Shell, p: &Path) -> String {
    shell.display_path(p)
}

fn show_stack(shell: &Shell, stdout: &mut dyn Write) -> Result<()> {
    let mut rendered = vec![normalize(shell, &shell.cwd)];
    for dir in shell.dir_stack.iter().rev() {
        rendered.push(normalize(shell, dir));
    }
    writeln!(stdout, "{}", rendered.join(" "))?;
    Ok(())
}

#[derive(FromArgs)]
/// push the current directory onto the stack and switch to a new one.
pub struct Pushd {
    #[argh(positional)]
    pub target: Option<String>,
}

impl BuiltinCommand for Pushd {
    fn name() -> &'static str {
        "pushd"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        shell: &Arc<Mutex<Shell>>,
    ) -> Result<ExitCode> {
        let mut guard = shell.lock().expect("shell mutex poisoned");
        let current = guard.cwd.clone();
        let target = self.target.unwrap_or_default();
        if guard.set_working_dir("pushd", &target, stderr).is_err() {
            return Ok(1);
        }
        guard.dir_stack.push(current);
        show_stack(&guard, stdout)?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// pop the top of the directory stack and switch to it.
pub struct Popd {}

impl BuiltinCommand for Popd {
    fn name() -> &'static str {
        "popd"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        shell: &Arc<Mutex<Shell>>,
    ) -> Result<ExitCode> {
        let mut guard = shell.lock().expect("shell mutex poisoned");
        let Some(last) = guard.dir_stack.pop() else {
            // Don't write our own diagnostic here: the blanket
            // `ExecutableCommand` impl writes `ShellError`'s Display
            // (which is exactly this message) to stderr on any `Err`,
            // so writing it ourselves too would double-print it.
            return Err(ShellError::PopEmpty.into());
        };
        let target = last.to_string_lossy().into_owned();
        let _ = guard.set_working_dir("popd", &target, stderr);
        show_stack(&guard, stdout)?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// print the directory stack.
pub struct Dirs {}

impl BuiltinCommand for Dirs {
    fn name() -> &'static str {
        "dirs"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        shell: &Arc<Mutex<Shell>>,
    ) -> Result<ExitCode> {
        let guard = shell.lock().expect("shell mutex poisoned");
        show_stack(&guard, stdout)?;
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn pushd_then_popd_restores_cwd() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        let sh = Arc::new(Mutex::new(Shell::new()));
        sh.lock().unwrap().cwd = dir_a.path().to_path_buf();

        let cmd = Pushd { target: Some(dir_b.path().to_string_lossy().into_owned()) };
        cmd.execute(&mut Cursor::new(Vec::new()), &mut Vec::new(), &mut Vec::new(), &sh).unwrap();
        assert_eq!(sh.lock().unwrap().cwd, dir_b.path());
        assert_eq!(sh.lock().unwrap().dir_stack.len(), 1);

        let cmd = Popd {};
        cmd.execute(&mut Cursor::new(Vec::new()), &mut Vec::new(), &mut Vec::new(), &sh).unwrap();
        assert_eq!(sh.lock().unwrap().cwd, dir_a.path());
        assert!(sh.lock().unwrap().dir_stack.is_empty());
    }

    #[test]
    fn popd_on_empty_stack_errors() {
        let sh = Arc::new(Mutex::new(Shell::new()));
        let cmd = Popd {};
        let res = cmd.execute(&mut Cursor::new(Vec::new()), &mut Vec::new(), &mut Vec::new(), &sh);
        assert!(res.is_err());
    }

    /// Goes through the blanket `ExecutableCommand` impl (the path the
    /// executor actually dispatches through), which is the only place
    /// a `BuiltinCommand`'s `Err` gets turned into a stderr write —
    /// `Popd` must not also write its own, or the diagnostic doubles.
    #[test]
    fn popd_on_empty_stack_prints_diagnostic_exactly_once() {
        use crate::command::{CommandFactory, ExecutableCommand, Factory};
        use crate::streams::{InStream, OutStream};
        use std::io::Read as _;

        let sh = Arc::new(Mutex::new(Shell::new()));
        let factory = Factory::<Popd>::new();
        let cmd: Box<dyn ExecutableCommand> = factory.try_create("popd", &[]).unwrap();

        let (mut stderr_reader, stderr_writer) = os_pipe::pipe().unwrap();
        let (_stdout_reader, stdout_writer) = os_pipe::pipe().unwrap();
        cmd.execute(
            InStream::Inherit,
            OutStream::Pipe(stdout_writer),
            OutStream::Pipe(stderr_writer),
            &sh,
        )
        .unwrap();

        let mut err = String::new();
        stderr_reader.read_to_string(&mut err).unwrap();
        assert_eq!(err.matches("directory stack empty").count(), 1);
    }
}
