//! The seam between the core and the 19 applets (C3/C10): a builtin
//! is an `argh::FromArgs` struct that knows how to run itself; the
//! blanket `ExecutableCommand` impl and `Factory<T>` wrapper let the
//! registry hold builtins and the external-command fallback side by
//! side as trait objects.

use std::io::{Read, Write};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use argh::{EarlyExit, FromArgs};

use crate::shell::Shell;
use crate::streams::{InStream, OutStream};

pub type ExitCode = i32;

/// A ready-to-run command, either a builtin or an external process.
pub trait ExecutableCommand: Send {
    fn execute(
        self: Box<Self>,
        stdin: InStream,
        stdout: OutStream,
        stderr: OutStream,
        shell: &Arc<Mutex<Shell>>,
    ) -> Result<ExitCode>;
}

/// One entry in the command registry: given a name and its already
/// expanded argv, produce a runnable command if this factory is
/// responsible for that name.
pub trait CommandFactory: Send + Sync {
    /// The single name this factory answers to, used to keep the
    /// registry sorted (spec §4.3: "a separate process-global ordered
    /// sequence sorted by name").
    fn name(&self) -> &str;

    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>>;
}

/// A built-in applet. Parsed with `argh`, executed in-process against
/// plain `Read`/`Write` trait objects and the shared `Shell` handle.
///
/// `shell` is the same `Arc<Mutex<_>>` every pipeline stage holds, not
/// an already-acquired guard: a builtin that streams bytes (`cat`,
/// `wc`, `grep`, ...) must lock it only for the brief moment it
/// actually touches `Shell` (e.g. `expand_path`) and release it before
/// blocking on `stdin`/`stdout`. Holding the lock for a whole
/// streaming body would stall every other concurrently running stage
/// that also needs it — exactly the pipe-buffer deadlock `cat bigfile
/// | wc -l` must not hit.
pub trait BuiltinCommand: Sized + FromArgs {
    fn name() -> &'static str;

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        shell: &Arc<Mutex<Shell>>,
    ) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        mut stdin: InStream,
        mut stdout: OutStream,
        mut stderr: OutStream,
        shell: &Arc<Mutex<Shell>>,
    ) -> Result<ExitCode> {
        match T::execute(*self, &mut stdin, &mut stdout, &mut stderr, shell) {
            Ok(code) => Ok(code),
            Err(e) => {
                let _ = writeln!(stderr, "{e}");
                Ok(1)
            }
        }
    }
}

/// Renders an `argh` usage/help message (or a flag-parse error)
/// without touching the shell at all.
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        _stdin: InStream,
        mut stdout: OutStream,
        mut stderr: OutStream,
        _shell: &Arc<Mutex<Shell>>,
    ) -> Result<ExitCode> {
        if self.is_error {
            write!(stderr, "{}", self.output)?;
            Ok(1)
        } else {
            write!(stdout, "{}", self.output)?;
            Ok(0)
        }
    }
}

/// Zero-sized factory for one builtin type, registered once per
/// applet in `registry::default_registry`.
pub struct Factory<T>(PhantomData<T>);

impl<T> Factory<T> {
    pub fn new() -> Self {
        Factory(PhantomData)
    }
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn name(&self) -> &str {
        T::name()
    }

    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        if name != T::name() {
            return None;
        }
        Some(match T::from_args(&[name], args) {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                output,
                is_error: status.is_err(),
            }),
        })
    }
}
