//! The three byte-stream ends a `Process` is wired with. A closed set
//! of sources/sinks (inherited terminal, OS pipe half, redirected
//! file) rather than a trait object: the set of things a stream can
//! be is small and fixed, so a plain enum gets us both `Read`/`Write`
//! for builtins to use directly and a owning conversion into
//! `std::process::Stdio` for handing to a spawned external command.

use std::fs::File;
use std::io::{self, Read, Write};
use std::process::Stdio;

pub enum InStream {
    Inherit,
    Pipe(os_pipe::PipeReader),
    File(File),
}

impl Read for InStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            InStream::Inherit => io::stdin().read(buf),
            InStream::Pipe(p) => p.read(buf),
            InStream::File(f) => f.read(buf),
        }
    }
}

impl InStream {
    pub fn into_stdio(self) -> io::Result<Stdio> {
        Ok(match self {
            InStream::Inherit => Stdio::inherit(),
            InStream::Pipe(p) => p.into(),
            InStream::File(f) => f.into(),
        })
    }
}

pub enum OutStream {
    InheritStdout,
    InheritStderr,
    Pipe(os_pipe::PipeWriter),
    File(File),
}

impl Write for OutStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutStream::InheritStdout => io::stdout().write(buf),
            OutStream::InheritStderr => io::stderr().write(buf),
            OutStream::Pipe(p) => p.write(buf),
            OutStream::File(f) => f.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutStream::InheritStdout => io::stdout().flush(),
            OutStream::InheritStderr => io::stderr().flush(),
            OutStream::Pipe(p) => p.flush(),
            OutStream::File(f) => f.flush(),
        }
    }
}

impl OutStream {
    pub fn into_stdio(self) -> io::Result<Stdio> {
        Ok(match self {
            OutStream::InheritStdout | OutStream::InheritStderr => Stdio::inherit(),
            OutStream::Pipe(p) => p.into(),
            OutStream::File(f) => f.into(),
        })
    }

    /// Duplicates the underlying handle so the stream can be handed to
    /// a nested command (e.g. `time`'s child) while the caller keeps
    /// writing to the same destination afterward.
    pub fn try_clone(&self) -> io::Result<OutStream> {
        Ok(match self {
            OutStream::InheritStdout => OutStream::InheritStdout,
            OutStream::InheritStderr => OutStream::InheritStderr,
            OutStream::Pipe(p) => OutStream::Pipe(p.try_clone()?),
            OutStream::File(f) => OutStream::File(f.try_clone()?),
        })
    }
}
