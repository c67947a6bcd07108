//! Assembles and runs one `SessionGroup` (C6): resolves each session
//! to a command, wires pipes between stages, applies redirections,
//! evaluates backquoted substitutions before the owning session
//! dispatches, starts every stage concurrently and waits for them in
//! order.

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::ast::{Fragment, Piece, Session, SessionGroup};
use crate::command::{CommandFactory, ExecutableCommand};
use crate::error::{ShellError, ShellResult};
use crate::expand;
use crate::process::{ExecResult, Process};
use crate::shell::Shell;
use crate::streams::{InStream, OutStream};

/// Runs a top-level session group with the real terminal as the
/// default sink for its last stage.
pub fn run_session_group(
    group: &SessionGroup,
    shell: &Arc<Mutex<Shell>>,
    registry: &[Box<dyn CommandFactory>],
) -> ShellResult<ExecResult> {
    run_with_final_stdout(group, shell, registry, OutStream::InheritStdout)
}

/// Runs a single session purely to capture its standard output for a
/// backquote substitution, evaluated synchronously (this call does
/// not return until the substitution is fully resolved) and before
/// the containing session is ever dispatched.
fn run_substitution(
    session: &Session,
    shell: &Arc<Mutex<Shell>>,
    registry: &[Box<dyn CommandFactory>],
) -> ShellResult<String> {
    let (mut reader, writer) = os_pipe::pipe()?;
    let collector: JoinHandle<Vec<u8>> = std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        buf
    });

    let group = SessionGroup { sessions: vec![session.clone()] };
    run_with_final_stdout(&group, shell, registry, OutStream::Pipe(writer))?;

    let bytes = collector.join().expect("substitution collector thread panicked");
    let mut text = String::from_utf8_lossy(&bytes).into_owned();
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

fn reduce_fragment(
    frag: &Fragment,
    shell: &Arc<Mutex<Shell>>,
    registry: &[Box<dyn CommandFactory>],
) -> ShellResult<String> {
    match frag {
        Fragment::Plain(s) => Ok(s.clone()),
        Fragment::Composite(pieces) => {
            let mut out = String::new();
            for piece in pieces {
                match piece {
                    Piece::Text(t) => out.push_str(t),
                    Piece::Sub(session) => out.push_str(&run_substitution(session, shell, registry)?),
                }
            }
            Ok(out)
        }
    }
}

fn run_with_final_stdout(
    group: &SessionGroup,
    shell: &Arc<Mutex<Shell>>,
    registry: &[Box<dyn CommandFactory>],
    final_stdout: OutStream,
) -> ShellResult<ExecResult> {
    let n = group.sessions.len();
    let mut cmds: Vec<Box<dyn ExecutableCommand>> = Vec::with_capacity(n);
    let mut procs: Vec<Process> = Vec::with_capacity(n);

    for (i, session) in group.sessions.iter().enumerate() {
        // 1. substitution, left to right, before this session's own dispatch.
        let mut words = Vec::with_capacity(session.fragments.len());
        for frag in &session.fragments {
            words.push(reduce_fragment(frag, shell, registry)?);
        }
        if words.is_empty() {
            return Err(ShellError::Syntax("empty session".into()));
        }
        let raw_name = words.remove(0);

        // 2. argument expansion: env interpolation then wildcard globbing.
        let (cmd_name, args, pid) = {
            let mut guard = shell.lock().expect("shell mutex poisoned");
            let cmd_name = expand::expand_word(&raw_name, &guard);
            let args = expand::expand_args(&words, &guard)?;
            let pid = guard.next_pid();
            (cmd_name, args, pid)
        };

        // 3. resolve the command.
        let resolved = {
            let guard = shell.lock().expect("shell mutex poisoned");
            crate::registry::resolve(registry, &guard, &cmd_name, &args)
        }
        .ok_or_else(|| ShellError::CommandNotFound(cmd_name.clone()))?;

        let mut proc = Process::new(0, pid, cmd_name, args);

        if let Some(path) = &session.redirects.stdin {
            if i != 0 {
                return Err(ShellError::RedirectConflict);
            }
            let guard = shell.lock().expect("shell mutex poisoned");
            proc.redirect_stdin(&guard, path)?;
        }

        let is_last = i + 1 == n;
        let combined = session.redirects.stdout.is_some() && session.redirects.stdout == session.redirects.stderr;
        if combined {
            let (path, append) = session.redirects.stdout.as_ref().unwrap();
            if !is_last {
                return Err(ShellError::RedirectConflict);
            }
            let guard = shell.lock().expect("shell mutex poisoned");
            proc.redirect_stdout_and_stderr(&guard, path, *append)?;
        } else {
            if let Some((path, append)) = &session.redirects.stdout {
                if !is_last {
                    return Err(ShellError::RedirectConflict);
                }
                let guard = shell.lock().expect("shell mutex poisoned");
                proc.redirect_stdout(&guard, path, *append)?;
            }
            if let Some((path, append)) = &session.redirects.stderr {
                if !is_last {
                    return Err(ShellError::RedirectConflict);
                }
                let guard = shell.lock().expect("shell mutex poisoned");
                proc.redirect_stderr(&guard, path, *append)?;
            }
        }

        cmds.push(resolved);
        procs.push(proc);
    }

    // 4. wire pipes between adjacent stages that weren't explicitly redirected.
    for i in 0..procs.len().saturating_sub(1) {
        if matches!(procs[i].stdout, OutStream::InheritStdout) {
            let (reader, writer) = os_pipe::pipe()?;
            procs[i].stdout = OutStream::Pipe(writer);
            procs[i + 1].stdin = InStream::Pipe(reader);
        }
    }
    if let Some(last) = procs.last_mut() {
        if matches!(last.stdout, OutStream::InheritStdout) {
            last.stdout = final_stdout;
        }
    }

    // 5. start every stage concurrently, then wait for each in order.
    let mut handles = Vec::with_capacity(procs.len());
    for (cmd, proc) in cmds.into_iter().zip(procs.into_iter()) {
        handles.push(start_process(cmd, proc, shell.clone()));
    }

    let mut last_result = None;
    for handle in handles {
        let result = handle.join().expect("pipeline stage thread panicked");
        last_result = Some(result);
    }
    last_result.ok_or_else(|| ShellError::Syntax("empty pipeline".into()))
}

fn start_process(
    cmd: Box<dyn ExecutableCommand>,
    proc: Process,
    shell: Arc<Mutex<Shell>>,
) -> JoinHandle<ExecResult> {
    let Process { stdin, stdout, stderr, .. } = proc;
    std::thread::spawn(move || {
        let mut result = ExecResult::new();
        let exit_code = match cmd.execute(stdin, stdout, stderr, &shell) {
            Ok(code) => code,
            Err(e) => {
                tracing::debug!("executor error: {e:#}");
                1
            }
        };
        result.finish(exit_code);
        result
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Redirects, Separator};
    use crate::command::{BuiltinCommand, CommandFactory, ExitCode, Factory};
    use anyhow::Result;
    use std::io::{Read as _, Write as _};

    /// A tiny builtin registered only for these tests, used to build
    /// short-circuit scenarios without shelling out to the host.
    #[derive(argh::FromArgs)]
    /// exits with a fixed status.
    struct FalseCmd {}

    impl BuiltinCommand for FalseCmd {
        fn name() -> &'static str {
            "false_builtin"
        }

        fn execute(
            self,
            _stdin: &mut dyn Read,
            _stdout: &mut dyn std::io::Write,
            _stderr: &mut dyn std::io::Write,
            _shell: &Arc<Mutex<Shell>>,
        ) -> Result<ExitCode> {
            Ok(3)
        }
    }

    /// Writes a fixed line to stdout and another to stderr, used to
    /// check that a combined `&>` redirect shares one file offset
    /// instead of each stream overwriting the other's bytes.
    #[derive(argh::FromArgs)]
    /// writes to both stdout and stderr.
    struct DualOutput {}

    impl BuiltinCommand for DualOutput {
        fn name() -> &'static str {
            "dual_output"
        }

        fn execute(
            self,
            _stdin: &mut dyn Read,
            stdout: &mut dyn std::io::Write,
            stderr: &mut dyn std::io::Write,
            _shell: &Arc<Mutex<Shell>>,
        ) -> Result<ExitCode> {
            writeln!(stdout, "out line")?;
            writeln!(stderr, "err line")?;
            Ok(0)
        }
    }

    fn test_registry() -> Vec<Box<dyn CommandFactory>> {
        vec![
            Box::new(Factory::<crate::builtins::text::Echo>::new()),
            Box::new(Factory::<crate::builtins::text::Wc>::new()),
            Box::new(Factory::<FalseCmd>::new()),
            Box::new(Factory::<DualOutput>::new()),
        ]
    }

    fn session(words: &[&str]) -> Session {
        Session {
            fragments: words.iter().map(|w| Fragment::Plain(w.to_string())).collect(),
            redirects: Redirects::default(),
            separator: Separator::Semi,
        }
    }

    #[test]
    fn pipeline_pipes_stdout_to_stdin() {
        let shell = Arc::new(Mutex::new(Shell::new()));
        let registry = test_registry();
        let group = SessionGroup {
            sessions: vec![session(&["echo", "hello"]), session(&["wc", "-w"])],
        };
        let (mut reader, writer) = os_pipe::pipe().unwrap();
        run_with_final_stdout(&group, &shell, &registry, OutStream::Pipe(writer)).unwrap();
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out.trim(), "1");
    }

    #[test]
    fn exit_code_is_last_stage() {
        let shell = Arc::new(Mutex::new(Shell::new()));
        let registry = test_registry();
        let group = SessionGroup {
            sessions: vec![session(&["false_builtin"]), session(&["echo", "ok"])],
        };
        let (mut reader, writer) = os_pipe::pipe().unwrap();
        let result = run_with_final_stdout(&group, &shell, &registry, OutStream::Pipe(writer)).unwrap();
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "ok\n");
        assert_eq!(result.exit_code(), 0);
    }

    #[test]
    fn backquote_substitution_runs_before_outer_session() {
        let shell = Arc::new(Mutex::new(Shell::new()));
        let registry = test_registry();
        let inner = session(&["echo", "monday"]);
        let outer = Session {
            fragments: vec![
                Fragment::Plain("echo".to_string()),
                Fragment::Composite(vec![
                    Piece::Text("today is ".to_string()),
                    Piece::Sub(inner),
                ]),
            ],
            redirects: Redirects::default(),
            separator: Separator::Semi,
        };
        let group = SessionGroup { sessions: vec![outer] };
        let (mut reader, writer) = os_pipe::pipe().unwrap();
        run_with_final_stdout(&group, &shell, &registry, OutStream::Pipe(writer)).unwrap();
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "today is monday\n");
    }

    #[test]
    fn combined_redirect_shares_one_file_offset() {
        let shell = Arc::new(Mutex::new(Shell::new()));
        let registry = test_registry();
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("both.txt");
        let mut redirects = Redirects::default();
        let path = target.to_string_lossy().into_owned();
        redirects.stdout = Some((path.clone(), false));
        redirects.stderr = Some((path, false));
        let group = SessionGroup {
            sessions: vec![Session {
                fragments: vec![Fragment::Plain("dual_output".to_string())],
                redirects,
                separator: Separator::Semi,
            }],
        };
        run_session_group(&group, &shell, &registry).unwrap();
        let contents = std::fs::read_to_string(&target).unwrap();
        assert_eq!(contents, "out line\nerr line\n");
    }

    #[test]
    fn unknown_command_is_reported() {
        let shell = Arc::new(Mutex::new(Shell::new()));
        let registry = test_registry();
        let group = SessionGroup { sessions: vec![session(&["definitely_not_a_command_xyz"])] };
        let err = run_session_group(&group, &shell, &registry).unwrap_err();
        assert!(matches!(err, ShellError::CommandNotFound(_)));
    }
}
