//! Drives a `Script` group by group, honoring `;`/`&&`/`||`
//! short-circuiting based on each group's exit code (C7).

use std::sync::{Arc, Mutex};

use crate::ast::{Script, Separator};
use crate::command::CommandFactory;
use crate::error::ShellResult;
use crate::executor;
use crate::process::ExecResult;
use crate::shell::Shell;

pub fn run_script(
    script: &Script,
    shell: &Arc<Mutex<Shell>>,
    registry: &[Box<dyn CommandFactory>],
) -> ShellResult<Option<ExecResult>> {
    let mut last = None;
    for group in &script.groups {
        let result = match executor::run_session_group(group, shell, registry) {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(%err, "group execution error");
                eprintln!("tish: {err}");
                let mut failed = ExecResult::new();
                failed.finish(1);
                failed
            }
        };
        let code = result.exit_code();
        let separator = group.sessions.last().map(|s| s.separator).unwrap_or_default();
        let keep_going = match separator {
            Separator::Semi => true,
            Separator::And => code == 0,
            Separator::Or => code != 0,
        };
        last = Some(result);
        if !keep_going {
            break;
        }
        if shell.lock().expect("shell mutex poisoned").exit_requested.is_some() {
            break;
        }
    }
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Fragment, Redirects, Session, SessionGroup};
    use crate::command::{BuiltinCommand, ExitCode, Factory};
    use anyhow::Result;
    use std::io::{Read, Write};

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
            _stdout: &mut dyn Write,
            _stderr: &mut dyn Write,
            _shell: &Arc<Mutex<Shell>>,
        ) -> Result<ExitCode> {
            Ok(1)
        }
    }

    fn registry() -> Vec<Box<dyn CommandFactory>> {
        vec![
            Box::new(Factory::<crate::builtins::text::Echo>::new()),
            Box::new(Factory::<FalseCmd>::new()),
        ]
    }

    fn group(words: &[&str], sep: Separator) -> SessionGroup {
        SessionGroup {
            sessions: vec![Session {
                fragments: words.iter().map(|w| Fragment::Plain(w.to_string())).collect(),
                redirects: Redirects::default(),
                separator: sep,
            }],
        }
    }

    #[test]
    fn and_short_circuits_on_failure() {
        let shell = Arc::new(Mutex::new(Shell::new()));
        let reg = registry();
        let script = Script {
            groups: vec![
                group(&["false_builtin"], Separator::And),
                group(&["echo", "unreached"], Separator::Semi),
            ],
        };
        let result = run_script(&script, &shell, &reg).unwrap().unwrap();
        assert_eq!(result.exit_code(), 1);
    }

    #[test]
    fn or_short_circuits_on_success() {
        let shell = Arc::new(Mutex::new(Shell::new()));
        let reg = vec![Box::new(Factory::<crate::builtins::text::Echo>::new()) as Box<dyn CommandFactory>];
        let script = Script {
            groups: vec![
                group(&["echo", "a"], Separator::Or),
                group(&["echo", "b"], Separator::Semi),
            ],
        };
        let result = run_script(&script, &shell, &reg).unwrap().unwrap();
        assert_eq!(result.exit_code(), 0);
    }

    #[test]
    fn semi_always_continues() {
        let shell = Arc::new(Mutex::new(Shell::new()));
        let reg = registry();
        let script = Script {
            groups: vec![
                group(&["false_builtin"], Separator::Semi),
                group(&["echo", "b"], Separator::Semi),
            ],
        };
        let result = run_script(&script, &shell, &reg).unwrap().unwrap();
        assert_eq!(result.exit_code(), 0);
    }

    #[test]
    fn group_error_is_reported_as_exit_one_and_sequence_continues() {
        let shell = Arc::new(Mutex::new(Shell::new()));
        let reg = vec![Box::new(Factory::<crate::builtins::text::Echo>::new()) as Box<dyn CommandFactory>];
        let script = Script {
            groups: vec![
                group(&["definitely_not_a_command_xyz"], Separator::Semi),
                group(&["echo", "b"], Separator::Semi),
            ],
        };
        let result = run_script(&script, &shell, &reg).unwrap().unwrap();
        assert_eq!(result.exit_code(), 0);
    }

    #[test]
    fn and_group_error_short_circuits_like_any_other_failure() {
        let shell = Arc::new(Mutex::new(Shell::new()));
        let reg = vec![Box::new(Factory::<crate::builtins::text::Echo>::new()) as Box<dyn CommandFactory>];
        let script = Script {
            groups: vec![
                group(&["definitely_not_a_command_xyz"], Separator::And),
                group(&["echo", "unreached"], Separator::Semi),
            ],
        };
        let result = run_script(&script, &shell, &reg).unwrap().unwrap();
        assert_eq!(result.exit_code(), 1);
    }
}
