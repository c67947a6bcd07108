//! Applets that read or mutate the `Shell`'s working directory and
//! environment map: `pwd`, `cd`, `export`, `unset`, `printenv`.

use std::io::{Read, Write};
use std::sync::{Arc, LazyLock, Mutex};

use anyhow::Result;
use argh::FromArgs;
use regex::Regex;

use crate::command::{BuiltinCommand, ExitCode};
use crate::shell::Shell;

static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)=(.*)$").unwrap());

#[derive(FromArgs)]
/// print the current working directory.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        shell: &Arc<Mutex<Shell>>,
    ) -> Result<ExitCode> {
        let cwd = shell.lock().expect("shell mutex poisoned").cwd.clone();
        writeln!(stdout, "{}", cwd.display())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// change the current working directory. With no target, changes to $HOME.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to, absolute or relative to the current directory.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        shell: &Arc<Mutex<Shell>>,
    ) -> Result<ExitCode> {
        let target = self.target.unwrap_or_default();
        let mut guard = shell.lock().expect("shell mutex poisoned");
        match guard.set_working_dir("cd", &target, stderr) {
            Ok(()) => Ok(0),
            Err(_) => Ok(1),
        }
    }
}

#[derive(FromArgs)]
/// set or print exported environment variables.
pub struct Export {
    #[argh(switch, short = 'n')]
    /// delete the named variables instead of setting them.
    pub delete: bool,

    #[argh(switch, short = 'p')]
    /// print all variables in `declare -x NAME="VALUE"` form.
    pub print: bool,

    #[argh(positional, greedy)]
    /// `NAME=VALUE` assignments, or bare names with `-n`/`-p`.
    pub args: Vec<String>,
}

impl BuiltinCommand for Export {
    fn name() -> &'static str {
        "export"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        shell: &Arc<Mutex<Shell>>,
    ) -> Result<ExitCode> {
        let mut guard = shell.lock().expect("shell mutex poisoned");
        if self.delete {
            for key in &self.args {
                guard.del_env(key);
            }
        } else if self.print {
            let mut keys: Vec<&String> = guard.env.keys().collect();
            keys.sort();
            for key in keys {
                writeln!(stdout, "declare -x {key}=\"{}\"", guard.env[key])?;
            }
        } else {
            for arg in &self.args {
                match ENV_VAR_PATTERN.captures(arg) {
                    Some(caps) => guard.set_env(&caps[1], &caps[2]),
                    None => guard.set_env(arg, ""),
                }
            }
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// remove variables from the environment.
pub struct Unset {
    #[argh(switch, short = 'v')]
    /// treat NAME as a shell variable (accepted for compatibility, has no other effect).
    pub variable: bool,

    #[argh(positional, greedy)]
    pub names: Vec<String>,
}

impl BuiltinCommand for Unset {
    fn name() -> &'static str {
        "unset"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        shell: &Arc<Mutex<Shell>>,
    ) -> Result<ExitCode> {
        let mut guard = shell.lock().expect("shell mutex poisoned");
        for name in &self.names {
            guard.del_env(name);
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// print environment variables.
pub struct Printenv {
    #[argh(positional)]
    /// if given, print only this variable's value (empty line if unset).
    pub name: Option<String>,
}

impl BuiltinCommand for Printenv {
    fn name() -> &'static str {
        "printenv"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        shell: &Arc<Mutex<Shell>>,
    ) -> Result<ExitCode> {
        let guard = shell.lock().expect("shell mutex poisoned");
        match self.name {
            Some(name) => {
                writeln!(stdout, "{}", guard.get_env(&name).map(String::as_str).unwrap_or(""))?;
            }
            None => {
                let mut keys: Vec<&String> = guard.env.keys().collect();
                keys.sort();
                for key in keys {
                    writeln!(stdout, "{key}={}", guard.env[key])?;
                }
            }
        }
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn shell() -> Arc<Mutex<Shell>> {
        Arc::new(Mutex::new(Shell::new()))
    }

    #[test]
    fn export_sets_name_value() {
        let sh = shell();
        let cmd = Export { delete: false, print: false, args: vec!["FOO=bar".to_string()] };
        cmd.execute(&mut Cursor::new(Vec::new()), &mut Vec::new(), &mut Vec::new(), &sh).unwrap();
        assert_eq!(sh.lock().unwrap().get_env("FOO"), Some(&"bar".to_string()));
    }

    #[test]
    fn export_bare_name_sets_empty() {
        let sh = shell();
        let cmd = Export { delete: false, print: false, args: vec!["BARE".to_string()] };
        cmd.execute(&mut Cursor::new(Vec::new()), &mut Vec::new(), &mut Vec::new(), &sh).unwrap();
        assert_eq!(sh.lock().unwrap().get_env("BARE"), Some(&String::new()));
    }

    #[test]
    fn unset_removes_variable() {
        let sh = shell();
        sh.lock().unwrap().set_env("FOO", "bar");
        let cmd = Unset { variable: false, names: vec!["FOO".to_string()] };
        cmd.execute(&mut Cursor::new(Vec::new()), &mut Vec::new(), &mut Vec::new(), &sh).unwrap();
        assert_eq!(sh.lock().unwrap().get_env("FOO"), None);
    }

    #[test]
    fn printenv_single_name() {
        let sh = shell();
        sh.lock().unwrap().set_env("FOO", "bar");
        let mut out = Vec::new();
        let cmd = Printenv { name: Some("FOO".to_string()) };
        cmd.execute(&mut Cursor::new(Vec::new()), &mut out, &mut Vec::new(), &sh).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "bar\n");
    }

    #[test]
    fn printenv_unknown_name_is_blank_line() {
        let sh = shell();
        let mut out = Vec::new();
        let cmd = Printenv { name: Some("DEFINITELY_UNSET".to_string()) };
        cmd.execute(&mut Cursor::new(Vec::new()), &mut out, &mut Vec::new(), &sh).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\n");
    }

    #[test]
    fn cd_to_nonexistent_reports_error() {
        let sh = shell();
        let mut err = Vec::new();
        let cmd = Cd { target: Some("/definitely/not/a/real/path/xyz".to_string()) };
        let code = cmd.execute(&mut Cursor::new(Vec::new()), &mut Vec::new(), &mut err, &sh).unwrap();
        assert_eq!(code, 1);
        assert!(String::from_utf8(err).unwrap().contains("no such file or directory"));
    }
}
