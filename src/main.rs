mod ast;
mod builtins;
mod command;
mod error;
mod executor;
mod expand;
mod external;
mod lexer;
mod parser;
mod process;
mod prompt;
mod registry;
mod sequencer;
mod shell;
mod streams;
mod token;

use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use shell::Shell;

/// tish, a tiny interactive shell.
#[derive(Parser)]
#[command(name = "tish", version)]
struct Cli {
    /// run a single command line non-interactively and exit with its status.
    #[arg(short = 'c', long = "command")]
    command: Option<String>,

    /// force the ANSI-free prompt form, even on a terminal.
    #[arg(long)]
    plain: bool,
}

fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

fn username(shell: &Shell) -> String {
    shell
        .get_env("USER")
        .or_else(|| shell.get_env("USERNAME"))
        .cloned()
        .unwrap_or_else(|| "user".to_string())
}

fn now_hms() -> String {
    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let (h, m, s) = ((secs / 3600) % 24, (secs / 60) % 60, secs % 60);
    format!("{h:02}:{m:02}:{s:02}")
}

/// Parses and runs one line, logging a one-line diagnostic on error.
/// Returns the exit status to report, whether or not `exit` was run.
fn run_line(
    line: &str,
    shell: &Arc<Mutex<Shell>>,
    registry: &registry::Registry,
) -> i32 {
    let script = match parser::parse(line) {
        Ok(script) => script,
        Err(err) => {
            tracing::warn!(%err, "parse error");
            eprintln!("tish: {err}");
            return 1;
        }
    };

    let status = match sequencer::run_script(&script, shell, registry) {
        Ok(Some(result)) => result.exit_code(),
        Ok(None) => 0,
        Err(err) => {
            tracing::warn!(%err, "execution error");
            eprintln!("tish: {err}");
            1
        }
    };

    if let Some(code) = shell.lock().expect("shell mutex poisoned").exit_requested {
        return code;
    }
    status
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = registry::default_registry();
    let shell = Arc::new(Mutex::new(Shell::new()));

    if let Some(line) = cli.command {
        let status = run_line(&line, &shell, &registry);
        std::process::exit(status);
    }

    let host = hostname();
    let plain = cli.plain;

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(err) => {
            eprintln!("tish: can't start line editor: {err}");
            std::process::exit(1);
        }
    };

    println!("tish");
    let mut last_status = 0;

    loop {
        let (user, home, wd) = {
            let guard = shell.lock().expect("shell mutex poisoned");
            (username(&guard), guard.home_dir(), guard.cwd.clone())
        };
        let prompt = prompt::build_prompt(
            &user,
            &host,
            &wd,
            home.as_deref(),
            &now_hms(),
            last_status,
            plain || !std::io::IsTerminal::is_terminal(&std::io::stdout()),
        );

        match rl.readline(&prompt) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());

                last_status = run_line(&line, &shell, &registry);

                if let Some(code) = shell.lock().expect("shell mutex poisoned").exit_requested {
                    std::process::exit(code);
                }
            }
            Err(ReadlineError::Interrupted) => {
                continue;
            }
            Err(ReadlineError::Eof) => {
                break;
            }
            Err(err) => {
                eprintln!("tish: readline error: {err}");
                break;
            }
        }
    }
}
