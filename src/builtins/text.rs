//! Text filters: `echo`, `wc`, `grep`. None of these touch shell
//! state, so they're grouped apart from `envs`/`fs`/`dirs`.

use std::io::{BufRead, BufReader, Read, Write};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use argh::FromArgs;
use regex::{Regex, RegexBuilder};

use crate::command::{BuiltinCommand, ExitCode};
use crate::shell::Shell;

#[derive(FromArgs)]
/// write arguments to standard output, separated by spaces.
pub struct Echo {
    #[argh(switch, short = 'n')]
    /// do not print the trailing newline.
    pub no_newline: bool,

    #[argh(positional, greedy)]
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        _shell: &Arc<Mutex<Shell>>,
    ) -> Result<ExitCode> {
        write!(stdout, "{}", self.args.join(" "))?;
        if !self.no_newline {
            writeln!(stdout)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// count lines, words and bytes.
pub struct Wc {
    #[argh(switch, short = 'c')]
    /// print only the byte count.
    pub bytes_only: bool,

    #[argh(switch, short = 'l')]
    /// print only the line count.
    pub lines_only: bool,

    #[argh(switch, short = 'w')]
    /// print only the word count.
    pub words_only: bool,

    #[argh(positional, greedy)]
    /// files to read; stdin when empty or `-`.
    pub files: Vec<String>,
}

struct Counts {
    lines: usize,
    words: usize,
    bytes: usize,
}

fn count(r: impl Read) -> std::io::Result<Counts> {
    let mut reader = BufReader::with_capacity(4096, r);
    let mut counts = Counts { lines: 0, words: 0, bytes: 0 };
    let mut line = Vec::new();
    loop {
        line.clear();
        let n = reader.read_until(b'\n', &mut line)?;
        if n == 0 {
            break;
        }
        counts.lines += 1;
        counts.bytes += n;
        counts.words += line
            .split(|b| b.is_ascii_whitespace())
            .filter(|w| !w.is_empty())
            .count();
    }
    Ok(counts)
}

impl BuiltinCommand for Wc {
    fn name() -> &'static str {
        "wc"
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        shell: &Arc<Mutex<Shell>>,
    ) -> Result<ExitCode> {
        let any_flag = self.bytes_only || self.lines_only || self.words_only;
        let render = |out: &mut dyn Write, c: &Counts, label: Option<&str>| -> Result<()> {
            let mut fields = Vec::new();
            if !any_flag || self.lines_only {
                fields.push(c.lines.to_string());
            }
            if !any_flag || self.words_only {
                fields.push(c.words.to_string());
            }
            if !any_flag || self.bytes_only {
                fields.push(c.bytes.to_string());
            }
            if let Some(label) = label {
                fields.push(label.to_string());
            }
            writeln!(out, "{}", fields.join(" "))?;
            Ok(())
        };

        if self.files.is_empty() {
            let counts = count(stdin)?;
            render(stdout, &counts, None)?;
            return Ok(0);
        }
        for path in &self.files {
            if path == "-" {
                let counts = count(&mut *stdin)?;
                render(stdout, &counts, None)?;
                continue;
            }
            let expanded = shell.lock().expect("shell mutex poisoned").expand_path(path);
            let f = std::fs::File::open(expanded)?;
            let counts = count(f)?;
            render(stdout, &counts, Some(path))?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// print lines matching a pattern.
pub struct Grep {
    #[argh(switch, short = 'i')]
    /// match case-insensitively.
    pub ignore_case: bool,

    #[argh(switch, short = 'w')]
    /// match only whole words (wraps the pattern in `\b(...)\b`).
    pub word_regexp: bool,

    #[argh(option, short = 'A', default = "0")]
    /// print NUM lines of trailing context after each match.
    pub after_context: usize,

    #[argh(positional)]
    /// pattern to search for (regular expression).
    pub pattern: String,

    #[argh(positional, greedy)]
    /// files to search; stdin when empty.
    pub files: Vec<String>,
}

/// Collects every line first so that trailing context (`-A`) can look
/// ahead of a match; grep's other applets stream instead, but context
/// windows need the whole buffer to resolve overlaps between matches.
fn grep_source(
    r: impl Read,
    re: &Regex,
    after_context: usize,
    label: Option<&str>,
    out: &mut dyn Write,
) -> Result<()> {
    let mut reader = BufReader::new(r);
    let mut lines = Vec::new();
    let mut matches = Vec::new();
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        if re.is_match(&line) {
            matches.push(lines.len());
        }
        lines.push(std::mem::take(&mut line));
    }
    if lines.is_empty() {
        return Ok(());
    }

    let total = lines.len();
    let mut to_print = vec![false; total];
    for &m in &matches {
        for i in m..(m + after_context + 1).min(total) {
            to_print[i] = true;
        }
    }

    let prefix = label.map(|n| format!("{n}:")).unwrap_or_default();
    let separator = after_context > 0;
    let mut last_printed: Option<usize> = None;
    for (i, text) in lines.iter().enumerate() {
        if !to_print[i] {
            continue;
        }
        if separator && last_printed.is_some_and(|last| i > last + 1) {
            out.write_all(b"--\n")?;
        }
        write!(out, "{prefix}{text}")?;
        last_printed = Some(i);
    }
    Ok(())
}

impl BuiltinCommand for Grep {
    fn name() -> &'static str {
        "grep"
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        shell: &Arc<Mutex<Shell>>,
    ) -> Result<ExitCode> {
        let pattern = if self.word_regexp {
            format!(r"\b({})\b", self.pattern)
        } else {
            self.pattern.clone()
        };
        let re = RegexBuilder::new(&pattern)
            .case_insensitive(self.ignore_case)
            .build()
            .with_context(|| format!("grep: invalid pattern: {}", self.pattern))?;

        if self.files.is_empty() {
            grep_source(stdin, &re, self.after_context, None, stdout)?;
            return Ok(0);
        }
        let multi = self.files.len() > 1;
        let mut last_code = 0;
        for path in &self.files {
            let expanded = shell.lock().expect("shell mutex poisoned").expand_path(path);
            match std::fs::File::open(expanded) {
                Ok(f) => grep_source(f, &re, self.after_context, multi.then_some(path.as_str()), stdout)?,
                Err(e) => {
                    writeln!(stdout, "grep: {path}: {e}")?;
                    last_code = 1;
                }
            }
        }
        Ok(last_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn echo_joins_with_spaces_and_newline() {
        let sh = Arc::new(Mutex::new(Shell::new()));
        let mut out = Vec::new();
        let cmd = Echo { no_newline: false, args: vec!["hello".into(), "world".into()] };
        cmd.execute(&mut Cursor::new(Vec::new()), &mut out, &mut Vec::new(), &sh).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "hello world\n");
    }

    #[test]
    fn echo_no_newline() {
        let sh = Arc::new(Mutex::new(Shell::new()));
        let mut out = Vec::new();
        let cmd = Echo { no_newline: true, args: vec!["hi".into()] };
        cmd.execute(&mut Cursor::new(Vec::new()), &mut out, &mut Vec::new(), &sh).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "hi");
    }

    #[test]
    fn wc_counts_stdin() {
        let sh = Arc::new(Mutex::new(Shell::new()));
        let mut out = Vec::new();
        let cmd = Wc { bytes_only: false, lines_only: false, words_only: false, files: vec![] };
        let input = b"one two\nthree\n".to_vec();
        cmd.execute(&mut Cursor::new(input), &mut out, &mut Vec::new(), &sh).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "2 3 14\n");
    }

    #[test]
    fn wc_word_flag_selects_single_field() {
        let sh = Arc::new(Mutex::new(Shell::new()));
        let mut out = Vec::new();
        let cmd = Wc { bytes_only: false, lines_only: false, words_only: true, files: vec![] };
        let input = b"a b c\n".to_vec();
        cmd.execute(&mut Cursor::new(input), &mut out, &mut Vec::new(), &sh).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "3\n");
    }

    #[test]
    fn grep_filters_matching_lines() {
        let sh = Arc::new(Mutex::new(Shell::new()));
        let mut out = Vec::new();
        let cmd = Grep {
            ignore_case: false,
            word_regexp: false,
            after_context: 0,
            pattern: "wo".into(),
            files: vec![],
        };
        let input = b"hello\nworld\nfoo\n".to_vec();
        cmd.execute(&mut Cursor::new(input), &mut out, &mut Vec::new(), &sh).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "world\n");
    }

    #[test]
    fn grep_trailing_context_bridges_adjacent_matches() {
        let sh = Arc::new(Mutex::new(Shell::new()));
        let mut out = Vec::new();
        let cmd = Grep {
            ignore_case: false,
            word_regexp: false,
            after_context: 1,
            pattern: "b".into(),
            files: vec![],
        };
        let input = b"a\nb\nc\nd\nb\ne\n".to_vec();
        cmd.execute(&mut Cursor::new(input), &mut out, &mut Vec::new(), &sh).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "b\nc\n--\nb\ne\n");
    }
}
