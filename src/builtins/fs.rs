//! Filesystem-mutating applets: `cat`, `mkdir`, `rm`, `rmdir`, `mv`,
//! `cp`, `chmod`, `ls`. Long-listing `ls -l` reports raw uid/gid
//! numbers rather than resolved user/group names — name resolution is
//! one of the out-of-scope external collaborators (§1).

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Context, Result};
use argh::FromArgs;

use crate::command::{BuiltinCommand, ExitCode};
use crate::shell::Shell;

#[derive(FromArgs)]
/// concatenate files to standard output.
pub struct Cat {
    #[argh(positional, greedy)]
    /// files to print; stdin when empty.
    pub files: Vec<String>,
}

impl BuiltinCommand for Cat {
    fn name() -> &'static str {
        "cat"
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        shell: &Arc<Mutex<Shell>>,
    ) -> Result<ExitCode> {
        if self.files.is_empty() {
            std::io::copy(stdin, stdout)?;
            return Ok(0);
        }
        for path in &self.files {
            let expanded = shell.lock().expect("shell mutex poisoned").expand_path(path);
            let mut f = fs::File::open(expanded).with_context(|| format!("cat: {path}"))?;
            std::io::copy(&mut f, stdout)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// create directories.
pub struct Mkdir {
    #[argh(switch, short = 'p')]
    /// no error if a target already exists; create parent directories as needed.
    pub parents: bool,

    #[argh(positional, greedy)]
    /// directories to create.
    pub dirs: Vec<String>,
}

impl BuiltinCommand for Mkdir {
    fn name() -> &'static str {
        "mkdir"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        shell: &Arc<Mutex<Shell>>,
    ) -> Result<ExitCode> {
        for dir in &self.dirs {
            let path = shell.lock().expect("shell mutex poisoned").expand_path(dir);
            if self.parents {
                fs::create_dir_all(&path).with_context(|| format!("mkdir: {dir}"))?;
            } else {
                fs::create_dir(&path).with_context(|| format!("mkdir: {dir}"))?;
            }
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// remove files.
pub struct Rm {
    #[argh(switch, short = 'R')]
    /// remove directories and their contents recursively.
    pub recursive: bool,

    #[argh(switch, short = 'r')]
    /// equivalent to -R.
    pub recursive_lower: bool,

    #[argh(switch, short = 'f')]
    /// ignored; accepted for compatibility (no interactive prompt exists to suppress).
    pub force: bool,

    #[argh(positional, greedy)]
    /// files (or, with -R, directories) to remove.
    pub targets: Vec<String>,
}

impl BuiltinCommand for Rm {
    fn name() -> &'static str {
        "rm"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        shell: &Arc<Mutex<Shell>>,
    ) -> Result<ExitCode> {
        let recursive = self.recursive || self.recursive_lower;
        for target in &self.targets {
            let path = shell.lock().expect("shell mutex poisoned").expand_path(target);
            if recursive {
                fs::remove_dir_all(&path).with_context(|| format!("rm: {target}"))?;
            } else {
                let meta = fs::symlink_metadata(&path).with_context(|| format!("rm: {target}"))?;
                if meta.is_dir() {
                    bail!("rm: {target}: is a directory");
                }
                fs::remove_file(&path).with_context(|| format!("rm: {target}"))?;
            }
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// remove empty directories.
pub struct Rmdir {
    #[argh(positional, greedy)]
    /// empty directories to remove.
    pub dirs: Vec<String>,
}

impl BuiltinCommand for Rmdir {
    fn name() -> &'static str {
        "rmdir"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        shell: &Arc<Mutex<Shell>>,
    ) -> Result<ExitCode> {
        for dir in &self.dirs {
            let path = shell.lock().expect("shell mutex poisoned").expand_path(dir);
            let meta = fs::symlink_metadata(&path).with_context(|| format!("rmdir: {dir}"))?;
            if !meta.is_dir() {
                bail!("rmdir: {dir}: not a directory");
            }
            fs::remove_dir(&path).with_context(|| format!("rmdir: {dir}"))?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// move (rename) files.
pub struct Mv {
    #[argh(positional, greedy)]
    /// source(s) followed by the destination.
    pub args: Vec<String>,
}

impl BuiltinCommand for Mv {
    fn name() -> &'static str {
        "mv"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        shell: &Arc<Mutex<Shell>>,
    ) -> Result<ExitCode> {
        if self.args.len() < 2 {
            bail!("usage: mv source... directory");
        }
        let (sources, dest) = self.args.split_at(self.args.len() - 1);
        let guard = shell.lock().expect("shell mutex poisoned");
        let dest = guard.expand_path(&dest[0]);
        let dest_is_dir = dest.is_dir();

        if sources.len() == 1 {
            let dst = if dest_is_dir { dest.join(base_name(&sources[0])) } else { dest.clone() };
            fs::rename(guard.expand_path(&sources[0]), &dst)
                .with_context(|| format!("mv: {}", sources[0]))?;
        } else {
            if !dest_is_dir {
                bail!("mv: target '{}' is not a directory", dest.display());
            }
            for src in sources {
                let dst = dest.join(base_name(src));
                fs::rename(guard.expand_path(src), &dst).with_context(|| format!("mv: {src}"))?;
            }
        }
        Ok(0)
    }
}

fn base_name(path: &str) -> PathBuf {
    PathBuf::from(Path::new(path).file_name().unwrap_or_default())
}

#[derive(FromArgs)]
/// copy files.
pub struct Cp {
    #[argh(switch, short = 'f')]
    /// overwrite an existing destination instead of failing.
    pub force: bool,

    #[argh(switch, short = 'R')]
    /// copy directories recursively.
    pub recursive: bool,

    #[argh(switch, short = 'r')]
    /// equivalent to -R.
    pub recursive_lower: bool,

    #[argh(switch, short = 'p')]
    /// preserve the source file's modification time on the copy.
    pub preserve: bool,

    #[argh(positional, greedy)]
    /// source(s) followed by the destination.
    pub args: Vec<String>,
}

impl BuiltinCommand for Cp {
    fn name() -> &'static str {
        "cp"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        shell: &Arc<Mutex<Shell>>,
    ) -> Result<ExitCode> {
        if self.args.len() < 2 {
            bail!("usage: cp source... dest");
        }
        let recursive = self.recursive || self.recursive_lower;
        let (sources, dest) = self.args.split_at(self.args.len() - 1);
        let guard = shell.lock().expect("shell mutex poisoned");
        let dest = guard.expand_path(&dest[0]);
        let dest_is_dir = dest.is_dir();

        for src in sources {
            let src_path = guard.expand_path(src);
            let dst_path = if dest_is_dir { dest.join(base_name(src)) } else { dest.clone() };
            if !self.force && dst_path.exists() {
                return Err(anyhow!("cp: {}: already exists", dst_path.display()));
            }
            copy_one(&src_path, &dst_path, recursive, self.preserve)?;
        }
        Ok(0)
    }
}

fn copy_one(src: &Path, dst: &Path, recursive: bool, preserve: bool) -> Result<()> {
    let meta = fs::metadata(src).with_context(|| format!("cp: {}", src.display()))?;
    if meta.is_dir() {
        if !recursive {
            bail!("cp: {}: is a directory (use -R)", src.display());
        }
        fs::create_dir_all(dst)?;
        for entry in fs::read_dir(src)? {
            let entry = entry?;
            copy_one(&entry.path(), &dst.join(entry.file_name()), recursive, preserve)?;
        }
    } else {
        fs::copy(src, dst).with_context(|| format!("cp: {} -> {}", src.display(), dst.display()))?;
        if preserve {
            let mtime = meta.modified().with_context(|| format!("cp: {}", src.display()))?;
            let times = fs::FileTimes::new().set_modified(mtime);
            fs::File::options()
                .write(true)
                .open(dst)
                .and_then(|f| f.set_times(times))
                .with_context(|| format!("cp: {}: preserving mtime", dst.display()))?;
        }
    }
    Ok(())
}

#[derive(FromArgs)]
/// change file modes.
pub struct Chmod {
    #[argh(switch, short = 'R')]
    /// change the modes of whole directory hierarchies.
    pub recursive: bool,

    #[argh(positional)]
    /// symbolic (e.g. u+x) or octal (e.g. 755) mode.
    pub mode: String,

    #[argh(positional, greedy)]
    /// files to change the mode of.
    pub files: Vec<String>,
}

#[cfg(unix)]
fn parse_mode(spec: &str, current: u32) -> Result<u32> {
    if spec.bytes().all(|b| b.is_ascii_digit()) && spec.len() == 3 {
        return u32::from_str_radix(spec, 8).map_err(|e| anyhow!("chmod: bad mode {spec}: {e}"));
    }
    let bytes = spec.as_bytes();
    let mut i = 0;
    let mut user = false;
    let mut group = false;
    let mut other = false;
    while i < bytes.len() {
        match bytes[i] {
            b'u' => user = true,
            b'g' => group = true,
            b'o' => other = true,
            b'a' => {
                user = true;
                group = true;
                other = true;
            }
            _ => break,
        }
        i += 1;
    }
    if !user && !group && !other {
        user = true;
        group = true;
        other = true;
    }
    if i >= bytes.len() {
        bail!("chmod: parse error: need '+-=' and 'rwx': {spec}");
    }
    let op = bytes[i];
    i += 1;
    let mut r = false;
    let mut w = false;
    let mut x = false;
    while i < bytes.len() {
        match bytes[i] {
            b'r' => r = true,
            b'w' => w = true,
            b'x' => x = true,
            _ => bail!("chmod: parse error: {spec}"),
        }
        i += 1;
    }
    let bits = (if r { 4 } else { 0 }) | (if w { 2 } else { 0 }) | (if x { 1 } else { 0 });
    let mut mode = current;
    for (flag, shift) in [(user, 6), (group, 3), (other, 0)] {
        if !flag {
            continue;
        }
        let field_mask = 0o7 << shift;
        match op {
            b'+' => mode |= bits << shift,
            b'-' => mode &= !(bits << shift),
            b'=' => mode = (mode & !field_mask) | (bits << shift),
            _ => bail!("chmod: parse error: need '+-=' and 'rwx': {spec}"),
        }
    }
    Ok(mode)
}

#[cfg(unix)]
impl BuiltinCommand for Chmod {
    fn name() -> &'static str {
        "chmod"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        shell: &Arc<Mutex<Shell>>,
    ) -> Result<ExitCode> {
        use std::os::unix::fs::PermissionsExt;

        fn apply(path: &Path, mode_spec: &str, recursive: bool) -> Result<()> {
            let meta = fs::symlink_metadata(path).with_context(|| format!("chmod: {}", path.display()))?;
            let new_mode = parse_mode(mode_spec, meta.permissions().mode() & 0o777)?;
            fs::set_permissions(path, fs::Permissions::from_mode(new_mode))
                .with_context(|| format!("chmod: {}", path.display()))?;
            if recursive && meta.is_dir() {
                for entry in fs::read_dir(path)? {
                    apply(&entry?.path(), mode_spec, recursive)?;
                }
            }
            Ok(())
        }

        let guard = shell.lock().expect("shell mutex poisoned");
        for file in &self.files {
            apply(&guard.expand_path(file), &self.mode, self.recursive)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// list directory contents.
pub struct Ls {
    #[argh(switch, short = 'a')]
    /// show entries starting with '.', including '.' and '..'.
    pub all: bool,

    #[argh(switch, short = 'A')]
    /// like -a but excluding '.' and '..'.
    pub almost_all: bool,

    #[argh(switch, short = 'l')]
    /// long listing format.
    pub long: bool,

    #[argh(switch, short = '1')]
    /// one entry per line.
    pub one: bool,

    #[argh(switch, short = 'h')]
    /// with -l, print sizes in human-readable form.
    pub humanize: bool,

    #[argh(positional, greedy)]
    /// directories (or files) to list; defaults to '.'.
    pub paths: Vec<String>,
}

fn humanize_bytes(size: u64) -> String {
    const UNITS: [&str; 7] = ["B", "kB", "MB", "GB", "TB", "PB", "EB"];
    if size < 10 {
        return format!("{size}B");
    }
    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if value < 10.0 {
        format!("{value:.1}{}", UNITS[unit])
    } else {
        format!("{value:.0}{}", UNITS[unit])
    }
}

impl BuiltinCommand for Ls {
    fn name() -> &'static str {
        "ls"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        shell: &Arc<Mutex<Shell>>,
    ) -> Result<ExitCode> {
        let paths = if self.paths.is_empty() { vec![".".to_string()] } else { self.paths.clone() };
        let show_all = self.all || self.almost_all;
        let multi = paths.len() > 1;

        for (i, raw) in paths.iter().enumerate() {
            let path = shell.lock().expect("shell mutex poisoned").expand_path(raw);
            let mut names: Vec<String> = Vec::new();
            if self.all {
                names.push(".".to_string());
                names.push("..".to_string());
            }
            for entry in fs::read_dir(&path).with_context(|| format!("ls: {raw}"))? {
                let entry = entry?;
                let name = entry.file_name().to_string_lossy().into_owned();
                if !show_all && name.starts_with('.') {
                    continue;
                }
                names.push(name);
            }
            names.sort();

            if multi {
                if i > 0 {
                    writeln!(stdout)?;
                }
                writeln!(stdout, "{raw}:")?;
            }

            if self.long {
                for name in &names {
                    let full = path.join(&name);
                    let meta = fs::symlink_metadata(&full)?;
                    let size = if self.humanize { humanize_bytes(meta.len()) } else { meta.len().to_string() };
                    writeln!(stdout, "{} {:>8} {name}", mode_string(&meta), size)?;
                }
            } else if self.one {
                for name in &names {
                    writeln!(stdout, "{name}")?;
                }
            } else {
                writeln!(stdout, "{}", names.join("  "))?;
            }
        }
        Ok(0)
    }
}

#[cfg(unix)]
fn mode_string(meta: &fs::Metadata) -> String {
    use std::os::unix::fs::{FileTypeExt, PermissionsExt};
    let mode = meta.permissions().mode();
    let kind = if meta.is_dir() {
        'd'
    } else if meta.file_type().is_symlink() {
        'l'
    } else if meta.file_type().is_fifo() {
        'p'
    } else {
        '-'
    };
    let mut s = String::with_capacity(10);
    s.push(kind);
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        s.push(if bits & 4 != 0 { 'r' } else { '-' });
        s.push(if bits & 2 != 0 { 'w' } else { '-' });
        s.push(if bits & 1 != 0 { 'x' } else { '-' });
    }
    s
}

#[cfg(not(unix))]
fn mode_string(meta: &fs::Metadata) -> String {
    if meta.is_dir() { "d---------".to_string() } else { "----------".to_string() }
}

#[cfg(not(unix))]
impl BuiltinCommand for Chmod {
    fn name() -> &'static str {
        "chmod"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        _shell: &Arc<Mutex<Shell>>,
    ) -> Result<ExitCode> {
        bail!("chmod: not supported on this platform")
    }
}
