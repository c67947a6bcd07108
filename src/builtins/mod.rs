//! The applets listed in the external interface contract (§6), plus
//! `pwd` (needed by `cd` but left off the distilled list) and `grep`
//! (kept from the teacher sibling crate per SPEC_FULL.md §4.9), grouped
//! the way the original `applets/` tree groups them: commands
//! that read the shell's environment and working directory, text
//! filters, filesystem mutators, directory-stack commands, and the two
//! odds and ends (`sleep`, `time`) plus `exit`.
//!
//! Each applet is an `argh::FromArgs` struct implementing
//! [`crate::command::BuiltinCommand`]; `registry::default_registry`
//! wraps each in a `Factory<T>` and registers it once, explicitly, at
//! shell construction — no module-load-time side effects (see
//! DESIGN.md's note on REDESIGN FLAGS).

pub mod dirs;
pub mod envs;
pub mod fs;
pub mod misc;
pub mod text;
