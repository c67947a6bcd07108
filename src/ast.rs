//! The data model produced by the parser (§3): `Script` is an ordered
//! list of `SessionGroup`s (pipelines), each an ordered list of
//! `Session`s, each carrying argument `Fragment`s and redirections.

/// How a `SessionGroup` relates to the one that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Separator {
    #[default]
    Semi,
    And,
    Or,
}

/// One piece of a composite argument word.
#[derive(Debug, Clone, PartialEq)]
pub enum Piece {
    Text(String),
    Sub(Session),
}

/// One argument slot. Most words never contain a backquote and stay
/// `Plain`; a word with one or more backquoted substitutions becomes
/// `Composite`, reduced to a single string at execution time by
/// concatenating its pieces in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Plain(String),
    Composite(Vec<Piece>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Redirects {
    pub stdin: Option<String>,
    pub stdout: Option<(String, bool)>,
    pub stderr: Option<(String, bool)>,
}

impl Redirects {
    pub fn is_empty(&self) -> bool {
        self.stdin.is_none() && self.stdout.is_none() && self.stderr.is_none()
    }
}

/// One command invocation within a pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub fragments: Vec<Fragment>,
    pub redirects: Redirects,
    /// Meaningful only on the last session of a group.
    pub separator: Separator,
}

impl Session {
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// A pipeline: one or more sessions connected by `|`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionGroup {
    pub sessions: Vec<Session>,
}

/// Everything parsed from one input line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    pub groups: Vec<SessionGroup>,
}
