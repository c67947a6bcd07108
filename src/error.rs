use std::io;
use thiserror::Error;

/// The nine distinguishable failure kinds the core has to tell apart,
/// plus `Exit` (sentinel, not really a failure) and `Io` for the
/// catch-all filesystem/pipe errors that bubble up from `std`.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("backquote unclosed")]
    BackquoteUnclosed,

    #[error("nested command substitution too deep")]
    NestedTooDeep,

    #[error("missing redirect target")]
    MissingRedirectTarget,

    #[error("no command after pipe")]
    NoCommandAfterPipe,

    #[error("redirect conflict in pipeline")]
    RedirectConflict,

    #[error("{0}: command not found")]
    CommandNotFound(String),

    #[error("no matches found: {0}")]
    WildcardNoMatch(String),

    #[error("popd: directory stack empty")]
    PopEmpty,

    #[error("exit")]
    Exit(i32),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type ShellResult<T> = Result<T, ShellError>;
