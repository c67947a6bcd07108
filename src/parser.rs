//! Builds a `Script` from a token stream (C2). See `SPEC_FULL.md` §4.2
//! for the await-flag state machine this implements.

use crate::ast::{Fragment, Piece, Redirects, Separator, Session, SessionGroup, Script};
use crate::error::{ShellError, ShellResult};
use crate::lexer;
use crate::token::Token;

/// What the parser is waiting for after having just consumed a
/// redirect operator. Cleared by the very next `Word` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Await {
    None,
    Stdin,
    Stdout(bool),
    Stderr(bool),
    Both(bool),
}

pub fn parse(input: &str) -> ShellResult<Script> {
    let tokens = lexer::lex(input)?;
    parse_tokens(&tokens)
}

fn parse_tokens(tokens: &[Token]) -> ShellResult<Script> {
    let mut groups = Vec::new();
    let mut group_sessions: Vec<Session> = Vec::new();
    let mut current = Session::default();
    let mut await_flag = Await::None;

    for tok in tokens {
        if await_flag != Await::None {
            let Token::Word(word) = tok else {
                return Err(ShellError::Syntax("expected a redirect target".into()));
            };
            match await_flag {
                Await::Stdin => current.redirects.stdin = Some(word.clone()),
                Await::Stdout(append) => current.redirects.stdout = Some((word.clone(), append)),
                Await::Stderr(append) => current.redirects.stderr = Some((word.clone(), append)),
                Await::Both(append) => {
                    current.redirects.stdout = Some((word.clone(), append));
                    current.redirects.stderr = Some((word.clone(), append));
                }
                Await::None => unreachable!(),
            }
            await_flag = Await::None;
            continue;
        }

        match tok {
            Token::Word(word) => {
                current.fragments.push(word_to_fragment(word)?);
            }
            Token::RedirIn => await_flag = Await::Stdin,
            Token::RedirOut => await_flag = Await::Stdout(false),
            Token::RedirOutAppend => await_flag = Await::Stdout(true),
            Token::RedirErr => await_flag = Await::Stderr(false),
            Token::RedirErrAppend => await_flag = Await::Stderr(true),
            Token::RedirBoth => await_flag = Await::Both(false),
            Token::RedirBothAppend => await_flag = Await::Both(true),
            Token::Pipe => {
                if current.is_empty() {
                    return Err(ShellError::NoCommandAfterPipe);
                }
                group_sessions.push(std::mem::take(&mut current));
            }
            Token::Semi | Token::And | Token::Or => {
                if current.is_empty() {
                    return Err(ShellError::Syntax("empty command before separator".into()));
                }
                current.separator = match tok {
                    Token::Semi => Separator::Semi,
                    Token::And => Separator::And,
                    Token::Or => Separator::Or,
                    _ => unreachable!(),
                };
                group_sessions.push(std::mem::take(&mut current));
                groups.push(SessionGroup { sessions: std::mem::take(&mut group_sessions) });
            }
        }
    }

    if await_flag != Await::None {
        return Err(ShellError::MissingRedirectTarget);
    }

    if current.is_empty() {
        if !group_sessions.is_empty() {
            // A trailing "|" left a pending pipeline with nothing after it.
            return Err(ShellError::NoCommandAfterPipe);
        }
    } else {
        group_sessions.push(current);
        groups.push(SessionGroup { sessions: group_sessions });
    }

    Ok(Script { groups })
}

/// Splits a lexed word on backquotes into a `Fragment`, recursively
/// parsing each backquoted span. A span must parse down to exactly
/// one pipeline with exactly one session — anything else (an empty
/// span, a pipe, a sequencing operator) is `NestedTooDeep`.
fn word_to_fragment(word: &str) -> ShellResult<Fragment> {
    if !word.contains('`') {
        return Ok(Fragment::Plain(word.to_string()));
    }

    if word.matches('`').count() % 2 != 0 {
        return Err(ShellError::BackquoteUnclosed);
    }

    let mut pieces = Vec::new();
    for (i, part) in word.split('`').enumerate() {
        if i % 2 == 0 {
            if !part.is_empty() {
                pieces.push(Piece::Text(part.to_string()));
            }
        } else {
            let inner = parse(part)?;
            if inner.groups.len() != 1 || inner.groups[0].sessions.len() != 1 {
                return Err(ShellError::NestedTooDeep);
            }
            let session = inner.groups.into_iter().next().unwrap().sessions.into_iter().next().unwrap();
            pieces.push(Piece::Sub(session));
        }
    }
    Ok(Fragment::Composite(pieces))
}
