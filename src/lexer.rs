//! Turns a raw input line into a flat token stream (C1).
//!
//! Quoting rules: single quotes suppress all interpretation; double
//! quotes keep their contents literal except for a backslash escaping
//! a `"`, `\` or `$`; outside quotes a backslash escapes the very next
//! character. Backquotes are passed through untouched inside a word —
//! splitting them into literal/substitution pieces is the parser's
//! job (see `parser::word_to_fragment`), since only the parser knows
//! how to recursively re-enter itself.

use crate::error::{ShellError, ShellResult};
use crate::token::Token;

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    current: String,
    has_content: bool,
    tokens: Vec<Token>,
}

pub fn lex(input: &str) -> ShellResult<Vec<Token>> {
    let mut lexer = Lexer {
        chars: input.chars().peekable(),
        current: String::new(),
        has_content: false,
        tokens: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

impl<'a> Lexer<'a> {
    fn run(&mut self) -> ShellResult<()> {
        while let Some(&c) = self.chars.peek() {
            match c {
                c if c.is_whitespace() => {
                    self.chars.next();
                    self.flush_word();
                }
                '\'' => {
                    self.chars.next();
                    self.read_single_quoted()?;
                }
                '"' => {
                    self.chars.next();
                    self.read_double_quoted()?;
                }
                '\\' => {
                    self.chars.next();
                    match self.chars.next() {
                        Some(escaped) => self.push_char(escaped),
                        None => return Err(ShellError::Syntax("trailing backslash".into())),
                    }
                }
                '|' => {
                    self.chars.next();
                    self.flush_word();
                    if self.chars.peek() == Some(&'|') {
                        self.chars.next();
                        self.tokens.push(Token::Or);
                    } else {
                        self.tokens.push(Token::Pipe);
                    }
                }
                ';' => {
                    self.chars.next();
                    self.flush_word();
                    self.tokens.push(Token::Semi);
                }
                '&' => {
                    self.chars.next();
                    self.flush_word();
                    match self.chars.peek() {
                        Some('&') => {
                            self.chars.next();
                            self.tokens.push(Token::And);
                        }
                        Some('>') => {
                            self.chars.next();
                            if self.chars.peek() == Some(&'>') {
                                self.chars.next();
                                self.tokens.push(Token::RedirBothAppend);
                            } else {
                                self.tokens.push(Token::RedirBoth);
                            }
                        }
                        _ => return Err(ShellError::Syntax("unexpected '&'".into())),
                    }
                }
                '<' => {
                    self.chars.next();
                    self.flush_word();
                    self.tokens.push(Token::RedirIn);
                }
                '>' => {
                    self.chars.next();
                    self.flush_word();
                    if self.chars.peek() == Some(&'>') {
                        self.chars.next();
                        self.tokens.push(Token::RedirOutAppend);
                    } else {
                        self.tokens.push(Token::RedirOut);
                    }
                }
                '2' if !self.has_content && self.peek_is_fd_redirect() => {
                    self.chars.next(); // consume '2'
                    self.chars.next(); // consume '>'
                    if self.chars.peek() == Some(&'>') {
                        self.chars.next();
                        self.tokens.push(Token::RedirErrAppend);
                    } else {
                        self.tokens.push(Token::RedirErr);
                    }
                }
                _ => {
                    self.chars.next();
                    self.push_char(c);
                }
            }
        }
        self.flush_word();
        Ok(())
    }

    /// True if the char after the peeked `'2'` is `'>'` — i.e. this is
    /// really the two-character `2>` operator, not a word starting
    /// with the digit 2 (`2file`, `22`, ...).
    fn peek_is_fd_redirect(&mut self) -> bool {
        let mut clone = self.chars.clone();
        clone.next(); // the '2' itself
        clone.next() == Some('>')
    }

    fn push_char(&mut self, c: char) {
        self.current.push(c);
        self.has_content = true;
    }

    fn flush_word(&mut self) {
        if self.has_content {
            self.tokens.push(Token::Word(std::mem::take(&mut self.current)));
            self.has_content = false;
        }
    }

    fn read_single_quoted(&mut self) -> ShellResult<()> {
        self.has_content = true;
        loop {
            match self.chars.next() {
                Some('\'') => return Ok(()),
                Some(c) => self.current.push(c),
                None => return Err(ShellError::Syntax("unterminated single quote".into())),
            }
        }
    }

    fn read_double_quoted(&mut self) -> ShellResult<()> {
        self.has_content = true;
        loop {
            match self.chars.next() {
                Some('"') => return Ok(()),
                Some('\\') => match self.chars.next() {
                    Some(c @ ('"' | '\\' | '$' | '`')) => self.current.push(c),
                    Some(c) => {
                        self.current.push('\\');
                        self.current.push(c);
                    }
                    None => return Err(ShellError::Syntax("unterminated double quote".into())),
                },
                Some(c) => self.current.push(c),
                None => return Err(ShellError::Syntax("unterminated double quote".into())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_and_whitespace() {
        let toks = lex("echo  hello world").unwrap();
        assert_eq!(
            toks,
            vec![
                Token::Word("echo".into()),
                Token::Word("hello".into()),
                Token::Word("world".into()),
            ]
        );
    }

    #[test]
    fn pipe_and_logical_operators() {
        let toks = lex("a|b && c||d;e").unwrap();
        assert_eq!(
            toks,
            vec![
                Token::Word("a".into()),
                Token::Pipe,
                Token::Word("b".into()),
                Token::And,
                Token::Word("c".into()),
                Token::Or,
                Token::Word("d".into()),
                Token::Semi,
                Token::Word("e".into()),
            ]
        );
    }

    #[test]
    fn redirections() {
        let toks = lex("cmd < in > out >> app 2> err 2>> erra &> both &>> botha").unwrap();
        assert_eq!(
            toks,
            vec![
                Token::Word("cmd".into()),
                Token::RedirIn,
                Token::Word("in".into()),
                Token::RedirOut,
                Token::Word("out".into()),
                Token::RedirOutAppend,
                Token::Word("app".into()),
                Token::RedirErr,
                Token::Word("err".into()),
                Token::RedirErrAppend,
                Token::Word("erra".into()),
                Token::RedirBoth,
                Token::Word("both".into()),
                Token::RedirBothAppend,
                Token::Word("botha".into()),
            ]
        );
    }

    #[test]
    fn digit_two_is_not_always_a_redirect() {
        let toks = lex("echo 22 file2>out").unwrap();
        assert_eq!(
            toks,
            vec![
                Token::Word("echo".into()),
                Token::Word("22".into()),
                Token::Word("file2".into()),
                Token::RedirOut,
                Token::Word("out".into()),
            ]
        );
    }

    #[test]
    fn quoting() {
        let toks = lex(r#"echo 'a b' "c $d" e\ f"#).unwrap();
        assert_eq!(
            toks,
            vec![
                Token::Word("echo".into()),
                Token::Word("a b".into()),
                Token::Word("c $d".into()),
                Token::Word("e f".into()),
            ]
        );
    }

    #[test]
    fn backquotes_pass_through() {
        let toks = lex("echo `echo hi`").unwrap();
        assert_eq!(
            toks,
            vec![Token::Word("echo".into()), Token::Word("`echo hi`".into())]
        );
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        assert!(lex("echo 'oops").is_err());
    }
}
