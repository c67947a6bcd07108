/// Lexical tokens produced by the lexer and consumed by the parser.
///
/// `Word` carries a fully unquoted string; backquotes are left intact
/// inside it for the parser to split (the lexer does not know about
/// command substitution, only about quoting).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(String),
    Pipe,           // |
    Semi,           // ;
    And,            // &&
    Or,             // ||
    RedirIn,        // <
    RedirOut,       // >
    RedirOutAppend, // >>
    RedirErr,       // 2>
    RedirErrAppend, // 2>>
    RedirBoth,      // &>
    RedirBothAppend,// &>>
}
