use std::fmt;

/// A lexer error with location information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub line: u32,
    pub col: u32,
    pub kind: LexErrorKind,
}

impl LexError {
    pub fn new(line: u32, col: u32, kind: LexErrorKind) -> Self {
        Self { line, col, kind }
    }
}

/// The specific kind of lexer error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    /// A character was encountered that cannot start any recognized token.
    UnrecognizedCharacter(char),
    /// A string literal was not closed before end of line.
    UnterminatedString,
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognizedCharacter(c) => write!(f, "unrecognized character: {c:?}"),
            Self::UnterminatedString => write!(f, "unterminated string literal"),
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.col, self.kind)
    }
}

impl std::error::Error for LexError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_error_display() {
        let err = LexError::new(3, 5, LexErrorKind::UnrecognizedCharacter('@'));
        assert_eq!(err.to_string(), "3:5: unrecognized character: '@'");
    }
}
